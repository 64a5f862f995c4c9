//! Command Parsing
//!
//! Keyword dispatch for single commands and the rules of the commands
//! that read the hierarchy or the shell state.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::ast::types::{
    Filters, GetNode, LsNode, Node, PathNode, RecursiveArgs, Value, COMPLEX_FILTER_KEY,
};
use crate::parser::parser::{ParseResult, Parser};

/// Keywords taking arguments
const DISPATCH_KEYWORDS: &[&str] = &[
    "get", "getu", "getslot", "undraw", "draw", "unset", "env", "+", "-", "=", ".var:",
    ".cmds:", ".dryrun:", "len", "link", "unlink", "print", "printf", "cd", "tree", "while",
    "for", "if", "alias",
];

/// Keywords taking no argument
const NO_ARG_KEYWORDS: &[&str] = &["selection", "pwd", "exit"];

/// `ls` variants and the category they filter on
const LS_COMMANDS: &[(&str, &str)] = &[
    ("ls", ""),
    ("lssite", "site"),
    ("lsbldg", "building"),
    ("lsroom", "room"),
    ("lsrack", "rack"),
    ("lsdev", "device"),
    ("lscorridor", "corridor"),
];

/// Attribute whose sub-keys are addressed as `virtual_config.key`
pub(crate) const VIRTUAL_CONFIG: &str = "virtual_config";

lazy_static! {
    static ref COMMAND_KEYWORDS: Vec<&'static str> = DISPATCH_KEYWORDS
        .iter()
        .chain(NO_ARG_KEYWORDS.iter())
        .copied()
        .chain(LS_COMMANDS.iter().map(|(name, _)| *name))
        .collect();
    static ref FILTER_LIKE_PATH: Regex =
        Regex::new(r"^([\w.\-]+)\s*(<=|>=|<|>|!=|=)\s*([\w.\-]+)$").unwrap();
}

/// Concatenates complex filter fragments into one string-valued node
#[derive(Default)]
pub(crate) struct FilterBuilder {
    format: String,
    args: Vec<Node>,
}

impl FilterBuilder {
    pub fn push_literal(&mut self, s: &str) {
        self.format.push_str(&s.replace('%', "%%"));
    }

    pub fn push_node(&mut self, node: Node) {
        match node {
            Node::Value(Value::String(s)) => self.push_literal(&s),
            Node::FormatString { format, args } => match *format {
                Node::Value(Value::String(f)) => {
                    self.format.push_str(&f);
                    self.args.extend(args);
                }
                other => {
                    self.format.push_str("%v");
                    self.args.push(Node::FormatString {
                        format: Box::new(other),
                        args,
                    });
                }
            },
            other => {
                self.format.push_str("%v");
                self.args.push(other);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.format.is_empty() && self.args.is_empty()
    }

    pub fn build(self) -> Node {
        if self.args.is_empty() {
            return Node::string(self.format.replace("%%", "%"));
        }
        Node::FormatString {
            format: Box::new(Node::string(self.format)),
            args: self.args,
        }
    }
}

impl Parser {
    pub(crate) fn parse_single_command(&mut self) -> ParseResult<Option<Node>> {
        self.traced("", |p| {
            p.skip_whitespaces();
            if p.command_end() {
                return Ok(None);
            }
            let keyword = p.traced("command keyword", |p| p.parse_keyword(&COMMAND_KEYWORDS))?;
            if !keyword.is_empty() {
                // arguments must be spaced from keywords ending with a letter
                let ends_alnum = keyword
                    .chars()
                    .last()
                    .map(crate::parser::parser::is_alnum)
                    .unwrap_or(false);
                if ends_alnum {
                    let n = p.skip_whitespaces();
                    if n == 0 && !p.command_end() {
                        p.reset();
                        return p.error("unknown keyword");
                    }
                }
                if let Some((_, category)) = LS_COMMANDS.iter().find(|(name, _)| *name == keyword) {
                    p.skip_whitespaces();
                    return p.parse_ls(category).map(Some);
                }
                if DISPATCH_KEYWORDS.contains(&keyword.as_str()) {
                    p.skip_whitespaces();
                    return p.dispatch_command(&keyword).map(Some);
                }
                match keyword.as_str() {
                    "selection" => return Ok(Some(Node::ShowSelection)),
                    "pwd" => return Ok(Some(Node::Pwd)),
                    "exit" => return Ok(Some(Node::Exit)),
                    _ => {}
                }
            }
            let name = p.parse_simple_word("function name")?;
            if !name.is_empty() && p.command_end() {
                return Ok(Some(Node::FuncCall(name)));
            }
            p.reset();
            p.parse_update().map(Some)
        })
    }

    fn dispatch_command(&mut self, keyword: &str) -> ParseResult<Node> {
        match keyword {
            "get" => self.parse_get(),
            "getu" => self.traced("getu", |p| {
                let path = p.parse_path("")?;
                let u = p.parse_expr("u")?;
                Ok(Node::GetU { path, u: Box::new(u) })
            }),
            "getslot" => self.traced("getslot", |p| {
                let path = p.parse_path("")?;
                let slot = p.parse_string("slot name")?;
                Ok(Node::GetSlot { path, slot: Box::new(slot) })
            }),
            "undraw" => self.traced("undraw", |p| {
                if p.command_end() {
                    return Ok(Node::Undraw(None));
                }
                Ok(Node::Undraw(Some(p.parse_path("")?)))
            }),
            "draw" => self.parse_draw(),
            "unset" => self.parse_unset(),
            "env" => self.traced("env", |p| {
                if p.command_end() {
                    return Ok(Node::Env);
                }
                let name = p.parse_assign("env var name")?;
                let value = p.parse_expr("")?;
                Ok(Node::SetEnv { name, value: Box::new(value) })
            }),
            "+" => self.parse_create(),
            "-" => self.parse_delete(),
            "=" => self.parse_select(),
            ".var:" => self.traced("variable assignment", |p| {
                let variable = p.parse_assign("var name")?;
                p.skip_whitespaces();
                let value = p.parse_value()?;
                Ok(Node::Assign { variable, value: Box::new(value) })
            }),
            ".cmds:" => self.traced("load", |p| {
                Ok(Node::Load(Box::new(p.parse_string("file path")?)))
            }),
            ".dryrun:" => self.traced("load", |p| {
                Ok(Node::DryLoad(Box::new(p.parse_string("file path")?)))
            }),
            "len" => self.traced("len", |p| Ok(Node::Len(p.parse_simple_word("variable")?))),
            "link" => self.parse_link(),
            "unlink" => self.traced("unlink", |p| Ok(Node::Unlink(p.parse_path("source")?))),
            "print" => self.traced("print", |p| Ok(Node::Print(Box::new(p.parse_value()?)))),
            "printf" => self.traced("printf", |p| {
                Ok(Node::Print(Box::new(p.parse_format_args()?)))
            }),
            "cd" => self.traced("cd", |p| {
                if p.command_end() {
                    return Ok(Node::Cd(PathNode::new(Node::string("/"))));
                }
                Ok(Node::Cd(p.parse_path("")?))
            }),
            "tree" => self.parse_tree(),
            "while" => self.parse_while(),
            "for" => self.parse_for(),
            "if" => self.parse_if(),
            "alias" => self.parse_alias(),
            _ => self.error("unknown keyword"),
        }
    }

    // =========================================================================
    // ARGUMENTS
    // =========================================================================

    fn parse_arg_value(&mut self) -> ParseResult<String> {
        self.traced("value", |p| {
            if p.parse_exact("\"") {
                let start = p.cursor();
                loop {
                    match p.peek() {
                        Some('"') => {
                            let value: String = p.buffer()[start..p.cursor()].iter().collect();
                            p.set_cursor(p.cursor() + 1);
                            return Ok(value);
                        }
                        Some(_) => p.set_cursor(p.cursor() + 1),
                        None => return p.error("\" opened but not closed"),
                    }
                }
            }
            p.skip_whitespaces();
            let start = p.cursor();
            while !p.parse_complex_word("")?.is_empty() {
                if !p.parse_exact(":") {
                    break;
                }
            }
            let value: String = p.buffer()[start..p.cursor()].iter().collect();
            Ok(value.trim().to_string())
        })
    }

    fn parse_single_arg(
        &mut self,
        allowed_args: &[&str],
        allowed_flags: &[&str],
    ) -> ParseResult<(String, String)> {
        self.traced("single argument", |p| {
            let arg = p.parse_simple_word("name")?;
            let value = if allowed_args.contains(&arg.as_str()) {
                p.parse_arg_value()?
            } else if allowed_flags.contains(&arg.as_str()) {
                String::new()
            } else {
                return p.error(format!("unexpected argument : {}", arg));
            };
            p.skip_whitespaces();
            Ok((arg, value))
        })
    }

    /// `-name value` and `-flag` arguments preceding the operands.
    pub(crate) fn parse_args(
        &mut self,
        allowed_args: &[&str],
        allowed_flags: &[&str],
        name: &str,
    ) -> ParseResult<HashMap<String, String>> {
        self.traced(&format!("{} arguments", name), |p| {
            let mut args = HashMap::new();
            p.skip_whitespaces();
            while p.parse_exact("-") {
                let (arg, value) = p.parse_single_arg(allowed_args, allowed_flags)?;
                args.insert(arg, value);
            }
            Ok(args)
        })
    }

    // =========================================================================
    // FILTERS
    // =========================================================================

    /// `attr=value, attr=value`
    pub(crate) fn parse_filters(&mut self) -> ParseResult<Filters> {
        let mut filters = Filters::new();
        let mut first = true;
        while !self.command_end() {
            self.skip_whitespaces();
            if !first {
                self.expect(",")?;
            }
            first = false;
            self.skip_whitespaces();
            let name = self.parse_assign("attribute name")?;
            let value = self.parse_value()?;
            filters.insert(name, value);
        }
        Ok(filters)
    }

    /// Complex filter expression; `a, b` stands for `(a) & (b)`.
    pub(crate) fn parse_complex_filters(&mut self) -> ParseResult<Filters> {
        let mut builder = FilterBuilder::default();
        let mut open_groups = 0;
        while !self.command_end() {
            self.skip_whitespaces();
            let fragment = self.parse_value()?;
            if self.parse_exact(",") {
                builder.push_literal("(");
                builder.push_node(fragment);
                builder.push_literal(") & (");
                open_groups += 1;
            } else {
                builder.push_node(fragment);
            }
            while self.parse_exact(")") {
                builder.push_literal(")");
            }
        }
        for _ in 0..open_groups {
            builder.push_literal(")");
        }
        let mut filters = Filters::new();
        if !builder.is_empty() {
            filters.insert(COMPLEX_FILTER_KEY.to_string(), builder.build());
        }
        Ok(filters)
    }

    fn parse_filters_for(&mut self, args: &HashMap<String, String>) -> ParseResult<Filters> {
        if self.parse_exact("-f") || args.contains_key("f") {
            self.parse_complex_filters()
        } else {
            self.parse_filters()
        }
    }

    // =========================================================================
    // HIERARCHY QUERIES
    // =========================================================================

    fn parse_ls(&mut self, category: &str) -> ParseResult<Node> {
        self.traced("ls", |p| {
            let args = p.parse_args(&["s", "a", "M", "m"], &["r", "f"], "ls")?;
            let path = p.parse_path("")?;
            let attributes = match args.get("a") {
                Some(list) => list.split(':').map(str::to_string).collect(),
                None => Vec::new(),
            };
            if let Node::Value(Value::String(text)) = path.path.as_ref() {
                if FILTER_LIKE_PATH.is_match(text) {
                    p.set_cursor(2);
                    return p.error("path expected");
                }
                if let Some(star) = text.find('*') {
                    let line: String = p.buffer().iter().collect();
                    let offset = line.find(text.as_str()).unwrap_or(0) + star;
                    let position = line[..offset].chars().count();
                    p.set_cursor(position.saturating_sub(1));
                    return p.error("unexpected character in path: '*'");
                }
            }
            p.skip_whitespaces();
            let mut filters = p.parse_filters_for(&args)?;
            if !category.is_empty() {
                filters.insert("category".to_string(), Node::string(category));
            }
            Ok(Node::Ls(Box::new(LsNode {
                path,
                filters,
                sort_attr: args.get("s").cloned(),
                attributes,
                recursive: recursive_args(&args),
            })))
        })
    }

    fn parse_get(&mut self) -> ParseResult<Node> {
        self.traced("get", |p| {
            let args = p.parse_args(&["m", "M"], &["r", "f"], "get")?;
            let path = p.parse_path("")?;
            let mut attributes = Vec::new();
            if p.parse_exact(":") {
                loop {
                    attributes.push(p.parse_complex_word("attribute")?);
                    if !p.parse_exact(",") {
                        break;
                    }
                }
            }
            p.skip_whitespaces();
            let filters = p.parse_filters_for(&args)?;
            Ok(Node::Get(Box::new(GetNode {
                path,
                filters,
                attributes,
                recursive: recursive_args(&args),
            })))
        })
    }

    fn parse_tree(&mut self) -> ParseResult<Node> {
        self.traced("tree", |p| {
            if p.command_end() {
                return Ok(Node::Tree { path: PathNode::new(Node::string(".")), depth: 1 });
            }
            let path = p.parse_path("")?;
            if p.command_end() {
                return Ok(Node::Tree { path, depth: 1 });
            }
            let depth = p.parse_int("depth")?;
            Ok(Node::Tree { path, depth })
        })
    }

    fn parse_draw(&mut self) -> ParseResult<Node> {
        self.traced("draw", |p| {
            let args = p.parse_args(&[], &["f"], "draw")?;
            let path = p.parse_path("")?;
            let depth = if p.command_end() { 0 } else { p.parse_int("depth")? };
            Ok(Node::Draw { path, depth, force: args.contains_key("f") })
        })
    }

    fn parse_unset(&mut self) -> ParseResult<Node> {
        self.traced("unset", |p| {
            let args = p.parse_args(&["f", "v"], &[], "unset")?;
            if let Some(name) = args.get("f") {
                return Ok(Node::UnsetFunc(name.clone()));
            }
            if let Some(name) = args.get("v") {
                return Ok(Node::UnsetVar(name.clone()));
            }
            p.error("an argument is mandatory: -f or -v")
        })
    }

    // =========================================================================
    // SELECTION & DELETION
    // =========================================================================

    fn parse_delete(&mut self) -> ParseResult<Node> {
        self.traced("delete", |p| {
            if p.parse_exact("selection") {
                return Ok(Node::DeleteSelection);
            }
            if p.command_end() {
                return p.error("path expected");
            }
            let path = p.parse_path("")?;
            if p.parse_exact(":") {
                let attribute = p.parse_attribute_name()?;
                return Ok(Node::DeleteAttr { path, attribute });
            }
            Ok(Node::DeleteObj(path))
        })
    }

    fn parse_select(&mut self) -> ParseResult<Node> {
        self.traced("=", |p| {
            if p.peek() == Some('{') {
                return Ok(Node::SelectChildren(p.parse_path_group()?));
            }
            if p.command_end() {
                return Ok(Node::SelectObject(Box::new(Node::string(""))));
            }
            Ok(Node::SelectObject(Box::new(Node::Path(p.parse_path("")?))))
        })
    }

    /// Attribute name, with `virtual_config.key` read as one name.
    pub(crate) fn parse_attribute_name(&mut self) -> ParseResult<String> {
        let mut attribute = self.parse_complex_word("attribute")?;
        if attribute == VIRTUAL_CONFIG {
            self.expect(".")?;
            let key = self.parse_complex_word("attribute")?;
            attribute = format!("{}.{}", attribute, key);
        }
        Ok(attribute)
    }
}

fn recursive_args(args: &HashMap<String, String>) -> RecursiveArgs {
    RecursiveArgs {
        is_recursive: args.contains_key("r"),
        min_depth: args.get("m").cloned(),
        max_depth: args.get("M").cloned(),
    }
}
