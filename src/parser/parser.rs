//! Recursive Descent Parser for OCLI
//!
//! The parser works directly on the character buffer and pulls tokens
//! from the lexer in whatever mode the current rule needs. Each rule is
//! run through `traced`, which records where it started so the rule can
//! backtrack with `reset` and so errors can report the open rules.
//!
//! Grammar (simplified):
//!   command      ::= single (';' single)*
//!   single       ::= keyword args | funcname | update
//!   value        ::= 'eval' expr | '[' expr | '$(' command ')' | string
//!   string       ::= '"' text '"' | format(...) | unquoted text
//!   expr         ::= unary (binop unary)*

use crate::ast::types::{ArithOp, CompareOp, EqualityOp, LogicalOp, Node, PathNode, Value};
use crate::parser::lexer::{Lexer, LexerError, Literal, TextMode, Token, TokenType};
use crate::parser::types::{ParseError, COMMENT_MARKER};

pub type ParseResult<T> = Result<T, ParseError>;

pub(crate) fn is_alnum(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_complex_word_char(c: char) -> bool {
    is_alnum(c) || c == '-' || c == '+'
}

/// Parser state over one command line
pub struct Parser {
    buf: Vec<char>,
    cursor: usize,
    /// Open rules as (start cursor, name)
    stack: Vec<(usize, String)>,
    /// Last lexed token, kept for `unlex`
    tok: Option<Token>,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            buf: input.chars().collect(),
            cursor: 0,
            stack: Vec::new(),
            tok: None,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Parse the whole buffer as one command line.
    pub fn parse(&mut self) -> ParseResult<Node> {
        let node = self.parse_command("")?;
        if !self.command_end() {
            return self.error("unexpected character");
        }
        Ok(node)
    }

    // =========================================================================
    // CURSOR & TRACE
    // =========================================================================

    /// Run a rule, recording its start for backtracking and error reports.
    pub(crate) fn traced<T>(
        &mut self,
        name: &str,
        rule: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.stack.push((self.cursor, name.to_string()));
        let result = rule(self);
        self.stack.pop();
        result
    }

    fn rule_start(&self) -> usize {
        self.stack.last().map(|(cursor, _)| *cursor).unwrap_or(0)
    }

    /// Move back to the start of the current rule.
    pub(crate) fn reset(&mut self) {
        self.cursor = self.rule_start();
        self.tok = None;
    }

    /// Text consumed since the start of the current rule.
    pub(crate) fn item(&self) -> String {
        let end = self.cursor.min(self.buf.len());
        let start = self.rule_start().min(end);
        self.buf[start..end].iter().collect()
    }

    pub(crate) fn error<T>(&self, message: impl Into<String>) -> ParseResult<T> {
        Err(self.make_error(message))
    }

    fn make_error(&self, message: impl Into<String>) -> ParseError {
        let stack = self.stack.iter().map(|(_, name)| name.clone()).collect();
        ParseError::new(message, self.cursor, stack)
    }

    fn lexer_error(&mut self, e: LexerError) -> ParseError {
        self.cursor = e.position;
        self.make_error(e.message)
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.buf.get(self.cursor).copied()
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    pub(crate) fn buffer(&self) -> &[char] {
        &self.buf
    }

    fn starts_with(&self, word: &str) -> bool {
        let mut i = self.cursor;
        for c in word.chars() {
            if self.buf.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    pub(crate) fn skip_whitespaces(&mut self) -> usize {
        let mut n = 0;
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\n')) {
            self.cursor += 1;
            n += 1;
        }
        n
    }

    /// Skips whitespace and reports whether the current command is over.
    pub(crate) fn command_end(&mut self) -> bool {
        self.skip_whitespaces();
        match self.peek() {
            None => true,
            Some(c) => ";})]".contains(c),
        }
    }

    pub(crate) fn parse_exact(&mut self, word: &str) -> bool {
        if self.starts_with(word) {
            self.cursor += word.chars().count();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, word: &str) -> ParseResult<()> {
        if self.parse_exact(word) {
            Ok(())
        } else {
            self.error(format!("{} expected", word))
        }
    }

    fn scan_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.cursor;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.cursor += 1;
        }
        self.buf[start..self.cursor].iter().collect()
    }

    // =========================================================================
    // TOKENS
    // =========================================================================

    pub(crate) fn next_expr_token(&mut self) -> ParseResult<Token> {
        let mut lexer = Lexer::new(&self.buf, self.cursor);
        let result = lexer.next_expr_token();
        let position = lexer.position();
        match result {
            Ok(tok) => {
                self.cursor = position;
                self.tok = Some(tok.clone());
                Ok(tok)
            }
            Err(e) => Err(self.lexer_error(e)),
        }
    }

    fn next_text_token(&mut self, mode: TextMode) -> ParseResult<Token> {
        let mut lexer = Lexer::new(&self.buf, self.cursor);
        let result = lexer.next_text_token(mode);
        let position = lexer.position();
        match result {
            Ok(tok) => {
                self.cursor = position;
                self.tok = Some(tok.clone());
                Ok(tok)
            }
            Err(e) => Err(self.lexer_error(e)),
        }
    }

    /// Give back the last lexed token.
    pub(crate) fn unlex(&mut self) {
        if let Some(tok) = self.tok.take() {
            self.cursor = tok.start;
        }
    }

    // =========================================================================
    // WORDS
    // =========================================================================

    /// Longest match among `candidates`, or empty with the cursor restored.
    pub(crate) fn parse_keyword(&mut self, candidates: &[&str]) -> ParseResult<String> {
        self.traced("keyword", |p| {
            while p.cursor < p.buf.len() {
                p.cursor += 1;
                let item = p.item();
                if !candidates.iter().any(|c| c.starts_with(item.as_str())) {
                    p.cursor -= 1;
                    break;
                }
            }
            let item = p.item();
            if candidates.contains(&item.as_str()) {
                return Ok(item);
            }
            p.reset();
            Ok(String::new())
        })
    }

    pub(crate) fn parse_simple_word(&mut self, name: &str) -> ParseResult<String> {
        self.traced(name, |p| {
            p.skip_whitespaces();
            let word = p.scan_while(is_alnum);
            p.skip_whitespaces();
            Ok(word)
        })
    }

    pub(crate) fn parse_complex_word(&mut self, name: &str) -> ParseResult<String> {
        self.skip_whitespaces();
        self.traced(name, |p| {
            let word = p.scan_while(is_complex_word_char);
            p.skip_whitespaces();
            Ok(word)
        })
    }

    pub(crate) fn parse_int(&mut self, name: &str) -> ParseResult<i64> {
        self.traced(name, |p| {
            p.skip_whitespaces();
            let tok = p.next_expr_token()?;
            let value = match (tok.token_type, &tok.literal) {
                (TokenType::Int, Literal::Int(i)) => *i,
                _ => return p.error("integer expected"),
            };
            p.skip_whitespaces();
            Ok(value)
        })
    }

    pub(crate) fn parse_bool(&mut self) -> ParseResult<bool> {
        self.traced("bool", |p| {
            p.skip_whitespaces();
            let tok = p.next_expr_token()?;
            let value = match (tok.token_type, &tok.literal) {
                (TokenType::Bool, Literal::Bool(b)) => *b,
                _ => return p.error("boolean expected"),
            };
            p.skip_whitespaces();
            Ok(value)
        })
    }

    /// `var =`
    pub(crate) fn parse_assign(&mut self, left_name: &str) -> ParseResult<String> {
        self.traced("assign", |p| {
            let name = p.parse_simple_word(left_name)?;
            p.expect("=")?;
            Ok(name)
        })
    }

    // =========================================================================
    // TEXT & PATHS
    // =========================================================================

    /// Raw text with `$var` and `$((expr))` interpolations.
    pub(crate) fn parse_text(
        &mut self,
        mode: TextMode,
        trim: bool,
        is_vec_str: bool,
    ) -> ParseResult<Node> {
        self.traced("", |p| {
            let mut plain = String::new();
            let mut format = String::new();
            let mut args = Vec::new();
            loop {
                let tok = p.next_text_token(mode)?;
                match tok.token_type {
                    TokenType::Text => {
                        let text = tok.text();
                        if is_vec_str {
                            if let Some(idx) = text.find(']') {
                                let head = &text[..idx];
                                p.cursor = tok.start + head.chars().count();
                                plain.push_str(head);
                                format.push_str(&head.replace('%', "%%"));
                                break;
                            }
                        }
                        plain.push_str(text);
                        format.push_str(&text.replace('%', "%%"));
                    }
                    TokenType::Deref => {
                        format.push_str("%v");
                        args.push(Node::SymbolReference(tok.text().to_string()));
                    }
                    TokenType::LeftEval => {
                        format.push_str("%v");
                        args.push(p.parse_expr("")?);
                        p.expect("))")?;
                    }
                    TokenType::Eof => break,
                    _ => return p.error("unexpected token"),
                }
            }
            if args.is_empty() {
                let text = if trim { plain.trim_matches(&[' ', '\t', '\n'][..]).to_string() } else { plain };
                return Ok(Node::string(text));
            }
            let format = if trim { format.trim_matches(&[' ', '\t', '\n'][..]).to_string() } else { format };
            Ok(Node::FormatString {
                format: Box::new(Node::string(format)),
                args,
            })
        })
    }

    pub(crate) fn parse_path(&mut self, name: &str) -> ParseResult<PathNode> {
        let rule = if name.is_empty() {
            "path".to_string()
        } else {
            format!("{} path", name)
        };
        self.traced(&rule, |p| {
            p.skip_whitespaces();
            let path = p.parse_text(TextMode::Path, true, false)?;
            p.skip_whitespaces();
            Ok(PathNode::new(path))
        })
    }

    pub(crate) fn parse_path_or_selection(&mut self, name: &str) -> ParseResult<PathNode> {
        let mut path = self.parse_path(name)?;
        path.accept_selection = true;
        Ok(path)
    }

    /// `{path, path, ...}`
    pub(crate) fn parse_path_group(&mut self) -> ParseResult<Vec<PathNode>> {
        self.traced("path group", |p| {
            let mut paths = Vec::new();
            p.skip_whitespaces();
            p.expect("{")?;
            p.skip_whitespaces();
            if p.parse_exact("}") {
                return Ok(paths);
            }
            loop {
                paths.push(p.parse_path("")?);
                p.skip_whitespaces();
                if p.parse_exact("}") {
                    break;
                }
                if !p.parse_exact(",") {
                    return p.error(", or } expected");
                }
            }
            p.skip_whitespaces();
            Ok(paths)
        })
    }

    // =========================================================================
    // EXPRESSIONS
    // =========================================================================

    pub(crate) fn parse_expr_list(&mut self) -> ParseResult<Vec<Node>> {
        self.traced("expr list", |p| {
            let mut list = Vec::new();
            let first = p.next_expr_token()?;
            p.unlex();
            if first.token_type == TokenType::RightBrac || p.command_end() {
                return Ok(list);
            }
            loop {
                list.push(p.parse_expr("array element")?);
                if p.command_end() {
                    return Ok(list);
                }
                let tok = p.next_expr_token()?;
                if tok.token_type != TokenType::Comma {
                    return p.error("comma or end of command expected");
                }
            }
        })
    }

    /// Arguments of `format(...)` and `printf`.
    pub(crate) fn parse_format_args(&mut self) -> ParseResult<Node> {
        let mut list = self.parse_expr_list()?;
        if list.is_empty() {
            return self.error("format expects at least one argument");
        }
        let format = list.remove(0);
        Ok(Node::FormatString {
            format: Box::new(format),
            args: list,
        })
    }

    fn parse_primary_expr(&mut self) -> ParseResult<Node> {
        self.traced("", |p| {
            let tok = p.next_expr_token()?;
            match (tok.token_type, tok.literal.clone()) {
                (TokenType::Bool, Literal::Bool(b)) => Ok(Node::Value(Value::Bool(b))),
                (TokenType::Int, Literal::Int(i)) => Ok(Node::Value(Value::Int(i))),
                (TokenType::Float, Literal::Float(f)) => Ok(Node::Value(Value::Float(f))),
                (TokenType::DoubleQuote, _) => {
                    let node = p.parse_text(TextMode::Quoted, false, false)?;
                    p.expect("\"")?;
                    Ok(node)
                }
                (TokenType::Deref, Literal::Str(name)) => {
                    let next = p.next_expr_token()?;
                    if next.token_type == TokenType::LeftBrac {
                        let index = p.parse_expr("index")?;
                        let close = p.next_expr_token()?;
                        if close.token_type != TokenType::RightBrac {
                            return p.error("square bracket opened but not closed");
                        }
                        return Ok(Node::ArrayReference {
                            variable: name,
                            index: Box::new(index),
                        });
                    }
                    p.unlex();
                    Ok(Node::SymbolReference(name))
                }
                (TokenType::LeftParen, _) => {
                    let expr = p.parse_expr("")?;
                    let end = p.next_expr_token()?;
                    if end.token_type != TokenType::RightParen {
                        return p.error(format!(") expected, got {}", end.value));
                    }
                    Ok(expr)
                }
                (TokenType::LeftBrac, _) => {
                    let list = p.parse_expr_list()?;
                    let end = p.next_expr_token()?;
                    if end.token_type != TokenType::RightBrac {
                        return p.error("']' expected");
                    }
                    Ok(Node::Array(list))
                }
                (TokenType::Format, _) => {
                    let open = p.next_expr_token()?;
                    if open.token_type != TokenType::LeftParen {
                        return p.error("'(' expected");
                    }
                    let node = p.parse_format_args()?;
                    let close = p.next_expr_token()?;
                    if close.token_type != TokenType::RightParen {
                        return p.error("')' expected");
                    }
                    Ok(node)
                }
                _ => p.error(format!("unexpected token : {}", tok.value)),
            }
        })
    }

    fn parse_unary_expr(&mut self) -> ParseResult<Node> {
        self.traced("", |p| {
            let tok = p.next_expr_token()?;
            match tok.token_type {
                TokenType::Add => p.parse_unary_expr(),
                TokenType::Sub => Ok(Node::Negate(Box::new(p.parse_unary_expr()?))),
                TokenType::Not => Ok(Node::NegateBool(Box::new(p.parse_unary_expr()?))),
                _ => {
                    p.unlex();
                    p.parse_primary_expr()
                }
            }
        })
    }

    fn parse_binary_expr(&mut self, left: Option<Node>, precedence: u8) -> ParseResult<Node> {
        self.traced("", |p| {
            let mut left = match left {
                Some(node) => node,
                None => p.parse_unary_expr()?,
            };
            loop {
                let operator = p.next_expr_token()?;
                let op_precedence = operator.precedence();
                if op_precedence < precedence || operator.token_type == TokenType::Not {
                    p.unlex();
                    return Ok(left);
                }
                let right = p.parse_binary_expr(None, op_precedence + 1)?;
                left = binary_node(operator.token_type, left, right);
            }
        })
    }

    pub(crate) fn parse_expr(&mut self, name: &str) -> ParseResult<Node> {
        self.traced(name, |p| {
            let node = p.parse_binary_expr(None, 1)?;
            p.skip_whitespaces();
            Ok(node)
        })
    }

    // =========================================================================
    // VALUES
    // =========================================================================

    pub(crate) fn parse_string(&mut self, name: &str) -> ParseResult<Node> {
        self.traced(name, |p| {
            p.skip_whitespaces();
            if p.starts_with("\"") || p.starts_with("format") {
                return p.parse_expr("");
            }
            let node = p.parse_text(TextMode::Unquoted, true, false)?;
            p.skip_whitespaces();
            Ok(node)
        })
    }

    /// Command argument: expression, command substitution or string.
    pub(crate) fn parse_value(&mut self) -> ParseResult<Node> {
        self.traced("value", |p| {
            p.skip_whitespaces();
            if p.parse_exact("eval ") {
                return p.parse_expr("");
            }
            if p.starts_with("[") {
                return p.parse_expr("");
            }
            if !p.starts_with("$((") && p.parse_exact("$(") {
                let node = p.parse_command("")?;
                p.expect(")")?;
                return Ok(node);
            }
            p.reset();
            p.parse_string("")
        })
    }

    pub(crate) fn parse_string_or_vec(&mut self, name: &str) -> ParseResult<Node> {
        self.traced(name, |p| {
            p.skip_whitespaces();
            if p.starts_with("[") {
                return p.parse_expr("");
            }
            p.parse_string("")
        })
    }

    pub(crate) fn parse_string_or_vec_str(&mut self, name: &str) -> ParseResult<Vec<Node>> {
        self.traced(name, |p| {
            p.skip_whitespaces();
            if p.parse_exact("[") {
                return p.parse_vec_str_elems("vec str elems");
            }
            Ok(vec![p.parse_string("")?])
        })
    }

    pub(crate) fn parse_vec_str(&mut self, name: &str) -> ParseResult<Vec<Node>> {
        self.traced(name, |p| {
            p.skip_whitespaces();
            if !p.parse_exact("[") {
                return p.error("[ expected");
            }
            p.parse_vec_str_elems("vec str elems")
        })
    }

    fn parse_vec_str_elems(&mut self, name: &str) -> ParseResult<Vec<Node>> {
        self.traced(name, |p| {
            let mut elems = Vec::new();
            loop {
                p.skip_whitespaces();
                elems.push(p.parse_text(TextMode::Unquoted, true, true)?);
                if !p.parse_exact(",") {
                    break;
                }
            }
            if !p.parse_exact("]") {
                return p.error("] expected");
            }
            p.skip_whitespaces();
            Ok(elems)
        })
    }

    // =========================================================================
    // COMMAND SEQUENCES
    // =========================================================================

    /// Commands separated by `;`.
    pub(crate) fn parse_command(&mut self, name: &str) -> ParseResult<Node> {
        self.traced(name, |p| {
            let mut commands = Vec::new();
            loop {
                let command = p.parse_single_command()?;
                commands.push(command);
                p.skip_whitespaces();
                if !p.parse_exact(";") {
                    break;
                }
                p.skip_whitespaces();
            }
            if commands.len() > 1 {
                return Ok(Node::Sequence(commands.into_iter().flatten().collect()));
            }
            Ok(commands.pop().flatten().unwrap_or_else(Node::empty))
        })
    }
}

fn binary_node(token_type: TokenType, left: Node, right: Node) -> Node {
    let (left, right) = (Box::new(left), Box::new(right));
    let arith_op = match token_type {
        TokenType::Add => Some(ArithOp::Add),
        TokenType::Sub => Some(ArithOp::Sub),
        TokenType::Mul => Some(ArithOp::Mul),
        TokenType::Div => Some(ArithOp::Div),
        TokenType::IntDiv => Some(ArithOp::IntDiv),
        TokenType::Mod => Some(ArithOp::Mod),
        _ => None,
    };
    if let Some(op) = arith_op {
        return Node::Arith { op, left, right };
    }
    match token_type {
        TokenType::Or => Node::Logical { op: LogicalOp::Or, left, right },
        TokenType::And => Node::Logical { op: LogicalOp::And, left, right },
        TokenType::Eq => Node::Equality { op: EqualityOp::Eq, left, right },
        TokenType::Neq => Node::Equality { op: EqualityOp::Neq, left, right },
        TokenType::Lss => Node::Comparator { op: CompareOp::Lss, left, right },
        TokenType::Leq => Node::Comparator { op: CompareOp::Leq, left, right },
        TokenType::Gtr => Node::Comparator { op: CompareOp::Gtr, left, right },
        _ => Node::Comparator { op: CompareOp::Geq, left, right },
    }
}

/// Parse one line of OCLI input. Text after `//` is a comment.
pub fn parse(input: &str) -> Result<Node, ParseError> {
    let line = match input.find(COMMENT_MARKER) {
        Some(idx) => &input[..idx],
        None => input,
    };
    Parser::new(line).parse()
}
