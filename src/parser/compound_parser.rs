//! Compound Command Parsing
//!
//! Handles `while`, `for`, `if`/`elif`/`else` and `alias` definitions.
//! Bodies are command sequences closed by `}`.

use crate::ast::types::Node;
use crate::parser::parser::{ParseResult, Parser};

impl Parser {
    fn parse_body(&mut self, name: &str) -> ParseResult<Node> {
        let body = self.parse_command(name)?;
        self.skip_whitespaces();
        self.expect("}")?;
        Ok(body)
    }

    pub(crate) fn parse_while(&mut self) -> ParseResult<Node> {
        self.traced("while", |p| {
            let condition = p.parse_expr("condition")?;
            p.expect("{")?;
            let body = p.parse_body("body")?;
            Ok(Node::While {
                condition: Box::new(condition),
                body: Box::new(body),
            })
        })
    }

    /// `for i in start..end {}` or `for x in <vector> {}`
    pub(crate) fn parse_for(&mut self) -> ParseResult<Node> {
        self.traced("for", |p| {
            let variable = p.parse_simple_word("variable")?;
            p.expect("in")?;
            let start = p.parse_expr("start index")?;
            if !p.parse_exact("..") {
                p.expect("{")?;
                let body = p.parse_body("body")?;
                return Ok(Node::ForArray {
                    variable,
                    array: Box::new(start),
                    body: Box::new(body),
                });
            }
            let end = p.parse_expr("end index")?;
            p.expect("{")?;
            let body = p.parse_body("body")?;
            Ok(Node::ForRange {
                variable,
                start: Box::new(start),
                end: Box::new(end),
                body: Box::new(body),
            })
        })
    }

    pub(crate) fn parse_if(&mut self) -> ParseResult<Node> {
        self.traced("if", |p| {
            let condition = p.parse_expr("condition")?;
            p.expect("{")?;
            let body = p.parse_command("if body")?;
            p.expect("}")?;
            p.skip_whitespaces();
            let else_body = match p.parse_keyword(&["else", "elif"])?.as_str() {
                "else" => {
                    p.skip_whitespaces();
                    p.expect("{")?;
                    Some(Box::new(p.parse_body("else body")?))
                }
                "elif" => Some(Box::new(p.parse_if()?)),
                _ => None,
            };
            Ok(Node::If {
                condition: Box::new(condition),
                body: Box::new(body),
                else_body,
            })
        })
    }

    pub(crate) fn parse_alias(&mut self) -> ParseResult<Node> {
        self.traced("alias", |p| {
            let name = p.parse_simple_word("name")?;
            p.expect("{")?;
            p.skip_whitespaces();
            let body = p.parse_body("body")?;
            Ok(Node::FuncDef {
                name,
                body: Box::new(body),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::types::*;
    use crate::parser::parse;

    #[test]
    fn test_parse_while() {
        let node = parse("while $i < 3 { .var:i=eval $i+1 }").unwrap();
        let Node::While { condition, body } = node else { panic!("while expected") };
        assert!(matches!(*condition, Node::Comparator { op: CompareOp::Lss, .. }));
        assert!(matches!(*body, Node::Assign { .. }));
    }

    #[test]
    fn test_parse_for_range() {
        let node = parse("for i in 0..3 { print $i }").unwrap();
        let Node::ForRange { variable, start, end, .. } = node else {
            panic!("for expected")
        };
        assert_eq!(variable, "i");
        assert_eq!(*start, Node::Value(Value::Int(0)));
        assert_eq!(*end, Node::Value(Value::Int(3)));
    }

    #[test]
    fn test_parse_for_array() {
        let node = parse("for x in [1, 2] { print $x }").unwrap();
        let Node::ForArray { array, .. } = node else { panic!("for expected") };
        assert!(matches!(*array, Node::Array(ref items) if items.len() == 2));
    }

    #[test]
    fn test_parse_if_elif_else() {
        let node = parse("if $a == 1 { print one } elif $a == 2 { print two } else { print other }")
            .unwrap();
        let Node::If { else_body: Some(elif), .. } = node else { panic!("if expected") };
        let Node::If { else_body: Some(other), .. } = *elif else { panic!("elif expected") };
        assert!(matches!(*other, Node::Print(_)));
    }

    #[test]
    fn test_parse_if_without_else() {
        let node = parse("if true { pwd }").unwrap();
        assert!(matches!(node, Node::If { else_body: None, .. }));
    }

    #[test]
    fn test_parse_alias() {
        let node = parse("alias hello { print hi; pwd }").unwrap();
        let Node::FuncDef { name, body } = node else { panic!("alias expected") };
        assert_eq!(name, "hello");
        assert!(matches!(*body, Node::Sequence(ref cmds) if cmds.len() == 2));
    }

    #[test]
    fn test_unclosed_body() {
        let err = parse("while true { pwd").unwrap_err();
        assert_eq!(err.message, "} expected");
    }
}
