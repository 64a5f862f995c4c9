//! Parser module for the OCLI language
//!
//! This module contains the lexer and the backtracking parser that turn
//! one command line into an AST node.

pub mod types;
pub mod lexer;
pub mod parser;
pub mod command_parser;
pub mod compound_parser;
pub mod object_parser;

// Re-exports
pub use types::ParseError;
pub use lexer::{Lexer, LexerError, Token, TokenType};
pub use parser::{parse, ParseResult, Parser};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::*;

    #[test]
    fn test_parse_literals() {
        let cases = [
            ("print 42", Node::string("42")),
            ("print eval 42", Node::Value(Value::Int(42))),
            ("print eval 4.5", Node::Value(Value::Float(4.5))),
            ("print eval true", Node::Value(Value::Bool(true))),
            ("print \"hello world\"", Node::string("hello world")),
        ];
        for (input, expected) in cases {
            assert_eq!(parse(input).unwrap(), Node::Print(Box::new(expected)), "{}", input);
        }
    }

    #[test]
    fn test_operator_precedence() {
        let Node::Print(expr) = parse("print eval \"plouf\" + (3 - 4.2) * $ab").unwrap() else {
            panic!("print expected")
        };
        let Node::Arith { op: ArithOp::Add, left, right } = *expr else {
            panic!("addition at the root expected")
        };
        assert_eq!(*left, Node::string("plouf"));
        let Node::Arith { op: ArithOp::Mul, left: sub, right: var } = *right else {
            panic!("multiplication on the right expected")
        };
        assert!(matches!(*sub, Node::Arith { op: ArithOp::Sub, .. }));
        assert_eq!(*var, Node::SymbolReference("ab".to_string()));
    }

    #[test]
    fn test_logical_precedence() {
        let Node::Print(expr) = parse("print eval true || false && 1 < 2").unwrap() else {
            panic!("print expected")
        };
        let Node::Logical { op: LogicalOp::Or, right, .. } = *expr else {
            panic!("or at the root expected")
        };
        assert!(matches!(*right, Node::Logical { op: LogicalOp::And, .. }));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(
            parse("print eval -3").unwrap(),
            Node::Print(Box::new(Node::Negate(Box::new(Node::Value(Value::Int(3))))))
        );
        assert_eq!(
            parse("print eval !true").unwrap(),
            Node::Print(Box::new(Node::NegateBool(Box::new(Node::Value(Value::Bool(true))))))
        );
    }

    #[test]
    fn test_array_and_index() {
        assert_eq!(
            parse("print $a[1]").unwrap(),
            Node::Print(Box::new(Node::FormatString {
                format: Box::new(Node::string("%v[1]")),
                args: vec![Node::SymbolReference("a".to_string())],
            }))
        );
        assert_eq!(
            parse("print eval $a[1]").unwrap(),
            Node::Print(Box::new(Node::ArrayReference {
                variable: "a".to_string(),
                index: Box::new(Node::Value(Value::Int(1))),
            }))
        );
    }

    #[test]
    fn test_interpolated_eval() {
        let node = parse("print \"total: $((2 + 3))\"").unwrap();
        let Node::Print(inner) = node else { panic!("print expected") };
        let Node::FormatString { format, args } = *inner else {
            panic!("format string expected")
        };
        assert_eq!(*format, Node::string("total: %v"));
        assert!(matches!(args[0], Node::Arith { op: ArithOp::Add, .. }));
    }

    #[test]
    fn test_format_call() {
        let node = parse("printf \"%d racks\", 3").unwrap();
        assert_eq!(
            node,
            Node::Print(Box::new(Node::FormatString {
                format: Box::new(Node::string("%d racks")),
                args: vec![Node::Value(Value::Int(3))],
            }))
        );
        assert_eq!(
            parse("printf").unwrap_err().message,
            "format expects at least one argument"
        );
    }

    #[test]
    fn test_error_reports_rule_stack() {
        let err = parse("+bd:A@[1,2]@").unwrap_err();
        assert!(err.stack.iter().any(|s| s == "create building"));
        assert!(err.render(0).contains("parsing stack : "));
    }

    #[test]
    fn test_backtracking_restores_cursor() {
        let mut parser = Parser::new("orange");
        let keyword = parser.parse_keyword(&["or", "ordinal"]).unwrap();
        assert_eq!(keyword, "or");
        assert_eq!(parser.cursor(), 2);

        let mut parser = Parser::new("ord");
        let keyword = parser.parse_keyword(&["or", "ordinal"]).unwrap();
        assert_eq!(keyword, "");
        assert_eq!(parser.cursor(), 0);
        let again = parser.parse_keyword(&["or", "ordinal"]).unwrap();
        assert_eq!(again, "");
        assert_eq!(parser.cursor(), 0);
    }

    #[test]
    fn test_absent_flags_leave_cursor() {
        let mut parser = Parser::new("/Physical/BASIC");
        let args = parser.parse_args(&["s", "a", "M", "m"], &["r", "f"], "ls").unwrap();
        assert!(args.is_empty());
        assert_eq!(parser.cursor(), 0);

        let mut parser = Parser::new("-r -m 1 -M 3 /Physical/BASIC");
        let args = parser.parse_args(&["s", "a", "M", "m"], &["r", "f"], "ls").unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(parser.cursor(), 13);
    }

    #[test]
    fn test_ls_flags_are_optional() {
        let Node::Ls(plain) = parse("ls /Physical/BASIC").unwrap() else {
            panic!("ls expected")
        };
        let Node::Ls(flagged) = parse("ls -r -m 1 -M 3 /Physical/BASIC").unwrap() else {
            panic!("ls expected")
        };
        assert_eq!(plain.path, flagged.path);
        assert_eq!(plain.recursive, RecursiveArgs::default());
        assert_eq!(
            flagged.recursive,
            RecursiveArgs {
                is_recursive: true,
                min_depth: Some("1".to_string()),
                max_depth: Some("3".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_else_leaves_cursor() {
        let mut parser = Parser::new("el { print two }");
        assert_eq!(parser.parse_keyword(&["else", "elif"]).unwrap(), "");
        assert_eq!(parser.cursor(), 0);

        let node = parse("if $a == 1 { print one }").unwrap();
        assert!(matches!(node, Node::If { else_body: None, .. }));

        let err = parse("if $a == 1 { print one } el { print two }").unwrap_err();
        assert_eq!(err.message, "unexpected character");
        assert_eq!(err.cursor, 25);
    }

    #[test]
    fn test_device_trailing_fields_are_optional() {
        let short = parse("+dv:R1/D1@10@chassis").unwrap();
        let Node::Create(create) = short else { panic!("create expected") };
        let CreateNode::Device { size_u_or_template, invert_offset, side, .. } = *create else {
            panic!("device expected")
        };
        assert_eq!(*size_u_or_template, Node::string("chassis"));
        assert!(!invert_offset);
        assert!(side.is_none());

        let Node::Create(create) = parse("+dv:R1/D1@10@chassis@true").unwrap() else {
            panic!("create expected")
        };
        let CreateNode::Device { invert_offset, side, .. } = *create else {
            panic!("device expected")
        };
        assert!(invert_offset);
        assert!(side.is_none());
    }

    #[test]
    fn test_eval_and_substitution_are_told_apart() {
        let Node::Ls(ls) = parse("ls . height=$((1 + 2))").unwrap() else {
            panic!("ls expected")
        };
        let Node::FormatString { args, .. } = &ls.filters["height"] else {
            panic!("format expected")
        };
        assert!(matches!(args[0], Node::Arith { op: ArithOp::Add, .. }));

        let Node::Ls(ls) = parse("ls . height=$(pwd)").unwrap() else {
            panic!("ls expected")
        };
        assert_eq!(ls.filters["height"], Node::Pwd);

        let node = parse("print \"at $name\"").unwrap();
        let Node::Print(inner) = node else { panic!("print expected") };
        let Node::FormatString { format, args } = *inner else {
            panic!("format expected")
        };
        assert_eq!(*format, Node::string("at %v"));
        assert_eq!(args, vec![Node::SymbolReference("name".to_string())]);
    }
}
