//! Lexer for the OCLI language
//!
//! The lexer hands out one token at a time from a cursor owned by the
//! parser, so the parser can change lexing mode between two calls:
//! - expression mode: literals, operators, brackets and `$` references
//! - text modes (unquoted, quoted, path): raw text up to a stop set,
//!   with `$name`, `${name}` and `$((` split out as their own tokens

use std::fmt;

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Token types for the OCLI lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Eof,
    Deref,
    Int,
    Float,
    Bool,
    DoubleQuote,
    LeftBrac,
    RightBrac,
    Comma,
    SemiCol,
    At,
    LeftParen,
    RightParen,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Or,
    And,
    Eq,
    Neq,
    Leq,
    Geq,
    Gtr,
    Lss,
    Text,
    LeftEval,
    Format,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "eof",
            Self::Deref => "deref",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::DoubleQuote => "doubleQuote",
            Self::LeftBrac => "leftBrac",
            Self::RightBrac => "rightBrac",
            Self::Comma => "comma",
            Self::SemiCol => "semicol",
            Self::At => "at",
            Self::LeftParen => "leftParen",
            Self::RightParen => "rightParen",
            Self::Not => "not",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::IntDiv => "intdiv",
            Self::Mod => "mod",
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Leq => "leq",
            Self::Geq => "geq",
            Self::Gtr => "gtr",
            Self::Lss => "lss",
            Self::Text => "text",
            Self::LeftEval => "leftEval",
            Self::Format => "format",
        }
    }

    /// Binding strength of a binary operator, 0 for anything else.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Eq | Self::Neq | Self::Lss | Self::Leq | Self::Gtr | Self::Geq => 3,
            Self::Add | Self::Sub => 4,
            Self::Mul | Self::Div | Self::IntDiv | Self::Mod => 5,
            Self::Not => 6,
            _ => 0,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Literal payload carried by a token
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Text content, or the variable name of a deref
    Str(String),
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    /// Raw source text of the token
    pub value: String,
    pub literal: Literal,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(token_type: TokenType, value: String, start: usize, end: usize) -> Self {
        Self {
            token_type,
            value,
            literal: Literal::None,
            start,
            end,
        }
    }

    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = literal;
        self
    }

    pub fn precedence(&self) -> u8 {
        self.token_type.precedence()
    }

    /// Text or variable name held by the token, empty otherwise.
    pub fn text(&self) -> &str {
        match &self.literal {
            Literal::Str(s) => s,
            _ => "",
        }
    }
}

/// Lexer error
#[derive(Debug, Clone)]
pub struct LexerError {
    pub message: String,
    /// Cursor position when the error was raised
    pub position: usize,
}

impl LexerError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LexerError {}

/// Stop sets of the text lexing modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// Bare words in command arguments
    Unquoted,
    /// Inside double quotes
    Quoted,
    /// Object paths
    Path,
}

impl TextMode {
    pub fn stop_chars(&self) -> &'static str {
        match self {
            Self::Unquoted => "@;,})",
            Self::Quoted => "\"",
            Self::Path => " @;,}):",
        }
    }
}

/// Two-character operators, checked before single characters
const TWO_CHAR_OPS: &[(&str, TokenType)] = &[
    ("||", TokenType::Or),
    ("&&", TokenType::And),
    ("==", TokenType::Eq),
    ("!=", TokenType::Neq),
    ("<=", TokenType::Leq),
    (">=", TokenType::Geq),
];

/// Words recognized as keywords in expression mode
const EXPR_KEYWORDS: &[(&str, TokenType)] = &[
    ("true", TokenType::Bool),
    ("false", TokenType::Bool),
    ("format", TokenType::Format),
];

lazy_static! {
    static ref SINGLE_CHAR_TOKENS: HashMap<char, TokenType> = {
        let mut m = HashMap::new();
        m.insert('"', TokenType::DoubleQuote);
        m.insert('[', TokenType::LeftBrac);
        m.insert(']', TokenType::RightBrac);
        m.insert(',', TokenType::Comma);
        m.insert(';', TokenType::SemiCol);
        m.insert('@', TokenType::At);
        m.insert('(', TokenType::LeftParen);
        m.insert(')', TokenType::RightParen);
        m.insert('+', TokenType::Add);
        m.insert('-', TokenType::Sub);
        m.insert('*', TokenType::Mul);
        m.insert('/', TokenType::Div);
        m.insert('\\', TokenType::IntDiv);
        m.insert('%', TokenType::Mod);
        m.insert('!', TokenType::Not);
        m.insert('<', TokenType::Lss);
        m.insert('>', TokenType::Gtr);
        m
    };
}

fn is_alnum(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_letter(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

const DIGITS: &str = "0123456789_";

/// Lexer over a shared character buffer
pub struct Lexer<'a> {
    input: &'a [char],
    start: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [char], pos: usize) -> Self {
        Self {
            input,
            start: pos,
            pos,
        }
    }

    /// Cursor position after the last token.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn starts_with(&self, word: &str) -> bool {
        word.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn accept_run<F: Fn(char) -> bool>(&mut self, pred: F) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += 1;
        }
    }

    fn item(&self) -> String {
        self.input[self.start..self.pos].iter().collect()
    }

    fn emit(&self, token_type: TokenType) -> Token {
        Token::new(token_type, self.item(), self.start, self.pos)
    }

    fn eof(&self) -> Token {
        Token::new(TokenType::Eof, String::new(), self.start, self.start)
    }

    /// Lex one token in expression mode.
    pub fn next_expr_token(&mut self) -> Result<Token, LexerError> {
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.pos += 1;
        }
        self.start = self.pos;

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(self.eof()),
        };

        if c == '$' {
            self.pos += 1;
            return self.lex_deref();
        }

        for (op, token_type) in TWO_CHAR_OPS {
            if self.starts_with(op) {
                self.pos += 2;
                return Ok(self.emit(*token_type));
            }
        }
        // a lone `|`, `&` or `=` ends the expression
        if matches!(c, '|' | '&' | '=') {
            return Ok(self.eof());
        }
        if let Some(token_type) = SINGLE_CHAR_TOKENS.get(&c) {
            self.pos += 1;
            return Ok(self.emit(*token_type));
        }

        if c.is_ascii_digit() || c == '.' {
            return self.lex_number();
        }

        for (word, token_type) in EXPR_KEYWORDS {
            if self.starts_with(word) {
                self.pos += word.chars().count();
                let token = self.emit(*token_type);
                return Ok(match token_type {
                    TokenType::Bool => token.with_literal(Literal::Bool(*word == "true")),
                    _ => token,
                });
            }
        }

        Ok(self.eof())
    }

    /// Lex one token of raw text in the given mode.
    pub fn next_text_token(&mut self, mode: TextMode) -> Result<Token, LexerError> {
        self.start = self.pos;
        self.lex_text(mode)
    }

    fn lex_text(&mut self, mode: TextMode) -> Result<Token, LexerError> {
        if self.pos == self.start && self.peek() == Some('$') {
            self.pos += 1;
            return self.lex_deref();
        }
        let stops = mode.stop_chars();
        self.accept_run(|c| c != '$' && !stops.contains(c));
        if self.pos == self.start {
            return Ok(self.eof());
        }
        let text = self.item();
        Ok(self.emit(TokenType::Text).with_literal(Literal::Str(text)))
    }

    fn lex_deref(&mut self) -> Result<Token, LexerError> {
        if self.peek() == Some('{') {
            self.pos += 1;
            let name_start = self.pos;
            self.accept_run(|c| c == ' ');
            self.accept_run(is_alnum);
            self.accept_run(|c| c == ' ');
            let name: String = self.input[name_start..self.pos].iter().collect();
            if self.peek() != Some('}') {
                return Err(LexerError::new("} expected", self.pos));
            }
            self.pos += 1;
            let name = name.trim().to_string();
            return Ok(self.emit(TokenType::Deref).with_literal(Literal::Str(name)));
        }
        if self.starts_with("((") {
            self.pos += 2;
            return Ok(self.emit(TokenType::LeftEval));
        }
        match self.peek() {
            Some(c) if is_alnum(c) => {}
            _ => return Err(LexerError::new("identifier expected", self.pos)),
        }
        let name_start = self.pos;
        self.accept_run(is_alnum);
        let name: String = self.input[name_start..self.pos].iter().collect();
        Ok(self.emit(TokenType::Deref).with_literal(Literal::Str(name)))
    }

    fn lex_number(&mut self) -> Result<Token, LexerError> {
        self.accept_run(|c| DIGITS.contains(c));
        if self.peek() == Some('.') {
            if self.peek_at(1) == Some('.') {
                // range operator, the number stops before it
                if self.pos == self.start {
                    return Ok(self.eof());
                }
                return self.end_int();
            }
            self.pos += 1;
            self.accept_run(|c| DIGITS.contains(c));
            if self.continues_as_text() {
                return self.lex_text(TextMode::Unquoted);
            }
            let item = self.item();
            let value: f64 = item
                .parse()
                .map_err(|_| LexerError::new("invalid float", self.pos))?;
            return Ok(self.emit(TokenType::Float).with_literal(Literal::Float(value)));
        }
        self.end_int()
    }

    fn end_int(&mut self) -> Result<Token, LexerError> {
        if self.continues_as_text() {
            return self.lex_text(TextMode::Unquoted);
        }
        let item = self.item();
        let value: i64 = item
            .parse()
            .map_err(|_| LexerError::new("invalid integer", self.pos))?;
        Ok(self.emit(TokenType::Int).with_literal(Literal::Int(value)))
    }

    /// A number directly followed by a letter is a bare word like `5U`.
    fn continues_as_text(&self) -> bool {
        self.peek().map(is_letter).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn expr_tokens(s: &str) -> Vec<TokenType> {
        let input = chars(s);
        let mut lexer = Lexer::new(&input, 0);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_expr_token().unwrap();
            if tok.token_type == TokenType::Eof {
                break;
            }
            out.push(tok.token_type);
        }
        out
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            expr_tokens("1 + 2 * 3"),
            vec![TokenType::Int, TokenType::Add, TokenType::Int, TokenType::Mul, TokenType::Int]
        );
        assert_eq!(
            expr_tokens("a"),
            Vec::<TokenType>::new()
        );
        assert_eq!(
            expr_tokens("!true || false && 1 != 2"),
            vec![
                TokenType::Not,
                TokenType::Bool,
                TokenType::Or,
                TokenType::Bool,
                TokenType::And,
                TokenType::Int,
                TokenType::Neq,
                TokenType::Int
            ]
        );
    }

    #[test]
    fn test_single_equal_ends_expression() {
        let input = chars("3 = 4");
        let mut lexer = Lexer::new(&input, 0);
        assert_eq!(lexer.next_expr_token().unwrap().token_type, TokenType::Int);
        let tok = lexer.next_expr_token().unwrap();
        assert_eq!(tok.token_type, TokenType::Eof);
        assert_eq!(tok.start, 2);
    }

    #[test]
    fn test_numbers() {
        let input = chars("42 4.5 .5");
        let mut lexer = Lexer::new(&input, 0);
        assert_eq!(lexer.next_expr_token().unwrap().literal, Literal::Int(42));
        assert_eq!(lexer.next_expr_token().unwrap().literal, Literal::Float(4.5));
        assert_eq!(lexer.next_expr_token().unwrap().literal, Literal::Float(0.5));
    }

    #[test]
    fn test_number_before_range() {
        let input = chars("1..3");
        let mut lexer = Lexer::new(&input, 0);
        let tok = lexer.next_expr_token().unwrap();
        assert_eq!(tok.literal, Literal::Int(1));
        assert_eq!(lexer.position(), 1);
    }

    #[test]
    fn test_number_followed_by_letters_is_text() {
        let input = chars("42U");
        let mut lexer = Lexer::new(&input, 0);
        let tok = lexer.next_expr_token().unwrap();
        assert_eq!(tok.token_type, TokenType::Text);
        assert_eq!(tok.text(), "42U");
    }

    #[test]
    fn test_deref_forms() {
        let input = chars("$abc ${ x } $((");
        let mut lexer = Lexer::new(&input, 0);
        let tok = lexer.next_expr_token().unwrap();
        assert_eq!(tok.token_type, TokenType::Deref);
        assert_eq!(tok.text(), "abc");
        let tok = lexer.next_expr_token().unwrap();
        assert_eq!(tok.text(), "x");
        assert_eq!(lexer.next_expr_token().unwrap().token_type, TokenType::LeftEval);
    }

    #[test]
    fn test_deref_errors() {
        let input = chars("$ ");
        let mut lexer = Lexer::new(&input, 0);
        assert_eq!(lexer.next_expr_token().unwrap_err().message, "identifier expected");

        let input = chars("${ab");
        let mut lexer = Lexer::new(&input, 0);
        assert_eq!(lexer.next_expr_token().unwrap_err().message, "} expected");
    }

    #[test]
    fn test_text_modes() {
        let input = chars("rack01@[1,2]");
        let mut lexer = Lexer::new(&input, 0);
        let tok = lexer.next_text_token(TextMode::Path).unwrap();
        assert_eq!(tok.text(), "rack01");
        assert_eq!(lexer.next_text_token(TextMode::Path).unwrap().token_type, TokenType::Eof);

        let input = chars("hello $name!");
        let mut lexer = Lexer::new(&input, 0);
        assert_eq!(lexer.next_text_token(TextMode::Quoted).unwrap().text(), "hello ");
        let tok = lexer.next_text_token(TextMode::Quoted).unwrap();
        assert_eq!(tok.token_type, TokenType::Deref);
        assert_eq!(tok.text(), "name");
        assert_eq!(lexer.next_text_token(TextMode::Quoted).unwrap().text(), "!");
    }

    #[test]
    fn test_precedence_table() {
        assert!(TokenType::Mul.precedence() > TokenType::Add.precedence());
        assert!(TokenType::Add.precedence() > TokenType::Eq.precedence());
        assert!(TokenType::And.precedence() > TokenType::Or.precedence());
        assert_eq!(TokenType::Comma.precedence(), 0);
    }
}
