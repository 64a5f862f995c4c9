//! Abstract Syntax Tree (AST) Types for OCLI
//!
//! Architecture:
//!   Input → Lexer → Parser → AST → Interpreter → API / hierarchy cache

pub mod types;

pub use types::*;
