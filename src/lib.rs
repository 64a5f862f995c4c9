//! ocli - command shell for a data-center inventory API
//!
//! This library parses OCLI command lines and scripts into an AST and
//! executes them against an inventory API, keeping a cached view of the
//! object hierarchy.

pub mod ast;
pub mod commands;
pub mod config;
pub mod hierarchy;
pub mod interpreter;
pub mod layers;
pub mod network;
pub mod parser;
pub mod paths;

pub use ast::types::*;
pub use interpreter::{InterpreterContext, OcliError, ShellState};
pub use parser::{parse, ParseError, Parser};
