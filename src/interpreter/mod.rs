//! Interpreter module
//!
//! Executes parsed OCLI commands against the shell state.

pub mod arithmetic;
pub mod control_flow;
pub mod errors;
pub mod format;
pub mod functions;
pub mod interpreter;
pub mod script;
pub mod types;

pub use errors::{FileSyntaxError, OcliError, StackTraceError};
pub use interpreter::InterpreterContext;
pub use script::{parse_script, ParsedLine};
pub use types::{DebugLevel, ShellState, Value};
