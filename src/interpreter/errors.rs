//! Interpreter Errors
//!
//! Error taxonomy of command execution:
//! - parse: cursor and rule stack, fatal to the current line
//! - type coercion: a value has the wrong type for an argument
//! - resolution: a path or object could not be resolved
//! - collaborator: the API answered with an unexpected status
//! - stack trace: any of the above raised inside a script file
//!
//! All of them are recovered at the command boundary.

use std::fmt;
use thiserror::Error;

use crate::network::NetworkError;
use crate::parser::ParseError;

/// Error raised while executing a node
#[derive(Debug, Error)]
pub enum OcliError {
    #[error("{0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    TypeCoercion(String),
    #[error("{0}")]
    Resolution(String),
    #[error("{message}")]
    Collaborator { status: Option<u16>, message: String },
    #[error("{0}")]
    Runtime(String),
    #[error("{0}")]
    Syntax(#[from] FileSyntaxError),
    #[error("{0}")]
    StackTrace(Box<StackTraceError>),
    #[error("{0}")]
    Io(String),
}

impl OcliError {
    pub fn type_coercion(message: impl Into<String>) -> Self {
        Self::TypeCoercion(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    pub fn object_not_found() -> Self {
        Self::Resolution("object not found".to_string())
    }

    pub fn invalid_path() -> Self {
        Self::Resolution("invalid object path".to_string())
    }

    pub fn is_object_not_found(&self) -> bool {
        matches!(self, Self::Resolution(message) if message == "object not found")
    }

    /// Duplicate objects are reported as warnings by the script loader.
    pub fn is_duplicate(&self) -> bool {
        self.to_string().to_lowercase().contains("duplicate")
    }

    /// Message as shown to the user.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        match self {
            Self::StackTrace(_) | Self::Parse(_) => message,
            _ if message.to_lowercase().contains("error") => message,
            _ => format!("Error : {}", message),
        }
    }
}

impl From<NetworkError> for OcliError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::UnexpectedStatus { status, message } => Self::Collaborator {
                status: Some(status),
                message,
            },
            other => Self::Collaborator {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for OcliError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Invalid lines found while parsing a script file
#[derive(Debug, Clone, PartialEq)]
pub struct FileSyntaxError {
    pub filename: String,
    pub line_errors: Vec<String>,
}

impl FileSyntaxError {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            line_errors: Vec::new(),
        }
    }

    pub fn add_line(&mut self, line_number: usize, line: &str) {
        self.line_errors
            .push(format!("  LINE#: {}\tCOMMAND:{}", line_number, line));
    }

    pub fn is_empty(&self) -> bool {
        self.line_errors.is_empty()
    }
}

impl fmt::Display for FileSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Syntax errors were found in the file: {}", self.filename)?;
        write!(f, "\nThe following commands were invalid")?;
        for line in &self.line_errors {
            write!(f, "\n{}", line)?;
        }
        Ok(())
    }
}

impl std::error::Error for FileSyntaxError {}

/// One script line in a stack trace
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub filename: String,
    pub line_number: usize,
    pub line: String,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  File \"{}\", line {}", self.filename, self.line_number)?;
        writeln!(f, "    {}", self.line)
    }
}

/// Error raised inside a script file, with the chain of including lines
#[derive(Debug)]
pub struct StackTraceError {
    /// Outermost frame first
    pub history: Vec<TraceFrame>,
    pub cause: OcliError,
}

impl StackTraceError {
    pub fn new(cause: OcliError, filename: &str, line: &str, line_number: usize) -> Self {
        let mut err = Self {
            history: Vec::new(),
            cause,
        };
        err.extend(filename, line, line_number);
        err
    }

    /// Add the frame of the line that included the failing one.
    pub fn extend(&mut self, filename: &str, line: &str, line_number: usize) {
        self.history.insert(
            0,
            TraceFrame {
                filename: filename.to_string(),
                line_number,
                line: line.to_string(),
            },
        );
    }
}

impl fmt::Display for StackTraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stack trace (most recent call last):")?;
        for frame in &self.history {
            write!(f, "{}", frame)?;
        }
        write!(f, "Error : {}", self.cause)
    }
}

impl std::error::Error for StackTraceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefix() {
        let err = OcliError::resolution("object not found");
        assert_eq!(err.user_message(), "Error : object not found");
        let err = OcliError::runtime("Error while loading");
        assert_eq!(err.user_message(), "Error while loading");
    }

    #[test]
    fn test_duplicate_detection() {
        let err = OcliError::Collaborator {
            status: Some(400),
            message: "[Response From API] Error while creating: Duplicate key".to_string(),
        };
        assert!(err.is_duplicate());
        assert!(!OcliError::object_not_found().is_duplicate());
    }

    #[test]
    fn test_stack_trace_extends_outward() {
        let mut err = StackTraceError::new(
            OcliError::object_not_found(),
            "inner.ocli",
            "cd /Physical/X",
            3,
        );
        err.extend("outer.ocli", ".cmds:inner.ocli", 1);
        let rendered = err.to_string();
        assert_eq!(
            rendered,
            "Stack trace (most recent call last):\n\
             \x20 File \"outer.ocli\", line 1\n    .cmds:inner.ocli\n\
             \x20 File \"inner.ocli\", line 3\n    cd /Physical/X\n\
             Error : object not found"
        );
    }

    #[test]
    fn test_file_syntax_error() {
        let mut err = FileSyntaxError::new("demo.ocli");
        err.add_line(2, "+si");
        assert_eq!(
            err.to_string(),
            "Syntax errors were found in the file: demo.ocli\nThe following commands were invalid\n  LINE#: 2\tCOMMAND:+si"
        );
    }
}
