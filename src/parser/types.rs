//! Parser Types
//!
//! Parse errors carry the cursor where parsing failed and the stack of
//! grammar rules that were open at that point, so they can be rendered
//! as a caret under the offending character.

use thiserror::Error;

/// Width of the interactive prompt the caret is aligned with
pub const PROMPT_LENGTH: usize = 0;

/// Marker that starts a comment up to the end of the line
pub const COMMENT_MARKER: &str = "//";

/// Parse error with the rule stack at the failure point
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.render(PROMPT_LENGTH))]
pub struct ParseError {
    pub message: String,
    pub cursor: usize,
    /// Names of the rules being parsed, outermost first
    pub stack: Vec<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, cursor: usize, stack: Vec<String>) -> Self {
        Self {
            message: message.into(),
            cursor,
            stack,
        }
    }

    /// Caret line, rule stack and message, aligned after a prompt of the
    /// given width.
    pub fn render(&self, prompt_length: usize) -> String {
        let mut out = " ".repeat(prompt_length + self.cursor + 1);
        out.push_str("\x1b[31m^\x1b[0m\n");
        let names: Vec<&str> = self
            .stack
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        if !names.is_empty() {
            out.push_str(&format!("parsing stack : {}\n", names.join(" -> ")));
        }
        out.push_str("\x1b[31mError : \x1b[0m");
        out.push_str(&self.message);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_stack() {
        let err = ParseError::new(
            "] expected",
            3,
            vec!["".to_string(), "ls".to_string(), "path".to_string()],
        );
        let rendered = err.render(0);
        assert!(rendered.starts_with("    \x1b[31m^"));
        assert!(rendered.contains("parsing stack : ls -> path\n"));
        assert!(rendered.ends_with("Error : \x1b[0m] expected"));
    }

    #[test]
    fn test_render_without_stack() {
        let err = ParseError::new("unexpected character", 0, vec![]);
        assert!(!err.render(2).contains("parsing stack"));
        assert!(err.render(2).starts_with("   \x1b"));
    }
}
