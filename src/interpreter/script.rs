//! Script Files
//!
//! `.cmds:<file>` parses a whole file before running it line by line. Lines
//! ending with `\` continue on the next one. An error raised by a line is
//! wrapped in a `StackTraceError`; errors coming from a nested `.cmds:` are
//! extended with the including line instead.
//!
//! `.dryrun:<file>` runs the file without effects, collecting every error
//! and printing a report at the end.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::ast::types::Node;
use crate::interpreter::errors::{FileSyntaxError, OcliError, StackTraceError};
use crate::interpreter::interpreter::InterpreterContext;
use crate::interpreter::types::DebugLevel;
use crate::parser::parse;

/// A command of a script, possibly spanning several lines
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub line: String,
    /// Line where the command starts
    pub line_number: usize,
    pub root: Node,
}

/// Parse every command of a script.
///
/// Lines that fail to parse are collected in the returned `FileSyntaxError`,
/// the others are kept.
pub fn parse_script(filename: &str, contents: &str) -> (Vec<ParsedLine>, Option<FileSyntaxError>) {
    let mut parsed = Vec::new();
    let mut syntax_error = FileSyntaxError::new(filename);
    let mut line = String::new();
    let mut start = 1;
    for (index, raw) in contents.lines().enumerate() {
        let current = raw.trim_end_matches(' ');
        if let Some(head) = current.strip_suffix('\\') {
            line.push_str(head);
            line.push('\n');
            continue;
        }
        line.push_str(current);
        match parse(&line) {
            Ok(root) => parsed.push(ParsedLine {
                line: line.clone(),
                line_number: start,
                root,
            }),
            Err(_) => syntax_error.add_line(start, &line),
        }
        line.clear();
        start = index + 2;
    }
    if syntax_error.is_empty() {
        (parsed, None)
    } else {
        (parsed, Some(syntax_error))
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

impl InterpreterContext<'_> {
    pub fn load_file(&mut self, path: &str) -> Result<(), OcliError> {
        let filename = file_name(path);
        let contents = fs::read_to_string(path)?;
        let (lines, syntax_error) = parse_script(&filename, &contents);
        if let Some(syntax_error) = syntax_error {
            if !self.state.dry_run {
                return Err(syntax_error.into());
            }
            self.emit(&syntax_error)?;
            self.state.dry_run_errors.push(syntax_error.into());
        }
        info!(file = %filename, commands = lines.len(), "loading script");

        for parsed in &lines {
            if self.state.print_commands {
                self.emit(&parsed.line)?;
            }
            let result = self.execute(&parsed.root);
            if self.state.exit_requested {
                break;
            }
            let Err(e) = result else {
                continue;
            };
            if e.is_duplicate() {
                warn!(file = %filename, line = parsed.line_number, "{}", e);
                if self.state.debug_level > DebugLevel::None {
                    self.emit(&e)?;
                }
                continue;
            }
            let trace = match e {
                OcliError::StackTrace(mut trace) => {
                    trace.extend(&filename, &parsed.line, parsed.line_number);
                    trace
                }
                other => Box::new(StackTraceError::new(
                    other,
                    &filename,
                    &parsed.line,
                    parsed.line_number,
                )),
            };
            if !self.state.dry_run {
                return Err(OcliError::StackTrace(trace));
            }
            self.emit(&trace)?;
            self.state.dry_run_errors.push(OcliError::StackTrace(trace));
        }
        Ok(())
    }

    /// Run a script in dry-run mode and report the errors found.
    pub fn dry_load_file(&mut self, path: &str) -> Result<(), OcliError> {
        let was_dry_run = std::mem::replace(&mut self.state.dry_run, true);
        let previous_errors = std::mem::take(&mut self.state.dry_run_errors);

        let loaded = self.load_file(path);
        let mut errors = std::mem::replace(&mut self.state.dry_run_errors, previous_errors);
        self.state.dry_run = was_dry_run;
        if let Err(e) = loaded {
            errors.push(e);
        }

        self.emit("####################")?;
        self.emit(format!("Errors found: {}", errors.len()))?;
        for (index, error) in errors.iter().enumerate() {
            self.emit(format!("# Error {}", index))?;
            self.emit(error)?;
        }
        Ok(())
    }
}
