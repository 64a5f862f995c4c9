// src/commands/mod.rs
//! Effect-producing commands.
//!
//! Each submodule extends `InterpreterContext` with the operations of one
//! command family. They are reached from `InterpreterContext::execute` once
//! their arguments are evaluated and the dry-run check has passed.

pub mod create;
pub mod delete;
pub mod draw;
pub mod get;
pub mod link;
pub mod ls;
pub mod navigation;
pub mod resolve;
pub mod update;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing {
    use chrono::Duration;

    use crate::hierarchy::FixedClock;
    use crate::interpreter::errors::OcliError;
    use crate::interpreter::interpreter::InterpreterContext;
    use crate::interpreter::types::{ShellState, Value};
    use crate::network::types::mock::MockApi;
    use crate::parser::parse;

    /// State, API and clock kept across the lines of a test
    pub(crate) struct Harness {
        pub state: ShellState,
        pub api: MockApi,
        pub clock: FixedClock,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                state: ShellState::new(),
                api: MockApi::new(),
                clock: FixedClock::default(),
            }
        }

        pub fn with_ctx<T>(&mut self, f: impl FnOnce(&mut InterpreterContext<'_>) -> T) -> T {
            let mut out = Vec::new();
            let mut ctx = InterpreterContext::new(&mut self.state, &self.api, &self.clock, &mut out);
            f(&mut ctx)
        }

        /// Run one line, returning its value and what it printed.
        pub fn exec(&mut self, line: &str) -> Result<(Value, String), OcliError> {
            let node = parse(line)?;
            let mut out = Vec::new();
            let value = {
                let mut ctx =
                    InterpreterContext::new(&mut self.state, &self.api, &self.clock, &mut out);
                ctx.execute(&node)?
            };
            Ok((value, String::from_utf8_lossy(&out).into_owned()))
        }

        /// Output of a line expected to succeed.
        pub fn run(&mut self, line: &str) -> String {
            match self.exec(line) {
                Ok((_, out)) => out,
                Err(e) => panic!("{} failed: {}", line, e),
            }
        }

        /// Message of a line expected to fail.
        pub fn fail(&mut self, line: &str) -> String {
            match self.exec(line) {
                Ok(_) => panic!("{} should fail", line),
                Err(e) => e.to_string(),
            }
        }

        pub fn advance(&self, seconds: i64) {
            self.clock.advance(Duration::seconds(seconds));
        }
    }
}
