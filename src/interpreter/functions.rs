//! Function Handling
//!
//! Handles user function definition and invocation:
//! - Function definition (adding the body to the function table)
//! - Function calls (running the body against the current state)
//!
//! Functions take no parameters and have no local scope; every variable
//! they touch is a shell variable.

use tracing::debug;

use crate::ast::types::Node;
use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::interpreter::types::Value;

/// Maximum nesting of function calls
pub const MAX_CALL_DEPTH: usize = 100;

impl InterpreterContext<'_> {
    pub(crate) fn define_function(&mut self, name: &str, body: &Node) -> Result<Value, OcliError> {
        debug!(name, "function defined");
        self.state.functions.insert(name.to_string(), body.clone());
        Ok(Value::Unit)
    }

    pub(crate) fn call_function(&mut self, name: &str) -> Result<Value, OcliError> {
        let body = self
            .state
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| OcliError::runtime(format!("undefined function {}", name)))?;
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(OcliError::runtime(format!(
                "maximum function call depth ({}) exceeded in {}",
                MAX_CALL_DEPTH, name
            )));
        }
        self.call_depth += 1;
        let result = self.execute(&body);
        self.call_depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::interpreter::tests::run_line;
    use crate::interpreter::types::ShellState;
    use crate::network::types::mock::MockApi;

    #[test]
    fn test_define_and_call() {
        let mut state = ShellState::new();
        let api = MockApi::new();
        run_line(&mut state, &api, "alias hello { print hi; pwd }").unwrap();
        assert!(state.functions.contains_key("hello"));
        let (_, out) = run_line(&mut state, &api, "hello").unwrap();
        assert_eq!(out, "hi\n/\n");
    }

    #[test]
    fn test_functions_see_current_variables() {
        let mut state = ShellState::new();
        let api = MockApi::new();
        run_line(&mut state, &api, "alias show { print $x }").unwrap();
        run_line(&mut state, &api, ".var:x=eval 1").unwrap();
        let (_, out) = run_line(&mut state, &api, "show").unwrap();
        assert_eq!(out, "1\n");
        run_line(&mut state, &api, ".var:x=eval 2").unwrap();
        let (_, out) = run_line(&mut state, &api, "show").unwrap();
        assert_eq!(out, "2\n");
    }

    #[test]
    fn test_undefined_function() {
        let mut state = ShellState::new();
        let api = MockApi::new();
        let err = run_line(&mut state, &api, "nothing").unwrap_err();
        assert_eq!(err.to_string(), "undefined function nothing");
    }

    #[test]
    fn test_unbounded_recursion_is_stopped() {
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let mut state = ShellState::new();
                let api = MockApi::new();
                run_line(&mut state, &api, "alias again { again }").unwrap();
                run_line(&mut state, &api, "again").unwrap_err().to_string()
            })
            .unwrap();
        let message = handle.join().unwrap();
        assert!(message.starts_with("maximum function call depth"));
    }
}
