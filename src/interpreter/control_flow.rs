//! Control Flow Execution
//!
//! Handles control flow constructs:
//! - if/elif/else
//! - while loops
//! - for loops over an integer range or a vector
//!
//! Loop variables are plain shell variables and outlive the loop.

use crate::ast::types::Node;
use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::interpreter::types::Value;

impl InterpreterContext<'_> {
    pub(crate) fn execute_if(
        &mut self,
        condition: &Node,
        body: &Node,
        else_body: Option<&Node>,
    ) -> Result<Value, OcliError> {
        if self.eval_bool(condition, "condition")? {
            self.execute(body)?;
        } else if let Some(else_body) = else_body {
            self.execute(else_body)?;
        }
        Ok(Value::Unit)
    }

    pub(crate) fn execute_while(&mut self, condition: &Node, body: &Node) -> Result<Value, OcliError> {
        while !self.state.exit_requested && self.eval_bool(condition, "condition")? {
            self.execute(body)?;
        }
        Ok(Value::Unit)
    }

    /// `for i in start..end`, both bounds included.
    pub(crate) fn execute_for_range(
        &mut self,
        variable: &str,
        start: &Node,
        end: &Node,
        body: &Node,
    ) -> Result<Value, OcliError> {
        let start = self.eval_int(start, "start index")?;
        let end = self.eval_int(end, "end index")?;
        if start > end {
            return Err(OcliError::runtime("start index should be lower than end index"));
        }
        for i in start..=end {
            self.state.variables.insert(variable.to_string(), Value::Int(i));
            self.execute(body)?;
            if self.state.exit_requested {
                break;
            }
        }
        Ok(Value::Unit)
    }

    pub(crate) fn execute_for_array(
        &mut self,
        variable: &str,
        array: &Node,
        body: &Node,
    ) -> Result<Value, OcliError> {
        let Value::FloatVector(items) = self.execute(array)? else {
            return Err(OcliError::runtime("only an array can be iterated"));
        };
        for item in items {
            self.state.variables.insert(variable.to_string(), Value::Float(item));
            self.execute(body)?;
            if self.state.exit_requested {
                break;
            }
        }
        Ok(Value::Unit)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::interpreter::tests::run_line;
    use crate::interpreter::types::{ShellState, Value};
    use crate::network::types::mock::MockApi;

    #[test]
    fn test_if_elif_else() {
        let mut state = ShellState::new();
        let api = MockApi::new();
        run_line(&mut state, &api, ".var:a=eval 2").unwrap();
        let line = "if $a == 1 { print one } elif $a == 2 { print two } else { print other }";
        let (_, out) = run_line(&mut state, &api, line).unwrap();
        assert_eq!(out, "two\n");
    }

    #[test]
    fn test_if_condition_must_be_bool() {
        let mut state = ShellState::new();
        let api = MockApi::new();
        let err = run_line(&mut state, &api, "if 1 { pwd }").unwrap_err();
        assert_eq!(err.to_string(), "condition should be a boolean");
    }

    #[test]
    fn test_while() {
        let mut state = ShellState::new();
        let api = MockApi::new();
        run_line(&mut state, &api, ".var:i=eval 0").unwrap();
        let (_, out) = run_line(&mut state, &api, "while $i < 3 { print $i; .var:i=eval $i+1 }").unwrap();
        assert_eq!(out, "0\n1\n2\n");
        assert_eq!(state.variables.get("i"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_for_range_is_inclusive() {
        let mut state = ShellState::new();
        let api = MockApi::new();
        let (_, out) = run_line(&mut state, &api, "for i in 0..3 { print $i }").unwrap();
        assert_eq!(out, "0\n1\n2\n3\n");
    }

    #[test]
    fn test_for_range_bounds() {
        let mut state = ShellState::new();
        let api = MockApi::new();
        let err = run_line(&mut state, &api, "for i in 3..1 { print $i }").unwrap_err();
        assert_eq!(err.to_string(), "start index should be lower than end index");
    }

    #[test]
    fn test_for_array() {
        let mut state = ShellState::new();
        let api = MockApi::new();
        let (_, out) = run_line(&mut state, &api, "for x in [1, 2.5] { print $x }").unwrap();
        assert_eq!(out, "1\n2.5\n");
    }
}
