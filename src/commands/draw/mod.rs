// src/commands/draw/mod.rs
//! `draw` and `undraw`.
//!
//! No 3D client is attached to the shell: objects are resolved and counted
//! so that bad paths and oversized requests are reported, and what would be
//! sent is logged.

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::commands::utils::Object;
use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;

/// An object and all of its loaded descendants.
fn count_objects(obj: &Object) -> usize {
    let children = obj
        .get("children")
        .and_then(JsonValue::as_array)
        .map(|children| {
            children
                .iter()
                .filter_map(JsonValue::as_object)
                .map(count_objects)
                .sum()
        })
        .unwrap_or(0);
    1 + children
}

impl InterpreterContext<'_> {
    pub(crate) fn draw(&mut self, path: &str, depth: i64, force: bool) -> Result<(), OcliError> {
        let depth = usize::try_from(depth)
            .map_err(|_| OcliError::type_coercion("depth should be a positive integer"))?;
        for path in self.unfold_path(path)? {
            let obj = self.get_object_with_children(&path, depth)?;
            let count = count_objects(&obj);
            let threshold = self.state.draw_threshold;
            if count > threshold && !force {
                warn!(path = %path, count, threshold, "draw refused");
                self.emit(format!(
                    "{} objects exceed the draw limit of {}, use draw -f to send them anyway",
                    count, threshold
                ))?;
                continue;
            }
            info!(path = %path, count, depth, "draw");
        }
        Ok(())
    }

    /// Without a path every drawn object is cleared.
    pub(crate) fn undraw(&mut self, path: Option<&str>) -> Result<(), OcliError> {
        let Some(path) = path else {
            info!("undraw everything");
            return Ok(());
        };
        for path in self.unfold_path(path)? {
            let obj = self.get_object(&path)?;
            let id = obj
                .get("id")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| OcliError::runtime("this object has no id"))?;
            info!(path = %path, id, "undraw");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::commands::testing::Harness;
    use crate::network::HttpMethod;

    fn rack_harness() -> Harness {
        let h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/hierarchy_objects/BASIC.A.R1.RK1/all?limit=1",
            200,
            json!({"data": {"id": "BASIC.A.R1.RK1", "name": "RK1", "category": "rack", "children": [
                {"id": "BASIC.A.R1.RK1.D1", "name": "D1", "category": "device"},
                {"id": "BASIC.A.R1.RK1.D2", "name": "D2", "category": "device"}
            ]}}),
        );
        h.api.on(
            HttpMethod::Get,
            "/api/hierarchy_objects/BASIC.A.R1.RK1",
            200,
            json!({"data": {"id": "BASIC.A.R1.RK1", "name": "RK1", "category": "rack"}}),
        );
        h
    }

    #[test]
    fn test_count_objects() {
        let obj = json!({"id": "A", "children": [{"id": "B", "children": [{"id": "C"}]}, {"id": "D"}]});
        assert_eq!(count_objects(obj.as_object().unwrap()), 4);
    }

    #[test]
    fn test_draw_within_threshold() {
        let mut h = rack_harness();
        assert_eq!(h.run("draw /Physical/BASIC/A/R1/RK1 1"), "");
    }

    #[test]
    fn test_draw_over_threshold_needs_force() {
        let mut h = rack_harness();
        h.state.draw_threshold = 2;
        assert_eq!(
            h.run("draw /Physical/BASIC/A/R1/RK1 1"),
            "3 objects exceed the draw limit of 2, use draw -f to send them anyway\n"
        );
        assert_eq!(h.run("draw -f /Physical/BASIC/A/R1/RK1 1"), "");
    }

    #[test]
    fn test_draw_unknown_object() {
        let mut h = Harness::new();
        assert_eq!(h.fail("draw /Physical/BASIC/Z"), "object not found");
    }

    #[test]
    fn test_undraw() {
        let mut h = rack_harness();
        h.run("undraw /Physical/BASIC/A/R1/RK1");
        h.run("undraw");
        assert_eq!(h.api.calls(), 1);
    }
}
