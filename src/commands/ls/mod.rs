// src/commands/ls/mod.rs
//! `ls`: children of a node, or the objects below it matching filters.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use crate::commands::resolve::{is_layer_not_found, RecursiveParams};
use crate::commands::utils::{compare_values, format_attr_value, object_attr, Object};
use crate::hierarchy::NodeObject;
use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::paths::{
    name_or_slug, object_id_to_relative_path, path_is_layer, path_remove_last, FilterMap,
    Namespace,
};

fn is_object_layer(obj: &Object) -> bool {
    obj.get("name")
        .and_then(JsonValue::as_str)
        .is_some_and(|name| name.starts_with('#'))
}

fn object_id(obj: &Object) -> String {
    obj.get("id")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| name_or_slug(obj))
}

/// Layers last, then by id or by name.
fn default_order(objects: &mut [Object], by_id: bool) {
    let key = |obj: &Object| if by_id { object_id(obj) } else { name_or_slug(obj) };
    objects.sort_by(|a, b| match (is_object_layer(a), is_object_layer(b)) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => key(a).cmp(&key(b)),
    });
}

/// Keep the objects having `attr` and sort them by it.
pub(crate) fn sort_by_attribute(objects: Vec<Object>, attr: &str) -> Result<Vec<Object>, OcliError> {
    let mut objects: Vec<Object> = objects
        .into_iter()
        .filter(|obj| object_attr(obj, attr).is_some())
        .collect();
    if let Some((first, rest)) = objects.split_first() {
        let reference = object_attr(first, attr);
        let sortable = rest.iter().all(|obj| match (reference, object_attr(obj, attr)) {
            (Some(a), Some(b)) => compare_values(a, b).is_some(),
            _ => false,
        });
        if !sortable {
            return Err(OcliError::runtime(
                "objects cannot be sorted according to this attribute",
            ));
        }
    }
    objects.sort_by(|a, b| match (object_attr(a, attr), object_attr(b, attr)) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    });
    Ok(objects)
}

/// `label    a: 1    b: -`
pub(crate) fn attributes_line(label: &str, obj: &Object, attributes: &[String]) -> String {
    let mut line = label.to_string();
    for attr in attributes {
        let value = object_attr(obj, attr)
            .map(format_attr_value)
            .unwrap_or_else(|| "-".to_string());
        line.push_str(&format!("    {}: {}", attr, value));
    }
    line
}

impl InterpreterContext<'_> {
    pub(crate) fn ls_command(
        &mut self,
        path: &str,
        filters: &FilterMap,
        sort_attr: Option<&str>,
        attributes: &[String],
        recursive: Option<&RecursiveParams>,
    ) -> Result<(), OcliError> {
        let mut objects = if filters.is_empty() && recursive.is_none() && !path_is_layer(path) {
            self.ls_children(path)?
        } else {
            self.ls_filtered(path, filters, recursive)?
        };

        let relative = recursive.is_some();
        let mut shown: Vec<String> = Vec::new();
        if let Some(attr) = sort_attr {
            shown.push(attr.to_string());
            objects = sort_by_attribute(objects, attr)?;
        } else {
            default_order(&mut objects, relative);
        }
        shown.extend(attributes.iter().cloned());

        let from = if path_is_layer(path) {
            path_remove_last(path, 1)
        } else {
            path.to_string()
        };
        for obj in &objects {
            let label = if relative {
                object_id_to_relative_path(&object_id(obj), &from)
            } else {
                name_or_slug(obj)
            };
            if shown.is_empty() {
                self.emit(label)?;
            } else {
                self.emit(attributes_line(&label, obj, &shown))?;
            }
        }
        Ok(())
    }

    /// Children of the node, layers included.
    fn ls_children(&mut self, path: &str) -> Result<Vec<Object>, OcliError> {
        let node = self.ls_node(path)?;
        let in_groups = matches!(Namespace::split(path), Some((Namespace::Groups, _)))
            || path.trim_end_matches('/') == Namespace::Groups.prefix().trim_end_matches('/');

        Ok(node
            .children
            .values()
            .map(|child| match &child.obj {
                NodeObject::Map(obj) => {
                    let mut obj = obj.clone();
                    if in_groups {
                        if let Some(id) = obj.get("id").and_then(JsonValue::as_str) {
                            let name = id.replace('.', "/");
                            obj.insert("name".to_string(), JsonValue::String(name));
                        }
                    }
                    obj
                }
                _ => {
                    let mut obj = Object::new();
                    obj.insert("name".to_string(), JsonValue::String(child.name.clone()));
                    obj
                }
            })
            .collect())
    }

    fn ls_filtered(
        &mut self,
        path: &str,
        filters: &FilterMap,
        recursive: Option<&RecursiveParams>,
    ) -> Result<Vec<Object>, OcliError> {
        let target = format!("{}/*", path.trim_end_matches('/'));
        let split = self.split_path(&target).map_err(|e| {
            if is_layer_not_found(&e) {
                e
            } else {
                OcliError::resolution("cannot use filters at this location")
            }
        })?;
        let (objects, _) = self.objects_query(split, filters, recursive)?;
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Harness;
    use crate::hierarchy::UPDATED_THRESHOLD_SECS;
    use crate::network::HttpMethod;
    use serde_json::json;

    fn room_harness() -> Harness {
        let h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/hierarchy_objects/BASIC.A.R1/all?limit=1",
            200,
            json!({"data": {"id": "BASIC.A.R1", "name": "R1", "category": "room", "children": [
                {"id": "BASIC.A.R1.RK2", "name": "RK2", "category": "rack"},
                {"id": "BASIC.A.R1.RK1", "name": "RK1", "category": "rack"}
            ]}}),
        );
        h.api.on(HttpMethod::Get, "/api/layers", 200, json!({"data": {"objects": []}}));
        h
    }

    #[test]
    fn test_ls_children_layers_last() {
        let mut h = room_harness();
        let out = h.run("ls /Physical/BASIC/A/R1");
        assert_eq!(out, "RK1\nRK2\n#racks\n");
    }

    #[test]
    fn test_ls_layers_is_cached() {
        let mut h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/layers",
            200,
            json!({"data": {"objects": [{"slug": "mine", "applicability": "BASIC", "filter": "category=rack"}]}}),
        );
        assert_eq!(h.run("ls /Logical/Layers"), "mine\n");
        h.advance(UPDATED_THRESHOLD_SECS - 1);
        h.run("ls /Logical/Layers");
        assert_eq!(h.api.calls_to(HttpMethod::Get, "/api/layers"), 1);
        h.advance(2);
        h.run("ls /Logical/Layers");
        assert_eq!(h.api.calls_to(HttpMethod::Get, "/api/layers"), 2);
    }

    #[test]
    fn test_ls_with_filters() {
        let mut h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/objects?category=building&id=BASIC.*&namespace=physical.hierarchy",
            200,
            json!({"data": [{"id": "BASIC.B", "name": "B"}, {"id": "BASIC.A", "name": "A"}]}),
        );
        assert_eq!(h.run("ls /Physical/BASIC category=building"), "A\nB\n");
    }

    #[test]
    fn test_ls_filters_outside_namespace() {
        let mut h = Harness::new();
        assert_eq!(
            h.fail("ls / category=rack"),
            "cannot use filters at this location"
        );
    }

    #[test]
    fn test_ls_sorted_by_attribute() {
        let mut h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/objects?category=rack&id=BASIC.A.R1.*&namespace=physical.hierarchy",
            200,
            json!({"data": [
                {"id": "BASIC.A.R1.RK1", "name": "RK1", "attributes": {"height": "42", "color": "ff0000"}},
                {"id": "BASIC.A.R1.RK2", "name": "RK2", "attributes": {"height": "10"}},
                {"id": "BASIC.A.R1.RK3", "name": "RK3", "attributes": {}}
            ]}),
        );
        let out = h.run("ls -s height -a color /Physical/BASIC/A/R1 category=rack");
        assert_eq!(
            out,
            "RK2    height: 10    color: -\nRK1    height: 42    color: ff0000\n"
        );
    }

    #[test]
    fn test_ls_unsortable_attribute() {
        let objects: Vec<Object> = vec![
            json!({"name": "a", "height": 1}).as_object().cloned().unwrap(),
            json!({"name": "b", "height": "2"}).as_object().cloned().unwrap(),
        ];
        let err = sort_by_attribute(objects, "height").unwrap_err();
        assert_eq!(err.to_string(), "objects cannot be sorted according to this attribute");
    }

    #[test]
    fn test_ls_recursive_shows_relative_paths() {
        let mut h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/objects?category=rack&id=BASIC.**.*&namespace=physical.hierarchy",
            200,
            json!({"data": [
                {"id": "BASIC.B.R2.RK1", "name": "RK1"},
                {"id": "BASIC.A.R1.RK1", "name": "RK1"}
            ]}),
        );
        let out = h.run("ls -r /Physical/BASIC category=rack");
        assert_eq!(out, "A/R1/RK1\nB/R2/RK1\n");
    }

    #[test]
    fn test_ls_skipped_in_dry_run() {
        let mut h = room_harness();
        h.state.dry_run = true;
        assert_eq!(h.run("ls /Physical/BASIC/A/R1"), "");
        assert_eq!(h.api.calls(), 0);
    }
}
