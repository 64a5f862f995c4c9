// src/commands/utils/mod.rs
//! Helpers shared by the object commands: attribute lookup, value ordering
//! and rendering of API objects.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::interpreter::errors::OcliError;

/// An object as returned by the API
pub type Object = Map<String, JsonValue>;

/// Top-level field of an object, falling back to its attributes.
pub fn object_attr<'a>(obj: &'a Object, key: &str) -> Option<&'a JsonValue> {
    obj.get(key).or_else(|| obj.get("attributes")?.as_object()?.get(key))
}

/// Order of two values of the same kind, `None` when they cannot be compared.
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (JsonValue::String(x), JsonValue::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn format_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

/// Value as shown in attribute listings, vectors as `[a b]`.
pub fn format_attr_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => format_number(n),
        JsonValue::Array(items) => {
            let items: Vec<String> = items.iter().map(format_attr_value).collect();
            format!("[{}]", items.join(" "))
        }
        other => other.to_string(),
    }
}

fn sort_keys(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut entries: Vec<(&String, &JsonValue)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            JsonValue::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Pretty JSON with sorted keys and a four space indent.
pub fn display_json(obj: &Object) -> Result<String, OcliError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    sort_keys(&JsonValue::Object(obj.clone()))
        .serialize(&mut serializer)
        .map_err(|e| OcliError::runtime(e.to_string()))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn split_last_char(s: &str) -> Option<(&str, char)> {
    let last = s.chars().last()?;
    Some((&s[..s.len() - last.len_utf8()], last))
}

fn expand_range(slot: &str) -> Result<Vec<String>, OcliError> {
    let invalid = || OcliError::runtime("Invalid device syntax: incorrect use of .. for slot");
    let parts: Vec<&str> = slot.split("..").collect();
    let [first, last] = parts.as_slice() else {
        return Err(invalid());
    };
    let (prefix, start) = split_last_char(first).ok_or_else(invalid)?;
    let (end_prefix, end) = split_last_char(last).ok_or_else(invalid)?;
    if prefix != end_prefix {
        return Err(invalid());
    }
    let start = start.to_digit(10).ok_or_else(invalid)?;
    let end = end.to_digit(10).ok_or_else(invalid)?;
    Ok((start..=end).map(|i| format!("{}{}", prefix, i)).collect())
}

/// Expand `slot1..4` into `slot1, slot2, slot3, slot4`.
pub fn expand_str_vector(items: &[String]) -> Result<Vec<String>, OcliError> {
    let mut expanded = Vec::with_capacity(items.len());
    for item in items {
        if item.contains("..") {
            if items.len() != 1 {
                return Err(OcliError::runtime(
                    "Invalid device syntax: .. can only be used in a single element vector",
                ));
            }
            return expand_range(item);
        }
        expanded.push(item.clone());
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: JsonValue) -> Object {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_object_attr_falls_back_to_attributes() {
        let rack = obj(json!({"name": "R1", "attributes": {"height": "42"}}));
        assert_eq!(object_attr(&rack, "name"), Some(&json!("R1")));
        assert_eq!(object_attr(&rack, "height"), Some(&json!("42")));
        assert_eq!(object_attr(&rack, "color"), None);
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(1), &json!(2.5)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!("1"), &json!(1)), None);
    }

    #[test]
    fn test_format_attr_value() {
        assert_eq!(format_attr_value(&json!([1.0, 2.5])), "[1 2.5]");
        assert_eq!(format_attr_value(&json!("front")), "front");
        assert_eq!(format_attr_value(&json!(true)), "true");
    }

    #[test]
    fn test_display_json_sorts_keys() {
        let o = obj(json!({"name": "R1", "attributes": {"b": 1, "a": "x"}}));
        assert_eq!(
            display_json(&o).unwrap(),
            "{\n    \"attributes\": {\n        \"a\": \"x\",\n        \"b\": 1\n    },\n    \"name\": \"R1\"\n}"
        );
    }

    #[test]
    fn test_expand_str_vector() {
        let expanded = expand_str_vector(&["slot1..3".to_string()]).unwrap();
        assert_eq!(expanded, vec!["slot1", "slot2", "slot3"]);
        let kept = expand_str_vector(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(kept, vec!["a", "b"]);
        let err = expand_str_vector(&["s1..3".to_string(), "x".to_string()]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid device syntax: .. can only be used in a single element vector"
        );
        assert!(expand_str_vector(&["a1..b3".to_string()]).is_err());
    }
}
