// src/commands/get/mod.rs
//! `get`, `getu` and `getslot`.

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::commands::ls::attributes_line;
use crate::commands::resolve::RecursiveParams;
use crate::commands::utils::{display_json, Object};
use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::interpreter::types::{DebugLevel, Value};
use crate::layers::LAYER_APPLICABILITY;
use crate::paths::{name_or_slug, physical_id_to_path, FilterMap, Namespace};

/// What `getu`/`getslot` look for among the devices of a rack
#[derive(Debug, Clone, PartialEq)]
pub enum RackQuery {
    U(i64),
    Slot(String),
}

impl RackQuery {
    fn matches(&self, device: &Object) -> bool {
        let Some(attributes) = device.get("attributes").and_then(JsonValue::as_object) else {
            return false;
        };
        match self {
            Self::U(u) => match attributes.get("posU") {
                Some(JsonValue::String(s)) => s.trim() == u.to_string(),
                Some(JsonValue::Number(n)) => n.as_f64() == Some(*u as f64),
                _ => false,
            },
            Self::Slot(slot) => match attributes.get("slot") {
                Some(JsonValue::String(s)) => s == slot,
                Some(JsonValue::Array(slots)) => slots.iter().any(|s| s.as_str() == Some(slot)),
                _ => false,
            },
        }
    }

    fn not_found_message(&self) -> &'static str {
        match self {
            Self::U(_) => "The 'U' you provided does not correspond to any device in this rack",
            Self::Slot(_) => "The slot you provided does not correspond to any device in this rack",
        }
    }
}

impl InterpreterContext<'_> {
    /// Print the objects matching `path`. A single match is also the value
    /// of the command.
    pub(crate) fn get_command(
        &mut self,
        path: &str,
        filters: &FilterMap,
        attributes: &[String],
        recursive: Option<&RecursiveParams>,
    ) -> Result<Value, OcliError> {
        let (mut objects, _) = self.wildcard_query(path, filters, recursive)?;
        if !path.contains('*') && objects.is_empty() {
            return Err(OcliError::object_not_found());
        }
        debug!(path, count = objects.len(), "get");

        let in_layers = matches!(Namespace::split(path), Some((Namespace::Layers, _)));
        for obj in &mut objects {
            if in_layers {
                if let Some(JsonValue::String(id)) = obj.get(LAYER_APPLICABILITY) {
                    let applicability = physical_id_to_path(id);
                    obj.insert(
                        LAYER_APPLICABILITY.to_string(),
                        JsonValue::String(applicability),
                    );
                }
            }
            if attributes.is_empty() {
                let rendered = display_json(obj)?;
                self.emit(rendered)?;
            } else {
                self.emit(attributes_line(&name_or_slug(obj), obj, attributes))?;
            }
        }

        Ok(match objects.len() {
            1 => Value::Mapping(objects.remove(0)),
            _ => Value::Unit,
        })
    }

    /// Device of the rack at `path` placed at a given U or slot.
    pub(crate) fn get_in_rack(&mut self, path: &str, query: RackQuery) -> Result<Value, OcliError> {
        let rack = self.get_object_with_children(path, 1)?;
        if rack.get("category").and_then(JsonValue::as_str) != Some("rack") {
            return Err(OcliError::runtime("command may only be performed on rack objects"));
        }
        let device = rack
            .get("children")
            .and_then(JsonValue::as_array)
            .into_iter()
            .flatten()
            .filter_map(JsonValue::as_object)
            .find(|device| query.matches(device))
            .cloned();

        match device {
            Some(device) => {
                let rendered = display_json(&device)?;
                self.emit(rendered)?;
                Ok(Value::Mapping(device))
            }
            None => {
                if self.state.debug_level > DebugLevel::None {
                    self.emit(query.not_found_message())?;
                }
                Ok(Value::Unit)
            }
        }
    }
}
