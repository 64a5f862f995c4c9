// src/commands/update/mod.rs
//! `path:attribute=value[@value...]`
//!
//! Tags and layers only have a few updatable fields. Other objects get
//! special handling for room areas, inner objects (pillars, separators,
//! breakers), vlinks, tags and domain; any other attribute is PATCHed into
//! `attributes`.

use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use crate::ast::types::UpdateNode;
use crate::commands::create::REFER_TO_WIKI;
use crate::commands::utils::{expand_str_vector, Object};
use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::interpreter::types::{to_bool, to_float, to_num, to_string, to_vec, Value};
use crate::layers::{applicability_to_id, compose_filters, LAYER_APPLICABILITY, LAYER_FILTERS, LAYER_FILTERS_ADD};
use crate::network::HttpMethod;
use crate::paths::{translate_path, Namespace};

const VIRTUAL_CONFIG: &str = "virtual_config";

/// Only changed through their `+=` and `-=` forms
const LIST_ATTRIBUTES: &[&str] = &["tags", "separators", "pillars", "vlinks", "breakers"];

const TAG_FIELDS: &[&str] = &["slug", "color", "description"];

/// Display toggles of the 3D client
const BOOL_INTERACTIONS: &[&str] = &[
    "displayContent",
    "alpha",
    "tilesName",
    "tilesColor",
    "U",
    "slots",
    "localCS",
];

const LABEL_INTERACTIONS: &[&str] = &["label", "labelFont", "labelBackground"];

/// Attributes taking a list of strings, ranges expanded
const STRING_LIST_ATTRIBUTES: &[&str] = &["slot", "content"];

/// Single-entry JSON object.
fn entry(key: &str, value: JsonValue) -> JsonValue {
    let mut map = Object::new();
    map.insert(key.to_string(), value);
    JsonValue::Object(map)
}

fn first_value(values: &[Value]) -> Result<&Value, OcliError> {
    values
        .first()
        .ok_or_else(|| OcliError::runtime("a value is expected"))
}

fn area_error(attribute: &str, several: bool) -> OcliError {
    let message = if several {
        format!(
            "Invalid {} attributes provided. They must be arrays/lists/vectors with 4 elements.",
            attribute
        )
    } else {
        format!(
            "Invalid {} attribute provided. It must be an array/list/vector with 4 elements.",
            attribute
        )
    };
    OcliError::runtime(format!("{}{}", message, REFER_TO_WIKI))
}

/// `reserved` and `technical` areas of a room.
fn room_areas(values: &[Value]) -> Result<Object, OcliError> {
    let [reserved, technical] = values else {
        return Err(OcliError::runtime(
            "2 values (reserved, technical) expected to set room areas",
        ));
    };
    let Value::FloatVector(reserved) = reserved else {
        return Err(area_error("reserved", false));
    };
    let Value::FloatVector(technical) = technical else {
        return Err(area_error("technical", false));
    };
    match (reserved.len() == 4, technical.len() == 4) {
        (true, true) => {}
        (false, true) => return Err(area_error("reserved", false)),
        (true, false) => return Err(area_error("technical", false)),
        (false, false) => return Err(area_error("reserved and technical", true)),
    }
    let mut areas = Object::new();
    areas.insert("reserved".to_string(), json!(reserved));
    areas.insert("technical".to_string(), json!(technical));
    Ok(areas)
}

/// Name and value of a pillar, separator or breaker.
fn inner_object(kind: &str, values: &[Value]) -> Result<(String, JsonValue), OcliError> {
    match kind {
        "pillar" => {
            let [name, center, size, rotation] = values else {
                return Err(OcliError::runtime(
                    "4 values (name, centerXY, sizeXY, rotation) expected to add a pillar",
                ));
            };
            Ok((
                to_string(name, "name")?,
                json!({
                    "centerXY": to_vec(center, Some(2), "centerXY")?,
                    "sizeXY": to_vec(size, Some(2), "sizeXY")?,
                    "rotation": to_float(rotation, "rotation")?,
                }),
            ))
        }
        "separator" => {
            let [name, start, end, separator_type] = values else {
                return Err(OcliError::runtime(
                    "4 values (name, startPos, endPos, type) expected to add a separator",
                ));
            };
            Ok((
                to_string(name, "name")?,
                json!({
                    "startPosXYm": to_vec(start, Some(2), "startPos")?,
                    "endPosXYm": to_vec(end, Some(2), "endPos")?,
                    "type": to_string(separator_type, "separator type")?,
                }),
            ))
        }
        _ => breaker(values),
    }
}

fn breaker(values: &[Value]) -> Result<(String, JsonValue), OcliError> {
    let mandatory =
        || OcliError::runtime("at least 2 values (name and powerpanel) expected to add a breaker");
    let [name, powerpanel, optional @ ..] = values else {
        return Err(mandatory());
    };
    let name = to_string(name, "name")?;
    let powerpanel = to_string(powerpanel, "powerpanel")?;
    if name.is_empty() || powerpanel.is_empty() {
        return Err(mandatory());
    }

    let mut breaker = Object::new();
    breaker.insert("powerpanel".to_string(), json!(powerpanel));
    for (key, value) in ["type", "circuit", "intensity", "tag"].iter().zip(optional) {
        let text = value.to_string();
        if text.is_empty() {
            continue;
        }
        if *key == "intensity" {
            let intensity = text
                .parse::<f64>()
                .ok()
                .filter(|i| *i > 0.0)
                .ok_or_else(|| {
                    OcliError::runtime("invalid value for intensity, it should be a positive number")
                })?;
            breaker.insert(key.to_string(), json!(intensity));
        } else {
            breaker.insert(key.to_string(), json!(text));
        }
    }
    Ok((name, JsonValue::Object(breaker)))
}

fn object_attributes(obj: &Object) -> Object {
    obj.get("attributes")
        .and_then(JsonValue::as_object)
        .cloned()
        .unwrap_or_default()
}

impl InterpreterContext<'_> {
    pub(crate) fn update_command(&mut self, update: &UpdateNode) -> Result<Value, OcliError> {
        let path = self.eval_path(&update.path)?;
        let keep_strings = STRING_LIST_ATTRIBUTES.contains(&update.attribute.as_str());
        let mut values = Vec::with_capacity(update.values.len());
        for node in &update.values {
            let value = self.execute(node)?;
            let value = match value {
                Value::String(_) if !keep_strings => to_num(&value, "value").unwrap_or(value),
                other => other,
            };
            values.push(value);
        }
        if self.skip_effect("update") {
            return Ok(Value::Unit);
        }

        for path in self.unfold_path(&path)? {
            match Namespace::split(&path) {
                Some((Namespace::Tags, _)) => self.update_tag(&path, &update.attribute, &values)?,
                Some((Namespace::Layers, _)) => {
                    self.update_layer(&path, &update.attribute, &values)?
                }
                _ => self.update_object(&path, &update.attribute, &values, update.sharpe)?,
            }
        }
        Ok(Value::Unit)
    }

    /// PATCH `data` on an existing object.
    pub(crate) fn patch_object(
        &mut self,
        path: &str,
        data: JsonValue,
        recursive: bool,
    ) -> Result<(), OcliError> {
        self.get_object(path)?;
        let mut endpoint = self.object_endpoint(path)?;
        if recursive {
            endpoint.push_str("?recursive=true");
        }
        self.request(HttpMethod::Patch, &endpoint, Some(&data), 200)?;
        info!(path, "object updated");
        Ok(())
    }

    fn patch_attributes(&mut self, path: &str, attributes: Object) -> Result<(), OcliError> {
        self.patch_object(path, entry("attributes", JsonValue::Object(attributes)), false)
    }

    fn update_tag(&mut self, path: &str, attribute: &str, values: &[Value]) -> Result<(), OcliError> {
        if !TAG_FIELDS.contains(&attribute) {
            return Err(OcliError::runtime(
                "only the slug, color and description of a tag can be updated",
            ));
        }
        let value = first_value(values)?.to_json();
        self.patch_object(path, entry(attribute, value), false)
    }

    /// Applicability paths are stored as ids and `filter+` is ANDed with
    /// the current filter.
    fn update_layer(&mut self, path: &str, attribute: &str, values: &[Value]) -> Result<(), OcliError> {
        let value = first_value(values)?;
        let data = match attribute {
            LAYER_APPLICABILITY => {
                let raw = to_string(value, LAYER_APPLICABILITY)?;
                let applicability =
                    translate_path(&raw, false, &self.state.curr_path, &self.state.prev_path);
                let id = applicability_to_id(&applicability).map_err(OcliError::Runtime)?;
                entry(LAYER_APPLICABILITY, json!(id))
            }
            LAYER_FILTERS_ADD => {
                let layer = self.get_object(path)?;
                let current = layer
                    .get(LAYER_FILTERS)
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default();
                let added = to_string(value, LAYER_FILTERS)?;
                entry(LAYER_FILTERS, json!(compose_filters(current, &added)))
            }
            other => entry(other, value.to_json()),
        };
        self.patch_object(path, data, false)?;
        self.state.hierarchy.invalidate_layers();
        Ok(())
    }

    fn update_object(
        &mut self,
        path: &str,
        attribute: &str,
        values: &[Value],
        sharpe: bool,
    ) -> Result<(), OcliError> {
        match attribute {
            "areas" => {
                let areas = room_areas(values)?;
                self.patch_attributes(path, areas)
            }
            "separators+" | "pillars+" | "breakers+" => {
                let kind = attribute.trim_end_matches("s+");
                self.add_inner_object(path, kind, values)
            }
            "separators-" | "pillars-" | "breakers-" => {
                let name = to_string(first_value(values)?, "name")?;
                self.delete_inner_object(path, attribute.trim_end_matches('-'), &name)
            }
            "vlinks+" | "vlinks-" => {
                let vlink = to_string(first_value(values)?, "vlink")?;
                self.update_vlinks(path, attribute == "vlinks+", &vlink)
            }
            "domain" | "tags+" | "tags-" => {
                let recursive = matches!(values.get(1), Some(Value::String(s)) if s == "recursive");
                let value = first_value(values)?.to_json();
                self.patch_object(path, entry(attribute, value), recursive)
            }
            attr if LIST_ATTRIBUTES.contains(&attr) => Err(OcliError::runtime(format!(
                "object's {0} can not be updated directly, please use {0}+= and {0}-=",
                attr
            ))),
            "description" => {
                let [description] = values else {
                    return Err(OcliError::runtime(
                        "a single value is expected to update a description",
                    ));
                };
                let description = to_string(description, "description")?;
                self.patch_object(path, json!({ "description": description }), false)
            }
            VIRTUAL_CONFIG => self.set_virtual_config(path, values),
            attr if BOOL_INTERACTIONS.contains(&attr) || LABEL_INTERACTIONS.contains(&attr) => {
                self.interact(path, attr, values, sharpe)
            }
            attr => match attr.strip_prefix("virtual_config.") {
                Some(key) if !key.is_empty() => {
                    self.update_virtual_config(path, key, first_value(values)?)
                }
                _ if attr.contains('.') => Err(OcliError::runtime("invalid attribute name")),
                _ => self.update_attribute(path, attr, values),
            },
        }
    }

    fn update_attribute(&mut self, path: &str, attribute: &str, values: &[Value]) -> Result<(), OcliError> {
        let value = if STRING_LIST_ATTRIBUTES.contains(&attribute) {
            let mut items = Vec::with_capacity(values.len());
            for value in values {
                items.push(to_string(value, attribute)?);
            }
            json!(expand_str_vector(&items)?)
        } else {
            let [value] = values else {
                return Err(OcliError::runtime(
                    "attributes can only be assigned a single value",
                ));
            };
            value.to_json()
        };
        let mut attributes = Object::new();
        attributes.insert(attribute.to_string(), value);
        self.patch_attributes(path, attributes)
    }

    fn add_inner_object(&mut self, path: &str, kind: &str, values: &[Value]) -> Result<(), OcliError> {
        let obj = self.get_object(path)?;
        let category = obj.get("category").and_then(JsonValue::as_str);
        match kind {
            "breaker" if category != Some("rack") => {
                return Err(OcliError::runtime("this attribute can only be added to racks"))
            }
            "pillar" | "separator" if category != Some("room") => {
                return Err(OcliError::runtime("this attribute can only be added to rooms"))
            }
            _ => {}
        }
        let (name, value) = inner_object(kind, values)?;

        let key = format!("{}s", kind);
        let mut attributes = object_attributes(&obj);
        let mut objects = attributes
            .get(&key)
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default();
        let replaced = objects.insert(name.clone(), value).is_some();
        attributes.insert(key, JsonValue::Object(objects));
        self.patch_attributes(path, attributes)?;
        if replaced {
            self.emit(format!("{} {} replaced", kind, name))?;
        }
        Ok(())
    }

    fn delete_inner_object(&mut self, path: &str, key: &str, name: &str) -> Result<(), OcliError> {
        let obj = self.get_object(path)?;
        let mut attributes = object_attributes(&obj);
        let removed = match attributes.get_mut(key) {
            Some(JsonValue::Object(objects)) => objects.remove(name).is_some(),
            _ => false,
        };
        if !removed {
            return Err(OcliError::runtime(format!("{} {} does not exist", key, name)));
        }
        self.patch_attributes(path, attributes)
    }

    fn update_vlinks(&mut self, path: &str, add: bool, vlink: &str) -> Result<(), OcliError> {
        if vlink.is_empty() {
            return Err(OcliError::runtime("an empty string is not valid"));
        }
        let obj = self.get_object(path)?;
        if obj.get("category").and_then(JsonValue::as_str) != Some("virtual_obj") {
            return Err(OcliError::runtime("only virtual objects can have vlinks"));
        }
        let current = object_attributes(&obj)
            .get("vlinks")
            .and_then(JsonValue::as_array)
            .cloned();
        let vlinks = match (current, add) {
            (Some(mut vlinks), true) => {
                vlinks.push(json!(vlink));
                vlinks
            }
            (None, true) => vec![json!(vlink)],
            (None, false) => return Err(OcliError::runtime("no vlinks defined for this object")),
            (Some(mut vlinks), false) => {
                let index = vlinks
                    .iter()
                    .position(|v| v.as_str() == Some(vlink))
                    .ok_or_else(|| OcliError::runtime("vlink to remove not found"))?;
                vlinks.remove(index);
                vlinks
            }
        };
        let mut attributes = Object::new();
        attributes.insert("vlinks".to_string(), JsonValue::Array(vlinks));
        self.patch_attributes(path, attributes)
    }

    /// `virtual_config=type[@clusterId[@role]]`
    fn set_virtual_config(&mut self, path: &str, values: &[Value]) -> Result<(), OcliError> {
        let mut config = Object::new();
        for (key, value) in ["type", "clusterId", "role"].iter().zip(values) {
            config.insert(key.to_string(), value.to_json());
        }
        if config.is_empty() {
            return Err(OcliError::runtime("invalid virtual_config values"));
        }
        let mut attributes = Object::new();
        attributes.insert(VIRTUAL_CONFIG.to_string(), JsonValue::Object(config));
        self.patch_attributes(path, attributes)
    }

    fn update_virtual_config(&mut self, path: &str, key: &str, value: &Value) -> Result<(), OcliError> {
        let obj = self.get_object(path)?;
        let mut attributes = object_attributes(&obj);
        match attributes.get_mut(VIRTUAL_CONFIG) {
            Some(JsonValue::Object(config)) => {
                config.insert(key.to_string(), value.to_json());
            }
            _ => return Err(OcliError::runtime("object does not have virtual config")),
        }
        self.patch_attributes(path, attributes)
    }

    /// Display settings only concern the 3D client, they are checked and
    /// logged.
    fn interact(&mut self, path: &str, attribute: &str, values: &[Value], sharpe: bool) -> Result<(), OcliError> {
        let value = first_value(values)?;
        if BOOL_INTERACTIONS.contains(&attribute) {
            to_bool(value, attribute)?;
        } else if attribute == "label" && !matches!(value, Value::String(_)) {
            return Err(OcliError::runtime("The label value must be a string"));
        }
        self.get_object(path)?;
        debug!(path, attribute, value = %value, from_attribute = sharpe, "interaction not forwarded");
        Ok(())
    }
}
