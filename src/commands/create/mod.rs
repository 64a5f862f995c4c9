// src/commands/create/mod.rs
//! `+kind:path@...`: object creation.
//!
//! Arguments are evaluated and checked locally first, and a dry run stops
//! there. Otherwise the parent is fetched, the template applied and the
//! object posted to the collection of its category.

use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::ast::types::{CreateNode, Node, PathNode};
use crate::commands::utils::{expand_str_vector, Object};
use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::interpreter::types::{to_color, to_int, to_rotation, Value};
use crate::layers::{applicability_to_id, LAYER_APPLICABILITY, LAYER_FILTERS};
use crate::network::HttpMethod;
use crate::paths::{
    path_remove_last, Namespace, BLDG_TEMPLATES_PATH, DOMAINS_PATH, OBJECT_TEMPLATES_PATH,
    ROOM_TEMPLATES_PATH,
};

pub(crate) const REFER_TO_WIKI: &str = " Please refer to the wiki or manual reference for more details on how to create objects using this syntax";

/// Height of a rack unit, in meters
const RACK_UNIT: f64 = 0.04445;

/// Height given to a device per rack unit, in millimeters
const DEVICE_U_HEIGHT: f64 = 44.5;

/// Room attributes copied as is from a room template
const ROOM_TEMPLATE_ATTRIBUTES: &[&str] = &[
    "axisOrientation",
    "separators",
    "pillars",
    "floorUnit",
    "tiles",
    "rows",
    "aisles",
    "vertices",
    "colors",
    "tileAngle",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entity {
    Domain,
    Site,
    Building,
    Room,
    Rack,
    Device,
    Corridor,
    Generic,
    Group,
    VirtualObject,
    StrayDevice,
}

impl Entity {
    fn category(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Site => "site",
            Self::Building => "building",
            Self::Room => "room",
            Self::Rack => "rack",
            Self::Device | Self::StrayDevice => "device",
            Self::Corridor => "corridor",
            Self::Generic => "generic",
            Self::Group => "group",
            Self::VirtualObject => "virtual_obj",
        }
    }

    fn endpoint(self) -> String {
        match self {
            Self::StrayDevice => Namespace::Stray.object_endpoint().to_string(),
            Self::VirtualObject => Namespace::VirtualObjects.object_endpoint().to_string(),
            other => format!("/api/{}s", other.category()),
        }
    }

    fn base_attributes(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Building => &[("posXYUnit", "m"), ("sizeUnit", "m"), ("heightUnit", "m")],
            Self::Room => &[
                ("floorUnit", "t"),
                ("posXYUnit", "m"),
                ("sizeUnit", "m"),
                ("heightUnit", "m"),
            ],
            Self::Rack => &[("sizeUnit", "cm"), ("heightUnit", "U")],
            Self::Device => &[("orientation", "front"), ("sizeUnit", "mm"), ("heightUnit", "mm")],
            Self::Corridor | Self::Generic => &[("sizeUnit", "cm"), ("heightUnit", "cm")],
            _ => &[],
        }
    }

    fn has_parent(self) -> bool {
        !matches!(self, Self::Site | Self::StrayDevice)
    }

    fn templates_path(self) -> Option<&'static str> {
        match self {
            Self::Building => Some(BLDG_TEMPLATES_PATH),
            Self::Room => Some(ROOM_TEMPLATES_PATH),
            Self::Rack | Self::Device | Self::Generic | Self::StrayDevice => {
                Some(OBJECT_TEMPLATES_PATH)
            }
            _ => None,
        }
    }
}

fn float_vec(value: Option<&JsonValue>) -> Option<Vec<f64>> {
    value?.as_array()?.iter().map(JsonValue::as_f64).collect()
}

fn str_attr<'a>(obj: &'a Object, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(JsonValue::as_str)
}

fn merge_defaults(attrs: &mut Object, defaults: &[(&str, &str)]) {
    for (key, value) in defaults {
        attrs
            .entry(key.to_string())
            .or_insert_with(|| JsonValue::String(value.to_string()));
    }
}

/// Copy the entries of `other` missing from `attrs`.
fn merge_missing(attrs: &mut Object, other: &Object) {
    for (key, value) in other {
        attrs.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

fn copy_value(attrs: &mut Object, from: &Object, key: &str) -> bool {
    match from.get(key) {
        Some(value) => {
            attrs.insert(key.to_string(), value.clone());
            true
        }
        None => false,
    }
}

/// Name, category and empty description of a new object.
fn base_data(entity: Entity, path: &str) -> Result<Object, OcliError> {
    let name = path.rsplit('/').next().unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(OcliError::runtime(
            "Invalid path name provided for OCLI object creation",
        ));
    }
    let mut data = Object::new();
    data.insert("name".to_string(), json!(name));
    data.insert("category".to_string(), json!(entity.category()));
    data.insert("description".to_string(), json!(""));
    Ok(data)
}

/// A 3 element size also gives the height.
fn set_size(attrs: &mut Object) -> Result<(), OcliError> {
    match float_vec(attrs.get("size")) {
        Some(mut size) if !size.is_empty() => {
            if size.len() == 3 {
                attrs.insert("height".to_string(), json!(size[2]));
                size.truncate(2);
            }
            attrs.insert("size".to_string(), json!(size));
            Ok(())
        }
        _ => {
            warn!("invalid size value");
            Err(OcliError::runtime(format!(
                "invalid size attribute provided. \nIt must be an array/list/vector with 3 elements.{}",
                REFER_TO_WIKI
            )))
        }
    }
}

fn set_position(entity: Entity, attrs: &mut Object) -> Result<(), OcliError> {
    match entity {
        Entity::Building | Entity::Room => match float_vec(attrs.get("posXY")) {
            Some(pos) if pos.len() == 2 => Ok(()),
            _ => Err(OcliError::runtime(format!(
                "invalid posXY attribute provided. \nIt must be an array/list/vector with 2 elements.{}",
                REFER_TO_WIKI
            ))),
        },
        _ => match float_vec(attrs.get("posXYZ")) {
            Some(mut pos) if pos.len() == 2 || pos.len() == 3 => {
                if pos.len() == 2 {
                    pos.push(0.0);
                }
                attrs.insert("posXYZ".to_string(), json!(pos));
                Ok(())
            }
            _ => Err(OcliError::runtime(format!(
                "invalid pos attribute provided. \nIt must be an array/list/vector with 2 or 3 elements.{}",
                REFER_TO_WIKI
            ))),
        },
    }
}

/// `posU` when a single integer is given, slots otherwise.
fn set_device_location(attrs: &mut Object, location: &[String]) -> Result<(), OcliError> {
    if location.is_empty() {
        return Ok(());
    }
    if let [single] = location {
        if let Ok(pos_u) = single.trim().parse::<i64>() {
            attrs.insert("posU".to_string(), json!(pos_u));
            return Ok(());
        }
    }
    let slots = expand_str_vector(location)?;
    attrs.insert("slot".to_string(), json!(slots));
    Ok(())
}

fn slot_names(attrs: &Object) -> Vec<String> {
    attrs
        .get("slot")
        .and_then(JsonValue::as_array)
        .map(|slots| {
            slots
                .iter()
                .filter_map(JsonValue::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl InterpreterContext<'_> {
    pub(crate) fn create_command(&mut self, create: &CreateNode) -> Result<Value, OcliError> {
        match create {
            CreateNode::Tag { slug, color } => {
                let slug = self.eval_string(slug, "slug")?;
                let color = to_color(&self.execute(color)?)?;
                if !self.skip_effect("create tag") {
                    self.create_tag(&slug, &color)?;
                }
            }
            CreateNode::Layer {
                slug,
                applicability,
                filter,
            } => {
                let slug = self.eval_string(slug, "slug")?;
                let applicability = self.eval_path(applicability)?;
                let filter = self.eval_string(filter, "filter")?;
                if !self.skip_effect("create layer") {
                    self.create_layer(&slug, &applicability, &filter)?;
                }
            }
            other => {
                let (path, entity, attrs) = self.eval_create(other)?;
                self.create_object(&path, entity, attrs)?;
            }
        }
        Ok(Value::Unit)
    }

    /// Path, kind and user attributes of an object creation.
    fn eval_create(&mut self, create: &CreateNode) -> Result<(String, Entity, Object), OcliError> {
        let mut attrs = Object::new();
        let (path, entity) = match create {
            CreateNode::Domain { path, color } => {
                let color = to_color(&self.execute(color)?)?;
                attrs.insert("color".to_string(), json!(color));
                (self.eval_path(path)?, Entity::Domain)
            }
            CreateNode::Site { path } => (self.eval_path(path)?, Entity::Site),
            CreateNode::Building {
                path,
                pos_xy,
                rotation,
                size_or_template,
            } => {
                let path = self.eval_path(path)?;
                attrs.insert("posXY".to_string(), json!(self.eval_vec(pos_xy, Some(2), "posXY")?));
                attrs.insert("rotation".to_string(), json!(self.eval_float(rotation, "rotation")?));
                self.eval_size_or_template(size_or_template, &mut attrs)?;
                (path, Entity::Building)
            }
            CreateNode::Room {
                path,
                pos_xy,
                rotation,
                size_or_template,
                axis_orientation,
                floor_unit,
            } => {
                let path = self.eval_path(path)?;
                attrs.insert("posXY".to_string(), json!(self.eval_vec(pos_xy, Some(2), "posXY")?));
                attrs.insert("rotation".to_string(), json!(self.eval_float(rotation, "rotation")?));
                self.eval_size_or_template(size_or_template, &mut attrs)?;
                if !attrs.contains_key("template") {
                    let orientation = match axis_orientation {
                        Some(node) => self.eval_string(node, "orientation")?,
                        None => "+x+y".to_string(),
                    };
                    attrs.insert("axisOrientation".to_string(), json!(orientation));
                }
                if let Some(node) = floor_unit {
                    attrs.insert("floorUnit".to_string(), json!(self.eval_string(node, "floorUnit")?));
                }
                (path, Entity::Room)
            }
            CreateNode::Rack {
                path,
                pos,
                unit,
                rotation,
                size_or_template,
            } => {
                let path = self.eval_path(path)?;
                self.eval_placement(pos, unit, rotation, &mut attrs)?;
                self.eval_size_or_template(size_or_template, &mut attrs)?;
                (path, Entity::Rack)
            }
            CreateNode::Generic {
                path,
                pos,
                unit,
                rotation,
                size_or_template,
                shape,
                generic_type,
            } => {
                let path = self.eval_path(path)?;
                self.eval_placement(pos, unit, rotation, &mut attrs)?;
                if let Some(shape) = shape {
                    attrs.insert("shape".to_string(), json!(self.eval_string(shape, "shape")?));
                }
                if let Some(generic_type) = generic_type {
                    attrs.insert("type".to_string(), json!(self.eval_string(generic_type, "type")?));
                }
                self.eval_size_or_template(size_or_template, &mut attrs)?;
                (path, Entity::Generic)
            }
            CreateNode::Device {
                path,
                pos_u_or_slot,
                size_u_or_template,
                invert_offset,
                side,
            } => {
                let path = self.eval_path(path)?;
                let mut location = Vec::with_capacity(pos_u_or_slot.len());
                for node in pos_u_or_slot {
                    location.push(self.eval_string(node, "posU/slot")?);
                }
                set_device_location(&mut attrs, &location)?;

                let value = self.execute(size_u_or_template)?;
                match (to_int(&value, "sizeU"), value) {
                    (Ok(size_u), _) => {
                        attrs.insert("sizeU".to_string(), json!(size_u));
                        attrs.insert("height".to_string(), json!(size_u as f64 * DEVICE_U_HEIGHT));
                    }
                    (Err(_), Value::String(template)) => {
                        attrs.insert("template".to_string(), json!(template));
                    }
                    _ => {
                        return Err(OcliError::type_coercion(
                            "int (sizeU) or string (template) expected",
                        ))
                    }
                }
                attrs.insert("invertOffset".to_string(), json!(invert_offset));
                if let Some(side) = side {
                    attrs.insert("orientation".to_string(), json!(self.eval_string(side, "side")?));
                }
                (path, Entity::Device)
            }
            CreateNode::Corridor {
                path,
                pos,
                unit,
                rotation,
                size,
                temperature,
            } => {
                let path = self.eval_path(path)?;
                self.eval_placement(pos, unit, rotation, &mut attrs)?;
                let size = self.eval_vec(size, Some(3), "size")?;
                attrs.insert("size".to_string(), json!(size));
                attrs.insert(
                    "temperature".to_string(),
                    json!(self.eval_string(temperature, "temperature")?),
                );
                (path, Entity::Corridor)
            }
            CreateNode::Group { path, children } => {
                let path = self.eval_path(path)?;
                let content = self.eval_group_content(children)?;
                attrs.insert("content".to_string(), json!(content));
                (path, Entity::Group)
            }
            CreateNode::Virtual {
                path,
                vtype,
                vlinks,
                role,
            } => {
                let path = self.eval_path(path)?;
                let mut config = Object::new();
                config.insert("type".to_string(), json!(self.eval_string(vtype, "vtype")?));
                if let Some(role) = role {
                    config.insert("role".to_string(), json!(self.eval_string(role, "role")?));
                }
                attrs.insert("virtual_config".to_string(), JsonValue::Object(config));
                if let Some(vlinks) = vlinks {
                    let mut links = Vec::with_capacity(vlinks.len());
                    for node in vlinks {
                        let link = self.eval_string(node, "vlinks")?;
                        if !link.is_empty() {
                            links.push(link);
                        }
                    }
                    attrs.insert("vlinks".to_string(), json!(links));
                }
                (path, Entity::VirtualObject)
            }
            CreateNode::Orphan { path, template } => {
                let path = self.eval_path(path)?;
                attrs.insert("template".to_string(), json!(self.eval_string(template, "template")?));
                (path, Entity::StrayDevice)
            }
            CreateNode::Tag { .. } | CreateNode::Layer { .. } => {
                return Err(OcliError::runtime("tags and layers are not hierarchy objects"))
            }
        };
        Ok((path, entity, attrs))
    }

    fn eval_size_or_template(&mut self, node: &Node, attrs: &mut Object) -> Result<(), OcliError> {
        match self.execute(node)? {
            Value::FloatVector(size) if size.len() == 3 => {
                attrs.insert("size".to_string(), json!(size));
            }
            Value::String(template) => {
                attrs.insert("template".to_string(), json!(template));
            }
            _ => {
                return Err(OcliError::type_coercion(
                    "vector3 (size) or string (template) expected",
                ))
            }
        }
        Ok(())
    }

    /// `posXYZ`, `posXYUnit` and `rotation` of racks, corridors and generics.
    fn eval_placement(
        &mut self,
        pos: &Node,
        unit: &Node,
        rotation: &Node,
        attrs: &mut Object,
    ) -> Result<(), OcliError> {
        let pos = self.eval_vec(pos, None, "position")?;
        if pos.len() != 2 && pos.len() != 3 {
            return Err(OcliError::type_coercion(
                "position should be a vector2 or a vector3",
            ));
        }
        attrs.insert("posXYZ".to_string(), json!(pos));
        attrs.insert("posXYUnit".to_string(), json!(self.eval_string(unit, "unit")?));
        let rotation = to_rotation(&self.execute(rotation)?)?;
        attrs.insert("rotation".to_string(), json!(rotation));
        Ok(())
    }

    /// Names of the group members.
    pub(crate) fn eval_group_content(&mut self, children: &[PathNode]) -> Result<Vec<String>, OcliError> {
        let mut content = Vec::with_capacity(children.len());
        for child in children {
            let path = self.eval_path(child)?;
            let name = path.rsplit('/').next().unwrap_or_default().to_string();
            content.push(name);
        }
        Ok(content)
    }

    fn create_object(&mut self, path: &str, entity: Entity, mut attrs: Object) -> Result<(), OcliError> {
        let mut data = base_data(entity, path)?;
        let has_template = attrs.contains_key("template");
        match entity {
            Entity::Building | Entity::Room | Entity::Rack | Entity::Corridor | Entity::Generic => {
                merge_defaults(&mut attrs, entity.base_attributes());
                if !has_template {
                    set_size(&mut attrs)?;
                }
                set_position(entity, &mut attrs)?;
            }
            Entity::Device if !has_template && slot_names(&attrs).len() > 1 => {
                return Err(OcliError::runtime(
                    "invalid device syntax: only one slot can be provided if no template",
                ));
            }
            _ => {}
        }
        if self.skip_effect("create") {
            return Ok(());
        }

        let parent = self.creation_parent(entity, path)?;
        if entity.has_parent() {
            let parent_id = parent
                .as_ref()
                .and_then(|p| str_attr(p, "id"))
                .unwrap_or_default();
            data.insert("parentId".to_string(), json!(parent_id));
        }
        if entity != Entity::Domain {
            let domain = match parent.as_ref().and_then(|p| p.get("domain")) {
                Some(domain) => domain.clone(),
                None => json!(self.state.customer),
            };
            data.insert("domain".to_string(), domain);
        }

        if has_template {
            self.apply_template(entity, &mut attrs, &mut data)?;
        } else if entity == Entity::Device {
            self.device_size_without_template(&mut attrs, parent.as_ref())?;
        }
        if entity == Entity::Device {
            merge_defaults(&mut attrs, entity.base_attributes());
        }
        data.insert("attributes".to_string(), JsonValue::Object(attrs));

        self.request(
            HttpMethod::Post,
            &entity.endpoint(),
            Some(&JsonValue::Object(data)),
            201,
        )?;
        info!(path, category = entity.category(), "object created");
        Ok(())
    }

    /// Parent object of `path`, required except for top-level domains and
    /// virtual objects.
    fn creation_parent(&mut self, entity: Entity, path: &str) -> Result<Option<Object>, OcliError> {
        if !entity.has_parent() {
            return Ok(None);
        }
        let parent_path = path_remove_last(path, 1);
        let parent = self.poll_object(&parent_path)?;
        let top_level_domain =
            entity == Entity::Domain && parent_path == DOMAINS_PATH.trim_end_matches('/');
        if parent.is_none() && !top_level_domain && entity != Entity::VirtualObject {
            return Err(OcliError::resolution("parent not found"));
        }
        Ok(parent)
    }

    fn get_template(&mut self, name: &str, entity: Entity) -> Result<Object, OcliError> {
        let location = entity.templates_path().ok_or_else(|| {
            OcliError::runtime(format!("templates are not applicable to {}", entity.category()))
        })?;
        let node = match self.tree(&format!("{}{}", location, name), 0) {
            Ok(node) => node,
            Err(e) if e.is_object_not_found() => {
                return Err(OcliError::resolution("template not found"))
            }
            Err(e) => return Err(e),
        };
        let template = node.object().cloned().ok_or_else(|| OcliError::resolution("template not found"))?;
        if matches!(entity, Entity::Building | Entity::Room) {
            return Ok(template);
        }
        let category = str_attr(&template, "category").unwrap_or_default();
        if category != entity.category() {
            return Err(OcliError::runtime(format!(
                "template of category {} is not applicable to {}",
                category,
                entity.category()
            )));
        }
        Ok(template)
    }

    fn apply_template(&mut self, entity: Entity, attrs: &mut Object, data: &mut Object) -> Result<(), OcliError> {
        let name = str_attr(attrs, "template").unwrap_or_default().to_string();
        let template = self.get_template(&name, entity)?;
        debug!(template = %name, "applying template");

        let (key, unit) = if template.contains_key("sizeWDHmm") {
            ("sizeWDHmm", "mm")
        } else {
            ("sizeWDHm", "m")
        };
        let size = match template.get(key).and_then(JsonValue::as_array) {
            Some(size) if size.len() == 3 => size.clone(),
            _ => {
                warn!(template = %name, "invalid size value in template");
                return Err(OcliError::runtime("invalid size vector on given template"));
            }
        };
        attrs.insert("size".to_string(), JsonValue::Array(size[..2].to_vec()));
        attrs.insert("height".to_string(), size[2].clone());
        copy_value(attrs, &template, "shape");

        let template_type = template
            .get("attributes")
            .and_then(JsonValue::as_object)
            .and_then(|a| str_attr(a, "type"));
        match entity {
            Entity::Device | Entity::StrayDevice => {
                if matches!(template_type, Some("chassis") | Some("server")) {
                    let height = size[2]
                        .as_f64()
                        .ok_or_else(|| OcliError::runtime("invalid size vector on given template"))?;
                    let size_u = ((height / 1000.0) / RACK_UNIT) as i64;
                    attrs.insert("sizeU".to_string(), json!(size_u));
                }
            }
            Entity::Room => {
                if let Some(technical) = template.get("technicalArea") {
                    attrs.insert("technical".to_string(), technical.clone());
                }
                if let Some(reserved) = template.get("reservedArea") {
                    attrs.insert("reserved".to_string(), reserved.clone());
                }
                for key in ROOM_TEMPLATE_ATTRIBUTES {
                    copy_value(attrs, &template, key);
                }
            }
            _ => {
                attrs.insert("sizeUnit".to_string(), json!(unit));
                attrs.insert("heightUnit".to_string(), json!(unit));
            }
        }

        if let Some(description) = template.get("description") {
            data.insert("description".to_string(), description.clone());
        }
        if !copy_value(attrs, &template, "fbxModel") && entity != Entity::Building {
            attrs.insert("fbxModel".to_string(), json!(""));
        }
        copy_value(attrs, &template, "orientation");
        if let Some(template_attrs) = template.get("attributes").and_then(JsonValue::as_object) {
            merge_missing(attrs, template_attrs);
        }
        Ok(())
    }

    /// A device without template takes the size of its slot, or of its rack.
    fn device_size_without_template(
        &mut self,
        attrs: &mut Object,
        rack: Option<&Object>,
    ) -> Result<(), OcliError> {
        let slot = match (slot_names(attrs).first(), rack) {
            (Some(location), Some(rack)) => self.rack_slot(rack, location)?,
            _ => None,
        };
        let slot_size = slot.and_then(|slot| float_vec(slot.get("elemSize")));
        match slot_size {
            Some(size) if size.len() >= 2 => {
                attrs.insert("size".to_string(), json!([size[0] / 10.0, size[1] / 10.0]));
            }
            _ => {
                let rack_size = rack
                    .and_then(|r| r.get("attributes"))
                    .and_then(|a| a.get("size"));
                if let Some(size) = rack_size {
                    attrs.insert("size".to_string(), size.clone());
                }
            }
        }
        Ok(())
    }

    /// Slot `location` of the template of a rack.
    fn rack_slot(&mut self, rack: &Object, location: &str) -> Result<Option<Object>, OcliError> {
        let template = rack
            .get("attributes")
            .and_then(JsonValue::as_object)
            .and_then(|a| str_attr(a, "template"))
            .unwrap_or_default();
        if template.is_empty() {
            return Ok(None);
        }
        let endpoint = format!("{}/{}", Namespace::ObjectTemplates.object_endpoint(), template);
        let response = self.request(HttpMethod::Get, &endpoint, None, 200)?;
        let Some(slots) = response
            .data()
            .and_then(|d| d.get("slots"))
            .and_then(JsonValue::as_array)
        else {
            return Ok(None);
        };
        slots
            .iter()
            .filter_map(JsonValue::as_object)
            .find(|slot| str_attr(slot, "location") == Some(location))
            .cloned()
            .map(Some)
            .ok_or_else(|| OcliError::runtime(format!("the slot {} does not exist", location)))
    }

    fn create_tag(&mut self, slug: &str, color: &str) -> Result<(), OcliError> {
        let body = json!({"slug": slug, "description": slug, "color": color});
        self.request(HttpMethod::Post, Namespace::Tags.object_endpoint(), Some(&body), 201)?;
        info!(slug, "tag created");
        Ok(())
    }

    fn create_layer(&mut self, slug: &str, applicability: &str, filter: &str) -> Result<(), OcliError> {
        let applicability = applicability_to_id(applicability).map_err(OcliError::Runtime)?;
        let mut body = Object::new();
        body.insert("slug".to_string(), json!(slug));
        body.insert(LAYER_FILTERS.to_string(), json!(filter));
        body.insert(LAYER_APPLICABILITY.to_string(), json!(applicability));
        self.request(
            HttpMethod::Post,
            Namespace::Layers.object_endpoint(),
            Some(&JsonValue::Object(body)),
            201,
        )?;
        self.state.hierarchy.invalidate_layers();
        info!(slug, "layer created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::commands::testing::Harness;
    use crate::network::HttpMethod;

    fn posted(h: &Harness) -> serde_json::Value {
        let last = h.api.last().unwrap();
        assert_eq!(last.method, HttpMethod::Post);
        last.body.unwrap()
    }

    fn room_harness() -> Harness {
        let h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/hierarchy_objects/BASIC.A.R1",
            200,
            json!({"data": {"id": "BASIC.A.R1", "name": "R1", "category": "room", "domain": "dom",
                "attributes": {"size": [60, 120]}}}),
        );
        h
    }

    #[test]
    fn test_create_site_from_variable() {
        let mut h = Harness::new();
        h.state.curr_path = "/Physical".to_string();
        h.state.customer = "acme".to_string();
        h.api.on(HttpMethod::Post, "/api/sites", 201, json!({"data": {}}));
        h.run(".var:siteName=siteB");
        h.run("+site:$siteName");
        assert_eq!(h.api.calls_to(HttpMethod::Post, "/api/sites"), 1);
        assert_eq!(
            posted(&h),
            json!({"name": "siteB", "category": "site", "description": "", "domain": "acme", "attributes": {}})
        );
    }

    #[test]
    fn test_create_building_splits_size() {
        let mut h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/hierarchy_objects/BASIC",
            200,
            json!({"data": {"id": "BASIC", "name": "BASIC", "category": "site", "domain": "dom"}}),
        );
        h.api.on(HttpMethod::Post, "/api/buildings", 201, json!({"data": {}}));
        h.run("+bd:/Physical/BASIC/A@[5,5]@49.5@[300,300,5]");
        let body = posted(&h);
        assert_eq!(body["parentId"], json!("BASIC"));
        assert_eq!(body["domain"], json!("dom"));
        assert_eq!(
            body["attributes"],
            json!({"posXY": [5.0, 5.0], "rotation": 49.5, "size": [300.0, 300.0], "height": 5.0,
                "posXYUnit": "m", "sizeUnit": "m", "heightUnit": "m"})
        );
    }

    #[test]
    fn test_create_without_parent() {
        let mut h = Harness::new();
        assert_eq!(
            h.fail("+bd:/Physical/NOPE/A@[5,5]@0@[1,1,1]"),
            "parent not found"
        );
        assert_eq!(h.api.calls_to(HttpMethod::Post, "/api/buildings"), 0);
    }

    #[test]
    fn test_create_rack_position_checks() {
        let mut h = room_harness();
        assert_eq!(
            h.fail("+rk:/Physical/BASIC/A/R1/RK1@[1]@m@front@[60,120,42]"),
            "position should be a vector2 or a vector3"
        );
        assert_eq!(
            h.fail("+rk:/Physical/BASIC/A/R1/RK1@[1,2]@m@front@[60,120]"),
            "vector3 (size) or string (template) expected"
        );
    }

    #[test]
    fn test_create_rack_fills_position() {
        let mut h = room_harness();
        h.api.on(HttpMethod::Post, "/api/racks", 201, json!({"data": {}}));
        h.run("+rk:/Physical/BASIC/A/R1/RK1@[1,2]@t@front@[60,120,42]");
        let attrs = posted(&h)["attributes"].clone();
        assert_eq!(attrs["posXYZ"], json!([1.0, 2.0, 0.0]));
        assert_eq!(attrs["rotation"], json!([0.0, 0.0, 180.0]));
        assert_eq!(attrs["heightUnit"], json!("U"));
        assert_eq!(attrs["height"], json!(42.0));
    }

    #[test]
    fn test_create_rack_from_template() {
        let mut h = room_harness();
        h.api.on(
            HttpMethod::Get,
            "/api/obj_templates/rack-tpl",
            200,
            json!({"data": {"slug": "rack-tpl", "category": "rack", "description": "a rack",
                "sizeWDHmm": [600, 1200, 2000], "attributes": {"vendor": "ACME", "sizeUnit": "cm"}}}),
        );
        h.api.on(HttpMethod::Post, "/api/racks", 201, json!({"data": {}}));
        h.run("+rk:/Physical/BASIC/A/R1/RK1@[1,2,0]@t@[0,0,0]@rack-tpl");
        let body = posted(&h);
        assert_eq!(body["description"], json!("a rack"));
        let attrs = &body["attributes"];
        assert_eq!(attrs["size"], json!([600, 1200]));
        assert_eq!(attrs["height"], json!(2000));
        assert_eq!(attrs["sizeUnit"], json!("mm"));
        assert_eq!(attrs["vendor"], json!("ACME"));
        assert_eq!(attrs["fbxModel"], json!(""));
    }

    #[test]
    fn test_create_with_wrong_template() {
        let mut h = room_harness();
        h.api.on(
            HttpMethod::Get,
            "/api/obj_templates/dev-tpl",
            200,
            json!({"data": {"slug": "dev-tpl", "category": "device", "sizeWDHmm": [1, 1, 1]}}),
        );
        assert_eq!(
            h.fail("+rk:/Physical/BASIC/A/R1/RK1@[1,2]@t@front@dev-tpl"),
            "template of category device is not applicable to rack"
        );
        assert_eq!(
            h.fail("+rk:/Physical/BASIC/A/R1/RK1@[1,2]@t@front@missing"),
            "template not found"
        );
    }

    #[test]
    fn test_create_device_in_slot() {
        let mut h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/hierarchy_objects/BASIC.A.R1.RK1",
            200,
            json!({"data": {"id": "BASIC.A.R1.RK1", "name": "RK1", "category": "rack", "domain": "dom",
                "attributes": {"template": "rack-tpl", "size": [60, 120]}}}),
        );
        h.api.on(
            HttpMethod::Get,
            "/api/obj_templates/rack-tpl",
            200,
            json!({"data": {"slots": [{"location": "u01", "elemSize": [500, 400]}]}}),
        );
        h.api.on(HttpMethod::Post, "/api/devices", 201, json!({"data": {}}));
        h.run("+dv:/Physical/BASIC/A/R1/RK1/D1@u01@2");
        let attrs = posted(&h)["attributes"].clone();
        assert_eq!(attrs["slot"], json!(["u01"]));
        assert_eq!(attrs["sizeU"], json!(2));
        assert_eq!(attrs["height"], json!(89.0));
        assert_eq!(attrs["size"], json!([50.0, 40.0]));
        assert_eq!(attrs["orientation"], json!("front"));
        assert_eq!(attrs["invertOffset"], json!(false));
    }

    #[test]
    fn test_create_device_with_pos_u() {
        let mut h = Harness::new();
        h.api.on(
            HttpMethod::Get,
            "/api/hierarchy_objects/BASIC.A.R1.RK1",
            200,
            json!({"data": {"id": "BASIC.A.R1.RK1", "name": "RK1", "category": "rack",
                "attributes": {"size": [60, 120]}}}),
        );
        h.api.on(HttpMethod::Post, "/api/devices", 201, json!({"data": {}}));
        h.run("+dv:/Physical/BASIC/A/R1/RK1/D1@12@1@true@rear");
        let attrs = posted(&h)["attributes"].clone();
        assert_eq!(attrs["posU"], json!(12));
        assert_eq!(attrs["size"], json!([60, 120]));
        assert_eq!(attrs["orientation"], json!("rear"));
        assert_eq!(attrs["invertOffset"], json!(true));
    }

    #[test]
    fn test_create_device_many_slots_without_template() {
        let mut h = Harness::new();
        assert_eq!(
            h.fail("+dv:/Physical/BASIC/A/R1/RK1/D1@[u01,u02]@1"),
            "invalid device syntax: only one slot can be provided if no template"
        );
    }

    #[test]
    fn test_create_group_keeps_names() {
        let mut h = room_harness();
        h.state.curr_path = "/Physical/BASIC/A/R1".to_string();
        h.api.on(HttpMethod::Post, "/api/groups", 201, json!({"data": {}}));
        h.run("+gr:G1@{RK1,RK2}");
        let body = posted(&h);
        assert_eq!(body["parentId"], json!("BASIC.A.R1"));
        assert_eq!(body["attributes"], json!({"content": ["RK1", "RK2"]}));
    }

    #[test]
    fn test_create_top_level_domain() {
        let mut h = Harness::new();
        h.api.on(HttpMethod::Post, "/api/domains", 201, json!({"data": {}}));
        h.run("+do:/Organisation/Domain/dom@00ff00");
        let body = posted(&h);
        assert_eq!(body["parentId"], json!(""));
        assert!(body.get("domain").is_none());
        assert_eq!(body["attributes"], json!({"color": "00ff00"}));
        assert_eq!(
            h.fail("+do:/Organisation/Domain/dom@green"),
            "Please provide a valid 6 digit Hex value for the color"
        );
    }

    #[test]
    fn test_create_tag() {
        let mut h = Harness::new();
        h.api.on(HttpMethod::Post, "/api/tags", 201, json!({"data": {}}));
        h.run("+tag:red@ff0000");
        assert_eq!(
            posted(&h),
            json!({"slug": "red", "description": "red", "color": "ff0000"})
        );
    }

    #[test]
    fn test_create_layer_invalidates_cache() {
        let mut h = Harness::new();
        h.api.on(HttpMethod::Get, "/api/layers", 200, json!({"data": {"objects": []}}));
        h.api.on(HttpMethod::Post, "/api/layers", 201, json!({"data": {}}));
        h.run("ls /Logical/Layers");
        h.run("+layer:racks@/Physical/BASIC/A/R1@category=rack");
        assert_eq!(
            posted(&h),
            json!({"slug": "racks", "filter": "category=rack", "applicability": "BASIC.A.R1"})
        );
        h.run("ls /Logical/Layers");
        assert_eq!(h.api.calls_to(HttpMethod::Get, "/api/layers"), 2);
    }

    #[test]
    fn test_create_layer_outside_physical() {
        let mut h = Harness::new();
        assert_eq!(
            h.fail("+layer:racks@/Logical/Tags@category=rack"),
            "applicability must be an hierarchical path, found: /Logical/Tags"
        );
    }

    #[test]
    fn test_create_virtual_object() {
        let mut h = Harness::new();
        h.api.on(HttpMethod::Post, "/api/virtual_objs", 201, json!({"data": {}}));
        h.run("+vobj:/Logical/VirtualObjects/V1@node@[BASIC.A.R1.RK1.D1]@proxy");
        let body = posted(&h);
        assert_eq!(body["category"], json!("virtual_obj"));
        assert_eq!(
            body["attributes"],
            json!({"virtual_config": {"type": "node", "role": "proxy"}, "vlinks": ["BASIC.A.R1.RK1.D1"]})
        );
    }

    #[test]
    fn test_create_skipped_in_dry_run() {
        let mut h = Harness::new();
        h.state.dry_run = true;
        h.run("+bd:/Physical/BASIC/A@[5,5]@0@[1,1,1]");
        h.run("+tag:red@ff0000");
        assert_eq!(h.api.calls(), 0);
        assert_eq!(
            h.fail("+bd:/Physical/BASIC/A@[5,5,5]@0@[1,1,1]"),
            "posXY should be a vector2"
        );
    }
}
