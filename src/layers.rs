//! Layers: computed views over the objects of a hierarchy node.
//!
//! A layer is exposed as a `#name` child. Automatic layers derive from the
//! categories and types of a node's children; user-defined layers are stored
//! in the API and apply wherever their applicability pattern matches.

use glob::Pattern;
use indexmap::IndexSet;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::ast::types::COMPLEX_FILTER_KEY;
use crate::paths::{physical_path_to_object_id, FilterMap, PHYSICAL_PATH};

pub const LAYER_APPLICABILITY: &str = "applicability";
pub const LAYER_FILTERS: &str = "filter";
pub const LAYER_FILTERS_ADD: &str = "filter+";

/// `(old) & (new)`
pub fn compose_filters(old: &str, new: &str) -> String {
    format!("({}) & ({})", old, new)
}

/// Object id pattern of an absolute applicability path.
pub fn applicability_to_id(path: &str) -> Result<String, String> {
    if !path.starts_with(PHYSICAL_PATH) {
        return Err(format!(
            "applicability must be an hierarchical path, found: {}",
            path
        ));
    }
    let mut open: Vec<char> = Vec::new();
    for c in path.chars() {
        match c {
            '{' | '[' => open.push(c),
            '}' if open.pop() != Some('{') => return Err(invalid_pattern()),
            ']' if open.pop() != Some('[') => return Err(invalid_pattern()),
            _ => {}
        }
    }
    if !open.is_empty() {
        return Err(invalid_pattern());
    }
    Ok(physical_path_to_object_id(path))
}

fn invalid_pattern() -> String {
    "applicability pattern is not valid".to_string()
}

fn add_filter(filters: &mut FilterMap, expression: &str) {
    let composed = match filters.get(COMPLEX_FILTER_KEY) {
        Some(existing) => compose_filters(existing, expression),
        None => expression.to_string(),
    };
    filters.insert(COMPLEX_FILTER_KEY.to_string(), composed);
}

fn to_layer_name(name: &str) -> String {
    format!("#{}", name)
}

/// Layer computed from the children of a node
#[derive(Debug, Clone, PartialEq)]
pub struct AutomaticLayer {
    pub name: String,
    /// Filter selecting the objects of the layer
    pub api_filters: String,
}

impl AutomaticLayer {
    pub fn new(name: impl Into<String>, api_filters: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_filters: api_filters.into(),
        }
    }
}

/// Layer stored in the API under `/Logical/Layers`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserDefinedLayer {
    pub slug: String,
    #[serde(default)]
    pub applicability: String,
    #[serde(default)]
    pub filter: String,
}

impl UserDefinedLayer {
    /// Whether the layer applies to the object with this flat id.
    ///
    /// `*` matches one segment, `**` any number of them; an empty
    /// applicability matches everything. A layer is also visible one level
    /// above the objects it groups, so the parent id is checked as well.
    pub fn applies_to(&self, id: &str) -> bool {
        if self.matches(id) {
            return true;
        }
        match id.rsplit_once('.') {
            Some((parent, _)) => self.matches(parent),
            None => !id.is_empty() && self.matches(""),
        }
    }

    /// Whether the applicability pattern matches `id`.
    ///
    /// Patterns are dot separated: `**` spans any number of segments, the
    /// other segments are globs (`*`, `?`, `[...]`) and `{a,b}` gives
    /// alternatives.
    pub fn matches(&self, id: &str) -> bool {
        if self.applicability.is_empty() {
            return true;
        }
        let segments: Vec<&str> = if id.is_empty() {
            Vec::new()
        } else {
            id.split('.').collect()
        };
        expand_braces(&self.applicability).iter().any(|alternative| {
            let pattern: Vec<Segment> = alternative.split('.').map(Segment::new).collect();
            match_segments(&pattern, &segments)
        })
    }
}

/// One dot separated part of an applicability pattern
enum Segment {
    AnyDepth,
    Glob(Pattern),
    /// Not a valid glob, compared as is
    Literal(String),
}

impl Segment {
    fn new(text: &str) -> Self {
        if text == "**" {
            return Self::AnyDepth;
        }
        match Pattern::new(text) {
            Ok(pattern) => Self::Glob(pattern),
            Err(_) => Self::Literal(text.to_string()),
        }
    }

    fn matches(&self, segment: &str) -> bool {
        match self {
            Self::AnyDepth => true,
            Self::Glob(pattern) => pattern.matches(segment),
            Self::Literal(text) => text == segment,
        }
    }
}

fn match_segments(pattern: &[Segment], segments: &[&str]) -> bool {
    match pattern.split_first() {
        None => segments.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            (0..=segments.len()).any(|skip| match_segments(rest, &segments[skip..]))
        }
        Some((first, rest)) => match segments.split_first() {
            Some((segment, remaining)) => first.matches(segment) && match_segments(rest, remaining),
            None => false,
        },
    }
}

/// Expand `{a,b}` groups, innermost first.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(close) = pattern.find('}') else {
        return vec![pattern.to_string()];
    };
    let Some(open) = pattern[..close].rfind('{') else {
        return vec![pattern.to_string()];
    };
    let (head, tail) = (&pattern[..open], &pattern[close + 1..]);
    pattern[open + 1..close]
        .split(',')
        .flat_map(|choice| expand_braces(&format!("{}{}{}", head, choice, tail)))
        .collect()
}

/// A layer of either kind
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Automatic(AutomaticLayer),
    UserDefined(UserDefinedLayer),
}

impl Layer {
    pub fn name(&self) -> String {
        match self {
            Self::Automatic(layer) => layer.name.clone(),
            Self::UserDefined(layer) => to_layer_name(&layer.slug),
        }
    }

    /// AND the layer's filter into the complex filter.
    pub fn apply_filters(&self, filters: &mut FilterMap) {
        match self {
            Self::Automatic(layer) => add_filter(filters, &layer.api_filters),
            Self::UserDefined(layer) => add_filter(filters, &layer.filter),
        }
    }
}

/// Turn a word into its plural.
///
/// Words ending in a single `s` are taken as plural already. Endings `ss`,
/// `x`, `z`, `ch` and `sh` take `es`. A consonant followed by `y` becomes
/// `ies`.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return word.to_string();
    }
    if ["ss", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{}es", word);
    }
    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(before)) = (chars.next(), chars.next()) {
        if !"aeiou".contains(before) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{}s", word)
}

/// Rule producing automatic layers from the children of a node
#[derive(Debug, Clone, Copy, PartialEq)]
enum LayerFactory {
    /// One layer when any child has the category
    ByCategory {
        name: &'static str,
        category: &'static str,
    },
    /// One layer per distinct value of an attribute among children of a category
    ByAttribute {
        category: &'static str,
        attribute: &'static str,
    },
}

const ROOM_FACTORIES: &[LayerFactory] = &[
    LayerFactory::ByCategory { name: "#corridors", category: "corridor" },
    LayerFactory::ByCategory { name: "#groups", category: "group" },
    LayerFactory::ByCategory { name: "#racks", category: "rack" },
    LayerFactory::ByCategory { name: "#generics", category: "generic" },
    LayerFactory::ByAttribute { category: "generic", attribute: "type" },
];

const RACK_FACTORIES: &[LayerFactory] = &[
    LayerFactory::ByCategory { name: "#groups", category: "group" },
    LayerFactory::ByAttribute { category: "device", attribute: "type" },
];

const DEVICE_FACTORIES: &[LayerFactory] = &[LayerFactory::ByAttribute {
    category: "device",
    attribute: "type",
}];

const VIRTUAL_FACTORIES: &[LayerFactory] = &[LayerFactory::ByAttribute {
    category: "virtual_obj",
    attribute: "virtual_config.type",
}];

fn factories_for(category: &str) -> &'static [LayerFactory] {
    match category {
        "room" => ROOM_FACTORIES,
        "rack" => RACK_FACTORIES,
        "device" => DEVICE_FACTORIES,
        "virtual_obj" => VIRTUAL_FACTORIES,
        _ => &[],
    }
}

fn object_category(obj: &Map<String, JsonValue>) -> Option<&str> {
    obj.get("category").and_then(JsonValue::as_str)
}

/// Value of an attribute, `a.b` reading key `b` of attribute object `a`.
fn string_attribute<'a>(obj: &'a Map<String, JsonValue>, attribute: &str) -> Option<&'a str> {
    let attributes = obj.get("attributes")?.as_object()?;
    match attribute.split_once('.') {
        Some((prefix, suffix)) => attributes.get(prefix)?.as_object()?.get(suffix)?.as_str(),
        None => attributes.get(attribute)?.as_str(),
    }
}

impl LayerFactory {
    fn from_objects(&self, children: &[&Map<String, JsonValue>]) -> Vec<AutomaticLayer> {
        match *self {
            Self::ByCategory { name, category } => {
                if children.iter().any(|c| object_category(c) == Some(category)) {
                    vec![AutomaticLayer::new(name, format!("category={}", category))]
                } else {
                    Vec::new()
                }
            }
            Self::ByAttribute { category, attribute } => {
                let values: IndexSet<&str> = children
                    .iter()
                    .filter_map(|c| string_attribute(c, attribute))
                    .collect();
                values
                    .into_iter()
                    .map(|value| {
                        AutomaticLayer::new(
                            to_layer_name(&pluralize(value)),
                            format!("category={}&{}={}", category, attribute, value),
                        )
                    })
                    .collect()
            }
        }
    }
}

/// Automatic layers of an object of the given category.
pub fn automatic_layers(category: &str, children: &[&Map<String, JsonValue>]) -> Vec<AutomaticLayer> {
    factories_for(category)
        .iter()
        .flat_map(|factory| factory.from_objects(children))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(applicability: &str) -> UserDefinedLayer {
        UserDefinedLayer {
            slug: "test".to_string(),
            applicability: applicability.to_string(),
            filter: "category=rack".to_string(),
        }
    }

    fn obj(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_double_star_applicability() {
        assert!(layer("BASIC.**.A01").matches("BASIC.A.R1.A01"));
        assert!(layer("BASIC.**.A01").matches("BASIC.A01"));
        assert!(!layer("BASIC.**.A01").matches("BASIC.A.R1.A02"));
    }

    #[test]
    fn test_single_star_applicability() {
        assert!(layer("BASIC.A.*").matches("BASIC.A.R1"));
        assert!(!layer("BASIC.A.*").matches("BASIC.A.R1.A01"));
        assert!(layer("BASIC.A.R*").matches("BASIC.A.R2"));
    }

    #[test]
    fn test_glob_classes_applicability() {
        assert!(layer("BASIC.A.R?").matches("BASIC.A.R1"));
        assert!(!layer("BASIC.A.R?").matches("BASIC.A.R10"));
        assert!(layer("BASIC.A.R[12]").matches("BASIC.A.R1"));
        assert!(!layer("BASIC.A.R[12]").matches("BASIC.A.R3"));
        assert!(layer("BASIC.*.R[!3]").matches("BASIC.B.R2"));
    }

    #[test]
    fn test_alternatives_applicability() {
        assert!(layer("BASIC.A.{R1,R2}").matches("BASIC.A.R2"));
        assert!(!layer("BASIC.A.{R1,R2}").matches("BASIC.A.R3"));
        assert!(layer("{BASIC.A,SITE.**}.R1").matches("SITE.B.C.R1"));
        assert!(layer("BASIC.{A,B{1,2}}.R1").matches("BASIC.B2.R1"));
        assert_eq!(expand_braces("a{b,c}d"), vec!["abd", "acd"]);
    }

    #[test]
    fn test_invalid_glob_is_literal() {
        assert!(layer("BASIC.[A").matches("BASIC.[A"));
        assert!(!layer("BASIC.[A").matches("BASIC.A"));
    }

    #[test]
    fn test_exact_applicability() {
        assert!(!layer("BASIC.A.R2").matches("BASIC.A.R1"));
        assert!(layer("BASIC.A.R1").applies_to("BASIC.A.R1"));
        assert!(layer("BASIC.A.R1").applies_to("BASIC.A.R1.A01"));
        assert!(!layer("BASIC.A.R1").applies_to("BASIC.A"));
    }

    #[test]
    fn test_empty_applicability_is_global() {
        assert!(layer("").matches(""));
        assert!(layer("").matches("BASIC"));
        assert!(layer("").applies_to("BASIC.A.R1"));
    }

    #[test]
    fn test_apply_filters_composes() {
        let user = Layer::UserDefined(layer("BASIC"));
        let mut filters = FilterMap::new();
        user.apply_filters(&mut filters);
        assert_eq!(filters["filter"], "category=rack");

        let mut filters = FilterMap::new();
        filters.insert("filter".to_string(), "name=R1".to_string());
        user.apply_filters(&mut filters);
        assert_eq!(filters["filter"], "(name=R1) & (category=rack)");
        assert_eq!(user.name(), "#test");
    }

    #[test]
    fn test_applicability_to_id() {
        assert_eq!(applicability_to_id("/Physical/BASIC/**/A01").unwrap(), "BASIC.**.A01");
        assert_eq!(
            applicability_to_id("/Logical/Tags/red").unwrap_err(),
            "applicability must be an hierarchical path, found: /Logical/Tags/red"
        );
        assert_eq!(
            applicability_to_id("/Physical/BASIC/R{1,2").unwrap_err(),
            "applicability pattern is not valid"
        );
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("server"), "servers");
        assert_eq!(pluralize("chassis"), "chassis");
        assert_eq!(pluralize("switch"), "switches");
        assert_eq!(pluralize("proxy"), "proxies");
        assert_eq!(pluralize("bay"), "bays");
        assert_eq!(pluralize("glass"), "glasses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("mesh"), "meshes");
    }

    #[test]
    fn test_room_automatic_layers() {
        let rack = obj(json!({"category": "rack", "name": "R1"}));
        let generic = obj(json!({"category": "generic", "attributes": {"type": "table"}}));
        let layers = automatic_layers("room", &[&rack, &generic]);
        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["#racks", "#generics", "#tables"]);
        assert_eq!(layers[2].api_filters, "category=generic&type=table");
    }

    #[test]
    fn test_virtual_layers_by_config_type() {
        let node = obj(json!({"category": "virtual_obj", "attributes": {"virtual_config": {"type": "node"}}}));
        let layers = automatic_layers("virtual_obj", &[&node]);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "#nodes");
        assert_eq!(layers[0].api_filters, "category=virtual_obj&virtual_config.type=node");
    }

    #[test]
    fn test_no_layers_for_sites() {
        let rack = obj(json!({"category": "rack"}));
        assert!(automatic_layers("site", &[&rack]).is_empty());
    }

    #[test]
    fn test_deserialize_user_layer() {
        let layer: UserDefinedLayer =
            serde_json::from_value(json!({"slug": "racks", "applicability": "BASIC.A", "filter": "category=rack"}))
                .unwrap();
        assert_eq!(layer.slug, "racks");
    }
}
