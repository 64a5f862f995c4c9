//! Endpoints addressing objects of the inventory API

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use url::form_urlencoded;

use super::types::{Namespace, Path};
use crate::ast::types::COMPLEX_FILTER_KEY;

pub const OBJECTS_URL: &str = "/api/objects";
pub const OBJECTS_SEARCH_URL: &str = "/api/objects/search";
/// Automatic layer listing the nodes of a virtual cluster
pub const NODES_LAYER: &str = "#nodes";

/// Evaluated filters, the complex expression under `filter`
pub type FilterMap = IndexMap<String, String>;

/// Query parameters, encoded sorted by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` form, spaces become `+`.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.0)
            .finish()
    }
}

fn with_query(endpoint: &str, params: &QueryParams) -> String {
    if params.is_empty() {
        endpoint.to_string()
    } else {
        format!("{}?{}", endpoint, params.encode())
    }
}

/// Endpoint of a single object, with its children up to `depth`.
pub fn object_url(path: &Path, depth: usize) -> String {
    let mut params = QueryParams::new();
    let mut endpoint = path.prefix.object_endpoint().to_string();

    let physical_virtual = match path.prefix {
        Namespace::VirtualObjects => path.object_id.split_once(".Physical."),
        _ => None,
    };
    if let Some((_, physical_id)) = physical_virtual {
        endpoint = OBJECTS_URL.to_string();
        params.set("id", physical_id);
        if depth > 0 {
            params.set("limit", depth.to_string());
        }
    } else {
        endpoint.push('/');
        endpoint.push_str(&path.object_id);
        if depth > 0 {
            endpoint.push_str("/all");
            params.set("limit", depth.to_string());
        }
    }
    with_query(&endpoint, &params)
}

/// A request on the generic objects endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectsQuery {
    pub endpoint: String,
    /// Body of the search request when a complex filter is present
    pub complex_filter: Option<String>,
}

/// Endpoint listing every object matching a (possibly wildcard) path.
///
/// Simple filters become query parameters; a complex filter switches to the
/// search endpoint, its expression sent in the body.
pub fn object_url_generic(path: &Path, depth: usize, filters: &FilterMap) -> ObjectsQuery {
    let mut filters = filters.clone();
    let mut cluster_nodes = false;
    if let Some(layer) = &path.layer {
        layer.apply_filters(&mut filters);
        if path.prefix == Namespace::VirtualObjects && layer.name() == NODES_LAYER {
            // Nodes are found through their cluster, not their id
            cluster_nodes = true;
            let cluster = path.object_id.strip_suffix(".*").unwrap_or(&path.object_id);
            if let Some(filter) = filters.get_mut(COMPLEX_FILTER_KEY) {
                *filter = filter.replacen(
                    "category=virtual_obj",
                    &format!("virtual_config.clusterId={}", cluster),
                    1,
                );
            }
        }
    }

    let mut params = QueryParams::new();
    match path.prefix {
        Namespace::Groups => {
            params.set("namespace", "logical");
            params.set("category", "group");
            params.set("id", path.object_id.as_str());
        }
        Namespace::VirtualObjects if cluster_nodes => {}
        Namespace::VirtualObjects => {
            params.set("category", "virtual_obj");
            if path.object_id != "*" {
                params.set("id", path.object_id.as_str());
            }
        }
        ns => {
            if let Some(namespace) = ns.api_namespace() {
                params.set("namespace", namespace);
            }
            let key = if ns.uses_slug() { "slug" } else { "id" };
            params.set(key, path.object_id.as_str());
        }
    }
    if depth > 0 {
        params.set("limit", depth.to_string());
    }

    let mut endpoint = OBJECTS_URL;
    let mut complex_filter = None;
    for (key, value) in &filters {
        if key == COMPLEX_FILTER_KEY {
            endpoint = OBJECTS_SEARCH_URL;
            complex_filter = Some(value.clone());
        } else {
            params.set(key, value.as_str());
        }
    }

    ObjectsQuery {
        endpoint: with_query(endpoint, &params),
        complex_filter,
    }
}

/// Slug of an object, falling back to its name.
pub fn name_or_slug(obj: &Map<String, JsonValue>) -> String {
    obj.get("slug")
        .and_then(JsonValue::as_str)
        .or_else(|| obj.get("name").and_then(JsonValue::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Objects of a wildcard answer and their shell paths.
pub fn parse_wildcard_response(
    data: Option<&JsonValue>,
    prefix: Namespace,
    route: &str,
) -> Result<(Vec<Map<String, JsonValue>>, Vec<String>), String> {
    let invalid = || format!("invalid response from API on {}", route);
    let items = data.and_then(JsonValue::as_array).ok_or_else(invalid)?;

    let mut objects = Vec::with_capacity(items.len());
    let mut paths = Vec::with_capacity(items.len());
    for item in items {
        let obj = item.as_object().ok_or_else(invalid)?;
        let suffix = match obj.get("id").and_then(JsonValue::as_str) {
            Some(id) => id.replace('.', "/"),
            None => name_or_slug(obj),
        };
        paths.push(format!("{}{}", prefix.prefix(), suffix));
        objects.push(obj.clone());
    }
    Ok((objects, paths))
}
