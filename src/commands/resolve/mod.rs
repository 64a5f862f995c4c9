// src/commands/resolve/mod.rs
//! Resolution of shell paths.
//!
//! A shell path is split into its namespace, the flat id used by the API and
//! the layer it goes through, if any. Nodes are looked up in the hierarchy,
//! filled on demand, and objects outside the static tree are fetched with
//! their children and stored in it.

use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::commands::utils::Object;
use crate::hierarchy::{fill_node, poll_object, HierarchyNode, NodeObject, LAYERS_NODE_PATH};
use crate::interpreter::errors::OcliError;
use crate::interpreter::interpreter::InterpreterContext;
use crate::layers::{automatic_layers, Layer};
use crate::network::HttpMethod;
use crate::paths::{
    is_id_element_layer, object_url, object_url_generic, parse_wildcard_response, path_has_layer,
    path_is_layer, path_remove_layer, FilterMap, Namespace, Path, PHYSICAL_PATH,
};

pub(crate) const LAYER_NOT_FOUND: &str = "the layer used does not exist";

fn layer_not_found() -> OcliError {
    OcliError::resolution(LAYER_NOT_FOUND)
}

pub(crate) fn is_layer_not_found(err: &OcliError) -> bool {
    matches!(err, OcliError::Resolution(message) if message == LAYER_NOT_FOUND)
}

/// Depth bounds of a recursive search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecursiveParams {
    pub min_depth: usize,
    /// Unbounded when `None`
    pub max_depth: Option<usize>,
}

/// Flat id of a physical path, `/Physical` itself being the empty id.
fn physical_id(path: &str) -> Option<String> {
    if path == PHYSICAL_PATH.trim_end_matches('/') {
        return Some(String::new());
    }
    match Namespace::split(path) {
        Some((Namespace::Physical, rest)) => Some(rest.trim_end_matches('/').replace('/', ".")),
        _ => None,
    }
}

fn join_ids(previous: String, next: String) -> String {
    match (previous.is_empty(), next.is_empty()) {
        (true, _) => next,
        (false, true) => previous,
        (false, false) => format!("{}.{}", previous, next),
    }
}

impl InterpreterContext<'_> {
    /// Namespace, flat id and layer of an absolute path.
    ///
    /// The layer is kept only when the path designates the layer itself or
    /// its direct content (`room/#racks`, `room/#racks/*`); the id of a layer
    /// path is the wildcard of its parent.
    pub(crate) fn split_path(&mut self, path: &str) -> Result<Path, OcliError> {
        let (prefix, rest) = Namespace::split(path).ok_or_else(OcliError::invalid_path)?;
        let id = rest.replace('/', ".");
        let segments: Vec<&str> = id.split('.').collect();

        let (real_id, layer) = self.split_layer(prefix, String::new(), &segments)?;
        let Some(layer) = layer else {
            return Ok(Path::new(prefix, real_id));
        };

        let name = layer.name();
        let index = segments.iter().position(|s| *s == name).unwrap_or(0);
        let mut split = Path::new(prefix, real_id);
        if index + 2 < segments.len() {
            return Ok(split);
        }
        if index + 1 == segments.len() {
            split.object_id = if split.object_id.is_empty() {
                "*".to_string()
            } else {
                format!("{}.*", split.object_id)
            };
        }
        split.layer = Some(layer);
        Ok(split)
    }

    /// Remove the layers of an id, returning the last one found.
    fn split_layer(
        &mut self,
        prefix: Namespace,
        previous: String,
        segments: &[&str],
    ) -> Result<(String, Option<Layer>), OcliError> {
        let index = segments.iter().position(|s| is_id_element_layer(s));
        let head = match index {
            Some(i) => segments[..i].join("."),
            None => segments.join("."),
        };
        let mut real_id = join_ids(previous, head);
        let Some(i) = index else {
            return Ok((real_id, None));
        };

        let mut layer = self.layer_from_hierarchy(prefix, &real_id, segments[i])?;
        if i + 1 < segments.len() {
            let (nested_id, nested) = self.split_layer(prefix, real_id, &segments[i + 1..])?;
            real_id = nested_id;
            if let Some(nested) = nested {
                layer = nested;
            }
        }
        Ok((real_id, Some(layer)))
    }

    /// Layer `name` under the object `parent_id`, listing the parent when
    /// the layer is not known yet.
    fn layer_from_hierarchy(
        &mut self,
        prefix: Namespace,
        parent_id: &str,
        name: &str,
    ) -> Result<Layer, OcliError> {
        let parent = format!("{}{}", prefix.prefix(), parent_id.replace('.', "/")).replace("/*", "");
        let parent = parent.trim_end_matches('/').to_string();
        let obj = match self.state.hierarchy.find_node(&format!("{}/{}", parent, name)) {
            Some(node) => node.obj.clone(),
            None => {
                let parent_node = self.ls_node(&parent)?;
                parent_node
                    .children
                    .get(name)
                    .map(|node| node.obj.clone())
                    .ok_or_else(layer_not_found)?
            }
        };
        match obj {
            NodeObject::Layer(layer) => Ok(layer),
            NodeObject::UserLayer(layer) => Ok(Layer::UserDefined(layer)),
            _ => Err(layer_not_found()),
        }
    }

    /// Node at `path` with its children loaded `depth` levels deep.
    pub(crate) fn tree(&mut self, path: &str, depth: usize) -> Result<HierarchyNode, OcliError> {
        if path_is_layer(path) {
            return Err(OcliError::resolution("it is not possible to tree a layer"));
        }
        let api = self.api;
        let now = self.clock.now();
        if let Some(node) = self.state.hierarchy.find_node_mut(path) {
            if node.can_be_filled() {
                fill_node(node, api, path, depth, now)?;
                return Ok(node.clone());
            }
        }

        let obj = self.get_object_with_children(path, depth)?;
        debug!(path, depth, "object stored in hierarchy");
        self.state
            .hierarchy
            .add_map_in_path(obj, &path_remove_layer(path))
            .map_err(OcliError::Runtime)
    }

    /// `tree(path, 1)` with the layers of the node added as children.
    pub(crate) fn ls_node(&mut self, path: &str) -> Result<HierarchyNode, OcliError> {
        let mut node = self.tree(path, 1)?;

        let mut layers: Vec<Layer> = Vec::new();
        if let NodeObject::Map(obj) = &node.obj {
            if let Some(category) = obj.get("category").and_then(JsonValue::as_str) {
                let children: Vec<&Object> =
                    node.children.values().filter_map(HierarchyNode::object).collect();
                layers.extend(
                    automatic_layers(category, &children)
                        .into_iter()
                        .map(Layer::Automatic),
                );
            }
        }
        if let Some(id) = physical_id(path) {
            match self.tree(LAYERS_NODE_PATH, 1) {
                Ok(_) => layers.extend(
                    self.state
                        .hierarchy
                        .user_layers()
                        .into_iter()
                        .filter(|layer| layer.applies_to(&id))
                        .map(Layer::UserDefined),
                ),
                Err(e) => warn!(error = %e, "user-defined layers could not be loaded"),
            }
        }

        let target = path_remove_layer(path);
        for layer in layers {
            let child = HierarchyNode::layer(layer);
            if let Some(stored) = self.state.hierarchy.find_node_mut(&target) {
                stored.add_child(child.clone());
            }
            node.add_child(child);
        }
        Ok(node)
    }

    /// Object at `path`, `None` when the API does not know it.
    pub(crate) fn poll_object_with_children(
        &mut self,
        path: &str,
        depth: usize,
    ) -> Result<Option<Object>, OcliError> {
        let split = match self.split_path(path) {
            Ok(split) => split,
            Err(e) if is_layer_not_found(&e) => return Err(e),
            Err(_) => return Ok(None),
        };
        poll_object(self.api, &object_url(&split, depth))
    }

    pub(crate) fn poll_object(&mut self, path: &str) -> Result<Option<Object>, OcliError> {
        self.poll_object_with_children(path, 0)
    }

    pub(crate) fn get_object_with_children(
        &mut self,
        path: &str,
        depth: usize,
    ) -> Result<Object, OcliError> {
        self.poll_object_with_children(path, depth)?
            .ok_or_else(OcliError::object_not_found)
    }

    pub(crate) fn get_object(&mut self, path: &str) -> Result<Object, OcliError> {
        self.get_object_with_children(path, 0)
    }

    /// Endpoint of the single object at `path`.
    pub(crate) fn object_endpoint(&mut self, path: &str) -> Result<String, OcliError> {
        let split = self.split_path(path)?;
        Ok(object_url(&split, 0))
    }

    /// Objects matching a wildcard or layer path, with their shell paths.
    pub(crate) fn wildcard_query(
        &mut self,
        path: &str,
        filters: &FilterMap,
        recursive: Option<&RecursiveParams>,
    ) -> Result<(Vec<Object>, Vec<String>), OcliError> {
        let split = self.split_path(path)?;
        self.objects_query(split, filters, recursive)
    }

    /// Query the generic objects endpoint for an already split path.
    pub(crate) fn objects_query(
        &mut self,
        mut split: Path,
        filters: &FilterMap,
        recursive: Option<&RecursiveParams>,
    ) -> Result<(Vec<Object>, Vec<String>), OcliError> {
        if let Some(recursive) = recursive {
            split
                .make_recursive(recursive.min_depth, recursive.max_depth)
                .map_err(OcliError::Runtime)?;
        }
        let query = object_url_generic(&split, 0, filters);
        let (method, body) = match &query.complex_filter {
            Some(filter) => (HttpMethod::Post, Some(json!({ "filter": filter }))),
            None => (HttpMethod::Get, None),
        };
        let response = self.request(method, &query.endpoint, body.as_ref(), 200)?;
        let route = format!("{} {}", method, query.endpoint);
        parse_wildcard_response(response.data(), split.prefix, &route).map_err(OcliError::Runtime)
    }

    /// Paths designated by `path`: wildcards and layers are expanded, `_`
    /// is the selection.
    pub(crate) fn unfold_path(&mut self, path: &str) -> Result<Vec<String>, OcliError> {
        if path.contains('*') || path_has_layer(path) {
            let (_, paths) = self.wildcard_query(path, &FilterMap::new(), None)?;
            return Ok(paths);
        }
        if path == "_" {
            return Ok(self.state.clipboard.clone());
        }
        Ok(vec![path.to_string()])
    }
}
