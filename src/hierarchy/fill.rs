//! Loading of hierarchy nodes from the API

use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, trace};

use super::types::{FillStrategy, HierarchyNode, NodeObject};
use crate::interpreter::errors::OcliError;
use crate::layers::UserDefinedLayer;
use crate::network::{ApiPort, HttpMethod};
use crate::paths::{name_or_slug, object_url, Namespace, Path};

const NOT_FOUND: u16 = 404;
const OK: u16 = 200;

pub(crate) fn join_path(path: &str, name: &str) -> String {
    if path == "/" || path.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", path, name)
    }
}

fn invalid_response(route: &str) -> OcliError {
    OcliError::runtime(format!("invalid response from API on {}", route))
}

/// GET an object, `None` when the API does not know it.
pub fn poll_object(api: &dyn ApiPort, url: &str) -> Result<Option<Map<String, JsonValue>>, OcliError> {
    let response = match api.request(HttpMethod::Get, url, None, OK) {
        Ok(response) => response,
        Err(e) if e.status() == Some(NOT_FOUND) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match response.data() {
        Some(JsonValue::Object(obj)) => Ok(Some(obj.clone())),
        Some(JsonValue::Array(items)) => match items.first() {
            Some(JsonValue::Object(obj)) => Ok(Some(obj.clone())),
            _ => Err(invalid_response(&format!("GET {}", url))),
        },
        _ => Err(invalid_response(&format!("GET {}", url))),
    }
}

/// Load the children of `node` up to `depth` levels.
///
/// At depth 1 a cached node filled within the freshness window is left
/// untouched.
pub fn fill_node(
    node: &mut HierarchyNode,
    api: &dyn ApiPort,
    path: &str,
    depth: usize,
    now: DateTime<Utc>,
) -> Result<(), OcliError> {
    if depth == 0 {
        return Ok(());
    }
    if depth == 1 && node.is_updated(now) {
        trace!(path, "hierarchy cache hit");
        return Ok(());
    }
    node.last_fill = Some(now);

    let Some(strategy) = node.fill.clone() else {
        return Ok(());
    };
    debug!(path, depth, ?strategy, "filling hierarchy node");
    match strategy {
        FillStrategy::SyntheticGrouping => {
            for child in node.children.values_mut() {
                let child_path = join_path(path, &child.name);
                fill_node(child, api, &child_path, depth - 1, now)?;
            }
            Ok(())
        }
        FillStrategy::StaticListing {
            url,
            follow,
            full_id,
            keep,
            layers,
        } => fill_listing(node, api, path, depth, now, url, follow, full_id, keep, layers),
        FillStrategy::RecursiveObjectFetch => {
            let (prefix, rest) =
                Namespace::split(path).ok_or_else(OcliError::invalid_path)?;
            let target = Path::new(prefix, rest.replace('/', "."));
            let obj = poll_object(api, &object_url(&target, depth))?
                .ok_or_else(|| OcliError::resolution("location not found"))?;
            node.fill_with_map(obj).map_err(OcliError::Runtime)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_listing(
    node: &mut HierarchyNode,
    api: &dyn ApiPort,
    path: &str,
    depth: usize,
    now: DateTime<Utc>,
    url: &str,
    follow: bool,
    full_id: bool,
    keep: Option<&str>,
    layers: bool,
) -> Result<(), OcliError> {
    let response = api.request(HttpMethod::Get, url, None, OK)?;
    let route = format!("GET {}", url);
    let objects = response
        .data()
        .and_then(|data| data.get("objects"))
        .and_then(JsonValue::as_array)
        .ok_or_else(|| invalid_response(&route))?;

    let kept = keep.and_then(|name| node.children.remove(name));
    node.children.clear();

    for item in objects {
        let mut obj = item.as_object().cloned().ok_or_else(|| invalid_response(&route))?;
        let id = obj.get("id").and_then(JsonValue::as_str).map(str::to_string);
        let name = match (&id, full_id) {
            (Some(id), true) => id.replace('.', "/"),
            _ => {
                let name = name_or_slug(&obj);
                // only roots of the listing become children
                if id.as_deref().is_some_and(|id| id != name) {
                    continue;
                }
                name
            }
        };
        obj.remove("children");

        let mut child = HierarchyNode::new(name.as_str());
        child.obj = if layers {
            let layer: UserDefinedLayer = serde_json::from_value(JsonValue::Object(obj))
                .map_err(|_| invalid_response(&route))?;
            NodeObject::UserLayer(layer)
        } else {
            NodeObject::Map(obj)
        };
        if follow {
            child.fill = Some(FillStrategy::RecursiveObjectFetch);
        }
        fill_node(&mut child, api, &join_path(path, &name), depth - 1, now)?;
        node.add_child(child);
    }

    if let Some(mut kept) = kept {
        let kept_path = join_path(path, &kept.name);
        fill_node(&mut kept, api, &kept_path, depth - 1, now)?;
        node.add_child(kept);
    }
    Ok(())
}
