//! In-memory mirror of the shell namespace, filled lazily from the API.
//!
//! Only the `Layers` node is time-cached; other nodes, once filled, stay
//! valid for the life of the process.

pub mod clock;
pub mod fill;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use fill::{fill_node, poll_object};
pub use types::{FillStrategy, HierarchyNode, NodeObject, UPDATED_THRESHOLD_SECS};

use serde_json::{Map, Value as JsonValue};

use crate::layers::UserDefinedLayer;
use crate::paths::name_or_slug;

pub const LAYERS_NODE_PATH: &str = "/Logical/Layers";

fn listing(url: &'static str, follow: bool) -> FillStrategy {
    FillStrategy::StaticListing {
        url,
        follow,
        full_id: false,
        keep: None,
        layers: false,
    }
}

/// Root of the namespace tree
#[derive(Debug, Clone, PartialEq)]
pub struct Hierarchy {
    pub root: HierarchyNode,
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl Hierarchy {
    /// Static skeleton: `/Physical`, `/Logical/*` and `/Organisation/*`.
    pub fn new() -> Self {
        let mut root = HierarchyNode::with_fill("", FillStrategy::SyntheticGrouping);

        let mut physical = HierarchyNode::with_fill(
            "Physical",
            FillStrategy::StaticListing {
                url: "/api/sites",
                follow: true,
                full_id: false,
                keep: Some("Stray"),
                layers: false,
            },
        );
        physical.add_child(HierarchyNode::with_fill(
            "Stray",
            listing("/api/stray-objects", true),
        ));
        root.add_child(physical);

        let mut logical = HierarchyNode::with_fill("Logical", FillStrategy::SyntheticGrouping);
        logical.add_child(HierarchyNode::with_fill(
            "ObjectTemplates",
            listing("/api/obj-templates", false),
        ));
        logical.add_child(HierarchyNode::with_fill(
            "RoomTemplates",
            listing("/api/room-templates", false),
        ));
        logical.add_child(HierarchyNode::with_fill(
            "BldgTemplates",
            listing("/api/bldg-templates", false),
        ));
        logical.add_child(HierarchyNode::cached(
            "Layers",
            FillStrategy::StaticListing {
                url: "/api/layers",
                follow: false,
                full_id: false,
                keep: None,
                layers: true,
            },
        ));
        logical.add_child(HierarchyNode::with_fill("Tags", listing("/api/tags", false)));
        logical.add_child(HierarchyNode::with_fill(
            "Groups",
            FillStrategy::StaticListing {
                url: "/api/groups",
                follow: false,
                full_id: true,
                keep: None,
                layers: false,
            },
        ));
        logical.add_child(HierarchyNode::with_fill(
            "VirtualObjects",
            listing("/api/virtual_objs", true),
        ));
        root.add_child(logical);

        let mut organisation =
            HierarchyNode::with_fill("Organisation", FillStrategy::SyntheticGrouping);
        organisation.add_child(HierarchyNode::with_fill("Domain", listing("/api/domains", true)));
        organisation.add_child(HierarchyNode::new("Enterprise"));
        root.add_child(organisation);

        Self { root }
    }

    pub fn find_node(&self, path: &str) -> Option<&HierarchyNode> {
        self.root.find_node(path)
    }

    pub fn find_node_mut(&mut self, path: &str) -> Option<&mut HierarchyNode> {
        self.root.find_node_mut(path)
    }

    /// Store an API object (and its children) at `path`.
    pub fn add_map_in_path(
        &mut self,
        obj: Map<String, JsonValue>,
        path: &str,
    ) -> Result<HierarchyNode, String> {
        let node = HierarchyNode::from_map(name_or_slug(&obj), obj)?;
        self.root.add_child_in_path(node.clone(), path);
        Ok(node)
    }

    /// Force the next listing of `/Logical/Layers` to hit the API.
    pub fn invalidate_layers(&mut self) {
        if let Some(layers) = self.root.find_node_mut(LAYERS_NODE_PATH) {
            layers.last_fill = None;
        }
    }

    /// User-defined layers currently loaded.
    pub fn user_layers(&self) -> Vec<UserDefinedLayer> {
        self.find_node(LAYERS_NODE_PATH)
            .map(|node| {
                node.children
                    .values()
                    .filter_map(|child| match &child.obj {
                        NodeObject::UserLayer(layer) => Some(layer.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::types::mock::MockApi;
    use crate::network::HttpMethod;
    use chrono::Duration;
    use serde_json::json;

    fn layers_api() -> MockApi {
        let api = MockApi::new();
        api.on(
            HttpMethod::Get,
            "/api/layers",
            200,
            json!({"data": {"objects": [{"slug": "racks", "applicability": "BASIC.A", "filter": "category=rack"}]}}),
        );
        api
    }

    #[test]
    fn test_base_tree() {
        let hierarchy = Hierarchy::new();
        assert!(hierarchy.find_node("/Physical/Stray").is_some());
        assert!(hierarchy.find_node("/Logical/Layers").unwrap().is_cached);
        assert!(hierarchy.find_node("/Organisation/Enterprise").is_some());
        assert!(hierarchy.find_node("/Physical/BASIC").is_none());
    }

    #[test]
    fn test_layers_cached_within_threshold() {
        let api = layers_api();
        let clock = FixedClock::default();
        let mut hierarchy = Hierarchy::new();

        let node = hierarchy.find_node_mut(LAYERS_NODE_PATH).unwrap();
        fill_node(node, &api, LAYERS_NODE_PATH, 1, clock.now()).unwrap();
        clock.advance(Duration::seconds(UPDATED_THRESHOLD_SECS - 1));
        let node = hierarchy.find_node_mut(LAYERS_NODE_PATH).unwrap();
        fill_node(node, &api, LAYERS_NODE_PATH, 1, clock.now()).unwrap();
        assert_eq!(api.calls_to(HttpMethod::Get, "/api/layers"), 1);

        clock.advance(Duration::seconds(2));
        let node = hierarchy.find_node_mut(LAYERS_NODE_PATH).unwrap();
        fill_node(node, &api, LAYERS_NODE_PATH, 1, clock.now()).unwrap();
        assert_eq!(api.calls_to(HttpMethod::Get, "/api/layers"), 2);

        assert_eq!(hierarchy.user_layers()[0].slug, "racks");
    }

    #[test]
    fn test_invalidate_layers() {
        let api = layers_api();
        let now = chrono::Utc::now();
        let mut hierarchy = Hierarchy::new();
        let node = hierarchy.find_node_mut(LAYERS_NODE_PATH).unwrap();
        fill_node(node, &api, LAYERS_NODE_PATH, 1, now).unwrap();
        hierarchy.invalidate_layers();
        let node = hierarchy.find_node_mut(LAYERS_NODE_PATH).unwrap();
        fill_node(node, &api, LAYERS_NODE_PATH, 1, now).unwrap();
        assert_eq!(api.calls(), 2);
    }

    #[test]
    fn test_add_map_in_path() {
        let mut hierarchy = Hierarchy::new();
        let obj = json!({"id": "BASIC.A", "name": "A", "children": [{"name": "R1"}]});
        hierarchy
            .add_map_in_path(obj.as_object().cloned().unwrap(), "/Physical/BASIC/A")
            .unwrap();
        assert!(hierarchy.find_node("/Physical/BASIC/A/R1").is_some());
    }
}
