//! Cached hierarchy nodes and the kinds of children they hold

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value as JsonValue};

use crate::layers::{Layer, UserDefinedLayer};
use crate::paths::name_or_slug;

/// Time during which a cached node is not fetched again
pub const UPDATED_THRESHOLD_SECS: i64 = 600;

/// How the children of a node are loaded
#[derive(Debug, Clone, PartialEq)]
pub enum FillStrategy {
    /// Fill every static child one level deeper
    SyntheticGrouping,
    /// List the objects returned by `url`
    StaticListing {
        url: &'static str,
        /// Listed objects are loaded with their children
        follow: bool,
        /// Children are named by their full id instead of their name
        full_id: bool,
        /// Static child kept across refills
        keep: Option<&'static str>,
        /// Listed objects are user-defined layers
        layers: bool,
    },
    /// Fetch the object of the node's path with its children
    RecursiveObjectFetch,
}

/// What a node stands for
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeObject {
    #[default]
    None,
    Map(Map<String, JsonValue>),
    /// Automatic layer child of an object
    Layer(Layer),
    /// Entry of `/Logical/Layers`
    UserLayer(UserDefinedLayer),
}

/// One segment of the shell namespace
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub name: String,
    pub children: BTreeMap<String, HierarchyNode>,
    pub fill: Option<FillStrategy>,
    pub obj: NodeObject,
    /// The node is a layer, `obj` holds it
    pub is_layer: bool,
    /// Children are not fetched again within the freshness window
    pub is_cached: bool,
    pub last_fill: Option<DateTime<Utc>>,
}

impl HierarchyNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: BTreeMap::new(),
            fill: None,
            obj: NodeObject::None,
            is_layer: false,
            is_cached: false,
            last_fill: None,
        }
    }

    pub fn with_fill(name: impl Into<String>, fill: FillStrategy) -> Self {
        let mut node = Self::new(name);
        node.fill = Some(fill);
        node
    }

    pub fn cached(name: impl Into<String>, fill: FillStrategy) -> Self {
        let mut node = Self::with_fill(name, fill);
        node.is_cached = true;
        node
    }

    pub fn layer(layer: Layer) -> Self {
        let mut node = Self::new(layer.name());
        node.obj = NodeObject::Layer(layer);
        node.is_layer = true;
        node
    }

    /// Node of an API object, its `children` becoming child nodes.
    pub fn from_map(name: impl Into<String>, obj: Map<String, JsonValue>) -> Result<Self, String> {
        let mut node = Self::new(name);
        node.fill_with_map(obj)?;
        Ok(node)
    }

    pub fn can_be_filled(&self) -> bool {
        self.fill.is_some()
    }

    pub fn add_child(&mut self, child: HierarchyNode) {
        self.children.insert(child.name.clone(), child);
    }

    /// Object stored in the node, if it is an API object.
    pub fn object(&self) -> Option<&Map<String, JsonValue>> {
        match &self.obj {
            NodeObject::Map(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_updated(&self, now: DateTime<Utc>) -> bool {
        match self.last_fill {
            Some(last) => self.is_cached && now - last < Duration::seconds(UPDATED_THRESHOLD_SECS),
            None => false,
        }
    }

    /// Replace object and children with those of an API object.
    pub fn fill_with_map(&mut self, mut obj: Map<String, JsonValue>) -> Result<(), String> {
        self.children.clear();
        if let Some(children) = obj.remove("children") {
            let JsonValue::Array(children) = children else {
                return Err("invalid child format".to_string());
            };
            for child in children {
                let JsonValue::Object(child) = child else {
                    return Err("invalid child format".to_string());
                };
                let name = name_or_slug(&child);
                self.add_child(HierarchyNode::from_map(name, child)?);
            }
        }
        self.obj = NodeObject::Map(obj);
        Ok(())
    }

    fn find_aux(&self, segments: &[&str]) -> (&HierarchyNode, usize) {
        match segments.split_first() {
            Some((first, rest)) => match self.children.get(*first) {
                Some(child) => child.find_aux(rest),
                None => (self, segments.len()),
            },
            None => (self, 0),
        }
    }

    pub fn find_node(&self, path: &str) -> Option<&HierarchyNode> {
        let segments = split_segments(path);
        match self.find_aux(&segments) {
            (node, 0) => Some(node),
            _ => None,
        }
    }

    pub fn find_node_mut(&mut self, path: &str) -> Option<&mut HierarchyNode> {
        let mut node = self;
        for segment in split_segments(path) {
            node = node.children.get_mut(segment)?;
        }
        Some(node)
    }

    /// Insert `child` at `path`, creating the missing intermediate nodes.
    /// An existing node takes the children and object of `child`.
    pub fn add_child_in_path(&mut self, child: HierarchyNode, path: &str) {
        let segments = split_segments(path);
        let Some((_, parents)) = segments.split_last() else {
            self.children = child.children;
            self.obj = child.obj;
            return;
        };
        let mut node = self;
        for segment in parents {
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| HierarchyNode::new(*segment));
        }
        match node.children.get_mut(&child.name) {
            Some(existing) => {
                existing.children = child.children;
                existing.obj = child.obj;
            }
            None => node.add_child(child),
        }
    }

    /// Render children as a tree, layers hidden.
    pub fn render(&self, depth: usize) -> String {
        let mut out = String::new();
        self.render_aux("", &mut out, depth);
        out.trim_end_matches('\n').to_string()
    }

    fn render_aux(&self, prefix: &str, out: &mut String, depth: usize) {
        if depth == 0 {
            return;
        }
        let children: Vec<&HierarchyNode> =
            self.children.values().filter(|c| !c.is_layer).collect();
        for (i, child) in children.iter().enumerate() {
            let last = i == children.len() - 1;
            let (branch, indent) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
            out.push_str(prefix);
            out.push_str(branch);
            out.push_str(&child.name);
            out.push('\n');
            child.render_aux(&format!("{}{}", prefix, indent), out, depth - 1);
        }
    }
}

/// Non-empty segments of an absolute path
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
