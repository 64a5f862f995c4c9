//! Namespaces of the shell tree and their mapping to API resources

use std::fmt;

use crate::layers::Layer;

pub const PHYSICAL_PATH: &str = "/Physical/";
pub const STRAY_PATH: &str = "/Physical/Stray/";
pub const LOGICAL_PATH: &str = "/Logical/";
pub const OBJECT_TEMPLATES_PATH: &str = "/Logical/ObjectTemplates/";
pub const ROOM_TEMPLATES_PATH: &str = "/Logical/RoomTemplates/";
pub const BLDG_TEMPLATES_PATH: &str = "/Logical/BldgTemplates/";
pub const GROUPS_PATH: &str = "/Logical/Groups/";
pub const TAGS_PATH: &str = "/Logical/Tags/";
pub const LAYERS_PATH: &str = "/Logical/Layers/";
pub const VIRTUAL_OBJS_PATH: &str = "/Logical/VirtualObjects/";
pub const ORGANISATION_PATH: &str = "/Organisation/";
pub const DOMAINS_PATH: &str = "/Organisation/Domain/";

/// Prefix of a shell path, checked in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Stray,
    Physical,
    ObjectTemplates,
    RoomTemplates,
    BldgTemplates,
    Groups,
    Tags,
    Layers,
    Domains,
    VirtualObjects,
}

impl Namespace {
    /// Stray comes before Physical since it is nested in it.
    pub const ALL: [Namespace; 10] = [
        Self::Stray,
        Self::Physical,
        Self::ObjectTemplates,
        Self::RoomTemplates,
        Self::BldgTemplates,
        Self::Groups,
        Self::Tags,
        Self::Layers,
        Self::Domains,
        Self::VirtualObjects,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Stray => STRAY_PATH,
            Self::Physical => PHYSICAL_PATH,
            Self::ObjectTemplates => OBJECT_TEMPLATES_PATH,
            Self::RoomTemplates => ROOM_TEMPLATES_PATH,
            Self::BldgTemplates => BLDG_TEMPLATES_PATH,
            Self::Groups => GROUPS_PATH,
            Self::Tags => TAGS_PATH,
            Self::Layers => LAYERS_PATH,
            Self::Domains => DOMAINS_PATH,
            Self::VirtualObjects => VIRTUAL_OBJS_PATH,
        }
    }

    /// Namespace whose prefix starts `path`, with the remainder.
    pub fn split(path: &str) -> Option<(Namespace, &str)> {
        Self::ALL
            .iter()
            .find_map(|ns| path.strip_prefix(ns.prefix()).map(|rest| (*ns, rest)))
    }

    /// Resource serving single objects of this namespace
    pub fn object_endpoint(&self) -> &'static str {
        match self {
            Self::Stray => "/api/stray_objects",
            Self::Physical => "/api/hierarchy_objects",
            Self::ObjectTemplates => "/api/obj_templates",
            Self::RoomTemplates => "/api/room_templates",
            Self::BldgTemplates => "/api/bldg_templates",
            Self::Groups => "/api/groups",
            Self::Tags => "/api/tags",
            Self::Layers => "/api/layers",
            Self::Domains => "/api/domains",
            Self::VirtualObjects => "/api/virtual_objs",
        }
    }

    /// Objects of these namespaces are addressed by slug instead of id
    pub fn uses_slug(&self) -> bool {
        matches!(
            self,
            Self::ObjectTemplates
                | Self::RoomTemplates
                | Self::BldgTemplates
                | Self::Tags
                | Self::Layers
        )
    }

    /// `namespace` query parameter of the generic objects endpoint
    pub fn api_namespace(&self) -> Option<&'static str> {
        match self {
            Self::Stray => Some("physical.stray"),
            Self::Physical => Some("physical.hierarchy"),
            Self::ObjectTemplates => Some("logical.objtemplate"),
            Self::RoomTemplates => Some("logical.roomtemplate"),
            Self::BldgTemplates => Some("logical.bldgtemplate"),
            Self::Tags => Some("logical.tag"),
            Self::Layers => Some("logical.layer"),
            Self::Groups => Some("logical"),
            Self::Domains => Some("organisational"),
            Self::VirtualObjects => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// A shell path resolved into API terms
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub prefix: Namespace,
    /// Flat dot-separated id, or slug
    pub object_id: String,
    /// Layer the path goes through, its filter applies to listings
    pub layer: Option<Layer>,
}

impl Path {
    pub fn new(prefix: Namespace, object_id: impl Into<String>) -> Self {
        Self {
            prefix,
            object_id: object_id.into(),
            layer: None,
        }
    }

    /// Turn the id into a recursive pattern, `X.*` becoming `X.**{min,max}.*`.
    pub fn make_recursive(&mut self, min_depth: usize, max_depth: Option<usize>) -> Result<(), String> {
        if let Some(max) = max_depth {
            if max < min_depth {
                return Err("max depth cannot be less than the min depth".to_string());
            }
        }
        let wildcard = match (min_depth, max_depth) {
            (0, None) => "**".to_string(),
            (min, None) => format!("**{{{},}}", min),
            (min, Some(max)) => format!("**{{{},{}}}", min, max),
        };
        self.object_id = match self.object_id.strip_suffix(".*") {
            Some(base) => format!("{}.{}.*", base, wildcard),
            None if self.object_id == "*" => format!("{}.*", wildcard),
            None => format!("{}.{}", wildcard, self.object_id),
        };
        Ok(())
    }
}

/// Whether a path or id segment names a layer
pub fn is_id_element_layer(element: &str) -> bool {
    element.starts_with('#')
}

/// `room1.#racks`
pub fn is_object_id_layer(id: &str) -> bool {
    id.rsplit('.').next().is_some_and(is_id_element_layer)
}

/// `.../room1/#racks`
pub fn path_is_layer(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(is_id_element_layer)
}

/// `.../room1/#racks/rack1`
pub fn path_has_layer(path: &str) -> bool {
    path.split('/').any(is_id_element_layer)
}

/// `.../room1/#racks/rack1` becomes `.../room1/rack1`
pub fn path_remove_layer(path: &str) -> String {
    path.split('/')
        .filter(|e| !is_id_element_layer(e))
        .collect::<Vec<_>>()
        .join("/")
}

/// Drop the last `amount` segments of a path.
pub fn path_remove_last(path: &str, amount: usize) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let keep = segments.len().saturating_sub(amount);
    segments[..keep].join("/")
}

pub fn physical_id_to_path(id: &str) -> String {
    format!("{}{}", PHYSICAL_PATH, id.replace('.', "/"))
}

pub fn physical_path_to_object_id(path: &str) -> String {
    path.strip_prefix(PHYSICAL_PATH)
        .unwrap_or_default()
        .trim_end_matches('/')
        .replace('/', ".")
}

/// Id shown relative to an ancestor path, `site1.bldg.room` from
/// `/Physical/site1` is `bldg/room`.
pub fn object_id_to_relative_path(id: &str, from_path: &str) -> String {
    let base = physical_path_to_object_id(from_path);
    let relative = if base.is_empty() {
        id
    } else {
        id.strip_prefix(&format!("{}.", base)).unwrap_or(id)
    };
    relative.replace('.', "/")
}
