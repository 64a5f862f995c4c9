//! Object Command Parsing
//!
//! Creation (`+kind:...`), attribute updates (`path:attr=value`) and
//! links (`link source@destination`).

use crate::ast::types::{CreateNode, LinkNode, Node, UpdateNode, COMPLEX_FILTER_KEY};
use crate::parser::parser::{ParseResult, Parser};

/// Object kinds accepted after `+`, with their short forms
const CREATE_KINDS: &[&str] = &[
    "domain", "do", "site", "si", "bldg", "building", "bd", "room", "ro", "rack", "rk",
    "device", "dv", "corridor", "co", "group", "gr", "tag", "layer", "orphan", "generic", "ge",
    "vobj",
];

/// Attributes assigned a list of strings
const STRING_LIST_ATTRIBUTES: &[&str] = &["slot", "content"];

/// Attributes holding a complex filter
const FILTER_ATTRIBUTES: &[&str] = &["filter", "filter+"];

impl Parser {
    fn take_complex_filter(&mut self) -> ParseResult<Node> {
        let mut filters = self.parse_complex_filters()?;
        Ok(filters
            .shift_remove(COMPLEX_FILTER_KEY)
            .unwrap_or_else(|| Node::string("")))
    }

    pub(crate) fn parse_create(&mut self) -> ParseResult<Node> {
        self.traced("create", |p| {
            let kind = p.traced("object type", |p| p.parse_keyword(CREATE_KINDS))?;
            if kind.is_empty() {
                return p.error("unknown object type");
            }
            p.skip_whitespaces();
            if kind == "orphan" {
                return p.parse_create_orphan().map(|c| Node::Create(Box::new(c)));
            }
            p.expect(":")?;
            p.skip_whitespaces();
            let create = match kind.as_str() {
                "domain" | "do" => p.parse_create_domain()?,
                "site" | "si" => p.traced("create site", |p| {
                    Ok(CreateNode::Site { path: p.parse_path("")? })
                })?,
                "bldg" | "building" | "bd" => p.parse_create_building()?,
                "room" | "ro" => p.parse_create_room()?,
                "rack" | "rk" => p.parse_create_rack()?,
                "device" | "dv" => p.parse_create_device()?,
                "corridor" | "co" => p.parse_create_corridor()?,
                "group" | "gr" => p.traced("create group", |p| {
                    let path = p.parse_path("")?;
                    p.expect("@")?;
                    let children = p.parse_path_group()?;
                    Ok(CreateNode::Group { path, children })
                })?,
                "tag" => p.traced("create tag", |p| {
                    let slug = p.parse_string("slug")?;
                    p.expect("@")?;
                    let color = p.parse_string("color")?;
                    Ok(CreateNode::Tag { slug: Box::new(slug), color: Box::new(color) })
                })?,
                "layer" => p.traced("create layer", |p| {
                    let slug = p.parse_string("slug")?;
                    p.expect("@")?;
                    let applicability = p.parse_path("applicability")?;
                    p.expect("@")?;
                    let filter = p.take_complex_filter()?;
                    Ok(CreateNode::Layer {
                        slug: Box::new(slug),
                        applicability,
                        filter: Box::new(filter),
                    })
                })?,
                "generic" | "ge" => p.parse_create_generic()?,
                _ => p.parse_create_virtual()?,
            };
            Ok(Node::Create(Box::new(create)))
        })
    }

    fn parse_create_domain(&mut self) -> ParseResult<CreateNode> {
        self.traced("create domain", |p| {
            let path = p.parse_path("")?;
            p.expect("@")?;
            let color = p.parse_string("color")?;
            Ok(CreateNode::Domain { path, color: Box::new(color) })
        })
    }

    fn parse_create_building(&mut self) -> ParseResult<CreateNode> {
        self.traced("create building", |p| {
            let path = p.parse_path("")?;
            p.expect("@")?;
            let pos_xy = p.parse_expr("posXY")?;
            p.expect("@")?;
            let rotation = p.parse_expr("rotation")?;
            p.expect("@")?;
            let size_or_template = p.parse_string_or_vec("sizeOrTemplate")?;
            Ok(CreateNode::Building {
                path,
                pos_xy: Box::new(pos_xy),
                rotation: Box::new(rotation),
                size_or_template: Box::new(size_or_template),
            })
        })
    }

    fn parse_create_room(&mut self) -> ParseResult<CreateNode> {
        self.traced("create room", |p| {
            let path = p.parse_path("")?;
            p.expect("@")?;
            let pos_xy = p.parse_expr("posXY")?;
            p.expect("@")?;
            let rotation = p.parse_expr("rotation")?;
            p.expect("@")?;
            let size_or_template = p.parse_string_or_vec("sizeOrTemplate")?;
            let mut axis_orientation = None;
            let mut floor_unit = None;
            if p.parse_exact("@") {
                axis_orientation = Some(Box::new(p.parse_string("axisOrientation")?));
                if p.parse_exact("@") {
                    floor_unit = Some(Box::new(p.parse_string("floorUnit")?));
                }
            }
            Ok(CreateNode::Room {
                path,
                pos_xy: Box::new(pos_xy),
                rotation: Box::new(rotation),
                size_or_template: Box::new(size_or_template),
                axis_orientation,
                floor_unit,
            })
        })
    }

    /// `path@pos@unit@rotation@sizeOrTemplate`, shared by racks and generics.
    fn parse_placed_object(&mut self) -> ParseResult<(crate::ast::types::PathNode, [Node; 4])> {
        let path = self.parse_path("")?;
        self.expect("@")?;
        let pos = self.parse_expr("position")?;
        self.expect("@")?;
        let unit = self.parse_string("unit")?;
        self.expect("@")?;
        let rotation = self.parse_string_or_vec("rotation")?;
        self.expect("@")?;
        let size_or_template = self.parse_string_or_vec("sizeOrTemplate")?;
        Ok((path, [pos, unit, rotation, size_or_template]))
    }

    fn parse_create_rack(&mut self) -> ParseResult<CreateNode> {
        self.traced("create rack", |p| {
            let (path, [pos, unit, rotation, size_or_template]) = p.parse_placed_object()?;
            Ok(CreateNode::Rack {
                path,
                pos: Box::new(pos),
                unit: Box::new(unit),
                rotation: Box::new(rotation),
                size_or_template: Box::new(size_or_template),
            })
        })
    }

    fn parse_create_generic(&mut self) -> ParseResult<CreateNode> {
        self.traced("create generic", |p| {
            let (path, [pos, unit, rotation, size_or_template]) = p.parse_placed_object()?;
            let mut shape = None;
            let mut generic_type = None;
            if p.parse_exact("@") {
                shape = Some(Box::new(p.parse_string("shape")?));
                p.expect("@")?;
                generic_type = Some(Box::new(p.parse_string("type")?));
            }
            Ok(CreateNode::Generic {
                path,
                pos: Box::new(pos),
                unit: Box::new(unit),
                rotation: Box::new(rotation),
                size_or_template: Box::new(size_or_template),
                shape,
                generic_type,
            })
        })
    }

    fn parse_create_device(&mut self) -> ParseResult<CreateNode> {
        self.traced("create device", |p| {
            let path = p.parse_path("")?;
            p.expect("@")?;
            let pos_u_or_slot = p.parse_string_or_vec_str("posUOrSlot")?;
            p.expect("@")?;
            let size_u_or_template = p.parse_string("sizeUOrTemplate")?;
            let mut invert_offset = false;
            let mut side = None;
            if p.parse_exact("@") {
                invert_offset = p.parse_bool()?;
                if p.parse_exact("@") {
                    side = Some(Box::new(p.parse_string("side")?));
                }
            }
            Ok(CreateNode::Device {
                path,
                pos_u_or_slot,
                size_u_or_template: Box::new(size_u_or_template),
                invert_offset,
                side,
            })
        })
    }

    fn parse_create_corridor(&mut self) -> ParseResult<CreateNode> {
        self.traced("create corridor", |p| {
            let path = p.parse_path("")?;
            p.expect("@")?;
            let pos = p.parse_expr("position")?;
            p.expect("@")?;
            let unit = p.parse_string("unit")?;
            p.expect("@")?;
            let rotation = p.parse_string_or_vec("rotation")?;
            p.expect("@")?;
            let size = p.parse_string_or_vec("size")?;
            p.expect("@")?;
            let temperature = p.parse_string("temperature")?;
            Ok(CreateNode::Corridor {
                path,
                pos: Box::new(pos),
                unit: Box::new(unit),
                rotation: Box::new(rotation),
                size: Box::new(size),
                temperature: Box::new(temperature),
            })
        })
    }

    fn parse_create_virtual(&mut self) -> ParseResult<CreateNode> {
        self.traced("create virtual", |p| {
            let path = p.parse_path("")?;
            p.expect("@")?;
            let vtype = p.parse_string("type")?;
            let mut vlinks = None;
            let mut role = None;
            if p.parse_exact("@") {
                vlinks = Some(p.parse_vec_str("vlinks")?);
                if p.parse_exact("@") {
                    role = Some(Box::new(p.parse_string("role")?));
                }
            }
            Ok(CreateNode::Virtual {
                path,
                vtype: Box::new(vtype),
                vlinks,
                role,
            })
        })
    }

    fn parse_create_orphan(&mut self) -> ParseResult<CreateNode> {
        self.traced("create orphan", |p| {
            if !p.parse_exact("device") && !p.parse_exact("dv") {
                return p.error("device or dv keyword expected");
            }
            p.skip_whitespaces();
            p.expect(":")?;
            p.skip_whitespaces();
            let path = p.parse_path("")?;
            p.expect("@")?;
            let template = p.parse_string("template")?;
            Ok(CreateNode::Orphan { path, template: Box::new(template) })
        })
    }

    /// `path:attribute=value[@value...]`
    pub(crate) fn parse_update(&mut self) -> ParseResult<Node> {
        self.traced("update", |p| {
            let path = p.parse_path_or_selection("")?;
            p.skip_whitespaces();
            p.expect(":")?;
            p.skip_whitespaces();
            let attribute = p.parse_attribute_name()?;
            p.skip_whitespaces();
            p.expect("=")?;
            p.skip_whitespaces();
            let sharpe = p.parse_exact("#");
            let mut values = Vec::new();
            loop {
                if STRING_LIST_ATTRIBUTES.contains(&attribute.as_str()) {
                    values = p.parse_string_or_vec_str("slot")?;
                } else if FILTER_ATTRIBUTES.contains(&attribute.as_str()) {
                    values.push(p.take_complex_filter()?);
                } else {
                    values.push(p.parse_value()?);
                }
                if !p.parse_exact("@") {
                    break;
                }
            }
            Ok(Node::Update(Box::new(UpdateNode {
                path,
                attribute,
                values,
                sharpe,
            })))
        })
    }

    pub(crate) fn parse_link(&mut self) -> ParseResult<Node> {
        self.traced("link", |p| {
            let source = p.parse_path("source path")?;
            p.expect("@")?;
            let destination = p.parse_path("destination path")?;
            let mut attributes = Vec::new();
            let mut values = Vec::new();
            let mut slots = None;
            while p.parse_exact("@") {
                p.skip_whitespaces();
                let attribute = p.parse_complex_word("attribute")?;
                p.skip_whitespaces();
                p.expect("=")?;
                p.skip_whitespaces();
                if attribute == "slot" {
                    slots = Some(p.parse_string_or_vec_str("slot")?);
                } else {
                    values.push(p.parse_value()?);
                    attributes.push(attribute);
                }
            }
            Ok(Node::Link(Box::new(LinkNode {
                source,
                destination,
                attributes,
                values,
                slots,
            })))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::types::*;
    use crate::parser::parse;

    fn create(input: &str) -> CreateNode {
        match parse(input).unwrap() {
            Node::Create(c) => *c,
            other => panic!("create expected, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_site() {
        assert_eq!(
            create("+site:BASIC"),
            CreateNode::Site { path: PathNode::new(Node::string("BASIC")) }
        );
        assert_eq!(
            create("+si:$name"),
            CreateNode::Site {
                path: PathNode::new(Node::FormatString {
                    format: Box::new(Node::string("%v")),
                    args: vec![Node::SymbolReference("name".to_string())],
                })
            }
        );
    }

    #[test]
    fn test_parse_create_building() {
        let CreateNode::Building { pos_xy, rotation, size_or_template, .. } =
            create("+bd:/Physical/BASIC/A@[5,5]@49.5@[300,300,5]")
        else {
            panic!("building expected")
        };
        assert!(matches!(*pos_xy, Node::Array(ref v) if v.len() == 2));
        assert_eq!(*rotation, Node::Value(Value::Float(49.5)));
        assert!(matches!(*size_or_template, Node::Array(ref v) if v.len() == 3));
    }

    #[test]
    fn test_parse_create_room_with_template() {
        let CreateNode::Room { size_or_template, axis_orientation, .. } =
            create("+ro:R1@[0,0]@0@my-template")
        else {
            panic!("room expected")
        };
        assert_eq!(*size_or_template, Node::string("my-template"));
        assert!(axis_orientation.is_none());
    }

    #[test]
    fn test_parse_create_room_with_size() {
        let CreateNode::Room { axis_orientation, floor_unit, .. } =
            create("+ro:R1@[0,0]@0@[10,10,3]@+x+y@t")
        else {
            panic!("room expected")
        };
        assert_eq!(axis_orientation.map(|n| *n), Some(Node::string("+x+y")));
        assert_eq!(floor_unit.map(|n| *n), Some(Node::string("t")));
    }

    #[test]
    fn test_parse_create_device() {
        let CreateNode::Device { pos_u_or_slot, invert_offset, side, .. } =
            create("+dv:R1/D1@[slot01, slot02]@chassis@true@front")
        else {
            panic!("device expected")
        };
        assert_eq!(pos_u_or_slot, vec![Node::string("slot01"), Node::string("slot02")]);
        assert!(invert_offset);
        assert_eq!(side.map(|n| *n), Some(Node::string("front")));
    }

    #[test]
    fn test_parse_create_group() {
        let CreateNode::Group { children, .. } = create("+gr:G1@{R1, R2}") else {
            panic!("group expected")
        };
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_parse_create_layer() {
        let CreateNode::Layer { slug, applicability, filter } =
            create("+layer:racks@/Physical/BASIC/A/R1@category=rack")
        else {
            panic!("layer expected")
        };
        assert_eq!(*slug, Node::string("racks"));
        assert_eq!(applicability, PathNode::new(Node::string("/Physical/BASIC/A/R1")));
        assert_eq!(*filter, Node::string("category=rack"));
    }

    #[test]
    fn test_parse_create_orphan() {
        let CreateNode::Orphan { template, .. } = create("+orphan dv:O1@tpl") else {
            panic!("orphan expected")
        };
        assert_eq!(*template, Node::string("tpl"));
        let err = parse("+orphan rk:O1@tpl").unwrap_err();
        assert_eq!(err.message, "device or dv keyword expected");
    }

    #[test]
    fn test_parse_create_unknown_kind() {
        let err = parse("+planet:earth").unwrap_err();
        assert_eq!(err.message, "unknown object type");
    }

    #[test]
    fn test_parse_update() {
        let Node::Update(update) = parse("R1:color=ffffff").unwrap() else {
            panic!("update expected")
        };
        assert!(update.path.accept_selection);
        assert_eq!(update.attribute, "color");
        assert_eq!(update.values, vec![Node::string("ffffff")]);
        assert!(!update.sharpe);
    }

    #[test]
    fn test_parse_update_multiple_values() {
        let Node::Update(update) = parse("_:domain=dom@recursive").unwrap() else {
            panic!("update expected")
        };
        assert_eq!(update.values, vec![Node::string("dom"), Node::string("recursive")]);
    }

    #[test]
    fn test_parse_update_content() {
        let Node::Update(update) = parse("G1:content=[R1,R2]").unwrap() else {
            panic!("update expected")
        };
        assert_eq!(update.values, vec![Node::string("R1"), Node::string("R2")]);
    }

    #[test]
    fn test_parse_update_virtual_config() {
        let Node::Update(update) = parse("V1:virtual_config.type=node").unwrap() else {
            panic!("update expected")
        };
        assert_eq!(update.attribute, "virtual_config.type");
    }

    #[test]
    fn test_parse_link() {
        let Node::Link(link) = parse("link /Physical/Stray/D1@/Physical/S/B/R/RK@slot=[s1,s2]@orientation=front")
            .unwrap()
        else {
            panic!("link expected")
        };
        assert_eq!(link.slots, Some(vec![Node::string("s1"), Node::string("s2")]));
        assert_eq!(link.attributes, vec!["orientation"]);
        assert_eq!(link.values, vec![Node::string("front")]);
    }
}
