//! Abstract Syntax Tree (AST) Types for OCLI
//!
//! Every command line parses into a single closed `Node` tree. Nodes are
//! evaluated by the interpreter, which yields a `Value` per node.

use std::fmt;

use serde_json::{Map, Value as JsonValue};

// =============================================================================
// VALUES
// =============================================================================

/// A dynamically typed runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    FloatVector(Vec<f64>),
    /// Object returned by the API
    Mapping(Map<String, JsonValue>),
    /// Result of commands run for their effect
    Unit,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::FloatVector(_) => "vector",
            Self::Mapping(_) => "mapping",
            Self::Unit => "nil",
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// JSON form used when a value is sent to the API.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::Float(f) => JsonValue::from(*f),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::FloatVector(v) => JsonValue::from(v.clone()),
            Self::Mapping(m) => JsonValue::Object(m.clone()),
            Self::Unit => JsonValue::Null,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e21 {
        write!(f, "{}", x as i64)
    } else {
        write!(f, "{}", x)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write_float(f, *x),
            Self::String(s) => write!(f, "{}", s),
            Self::FloatVector(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write_float(f, *x)?;
                }
                write!(f, "]")
            }
            Self::Mapping(m) => write!(f, "{}", JsonValue::Object(m.clone())),
            Self::Unit => Ok(()),
        }
    }
}

// =============================================================================
// OPERATORS
// =============================================================================

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
}

impl ArithOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::IntDiv => "\\",
            Self::Mod => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    Or,
    And,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityOp {
    Eq,
    Neq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lss,
    Leq,
    Gtr,
    Geq,
}

// =============================================================================
// PATHS & FILTERS
// =============================================================================

/// A path argument, translated against the current path when evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct PathNode {
    /// String-valued node giving the raw path
    pub path: Box<Node>,
    /// `_` and `selection` resolve to the current selection
    pub accept_selection: bool,
}

impl PathNode {
    pub fn new(path: Node) -> Self {
        Self {
            path: Box::new(path),
            accept_selection: false,
        }
    }

    pub fn with_selection(path: Node) -> Self {
        Self {
            path: Box::new(path),
            accept_selection: true,
        }
    }
}

/// Ordered filter map; the complex filter expression uses the key `filter`
pub type Filters = indexmap::IndexMap<String, Node>;

/// Key under which a complex filter expression is stored
pub const COMPLEX_FILTER_KEY: &str = "filter";

/// Recursive search options shared by `ls` and `get`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecursiveArgs {
    pub is_recursive: bool,
    /// Raw `-m` argument
    pub min_depth: Option<String>,
    /// Raw `-M` argument
    pub max_depth: Option<String>,
}

// =============================================================================
// COMMAND PAYLOADS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LsNode {
    pub path: PathNode,
    pub filters: Filters,
    pub sort_attr: Option<String>,
    pub attributes: Vec<String>,
    pub recursive: RecursiveArgs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetNode {
    pub path: PathNode,
    pub filters: Filters,
    /// Attributes requested after `:`, all when empty
    pub attributes: Vec<String>,
    pub recursive: RecursiveArgs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateNode {
    pub path: PathNode,
    pub attribute: String,
    pub values: Vec<Node>,
    /// `#` after `=` targets a layer-relative value
    pub sharpe: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkNode {
    pub source: PathNode,
    pub destination: PathNode,
    pub attributes: Vec<String>,
    pub values: Vec<Node>,
    pub slots: Option<Vec<Node>>,
}

/// Object creation, one variant per object kind
#[derive(Debug, Clone, PartialEq)]
pub enum CreateNode {
    Domain {
        path: PathNode,
        color: Box<Node>,
    },
    Site {
        path: PathNode,
    },
    Building {
        path: PathNode,
        pos_xy: Box<Node>,
        rotation: Box<Node>,
        size_or_template: Box<Node>,
    },
    /// Without an axis orientation the last field is a template name
    Room {
        path: PathNode,
        pos_xy: Box<Node>,
        rotation: Box<Node>,
        size_or_template: Box<Node>,
        axis_orientation: Option<Box<Node>>,
        floor_unit: Option<Box<Node>>,
    },
    Rack {
        path: PathNode,
        pos: Box<Node>,
        unit: Box<Node>,
        rotation: Box<Node>,
        size_or_template: Box<Node>,
    },
    Generic {
        path: PathNode,
        pos: Box<Node>,
        unit: Box<Node>,
        rotation: Box<Node>,
        size_or_template: Box<Node>,
        shape: Option<Box<Node>>,
        generic_type: Option<Box<Node>>,
    },
    Device {
        path: PathNode,
        pos_u_or_slot: Vec<Node>,
        size_u_or_template: Box<Node>,
        invert_offset: bool,
        side: Option<Box<Node>>,
    },
    Corridor {
        path: PathNode,
        pos: Box<Node>,
        unit: Box<Node>,
        rotation: Box<Node>,
        size: Box<Node>,
        temperature: Box<Node>,
    },
    Group {
        path: PathNode,
        children: Vec<PathNode>,
    },
    Tag {
        slug: Box<Node>,
        color: Box<Node>,
    },
    Layer {
        slug: Box<Node>,
        applicability: PathNode,
        filter: Box<Node>,
    },
    Virtual {
        path: PathNode,
        vtype: Box<Node>,
        vlinks: Option<Vec<Node>>,
        role: Option<Box<Node>>,
    },
    Orphan {
        path: PathNode,
        template: Box<Node>,
    },
}

// =============================================================================
// NODE
// =============================================================================

/// A parsed command or expression
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // --- expressions ---
    Value(Value),
    SymbolReference(String),
    ArrayReference {
        variable: String,
        index: Box<Node>,
    },
    Array(Vec<Node>),
    Arith {
        op: ArithOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Equality {
        op: EqualityOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Comparator {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Negate(Box<Node>),
    NegateBool(Box<Node>),
    FormatString {
        format: Box<Node>,
        args: Vec<Node>,
    },
    Path(PathNode),

    // --- control flow ---
    Sequence(Vec<Node>),
    Assign {
        variable: String,
        value: Box<Node>,
    },
    If {
        condition: Box<Node>,
        body: Box<Node>,
        else_body: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    ForRange {
        variable: String,
        start: Box<Node>,
        end: Box<Node>,
        body: Box<Node>,
    },
    ForArray {
        variable: String,
        array: Box<Node>,
        body: Box<Node>,
    },
    FuncDef {
        name: String,
        body: Box<Node>,
    },
    FuncCall(String),

    // --- shell state ---
    Len(String),
    Print(Box<Node>),
    Pwd,
    Exit,
    Env,
    SetEnv {
        name: String,
        value: Box<Node>,
    },
    UnsetFunc(String),
    UnsetVar(String),
    ShowSelection,
    Load(Box<Node>),
    DryLoad(Box<Node>),

    // --- hierarchy commands ---
    Cd(PathNode),
    Tree {
        path: PathNode,
        depth: i64,
    },
    Ls(Box<LsNode>),
    Get(Box<GetNode>),
    GetU {
        path: PathNode,
        u: Box<Node>,
    },
    GetSlot {
        path: PathNode,
        slot: Box<Node>,
    },
    /// Selects one path; an empty string clears the selection
    SelectObject(Box<Node>),
    SelectChildren(Vec<PathNode>),
    Draw {
        path: PathNode,
        depth: i64,
        force: bool,
    },
    Undraw(Option<PathNode>),
    DeleteObj(PathNode),
    DeleteAttr {
        path: PathNode,
        attribute: String,
    },
    DeleteSelection,
    Update(Box<UpdateNode>),
    Link(Box<LinkNode>),
    Unlink(PathNode),
    Create(Box<CreateNode>),
}

impl Node {
    /// String literal node.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Value(Value::String(s.into()))
    }

    /// Empty command.
    pub fn empty() -> Self {
        Self::Sequence(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::FloatVector(vec![1.0, 2.5]).to_string(), "[1 2.5]");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Unit.to_string(), "");
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(Value::FloatVector(vec![1.0]).to_json(), serde_json::json!([1.0]));
        assert_eq!(Value::from("x").to_json(), serde_json::json!("x"));
    }
}
