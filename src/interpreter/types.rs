//! Interpreter Types
//!
//! Runtime values, their coercions and the process-wide shell state.

use indexmap::IndexMap;

pub use crate::ast::types::Value;
use crate::ast::types::Node;
use crate::hierarchy::Hierarchy;

use super::errors::OcliError;

/// Verbosity of user-facing diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DebugLevel {
    None = 0,
    #[default]
    Error = 1,
    Warning = 2,
    Info = 3,
    Debug = 4,
}

impl DebugLevel {
    pub fn from_int(level: i64) -> Option<Self> {
        match level {
            0 => Some(Self::None),
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Info),
            4 => Some(Self::Debug),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

pub const DEFAULT_DRAW_THRESHOLD: usize = 50;

/// State shared by every command of a session
#[derive(Debug)]
pub struct ShellState {
    pub curr_path: String,
    pub prev_path: String,
    /// Selected objects, set by `=`
    pub clipboard: Vec<String>,
    pub variables: IndexMap<String, Value>,
    pub functions: IndexMap<String, Node>,
    pub dry_run: bool,
    /// Errors collected while loading a file in dry-run mode
    pub dry_run_errors: Vec<OcliError>,
    pub debug_level: DebugLevel,
    pub customer: String,
    pub hierarchy: Hierarchy,
    /// Echo script lines before running them
    pub print_commands: bool,
    /// Objects `draw` accepts without `-f`
    pub draw_threshold: usize,
    /// Set by `exit`, stops the running script
    pub exit_requested: bool,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            curr_path: "/".to_string(),
            prev_path: "/".to_string(),
            clipboard: Vec::new(),
            variables: IndexMap::new(),
            functions: IndexMap::new(),
            dry_run: false,
            dry_run_errors: Vec::new(),
            debug_level: DebugLevel::default(),
            customer: String::new(),
            hierarchy: Hierarchy::new(),
            print_commands: true,
            draw_threshold: DEFAULT_DRAW_THRESHOLD,
            exit_requested: false,
        }
    }
}

impl ShellState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Coercions
// ============================================================================

fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok()
}

fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Number, strings being parsed.
pub fn to_float(value: &Value, name: &str) -> Result<f64, OcliError> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::String(s) => {
            parse_float(s).ok_or_else(|| OcliError::type_coercion(format!("{} should be a number", name)))
        }
        _ => Err(OcliError::type_coercion(format!("{} should be a number", name))),
    }
}

/// Int or float, strings being parsed as an int first.
pub fn to_num(value: &Value, name: &str) -> Result<Value, OcliError> {
    match value {
        Value::Int(_) | Value::Float(_) => Ok(value.clone()),
        Value::String(s) => parse_int(s)
            .map(Value::Int)
            .or_else(|| parse_float(s).map(Value::Float))
            .ok_or_else(|| OcliError::type_coercion(format!("{} should be a number", name))),
        _ => Err(OcliError::type_coercion(format!("{} should be a number", name))),
    }
}

pub fn to_int(value: &Value, name: &str) -> Result<i64, OcliError> {
    let err = || OcliError::type_coercion(format!("{} should be an integer", name));
    match value {
        Value::Int(i) => Ok(*i),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
        Value::String(s) => parse_int(s).ok_or_else(err),
        _ => Err(err()),
    }
}

pub fn to_bool(value: &Value, name: &str) -> Result<bool, OcliError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(OcliError::type_coercion(format!("{} should be a boolean", name))),
    }
}

pub fn to_string(value: &Value, name: &str) -> Result<String, OcliError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Int(i) => Ok(i.to_string()),
        _ => Err(OcliError::type_coercion(format!("{} should be a string", name))),
    }
}

/// Float vector of `size` elements, any size when `None`.
pub fn to_vec(value: &Value, size: Option<usize>, name: &str) -> Result<Vec<f64>, OcliError> {
    let err = || {
        let suffix = size.map(|s| s.to_string()).unwrap_or_default();
        OcliError::type_coercion(format!("{} should be a vector{}", name, suffix))
    };
    match value {
        Value::FloatVector(v) if size.map_or(true, |s| v.len() == s) => Ok(v.clone()),
        _ => Err(err()),
    }
}

/// Rotation vector, or one of the orientation keywords.
pub fn to_rotation(value: &Value) -> Result<Vec<f64>, OcliError> {
    match value {
        Value::FloatVector(v) => Ok(v.clone()),
        Value::String(s) => match s.as_str() {
            "front" => Ok(vec![0.0, 0.0, 180.0]),
            "rear" => Ok(vec![0.0, 0.0, 0.0]),
            "left" => Ok(vec![0.0, 90.0, 0.0]),
            "right" => Ok(vec![0.0, -90.0, 0.0]),
            "top" => Ok(vec![90.0, 0.0, 0.0]),
            "bottom" => Ok(vec![-90.0, 0.0, 0.0]),
            _ => Err(rotation_error()),
        },
        _ => Err(rotation_error()),
    }
}

fn rotation_error() -> OcliError {
    OcliError::type_coercion(
        "rotation should be a vector3, or one of the following keywords :\n\t\tfront, rear, left, right, top, bottom",
    )
}

/// Six hex digit color.
pub fn to_color(value: &Value) -> Result<String, OcliError> {
    let candidate = match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) if f.fract() == 0.0 => Some((*f as i64).to_string()),
        _ => None,
    };
    candidate
        .filter(|c| c.len() == 6 && c.chars().all(|ch| ch.is_ascii_hexdigit()))
        .ok_or_else(|| OcliError::type_coercion("Please provide a valid 6 digit Hex value for the color"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_float() {
        assert_eq!(to_float(&Value::Int(5), "number").unwrap(), 5.0);
        assert_eq!(to_float(&Value::from("5.5"), "string number").unwrap(), 5.5);
        assert_eq!(
            to_float(&Value::from("fifty"), "string value").unwrap_err().to_string(),
            "string value should be a number"
        );
        assert_eq!(
            to_float(&Value::FloatVector(vec![5.0]), "list").unwrap_err().to_string(),
            "list should be a number"
        );
    }

    #[test]
    fn test_to_num_keeps_int() {
        assert_eq!(to_num(&Value::from("5"), "n").unwrap(), Value::Int(5));
        assert_eq!(to_num(&Value::from("5.5"), "n").unwrap(), Value::Float(5.5));
        assert!(to_num(&Value::Bool(true), "n").is_err());
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(&Value::from("5"), "string int").unwrap(), 5);
        assert_eq!(
            to_int(&Value::from("5.5"), "string float").unwrap_err().to_string(),
            "string float should be an integer"
        );
        assert_eq!(to_int(&Value::Float(3.0), "f").unwrap(), 3);
    }

    #[test]
    fn test_to_bool() {
        assert!(to_bool(&Value::from("true"), "b").unwrap());
        assert!(!to_bool(&Value::Bool(false), "b").unwrap());
        assert_eq!(
            to_bool(&Value::Int(1), "int").unwrap_err().to_string(),
            "int should be a boolean"
        );
    }

    #[test]
    fn test_to_string() {
        assert_eq!(to_string(&Value::Int(5), "int").unwrap(), "5");
        assert_eq!(
            to_string(&Value::Float(5.5), "float").unwrap_err().to_string(),
            "float should be a string"
        );
    }

    #[test]
    fn test_to_vec() {
        let v = Value::FloatVector(vec![0.0, 1.0, 2.0]);
        assert_eq!(to_vec(&v, Some(3), "size").unwrap(), vec![0.0, 1.0, 2.0]);
        assert_eq!(
            to_vec(&v, Some(2), "float vector").unwrap_err().to_string(),
            "float vector should be a vector2"
        );
        assert!(to_vec(&v, None, "position").is_ok());
    }

    #[test]
    fn test_to_rotation_keywords() {
        assert_eq!(to_rotation(&Value::from("front")).unwrap(), vec![0.0, 0.0, 180.0]);
        assert!(to_rotation(&Value::Bool(false)).is_err());
    }

    #[test]
    fn test_to_color() {
        assert_eq!(to_color(&Value::from("abcaca")).unwrap(), "abcaca");
        assert_eq!(to_color(&Value::Int(255255)).unwrap(), "255255");
        assert!(to_color(&Value::from("zabaca")).is_err());
        assert!(to_color(&Value::Int(255)).is_err());
    }

    #[test]
    fn test_debug_level_order() {
        assert!(DebugLevel::Debug > DebugLevel::None);
        assert_eq!(DebugLevel::from_int(3), Some(DebugLevel::Info));
        assert_eq!(DebugLevel::default(), DebugLevel::Error);
    }
}
