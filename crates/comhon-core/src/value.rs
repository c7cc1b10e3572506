//! Runtime values held by object and array instances

use chrono::{DateTime, FixedOffset};
use std::fmt;

/// Handle of an object or array instance stored in an [`InstanceArena`]
///
/// [`InstanceArena`]: crate::object::InstanceArena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceRef(pub(crate) u32);

impl InstanceRef {
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Value stored under a property name or an array slot
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    Index(u64),
    Float(f64),
    Percentage(f64),
    Boolean(bool),
    DateTime(DateTime<FixedOffset>),
    Object(InstanceRef),
    Array(InstanceRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type label used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Index(_) => "index",
            Value::Float(_) => "float",
            Value::Percentage(_) => "percentage",
            Value::Boolean(_) => "boolean",
            Value::DateTime(_) => "dateTime",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Index(i) => i64::try_from(*i).ok(),
            _ => None,
        }
    }

    /// Numeric view shared by integer, index, float and percentage values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Index(i) => Some(*i as f64),
            Value::Float(f) | Value::Percentage(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::DateTime(d) => Some(d),
            _ => None,
        }
    }

    /// Handle of the object or array instance, if the value is one
    pub fn as_instance(&self) -> Option<InstanceRef> {
        match self {
            Value::Object(r) | Value::Array(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<InstanceRef> {
        match self {
            Value::Object(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<InstanceRef> {
        match self {
            Value::Array(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Null | Value::Object(_) | Value::Array(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Index(i) => write!(f, "{}", i),
            Value::Float(v) | Value::Percentage(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::DateTime(d) => write!(f, "{}", d.to_rfc3339()),
            Value::Object(r) => write!(f, "object {}", r),
            Value::Array(r) => write!(f, "array {}", r),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(d: DateTime<FixedOffset>) -> Self {
        Value::DateTime(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Index(7).as_f64(), Some(7.0));
        assert_eq!(Value::Index(u64::MAX).as_i64(), None);
        assert_eq!(Value::Percentage(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::String("1".into()).as_f64(), None);
    }

    #[test]
    fn test_instance_values_are_not_scalar() {
        let r = InstanceRef(3);
        assert!(!Value::Object(r).is_scalar());
        assert_eq!(Value::Array(r).as_instance(), Some(r));
        assert_eq!(Value::Object(r).as_array(), None);
        assert!(Value::from("a").is_scalar());
    }
}
