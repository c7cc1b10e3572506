//! Scalar models and their wire conversions

use crate::errors::{ComhonError, Result};
use crate::interfacer::Scalar;
use crate::restriction::IntervalDomain;
use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Built-in scalar model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleKind {
    String,
    Integer,
    Index,
    Float,
    Percentage,
    Boolean,
    DateTime,
}

impl SimpleKind {
    pub const ALL: [SimpleKind; 7] = [
        SimpleKind::String,
        SimpleKind::Integer,
        SimpleKind::Index,
        SimpleKind::Float,
        SimpleKind::Percentage,
        SimpleKind::Boolean,
        SimpleKind::DateTime,
    ];

    /// Model name as written in manifests
    pub fn name(&self) -> &'static str {
        match self {
            SimpleKind::String => "string",
            SimpleKind::Integer => "integer",
            SimpleKind::Index => "index",
            SimpleKind::Float => "float",
            SimpleKind::Percentage => "percentage",
            SimpleKind::Boolean => "boolean",
            SimpleKind::DateTime => "dateTime",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn interval_domain(&self) -> Option<IntervalDomain> {
        match self {
            SimpleKind::Integer | SimpleKind::Index => Some(IntervalDomain::Integer),
            SimpleKind::Float | SimpleKind::Percentage => Some(IntervalDomain::Float),
            SimpleKind::DateTime => Some(IntervalDomain::DateTime),
            SimpleKind::String | SimpleKind::Boolean => None,
        }
    }

    /// Whether `value` is a value of this model. Null is accepted.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (SimpleKind::String, Value::String(_))
                | (SimpleKind::Integer, Value::Integer(_))
                | (SimpleKind::Index, Value::Index(_))
                | (SimpleKind::Float, Value::Float(_))
                | (SimpleKind::Percentage, Value::Percentage(_))
                | (SimpleKind::Boolean, Value::Boolean(_))
                | (SimpleKind::DateTime, Value::DateTime(_))
        )
    }

    fn mismatch(&self, actual: impl Into<String>) -> ComhonError {
        ComhonError::TypeMismatch {
            expected: self.name().to_string(),
            actual: actual.into(),
        }
    }

    /// Parse a textual representation (XML attributes, defaults, ids)
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the text is not a valid literal.
    pub fn parse_text(&self, text: &str, date_format: &str) -> Result<Value> {
        let invalid = || self.mismatch(format!("'{}'", text));
        match self {
            SimpleKind::String => Ok(Value::String(text.to_string())),
            SimpleKind::Integer => text.trim().parse().map(Value::Integer).map_err(|_| invalid()),
            SimpleKind::Index => text.trim().parse().map(Value::Index).map_err(|_| invalid()),
            SimpleKind::Float => text.trim().parse().map(Value::Float).map_err(|_| invalid()),
            SimpleKind::Percentage => text
                .trim()
                .parse()
                .map(Value::Percentage)
                .map_err(|_| invalid()),
            SimpleKind::Boolean => match text.trim() {
                "true" | "1" => Ok(Value::Boolean(true)),
                "false" | "0" => Ok(Value::Boolean(false)),
                _ => Err(invalid()),
            },
            SimpleKind::DateTime => parse_date_time(text.trim(), date_format)
                .map(Value::DateTime)
                .ok_or_else(invalid),
        }
    }

    /// Convert a wire scalar into a value of this model
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the scalar cannot represent a value of
    /// this model.
    pub fn import_scalar(&self, scalar: &Scalar, date_format: &str) -> Result<Value> {
        match (self, scalar) {
            (_, Scalar::String(s)) => self.parse_text(s, date_format),
            (SimpleKind::Integer, Scalar::Int(i)) => Ok(Value::Integer(*i)),
            (SimpleKind::Index, Scalar::Int(i)) => u64::try_from(*i)
                .map(Value::Index)
                .map_err(|_| self.mismatch(i.to_string())),
            (SimpleKind::Float, Scalar::Int(i)) => Ok(Value::Float(*i as f64)),
            (SimpleKind::Float, Scalar::Float(f)) => Ok(Value::Float(*f)),
            (SimpleKind::Percentage, Scalar::Int(i)) => Ok(Value::Percentage(*i as f64)),
            (SimpleKind::Percentage, Scalar::Float(f)) => Ok(Value::Percentage(*f)),
            (SimpleKind::Boolean, Scalar::Bool(b)) => Ok(Value::Boolean(*b)),
            (_, other) => Err(self.mismatch(other.type_name())),
        }
    }

    /// Convert a value of this model into a wire scalar
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if the value does not belong to this model.
    pub fn export_value(&self, value: &Value, date_format: &str) -> Result<Scalar> {
        match (self, value) {
            (SimpleKind::String, Value::String(s)) => Ok(Scalar::String(s.clone())),
            (SimpleKind::Integer, Value::Integer(i)) => Ok(Scalar::Int(*i)),
            (SimpleKind::Index, Value::Index(i)) => i64::try_from(*i)
                .map(Scalar::Int)
                .map_err(|_| ComhonError::Serialization {
                    message: format!("index {} exceeds the integer range", i),
                }),
            (SimpleKind::Float, Value::Float(f)) | (SimpleKind::Percentage, Value::Percentage(f)) => {
                Ok(Scalar::Float(*f))
            }
            (SimpleKind::Boolean, Value::Boolean(b)) => Ok(Scalar::Bool(*b)),
            (SimpleKind::DateTime, Value::DateTime(d)) => {
                Ok(Scalar::String(d.format(date_format).to_string()))
            }
            (_, other) => Err(self.mismatch(other.type_name())),
        }
    }

    /// Convert a JSON literal (manifest defaults and enumerations)
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` for non scalar or incompatible literals.
    pub fn import_json(&self, json: &serde_json::Value, date_format: &str) -> Result<Value> {
        let scalar = Scalar::from_json(json).ok_or_else(|| self.mismatch(json.to_string()))?;
        self.import_scalar(&scalar, date_format)
    }
}

/// Parse RFC 3339 first, then `format`. Naive date times are read as UTC.
pub(crate) fn parse_date_time(text: &str, format: &str) -> Option<DateTime<FixedOffset>> {
    if text == "now" {
        return Some(Utc::now().fixed_offset());
    }
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, format))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, format)
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMAT: &str = crate::interfacer::DEFAULT_DATE_TIME_FORMAT;

    #[test]
    fn test_names_round_trip() {
        for kind in SimpleKind::ALL {
            assert_eq!(SimpleKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(SimpleKind::from_name("object"), None);
    }

    #[test]
    fn test_import_from_strings() {
        assert_eq!(
            SimpleKind::Integer.import_scalar(&Scalar::String("12".into()), FORMAT).unwrap(),
            Value::Integer(12)
        );
        assert_eq!(
            SimpleKind::Boolean.import_scalar(&Scalar::String("1".into()), FORMAT).unwrap(),
            Value::Boolean(true)
        );
        assert!(SimpleKind::Index
            .import_scalar(&Scalar::Int(-1), FORMAT)
            .is_err());
    }

    #[test]
    fn test_string_rejects_numbers() {
        let err = SimpleKind::String.import_scalar(&Scalar::Int(3), FORMAT).unwrap_err();
        assert!(matches!(err, ComhonError::TypeMismatch { .. }));
    }

    #[test]
    fn test_date_time_export_uses_format() {
        let value = SimpleKind::DateTime
            .parse_text("2020-05-01T10:00:00+02:00", FORMAT)
            .unwrap();
        let scalar = SimpleKind::DateTime.export_value(&value, FORMAT).unwrap();
        assert_eq!(scalar, Scalar::String("2020-05-01T10:00:00+02:00".into()));
        let scalar = SimpleKind::DateTime.export_value(&value, "%Y-%m-%d").unwrap();
        assert_eq!(scalar, Scalar::String("2020-05-01".into()));
    }

    #[test]
    fn test_export_rejects_foreign_kind() {
        assert!(SimpleKind::Float
            .export_value(&Value::Integer(1), FORMAT)
            .is_err());
    }
}
