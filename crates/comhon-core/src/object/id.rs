//! Identity keys
//!
//! A single id is keyed by its textual value. Composite ids are keyed by
//! the JSON array of their values in declaration order (`["a",1]`), which
//! is also their wire form.

use crate::errors::{ComhonError, Result};
use crate::interfacer::Scalar;
use crate::model::{ModelType, Property};
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::sync::Arc;

fn component(value: &Value) -> JsonValue {
    match value {
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Integer(i) => JsonValue::from(*i),
        Value::Index(i) => JsonValue::from(*i),
        Value::Float(f) | Value::Percentage(f) => JsonValue::from(*f),
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::DateTime(d) => JsonValue::String(d.to_rfc3339()),
        Value::Null | Value::Object(_) | Value::Array(_) => JsonValue::Null,
    }
}

/// Identity key of id values given in declaration order
pub fn encode_id(values: &[&Value]) -> String {
    match values {
        [single] => single.to_string(),
        many => JsonValue::Array(many.iter().map(|v| component(v)).collect()).to_string(),
    }
}

/// Id values of `id_properties` carried by a wire scalar, date-time
/// components read with `date_format`
///
/// # Errors
///
/// Returns `IncompleteForeignId` when the model has no id, and
/// `TypeMismatch` when the scalar does not decode to the id values.
pub fn decode_id(
    scalar: &Scalar,
    model: &str,
    id_properties: &[&Arc<Property>],
    date_format: &str,
) -> Result<Vec<Value>> {
    let kind_of = |property: &Property| match property.model() {
        ModelType::Simple(kind) => Ok(*kind),
        other => Err(ComhonError::TypeMismatch {
            expected: "scalar id".to_string(),
            actual: other.name(),
        }),
    };
    match id_properties {
        [] => Err(ComhonError::IncompleteForeignId {
            model: model.to_string(),
        }),
        [single] => Ok(vec![kind_of(single)?.import_scalar(scalar, date_format)?]),
        many => {
            let text = match scalar {
                Scalar::String(text) => text,
                other => {
                    return Err(ComhonError::TypeMismatch {
                        expected: "composite id".to_string(),
                        actual: other.type_name().to_string(),
                    })
                }
            };
            let parts: Vec<JsonValue> =
                serde_json::from_str(text).map_err(|_| ComhonError::TypeMismatch {
                    expected: "composite id".to_string(),
                    actual: text.clone(),
                })?;
            if parts.len() != many.len() {
                return Err(ComhonError::IncompleteForeignId {
                    model: model.to_string(),
                });
            }
            many.iter()
                .zip(parts.iter())
                .map(|(property, part)| kind_of(property)?.import_json(part, date_format))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfacer::DEFAULT_DATE_TIME_FORMAT;
    use crate::model::SimpleKind;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_single_id_is_its_text() {
        assert_eq!(encode_id(&[&Value::Integer(5)]), "5");
        assert_eq!(encode_id(&[&Value::from("abc")]), "abc");
    }

    #[test]
    fn test_composite_id_decodes_back() {
        let a = Arc::new(Property::new("a", ModelType::Simple(SimpleKind::String)).with_id(true));
        let b = Arc::new(Property::new("b", ModelType::Simple(SimpleKind::Integer)).with_id(true));
        let key = encode_id(&[&Value::from("x,\"y"), &Value::Integer(3)]);
        let values =
            decode_id(&Scalar::String(key), "Pair", &[&a, &b], DEFAULT_DATE_TIME_FORMAT).unwrap();
        assert_eq!(values, vec![Value::from("x,\"y"), Value::Integer(3)]);
    }

    #[test]
    fn test_composite_id_needs_every_part() {
        let a = Arc::new(Property::new("a", ModelType::Simple(SimpleKind::String)).with_id(true));
        let b = Arc::new(Property::new("b", ModelType::Simple(SimpleKind::Integer)).with_id(true));
        let err = decode_id(&Scalar::String(r#"["x"]"#.into()), "Pair", &[&a, &b], DEFAULT_DATE_TIME_FORMAT)
            .unwrap_err();
        assert!(matches!(err, ComhonError::IncompleteForeignId { .. }));
        assert!(decode_id(&Scalar::Int(1), "None", &[], DEFAULT_DATE_TIME_FORMAT).is_err());
    }

    #[test]
    fn test_date_time_id_follows_given_format() {
        let at = Arc::new(Property::new("at", ModelType::Simple(SimpleKind::DateTime)).with_id(true));
        let scalar = Scalar::String("05/03/2024 10:30".into());
        let values = decode_id(&scalar, "Slot", &[&at], "%d/%m/%Y %H:%M").unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap();
        assert_eq!(values, vec![Value::DateTime(expected.fixed_offset())]);
    }
}
