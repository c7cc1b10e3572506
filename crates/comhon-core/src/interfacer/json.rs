//! JSON tree backend

use super::{Format, InterfacedRef, InterfacedValue, Interfacer, Scalar};
use crate::errors::{ComhonError, Result};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonInterfacer;

impl JsonInterfacer {
    pub fn new() -> Self {
        Self
    }

    fn to_json(value: InterfacedValue<JsonValue>) -> JsonValue {
        match value {
            InterfacedValue::Null => JsonValue::Null,
            InterfacedValue::Scalar(scalar) => scalar.to_json(),
            InterfacedValue::Node(node) => node,
        }
    }

    fn to_ref(value: &JsonValue) -> InterfacedRef<'_, JsonValue> {
        match value {
            JsonValue::Null => InterfacedRef::Null,
            JsonValue::Object(_) | JsonValue::Array(_) => InterfacedRef::Node(value),
            other => match Scalar::from_json(other) {
                Some(scalar) => InterfacedRef::Scalar(scalar),
                None => InterfacedRef::Null,
            },
        }
    }
}

impl Interfacer for JsonInterfacer {
    type Node = JsonValue;

    fn format(&self) -> Format {
        Format::Json
    }

    fn create_node(&self, _name: &str) -> JsonValue {
        JsonValue::Object(Map::new())
    }

    fn create_array_node(&self, _name: &str, associative: bool) -> JsonValue {
        if associative {
            JsonValue::Object(Map::new())
        } else {
            JsonValue::Array(Vec::new())
        }
    }

    fn is_array_node(&self, node: &JsonValue) -> bool {
        node.is_array()
    }

    fn get_value<'a>(
        &self,
        node: &'a JsonValue,
        name: &str,
        _as_node: bool,
    ) -> Option<InterfacedRef<'a, JsonValue>> {
        node.as_object()?.get(name).map(Self::to_ref)
    }

    fn set_value(&self, node: &mut JsonValue, name: &str, value: InterfacedValue<JsonValue>, _as_node: bool) {
        if let JsonValue::Object(map) = node {
            map.insert(name.to_string(), Self::to_json(value));
        }
    }

    fn unset_value(&self, node: &mut JsonValue, name: &str, _as_node: bool) {
        if let JsonValue::Object(map) = node {
            map.remove(name);
        }
    }

    fn add_value(&self, array: &mut JsonValue, value: InterfacedValue<JsonValue>, _element_name: &str) {
        if let JsonValue::Array(items) = array {
            items.push(Self::to_json(value));
        }
    }

    fn add_associative_value(
        &self,
        array: &mut JsonValue,
        key: &str,
        value: InterfacedValue<JsonValue>,
        _element_name: &str,
    ) {
        if let JsonValue::Object(map) = array {
            map.insert(key.to_string(), Self::to_json(value));
        }
    }

    fn array_entries<'a>(
        &self,
        array: &'a JsonValue,
        associative: bool,
    ) -> Result<Vec<(Option<String>, InterfacedRef<'a, JsonValue>)>> {
        match (array, associative) {
            (JsonValue::Array(items), false) => Ok(items.iter().map(|v| (None, Self::to_ref(v))).collect()),
            (JsonValue::Object(map), true) => Ok(map
                .iter()
                .map(|(k, v)| (Some(k.clone()), Self::to_ref(v)))
                .collect()),
            (JsonValue::Array(_), true) => Err(ComhonError::ArrayShape {
                model: String::new(),
                reason: "expected a keyed node, found a list".to_string(),
            }),
            (JsonValue::Object(_), false) => Err(ComhonError::ArrayShape {
                model: String::new(),
                reason: "expected a list, found a keyed node".to_string(),
            }),
            (other, _) => Err(ComhonError::ArrayShape {
                model: String::new(),
                reason: format!("expected an array node, found {}", other),
            }),
        }
    }

    fn node_scalar(&self, _node: &JsonValue) -> Option<Scalar> {
        None
    }

    fn child_nodes<'a>(&self, node: &'a JsonValue) -> Vec<&'a JsonValue> {
        let nested = |v: &&JsonValue| v.is_object() || v.is_array();
        match node {
            JsonValue::Object(map) => map.values().filter(nested).collect(),
            JsonValue::Array(items) => items.iter().filter(nested).collect(),
            _ => Vec::new(),
        }
    }

    fn to_string(&self, node: &JsonValue, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(node)?
        } else {
            serde_json::to_string(node)?
        };
        Ok(text)
    }

    fn from_string(&self, text: &str) -> Result<JsonValue> {
        Ok(serde_json::from_str(text)?)
    }

    fn flatten_node(&self, node: &mut JsonValue, name: &str) -> Result<()> {
        let JsonValue::Object(map) = node else {
            return Ok(());
        };
        if let Some(child) = map.get_mut(name) {
            if child.is_object() || child.is_array() {
                *child = JsonValue::String(serde_json::to_string(&*child)?);
            }
        }
        Ok(())
    }

    fn unflatten_node(&self, node: &mut JsonValue, name: &str) -> Result<()> {
        let JsonValue::Object(map) = node else {
            return Ok(());
        };
        if let Some(child) = map.get_mut(name) {
            let parsed = match child {
                JsonValue::String(text) if text.trim_start().starts_with(['{', '[']) => {
                    serde_json::from_str(text)?
                }
                _ => return Ok(()),
            };
            *child = parsed;
        }
        Ok(())
    }
}
