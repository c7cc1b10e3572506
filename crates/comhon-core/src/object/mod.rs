//! Typed instances
//!
//! Objects and arrays live in an [`InstanceArena`] and refer to each other
//! through [`InstanceRef`] handles, so cyclic graphs need no shared
//! ownership. The operations that span several instances are methods of
//! [`crate::Comhon`] (see `ops.rs`).

pub mod id;
mod ops;
pub mod validate;

pub use id::{decode_id, encode_id};

use crate::errors::{ComhonError, Result};
use crate::model::{Model, ModelArray, Property};
use crate::value::{InstanceRef, Value};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// Instance of a complex model
#[derive(Debug, Clone)]
pub struct ComhonObject {
    pub(crate) model: Arc<Model>,
    pub(crate) values: IndexMap<String, Value>,
    pub(crate) updated: HashSet<String>,
    pub(crate) loaded: bool,
}

impl ComhonObject {
    pub(crate) fn new(model: Arc<Model>) -> Self {
        Self {
            model,
            values: IndexMap::new(),
            updated: HashSet::new(),
            loaded: false,
        }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Values in insertion order
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_value_flagged_updated(&self, name: &str) -> bool {
        self.updated.contains(name)
    }

    /// Identity key, `None` until every id property holds a non-null value
    pub fn id_key(&self) -> Option<String> {
        self.id_key_with(None)
    }

    /// Identity key the object would have once `change` is applied, a
    /// `None` value standing for an unset
    pub(crate) fn id_key_with(&self, change: Option<(&str, Option<&Value>)>) -> Option<String> {
        let definition = self.model.definition().ok()?;
        let mut values = Vec::new();
        for property in definition.id_properties() {
            let value = match change {
                Some((name, value)) if name == property.name() => value,
                _ => self.values.get(property.name()),
            };
            match value {
                Some(value) if !value.is_null() => values.push(value),
                _ => return None,
            }
        }
        if values.is_empty() {
            None
        } else {
            Some(encode_id(&values))
        }
    }

    pub(crate) fn populate_defaults(&mut self) -> Result<()> {
        let definition = self.model.definition()?;
        for (name, property) in definition.properties() {
            if let Some(default) = property.default_value() {
                self.values
                    .entry(name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
        Ok(())
    }

    pub(crate) fn store(&mut self, property: &Property, value: Value, flag_updated: bool) {
        self.values.insert(property.name().to_string(), value);
        if flag_updated {
            self.updated.insert(property.name().to_string());
        }
    }
}

/// Backing storage of an array instance
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValues {
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl ArrayValues {
    pub fn len(&self) -> usize {
        match self {
            ArrayValues::List(values) => values.len(),
            ArrayValues::Map(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in order; keys are `Some` for associative arrays
    pub fn entries(&self) -> Vec<(Option<&str>, &Value)> {
        match self {
            ArrayValues::List(values) => values.iter().map(|v| (None, v)).collect(),
            ArrayValues::Map(values) => values.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
        }
    }

    pub fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            ArrayValues::List(values) => Box::new(values.iter()),
            ArrayValues::Map(values) => Box::new(values.values()),
        }
    }
}

/// Instance of an array model
#[derive(Debug, Clone)]
pub struct ComhonArray {
    pub(crate) model: Arc<ModelArray>,
    pub(crate) values: ArrayValues,
    pub(crate) updated: bool,
    pub(crate) loaded: bool,
}

impl ComhonArray {
    pub(crate) fn new(model: Arc<ModelArray>) -> Self {
        let values = if model.is_associative() {
            ArrayValues::Map(IndexMap::new())
        } else {
            ArrayValues::List(Vec::new())
        };
        Self {
            model,
            values,
            updated: false,
            loaded: false,
        }
    }

    pub fn model(&self) -> &Arc<ModelArray> {
        &self.model
    }

    pub fn values(&self) -> &ArrayValues {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        match &self.values {
            ArrayValues::List(values) => values.get(index),
            ArrayValues::Map(values) => values.get_index(index).map(|(_, v)| v),
        }
    }

    pub fn get_key(&self, key: &str) -> Option<&Value> {
        match &self.values {
            ArrayValues::Map(values) => values.get(key),
            ArrayValues::List(_) => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

#[derive(Debug, Clone)]
pub enum Instance {
    Object(ComhonObject),
    Array(ComhonArray),
}

impl Instance {
    /// Model name for messages
    pub fn model_name(&self) -> String {
        match self {
            Instance::Object(object) => object.model.name().to_string(),
            Instance::Array(array) => array.model.name(),
        }
    }
}

/// Slab of instances addressed by [`InstanceRef`]
#[derive(Debug, Default, Clone)]
pub struct InstanceArena {
    slots: Vec<Instance>,
}

impl InstanceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn insert(&mut self, instance: Instance) -> InstanceRef {
        let handle = InstanceRef(self.slots.len() as u32);
        self.slots.push(instance);
        handle
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }

    fn invalid(handle: InstanceRef, reason: &str) -> ComhonError {
        ComhonError::InvalidInstance {
            handle: handle.index(),
            reason: reason.to_string(),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidInstance` for handles of another arena.
    pub fn get(&self, handle: InstanceRef) -> Result<&Instance> {
        self.slots
            .get(handle.0 as usize)
            .ok_or_else(|| Self::invalid(handle, "unknown handle"))
    }

    pub(crate) fn get_mut(&mut self, handle: InstanceRef) -> Result<&mut Instance> {
        self.slots
            .get_mut(handle.0 as usize)
            .ok_or_else(|| Self::invalid(handle, "unknown handle"))
    }

    /// # Errors
    ///
    /// Returns `InvalidInstance` if the handle is unknown or not an object.
    pub fn object(&self, handle: InstanceRef) -> Result<&ComhonObject> {
        match self.get(handle)? {
            Instance::Object(object) => Ok(object),
            Instance::Array(_) => Err(Self::invalid(handle, "not an object")),
        }
    }

    pub(crate) fn object_mut(&mut self, handle: InstanceRef) -> Result<&mut ComhonObject> {
        match self.get_mut(handle)? {
            Instance::Object(object) => Ok(object),
            Instance::Array(_) => Err(Self::invalid(handle, "not an object")),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidInstance` if the handle is unknown or not an array.
    pub fn array(&self, handle: InstanceRef) -> Result<&ComhonArray> {
        match self.get(handle)? {
            Instance::Array(array) => Ok(array),
            Instance::Object(_) => Err(Self::invalid(handle, "not an array")),
        }
    }

    pub(crate) fn array_mut(&mut self, handle: InstanceRef) -> Result<&mut ComhonArray> {
        match self.get_mut(handle)? {
            Instance::Array(array) => Ok(array),
            Instance::Object(_) => Err(Self::invalid(handle, "not an array")),
        }
    }

    /// Whether the instance or anything it owns was updated
    ///
    /// Owned complex values are searched recursively. Foreign values only
    /// report a change of their id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstance` for unknown handles.
    pub fn is_updated(&self, handle: InstanceRef) -> Result<bool> {
        let mut visited = HashSet::new();
        self.is_updated_inner(handle, &mut visited)
    }

    fn is_updated_inner(&self, handle: InstanceRef, visited: &mut HashSet<InstanceRef>) -> Result<bool> {
        if !visited.insert(handle) {
            return Ok(false);
        }
        match self.get(handle)? {
            Instance::Object(object) => {
                if !object.updated.is_empty() {
                    return Ok(true);
                }
                let definition = object.model.definition()?;
                for (name, value) in &object.values {
                    let foreign = definition
                        .properties()
                        .get(name)
                        .is_some_and(|p| p.is_foreign());
                    if self.is_nested_updated(value, foreign, visited)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Instance::Array(array) => {
                if array.updated {
                    return Ok(true);
                }
                let foreign = array.model.element().is_foreign();
                for value in array.values.values() {
                    if self.is_nested_updated(value, foreign, visited)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn is_nested_updated(
        &self,
        value: &Value,
        foreign: bool,
        visited: &mut HashSet<InstanceRef>,
    ) -> Result<bool> {
        match value {
            Value::Object(handle) if foreign => self.is_id_updated(*handle),
            Value::Array(handle) if foreign => {
                let array = self.array(*handle)?;
                if array.updated {
                    return Ok(true);
                }
                for element in array.values.values() {
                    if self.is_nested_updated(element, true, visited)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Value::Object(handle) | Value::Array(handle) => self.is_updated_inner(*handle, visited),
            _ => Ok(false),
        }
    }

    /// Whether `name` was set or unset since the last reset, or holds an
    /// owned value that was updated
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstance` for unknown handles and `UnknownProperty`
    /// for names the model does not declare.
    pub fn is_value_updated(&self, handle: InstanceRef, name: &str) -> Result<bool> {
        let object = self.object(handle)?;
        let property = object.model.property(name)?;
        if object.updated.contains(name) {
            return Ok(true);
        }
        match object.values.get(name) {
            Some(value) => {
                let mut visited = HashSet::from([handle]);
                self.is_nested_updated(value, property.is_foreign(), &mut visited)
            }
            None => Ok(false),
        }
    }

    /// Whether an id value of the object was updated
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstance` if the handle is not an object.
    pub fn is_id_updated(&self, handle: InstanceRef) -> Result<bool> {
        let object = self.object(handle)?;
        let definition = object.model.definition()?;
        Ok(definition
            .id_properties()
            .any(|p| object.updated.contains(p.name())))
    }

    /// Clear update flags; owned values too when `recursive`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstance` for unknown handles.
    pub fn reset_updated_status(&mut self, handle: InstanceRef, recursive: bool) -> Result<()> {
        let mut visited = HashSet::new();
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            match self.get_mut(current)? {
                Instance::Object(object) => {
                    object.updated.clear();
                    if recursive {
                        let definition = object.model.definition()?;
                        for (name, value) in &object.values {
                            let foreign = definition
                                .properties()
                                .get(name)
                                .is_some_and(|p| p.is_foreign());
                            if let (false, Some(child)) = (foreign, value.as_instance()) {
                                stack.push(child);
                            }
                        }
                    }
                }
                Instance::Array(array) => {
                    array.updated = false;
                    if recursive && !array.model.element().is_foreign() {
                        stack.extend(array.values.values().filter_map(Value::as_instance));
                    }
                }
            }
        }
        Ok(())
    }
}
