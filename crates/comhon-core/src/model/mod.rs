//! Models: scalar kinds, complex models, arrays and foreign references

pub mod array;
pub mod complex;
pub mod property;
pub mod simple;

pub use array::ModelArray;
pub use complex::{Model, ModelDefinition};
pub use property::{AutoKind, Property, PropertyKind};
pub use simple::SimpleKind;

use crate::errors::{ComhonError, Result};
use std::sync::Arc;

/// Any model a value can be typed with
#[derive(Debug, Clone)]
pub enum ModelType {
    Simple(SimpleKind),
    Complex(Arc<Model>),
    Array(Arc<ModelArray>),
    /// Reference by id to a complex value, or an array of them
    Foreign(Box<ModelType>),
}

impl ModelType {
    /// Wrap `inner` as a foreign reference
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` unless the unique leaf model is complex.
    pub fn foreign(inner: ModelType) -> Result<ModelType> {
        let inner = match inner {
            ModelType::Foreign(inner) => *inner,
            other => other,
        };
        match inner.unique_model() {
            ModelType::Complex(_) => Ok(ModelType::Foreign(Box::new(inner))),
            other => Err(ComhonError::TypeMismatch {
                expected: "complex model".to_string(),
                actual: other.name(),
            }),
        }
    }

    pub fn name(&self) -> String {
        match self {
            ModelType::Simple(kind) => kind.name().to_string(),
            ModelType::Complex(model) => model.name().to_string(),
            ModelType::Array(array) => array.name(),
            ModelType::Foreign(inner) => format!("foreign {}", inner.name()),
        }
    }

    pub fn is_foreign(&self) -> bool {
        matches!(self, ModelType::Foreign(_))
    }

    pub fn without_foreign(&self) -> &ModelType {
        match self {
            ModelType::Foreign(inner) => inner,
            other => other,
        }
    }

    /// Leaf model reached through foreign and array wrappers
    pub fn unique_model(&self) -> &ModelType {
        match self {
            ModelType::Foreign(inner) => inner.unique_model(),
            ModelType::Array(array) => array.element().unique_model(),
            other => other,
        }
    }

    /// Complex leaf model, if any
    pub fn unique_complex(&self) -> Option<&Arc<Model>> {
        match self.unique_model() {
            ModelType::Complex(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&Arc<Model>> {
        match self {
            ModelType::Complex(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Arc<ModelArray>> {
        match self {
            ModelType::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, ModelType::Simple(_))
    }

    /// Structural equality; complex models compare by name
    pub fn is_equal(&self, other: &ModelType) -> bool {
        match (self, other) {
            (ModelType::Simple(a), ModelType::Simple(b)) => a == b,
            (ModelType::Complex(a), ModelType::Complex(b)) => a.name() == b.name(),
            (ModelType::Array(a), ModelType::Array(b)) => Arc::ptr_eq(a, b) || a.is_equal(b),
            (ModelType::Foreign(a), ModelType::Foreign(b)) => a.is_equal(b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_requires_complex_leaf() {
        let person = ModelType::Complex(Arc::new(Model::new("Person")));
        assert!(ModelType::foreign(person.clone()).is_ok());

        let people = ModelType::Array(Arc::new(ModelArray::new(person, false, "person")));
        let foreign = ModelType::foreign(people).unwrap();
        assert!(foreign.is_foreign());
        assert_eq!(foreign.unique_complex().map(|m| m.name()), Some("Person"));

        let tags = ModelType::Array(Arc::new(ModelArray::new(
            ModelType::Simple(SimpleKind::String),
            false,
            "tag",
        )));
        assert!(ModelType::foreign(tags).is_err());
    }

    #[test]
    fn test_foreign_is_not_nested() {
        let person = ModelType::Complex(Arc::new(Model::new("Person")));
        let once = ModelType::foreign(person).unwrap();
        let twice = ModelType::foreign(once.clone()).unwrap();
        assert!(once.is_equal(&twice));
    }
}
