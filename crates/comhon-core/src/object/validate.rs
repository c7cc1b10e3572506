//! Constraint checks of a single instance
//!
//! Nested instances are reached by the [`ObjectValidator`] visitor.
//!
//! [`ObjectValidator`]: crate::visitor::ObjectValidator

use super::{ComhonArray, ComhonObject};
use crate::errors::{ComhonError, Result, ResultExt};
use crate::restriction::{self, Subject};

/// Check required values, restrictions, conflicts and dependencies
///
/// # Errors
///
/// Returns the first `MissingRequired`, `ValueValidation`, `Conflict` or
/// `Dependency` error found, in property declaration order.
pub fn validate_object(object: &ComhonObject) -> Result<()> {
    let definition = object.model.definition()?;
    let model = object.model.name();

    for (name, property) in definition.properties() {
        match object.values.get(name) {
            None if property.is_required() && property.auto().is_none() => {
                return Err(ComhonError::MissingRequired {
                    model: model.to_string(),
                    property: name.clone(),
                });
            }
            None => {}
            Some(value) => restriction::check(property.restrictions(), Subject::Value(value), 0).at(name)?,
        }
    }

    for (name, property) in definition.properties() {
        if !object.values.contains_key(name) {
            continue;
        }
        if let Some(other) = definition
            .conflicts_of(name)
            .iter()
            .find(|other| object.values.contains_key(other.as_str()))
        {
            return Err(ComhonError::Conflict {
                model: model.to_string(),
                property: name.clone(),
                other: other.clone(),
            });
        }
        if let Some(dependency) = property
            .dependencies()
            .iter()
            .find(|d| !object.values.contains_key(d.as_str()))
        {
            return Err(ComhonError::Dependency {
                model: model.to_string(),
                property: name.clone(),
                dependency: dependency.clone(),
            });
        }
    }
    Ok(())
}

/// Check size restrictions and element restrictions
///
/// # Errors
///
/// Returns `ValueValidation` for the first restriction not satisfied.
pub fn validate_array(array: &ComhonArray) -> Result<()> {
    restriction::check(array.model.restrictions(), Subject::Count(array.len()), 0)?;
    for (index, (key, value)) in array.values.entries().into_iter().enumerate() {
        let segment = key.map(str::to_string).unwrap_or_else(|| index.to_string());
        restriction::check(array.model.element_restrictions(), Subject::Value(value), 0).at(&segment)?;
    }
    Ok(())
}
