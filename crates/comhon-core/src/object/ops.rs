use super::{decode_id, ArrayValues, ComhonArray, ComhonObject, Instance};
use crate::context::Comhon;
use crate::errors::{ComhonError, Result};
use crate::interfacer::{Scalar, DEFAULT_DATE_TIME_FORMAT};
use crate::model::{AutoKind, Model, ModelArray, ModelType, SimpleKind};
use crate::restriction::{self, Subject};
use crate::value::{InstanceRef, Value};
use crate::visitor::{walk, ObjectValidator, WalkOptions};
use crate::{log_op_end, log_op_error, log_op_start};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

impl Comhon {
    /// Create an unloaded object of `model` holding its default values
    ///
    /// # Errors
    ///
    /// Returns `ModelNotLoaded` if `model` has not been loaded.
    pub fn new_object(&mut self, model: &Arc<Model>) -> Result<InstanceRef> {
        let mut object = ComhonObject::new(model.clone());
        object.populate_defaults()?;
        Ok(self.arena.insert(Instance::Object(object)))
    }

    /// Create an empty, unloaded array of `model`
    pub fn new_array(&mut self, model: Arc<ModelArray>) -> InstanceRef {
        self.arena.insert(Instance::Array(ComhonArray::new(model)))
    }

    /// # Errors
    ///
    /// Returns `InvalidInstance` if `handle` is not an object and
    /// `UnknownProperty` if its model does not declare `name`.
    pub fn get_value(&self, handle: InstanceRef, name: &str) -> Result<Option<&Value>> {
        let object = self.arena.object(handle)?;
        object.model.property(name)?;
        Ok(object.values.get(name))
    }

    /// # Errors
    ///
    /// See [`Comhon::get_value`].
    pub fn has_value(&self, handle: InstanceRef, name: &str) -> Result<bool> {
        Ok(self.get_value(handle, name)?.is_some())
    }

    /// Whether `value` may be stored where `model` is expected
    fn check_value_model(&self, model: &ModelType, value: &Value) -> Result<()> {
        match (model, value) {
            (_, Value::Null) => Ok(()),
            (ModelType::Simple(kind), value) => {
                if kind.accepts(value) {
                    Ok(())
                } else {
                    Err(ComhonError::TypeMismatch {
                        expected: kind.name().to_string(),
                        actual: value.type_name().to_string(),
                    })
                }
            }
            (ModelType::Complex(expected), Value::Object(handle)) => {
                let actual = &self.arena.object(*handle)?.model;
                if actual.is_same_or_descendant_of(expected) {
                    Ok(())
                } else {
                    Err(ComhonError::TypeMismatch {
                        expected: expected.name().to_string(),
                        actual: actual.name().to_string(),
                    })
                }
            }
            (ModelType::Array(expected), Value::Array(handle)) => {
                let actual = &self.arena.array(*handle)?.model;
                if Arc::ptr_eq(actual, expected) || actual.is_equal(expected) {
                    Ok(())
                } else {
                    Err(ComhonError::ArrayShape {
                        model: expected.name(),
                        reason: format!("got {}", actual.name()),
                    })
                }
            }
            (ModelType::Foreign(inner), value) => self.check_value_model(inner, value),
            (expected, value) => Err(ComhonError::TypeMismatch {
                expected: expected.name(),
                actual: value.type_name().to_string(),
            }),
        }
    }

    /// Fail if another main object already holds `key` for `model`
    fn check_main_slot(&self, model: &Model, key: Option<&str>, handle: InstanceRef) -> Result<()> {
        let Some(key) = key else {
            return Ok(());
        };
        if !model.is_main() {
            return Ok(());
        }
        match self.main.get(model, key) {
            Some(existing) if existing != handle => Err(ComhonError::DuplicateIdentity {
                model: model.name().to_string(),
                id: key.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Move `handle` from `old` to `new` in the main collection
    pub(crate) fn rekey_main(
        &mut self,
        handle: InstanceRef,
        old: Option<(&Model, &str)>,
        new: Option<(&Model, &str)>,
    ) -> Result<()> {
        if let Some((model, key)) = old {
            self.main.remove(model, key, handle);
        }
        match new {
            Some((model, key)) if model.is_main() => self.main.add(model, key, handle),
            _ => Ok(()),
        }
    }

    /// Store `value` under `name`
    ///
    /// The value must match the property model and satisfy its
    /// restrictions. Changing an id of a main model moves the object in the
    /// main collection.
    ///
    /// # Errors
    ///
    /// Returns `UnknownProperty`, `TypeMismatch`, `ArrayShape`,
    /// `ValueValidation`, or `DuplicateIdentity` when the new id is held by
    /// another main object. The object is left unchanged on error.
    pub fn set_value(&mut self, handle: InstanceRef, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let object = self.arena.object(handle)?;
        let model = object.model.clone();
        let property = model.property(name)?.clone();
        self.check_value_model(property.model(), &value)?;
        restriction::check(property.restrictions(), Subject::Value(&value), 0)?;

        let (old_key, new_key) = if property.is_id() {
            (object.id_key(), object.id_key_with(Some((name, Some(&value)))))
        } else {
            (None, None)
        };
        if property.is_id() && old_key != new_key {
            self.check_main_slot(&model, new_key.as_deref(), handle)?;
        }

        self.arena.object_mut(handle)?.store(&property, value, true);

        if property.is_id() && old_key != new_key {
            self.rekey_main(
                handle,
                old_key.as_deref().map(|k| (model.as_ref(), k)),
                new_key.as_deref().map(|k| (model.as_ref(), k)),
            )?;
        }
        Ok(())
    }

    /// Remove the value of `name`, flagging it updated if it was set
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstance` or `UnknownProperty`.
    pub fn unset_value(&mut self, handle: InstanceRef, name: &str) -> Result<()> {
        let object = self.arena.object(handle)?;
        let model = object.model.clone();
        let property = model.property(name)?.clone();
        if !object.values.contains_key(name) {
            return Ok(());
        }
        let old_key = property.is_id().then(|| object.id_key()).flatten();

        let object = self.arena.object_mut(handle)?;
        object.values.shift_remove(name);
        object.updated.insert(name.to_string());

        if let Some(old_key) = old_key {
            self.rekey_main(handle, Some((model.as_ref(), old_key.as_str())), None)?;
        }
        Ok(())
    }

    fn check_element(&self, array: &ComhonArray, value: &Value) -> Result<()> {
        self.check_value_model(array.model.element(), value)?;
        restriction::check(array.model.element_restrictions(), Subject::Value(value), 0)
    }

    /// Append `value` to a list array
    ///
    /// # Errors
    ///
    /// Returns `ArrayShape` for associative arrays, and `TypeMismatch` or
    /// `ValueValidation` when the element or the new size is rejected.
    pub fn push_value(&mut self, handle: InstanceRef, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let array = self.arena.array(handle)?;
        if array.model.is_associative() {
            return Err(ComhonError::ArrayShape {
                model: array.model.name(),
                reason: "associative arrays are filled by key".to_string(),
            });
        }
        self.check_element(array, &value)?;
        restriction::check(array.model.restrictions(), Subject::Count(array.len()), 1)?;

        let array = self.arena.array_mut(handle)?;
        if let ArrayValues::List(values) = &mut array.values {
            values.push(value);
        }
        array.updated = true;
        Ok(())
    }

    /// Insert or replace the element stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `ArrayShape` for list arrays, and `TypeMismatch` or
    /// `ValueValidation` when the element or the new size is rejected.
    pub fn set_key_value(&mut self, handle: InstanceRef, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let array = self.arena.array(handle)?;
        if !array.model.is_associative() {
            return Err(ComhonError::ArrayShape {
                model: array.model.name(),
                reason: "list arrays have no keys".to_string(),
            });
        }
        self.check_element(array, &value)?;
        if array.get_key(key).is_none() {
            restriction::check(array.model.restrictions(), Subject::Count(array.len()), 1)?;
        }

        let array = self.arena.array_mut(handle)?;
        if let ArrayValues::Map(values) = &mut array.values {
            values.insert(key.to_string(), value);
        }
        array.updated = true;
        Ok(())
    }

    /// Remove the element stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `ArrayShape` for list arrays and `ValueValidation` when the
    /// array may not shrink.
    pub fn remove_key(&mut self, handle: InstanceRef, key: &str) -> Result<Option<Value>> {
        let array = self.arena.array(handle)?;
        if !array.model.is_associative() {
            return Err(ComhonError::ArrayShape {
                model: array.model.name(),
                reason: "list arrays have no keys".to_string(),
            });
        }
        if array.get_key(key).is_none() {
            return Ok(None);
        }
        restriction::check(array.model.restrictions(), Subject::Count(array.len()), -1)?;

        let array = self.arena.array_mut(handle)?;
        let removed = match &mut array.values {
            ArrayValues::Map(values) => values.shift_remove(key),
            ArrayValues::List(_) => None,
        };
        array.updated = true;
        Ok(removed)
    }

    /// Id of the object: the value of its single id property, or the
    /// encoded key of a composite id. `None` until every id value is set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstance` if `handle` is not an object.
    pub fn get_id(&self, handle: InstanceRef) -> Result<Option<Value>> {
        let object = self.arena.object(handle)?;
        let ids = object.model.id_properties()?;
        match ids.as_slice() {
            [single] => Ok(object.values.get(single.name()).filter(|v| !v.is_null()).cloned()),
            _ => Ok(object.id_key().map(Value::String)),
        }
    }

    /// Set the id values of the object from `id` as returned by
    /// [`Comhon::get_id`]
    ///
    /// # Errors
    ///
    /// Returns `IncompleteForeignId` for models without id, `TypeMismatch`
    /// for undecodable composite ids, or any error of
    /// [`Comhon::set_value`].
    pub fn set_id(&mut self, handle: InstanceRef, id: impl Into<Value>) -> Result<()> {
        let id = id.into();
        let object = self.arena.object(handle)?;
        let model = object.model.clone();
        let ids = model.id_properties()?;
        if let [single] = ids.as_slice() {
            return self.set_value(handle, single.name(), id);
        }
        let scalar = match &id {
            Value::String(text) => Scalar::String(text.clone()),
            other => {
                return Err(ComhonError::TypeMismatch {
                    expected: "composite id".to_string(),
                    actual: other.type_name().to_string(),
                })
            }
        };
        let values = decode_id(&scalar, model.name(), &ids, DEFAULT_DATE_TIME_FORMAT)?;
        for (property, value) in ids.iter().zip(values) {
            self.set_value(handle, property.name(), value)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InvalidInstance` for unknown handles.
    pub fn is_loaded(&self, handle: InstanceRef) -> Result<bool> {
        Ok(match self.arena.get(handle)? {
            Instance::Object(object) => object.loaded,
            Instance::Array(array) => array.loaded,
        })
    }

    /// # Errors
    ///
    /// Returns `AbstractObject` when loading an object of an abstract
    /// model.
    pub fn set_is_loaded(&mut self, handle: InstanceRef, loaded: bool) -> Result<()> {
        match self.arena.get_mut(handle)? {
            Instance::Object(object) => {
                if loaded && object.model.is_abstract() {
                    return Err(ComhonError::AbstractObject {
                        model: object.model.name().to_string(),
                    });
                }
                object.loaded = loaded;
            }
            Instance::Array(array) => array.loaded = loaded,
        }
        Ok(())
    }

    /// See [`InstanceArena::is_updated`](super::InstanceArena::is_updated)
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstance` for unknown handles.
    pub fn is_updated(&self, handle: InstanceRef) -> Result<bool> {
        self.arena.is_updated(handle)
    }

    /// # Errors
    ///
    /// Returns `InvalidInstance` if `handle` is not an object.
    pub fn is_id_updated(&self, handle: InstanceRef) -> Result<bool> {
        self.arena.is_id_updated(handle)
    }

    /// # Errors
    ///
    /// Returns `InvalidInstance` or `UnknownProperty`.
    pub fn is_value_updated(&self, handle: InstanceRef, name: &str) -> Result<bool> {
        self.arena.is_value_updated(handle, name)
    }

    /// # Errors
    ///
    /// Returns `InvalidInstance` for unknown handles.
    pub fn reset_updated_status(&mut self, handle: InstanceRef, recursive: bool) -> Result<()> {
        self.arena.reset_updated_status(handle, recursive)
    }

    /// Return the instance to its freshly created state
    ///
    /// An object leaves the main collection, loses every value and gets its
    /// defaults back.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInstance` for unknown handles.
    pub fn reset(&mut self, handle: InstanceRef) -> Result<()> {
        match self.arena.get_mut(handle)? {
            Instance::Object(object) => {
                let model = object.model.clone();
                let old_key = object.id_key();
                object.values.clear();
                object.updated.clear();
                object.loaded = false;
                object.populate_defaults()?;
                if let Some(old_key) = old_key {
                    self.rekey_main(handle, Some((model.as_ref(), old_key.as_str())), None)?;
                }
            }
            Instance::Array(array) => {
                array.values = ComhonArray::new(array.model.clone()).values;
                array.updated = false;
                array.loaded = false;
            }
        }
        Ok(())
    }

    /// Re-type the object as `model`, a descendant of its current model
    ///
    /// # Errors
    ///
    /// Returns `Cast` when `model` is outside the object lineage or is
    /// abstract while the object is loaded, and `DuplicateIdentity` when
    /// the main collection already holds another object under the new key.
    pub fn cast(&mut self, handle: InstanceRef, model: &Arc<Model>) -> Result<()> {
        let start = Instant::now();
        log_op_start!("cast", model.name());
        let result = self.cast_inner(handle, model);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => log_op_end!("cast", model.name(), duration_ms),
            Err(err) => log_op_error!("cast", model.name(), err, duration_ms),
        }
        result
    }

    pub(crate) fn cast_inner(&mut self, handle: InstanceRef, model: &Arc<Model>) -> Result<()> {
        model.definition()?;
        let object = self.arena.object(handle)?;
        let current = object.model.clone();
        if current.name() == model.name() {
            return Ok(());
        }
        let cast_error = |reason: &str| ComhonError::Cast {
            from: current.name().to_string(),
            to: model.name().to_string(),
            reason: reason.to_string(),
        };
        if !model.inherits_from(&current) {
            return Err(cast_error("not a descendant model"));
        }
        if object.loaded && model.is_abstract() {
            return Err(cast_error("loaded object cannot become abstract"));
        }
        let key = object.id_key();
        self.check_main_slot(model, key.as_deref(), handle)?;

        self.arena.object_mut(handle)?.model = model.clone();
        if let Some(key) = key {
            self.rekey_main(
                handle,
                Some((current.as_ref(), key.as_str())),
                Some((model.as_ref(), key.as_str())),
            )?;
        }
        Ok(())
    }

    /// Validate the instance and every value it owns
    ///
    /// # Errors
    ///
    /// Returns the first `MissingRequired`, `ValueValidation`, `Conflict`
    /// or `Dependency` error, located by its path from `handle`.
    pub fn validate(&self, handle: InstanceRef) -> Result<()> {
        let start = Instant::now();
        let model = self.arena.get(handle)?.model_name();
        log_op_start!("validate", model);
        let result = self.validate_graph(handle);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => log_op_end!("validate", model, duration_ms),
            Err(err) => log_op_error!("validate", model, err, duration_ms),
        }
        result
    }

    pub(crate) fn validate_graph(&self, handle: InstanceRef) -> Result<()> {
        let mut validator = ObjectValidator::new();
        walk(
            &self.arena,
            handle,
            WalkOptions {
                through_foreign: false,
                visit_root: true,
            },
            &mut validator,
        )
    }

    /// Whether [`Comhon::validate`] would succeed
    pub fn is_valid(&self, handle: InstanceRef) -> bool {
        self.validate_graph(handle).is_ok()
    }

    /// Generate the auto values the object does not hold yet
    ///
    /// Incremental values come from a counter per identity partition.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Comhon::set_value`].
    pub fn fill_auto_values(&mut self, handle: InstanceRef) -> Result<()> {
        let object = self.arena.object(handle)?;
        let model = object.model.clone();
        let missing: Vec<_> = model
            .properties()?
            .values()
            .filter(|p| p.auto().is_some() && !object.values.contains_key(p.name()))
            .cloned()
            .collect();
        for property in missing {
            let value = match (property.auto(), property.model()) {
                (Some(AutoKind::Incremental), model_type) => {
                    let counter = self
                        .auto_counters
                        .entry(format!("{}.{}", model.key_name(), property.name()))
                        .or_insert(0);
                    *counter += 1;
                    match model_type {
                        ModelType::Simple(SimpleKind::Index) => Value::Index(*counter as u64),
                        _ => Value::Integer(*counter),
                    }
                }
                (Some(AutoKind::DateTime), _) => Value::DateTime(Utc::now().fixed_offset()),
                (None, _) => continue,
            };
            self.set_value(handle, property.name(), value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Comhon;
    use crate::errors::{ComhonError, ExErrorKind};
    use crate::model::ModelArray;
    use crate::provider::MemoryManifestProvider;
    use crate::value::Value;
    use serde_json::json;
    use std::sync::Arc;

    fn provider() -> MemoryManifestProvider {
        MemoryManifestProvider::new()
            .with_manifest(
                "Town",
                json!({
                    "version": "3.0",
                    "is_main": true,
                    "properties": [
                        {"inheritance-": "Integer", "name": "id", "is_id": true},
                        {"inheritance-": "String", "name": "name", "length": "[1,20]"},
                        {"inheritance-": "String", "name": "country", "default": "France"},
                        {"inheritance-": "Integer", "name": "code", "auto": "incremental"}
                    ]
                }),
            )
            .with_manifest(
                "Capital",
                json!({"version": "3.0", "extends": "Town", "properties": []}),
            )
            .with_manifest(
                "Shape",
                json!({
                    "version": "3.0",
                    "is_abstract": true,
                    "properties": [{"inheritance-": "Index", "name": "id", "is_id": true}]
                }),
            )
    }

    async fn comhon() -> Comhon {
        let comhon = Comhon::new(Arc::new(provider()));
        comhon.load_model("Capital").await.unwrap();
        comhon.load_model("Shape").await.unwrap();
        comhon
    }

    #[tokio::test]
    async fn test_new_object_holds_defaults() {
        let mut comhon = comhon().await;
        let town = comhon.registry().get("Town");
        let handle = comhon.new_object(&town).unwrap();
        assert_eq!(comhon.get_value(handle, "country").unwrap(), Some(&Value::from("France")));
        assert!(!comhon.is_loaded(handle).unwrap());
        assert!(!comhon.is_updated(handle).unwrap());
        assert!(matches!(
            comhon.get_value(handle, "mayor"),
            Err(ComhonError::UnknownProperty { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_value_checks_type_and_restrictions() {
        let mut comhon = comhon().await;
        let town = comhon.registry().get("Town");
        let handle = comhon.new_object(&town).unwrap();

        let err = comhon.set_value(handle, "name", 3i64).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::TypeMismatch);
        let err = comhon.set_value(handle, "name", "").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ValueValidation);
        assert!(!comhon.has_value(handle, "name").unwrap());

        comhon.set_value(handle, "name", "Lyon").unwrap();
        assert!(comhon.is_value_updated(handle, "name").unwrap());
        comhon.unset_value(handle, "name").unwrap();
        assert!(!comhon.has_value(handle, "name").unwrap());
        assert!(comhon.is_value_updated(handle, "name").unwrap());
    }

    #[tokio::test]
    async fn test_main_objects_follow_their_id() {
        let mut comhon = comhon().await;
        let town = comhon.registry().get("Town");
        let first = comhon.new_object(&town).unwrap();
        let second = comhon.new_object(&town).unwrap();

        comhon.set_id(first, 1i64).unwrap();
        assert!(comhon.main_objects().holds(&town, "1", first));
        let err = comhon.set_id(second, 1i64).unwrap_err();
        assert!(matches!(err, ComhonError::DuplicateIdentity { .. }));
        assert!(!comhon.has_value(second, "id").unwrap());

        comhon.set_id(first, 2i64).unwrap();
        assert!(comhon.main_objects().get(&town, "1").is_none());
        comhon.set_id(second, 1i64).unwrap();
        assert_eq!(comhon.get_id(second).unwrap(), Some(Value::Integer(1)));

        comhon.reset(first).unwrap();
        assert!(comhon.main_objects().get(&town, "2").is_none());
        assert_eq!(comhon.get_value(first, "country").unwrap(), Some(&Value::from("France")));
    }

    #[tokio::test]
    async fn test_abstract_object_cannot_be_loaded() {
        let mut comhon = comhon().await;
        let shape = comhon.registry().get("Shape");
        let handle = comhon.new_object(&shape).unwrap();
        comhon.set_id(handle, Value::Index(1)).unwrap();
        let err = comhon.set_is_loaded(handle, true).unwrap_err();
        assert!(matches!(err, ComhonError::AbstractObject { .. }));
        comhon.set_is_loaded(handle, false).unwrap();
    }

    #[tokio::test]
    async fn test_cast_stays_in_lineage() {
        let mut comhon = comhon().await;
        let town = comhon.registry().get("Town");
        let capital = comhon.registry().get("Capital");
        let shape = comhon.registry().get("Shape");

        let handle = comhon.new_object(&town).unwrap();
        comhon.set_id(handle, 7i64).unwrap();
        comhon.cast(handle, &capital).unwrap();
        assert_eq!(comhon.arena().object(handle).unwrap().model().name(), "Capital");
        assert!(comhon.main_objects().holds(&capital, "7", handle));

        let err = comhon.cast(handle, &town).unwrap_err();
        assert!(matches!(err, ComhonError::Cast { .. }));
        let err = comhon.cast(handle, &shape).unwrap_err();
        assert!(matches!(err, ComhonError::Cast { .. }));
    }

    #[tokio::test]
    async fn test_fill_auto_values_counts_per_model() {
        let mut comhon = comhon().await;
        let town = comhon.registry().get("Town");
        let first = comhon.new_object(&town).unwrap();
        let second = comhon.new_object(&town).unwrap();
        comhon.fill_auto_values(first).unwrap();
        comhon.fill_auto_values(second).unwrap();
        comhon.fill_auto_values(second).unwrap();
        assert_eq!(comhon.get_value(first, "code").unwrap(), Some(&Value::Integer(1)));
        assert_eq!(comhon.get_value(second, "code").unwrap(), Some(&Value::Integer(2)));
    }

    #[tokio::test]
    async fn test_array_mutations() {
        let mut comhon = comhon().await;
        let town = comhon.registry().get("Town");
        let towns = Arc::new(ModelArray::new(
            crate::model::ModelType::Complex(town.clone()),
            true,
            "town",
        ));
        let handle = comhon.new_array(towns);
        let lyon = comhon.new_object(&town).unwrap();

        assert!(matches!(
            comhon.push_value(handle, Value::Object(lyon)),
            Err(ComhonError::ArrayShape { .. })
        ));
        comhon.set_key_value(handle, "lyon", Value::Object(lyon)).unwrap();
        assert!(matches!(
            comhon.set_key_value(handle, "x", 3i64),
            Err(ComhonError::TypeMismatch { .. })
        ));
        assert_eq!(comhon.arena().array(handle).unwrap().len(), 1);
        assert_eq!(comhon.remove_key(handle, "lyon").unwrap(), Some(Value::Object(lyon)));
        assert!(comhon.is_updated(handle).unwrap());
    }
}
