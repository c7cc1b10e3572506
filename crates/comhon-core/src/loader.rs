//! Loading of stored objects through a [`DataProvider`]
//!
//! Stored documents are JSON in private context. They replace the values
//! of the objects they fill and are not flagged as updated.

use crate::collection::ObjectCollection;
use crate::context::Comhon;
use crate::errors::{ComhonError, Result};
use crate::interfacer::{InterfacerOptions, JsonInterfacer, MergeType};
use crate::model::{Model, ModelArray, ModelType};
use crate::provider::{CollectionFilter, DataProvider};
use crate::value::{InstanceRef, Value};
use crate::{log_op_end, log_op_error, log_op_start};
use std::sync::Arc;
use std::time::Instant;

fn stored_options() -> InterfacerOptions {
    InterfacerOptions::default()
        .with_private(true)
        .with_merge(MergeType::Overwrite)
        .with_flag_values_as_updated(false)
        .with_verify_references(false)
}

impl Comhon {
    /// Fill the object `handle` from the stored document with its id
    ///
    /// Returns `false` when the provider holds no such document.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteForeignId` for objects without a complete id,
    /// provider failures other than not found, and import errors.
    pub async fn load_object(&mut self, handle: InstanceRef, provider: &dyn DataProvider) -> Result<bool> {
        let object = self.arena.object(handle)?;
        let model = object.model().clone();
        let id = object.id_key().ok_or_else(|| ComhonError::IncompleteForeignId {
            model: model.name().to_string(),
        })?;

        let start = Instant::now();
        log_op_start!("load_object", model.name(), object_id = id.as_str());
        let result: Result<bool> = async {
            let document = match provider.load_by_id(model.name(), &id).await {
                Ok(document) => document,
                Err(err) if err.is_not_found() => return Ok(false),
                Err(err) => return Err(err.into()),
            };
            self.fill_object(handle, &JsonInterfacer, &document, &stored_options())
                .await?;
            Ok(true)
        }
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(found) => log_op_end!("load_object", model.name(), duration_ms, found = *found),
            Err(err) => log_op_error!("load_object", model.name(), err, duration_ms),
        }
        result
    }

    /// Every stored object of `model`, as a new array
    ///
    /// # Errors
    ///
    /// Returns provider failures and import errors.
    pub async fn load_collection(&mut self, model: &Arc<Model>, provider: &dyn DataProvider) -> Result<InstanceRef> {
        let array = Arc::new(ModelArray::new(
            ModelType::Complex(model.clone()),
            false,
            model.short_name(),
        ));
        self.load_array(model, &array, CollectionFilter::All, ObjectCollection::new(), provider)
            .await
    }

    /// Load the objects aggregated by `property` of the object `handle`
    ///
    /// The loaded objects refer back to the owner instance. The array is
    /// stored as the property value and returned.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` when `property` is not an aggregation,
    /// `IncompleteForeignId` when the owner has no complete id, provider
    /// failures and import errors.
    pub async fn load_aggregation(
        &mut self,
        handle: InstanceRef,
        property: &str,
        provider: &dyn DataProvider,
    ) -> Result<InstanceRef> {
        let owner = self.arena.object(handle)?;
        let model = owner.model().clone();
        let declared = model.property(property)?.clone();
        let array = match declared.model().without_foreign() {
            ModelType::Array(array) if declared.is_aggregation() => array.clone(),
            other => {
                return Err(ComhonError::TypeMismatch {
                    expected: "aggregation".to_string(),
                    actual: other.name(),
                })
            }
        };
        let Some(element) = array.element().unique_complex().cloned() else {
            return Err(ComhonError::TypeMismatch {
                expected: "aggregation".to_string(),
                actual: array.name(),
            });
        };
        let id = owner.id_key().ok_or_else(|| ComhonError::IncompleteForeignId {
            model: model.name().to_string(),
        })?;

        let mut start = ObjectCollection::new();
        start.add(&model, &id, handle)?;
        let filter = CollectionFilter::Reference {
            properties: declared.aggregations().to_vec(),
            id,
        };
        let loaded = self.load_array(&element, &array, filter, start, provider).await?;
        self.set_value(handle, property, Value::Array(loaded))?;
        Ok(loaded)
    }

    async fn load_array(
        &mut self,
        model: &Arc<Model>,
        array: &Arc<ModelArray>,
        filter: CollectionFilter,
        start: ObjectCollection,
        provider: &dyn DataProvider,
    ) -> Result<InstanceRef> {
        let started = Instant::now();
        log_op_start!("load_collection", model.name());
        let result = async {
            let document = provider.load_collection(model.name(), &filter).await?;
            self.import_array_with_start(&JsonInterfacer, &document, array, &stored_options(), start)
                .await
        }
        .await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => log_op_end!("load_collection", model.name(), duration_ms),
            Err(err) => log_op_error!("load_collection", model.name(), err, duration_ms),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MemoryDataProvider, MemoryManifestProvider, ProviderError};
    use async_trait::async_trait;
    use serde_json::{json, Value as JsonValue};

    fn manifests() -> MemoryManifestProvider {
        MemoryManifestProvider::new()
            .with_manifest(
                "Mother",
                json!({
                    "version": "3.0",
                    "is_main": true,
                    "serialization": {"unit": "mother"},
                    "properties": [
                        {"inheritance-": "Integer", "name": "id", "is_id": true},
                        {"inheritance-": "String", "name": "name"},
                        {"inheritance-": "Aggregation", "name": "children", "aggregations": ["mother"],
                         "values": {"inheritance-": "Object", "name": "child", "model": "Child"}}
                    ]
                }),
            )
            .with_manifest(
                "Child",
                json!({
                    "version": "3.0",
                    "serialization": {"unit": "child"},
                    "properties": [
                        {"inheritance-": "Integer", "name": "id", "is_id": true},
                        {"inheritance-": "Object", "name": "mother", "model": "Mother", "is_foreign": true}
                    ]
                }),
            )
    }

    async fn comhon() -> (Comhon, Arc<Model>) {
        let comhon = Comhon::new(Arc::new(manifests()));
        let mother = comhon.load_model("Mother").await.unwrap();
        (comhon, mother)
    }

    struct Unavailable;

    #[async_trait]
    impl DataProvider for Unavailable {
        async fn load_by_id(&self, _model: &str, _id: &str) -> std::result::Result<JsonValue, ProviderError> {
            Err(ProviderError::other(503, "down"))
        }

        async fn load_collection(
            &self,
            _model: &str,
            _filter: &CollectionFilter,
        ) -> std::result::Result<JsonValue, ProviderError> {
            Err(ProviderError::other(503, "down"))
        }
    }

    #[tokio::test]
    async fn test_load_object_fills_without_flagging() {
        let (mut comhon, mother) = comhon().await;
        let data = MemoryDataProvider::new();
        data.insert("Mother", "10", json!({"id": 10, "name": "Ada"}));

        let handle = comhon.new_object(&mother).unwrap();
        comhon.set_value(handle, "id", 10i64).unwrap();
        comhon.reset_updated_status(handle, false).unwrap();
        assert!(comhon.load_object(handle, &data).await.unwrap());
        assert_eq!(comhon.get_value(handle, "name").unwrap(), Some(&Value::from("Ada")));
        assert!(comhon.is_loaded(handle).unwrap());
        assert!(!comhon.is_value_updated(handle, "name").unwrap());

        let missing = comhon.new_object(&mother).unwrap();
        comhon.set_value(missing, "id", 11i64).unwrap();
        assert!(!comhon.load_object(missing, &data).await.unwrap());
        assert!(!comhon.is_loaded(missing).unwrap());
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let (mut comhon, mother) = comhon().await;
        let handle = comhon.new_object(&mother).unwrap();
        comhon.set_value(handle, "id", 10i64).unwrap();
        let err = comhon.load_object(handle, &Unavailable).await.unwrap_err();
        assert!(matches!(err, ComhonError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_load_aggregation_links_back_to_owner() {
        let (mut comhon, mother) = comhon().await;
        let data = MemoryDataProvider::new();
        data.insert("Child", "1", json!({"id": 1, "mother": 10}));
        data.insert("Child", "2", json!({"id": 2, "mother": 12}));
        data.insert("Child", "3", json!({"id": 3, "mother": 10}));

        let handle = comhon.new_object(&mother).unwrap();
        comhon.set_value(handle, "id", 10i64).unwrap();
        let children = comhon.load_aggregation(handle, "children", &data).await.unwrap();
        let array = comhon.arena().array(children).unwrap();
        assert_eq!(array.len(), 2);
        let first = array.get(0).and_then(Value::as_object).unwrap();
        assert_eq!(
            comhon.get_value(first, "mother").unwrap().and_then(Value::as_object),
            Some(handle)
        );
    }

    #[tokio::test]
    async fn test_load_collection_reads_every_object() {
        let (mut comhon, _) = comhon().await;
        let child = comhon.registry().get("Child");
        let data = MemoryDataProvider::new();
        data.insert("Child", "1", json!({"id": 1}));
        data.insert("Child", "2", json!({"id": 2}));
        let all = comhon.load_collection(&child, &data).await.unwrap();
        assert_eq!(comhon.arena().array(all).unwrap().len(), 2);

        let err = comhon.load_aggregation(all, "children", &data).await.unwrap_err();
        assert!(matches!(err, ComhonError::InvalidInstance { .. }));
    }
}
