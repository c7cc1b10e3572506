//! Identity maps
//!
//! Objects are partitioned by the key name of their model: the shared id
//! model when one is declared, the model itself otherwise. A partition
//! holds at most one instance per id.

mod interfacer;

pub use interfacer::ObjectCollectionInterfacer;

use crate::errors::{ComhonError, Result};
use crate::model::Model;
use crate::value::InstanceRef;
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct ObjectCollection {
    partitions: HashMap<String, HashMap<String, InstanceRef>>,
}

impl ObjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition key of `model`
    pub fn model_key(model: &Model) -> &str {
        model.key_name()
    }

    /// Register `handle` as the object of `model` with identity `id`
    ///
    /// Adding the instance already registered under that key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if another instance holds the key.
    pub fn add(&mut self, model: &Model, id: &str, handle: InstanceRef) -> Result<()> {
        let partition = self
            .partitions
            .entry(Self::model_key(model).to_string())
            .or_default();
        match partition.get(id) {
            Some(existing) if *existing != handle => {
                tracing::debug!(model = model.name(), id, "identity collision");
                Err(ComhonError::DuplicateIdentity {
                    model: model.name().to_string(),
                    id: id.to_string(),
                })
            }
            Some(_) => Ok(()),
            None => {
                partition.insert(id.to_string(), handle);
                Ok(())
            }
        }
    }

    /// Remove the entry of `model` and `id` if it holds `handle`
    pub fn remove(&mut self, model: &Model, id: &str, handle: InstanceRef) -> bool {
        let Some(partition) = self.partitions.get_mut(Self::model_key(model)) else {
            return false;
        };
        if partition.get(id) == Some(&handle) {
            partition.remove(id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, model: &Model, id: &str) -> Option<InstanceRef> {
        self.partitions
            .get(Self::model_key(model))
            .and_then(|partition| partition.get(id))
            .copied()
    }

    pub fn contains(&self, model: &Model, id: &str) -> bool {
        self.get(model, id).is_some()
    }

    /// Whether `handle` is the instance registered for `model` and `id`
    pub fn holds(&self, model: &Model, id: &str, handle: InstanceRef) -> bool {
        self.get(model, id) == Some(handle)
    }

    pub fn len(&self) -> usize {
        self.partitions.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry as (partition, id, handle)
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, InstanceRef)> {
        self.partitions.iter().flat_map(|(partition, objects)| {
            objects
                .iter()
                .map(move |(id, handle)| (partition.as_str(), id.as_str(), *handle))
        })
    }

    pub fn clear(&mut self) {
        self.partitions.clear();
    }
}

/// Application-wide cache of objects of main models
#[derive(Debug, Default, Clone)]
pub struct MainObjectCollection {
    objects: ObjectCollection,
}

impl MainObjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `NotMainModel` for models not flagged main, and
    /// `DuplicateIdentity` if another instance holds the key.
    pub fn add(&mut self, model: &Model, id: &str, handle: InstanceRef) -> Result<()> {
        if !model.is_main() {
            return Err(ComhonError::NotMainModel {
                model: model.name().to_string(),
            });
        }
        self.objects.add(model, id, handle)
    }

    pub fn remove(&mut self, model: &Model, id: &str, handle: InstanceRef) -> bool {
        self.objects.remove(model, id, handle)
    }

    pub fn get(&self, model: &Model, id: &str) -> Option<InstanceRef> {
        self.objects.get(model, id)
    }

    pub fn holds(&self, model: &Model, id: &str, handle: InstanceRef) -> bool {
        self.objects.holds(model, id, handle)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestVersion;
    use crate::model::ModelDefinition;
    use std::sync::Arc;

    fn model(name: &str, is_main: bool, shared: Option<Arc<Model>>) -> Arc<Model> {
        let model = Arc::new(Model::new(name));
        model
            .publish(ModelDefinition {
                version: ManifestVersion::V3,
                parents: shared.iter().cloned().collect(),
                properties: Default::default(),
                is_abstract: false,
                is_main,
                shared_id_model: shared,
                conflicts: HashMap::new(),
                serialization: None,
            })
            .unwrap();
        model
    }

    #[test]
    fn test_same_instance_is_a_no_op() {
        let person = model("Person", false, None);
        let mut collection = ObjectCollection::new();
        collection.add(&person, "1", InstanceRef(0)).unwrap();
        collection.add(&person, "1", InstanceRef(0)).unwrap();
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_distinct_instance_same_key_fails() {
        let person = model("Person", false, None);
        let man = model("Man", false, Some(person.clone()));
        let mut collection = ObjectCollection::new();
        collection.add(&person, "1", InstanceRef(0)).unwrap();
        let err = collection.add(&man, "1", InstanceRef(1)).unwrap_err();
        assert!(matches!(err, ComhonError::DuplicateIdentity { .. }));
        assert_eq!(collection.get(&man, "1"), Some(InstanceRef(0)));
    }

    #[test]
    fn test_remove_checks_handle() {
        let person = model("Person", false, None);
        let mut collection = ObjectCollection::new();
        collection.add(&person, "1", InstanceRef(0)).unwrap();
        assert!(!collection.remove(&person, "1", InstanceRef(1)));
        assert!(collection.remove(&person, "1", InstanceRef(0)));
        assert!(collection.is_empty());
    }

    #[test]
    fn test_main_collection_requires_main_model() {
        let person = model("Person", false, None);
        let mut main = MainObjectCollection::new();
        assert!(matches!(
            main.add(&person, "1", InstanceRef(0)),
            Err(ComhonError::NotMainModel { .. })
        ));
        let town = model("Town", true, None);
        main.add(&town, "1", InstanceRef(0)).unwrap();
        assert!(main.holds(&town, "1", InstanceRef(0)));
    }
}
