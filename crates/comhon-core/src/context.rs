//! Application context
//!
//! One [`Comhon`] value owns everything that outlives a single operation:
//! the model registry, the instance arena, the main object cache and the
//! counters of incremental auto values. It is created once at startup and
//! reset explicitly between independent runs.

use crate::collection::MainObjectCollection;
use crate::config::ComhonConfig;
use crate::errors::Result;
use crate::model::Model;
use crate::object::InstanceArena;
use crate::provider::ManifestProvider;
use crate::registry::ModelRegistry;
use std::collections::HashMap;
use std::sync::Arc;

/// Context of every model operation
///
/// Instances live in an arena that only grows: an instance stays allocated
/// until [`Comhon::clear_instances`] or [`Comhon::reset`], even once no
/// value refers to it. Both calls invalidate every handle handed out so far.
pub struct Comhon {
    registry: Arc<ModelRegistry>,
    pub(crate) arena: InstanceArena,
    pub(crate) main: MainObjectCollection,
    pub(crate) auto_counters: HashMap<String, i64>,
}

impl Comhon {
    pub fn new(manifests: Arc<dyn ManifestProvider>) -> Self {
        Self::with_registry(Arc::new(ModelRegistry::new(manifests)))
    }

    /// Context sharing an existing registry
    pub fn with_registry(registry: Arc<ModelRegistry>) -> Self {
        Self {
            registry,
            arena: InstanceArena::new(),
            main: MainObjectCollection::new(),
            auto_counters: HashMap::new(),
        }
    }

    /// Context reading manifests from the directory named by `config`
    pub fn from_config(config: &ComhonConfig) -> Self {
        Self::new(Arc::new(config.manifest_provider()))
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn arena(&self) -> &InstanceArena {
        &self.arena
    }

    pub fn main_objects(&self) -> &MainObjectCollection {
        &self.main
    }

    /// Load `name` together with every model its values may hold
    ///
    /// # Errors
    ///
    /// Returns the first loading error, see [`ModelRegistry::load`].
    pub async fn load_model(&self, name: &str) -> Result<Arc<Model>> {
        self.registry.load_deep(name).await
    }

    /// Drop every instance and the main cache, keeping the loaded models
    pub fn clear_instances(&mut self) {
        self.arena.clear();
        self.main.clear();
        self.auto_counters.clear();
    }

    /// Drop every instance, the main cache and the loaded models
    pub fn reset(&mut self) {
        self.clear_instances();
        self.registry.clear();
    }
}

impl std::fmt::Debug for Comhon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comhon")
            .field("registry", &self.registry)
            .field("instances", &self.arena.len())
            .field("main_objects", &self.main.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryManifestProvider;
    use serde_json::json;

    fn comhon() -> Comhon {
        Comhon::new(Arc::new(MemoryManifestProvider::new().with_manifest(
            "Test\\City",
            json!({
                "version": "3.0",
                "is_main": true,
                "properties": [{"inheritance-": "Integer", "name": "id", "is_id": true}]
            }),
        )))
    }

    #[tokio::test]
    async fn test_clear_instances_keeps_models() {
        let mut comhon = comhon();
        let city = comhon.load_model("Test\\City").await.unwrap();
        let lyon = comhon.new_object(&city).unwrap();
        comhon.set_value(lyon, "id", 69i64).unwrap();
        assert_eq!(comhon.arena().len(), 1);

        comhon.clear_instances();
        assert!(comhon.arena().is_empty());
        assert!(comhon.main_objects().is_empty());
        assert!(comhon.registry().is_loaded("Test\\City"));

        let again = comhon.new_object(&city).unwrap();
        comhon.set_value(again, "id", 69i64).unwrap();
        assert_eq!(comhon.main_objects().get(&city, "69"), Some(again));
    }

    #[tokio::test]
    async fn test_reset_unloads_models() {
        let mut comhon = comhon();
        let city = comhon.load_model("Test\\City").await.unwrap();
        comhon.new_object(&city).unwrap();

        comhon.reset();
        assert!(comhon.arena().is_empty());
        assert!(!comhon.registry().is_loaded("Test\\City"));
    }
}
