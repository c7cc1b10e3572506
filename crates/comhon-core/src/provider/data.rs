use super::{ProviderError, ProviderStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Selection of serialized objects returned by [`DataProvider::load_collection`]
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionFilter {
    /// Every stored object of the model
    All,
    /// Objects referencing `id` through any of `properties`
    Reference { properties: Vec<String>, id: String },
}

/// Source of serialized objects for requestable models
///
/// Objects are exchanged as JSON documents in private context.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Serialized object of `model` with identity `id`
    async fn load_by_id(&self, model: &str, id: &str) -> Result<JsonValue, ProviderError>;

    /// JSON array of serialized objects of `model` selected by `filter`
    async fn load_collection(
        &self,
        model: &str,
        filter: &CollectionFilter,
    ) -> Result<JsonValue, ProviderError>;
}

/// In-memory data provider keyed by model name
#[derive(Debug, Default)]
pub struct MemoryDataProvider {
    objects: Mutex<HashMap<String, Vec<(String, JsonValue)>>>,
}

impl MemoryDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `object` under `model` and `id`
    pub fn insert(&self, model: impl Into<String>, id: impl Into<String>, object: JsonValue) {
        self.objects
            .lock()
            .entry(model.into())
            .or_default()
            .push((id.into(), object));
    }

    fn references(value: &JsonValue, id: &str) -> bool {
        match value {
            JsonValue::String(s) => s == id,
            JsonValue::Number(n) => n.to_string() == id,
            JsonValue::Object(map) => map.get("id").is_some_and(|v| Self::references(v, id)),
            _ => false,
        }
    }
}

#[async_trait]
impl DataProvider for MemoryDataProvider {
    async fn load_by_id(&self, model: &str, id: &str) -> Result<JsonValue, ProviderError> {
        self.objects
            .lock()
            .get(model)
            .and_then(|objects| objects.iter().find(|(key, _)| key == id))
            .map(|(_, object)| object.clone())
            .ok_or_else(|| ProviderError {
                status: ProviderStatus::NotFound,
                message: format!("{} {} not found", model, id),
            })
    }

    async fn load_collection(
        &self,
        model: &str,
        filter: &CollectionFilter,
    ) -> Result<JsonValue, ProviderError> {
        let objects = self.objects.lock();
        let selected = objects
            .get(model)
            .map(|objects| {
                objects
                    .iter()
                    .map(|(_, object)| object)
                    .filter(|object| match filter {
                        CollectionFilter::All => true,
                        CollectionFilter::Reference { properties, id } => properties
                            .iter()
                            .any(|p| object.get(p).is_some_and(|v| Self::references(v, id))),
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(JsonValue::Array(selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_reference_filter_matches_scalar_and_tagged_ids() {
        let provider = MemoryDataProvider::new();
        provider.insert("Child", "1", json!({"id": 1, "mother": 10}));
        provider.insert("Child", "2", json!({"id": 2, "father": {"id": 10, "inheritance-": "Man"}}));
        provider.insert("Child", "3", json!({"id": 3, "mother": 11}));

        let filter = CollectionFilter::Reference {
            properties: vec!["mother".to_string(), "father".to_string()],
            id: "10".to_string(),
        };
        let loaded = provider.load_collection("Child", &filter).await.unwrap();
        assert_eq!(loaded.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let provider = MemoryDataProvider::new();
        let err = provider.load_by_id("Child", "1").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
