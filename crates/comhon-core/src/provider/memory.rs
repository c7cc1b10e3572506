use super::{ManifestProvider, ProviderError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Inner {
    manifests: HashMap<String, serde_json::Value>,
    patterns: HashMap<String, String>,
    manifest_fetches: HashMap<String, usize>,
    pattern_fetches: HashMap<String, usize>,
}

/// In-memory manifest provider
///
/// Counts fetches per name so that callers can observe memoization.
#[derive(Debug, Default)]
pub struct MemoryManifestProvider {
    inner: Mutex<Inner>,
}

impl MemoryManifestProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_manifest(&self, model: impl Into<String>, manifest: serde_json::Value) {
        self.inner.lock().manifests.insert(model.into(), manifest);
    }

    pub fn with_manifest(self, model: impl Into<String>, manifest: serde_json::Value) -> Self {
        self.insert_manifest(model, manifest);
        self
    }

    pub fn insert_pattern(&self, name: impl Into<String>, pattern: impl Into<String>) {
        self.inner.lock().patterns.insert(name.into(), pattern.into());
    }

    pub fn manifest_fetch_count(&self, model: &str) -> usize {
        self.inner
            .lock()
            .manifest_fetches
            .get(model)
            .copied()
            .unwrap_or(0)
    }

    pub fn pattern_fetch_count(&self, name: &str) -> usize {
        self.inner
            .lock()
            .pattern_fetches
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ManifestProvider for MemoryManifestProvider {
    async fn fetch_manifest(&self, model: &str) -> Result<serde_json::Value, ProviderError> {
        let mut inner = self.inner.lock();
        *inner.manifest_fetches.entry(model.to_string()).or_default() += 1;
        inner
            .manifests
            .get(model)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(format!("no manifest for {}", model)))
    }

    async fn fetch_pattern(&self, name: &str) -> Result<String, ProviderError> {
        let mut inner = self.inner.lock();
        *inner.pattern_fetches.entry(name.to_string()).or_default() += 1;
        inner
            .patterns
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(format!("no pattern named {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_counts_every_call() {
        let provider = MemoryManifestProvider::new().with_manifest("A", json!({"version": "3.0"}));
        provider.fetch_manifest("A").await.unwrap();
        provider.fetch_manifest("A").await.unwrap();
        assert!(provider.fetch_manifest("B").await.unwrap_err().is_not_found());
        assert_eq!(provider.manifest_fetch_count("A"), 2);
        assert_eq!(provider.manifest_fetch_count("B"), 1);
    }
}
