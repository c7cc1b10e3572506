//! Memoized named regular expressions
//!
//! Manifests may reference a regular expression by name. Each name is
//! fetched once from the manifest provider; concurrent lookups of the same
//! name share one fetch.

use crate::errors::{ComhonError, Result};
use crate::provider::ManifestProvider;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

#[derive(Default)]
pub struct PatternCache {
    slots: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the expression registered under `name`
    ///
    /// # Errors
    ///
    /// Returns a provider error if the pattern cannot be fetched. A failed
    /// fetch is not memoized.
    pub async fn resolve(&self, name: &str, provider: &dyn ManifestProvider) -> Result<String> {
        let slot = {
            let mut slots = self.slots.lock();
            slots
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let pattern = slot
            .get_or_try_init(|| async {
                tracing::debug!(pattern = name, "fetching regex pattern");
                provider
                    .fetch_pattern(name)
                    .await
                    .map_err(ComhonError::from)
            })
            .await?;
        Ok(pattern.clone())
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }
}

impl std::fmt::Debug for PatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternCache")
            .field("patterns", &self.slots.lock().len())
            .finish()
    }
}
