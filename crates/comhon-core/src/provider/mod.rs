//! External collaborators
//!
//! A [`ManifestProvider`] resolves manifest documents and named regular
//! expressions. A [`DataProvider`] resolves serialized objects for the
//! requestable models. Both are asynchronous and shared by reference.

pub mod data;
pub mod fs;
pub mod memory;

pub use data::{CollectionFilter, DataProvider, MemoryDataProvider};
pub use fs::FsManifestProvider;
pub use memory::MemoryManifestProvider;

use crate::errors::ComhonError;
use async_trait::async_trait;
use std::fmt;

/// Outcome classification of a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    NotFound,
    Unauthorized,
    Other(u16),
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderStatus::NotFound => write!(f, "not found"),
            ProviderStatus::Unauthorized => write!(f, "unauthorized"),
            ProviderStatus::Other(code) => write!(f, "status {}", code),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    pub status: ProviderStatus,
    pub message: String,
}

impl ProviderError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: ProviderStatus::NotFound,
            message: message.into(),
        }
    }

    pub fn other(code: u16, message: impl Into<String>) -> Self {
        Self {
            status: ProviderStatus::Other(code),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == ProviderStatus::NotFound
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for ComhonError {
    fn from(err: ProviderError) -> Self {
        ComhonError::Provider {
            status: err.status,
            message: err.message,
        }
    }
}

/// Source of manifest documents and named regex patterns
#[async_trait]
pub trait ManifestProvider: Send + Sync {
    /// Fetch the manifest document of `model`
    async fn fetch_manifest(&self, model: &str) -> Result<serde_json::Value, ProviderError>;

    /// Fetch the regular expression registered under `name`
    async fn fetch_pattern(&self, name: &str) -> Result<String, ProviderError>;
}
