//! Model Registry Tests
//!
//! ## Scenarios Covered
//!
//! 1. Loading twice reuses the loaded model without fetching again
//! 2. Concurrent loads of one model share a single fetch
//! 3. Inheritance cycles and unknown models fail and leave nothing loaded
//! 4. Filesystem manifests resolve model names to directories

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use comhon_core::provider::{FsManifestProvider, MemoryManifestProvider};
use comhon_core::{Comhon, ExErrorKind, ModelRegistry};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_load_is_idempotent() {
    let manifests = Arc::new(common::manifests());
    let registry = ModelRegistry::new(manifests.clone());

    let first = registry.load("Test\\Town").await.unwrap();
    let second = registry.load("Test\\Town").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(first.is_loaded());
    assert_eq!(manifests.manifest_fetch_count("Test\\Town"), 1);
}

#[tokio::test]
async fn test_concurrent_loads_share_one_fetch() {
    let manifests = Arc::new(common::manifests());
    let comhon = Comhon::new(manifests.clone());

    let (man, person) = tokio::join!(
        comhon.load_model("Test\\Man"),
        comhon.load_model("Test\\Person")
    );
    let man = man.unwrap();
    let person = person.unwrap();

    assert!(man.inherits_from(&person));
    assert_eq!(man.key_name(), person.key_name());
    assert_eq!(manifests.manifest_fetch_count("Test\\Person"), 1);
    assert_eq!(manifests.manifest_fetch_count("Test\\Man"), 1);
}

#[tokio::test]
async fn test_inheritance_cycle_is_rejected() {
    let manifests = MemoryManifestProvider::new()
        .with_manifest("Loop\\A", json!({"version": "3.0", "extends": "Loop\\B", "properties": []}))
        .with_manifest("Loop\\B", json!({"version": "3.0", "extends": "Loop\\A", "properties": []}));
    let registry = ModelRegistry::new(Arc::new(manifests));

    let err = registry.load("Loop\\A").await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InheritanceConflict);
    assert!(!registry.is_loaded("Loop\\A"));
    assert!(!registry.is_loaded("Loop\\B"));
}

#[tokio::test]
async fn test_unknown_model_is_not_found() {
    let registry = ModelRegistry::new(Arc::new(common::manifests()));
    let err = registry.load("Test\\Nobody").await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ModelNotFound);
}

#[tokio::test]
async fn test_filesystem_manifests() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("Shop/Item")).unwrap();
    std::fs::write(
        dir.path().join("Shop/Item/manifest.json"),
        json!({
            "version": "2.0",
            "properties": [
                {"name": "sku", "type": "string", "is_id": true, "pattern": "sku"},
                {"name": "price", "type": "float"}
            ]
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(dir.path().join("patterns.json"), r#"{"sku": "^[A-Z]{3}-\\d+$"}"#).unwrap();

    let provider = FsManifestProvider::new(dir.path()).with_pattern_file("patterns.json");
    let mut comhon = Comhon::new(Arc::new(provider));
    let item = comhon.load_model("Shop\\Item").await.unwrap();
    assert_eq!(item.short_name(), "Item");

    let handle = comhon.new_object(&item).unwrap();
    comhon.set_value(handle, "sku", "ABC-12").unwrap();
    let err = comhon.set_value(handle, "sku", "abc").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ValueValidation);
}
