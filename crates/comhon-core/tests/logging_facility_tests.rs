//! Logging Facility Tests
//!
//! Operations on models emit start and end events naming the model, and
//! failures carry the kind of their error.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use comhon_core::logging_facility::init_test_capture;
use comhon_core::{InterfacerOptions, JsonInterfacer};
use comhon_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use serde_json::json;

#[tokio::test]
async fn test_model_load_is_logged() {
    let capture = init_test_capture();
    let comhon = common::comhon();

    common::load(&comhon, "Test\\Town").await;
    common::load(&comhon, "Test\\Town").await;

    assert!(!capture.events_for("load_model", EVENT_END, "Test\\Town").is_empty());
    capture.assert_event_exists("load_model", EVENT_START);
}

#[tokio::test]
async fn test_import_and_export_are_logged() {
    let capture = init_test_capture();
    let mut comhon = common::comhon();
    let exclusive = common::load(&comhon, "Test\\Exclusive").await;

    let handle = comhon
        .import_object(&JsonInterfacer, &json!({"a": "x"}), &exclusive, &InterfacerOptions::default())
        .await
        .unwrap();
    comhon
        .export_object(handle, &JsonInterfacer, &InterfacerOptions::default())
        .unwrap();

    let imports = capture.events_for("import", EVENT_START, "Test\\Exclusive");
    assert!(imports.iter().any(|e| e.field("format") == Some("json")));
    for op in ["import", "export"] {
        let ends = capture.events_for(op, EVENT_END, "Test\\Exclusive");
        assert!(!ends.is_empty(), "no end event for {op}");
        assert!(ends.iter().all(|e| e.field("duration_ms").is_some()));
    }
}

#[tokio::test]
async fn test_failed_validation_logs_error_kind() {
    let capture = init_test_capture();
    let mut comhon = common::comhon();
    let exclusive = common::load(&comhon, "Test\\Exclusive").await;

    let handle = comhon.new_object(&exclusive).unwrap();
    comhon.set_value(handle, "a", "x").unwrap();
    comhon.set_value(handle, "b", "y").unwrap();
    assert!(comhon.validate(handle).is_err());

    let errors = capture.events_for("validate", EVENT_END_ERROR, "Test\\Exclusive");
    assert!(errors
        .iter()
        .any(|e| e.field("err_kind") == Some("Conflict") && e.field("err_code") == Some("ERR_CONFLICT")));
}
