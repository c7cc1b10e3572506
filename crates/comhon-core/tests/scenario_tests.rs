//! Scenario Tests
//!
//! ## Scenarios Covered
//!
//! A. Objects of an abstract model can be built but never loaded
//! B. An imported object exposes its id and is valid
//! C. A list cannot be imported as an associative array
//! D. Conflicting properties fail validation
//! E. A property set without its dependency fails validation

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use comhon_core::{ComhonError, ExErrorKind, InterfacerOptions, JsonInterfacer, Value};
use serde_json::json;

#[tokio::test]
async fn test_scenario_a_abstract_object_cannot_be_loaded() {
    let mut comhon = common::comhon();
    let shape = common::load(&comhon, "Test\\Shape").await;

    let handle = comhon.new_object(&shape).unwrap();
    comhon.set_value(handle, "id", Value::Index(4)).unwrap();

    let err = comhon.set_is_loaded(handle, true).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::AbstractObject);
    assert!(!comhon.is_loaded(handle).unwrap());
}

#[tokio::test]
async fn test_scenario_b_imported_object_is_valid() {
    let mut comhon = common::comhon();
    let adult = common::load(&comhon, "Test\\Adult").await;

    let handle = comhon
        .import_object(&JsonInterfacer, &json!({"id": 5, "age": 30}), &adult, &InterfacerOptions::default())
        .await
        .unwrap();

    assert_eq!(comhon.get_id(handle).unwrap(), Some(Value::Integer(5)));
    assert!(comhon.is_valid(handle));
    assert!(comhon.is_loaded(handle).unwrap());
}

#[tokio::test]
async fn test_scenario_b_missing_required_value_is_reported() {
    let mut comhon = common::comhon();
    let adult = common::load(&comhon, "Test\\Adult").await;

    let err = comhon
        .import_object(&JsonInterfacer, &json!({"id": 5}), &adult, &InterfacerOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MissingRequired);

    let lenient = InterfacerOptions::default().with_validate(false);
    let handle = comhon
        .import_object(&JsonInterfacer, &json!({"id": 5}), &adult, &lenient)
        .await
        .unwrap();
    assert!(!comhon.is_valid(handle));
}

#[tokio::test]
async fn test_scenario_c_list_is_not_an_associative_array() {
    let mut comhon = common::comhon();
    let holder = common::load(&comhon, "Test\\Holder").await;
    let scores = holder.property("scores").unwrap().model().as_array().unwrap().clone();

    let err = comhon
        .import_array(&JsonInterfacer, &json!([1, 2, 3]), &scores, &InterfacerOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ArrayShape);

    let handle = comhon
        .import_array(&JsonInterfacer, &json!({"a": 1, "b": 2}), &scores, &InterfacerOptions::default())
        .await
        .unwrap();
    let array = comhon.arena().array(handle).unwrap();
    assert_eq!(array.get_key("b"), Some(&Value::Integer(2)));
}

#[tokio::test]
async fn test_scenario_d_conflicting_properties() {
    let mut comhon = common::comhon();
    let exclusive = common::load(&comhon, "Test\\Exclusive").await;

    let handle = comhon.new_object(&exclusive).unwrap();
    comhon.set_value(handle, "a", "x").unwrap();
    comhon.set_value(handle, "b", "y").unwrap();

    let err = comhon.validate(handle).unwrap_err();
    match err.root_cause() {
        ComhonError::Conflict { property, other, .. } => {
            let mut pair = [property.as_str(), other.as_str()];
            pair.sort_unstable();
            assert_eq!(pair, ["a", "b"]);
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_scenario_e_missing_dependency() {
    let mut comhon = common::comhon();
    let exclusive = common::load(&comhon, "Test\\Exclusive").await;

    let handle = comhon.new_object(&exclusive).unwrap();
    comhon.set_value(handle, "c", "z").unwrap();

    let err = comhon.validate(handle).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ComhonError::Dependency { property, dependency, .. } if property == "c" && dependency == "b"
    ));

    comhon.set_value(handle, "b", "y").unwrap();
    assert!(comhon.is_valid(handle));
}
