use comhon_core::provider::MemoryManifestProvider;
use comhon_core::{Comhon, Model};
use serde_json::json;
use std::sync::Arc;

/// Manifest provider holding every model used by the integration tests
#[allow(dead_code)]
pub fn manifests() -> MemoryManifestProvider {
    MemoryManifestProvider::new()
        .with_manifest(
            "Test\\Person",
            json!({
                "version": "3.0",
                "properties": [
                    {"inheritance-": "Integer", "name": "id", "is_id": true},
                    {"inheritance-": "String", "name": "first_name"},
                    {"inheritance-": "Integer", "name": "age", "interval": "[0,150]"},
                    {"inheritance-": "DateTime", "name": "birth_date"},
                    {"inheritance-": "String", "name": "nickname"},
                    {"inheritance-": "String", "name": "password", "is_private": true},
                    {"inheritance-": "Object", "name": "best_friend", "model": "Test\\Person", "is_foreign": true},
                    {"inheritance-": "Array", "name": "children",
                     "values": {"inheritance-": "Object", "name": "child", "model": "Test\\Person"}}
                ]
            }),
        )
        .with_manifest(
            "Test\\Man",
            json!({"version": "3.0", "extends": "Test\\Person", "share_parent_id": true, "properties": []}),
        )
        .with_manifest(
            "Test\\Secret",
            json!({
                "version": "3.0",
                "properties": [
                    {"inheritance-": "String", "name": "code", "is_id": true, "is_private": true}
                ]
            }),
        )
        .with_manifest(
            "Test\\Holder",
            json!({
                "version": "3.0",
                "properties": [
                    {"inheritance-": "Integer", "name": "id", "is_id": true},
                    {"inheritance-": "Object", "name": "secret", "model": "Test\\Secret", "is_foreign": true},
                    {"inheritance-": "Array", "name": "scores", "is_associative": true, "size": "[0,3]",
                     "values": {"inheritance-": "Integer", "name": "score"}}
                ]
            }),
        )
        .with_manifest(
            "Test\\Town",
            json!({
                "version": "3.0",
                "is_main": true,
                "properties": [
                    {"inheritance-": "Integer", "name": "id", "is_id": true},
                    {"inheritance-": "String", "name": "name", "length": "[1,20]"}
                ]
            }),
        )
        .with_manifest(
            "Test\\Tag",
            json!({
                "version": "3.0",
                "properties": [{"inheritance-": "String", "name": "code", "is_id": true}]
            }),
        )
        .with_manifest(
            "Test\\Place",
            json!({
                "version": "3.0",
                "properties": [
                    {"inheritance-": "String", "name": "city", "is_id": true},
                    {"inheritance-": "Integer", "name": "number", "is_id": true},
                    {"inheritance-": "String", "name": "label"}
                ]
            }),
        )
        .with_manifest(
            "Test\\Label",
            json!({
                "version": "3.0",
                "properties": [
                    {"inheritance-": "Integer", "name": "id", "is_id": true},
                    {"inheritance-": "Object", "name": "tag", "model": "Test\\Tag", "is_foreign": true},
                    {"inheritance-": "Object", "name": "home", "model": "Test\\Place", "is_foreign": true},
                    {"inheritance-": "Array", "name": "places",
                     "values": {"inheritance-": "Object", "name": "place", "model": "Test\\Place"}}
                ]
            }),
        )
        .with_manifest(
            "Test\\Shape",
            json!({
                "version": "3.0",
                "is_abstract": true,
                "properties": [
                    {"inheritance-": "Comhon\\Manifest\\Property\\Index", "name": "id", "is_id": true}
                ]
            }),
        )
        .with_manifest(
            "Test\\Adult",
            json!({
                "version": "3.0",
                "properties": [
                    {"inheritance-": "Integer", "name": "id", "is_id": true},
                    {"inheritance-": "Integer", "name": "age", "is_required": true}
                ]
            }),
        )
        .with_manifest(
            "Test\\Exclusive",
            json!({
                "version": "3.0",
                "conflicts": [["a", "b"]],
                "properties": [
                    {"inheritance-": "String", "name": "a"},
                    {"inheritance-": "String", "name": "b"},
                    {"inheritance-": "String", "name": "c", "depends": ["b"]}
                ]
            }),
        )
}

/// Fresh context over [`manifests`]
#[allow(dead_code)]
pub fn comhon() -> Comhon {
    Comhon::new(Arc::new(manifests()))
}

/// Load `name` and the models its values need
#[allow(dead_code)]
pub async fn load(comhon: &Comhon, name: &str) -> Arc<Model> {
    comhon.load_model(name).await.unwrap()
}
