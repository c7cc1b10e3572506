//! Export of instances to wire documents
//!
//! Objects owned by the exported graph are written inline, objects held
//! through foreign values are written as their id. An inline object is
//! tagged with its model name when it is more specific than the model its
//! property declares.

use crate::collection::ObjectCollectionInterfacer;
use crate::context::Comhon;
use crate::errors::{ComhonError, Result, ResultExt};
use crate::import::FOREIGN_ID_KEY;
use crate::interfacer::{InterfacedValue, Interfacer, InterfacerOptions, Scalar};
use crate::manifest::INHERITANCE_KEY;
use crate::model::{Model, ModelArray, ModelType, Property};
use crate::object::encode_id;
use crate::value::{InstanceRef, Value};
use crate::visitor::{walk, ObjectFinder, WalkOptions};
use crate::{log_op_end, log_op_error, log_op_start};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Node name of an exported root array
pub const ROOT_ARRAY_NAME: &str = "root";

impl Comhon {
    /// Write the object `handle` and everything it owns
    ///
    /// # Errors
    ///
    /// Returns `SelfContainment` when an object contains itself,
    /// `DuplicateIdentity` when two instances share one identity,
    /// `IncompleteForeignId` and `PrivateIdExposure` for references that
    /// cannot be written, and `DanglingReference` when references are
    /// verified and not written inline.
    pub fn export_object<I: Interfacer>(
        &self,
        handle: InstanceRef,
        interfacer: &I,
        options: &InterfacerOptions,
    ) -> Result<I::Node> {
        let model = self.arena.object(handle)?.model().clone();
        self.logged_export(model.name(), interfacer.format().as_str(), || {
            let mut exporter = Exporter::new(self, interfacer, options);
            let mut node = exporter.write_object(handle, None, model.short_name(), true)?;
            if options.flatten_values {
                for (name, property) in model.properties()? {
                    if !property.model().is_simple() && !property.is_foreign() {
                        interfacer.flatten_node(&mut node, name)?;
                    }
                }
            }
            exporter.finish(node, handle)
        })
    }

    /// Write the array `handle` and everything it owns
    ///
    /// # Errors
    ///
    /// See [`Comhon::export_object`].
    pub fn export_array<I: Interfacer>(
        &self,
        handle: InstanceRef,
        interfacer: &I,
        options: &InterfacerOptions,
    ) -> Result<I::Node> {
        let model = self.arena.array(handle)?.model().clone();
        self.logged_export(&model.name(), interfacer.format().as_str(), || {
            let mut exporter = Exporter::new(self, interfacer, options);
            let node = exporter.write_array(&model, handle, ROOT_ARRAY_NAME, false)?;
            exporter.finish(node, handle)
        })
    }

    fn logged_export<N>(&self, model: &str, format: &str, export: impl FnOnce() -> Result<N>) -> Result<N> {
        let start = Instant::now();
        log_op_start!("export", model, format = format);
        let result = export();
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => log_op_end!("export", model, duration_ms),
            Err(err) => log_op_error!("export", model, err, duration_ms),
        }
        result
    }
}

struct Exporter<'a, I: Interfacer> {
    comhon: &'a Comhon,
    interfacer: &'a I,
    options: &'a InterfacerOptions,
    scope: ObjectCollectionInterfacer,
    outer: Vec<ObjectCollectionInterfacer>,
    visiting: HashSet<InstanceRef>,
}

impl<'a, I: Interfacer> Exporter<'a, I> {
    fn new(comhon: &'a Comhon, interfacer: &'a I, options: &'a InterfacerOptions) -> Self {
        Self {
            comhon,
            interfacer,
            options,
            scope: ObjectCollectionInterfacer::new(),
            outer: Vec::new(),
            visiting: HashSet::new(),
        }
    }

    fn finish(self, mut node: I::Node, root: InstanceRef) -> Result<I::Node> {
        if self.options.verify_references {
            self.verify_scope(&self.scope, root)?;
        }
        self.interfacer.finalize_export(&mut node);
        Ok(node)
    }

    fn push_scope(&mut self) {
        let outer = std::mem::take(&mut self.scope);
        self.outer.push(outer);
    }

    fn pop_scope(&mut self) -> ObjectCollectionInterfacer {
        let outer = self.outer.pop().unwrap_or_default();
        std::mem::replace(&mut self.scope, outer)
    }

    /// Every reference written in `scope` must be written inline too
    fn verify_scope(&self, scope: &ObjectCollectionInterfacer, root: InstanceRef) -> Result<()> {
        for (_, id, handle) in scope.unresolved_foreign() {
            let model = self.comhon.arena.object(handle)?.model().clone();
            if model.is_requestable() {
                continue;
            }
            let mut finder = ObjectFinder::new(&model, &id);
            walk(&self.comhon.arena, root, WalkOptions::default(), &mut finder)?;
            if finder.found().is_none() {
                return Err(ComhonError::DanglingReference {
                    model: model.name().to_string(),
                    id,
                });
            }
        }
        Ok(())
    }

    fn skips(&self, handle: InstanceRef, name: &str, property: &Property, root: bool) -> Result<bool> {
        if property.is_private() && !self.options.private {
            return Ok(true);
        }
        if property.is_id() {
            return Ok(false);
        }
        if let (true, Some(filter)) = (root, &self.options.property_filter) {
            if !filter.iter().any(|kept| kept == name) {
                return Ok(true);
            }
        }
        if self.options.only_updated_values {
            return Ok(!self.comhon.arena.is_value_updated(handle, name)?);
        }
        Ok(false)
    }

    fn write_object(
        &mut self,
        handle: InstanceRef,
        declared: Option<&Model>,
        name: &str,
        root: bool,
    ) -> Result<I::Node> {
        let comhon = self.comhon;
        let object = comhon.arena.object(handle)?;
        let model = object.model().clone();
        let key = object.id_key();
        if self.visiting.contains(&handle) {
            return Err(ComhonError::SelfContainment {
                model: model.name().to_string(),
                id: key,
            });
        }

        let mut node = self.interfacer.create_node(name);
        if declared.is_some_and(|declared| declared.name() != model.name()) {
            let tag = InterfacedValue::Scalar(Scalar::String(model.name().to_string()));
            self.interfacer.set_value(&mut node, INHERITANCE_KEY, tag, false);
        }
        if let Some(key) = &key {
            self.scope.add_new_object(&model, key, handle)?;
        }

        self.visiting.insert(handle);
        for (name, property) in model.properties()? {
            let Some(value) = object.value(name) else {
                continue;
            };
            if self.skips(handle, name, property, root)? {
                continue;
            }
            let exported = self.export_property(property, value).at(name)?;
            self.interfacer
                .set_value(&mut node, name, exported, property.is_interfaced_as_node());
        }
        self.visiting.remove(&handle);
        Ok(node)
    }

    fn write_array(
        &mut self,
        model: &Arc<ModelArray>,
        handle: InstanceRef,
        name: &str,
        foreign: bool,
    ) -> Result<I::Node> {
        let comhon = self.comhon;
        let array = comhon.arena.array(handle)?;
        let element_name = model.element_name();
        let mut node = self.interfacer.create_array_node(name, model.is_associative());
        for (index, (key, value)) in array.values().entries().into_iter().enumerate() {
            let segment = key.map(str::to_string).unwrap_or_else(|| index.to_string());
            let exported = if model.is_isolated_element() {
                self.push_scope();
                let exported = self.export_value(model.element(), value, element_name, foreign);
                let scope = self.pop_scope();
                let exported = exported.at(&segment)?;
                if let (true, Some(root)) = (self.options.verify_references, value.as_instance()) {
                    self.verify_scope(&scope, root).at(&segment)?;
                }
                exported
            } else {
                self.export_value(model.element(), value, element_name, foreign)
                    .at(&segment)?
            };
            match key {
                Some(key) => self
                    .interfacer
                    .add_associative_value(&mut node, key, exported, element_name),
                None => self.interfacer.add_value(&mut node, exported, element_name),
            }
        }
        Ok(node)
    }

    fn export_property(&mut self, property: &Property, value: &Value) -> Result<InterfacedValue<I::Node>> {
        if !property.is_isolated() {
            return self.export_value(property.model(), value, property.name(), false);
        }
        self.push_scope();
        let exported = self.export_value(property.model(), value, property.name(), false);
        let scope = self.pop_scope();
        let exported = exported?;
        if let (true, Some(root)) = (self.options.verify_references, value.as_instance()) {
            self.verify_scope(&scope, root)?;
        }
        Ok(exported)
    }

    fn export_value(
        &mut self,
        model: &ModelType,
        value: &Value,
        name: &str,
        foreign: bool,
    ) -> Result<InterfacedValue<I::Node>> {
        match (model, value) {
            (_, Value::Null) => Ok(InterfacedValue::Null),
            (ModelType::Simple(kind), value) => kind
                .export_value(value, &self.options.date_time_format)
                .map(InterfacedValue::Scalar),
            (ModelType::Foreign(inner), value) => self.export_value(inner, value, name, true),
            (ModelType::Complex(declared), Value::Object(handle)) if foreign => {
                self.export_foreign(declared, *handle, name)
            }
            (ModelType::Complex(declared), Value::Object(handle)) => self
                .write_object(*handle, Some(declared), name, false)
                .map(InterfacedValue::Node),
            (ModelType::Array(_), Value::Array(handle)) => {
                let array = self.comhon.arena.array(*handle)?.model().clone();
                self.write_array(&array, *handle, name, foreign)
                    .map(InterfacedValue::Node)
            }
            (expected, value) => Err(ComhonError::TypeMismatch {
                expected: expected.name(),
                actual: value.type_name().to_string(),
            }),
        }
    }

    /// Id of a referenced object, tagged when more specific than declared
    fn export_foreign(
        &mut self,
        declared: &Model,
        handle: InstanceRef,
        name: &str,
    ) -> Result<InterfacedValue<I::Node>> {
        let comhon = self.comhon;
        let object = comhon.arena.object(handle)?;
        let model = object.model().clone();
        let incomplete = || ComhonError::IncompleteForeignId {
            model: model.name().to_string(),
        };
        let ids = model.id_properties()?;
        if ids.is_empty() {
            return Err(incomplete());
        }

        let mut values = Vec::with_capacity(ids.len());
        for property in &ids {
            if property.is_private() && !self.options.private {
                return Err(ComhonError::PrivateIdExposure {
                    model: model.name().to_string(),
                    property: property.name().to_string(),
                });
            }
            match object.value(property.name()) {
                Some(value) if !value.is_null() => values.push(value),
                _ => return Err(incomplete()),
            }
        }

        let key = encode_id(&values);
        let scalar = match (values.as_slice(), ids[0].model()) {
            ([single], ModelType::Simple(kind)) => {
                kind.export_value(single, &self.options.date_time_format)?
            }
            _ => Scalar::String(key.clone()),
        };
        self.scope.add_new_foreign_object(&model, &key, handle)?;

        if declared.name() == model.name() {
            return Ok(InterfacedValue::Scalar(scalar));
        }
        let mut node = self.interfacer.create_node(name);
        self.interfacer
            .set_value(&mut node, FOREIGN_ID_KEY, InterfacedValue::Scalar(scalar), false);
        let tag = InterfacedValue::Scalar(Scalar::String(model.name().to_string()));
        self.interfacer.set_value(&mut node, INHERITANCE_KEY, tag, false);
        Ok(InterfacedValue::Node(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::interfacer::{JsonInterfacer, XmlInterfacer};
    use crate::provider::MemoryManifestProvider;
    use serde_json::json;

    async fn comhon() -> (Comhon, Arc<Model>) {
        let provider = MemoryManifestProvider::new()
            .with_manifest(
                "Person",
                json!({
                    "version": "3.0",
                    "properties": [
                        {"inheritance-": "Integer", "name": "id", "is_id": true},
                        {"inheritance-": "String", "name": "name"},
                        {"inheritance-": "String", "name": "secret", "is_private": true},
                        {"inheritance-": "Object", "name": "best_friend", "model": "Person", "is_foreign": true},
                        {"inheritance-": "Array", "name": "children", "values": {"inheritance-": "Object", "name": "child", "model": "Person"}}
                    ]
                }),
            )
            .with_manifest(
                "Man",
                json!({"version": "3.0", "extends": "Person", "share_parent_id": true, "properties": []}),
            );
        let comhon = Comhon::new(Arc::new(provider));
        comhon.load_model("Man").await.unwrap();
        let person = comhon.registry().get("Person");
        (comhon, person)
    }

    #[tokio::test]
    async fn test_export_writes_inline_and_foreign_values() {
        let (mut comhon, person) = comhon().await;
        let man = comhon.registry().get("Man");
        let children = person.property("children").unwrap().model().as_array().unwrap().clone();

        let root = comhon.new_object(&person).unwrap();
        comhon.set_value(root, "id", 1i64).unwrap();
        comhon.set_value(root, "secret", "hidden").unwrap();
        let child = comhon.new_object(&man).unwrap();
        comhon.set_value(child, "id", 2i64).unwrap();
        let list = comhon.new_array(children);
        comhon.push_value(list, Value::Object(child)).unwrap();
        comhon.set_value(root, "children", Value::Array(list)).unwrap();
        comhon.set_value(root, "best_friend", Value::Object(child)).unwrap();

        let node = comhon
            .export_object(root, &JsonInterfacer, &InterfacerOptions::default())
            .unwrap();
        assert_eq!(
            node,
            json!({
                "id": 1,
                "best_friend": {"id": 2, "inheritance-": "Man"},
                "children": [{"inheritance-": "Man", "id": 2}]
            })
        );

        let private = InterfacerOptions::default().with_private(true);
        let node = comhon.export_object(root, &JsonInterfacer, &private).unwrap();
        assert_eq!(node["secret"], json!("hidden"));
    }

    #[tokio::test]
    async fn test_export_rejects_dangling_and_cyclic_graphs() {
        let (mut comhon, person) = comhon().await;
        let root = comhon.new_object(&person).unwrap();
        let friend = comhon.new_object(&person).unwrap();
        comhon.set_value(root, "id", 1i64).unwrap();
        comhon.set_value(friend, "id", 7i64).unwrap();
        comhon.set_value(root, "best_friend", Value::Object(friend)).unwrap();

        let err = comhon
            .export_object(root, &JsonInterfacer, &InterfacerOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::DanglingReference);
        let relaxed = InterfacerOptions::default().with_verify_references(false);
        let node = comhon.export_object(root, &JsonInterfacer, &relaxed).unwrap();
        assert_eq!(node["best_friend"], json!(7));

        let children = person.property("children").unwrap().model().as_array().unwrap().clone();
        let list = comhon.new_array(children);
        comhon.push_value(list, Value::Object(root)).unwrap();
        comhon.set_value(root, "children", Value::Array(list)).unwrap();
        let err = comhon.export_object(root, &JsonInterfacer, &relaxed).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::SelfContainment);
        assert_eq!(err.path(), Some("children.0"));
    }

    #[tokio::test]
    async fn test_export_foreign_without_id_fails() {
        let (mut comhon, person) = comhon().await;
        let root = comhon.new_object(&person).unwrap();
        let friend = comhon.new_object(&person).unwrap();
        comhon.set_value(root, "best_friend", Value::Object(friend)).unwrap();
        let err = comhon
            .export_object(root, &JsonInterfacer, &InterfacerOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::IncompleteForeignId);
        assert_eq!(err.path(), Some("best_friend"));
    }

    #[tokio::test]
    async fn test_export_xml_uses_short_name_and_attributes() {
        let (mut comhon, person) = comhon().await;
        let root = comhon.new_object(&person).unwrap();
        comhon.set_value(root, "id", 3i64).unwrap();
        comhon.set_value(root, "name", "Eve").unwrap();
        let interfacer = XmlInterfacer::new();
        let node = comhon
            .export_object(root, &interfacer, &InterfacerOptions::default())
            .unwrap();
        assert_eq!(node.name, "Person");
        assert_eq!(node.attributes.get("name").map(String::as_str), Some("Eve"));
    }
}
