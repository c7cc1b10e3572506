//! Import of wire documents into instances
//!
//! The asynchronous entry points load every model the document may need
//! (the root model, its value models and the models named by inheritance
//! tags) and then run the importer synchronously over the tree.
//!
//! Objects are deduplicated by identity. A document is read in one scope;
//! isolated values open a nested scope that is closed, and checked for
//! dangling references, once the value is read.

use crate::collection::{ObjectCollection, ObjectCollectionInterfacer};
use crate::context::Comhon;
use crate::errors::{ComhonError, Result, ResultExt};
use crate::interfacer::{InterfacedRef, Interfacer, InterfacerOptions, MergeType, Scalar};
use crate::manifest::INHERITANCE_KEY;
use crate::model::{Model, ModelArray, ModelType, Property, SimpleKind};
use crate::object::{encode_id, decode_id, ArrayValues, ComhonArray, ComhonObject, Instance};
use crate::restriction::{self, Subject};
use crate::value::{InstanceRef, Value};
use crate::visitor::{walk, ObjectFinder, Visit, VisitControl, Visitor, WalkOptions};
use crate::{log_op_end, log_op_error, log_op_start};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Key under which a tagged foreign value carries its id
pub const FOREIGN_ID_KEY: &str = "id";

enum RootTarget {
    New(Arc<Model>),
    Fill(InstanceRef),
    Array(Arc<ModelArray>),
}

impl Comhon {
    /// Import `node` as a new object of `model`, or as the known object
    /// with the same identity
    ///
    /// # Errors
    ///
    /// Returns loading errors for the models involved, and any shape,
    /// type, identity, reference or validation error found in the
    /// document, located by its path.
    pub async fn import_object<I: Interfacer>(
        &mut self,
        interfacer: &I,
        node: &I::Node,
        model: &Arc<Model>,
        options: &InterfacerOptions,
    ) -> Result<InstanceRef> {
        let label = model.name().to_string();
        let target = RootTarget::New(model.clone());
        self.logged_import(interfacer, node, target, options, ObjectCollection::new(), &label)
            .await
    }

    /// Import `node` as a new array of `model`
    ///
    /// # Errors
    ///
    /// See [`Comhon::import_object`].
    pub async fn import_array<I: Interfacer>(
        &mut self,
        interfacer: &I,
        node: &I::Node,
        model: &Arc<ModelArray>,
        options: &InterfacerOptions,
    ) -> Result<InstanceRef> {
        self.import_array_with_start(interfacer, node, model, options, ObjectCollection::new())
            .await
    }

    /// Import an array in which references may resolve to `start`
    pub(crate) async fn import_array_with_start<I: Interfacer>(
        &mut self,
        interfacer: &I,
        node: &I::Node,
        model: &Arc<ModelArray>,
        options: &InterfacerOptions,
        start: ObjectCollection,
    ) -> Result<InstanceRef> {
        let label = model.name();
        let target = RootTarget::Array(model.clone());
        self.logged_import(interfacer, node, target, options, start, &label)
            .await
    }

    /// Fill an existing object from `node`
    ///
    /// Objects already reachable from the object are reused when the
    /// document names them.
    ///
    /// # Errors
    ///
    /// See [`Comhon::import_object`].
    pub async fn fill_object<I: Interfacer>(
        &mut self,
        handle: InstanceRef,
        interfacer: &I,
        node: &I::Node,
        options: &InterfacerOptions,
    ) -> Result<()> {
        let object = self.arena.object(handle)?;
        let before = (object.model.clone(), object.id_key());
        let label = before.0.name().to_string();
        let target = RootTarget::Fill(handle);
        self.logged_import(interfacer, node, target, options, ObjectCollection::new(), &label)
            .await?;

        if let (model, Some(old_key)) = before {
            if self.arena.object(handle)?.id_key().as_deref() != Some(old_key.as_str()) {
                self.main.remove(&model, &old_key, handle);
            }
        }
        Ok(())
    }

    async fn logged_import<I: Interfacer>(
        &mut self,
        interfacer: &I,
        node: &I::Node,
        target: RootTarget,
        options: &InterfacerOptions,
        start: ObjectCollection,
        label: &str,
    ) -> Result<InstanceRef> {
        let started = Instant::now();
        log_op_start!("import", label, format = interfacer.format().as_str());
        let result = self.import_root(interfacer, node, target, options, start).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => log_op_end!("import", label, duration_ms),
            Err(err) => log_op_error!("import", label, err, duration_ms),
        }
        result
    }

    async fn import_root<I: Interfacer>(
        &mut self,
        interfacer: &I,
        node: &I::Node,
        target: RootTarget,
        options: &InterfacerOptions,
        start: ObjectCollection,
    ) -> Result<InstanceRef> {
        let root_model = match &target {
            RootTarget::New(model) => Some(model.clone()),
            RootTarget::Fill(handle) => Some(self.arena.object(*handle)?.model.clone()),
            RootTarget::Array(array) => array.element().unique_complex().cloned(),
        };
        if let Some(model) = &root_model {
            self.registry().load_deep(model.name()).await?;
        }

        let unflattened;
        let node = match (&target, options.flatten_values) {
            (RootTarget::New(model), true) => {
                let mut copy = node.clone();
                for (name, property) in model.properties()? {
                    if !property.model().is_simple() && !property.is_foreign() {
                        interfacer.unflatten_node(&mut copy, name)?;
                    }
                }
                unflattened = copy;
                &unflattened
            }
            _ => node,
        };

        for tag in collect_tags(interfacer, node) {
            self.registry().load_deep(&tag).await?;
        }

        let start = match &target {
            RootTarget::Fill(handle) => start_snapshot(self, *handle, start)?,
            _ => start,
        };
        let mut importer = Importer {
            comhon: self,
            interfacer,
            options,
            scope: ObjectCollectionInterfacer::with_start(start),
            outer: Vec::new(),
            visiting: HashSet::new(),
            cached_main: Vec::new(),
        };
        importer.run(node, target)
    }
}

/// Model names of every inheritance tag of the document
fn collect_tags<I: Interfacer>(interfacer: &I, root: &I::Node) -> Vec<String> {
    let mut tags = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(InterfacedRef::Scalar(Scalar::String(tag))) =
            interfacer.get_value(node, INHERITANCE_KEY, false)
        {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        stack.extend(interfacer.child_nodes(node));
    }
    tags
}

/// Objects with an id reachable from `root` before a fill
fn start_snapshot(comhon: &Comhon, root: InstanceRef, seed: ObjectCollection) -> Result<ObjectCollection> {
    struct Collector(ObjectCollection);

    impl Visitor for Collector {
        fn visit(&mut self, visit: &Visit<'_>) -> Result<VisitControl> {
            if let Instance::Object(object) = visit.instance {
                if let Some(key) = object.id_key() {
                    self.0.add(object.model(), &key, visit.handle)?;
                }
            }
            Ok(VisitControl::Continue)
        }
    }

    let mut collector = Collector(seed);
    walk(&comhon.arena, root, WalkOptions::default(), &mut collector)?;
    Ok(collector.0)
}

struct Importer<'a, I: Interfacer> {
    comhon: &'a mut Comhon,
    interfacer: &'a I,
    options: &'a InterfacerOptions,
    scope: ObjectCollectionInterfacer,
    /// Scopes suspended by isolated values
    outer: Vec<ObjectCollectionInterfacer>,
    /// Objects whose values are being read
    visiting: HashSet<InstanceRef>,
    /// Main objects cached by this import
    cached_main: Vec<(Arc<Model>, String, InstanceRef)>,
}

impl<I: Interfacer> Importer<'_, I> {
    /// Import the document; on failure the main objects it cached are
    /// forgotten again
    fn run(&mut self, node: &I::Node, target: RootTarget) -> Result<InstanceRef> {
        let result = self.read_document(node, target);
        if result.is_err() {
            for (model, key, handle) in self.cached_main.drain(..) {
                self.comhon.main.remove(&model, &key, handle);
            }
        }
        result
    }

    fn read_document(&mut self, node: &I::Node, target: RootTarget) -> Result<InstanceRef> {
        let handle = match target {
            RootTarget::New(model) => self.import_object_node(&model, node, None)?,
            RootTarget::Fill(handle) => {
                let model = self.comhon.arena.object(handle)?.model.clone();
                self.import_object_node(&model, node, Some(handle))?
            }
            RootTarget::Array(model) => self.import_array_node(&model, node, false)?,
        };
        if self.options.verify_references {
            self.verify_scope(&self.scope, handle)?;
        }
        if self.options.validate {
            self.comhon.validate_graph(handle)?;
        }
        Ok(handle)
    }

    fn merges(&self) -> bool {
        self.options.merge != MergeType::NoMerge
    }

    /// Cache a main object unless it is cached already
    fn add_main(&mut self, model: &Arc<Model>, key: &str, handle: InstanceRef) -> Result<()> {
        if !model.is_main() || !self.merges() || self.comhon.main.holds(model, key, handle) {
            return Ok(());
        }
        self.comhon.main.add(model, key, handle)?;
        self.cached_main.push((model.clone(), key.to_string(), handle));
        Ok(())
    }

    /// Known object of `model` with identity `key`: met in this document
    /// first, then existing before the import, then cached as main object
    fn lookup(&self, model: &Model, key: &str) -> Option<InstanceRef> {
        let found = self
            .scope
            .get_new(model, key)
            .or_else(|| self.scope.get_new_foreign(model, key));
        if found.is_some() || !self.merges() {
            return found;
        }
        self.scope
            .get_start(model, key)
            .or_else(|| model.is_main().then(|| self.comhon.main.get(model, key)).flatten())
    }

    fn push_scope(&mut self) {
        let outer = std::mem::take(&mut self.scope);
        self.outer.push(outer);
    }

    fn pop_scope(&mut self) -> ObjectCollectionInterfacer {
        let outer = self.outer.pop().unwrap_or_default();
        std::mem::replace(&mut self.scope, outer)
    }

    /// Every reference of `scope` must be written inline under `root`
    fn verify_scope(&self, scope: &ObjectCollectionInterfacer, root: InstanceRef) -> Result<()> {
        for (_, id, handle) in scope.unresolved_foreign() {
            let model = self.comhon.arena.object(handle)?.model.clone();
            if model.is_requestable() || scope.get_start(&model, &id).is_some() {
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

    /// Model named by the inheritance tag of `node`, `declared` if none
    fn resolve_model(&self, declared: &Arc<Model>, node: &I::Node) -> Result<Arc<Model>> {
        match self.interfacer.get_value(node, INHERITANCE_KEY, false) {
            None => Ok(declared.clone()),
            Some(InterfacedRef::Scalar(Scalar::String(name))) => {
                let model = self.comhon.registry().get(&name);
                model.definition()?;
                if model.is_same_or_descendant_of(declared) {
                    Ok(model)
                } else {
                    Err(ComhonError::TypeMismatch {
                        expected: declared.name().to_string(),
                        actual: name,
                    })
                }
            }
            Some(_) => Err(ComhonError::TypeMismatch {
                expected: "model name".to_string(),
                actual: "node".to_string(),
            }),
        }
    }

    /// Bring a known object to `model` when the document is more specific
    fn reconcile(&mut self, handle: InstanceRef, model: &Arc<Model>) -> Result<()> {
        let current = self.comhon.arena.object(handle)?.model.clone();
        if current.is_same_or_descendant_of(model) {
            return Ok(());
        }
        if model.inherits_from(&current) {
            return self.comhon.cast_inner(handle, model);
        }
        Err(ComhonError::Cast {
            from: current.name().to_string(),
            to: model.name().to_string(),
            reason: "unrelated models share an identity".to_string(),
        })
    }

    fn import_scalar(&self, kind: SimpleKind, raw: InterfacedRef<'_, I::Node>) -> Result<Value> {
        let format = &self.options.date_time_format;
        match raw {
            InterfacedRef::Null => Ok(Value::Null),
            InterfacedRef::Scalar(scalar) => kind.import_scalar(&scalar, format),
            InterfacedRef::Node(node) => match self.interfacer.node_scalar(node) {
                Some(scalar) => kind.import_scalar(&scalar, format),
                None => Err(ComhonError::TypeMismatch {
                    expected: kind.name().to_string(),
                    actual: "node".to_string(),
                }),
            },
        }
    }

    /// Id values carried by `node`, `None` unless every id is present
    fn read_id(&self, model: &Model, node: &I::Node) -> Result<Option<Vec<Value>>> {
        let mut values = Vec::new();
        for property in model.id_properties()? {
            let ModelType::Simple(kind) = property.model() else {
                return Ok(None);
            };
            let raw = self
                .interfacer
                .get_value(node, property.name(), property.is_interfaced_as_node());
            match raw {
                None | Some(InterfacedRef::Null) => return Ok(None),
                Some(raw) => values.push(self.import_scalar(*kind, raw).at(property.name())?),
            }
        }
        Ok((!values.is_empty()).then_some(values))
    }

    fn import_value(&mut self, model: &ModelType, raw: InterfacedRef<'_, I::Node>, foreign: bool) -> Result<Value> {
        match (model, raw) {
            (_, InterfacedRef::Null) => Ok(Value::Null),
            (ModelType::Simple(kind), raw) => self.import_scalar(*kind, raw),
            (ModelType::Foreign(inner), raw) => self.import_value(inner, raw, true),
            (ModelType::Complex(declared), raw) if foreign => {
                self.import_foreign(declared, raw).map(Value::Object)
            }
            (ModelType::Complex(declared), InterfacedRef::Node(node)) => {
                self.import_object_node(declared, node, None).map(Value::Object)
            }
            (ModelType::Array(array), InterfacedRef::Node(node)) => {
                self.import_array_node(array, node, foreign).map(Value::Array)
            }
            (expected, InterfacedRef::Scalar(scalar)) => Err(ComhonError::TypeMismatch {
                expected: expected.name(),
                actual: scalar.type_name().to_string(),
            }),
        }
    }

    /// Read one property value, in its own scope when isolated
    fn import_property(&mut self, property: &Property, raw: InterfacedRef<'_, I::Node>) -> Result<Value> {
        if !property.is_isolated() {
            let value = self.import_value(property.model(), raw, false)?;
            restriction::check(property.restrictions(), Subject::Value(&value), 0)?;
            return Ok(value);
        }
        self.push_scope();
        let value = self.import_value(property.model(), raw, false);
        let scope = self.pop_scope();
        let value = value?;
        if let (true, Some(root)) = (self.options.verify_references, value.as_instance()) {
            self.verify_scope(&scope, root)?;
        }
        restriction::check(property.restrictions(), Subject::Value(&value), 0)?;
        Ok(value)
    }

    fn import_object_node(
        &mut self,
        declared: &Arc<Model>,
        node: &I::Node,
        target: Option<InstanceRef>,
    ) -> Result<InstanceRef> {
        if self.interfacer.is_array_node(node) {
            return Err(ComhonError::TypeMismatch {
                expected: declared.name().to_string(),
                actual: "array".to_string(),
            });
        }
        let model = self.resolve_model(declared, node)?;
        let definition = model.definition()?;
        let key = self
            .read_id(&model, node)?
            .map(|values| encode_id(&values.iter().collect::<Vec<_>>()));

        let known = match target {
            Some(target) => Some(target),
            None => key.as_deref().and_then(|k| self.lookup(&model, k)),
        };
        let handle = match known {
            Some(existing) => {
                if self.visiting.contains(&existing) {
                    return Err(ComhonError::SelfContainment {
                        model: model.name().to_string(),
                        id: key,
                    });
                }
                if let Some(key) = key.as_deref().filter(|k| self.scope.has_new_object(&model, k)) {
                    return Err(ComhonError::DuplicateIdentity {
                        model: model.name().to_string(),
                        id: key.to_string(),
                    });
                }
                self.reconcile(existing, &model)?;
                if self.options.merge == MergeType::Overwrite {
                    self.comhon
                        .arena
                        .object_mut(existing)?
                        .values
                        .retain(|name, _| definition.properties().get(name).is_some_and(|p| p.is_id()));
                }
                existing
            }
            None => self
                .comhon
                .arena
                .insert(Instance::Object(ComhonObject::new(model.clone()))),
        };

        if let Some(key) = &key {
            self.scope.add_new_object(&model, key, handle)?;
            self.add_main(&model, key, handle)?;
        }

        self.visiting.insert(handle);
        let flag = self.options.flag_values_as_updated;
        for (name, property) in definition.properties() {
            if property.is_private() && !self.options.private {
                continue;
            }
            let Some(raw) = self
                .interfacer
                .get_value(node, name, property.is_interfaced_as_node())
            else {
                continue;
            };
            let value = self.import_property(property, raw).at(name)?;
            self.comhon.arena.object_mut(handle)?.store(property, value, flag);
        }
        self.visiting.remove(&handle);

        if model.is_abstract() {
            return Err(ComhonError::AbstractObject {
                model: model.name().to_string(),
            });
        }
        self.comhon.arena.object_mut(handle)?.loaded = true;
        Ok(handle)
    }

    fn import_array_node(
        &mut self,
        model: &Arc<ModelArray>,
        node: &I::Node,
        foreign: bool,
    ) -> Result<InstanceRef> {
        let entries = self
            .interfacer
            .array_entries(node, model.is_associative())
            .map_err(|err| match err {
                ComhonError::ArrayShape { reason, .. } => ComhonError::ArrayShape {
                    model: model.name(),
                    reason,
                },
                other => other,
            })?;

        let mut array = ComhonArray::new(model.clone());
        for (index, (key, raw)) in entries.into_iter().enumerate() {
            let segment = key.clone().unwrap_or_else(|| index.to_string());
            let value = if model.is_isolated_element() {
                self.push_scope();
                let value = self.import_value(model.element(), raw, foreign);
                let scope = self.pop_scope();
                let value = value.at(&segment)?;
                if let (true, Some(root)) = (self.options.verify_references, value.as_instance()) {
                    self.verify_scope(&scope, root).at(&segment)?;
                }
                value
            } else {
                self.import_value(model.element(), raw, foreign).at(&segment)?
            };
            restriction::check(model.element_restrictions(), Subject::Value(&value), 0).at(&segment)?;
            match (&mut array.values, key) {
                (ArrayValues::List(values), _) => values.push(value),
                (ArrayValues::Map(values), Some(key)) => {
                    values.insert(key, value);
                }
                (ArrayValues::Map(_), None) => {}
            }
        }
        array.loaded = true;
        array.updated = self.options.flag_values_as_updated;
        Ok(self.comhon.arena.insert(Instance::Array(array)))
    }

    /// Resolve a reference, creating an unloaded object for unknown ids
    fn import_foreign(&mut self, declared: &Arc<Model>, raw: InterfacedRef<'_, I::Node>) -> Result<InstanceRef> {
        let (model, scalar) = match raw {
            InterfacedRef::Scalar(scalar) => (declared.clone(), scalar),
            InterfacedRef::Node(node) => {
                let model = self.resolve_model(declared, node)?;
                let scalar = match self.interfacer.get_value(node, FOREIGN_ID_KEY, false) {
                    Some(InterfacedRef::Scalar(scalar)) => Some(scalar),
                    Some(InterfacedRef::Node(inner)) => self.interfacer.node_scalar(inner),
                    _ => self.interfacer.node_scalar(node),
                };
                match scalar {
                    Some(scalar) => (model, scalar),
                    None => {
                        return Err(ComhonError::IncompleteForeignId {
                            model: model.name().to_string(),
                        })
                    }
                }
            }
            InterfacedRef::Null => {
                return Err(ComhonError::IncompleteForeignId {
                    model: declared.name().to_string(),
                })
            }
        };

        let ids = model.id_properties()?;
        let values = decode_id(&scalar, model.name(), &ids, &self.options.date_time_format)?;
        let key = encode_id(&values.iter().collect::<Vec<_>>());

        let handle = match self.lookup(&model, &key) {
            Some(existing) => {
                self.reconcile(existing, &model)?;
                existing
            }
            None => {
                let mut object = ComhonObject::new(model.clone());
                for (property, value) in ids.iter().zip(values) {
                    object.store(property, value, self.options.flag_values_as_updated);
                }
                let handle = self.comhon.arena.insert(Instance::Object(object));
                self.add_main(&model, &key, handle)?;
                handle
            }
        };
        self.scope.add_new_foreign_object(&model, &key, handle)?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::interfacer::{JsonInterfacer, XmlInterfacer};
    use crate::provider::MemoryManifestProvider;
    use serde_json::json;

    fn provider() -> MemoryManifestProvider {
        MemoryManifestProvider::new()
            .with_manifest(
                "Person",
                json!({
                    "version": "3.0",
                    "properties": [
                        {"inheritance-": "Integer", "name": "id", "is_id": true},
                        {"inheritance-": "String", "name": "name"},
                        {"inheritance-": "Object", "name": "best_friend", "model": "Person", "is_foreign": true},
                        {"inheritance-": "Array", "name": "children", "values": {"inheritance-": "Object", "name": "child", "model": "Person"}}
                    ]
                }),
            )
            .with_manifest(
                "Man",
                json!({"version": "3.0", "extends": "Person", "share_parent_id": true, "properties": []}),
            )
    }

    async fn comhon() -> (Comhon, Arc<Model>) {
        let comhon = Comhon::new(Arc::new(provider()));
        let person = comhon.load_model("Person").await.unwrap();
        (comhon, person)
    }

    #[tokio::test]
    async fn test_inline_and_foreign_share_one_instance() {
        let (mut comhon, person) = comhon().await;
        let document = json!({
            "id": 1,
            "best_friend": 2,
            "children": [{"id": 2, "name": "Ann"}]
        });
        let root = comhon
            .import_object(&JsonInterfacer, &document, &person, &InterfacerOptions::default())
            .await
            .unwrap();
        let friend = comhon.get_value(root, "best_friend").unwrap().and_then(Value::as_object).unwrap();
        let children = comhon.get_value(root, "children").unwrap().and_then(Value::as_array).unwrap();
        let child = comhon.arena().array(children).unwrap().get(0).and_then(Value::as_object).unwrap();
        assert_eq!(friend, child);
        assert!(comhon.is_loaded(child).unwrap());
    }

    #[tokio::test]
    async fn test_dangling_reference_is_rejected() {
        let (mut comhon, person) = comhon().await;
        let document = json!({"id": 1, "best_friend": 3});
        let err = comhon
            .import_object(&JsonInterfacer, &document, &person, &InterfacerOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ComhonError::DanglingReference { ref id, .. } if id == "3"));

        let options = InterfacerOptions::default().with_verify_references(false);
        let root = comhon
            .import_object(&JsonInterfacer, &document, &person, &options)
            .await
            .unwrap();
        let friend = comhon.get_value(root, "best_friend").unwrap().and_then(Value::as_object).unwrap();
        assert!(!comhon.is_loaded(friend).unwrap());
    }

    #[tokio::test]
    async fn test_object_containing_itself_is_rejected() {
        let (mut comhon, person) = comhon().await;
        let document = json!({"id": 1, "children": [{"id": 1}]});
        let err = comhon
            .import_object(&JsonInterfacer, &document, &person, &InterfacerOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::SelfContainment);
        assert_eq!(err.path(), Some("children.0"));
    }

    #[tokio::test]
    async fn test_inheritance_tag_selects_model() {
        let (mut comhon, person) = comhon().await;
        let document = json!({
            "id": 1,
            "best_friend": {"id": 2, "inheritance-": "Man"},
            "children": [{"id": 2, "inheritance-": "Man"}]
        });
        let root = comhon
            .import_object(&JsonInterfacer, &document, &person, &InterfacerOptions::default())
            .await
            .unwrap();
        let friend = comhon.get_value(root, "best_friend").unwrap().and_then(Value::as_object).unwrap();
        assert_eq!(comhon.arena().object(friend).unwrap().model().name(), "Man");
    }

    #[tokio::test]
    async fn test_fill_merges_into_existing_object() {
        let (mut comhon, person) = comhon().await;
        let root = comhon.new_object(&person).unwrap();
        comhon.set_value(root, "id", 1i64).unwrap();
        comhon.set_value(root, "name", "Bob").unwrap();

        let document = json!({"id": 1});
        comhon
            .fill_object(root, &JsonInterfacer, &document, &InterfacerOptions::default())
            .await
            .unwrap();
        assert_eq!(comhon.get_value(root, "name").unwrap(), Some(&Value::from("Bob")));

        let options = InterfacerOptions::default().with_merge(MergeType::Overwrite);
        comhon.fill_object(root, &JsonInterfacer, &document, &options).await.unwrap();
        assert!(!comhon.has_value(root, "name").unwrap());
        assert!(comhon.is_loaded(root).unwrap());
    }

    #[tokio::test]
    async fn test_xml_attributes_and_children() {
        let (mut comhon, person) = comhon().await;
        let interfacer = XmlInterfacer::new();
        let node = interfacer
            .from_string(r#"<Person id="1" name="Eve"><best_friend>2</best_friend><children><child id="2"/></children></Person>"#)
            .unwrap();
        let root = comhon
            .import_object(&interfacer, &node, &person, &InterfacerOptions::default())
            .await
            .unwrap();
        assert_eq!(comhon.get_id(root).unwrap(), Some(Value::Integer(1)));
        assert_eq!(comhon.get_value(root, "name").unwrap(), Some(&Value::from("Eve")));
    }
}
