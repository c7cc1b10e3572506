//! Model registry and loader
//!
//! The registry hands out one shared [`Model`] per name. Loading a model
//! fetches and parses its manifest, loads its parents, merges inherited
//! properties and publishes the definition exactly once.
//!
//! Concurrent loads of the same name are coalesced: the first caller
//! becomes the leader and builds the model, later callers wait on a
//! `watch` channel for the leader's outcome. Inheritance cycles are caught
//! two ways: a per-task lineage for recursion within one load, and a
//! waits-for map for cycles spanning concurrent loads.

use crate::errors::{ComhonError, Result};
use crate::interfacer::DEFAULT_DATE_TIME_FORMAT;
use crate::manifest::{self, ParsedManifest, PropertyDecl, PropertyDeclKind, RestrictionSpec, TypeDecl};
use crate::model::{Model, ModelArray, ModelDefinition, ModelType, Property, SimpleKind};
use crate::provider::ManifestProvider;
use crate::restriction::{
    first_not_satisfied, Interval, IntervalDomain, PatternCache, RegexRestriction, Restriction,
    Subject,
};
use crate::{log_op_end, log_op_error, log_op_start};
use futures::future::{try_join_all, BoxFuture};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

type LoadOutcome = Arc<Result<()>>;

struct InFlightLoad {
    tx: watch::Sender<Option<LoadOutcome>>,
    rx: watch::Receiver<Option<LoadOutcome>>,
}

/// Manifest of a type declared inside another manifest
#[derive(Debug, Clone)]
struct LocalType {
    owner: String,
    document: JsonValue,
}

#[derive(Default)]
struct RegistryState {
    models: HashMap<String, Arc<Model>>,
    local_types: HashMap<String, LocalType>,
}

pub struct ModelRegistry {
    manifests: Arc<dyn ManifestProvider>,
    state: RwLock<RegistryState>,
    inflight: Mutex<HashMap<String, Arc<InFlightLoad>>>,
    /// Model being built -> model whose load it currently awaits
    waits: Mutex<HashMap<String, String>>,
    patterns: PatternCache,
}

impl ModelRegistry {
    pub fn new(manifests: Arc<dyn ManifestProvider>) -> Self {
        Self {
            manifests,
            state: RwLock::new(RegistryState::default()),
            inflight: Mutex::new(HashMap::new()),
            waits: Mutex::new(HashMap::new()),
            patterns: PatternCache::new(),
        }
    }

    pub fn manifest_provider(&self) -> &Arc<dyn ManifestProvider> {
        &self.manifests
    }

    /// Shared model registered under `name`, created unloaded if unknown
    pub fn get(&self, name: &str) -> Arc<Model> {
        if let Some(model) = self.state.read().models.get(name) {
            return model.clone();
        }
        self.state
            .write()
            .models
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Model::new(name)))
            .clone()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state
            .read()
            .models
            .get(name)
            .is_some_and(|m| m.is_loaded())
    }

    /// Load `name` and return the shared model
    ///
    /// # Errors
    ///
    /// Returns the first manifest, provider or inheritance error met. On
    /// failure the model stays unloaded and a later call retries.
    pub async fn load(&self, name: &str) -> Result<Arc<Model>> {
        let model = self.get(name);
        self.load_model(&model).await?;
        Ok(model)
    }

    /// Load an already obtained model
    ///
    /// # Errors
    ///
    /// See [`ModelRegistry::load`].
    pub async fn load_model(&self, model: &Arc<Model>) -> Result<()> {
        if model.is_loaded() {
            tracing::debug!(model = model.name(), "model already loaded");
            return Ok(());
        }
        let start = Instant::now();
        log_op_start!("load_model", model.name());
        let result = self.load_with_lineage(model.clone(), Vec::new()).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => log_op_end!("load_model", model.name(), duration_ms),
            Err(err) => log_op_error!("load_model", model.name(), err, duration_ms),
        }
        result
    }

    /// Load `name` and every model reachable through its parents and
    /// property models
    ///
    /// Import and export walk models synchronously and expect them loaded.
    ///
    /// # Errors
    ///
    /// Returns the first loading error, or `Manifest` when an aggregation
    /// names a back-reference the element model does not have.
    pub async fn load_deep(&self, name: &str) -> Result<Arc<Model>> {
        let root = self.load(name).await?;
        let mut visited: Vec<Arc<Model>> = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(model) = queue.pop_front() {
            if !seen.insert(model.name().to_string()) {
                continue;
            }
            self.load_model(&model).await?;
            let definition = model.definition()?;
            queue.extend(definition.parents().iter().cloned());
            for property in definition.properties().values() {
                if let Some(complex) = property.model().unique_complex() {
                    queue.push_back(complex.clone());
                }
            }
            visited.push(model);
        }
        for model in &visited {
            check_aggregations(model)?;
        }
        Ok(root)
    }

    /// Drop every model and cached pattern
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.models.clear();
        state.local_types.clear();
        self.patterns.clear();
    }

    fn load_with_lineage(
        &self,
        model: Arc<Model>,
        lineage: Vec<String>,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if model.is_loaded() {
                return Ok(());
            }
            let name = model.name().to_string();
            if lineage.contains(&name) {
                let mut cycle = lineage.clone();
                cycle.push(name);
                return Err(ComhonError::InheritanceCycle { lineage: cycle });
            }

            let waiter = lineage.last().cloned();
            if let Some(waiter) = &waiter {
                self.register_wait(waiter, &name)?;
            }
            let result = self.load_coalesced(&model, &lineage).await;
            if let Some(waiter) = &waiter {
                self.waits.lock().remove(waiter);
            }
            result
        })
    }

    async fn load_coalesced(&self, model: &Arc<Model>, lineage: &[String]) -> Result<()> {
        let name = model.name();
        let (inflight, is_leader) = {
            let mut inflight_map = self.inflight.lock();
            match inflight_map.get(name) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let (tx, rx) = watch::channel(None);
                    let created = Arc::new(InFlightLoad { tx, rx });
                    inflight_map.insert(name.to_string(), created.clone());
                    (created, true)
                }
            }
        };

        if !is_leader {
            tracing::debug!(model = name, "joining in-flight model load");
            let mut rx = inflight.rx.clone();
            loop {
                let outcome = rx.borrow().as_ref().cloned();
                if let Some(outcome) = outcome {
                    return (*outcome).clone();
                }
                if rx.changed().await.is_err() {
                    return Err(ComhonError::Internal {
                        message: format!("load of {} ended without outcome", name),
                    });
                }
            }
        }

        let guard = LoadGuard {
            registry: self,
            name: name.to_string(),
            inflight,
            completed: false,
        };
        if model.is_loaded() {
            return guard.complete(Ok(()));
        }
        let result = self.build(model, lineage).await;
        guard.complete(result)
    }

    fn register_wait(&self, waiter: &str, target: &str) -> Result<()> {
        let mut waits = self.waits.lock();
        let mut chain = vec![waiter.to_string(), target.to_string()];
        let mut current = target.to_string();
        while let Some(next) = waits.get(&current) {
            if next == waiter {
                chain.push(next.clone());
                return Err(ComhonError::InheritanceCycle { lineage: chain });
            }
            chain.push(next.clone());
            current = next.clone();
        }
        if target == waiter {
            return Err(ComhonError::InheritanceCycle { lineage: chain });
        }
        waits.insert(waiter.to_string(), target.to_string());
        Ok(())
    }

    async fn build(&self, model: &Arc<Model>, lineage: &[String]) -> Result<()> {
        let name = model.name().to_string();
        let document = self.fetch_document(&name, lineage).await?;
        let parsed = manifest::parse(&document, &name)?;
        let registered = self.register_local_types(&name, &parsed)?;

        match self.compile(model, parsed, lineage).await {
            Ok(definition) => model.publish(definition),
            Err(err) => {
                let mut state = self.state.write();
                for local in registered {
                    state.local_types.remove(&local);
                }
                Err(err)
            }
        }
    }

    async fn fetch_document(&self, name: &str, lineage: &[String]) -> Result<JsonValue> {
        if let Some(local) = self.local_document(name) {
            return Ok(local);
        }
        match self.manifests.fetch_manifest(name).await {
            Ok(document) => Ok(document),
            Err(err) if err.is_not_found() => {
                // A local type may be requested by full name before its owner
                if let Some((owner, _)) = name.rsplit_once('\\') {
                    let owner_model = self.get(owner);
                    let mut owner_lineage = lineage.to_vec();
                    owner_lineage.push(name.to_string());
                    if self
                        .load_with_lineage(owner_model, owner_lineage)
                        .await
                        .is_ok()
                    {
                        if let Some(local) = self.local_document(name) {
                            return Ok(local);
                        }
                    }
                }
                Err(ComhonError::ModelNotFound {
                    model: name.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn local_document(&self, name: &str) -> Option<JsonValue> {
        self.state
            .read()
            .local_types
            .get(name)
            .map(|local| local.document.clone())
    }

    fn register_local_types(&self, owner: &str, parsed: &ParsedManifest) -> Result<Vec<String>> {
        let mut state = self.state.write();
        let mut registered = Vec::new();
        for (short_name, document) in &parsed.local_types {
            let full_name = format!("{}\\{}", owner, short_name);
            let collision = match state.local_types.get(&full_name) {
                Some(existing) => existing.owner != owner,
                None => state.models.get(&full_name).is_some_and(|m| m.is_loaded()),
            };
            if collision {
                for name in &registered {
                    state.local_types.remove(name);
                }
                return Err(ComhonError::ModelNameCollision {
                    model: full_name,
                    owner: owner.to_string(),
                });
            }
            state.local_types.insert(
                full_name.clone(),
                LocalType {
                    owner: owner.to_string(),
                    document: document.clone(),
                },
            );
            registered.push(full_name);
        }
        Ok(registered)
    }

    /// Resolve a model name used inside the manifest of `context`: local
    /// types of the context and of its owners first, then the full name
    fn resolve_name(&self, context: &str, name: &str) -> String {
        let state = self.state.read();
        let mut scope = Some(context.to_string());
        while let Some(current) = scope {
            let candidate = format!("{}\\{}", current, name);
            if state.local_types.contains_key(&candidate) {
                return candidate;
            }
            scope = state.local_types.get(&current).map(|l| l.owner.clone());
        }
        name.to_string()
    }

    async fn compile(
        &self,
        model: &Arc<Model>,
        parsed: ParsedManifest,
        lineage: &[String],
    ) -> Result<ModelDefinition> {
        let name = model.name().to_string();
        let malformed = |reason: String| ComhonError::Manifest {
            model: name.clone(),
            reason,
        };

        let mut parent_lineage = lineage.to_vec();
        parent_lineage.push(name.clone());
        let mut parents = Vec::with_capacity(parsed.extends.len());
        for parent_name in &parsed.extends {
            let parent = self.get(&self.resolve_name(&name, parent_name));
            self.load_with_lineage(parent.clone(), parent_lineage.clone())
                .await?;
            parents.push(parent);
        }

        let mut properties: IndexMap<String, Arc<Property>> = IndexMap::new();
        let mut origins: HashMap<String, String> = HashMap::new();
        let mut conflicts: HashMap<String, Vec<String>> = HashMap::new();
        for parent in &parents {
            let definition = parent.definition()?;
            for (property_name, property) in definition.properties() {
                match properties.get(property_name) {
                    Some(existing) if !Arc::ptr_eq(existing, property) && !existing.is_equal(property) => {
                        return Err(ComhonError::PropertyConflict {
                            model: name.clone(),
                            property: property_name.clone(),
                            other_model: parent.name().to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        properties.insert(property_name.clone(), property.clone());
                        origins.insert(property_name.clone(), parent.name().to_string());
                    }
                }
            }
            for (property_name, others) in &definition.conflicts {
                let entry = conflicts.entry(property_name.clone()).or_default();
                for other in others {
                    if !entry.contains(other) {
                        entry.push(other.clone());
                    }
                }
            }
        }

        let patterns = self.fetch_patterns(&parsed.properties).await?;

        for decl in &parsed.properties {
            let property = self.build_property(&name, decl, &patterns)?;
            if let Some(existing) = properties.get(&decl.name) {
                if !existing.is_equal(&property) {
                    return Err(ComhonError::PropertyConflict {
                        model: name.clone(),
                        property: decl.name.clone(),
                        other_model: origins.get(&decl.name).cloned().unwrap_or_default(),
                    });
                }
                continue;
            }
            properties.insert(decl.name.clone(), Arc::new(property));
        }

        for group in &parsed.conflicts {
            for property_name in group {
                if !properties.contains_key(property_name) {
                    return Err(malformed(format!(
                        "conflict names unknown property {}",
                        property_name
                    )));
                }
                let entry = conflicts.entry(property_name.clone()).or_default();
                for other in group.iter().filter(|o| *o != property_name) {
                    if !entry.contains(other) {
                        entry.push(other.clone());
                    }
                }
            }
        }
        for decl in &parsed.properties {
            for dependency in &decl.dependencies {
                if !properties.contains_key(dependency) {
                    return Err(malformed(format!(
                        "property {} depends on unknown property {}",
                        decl.name, dependency
                    )));
                }
            }
        }

        let shared_id_model = if parsed.share_parent_id {
            let parent = parents
                .first()
                .ok_or_else(|| malformed("share_parent_id requires a parent model".to_string()))?;
            Some(shared_or_self(parent)?)
        } else if let Some(shared_id) = &parsed.shared_id {
            let target = self.resolve_name(&name, shared_id);
            let ancestor = parents
                .iter()
                .flat_map(|p| std::iter::once(p.clone()).chain(p.ancestors()))
                .find(|a| a.name() == target)
                .ok_or_else(|| {
                    malformed(format!("shared id model {} is not an ancestor", shared_id))
                })?;
            Some(shared_or_self(&ancestor)?)
        } else {
            None
        };

        let serialization = match parsed.serialization {
            Some(unit) => Some(unit),
            None => parents
                .iter()
                .find_map(|p| p.definition().ok().and_then(|d| d.serialization.clone())),
        };

        let is_main = parsed.is_main || parents.iter().any(|p| p.is_main());

        Ok(ModelDefinition {
            version: parsed.version,
            parents,
            properties,
            is_abstract: parsed.is_abstract,
            is_main,
            shared_id_model,
            conflicts,
            serialization,
        })
    }

    async fn fetch_patterns(&self, declarations: &[PropertyDecl]) -> Result<HashMap<String, String>> {
        let mut names = HashSet::new();
        for decl in declarations {
            collect_pattern_names(&decl.restrictions, &mut names);
            collect_type_pattern_names(&decl.type_decl, &mut names);
        }
        let fetched = try_join_all(names.iter().map(|name| async move {
            let pattern = self
                .patterns
                .resolve(name, self.manifests.as_ref())
                .await?;
            Ok::<_, ComhonError>((name.clone(), pattern))
        }))
        .await?;
        Ok(fetched.into_iter().collect())
    }

    fn build_property(
        &self,
        owner: &str,
        decl: &PropertyDecl,
        patterns: &HashMap<String, String>,
    ) -> Result<Property> {
        let model = self.build_type(owner, &decl.type_decl, patterns)?;
        let mut restrictions = build_restrictions(&decl.restrictions, &model, patterns)?;
        if decl.not_null {
            restrictions.push(Restriction::NotNull);
        }

        let default = match (&decl.default, &model) {
            (Some(json), ModelType::Simple(kind)) => {
                let value = kind
                    .import_json(json, DEFAULT_DATE_TIME_FORMAT)
                    .map_err(|e| ComhonError::Manifest {
                        model: owner.to_string(),
                        reason: format!("invalid default of {}: {}", decl.name, e),
                    })?;
                if let Some(failed) = first_not_satisfied(&restrictions, Subject::Value(&value), 0) {
                    return Err(ComhonError::Manifest {
                        model: owner.to_string(),
                        reason: format!(
                            "default of {} does not satisfy {}",
                            decl.name, failed
                        ),
                    });
                }
                Some(value)
            }
            _ => None,
        };

        let mut property = Property::new(decl.name.clone(), model)
            .with_id(decl.is_id)
            .with_private(decl.is_private)
            .with_required(decl.is_required)
            .with_not_null(decl.not_null)
            .with_isolated(decl.is_isolated)
            .with_as_node(decl.as_node)
            .with_default(default)
            .with_restrictions(restrictions)
            .with_dependencies(decl.dependencies.clone());
        match &decl.kind {
            PropertyDeclKind::Plain => {}
            PropertyDeclKind::Aggregation(names) => {
                property = property.with_aggregations(names.clone());
            }
            PropertyDeclKind::Auto(auto) => property = property.with_auto(*auto),
        }
        Ok(property)
    }

    fn build_type(
        &self,
        owner: &str,
        decl: &TypeDecl,
        patterns: &HashMap<String, String>,
    ) -> Result<ModelType> {
        match decl {
            TypeDecl::Simple(kind) => Ok(ModelType::Simple(*kind)),
            TypeDecl::Model(name) => Ok(ModelType::Complex(self.get(&self.resolve_name(owner, name)))),
            TypeDecl::Array(array) => {
                let element = self.build_type(owner, &array.element, patterns)?;
                let mut element_restrictions =
                    build_restrictions(&array.element_restrictions, &element, patterns)?;
                if array.not_null_element {
                    element_restrictions.push(Restriction::NotNull);
                }
                let model = ModelArray::new(element, array.associative, array.element_name.clone())
                    .with_not_null_element(array.not_null_element)
                    .with_isolated_element(array.isolated_element)
                    .with_element_restrictions(element_restrictions);
                let restrictions = build_restrictions(
                    &array.restrictions,
                    &ModelType::Array(Arc::new(model.clone())),
                    patterns,
                )?;
                Ok(ModelType::Array(Arc::new(model.with_restrictions(restrictions))))
            }
            TypeDecl::Foreign(inner) => {
                let inner = self.build_type(owner, inner, patterns)?;
                ModelType::foreign(inner).map_err(|e| ComhonError::Manifest {
                    model: owner.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ModelRegistry")
            .field("models", &state.models.len())
            .field("local_types", &state.local_types.len())
            .finish()
    }
}

/// Publishes the leader's outcome and clears the in-flight entry, also
/// when the leader future is dropped before completion
struct LoadGuard<'a> {
    registry: &'a ModelRegistry,
    name: String,
    inflight: Arc<InFlightLoad>,
    completed: bool,
}

impl LoadGuard<'_> {
    fn complete(mut self, result: Result<()>) -> Result<()> {
        self.completed = true;
        self.finish(Arc::new(result.clone()));
        result
    }

    fn finish(&self, outcome: LoadOutcome) {
        self.inflight.tx.send_replace(Some(outcome));
        self.registry.inflight.lock().remove(&self.name);
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        self.finish(Arc::new(Err(ComhonError::Internal {
            message: format!("load of {} was cancelled", self.name),
        })));
    }
}

fn shared_or_self(model: &Arc<Model>) -> Result<Arc<Model>> {
    Ok(model
        .definition()?
        .shared_id_model()
        .cloned()
        .unwrap_or_else(|| model.clone()))
}

fn collect_pattern_names(specs: &[RestrictionSpec], names: &mut HashSet<String>) {
    for spec in specs {
        if let RestrictionSpec::Pattern(name) = spec {
            names.insert(name.clone());
        }
    }
}

fn collect_type_pattern_names(decl: &TypeDecl, names: &mut HashSet<String>) {
    match decl {
        TypeDecl::Array(array) => {
            collect_pattern_names(&array.restrictions, names);
            collect_pattern_names(&array.element_restrictions, names);
            collect_type_pattern_names(&array.element, names);
        }
        TypeDecl::Foreign(inner) => collect_type_pattern_names(inner, names),
        TypeDecl::Simple(_) | TypeDecl::Model(_) => {}
    }
}

fn build_restrictions(
    specs: &[RestrictionSpec],
    target: &ModelType,
    patterns: &HashMap<String, String>,
) -> Result<Vec<Restriction>> {
    let kind = match target {
        ModelType::Simple(kind) => Some(*kind),
        _ => None,
    };
    let not_allowed = |spec: &RestrictionSpec| ComhonError::RestrictionNotAllowed {
        restriction: spec.label().to_string(),
        model: target.name(),
    };

    let mut restrictions = Vec::with_capacity(specs.len());
    for spec in specs {
        let restriction = match spec {
            RestrictionSpec::Enum(values) => {
                let kind = kind.ok_or_else(|| not_allowed(spec))?;
                let values = values
                    .iter()
                    .map(|v| kind.import_json(v, DEFAULT_DATE_TIME_FORMAT))
                    .collect::<Result<Vec<_>>>()
                    .map_err(|e| ComhonError::InvalidRestriction {
                        restriction: "enum".to_string(),
                        reason: e.to_string(),
                    })?;
                Restriction::Enum(values)
            }
            RestrictionSpec::Interval(raw) => {
                let domain = kind
                    .and_then(|k| k.interval_domain())
                    .ok_or_else(|| not_allowed(spec))?;
                Restriction::Interval(Interval::parse(raw, domain)?)
            }
            RestrictionSpec::Length(raw) => {
                Restriction::Length(Interval::parse(raw, IntervalDomain::Integer)?)
            }
            RestrictionSpec::Size(raw) => Restriction::Size(Interval::parse(raw, IntervalDomain::Integer)?),
            RestrictionSpec::Pattern(name) => {
                let pattern = patterns.get(name).ok_or_else(|| ComhonError::InvalidRestriction {
                    restriction: format!("pattern {}", name),
                    reason: "pattern was not resolved".to_string(),
                })?;
                Restriction::Regex(RegexRestriction::new(Some(name.clone()), pattern)?)
            }
            RestrictionSpec::Regex(pattern) => Restriction::Regex(RegexRestriction::new(None, pattern)?),
            RestrictionSpec::NotNull => Restriction::NotNull,
            RestrictionSpec::NotEmpty => match kind {
                Some(SimpleKind::String) => Restriction::NotEmptyString,
                _ => Restriction::NotEmptyArray,
            },
        };
        if !restriction.is_allowed_model(target) {
            return Err(not_allowed(spec));
        }
        restrictions.push(restriction);
    }
    Ok(restrictions)
}

fn check_aggregations(model: &Arc<Model>) -> Result<()> {
    let definition = model.definition()?;
    for property in definition.properties().values() {
        if !property.is_aggregation() {
            continue;
        }
        let element = property
            .model()
            .unique_complex()
            .ok_or_else(|| ComhonError::Manifest {
                model: model.name().to_string(),
                reason: format!("aggregation {} has no element model", property.name()),
            })?;
        for back_reference in property.aggregations() {
            let target = element.property(back_reference).map_err(|_| ComhonError::Manifest {
                model: model.name().to_string(),
                reason: format!(
                    "aggregation {} refers to unknown property {} of {}",
                    property.name(),
                    back_reference,
                    element.name()
                ),
            })?;
            let references_owner = target.is_foreign()
                && target
                    .model()
                    .unique_complex()
                    .is_some_and(|m| model.is_same_or_descendant_of(m));
            if !references_owner {
                return Err(ComhonError::Manifest {
                    model: model.name().to_string(),
                    reason: format!(
                        "aggregation {}: {}.{} is not a foreign reference to {}",
                        property.name(),
                        element.name(),
                        back_reference,
                        model.name()
                    ),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MemoryManifestProvider;
    use serde_json::json;

    fn registry(provider: MemoryManifestProvider) -> (Arc<MemoryManifestProvider>, ModelRegistry) {
        let provider = Arc::new(provider);
        let registry = ModelRegistry::new(provider.clone());
        (provider, registry)
    }

    #[tokio::test]
    async fn test_get_returns_shared_placeholder() {
        let (_, registry) = registry(MemoryManifestProvider::new());
        let a = registry.get("Test\\A");
        let b = registry.get("Test\\A");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_stays_unloaded_and_retries() {
        let (provider, registry) = registry(MemoryManifestProvider::new());
        let err = registry.load("Test\\A").await.unwrap_err();
        assert!(matches!(err, ComhonError::ModelNotFound { .. }));
        assert!(!registry.is_loaded("Test\\A"));

        provider.insert_manifest("Test\\A", json!({"version": "3.0", "properties": []}));
        registry.load("Test\\A").await.unwrap();
        assert!(registry.is_loaded("Test\\A"));
    }

    #[tokio::test]
    async fn test_concurrent_loads_fetch_once() {
        let (provider, registry) = registry(MemoryManifestProvider::new().with_manifest(
            "Test\\A",
            json!({"version": "3.0", "properties": [{"name": "id", "inheritance-": "Integer", "is_id": true}]}),
        ));
        let (a, b) = tokio::join!(registry.load("Test\\A"), registry.load("Test\\A"));
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(provider.manifest_fetch_count("Test\\A"), 1);
    }

    #[tokio::test]
    async fn test_self_extension_is_a_cycle() {
        let (_, registry) = registry(MemoryManifestProvider::new().with_manifest(
            "A",
            json!({"version": "3.0", "extends": "B", "properties": []}),
        ).with_manifest(
            "B",
            json!({"version": "3.0", "extends": "A", "properties": []}),
        ));
        let err = registry.load("A").await.unwrap_err();
        assert!(matches!(err, ComhonError::InheritanceCycle { .. }));
        assert!(!registry.is_loaded("A"));
        assert!(!registry.is_loaded("B"));
    }

    #[tokio::test]
    async fn test_register_wait_detects_cross_load_cycle() {
        let (_, registry) = registry(MemoryManifestProvider::new());
        registry.register_wait("A", "B").unwrap();
        registry.register_wait("B", "C").unwrap();
        let err = registry.register_wait("C", "A").unwrap_err();
        match err {
            ComhonError::InheritanceCycle { lineage } => {
                assert_eq!(lineage.first().map(String::as_str), Some("C"));
                assert_eq!(lineage.last().map(String::as_str), Some("C"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_local_type_resolution() {
        let (_, registry) = registry(MemoryManifestProvider::new().with_manifest(
            "Shop\\Person",
            json!({
                "version": "3.0",
                "properties": [{"name": "address", "inheritance-": "Object", "model": "Address"}],
                "types": [{"name": "Address", "properties": [{"name": "city", "inheritance-": "String"}]}]
            }),
        ));
        let person = registry.load_deep("Shop\\Person").await.unwrap();
        let address = person.property("address").unwrap();
        assert_eq!(
            address.model().as_complex().map(|m| m.name()),
            Some("Shop\\Person\\Address")
        );
        assert!(registry.is_loaded("Shop\\Person\\Address"));
    }

    #[tokio::test]
    async fn test_local_type_by_full_name_loads_owner() {
        let (_, registry) = registry(MemoryManifestProvider::new().with_manifest(
            "Shop\\Person",
            json!({
                "version": "2.0",
                "properties": [],
                "types": [{"name": "Address", "properties": [{"name": "city", "type": "string"}]}]
            }),
        ));
        let address = registry.load("Shop\\Person\\Address").await.unwrap();
        assert!(address.has_property("city"));
    }

    #[tokio::test]
    async fn test_invalid_default_rejected() {
        let (_, registry) = registry(MemoryManifestProvider::new().with_manifest(
            "A",
            json!({
                "version": "3.0",
                "properties": [{"name": "n", "inheritance-": "Integer", "default": 20, "interval": "[0,10]"}]
            }),
        ));
        let err = registry.load("A").await.unwrap_err();
        assert!(err.to_string().contains("does not satisfy"));
    }

    #[tokio::test]
    async fn test_named_pattern_resolved() {
        let provider = MemoryManifestProvider::new().with_manifest(
            "A",
            json!({
                "version": "3.0",
                "properties": [{"name": "mail", "inheritance-": "String", "pattern": "email"}]
            }),
        );
        provider.insert_pattern("email", "^[^@]+@[^@]+$");
        let (_, registry) = registry(provider);
        let model = registry.load("A").await.unwrap();
        let mail = model.property("mail").unwrap();
        assert!(matches!(&mail.restrictions()[0], Restriction::Regex(re) if re.name() == Some("email")));
    }
}
