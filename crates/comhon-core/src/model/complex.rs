use super::Property;
use crate::errors::{ComhonError, Result};
use crate::manifest::ManifestVersion;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Complex model, shared by every reference to the same name
///
/// A model starts unloaded and becomes loaded exactly once, when the
/// registry publishes its definition.
pub struct Model {
    name: String,
    definition: OnceLock<ModelDefinition>,
}

/// Everything a manifest load produces for a model
#[derive(Debug)]
pub struct ModelDefinition {
    pub(crate) version: ManifestVersion,
    pub(crate) parents: Vec<Arc<Model>>,
    pub(crate) properties: IndexMap<String, Arc<Property>>,
    pub(crate) is_abstract: bool,
    pub(crate) is_main: bool,
    pub(crate) shared_id_model: Option<Arc<Model>>,
    pub(crate) conflicts: HashMap<String, Vec<String>>,
    pub(crate) serialization: Option<String>,
}

impl ModelDefinition {
    pub fn version(&self) -> ManifestVersion {
        self.version
    }

    pub fn parents(&self) -> &[Arc<Model>] {
        &self.parents
    }

    pub fn properties(&self) -> &IndexMap<String, Arc<Property>> {
        &self.properties
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_main(&self) -> bool {
        self.is_main
    }

    pub fn shared_id_model(&self) -> Option<&Arc<Model>> {
        self.shared_id_model.as_ref()
    }

    /// Properties that cannot be set together with `property`
    pub fn conflicts_of(&self, property: &str) -> &[String] {
        self.conflicts.get(property).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Serialization unit name; requestable models have one
    pub fn serialization(&self) -> Option<&str> {
        self.serialization.as_deref()
    }

    pub fn id_properties(&self) -> impl Iterator<Item = &Arc<Property>> {
        self.properties.values().filter(|p| p.is_id())
    }
}

impl Model {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: OnceLock::new(),
        }
    }

    /// Fully qualified name, namespaces separated by `\`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last namespace segment of the name
    pub fn short_name(&self) -> &str {
        self.name.rsplit('\\').next().unwrap_or(&self.name)
    }

    pub fn is_loaded(&self) -> bool {
        self.definition.get().is_some()
    }

    /// # Errors
    ///
    /// Returns `ModelNotLoaded` while the manifest has not been loaded.
    pub fn definition(&self) -> Result<&ModelDefinition> {
        self.definition
            .get()
            .ok_or_else(|| ComhonError::ModelNotLoaded {
                model: self.name.clone(),
            })
    }

    pub(crate) fn publish(&self, definition: ModelDefinition) -> Result<()> {
        self.definition
            .set(definition)
            .map_err(|_| ComhonError::Internal {
                message: format!("model {} published twice", self.name),
            })
    }

    /// # Errors
    ///
    /// Returns `UnknownProperty` if the model has no property `name`.
    pub fn property(&self, name: &str) -> Result<&Arc<Property>> {
        self.definition()?
            .properties
            .get(name)
            .ok_or_else(|| ComhonError::UnknownProperty {
                model: self.name.clone(),
                property: name.to_string(),
            })
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.definition()
            .map(|d| d.properties.contains_key(name))
            .unwrap_or(false)
    }

    pub fn properties(&self) -> Result<&IndexMap<String, Arc<Property>>> {
        Ok(&self.definition()?.properties)
    }

    pub fn is_abstract(&self) -> bool {
        self.definition().map(|d| d.is_abstract).unwrap_or(false)
    }

    pub fn is_main(&self) -> bool {
        self.definition().map(|d| d.is_main).unwrap_or(false)
    }

    pub fn is_requestable(&self) -> bool {
        self.definition()
            .map(|d| d.serialization.is_some())
            .unwrap_or(false)
    }

    pub fn has_id_properties(&self) -> bool {
        self.definition()
            .map(|d| d.id_properties().next().is_some())
            .unwrap_or(false)
    }

    /// Id properties in declaration order
    pub fn id_properties(&self) -> Result<Vec<&Arc<Property>>> {
        Ok(self.definition()?.id_properties().collect())
    }

    /// Name of the identity partition: the shared id model if any, else
    /// the model itself
    pub fn key_name(&self) -> &str {
        match self.definition().ok().and_then(|d| d.shared_id_model.as_ref()) {
            Some(shared) => shared.name(),
            None => &self.name,
        }
    }

    /// Whether `ancestor` is a strict ancestor of this model
    pub fn inherits_from(&self, ancestor: &Model) -> bool {
        let mut seen = HashSet::new();
        let mut stack: Vec<&Model> = vec![self];
        while let Some(model) = stack.pop() {
            let Ok(definition) = model.definition() else {
                continue;
            };
            for parent in &definition.parents {
                if parent.name == ancestor.name {
                    return true;
                }
                if seen.insert(parent.name.as_str()) {
                    stack.push(parent);
                }
            }
        }
        false
    }

    pub fn is_same_or_descendant_of(&self, other: &Model) -> bool {
        self.name == other.name || self.inherits_from(other)
    }

    /// Every strict ancestor, nearest first
    pub fn ancestors(&self) -> Vec<Arc<Model>> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut queue: std::collections::VecDeque<Arc<Model>> = self
            .definition()
            .map(|d| d.parents.iter().cloned().collect())
            .unwrap_or_default();
        while let Some(model) = queue.pop_front() {
            if !seen.insert(model.name.clone()) {
                continue;
            }
            if let Ok(definition) = model.definition() {
                queue.extend(definition.parents.iter().cloned());
            }
            result.push(model);
        }
        result
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Model {}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
