use super::ModelType;
use crate::restriction::{self, Restriction};
use crate::value::Value;
use serde::Deserialize;

/// Generator of automatic values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoKind {
    /// Next integer of a per-model counter
    Incremental,
    /// Current date time
    #[serde(alias = "dateTime")]
    DateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Plain,
    /// Value referenced by id only
    Foreign,
    /// Foreign array filled by objects referencing the owner through the
    /// listed back-reference properties
    Aggregation(Vec<String>),
    /// Value generated by [`AutoKind`]
    Auto(AutoKind),
}

/// Named, typed slot of a complex model
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    model: ModelType,
    kind: PropertyKind,
    is_id: bool,
    is_private: bool,
    is_required: bool,
    is_not_null: bool,
    is_isolated: bool,
    as_node: bool,
    default: Option<Value>,
    restrictions: Vec<Restriction>,
    dependencies: Vec<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, model: ModelType) -> Self {
        let kind = if model.is_foreign() {
            PropertyKind::Foreign
        } else {
            PropertyKind::Plain
        };
        let as_node = !matches!(model, ModelType::Simple(_));
        Self {
            name: name.into(),
            model,
            kind,
            is_id: false,
            is_private: false,
            is_required: false,
            is_not_null: false,
            is_isolated: false,
            as_node,
            default: None,
            restrictions: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_id(mut self, is_id: bool) -> Self {
        self.is_id = is_id;
        self
    }

    pub fn with_private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    pub fn with_required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    pub fn with_not_null(mut self, not_null: bool) -> Self {
        self.is_not_null = not_null;
        self
    }

    pub fn with_isolated(mut self, isolated: bool) -> Self {
        self.is_isolated = isolated;
        self
    }

    /// Interface scalar values as child nodes instead of attributes
    pub fn with_as_node(mut self, as_node: bool) -> Self {
        self.as_node = as_node || !matches!(self.model, ModelType::Simple(_));
        self
    }

    pub fn with_default(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    pub fn with_restrictions(mut self, restrictions: Vec<Restriction>) -> Self {
        self.restrictions = restrictions;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_aggregations(mut self, aggregations: Vec<String>) -> Self {
        self.kind = PropertyKind::Aggregation(aggregations);
        self
    }

    pub fn with_auto(mut self, auto: AutoKind) -> Self {
        self.kind = PropertyKind::Auto(auto);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &ModelType {
        &self.model
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn is_id(&self) -> bool {
        self.is_id
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn is_required(&self) -> bool {
        self.is_required
    }

    pub fn is_not_null(&self) -> bool {
        self.is_not_null
    }

    pub fn is_isolated(&self) -> bool {
        self.is_isolated
    }

    pub fn is_interfaced_as_node(&self) -> bool {
        self.as_node
    }

    pub fn is_foreign(&self) -> bool {
        self.model.is_foreign()
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self.kind, PropertyKind::Aggregation(_))
    }

    pub fn aggregations(&self) -> &[String] {
        match &self.kind {
            PropertyKind::Aggregation(names) => names,
            _ => &[],
        }
    }

    pub fn auto(&self) -> Option<AutoKind> {
        match self.kind {
            PropertyKind::Auto(auto) => Some(auto),
            _ => None,
        }
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Equality of every attribute, used to accept a redefinition of an
    /// inherited property
    pub fn is_equal(&self, other: &Property) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.is_id == other.is_id
            && self.is_private == other.is_private
            && self.is_required == other.is_required
            && self.is_not_null == other.is_not_null
            && self.is_isolated == other.is_isolated
            && self.as_node == other.as_node
            && self.default == other.default
            && self.model.is_equal(&other.model)
            && restriction::compare(&self.restrictions, &other.restrictions)
            && self.dependencies.len() == other.dependencies.len()
            && self
                .dependencies
                .iter()
                .all(|d| other.dependencies.contains(d))
    }
}
