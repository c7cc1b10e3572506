use crate::provider::ProviderStatus;
use crate::restriction::Restriction;
use thiserror::Error;

/// Result type alias using ComhonError
pub type Result<T> = std::result::Result<T, ComhonError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// raised by the engine. Each kind maps to a stable error code that can be
/// used for programmatic error handling, testing, and log assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Schema
    Manifest,
    ModelNotFound,
    ModelNameCollision,
    InheritanceConflict,
    NotLoaded,
    UnknownProperty,

    // Values
    TypeMismatch,
    ValueValidation,
    ArrayShape,
    MissingRequired,
    Conflict,
    Dependency,
    AbstractObject,
    Cast,

    // Identity / graph
    DuplicateIdentity,
    SelfContainment,
    DanglingReference,
    PrivateIdExposure,
    IncompleteForeignId,

    // Integration
    Provider,
    Serialization,
    Config,
    Io,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Manifest => "ERR_MANIFEST",
            ExErrorKind::ModelNotFound => "ERR_MODEL_NOT_FOUND",
            ExErrorKind::ModelNameCollision => "ERR_MODEL_NAME_COLLISION",
            ExErrorKind::InheritanceConflict => "ERR_INHERITANCE_CONFLICT",
            ExErrorKind::NotLoaded => "ERR_NOT_LOADED",
            ExErrorKind::UnknownProperty => "ERR_UNKNOWN_PROPERTY",
            ExErrorKind::TypeMismatch => "ERR_TYPE_MISMATCH",
            ExErrorKind::ValueValidation => "ERR_VALUE_VALIDATION",
            ExErrorKind::ArrayShape => "ERR_ARRAY_SHAPE",
            ExErrorKind::MissingRequired => "ERR_MISSING_REQUIRED",
            ExErrorKind::Conflict => "ERR_CONFLICT",
            ExErrorKind::Dependency => "ERR_DEPENDENCY",
            ExErrorKind::AbstractObject => "ERR_ABSTRACT_OBJECT",
            ExErrorKind::Cast => "ERR_CAST",
            ExErrorKind::DuplicateIdentity => "ERR_DUPLICATE_IDENTITY",
            ExErrorKind::SelfContainment => "ERR_SELF_CONTAINMENT",
            ExErrorKind::DanglingReference => "ERR_DANGLING_REFERENCE",
            ExErrorKind::PrivateIdExposure => "ERR_PRIVATE_ID_EXPOSURE",
            ExErrorKind::IncompleteForeignId => "ERR_INCOMPLETE_FOREIGN_ID",
            ExErrorKind::Provider => "ERR_PROVIDER",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Flattened view of a [`ComhonError`] carrying classification fields for
/// programmatic handling and log events.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    model: Option<String>,
    path: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            model: None,
            path: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add model context
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add property path context
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the model context, if any
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Get the property path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(model) = &self.model {
            write!(f, " (model: {})", model)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for model loading, instance manipulation and import/export
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComhonError {
    // ===== Schema Errors =====
    /// Manifest document is malformed or misuses a reserved word
    #[error("Malformed manifest for model {model}: {reason}")]
    Manifest { model: String, reason: String },

    /// Restriction declared on a model kind that cannot carry it
    #[error("Restriction {restriction} is not allowed on model {model}")]
    RestrictionNotAllowed { restriction: String, model: String },

    /// Restriction parameters could not be parsed
    #[error("Invalid restriction {restriction}: {reason}")]
    InvalidRestriction { restriction: String, reason: String },

    /// No manifest exists for the requested model
    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    /// A local type name is already bound to another model
    #[error("Model name {model} declared by {owner} is already in use")]
    ModelNameCollision { model: String, owner: String },

    /// Same property name inherited or overridden with a different definition
    #[error("Property {property} of model {model} conflicts with the definition inherited from {other_model}")]
    PropertyConflict {
        model: String,
        property: String,
        other_model: String,
    },

    /// Model extends itself through its parents
    #[error("Inheritance cycle detected: {}", lineage.join(" -> "))]
    InheritanceCycle { lineage: Vec<String> },

    /// Model used before its manifest was loaded
    #[error("Model {model} is not loaded")]
    ModelNotLoaded { model: String },

    /// Property name not declared on the model
    #[error("Unknown property {property} on model {model}")]
    UnknownProperty { model: String, property: String },

    // ===== Value Errors =====
    /// Value or node does not have the expected model
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Value rejected by a restriction
    #[error("Value {value} does not satisfy restriction {restriction}: {message}")]
    ValueValidation {
        restriction: Restriction,
        value: String,
        message: String,
    },

    /// Array value does not match the expected array model
    #[error("Array shape mismatch for {model}: {reason}")]
    ArrayShape { model: String, reason: String },

    /// Required property has no value
    #[error("Missing required value {property} on model {model}")]
    MissingRequired { model: String, property: String },

    /// Two mutually exclusive properties are both set
    #[error("Properties {property} and {other} of model {model} are conflicting and cannot be both set")]
    Conflict {
        model: String,
        property: String,
        other: String,
    },

    /// Property set while one of its dependencies is not
    #[error("Property {property} of model {model} depends on {dependency} which is not set")]
    Dependency {
        model: String,
        property: String,
        dependency: String,
    },

    /// Object of an abstract model cannot be loaded
    #[error("Object of abstract model {model} cannot be loaded")]
    AbstractObject { model: String },

    /// Cast target outside the instance lineage
    #[error("Cannot cast object from {from} to {to}: {reason}")]
    Cast {
        from: String,
        to: String,
        reason: String,
    },

    /// Non main model given to the main collection
    #[error("Model {model} is not a main model")]
    NotMainModel { model: String },

    // ===== Identity / Graph Errors =====
    /// Two distinct instances share one identity partition key
    #[error("Duplicate identity: another object with id {id} already exists for model {model}")]
    DuplicateIdentity { model: String, id: String },

    /// Object graph contains itself
    #[error("Object of model {model} (id: {}) contains itself", id.as_deref().unwrap_or("none"))]
    SelfContainment { model: String, id: Option<String> },

    /// Foreign value not found in the traversed document
    #[error("Foreign value {id} of model {model} is not referenced in the document")]
    DanglingReference { model: String, id: String },

    /// Private id requested in a public context
    #[error("Cannot expose private id {property} of model {model}")]
    PrivateIdExposure { model: String, property: String },

    /// Foreign value without complete id
    #[error("Foreign value of model {model} has no complete id")]
    IncompleteForeignId { model: String },

    /// Handle does not designate the expected instance kind
    #[error("Invalid instance handle #{handle}: {reason}")]
    InvalidInstance { handle: u32, reason: String },

    // ===== Integration Errors =====
    /// External collaborator failure
    #[error("Provider error ({status}): {message}")]
    Provider {
        status: ProviderStatus,
        message: String,
    },

    /// Wire document encoding/decoding error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {message}")]
    Io { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },

    // ===== Locator =====
    /// Nested error raised while importing or exporting the value at `path`
    #[error("{source} (at {path})")]
    AtPath {
        path: String,
        source: Box<ComhonError>,
    },
}

impl ComhonError {
    /// Prepend a property or array-index segment to the error locator
    pub fn at(self, segment: &str) -> Self {
        match self {
            ComhonError::AtPath { path, source } => ComhonError::AtPath {
                path: format!("{}.{}", segment, path),
                source,
            },
            other => ComhonError::AtPath {
                path: segment.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Prepend every segment of `path`, outermost first
    pub fn at_path(self, path: &[String]) -> Self {
        path.iter().rev().fold(self, |err, segment| err.at(segment))
    }

    /// Innermost error, skipping path locators
    pub fn root_cause(&self) -> &ComhonError {
        match self {
            ComhonError::AtPath { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Dotted locator of the failing value, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            ComhonError::AtPath { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Canonical kind of the innermost error
    pub fn kind(&self) -> ExErrorKind {
        match self.root_cause() {
            ComhonError::Manifest { .. }
            | ComhonError::RestrictionNotAllowed { .. }
            | ComhonError::InvalidRestriction { .. } => ExErrorKind::Manifest,
            ComhonError::ModelNotFound { .. } => ExErrorKind::ModelNotFound,
            ComhonError::ModelNameCollision { .. } => ExErrorKind::ModelNameCollision,
            ComhonError::PropertyConflict { .. } | ComhonError::InheritanceCycle { .. } => {
                ExErrorKind::InheritanceConflict
            }
            ComhonError::ModelNotLoaded { .. } => ExErrorKind::NotLoaded,
            ComhonError::UnknownProperty { .. } => ExErrorKind::UnknownProperty,
            ComhonError::TypeMismatch { .. } | ComhonError::NotMainModel { .. } => {
                ExErrorKind::TypeMismatch
            }
            ComhonError::ValueValidation { .. } => ExErrorKind::ValueValidation,
            ComhonError::ArrayShape { .. } => ExErrorKind::ArrayShape,
            ComhonError::MissingRequired { .. } => ExErrorKind::MissingRequired,
            ComhonError::Conflict { .. } => ExErrorKind::Conflict,
            ComhonError::Dependency { .. } => ExErrorKind::Dependency,
            ComhonError::AbstractObject { .. } => ExErrorKind::AbstractObject,
            ComhonError::Cast { .. } => ExErrorKind::Cast,
            ComhonError::DuplicateIdentity { .. } => ExErrorKind::DuplicateIdentity,
            ComhonError::SelfContainment { .. } => ExErrorKind::SelfContainment,
            ComhonError::DanglingReference { .. } => ExErrorKind::DanglingReference,
            ComhonError::PrivateIdExposure { .. } => ExErrorKind::PrivateIdExposure,
            ComhonError::IncompleteForeignId { .. } => ExErrorKind::IncompleteForeignId,
            ComhonError::Provider { .. } => ExErrorKind::Provider,
            ComhonError::Serialization { .. } => ExErrorKind::Serialization,
            ComhonError::Config { .. } => ExErrorKind::Config,
            ComhonError::Io { .. } => ExErrorKind::Io,
            ComhonError::InvalidInstance { .. } | ComhonError::Internal { .. } => {
                ExErrorKind::Internal
            }
            ComhonError::AtPath { .. } => ExErrorKind::Internal,
        }
    }

    /// Model name carried by the innermost error, if any
    fn model_name(&self) -> Option<&str> {
        match self.root_cause() {
            ComhonError::Manifest { model, .. }
            | ComhonError::RestrictionNotAllowed { model, .. }
            | ComhonError::ModelNotFound { model }
            | ComhonError::ModelNameCollision { model, .. }
            | ComhonError::PropertyConflict { model, .. }
            | ComhonError::ModelNotLoaded { model }
            | ComhonError::UnknownProperty { model, .. }
            | ComhonError::ArrayShape { model, .. }
            | ComhonError::MissingRequired { model, .. }
            | ComhonError::Conflict { model, .. }
            | ComhonError::Dependency { model, .. }
            | ComhonError::AbstractObject { model }
            | ComhonError::NotMainModel { model }
            | ComhonError::DuplicateIdentity { model, .. }
            | ComhonError::SelfContainment { model, .. }
            | ComhonError::DanglingReference { model, .. }
            | ComhonError::PrivateIdExposure { model, .. }
            | ComhonError::IncompleteForeignId { model } => Some(model),
            ComhonError::Cast { from, .. } => Some(from),
            _ => None,
        }
    }
}

/// Extension to attach a locator segment to a failing result
pub(crate) trait ResultExt<T> {
    fn at(self, segment: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn at(self, segment: &str) -> Result<T> {
        self.map_err(|e| e.at(segment))
    }
}

/// Conversion from ComhonError to ExError
impl From<ComhonError> for ExError {
    fn from(err: ComhonError) -> Self {
        let mut ex = ExError::new(err.kind()).with_message(err.root_cause().to_string());
        if let Some(model) = err.model_name() {
            ex = ex.with_model(model);
        }
        if let Some(path) = err.path() {
            ex = ex.with_path(path);
        }
        ex
    }
}

impl From<&ComhonError> for ExError {
    fn from(err: &ComhonError) -> Self {
        err.clone().into()
    }
}

/// Conversion from serde_json::Error to ComhonError
impl From<serde_json::Error> for ComhonError {
    fn from(err: serde_json::Error) -> Self {
        ComhonError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ComhonError {
    fn from(err: std::io::Error) -> Self {
        ComhonError::Io {
            message: err.to_string(),
        }
    }
}
