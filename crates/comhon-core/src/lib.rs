//! Comhon Core - schema driven object modeling
//!
//! This crate loads model definitions from JSON manifests and works with
//! typed object graphs shaped by them:
//! - Manifest dialects 2.0 and 3.0, compiled into immutable models
//! - An async registry that loads each model once and coalesces
//!   concurrent loads
//! - Value restrictions (enumerations, intervals, regexes, sizes)
//! - Typed objects and arrays stored in an arena with identity tracking
//! - Import and export through JSON and XML interfacers
//! - Graph traversal with object search and validation visitors
//! - Loading of stored objects through a data provider

pub mod collection;
pub mod config;
pub mod context;
pub mod errors;
pub mod export;
pub mod import;
pub mod interfacer;
pub mod loader;
pub mod logging_facility;
pub mod manifest;
pub mod model;
pub mod object;
pub mod provider;
pub mod registry;
pub mod restriction;
pub mod value;
pub mod visitor;

// Used by the logging macros
pub use comhon_core_types;
#[doc(hidden)]
pub use tracing;

// Re-export commonly used types
pub use collection::{MainObjectCollection, ObjectCollection, ObjectCollectionInterfacer};
pub use config::ComhonConfig;
pub use context::Comhon;
pub use errors::{ComhonError, ExError, ExErrorKind, Result};
pub use interfacer::{Format, Interfacer, InterfacerOptions, JsonInterfacer, MergeType, XmlInterfacer};
pub use model::{Model, ModelArray, ModelType, Property, SimpleKind};
pub use object::{ComhonArray, ComhonObject, Instance, InstanceArena};
pub use registry::ModelRegistry;
pub use value::{InstanceRef, Value};
