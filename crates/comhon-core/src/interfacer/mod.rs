//! Tree adapters for the wire formats
//!
//! Import and export are written once against the [`Interfacer`] contract.
//! [`JsonInterfacer`] works on `serde_json` trees, [`XmlInterfacer`] on a
//! small element tree read and written as XML text.

pub mod json;
pub mod xml;

pub use json::JsonInterfacer;
pub use xml::{XmlElement, XmlInterfacer};

use crate::errors::Result;
use serde::Deserialize;
use std::fmt;

/// Date time format used when no other format is configured
pub const DEFAULT_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Wire format of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar as it appears on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "boolean",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "string",
        }
    }

    /// Scalar view of a JSON literal; `None` for null, arrays and objects
    pub fn from_json(json: &serde_json::Value) -> Option<Scalar> {
        match json {
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Int(i)),
                None => n.as_f64().map(Scalar::Float),
            },
            serde_json::Value::String(s) => Some(Scalar::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Int(i) => serde_json::Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Scalar::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

/// Borrowed value read from a node
#[derive(Debug)]
pub enum InterfacedRef<'a, N> {
    Null,
    Scalar(Scalar),
    Node(&'a N),
}

/// Owned value written into a node
#[derive(Debug, Clone)]
pub enum InterfacedValue<N> {
    Null,
    Scalar(Scalar),
    Node(N),
}

/// How import combines a document with instances that already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeType {
    /// Reuse known instances, keep the values the document does not carry
    #[default]
    Merge,
    /// Reuse known instances, clear their values first
    Overwrite,
    /// Always build fresh instances, ignore every identity collection
    NoMerge,
}

/// Options of one import or export
#[derive(Debug, Clone, PartialEq)]
pub struct InterfacerOptions {
    /// Private properties are read and written only in private context
    pub private: bool,
    /// Export only updated values; ids are always exported
    pub only_updated_values: bool,
    /// Export only these properties of the root object; ids are always exported
    pub property_filter: Option<Vec<String>>,
    /// Embed complex values of the root object as literal strings,
    /// foreign references excepted
    pub flatten_values: bool,
    pub merge: MergeType,
    /// Validate imported objects once the whole document is read
    pub validate: bool,
    /// Check that foreign values are present in the document
    pub verify_references: bool,
    /// Flag imported values as updated
    pub flag_values_as_updated: bool,
    pub date_time_format: String,
}

impl Default for InterfacerOptions {
    fn default() -> Self {
        Self {
            private: false,
            only_updated_values: false,
            property_filter: None,
            flatten_values: false,
            merge: MergeType::Merge,
            validate: true,
            verify_references: true,
            flag_values_as_updated: true,
            date_time_format: DEFAULT_DATE_TIME_FORMAT.to_string(),
        }
    }
}

impl InterfacerOptions {
    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn with_only_updated_values(mut self, only_updated: bool) -> Self {
        self.only_updated_values = only_updated;
        self
    }

    pub fn with_property_filter<S: Into<String>>(mut self, properties: impl IntoIterator<Item = S>) -> Self {
        self.property_filter = Some(properties.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_flatten_values(mut self, flatten: bool) -> Self {
        self.flatten_values = flatten;
        self
    }

    pub fn with_merge(mut self, merge: MergeType) -> Self {
        self.merge = merge;
        self
    }

    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_verify_references(mut self, verify: bool) -> Self {
        self.verify_references = verify;
        self
    }

    pub fn with_flag_values_as_updated(mut self, flag: bool) -> Self {
        self.flag_values_as_updated = flag;
        self
    }

    pub fn with_date_time_format(mut self, format: impl Into<String>) -> Self {
        self.date_time_format = format.into();
        self
    }
}

/// Uniform access to the nodes of one wire format
///
/// `as_node` tells a backend that distinguishes attributes from child
/// nodes where a value belongs. Backends without that distinction ignore
/// it.
pub trait Interfacer {
    type Node: Clone + fmt::Debug;

    fn format(&self) -> Format;

    fn create_node(&self, name: &str) -> Self::Node;

    fn create_array_node(&self, name: &str, associative: bool) -> Self::Node;

    fn is_array_node(&self, node: &Self::Node) -> bool;

    /// Value stored under `name`, `None` when absent
    fn get_value<'a>(
        &self,
        node: &'a Self::Node,
        name: &str,
        as_node: bool,
    ) -> Option<InterfacedRef<'a, Self::Node>>;

    fn has_value(&self, node: &Self::Node, name: &str, as_node: bool) -> bool {
        self.get_value(node, name, as_node).is_some()
    }

    fn is_null_value(&self, node: &Self::Node, name: &str, as_node: bool) -> bool {
        matches!(self.get_value(node, name, as_node), Some(InterfacedRef::Null))
    }

    fn is_node_value(&self, node: &Self::Node, name: &str, as_node: bool) -> bool {
        matches!(self.get_value(node, name, as_node), Some(InterfacedRef::Node(_)))
    }

    fn is_array_node_value(&self, node: &Self::Node, name: &str, as_node: bool) -> bool {
        matches!(
            self.get_value(node, name, as_node),
            Some(InterfacedRef::Node(child)) if self.is_array_node(child)
        )
    }

    /// Store `value` under `name`, replacing any previous value
    fn set_value(&self, node: &mut Self::Node, name: &str, value: InterfacedValue<Self::Node>, as_node: bool);

    fn unset_value(&self, node: &mut Self::Node, name: &str, as_node: bool);

    /// Replace an existing value; absent values are left absent
    fn replace_value(&self, node: &mut Self::Node, name: &str, value: InterfacedValue<Self::Node>, as_node: bool) {
        if self.has_value(node, name, as_node) {
            self.unset_value(node, name, as_node);
            self.set_value(node, name, value, as_node);
        }
    }

    /// Append to an ordered array node
    fn add_value(&self, array: &mut Self::Node, value: InterfacedValue<Self::Node>, element_name: &str);

    /// Insert under `key` in an associative array node
    fn add_associative_value(
        &self,
        array: &mut Self::Node,
        key: &str,
        value: InterfacedValue<Self::Node>,
        element_name: &str,
    );

    /// Entries of an array node, keyed when `associative`
    ///
    /// # Errors
    ///
    /// Returns `ArrayShape` when the node is not shaped as requested.
    fn array_entries<'a>(
        &self,
        array: &'a Self::Node,
        associative: bool,
    ) -> Result<Vec<(Option<String>, InterfacedRef<'a, Self::Node>)>>;

    /// Scalar carried by a node itself, for backends that write scalars as
    /// text nodes
    fn node_scalar(&self, node: &Self::Node) -> Option<Scalar>;

    /// Nested nodes of `node`, in document order
    fn child_nodes<'a>(&self, node: &'a Self::Node) -> Vec<&'a Self::Node>;

    /// # Errors
    ///
    /// Returns `Serialization` if the node cannot be written.
    fn to_string(&self, node: &Self::Node, pretty: bool) -> Result<String>;

    /// # Errors
    ///
    /// Returns `Serialization` for malformed documents.
    fn from_string(&self, text: &str) -> Result<Self::Node>;

    /// Replace the node stored under `name` by its serialized text
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the node cannot be written.
    fn flatten_node(&self, node: &mut Self::Node, name: &str) -> Result<()>;

    /// Parse back a value embedded by [`Interfacer::flatten_node`]; text
    /// that does not hold an embedded node is left as is
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the embedded text is malformed.
    fn unflatten_node(&self, node: &mut Self::Node, name: &str) -> Result<()>;

    /// Hook run on the root once a whole export is written
    fn finalize_export(&self, _root: &mut Self::Node) {}
}
