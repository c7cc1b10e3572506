//! Manifest parsing
//!
//! A manifest document is deserialized into the schema type of its dialect
//! (`2.0` or `3.0`), then normalized by a single base algorithm into a
//! [`ParsedManifest`]. Dialects only answer a handful of lookups through
//! [`ManifestDialect`]; every structural check lives here.

pub mod v2;
pub mod v3;

use crate::errors::{ComhonError, Result};
use crate::model::{AutoKind, SimpleKind};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;

/// Reserved key carrying the concrete model of a polymorphic value
pub const INHERITANCE_KEY: &str = "inheritance-";
/// Reserved key of associative array entries in tree formats
pub const ASSOCIATIVE_KEY: &str = "key-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestVersion {
    V2,
    V3,
}

impl ManifestVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestVersion::V2 => "2.0",
            ManifestVersion::V3 => "3.0",
        }
    }
}

impl fmt::Display for ManifestVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialization settings of a requestable model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SerializationDecl {
    /// Name of the storage unit the data provider serves the model from
    pub unit: String,
}

/// Scalar interfacing mode in tree formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum XmlMode {
    Node,
    Attribute,
}

/// Restriction as declared, before compilation
#[derive(Debug, Clone, PartialEq)]
pub enum RestrictionSpec {
    Enum(Vec<JsonValue>),
    Interval(String),
    Length(String),
    Size(String),
    /// Named regex resolved through the manifest provider
    Pattern(String),
    Regex(String),
    NotNull,
    NotEmpty,
}

impl RestrictionSpec {
    pub fn label(&self) -> &'static str {
        match self {
            RestrictionSpec::Enum(_) => "enum",
            RestrictionSpec::Interval(_) => "interval",
            RestrictionSpec::Length(_) => "length",
            RestrictionSpec::Size(_) => "size",
            RestrictionSpec::Pattern(_) => "pattern",
            RestrictionSpec::Regex(_) => "regex",
            RestrictionSpec::NotNull => "not_null",
            RestrictionSpec::NotEmpty => "not_empty",
        }
    }

    fn allowed_on(&self, target: &TypeDecl) -> bool {
        match (self, target) {
            (RestrictionSpec::NotNull, _) => true,
            (RestrictionSpec::Enum(_), TypeDecl::Simple(kind)) => matches!(
                kind,
                SimpleKind::String
                    | SimpleKind::Integer
                    | SimpleKind::Index
                    | SimpleKind::Float
                    | SimpleKind::Percentage
            ),
            (RestrictionSpec::Interval(_), TypeDecl::Simple(kind)) => {
                kind.interval_domain().is_some()
            }
            (
                RestrictionSpec::Length(_) | RestrictionSpec::Pattern(_) | RestrictionSpec::Regex(_),
                TypeDecl::Simple(SimpleKind::String),
            ) => true,
            (RestrictionSpec::NotEmpty, TypeDecl::Simple(SimpleKind::String)) => true,
            (RestrictionSpec::NotEmpty | RestrictionSpec::Size(_), TypeDecl::Array(_)) => true,
            _ => false,
        }
    }
}

/// Declared restriction fields shared by both dialects
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestrictionFields {
    /// Allowed values
    #[serde(rename = "enum", default)]
    pub enumeration: Option<Vec<JsonValue>>,
    /// Value interval, e.g. `[0,10[`
    #[serde(default)]
    pub interval: Option<String>,
    /// Named regex
    #[serde(default)]
    pub pattern: Option<String>,
    /// Inline regex
    #[serde(default)]
    pub regex: Option<String>,
    /// String length interval
    #[serde(default)]
    pub length: Option<String>,
    /// Array size interval
    #[serde(default)]
    pub size: Option<String>,
    /// Empty strings or arrays are rejected
    #[serde(default)]
    pub not_empty: bool,
}

impl RestrictionFields {
    pub(crate) fn specs(&self) -> Vec<RestrictionSpec> {
        let mut specs = Vec::new();
        if let Some(values) = &self.enumeration {
            specs.push(RestrictionSpec::Enum(values.clone()));
        }
        if let Some(interval) = &self.interval {
            specs.push(RestrictionSpec::Interval(interval.clone()));
        }
        if let Some(pattern) = &self.pattern {
            specs.push(RestrictionSpec::Pattern(pattern.clone()));
        }
        if let Some(regex) = &self.regex {
            specs.push(RestrictionSpec::Regex(regex.clone()));
        }
        if let Some(length) = &self.length {
            specs.push(RestrictionSpec::Length(length.clone()));
        }
        if let Some(size) = &self.size {
            specs.push(RestrictionSpec::Size(size.clone()));
        }
        if self.not_empty {
            specs.push(RestrictionSpec::NotEmpty);
        }
        specs
    }
}

/// Declared model of a property or array element
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    Simple(SimpleKind),
    /// Complex model, by local or full name
    Model(String),
    Array(Box<ArrayDecl>),
    Foreign(Box<TypeDecl>),
}

impl TypeDecl {
    /// Leaf declaration under foreign and array wrappers
    pub fn leaf(&self) -> &TypeDecl {
        match self {
            TypeDecl::Foreign(inner) => inner.leaf(),
            TypeDecl::Array(array) => array.element.leaf(),
            other => other,
        }
    }

    fn without_foreign(&self) -> &TypeDecl {
        match self {
            TypeDecl::Foreign(inner) => inner,
            other => other,
        }
    }

    fn describe(&self) -> String {
        match self {
            TypeDecl::Simple(kind) => kind.name().to_string(),
            TypeDecl::Model(name) => name.clone(),
            TypeDecl::Array(array) => format!("array<{}>", array.element.describe()),
            TypeDecl::Foreign(inner) => format!("foreign {}", inner.describe()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDecl {
    pub element: TypeDecl,
    pub element_name: String,
    pub associative: bool,
    pub not_null_element: bool,
    pub isolated_element: bool,
    /// Restrictions on the array (size, emptiness)
    pub restrictions: Vec<RestrictionSpec>,
    pub element_restrictions: Vec<RestrictionSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDeclKind {
    Plain,
    Aggregation(Vec<String>),
    Auto(AutoKind),
}

/// Normalized property declaration
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    pub type_decl: TypeDecl,
    pub kind: PropertyDeclKind,
    pub is_id: bool,
    pub is_private: bool,
    pub is_required: bool,
    pub not_null: bool,
    pub is_isolated: bool,
    pub as_node: bool,
    pub default: Option<JsonValue>,
    pub restrictions: Vec<RestrictionSpec>,
    pub dependencies: Vec<String>,
}

/// Normalized manifest, independent of its dialect
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedManifest {
    pub version: ManifestVersion,
    pub extends: Vec<String>,
    pub is_main: bool,
    pub is_abstract: bool,
    pub share_parent_id: bool,
    pub shared_id: Option<String>,
    pub conflicts: Vec<Vec<String>>,
    pub properties: Vec<PropertyDecl>,
    /// Local types as `(short name, manifest document)`
    pub local_types: Vec<(String, JsonValue)>,
    pub serialization: Option<String>,
}

/// Model-level fields of a dialect
pub(crate) struct ManifestHeader {
    pub extends: Vec<String>,
    pub is_main: bool,
    pub is_abstract: bool,
    pub share_parent_id: bool,
    pub shared_id: Option<String>,
    pub conflicts: Vec<Vec<String>>,
    pub serialization: Option<String>,
}

/// Property-level flags of a dialect
pub(crate) struct PropertyFlags {
    pub is_id: bool,
    pub is_private: bool,
    pub is_required: bool,
    pub not_null: bool,
    pub is_isolated: bool,
    pub as_node: bool,
    pub dependencies: Vec<String>,
}

/// Lookups through which the base algorithm reads a dialect
pub(crate) trait ManifestDialect: DeserializeOwned {
    type Property;

    const VERSION: ManifestVersion;

    fn header(&self) -> ManifestHeader;

    fn properties(&self) -> &[Self::Property];

    fn local_types(&self) -> &[JsonValue];

    fn property_name(property: &Self::Property) -> &str;

    fn property_flags(property: &Self::Property) -> PropertyFlags;

    fn property_type(property: &Self::Property) -> std::result::Result<TypeDecl, String>;

    fn property_kind(property: &Self::Property) -> PropertyDeclKind;

    /// Restrictions on the property value itself; array restrictions are
    /// carried by the [`ArrayDecl`]
    fn property_restrictions(property: &Self::Property) -> Vec<RestrictionSpec>;

    fn default_value(property: &Self::Property) -> Option<&JsonValue>;
}

/// Parse the manifest document of `model`
///
/// # Errors
///
/// Returns `Manifest` for unsupported versions, malformed documents and
/// misuse of reserved words, and `RestrictionNotAllowed` for restrictions
/// declared on a model that cannot carry them.
pub fn parse(document: &JsonValue, model: &str) -> Result<ParsedManifest> {
    let malformed = |reason: String| ComhonError::Manifest {
        model: model.to_string(),
        reason,
    };

    let version = document
        .get("version")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| malformed("missing manifest version".to_string()))?;

    match version {
        "2.0" => normalize::<v2::ManifestV2>(document, model),
        "3.0" => normalize::<v3::ManifestV3>(document, model),
        other => Err(malformed(format!("unsupported manifest version '{}'", other))),
    }
}

fn is_reserved_name(name: &str) -> bool {
    name.is_empty()
        || name == INHERITANCE_KEY
        || name == ASSOCIATIVE_KEY
        || name.starts_with("xmlns")
        || name.contains('\\')
}

fn normalize<D: ManifestDialect>(document: &JsonValue, model: &str) -> Result<ParsedManifest> {
    let malformed = |reason: String| ComhonError::Manifest {
        model: model.to_string(),
        reason,
    };

    let manifest: D = serde_json::from_value(document.clone()).map_err(|e| malformed(e.to_string()))?;
    let header = manifest.header();

    if header.share_parent_id && header.shared_id.is_some() {
        return Err(malformed(
            "share_parent_id and shared_id cannot be used together".to_string(),
        ));
    }
    if header.share_parent_id && header.extends.is_empty() {
        return Err(malformed("share_parent_id requires a parent model".to_string()));
    }
    let mut seen_parents = HashSet::new();
    for parent in &header.extends {
        if !seen_parents.insert(parent.as_str()) {
            return Err(malformed(format!("model {} is extended twice", parent)));
        }
    }

    let mut names = HashSet::new();
    let mut properties = Vec::with_capacity(manifest.properties().len());
    for raw in manifest.properties() {
        let name = D::property_name(raw);
        if is_reserved_name(name) {
            return Err(malformed(format!("'{}' is a reserved property name", name)));
        }
        if !names.insert(name.to_string()) {
            return Err(malformed(format!("property {} is declared twice", name)));
        }
        let property = normalize_property::<D>(raw, model)?;
        properties.push(property);
    }

    for group in &header.conflicts {
        if group.len() < 2 {
            return Err(malformed(
                "a conflict group must name at least two properties".to_string(),
            ));
        }
    }

    let mut local_types = Vec::new();
    let mut local_names = HashSet::new();
    for entry in manifest.local_types() {
        let name = entry
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| malformed("local type without name".to_string()))?;
        if name.is_empty() || name.contains('\\') {
            return Err(malformed(format!("invalid local type name '{}'", name)));
        }
        if !local_names.insert(name.to_string()) {
            return Err(ComhonError::ModelNameCollision {
                model: format!("{}\\{}", model, name),
                owner: model.to_string(),
            });
        }
        let mut local_document = entry.clone();
        if let JsonValue::Object(map) = &mut local_document {
            map.remove("name");
            map.insert(
                "version".to_string(),
                JsonValue::String(D::VERSION.as_str().to_string()),
            );
        }
        local_types.push((name.to_string(), local_document));
    }

    Ok(ParsedManifest {
        version: D::VERSION,
        extends: header.extends,
        is_main: header.is_main,
        is_abstract: header.is_abstract,
        share_parent_id: header.share_parent_id,
        shared_id: header.shared_id,
        conflicts: header.conflicts,
        properties,
        local_types,
        serialization: header.serialization,
    })
}

fn normalize_property<D: ManifestDialect>(raw: &D::Property, model: &str) -> Result<PropertyDecl> {
    let name = D::property_name(raw).to_string();
    let malformed = |reason: String| ComhonError::Manifest {
        model: model.to_string(),
        reason: format!("property {}: {}", name, reason),
    };

    let type_decl = D::property_type(raw).map_err(malformed)?;
    let flags = D::property_flags(raw);
    let kind = D::property_kind(raw);
    let restrictions = D::property_restrictions(raw);
    let default = D::default_value(raw).cloned();

    let target = type_decl.without_foreign();
    check_restrictions(&restrictions, target, model)?;
    if let TypeDecl::Array(array) = target {
        check_array(array, model)?;
    }

    if flags.is_id && !matches!(type_decl, TypeDecl::Simple(_)) {
        return Err(malformed("id property must be a scalar".to_string()));
    }
    if flags.is_isolated
        && (matches!(type_decl.leaf(), TypeDecl::Simple(_))
            || matches!(type_decl, TypeDecl::Foreign(_)))
    {
        return Err(malformed(
            "only inline complex values can be isolated".to_string(),
        ));
    }
    if default.is_some() && !matches!(type_decl, TypeDecl::Simple(_)) {
        return Err(malformed("only scalar properties have default values".to_string()));
    }
    match &kind {
        PropertyDeclKind::Aggregation(names) => {
            let valid_shape = matches!(&type_decl, TypeDecl::Foreign(inner)
                if matches!(inner.as_ref(), TypeDecl::Array(a) if matches!(a.element, TypeDecl::Model(_))));
            if !valid_shape {
                return Err(malformed(
                    "aggregation must be a foreign array of objects".to_string(),
                ));
            }
            if names.is_empty() {
                return Err(malformed("aggregation without back-reference".to_string()));
            }
        }
        PropertyDeclKind::Auto(auto) => {
            let valid = matches!(
                (auto, &type_decl),
                (
                    AutoKind::Incremental,
                    TypeDecl::Simple(SimpleKind::Integer | SimpleKind::Index)
                ) | (AutoKind::DateTime, TypeDecl::Simple(SimpleKind::DateTime))
            );
            if !valid {
                return Err(malformed(format!(
                    "auto value cannot be generated for {}",
                    type_decl.describe()
                )));
            }
        }
        PropertyDeclKind::Plain => {}
    }

    Ok(PropertyDecl {
        name,
        type_decl,
        kind,
        is_id: flags.is_id,
        is_private: flags.is_private,
        is_required: flags.is_required,
        not_null: flags.not_null,
        is_isolated: flags.is_isolated,
        as_node: flags.as_node,
        default,
        restrictions,
        dependencies: flags.dependencies,
    })
}

fn check_restrictions(specs: &[RestrictionSpec], target: &TypeDecl, model: &str) -> Result<()> {
    for spec in specs {
        if !spec.allowed_on(target) {
            return Err(ComhonError::RestrictionNotAllowed {
                restriction: spec.label().to_string(),
                model: format!("{} ({})", target.describe(), model),
            });
        }
    }
    Ok(())
}

fn check_array(array: &ArrayDecl, model: &str) -> Result<()> {
    check_restrictions(&array.restrictions, &TypeDecl::Array(Box::new(array.clone())), model)?;
    check_restrictions(&array.element_restrictions, array.element.without_foreign(), model)?;
    if let TypeDecl::Array(inner) = array.element.without_foreign() {
        check_array(inner, model)?;
    }
    if is_reserved_name(&array.element_name) {
        return Err(ComhonError::Manifest {
            model: model.to_string(),
            reason: format!("'{}' is a reserved element name", array.element_name),
        });
    }
    Ok(())
}

/// Resolve a 2.0 `type` or 3.0 leaf name to a declaration
pub(crate) fn leaf_type(name: &str) -> TypeDecl {
    match SimpleKind::from_name(name) {
        Some(kind) => TypeDecl::Simple(kind),
        None => TypeDecl::Model(name.to_string()),
    }
}
