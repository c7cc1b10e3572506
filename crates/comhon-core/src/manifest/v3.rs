//! Manifest dialect 3.0
//!
//! Property and array value variants are discriminated by the reserved
//! `inheritance-` key, either fully qualified
//! (`Comhon\Manifest\Property\Index`) or by its short form (`Index`).
//! Models may extend several parents and be abstract.

use super::{
    ArrayDecl, ManifestDialect, ManifestHeader, ManifestVersion, PropertyDeclKind, PropertyFlags,
    RestrictionFields, RestrictionSpec, SerializationDecl, TypeDecl, XmlMode,
};
use crate::model::{AutoKind, SimpleKind};
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Top-level 3.0 manifest structure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestV3 {
    /// Dialect version, always `3.0`
    pub version: String,

    /// Short name, only present on local types
    #[serde(default)]
    pub name: Option<String>,

    /// One parent or an ordered list of parents
    #[serde(default)]
    pub extends: Option<Extends>,

    #[serde(default)]
    pub is_main: bool,

    /// Objects cannot be loaded; only descendants can
    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub share_parent_id: bool,

    /// Ancestor whose identity partition is shared
    #[serde(default)]
    pub shared_id: Option<String>,

    #[serde(default)]
    pub conflicts: Vec<Vec<String>>,

    #[serde(default)]
    pub properties: Vec<PropertyV3>,

    #[serde(default)]
    pub types: Vec<JsonValue>,

    #[serde(default)]
    pub serialization: Option<SerializationDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Extends {
    One(String),
    Many(Vec<String>),
}

/// Fields every 3.0 property carries
#[derive(Debug, Clone, Deserialize)]
pub struct CommonV3 {
    pub name: String,

    #[serde(default)]
    pub is_private: bool,

    #[serde(default)]
    pub is_required: bool,

    #[serde(default)]
    pub not_null: bool,

    #[serde(default)]
    pub depends: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScalarPropertyV3 {
    #[serde(flatten)]
    pub common: CommonV3,

    #[serde(default)]
    pub is_id: bool,

    #[serde(default)]
    pub default: Option<JsonValue>,

    #[serde(default)]
    pub xml: Option<XmlMode>,

    #[serde(default)]
    pub auto: Option<AutoKind>,

    #[serde(flatten)]
    pub restrictions: RestrictionFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectPropertyV3 {
    #[serde(flatten)]
    pub common: CommonV3,

    /// Complex model, local or full name
    pub model: String,

    #[serde(default)]
    pub is_foreign: bool,

    #[serde(default)]
    pub is_isolated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrayPropertyV3 {
    #[serde(flatten)]
    pub common: CommonV3,

    pub values: ValueV3,

    #[serde(default)]
    pub is_associative: bool,

    #[serde(default)]
    pub is_foreign: bool,

    #[serde(default)]
    pub is_isolated: bool,

    #[serde(flatten)]
    pub restrictions: RestrictionFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationPropertyV3 {
    #[serde(flatten)]
    pub common: CommonV3,

    pub values: ValueV3,

    /// Back-reference properties on the element model
    pub aggregations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "inheritance-")]
pub enum PropertyV3 {
    #[serde(rename = "Comhon\\Manifest\\Property\\String", alias = "String")]
    String(ScalarPropertyV3),
    #[serde(rename = "Comhon\\Manifest\\Property\\Integer", alias = "Integer")]
    Integer(ScalarPropertyV3),
    #[serde(rename = "Comhon\\Manifest\\Property\\Index", alias = "Index")]
    Index(ScalarPropertyV3),
    #[serde(rename = "Comhon\\Manifest\\Property\\Float", alias = "Float")]
    Float(ScalarPropertyV3),
    #[serde(rename = "Comhon\\Manifest\\Property\\Percentage", alias = "Percentage")]
    Percentage(ScalarPropertyV3),
    #[serde(rename = "Comhon\\Manifest\\Property\\Boolean", alias = "Boolean")]
    Boolean(ScalarPropertyV3),
    #[serde(rename = "Comhon\\Manifest\\Property\\DateTime", alias = "DateTime")]
    DateTime(ScalarPropertyV3),
    #[serde(rename = "Comhon\\Manifest\\Property\\Object", alias = "Object")]
    Object(ObjectPropertyV3),
    #[serde(rename = "Comhon\\Manifest\\Property\\Array", alias = "Array")]
    Array(ArrayPropertyV3),
    #[serde(rename = "Comhon\\Manifest\\Property\\Aggregation", alias = "Aggregation")]
    Aggregation(AggregationPropertyV3),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScalarValueV3 {
    /// Element node name
    pub name: String,

    #[serde(default)]
    pub not_null: bool,

    #[serde(flatten)]
    pub restrictions: RestrictionFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectValueV3 {
    pub name: String,

    pub model: String,

    #[serde(default)]
    pub not_null: bool,

    #[serde(default)]
    pub is_isolated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArrayValueV3 {
    pub name: String,

    pub values: Box<ValueV3>,

    #[serde(default)]
    pub not_null: bool,

    #[serde(default)]
    pub is_associative: bool,

    #[serde(flatten)]
    pub restrictions: RestrictionFields,
}

/// 3.0 array element declaration
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "inheritance-")]
pub enum ValueV3 {
    #[serde(rename = "Comhon\\Manifest\\Value\\String", alias = "String")]
    String(ScalarValueV3),
    #[serde(rename = "Comhon\\Manifest\\Value\\Integer", alias = "Integer")]
    Integer(ScalarValueV3),
    #[serde(rename = "Comhon\\Manifest\\Value\\Index", alias = "Index")]
    Index(ScalarValueV3),
    #[serde(rename = "Comhon\\Manifest\\Value\\Float", alias = "Float")]
    Float(ScalarValueV3),
    #[serde(rename = "Comhon\\Manifest\\Value\\Percentage", alias = "Percentage")]
    Percentage(ScalarValueV3),
    #[serde(rename = "Comhon\\Manifest\\Value\\Boolean", alias = "Boolean")]
    Boolean(ScalarValueV3),
    #[serde(rename = "Comhon\\Manifest\\Value\\DateTime", alias = "DateTime")]
    DateTime(ScalarValueV3),
    #[serde(rename = "Comhon\\Manifest\\Value\\Object", alias = "Object")]
    Object(ObjectValueV3),
    #[serde(rename = "Comhon\\Manifest\\Value\\Array", alias = "Array")]
    Array(ArrayValueV3),
}

impl PropertyV3 {
    fn common(&self) -> &CommonV3 {
        match self {
            PropertyV3::String(p)
            | PropertyV3::Integer(p)
            | PropertyV3::Index(p)
            | PropertyV3::Float(p)
            | PropertyV3::Percentage(p)
            | PropertyV3::Boolean(p)
            | PropertyV3::DateTime(p) => &p.common,
            PropertyV3::Object(p) => &p.common,
            PropertyV3::Array(p) => &p.common,
            PropertyV3::Aggregation(p) => &p.common,
        }
    }

    fn scalar(&self) -> Option<(SimpleKind, &ScalarPropertyV3)> {
        match self {
            PropertyV3::String(p) => Some((SimpleKind::String, p)),
            PropertyV3::Integer(p) => Some((SimpleKind::Integer, p)),
            PropertyV3::Index(p) => Some((SimpleKind::Index, p)),
            PropertyV3::Float(p) => Some((SimpleKind::Float, p)),
            PropertyV3::Percentage(p) => Some((SimpleKind::Percentage, p)),
            PropertyV3::Boolean(p) => Some((SimpleKind::Boolean, p)),
            PropertyV3::DateTime(p) => Some((SimpleKind::DateTime, p)),
            _ => None,
        }
    }
}

impl ValueV3 {
    fn name(&self) -> &str {
        match self {
            ValueV3::String(v)
            | ValueV3::Integer(v)
            | ValueV3::Index(v)
            | ValueV3::Float(v)
            | ValueV3::Percentage(v)
            | ValueV3::Boolean(v)
            | ValueV3::DateTime(v) => &v.name,
            ValueV3::Object(v) => &v.name,
            ValueV3::Array(v) => &v.name,
        }
    }

    fn not_null(&self) -> bool {
        match self {
            ValueV3::String(v)
            | ValueV3::Integer(v)
            | ValueV3::Index(v)
            | ValueV3::Float(v)
            | ValueV3::Percentage(v)
            | ValueV3::Boolean(v)
            | ValueV3::DateTime(v) => v.not_null,
            ValueV3::Object(v) => v.not_null,
            ValueV3::Array(v) => v.not_null,
        }
    }

    fn type_decl(&self) -> TypeDecl {
        match self {
            ValueV3::String(_) => TypeDecl::Simple(SimpleKind::String),
            ValueV3::Integer(_) => TypeDecl::Simple(SimpleKind::Integer),
            ValueV3::Index(_) => TypeDecl::Simple(SimpleKind::Index),
            ValueV3::Float(_) => TypeDecl::Simple(SimpleKind::Float),
            ValueV3::Percentage(_) => TypeDecl::Simple(SimpleKind::Percentage),
            ValueV3::Boolean(_) => TypeDecl::Simple(SimpleKind::Boolean),
            ValueV3::DateTime(_) => TypeDecl::Simple(SimpleKind::DateTime),
            ValueV3::Object(v) => TypeDecl::Model(v.model.clone()),
            ValueV3::Array(v) => array_decl(&v.values, v.is_associative, v.restrictions.specs()),
        }
    }

    fn element_restrictions(&self) -> Vec<RestrictionSpec> {
        match self {
            ValueV3::String(v)
            | ValueV3::Integer(v)
            | ValueV3::Index(v)
            | ValueV3::Float(v)
            | ValueV3::Percentage(v)
            | ValueV3::Boolean(v)
            | ValueV3::DateTime(v) => v.restrictions.specs(),
            ValueV3::Object(_) | ValueV3::Array(_) => Vec::new(),
        }
    }

    fn is_isolated(&self) -> bool {
        matches!(self, ValueV3::Object(v) if v.is_isolated)
    }
}

fn array_decl(values: &ValueV3, associative: bool, restrictions: Vec<RestrictionSpec>) -> TypeDecl {
    TypeDecl::Array(Box::new(ArrayDecl {
        element: values.type_decl(),
        element_name: values.name().to_string(),
        associative,
        not_null_element: values.not_null(),
        isolated_element: values.is_isolated(),
        restrictions,
        element_restrictions: values.element_restrictions(),
    }))
}

impl ManifestDialect for ManifestV3 {
    type Property = PropertyV3;

    const VERSION: ManifestVersion = ManifestVersion::V3;

    fn header(&self) -> ManifestHeader {
        ManifestHeader {
            extends: match &self.extends {
                None => Vec::new(),
                Some(Extends::One(parent)) => vec![parent.clone()],
                Some(Extends::Many(parents)) => parents.clone(),
            },
            is_main: self.is_main,
            is_abstract: self.is_abstract,
            share_parent_id: self.share_parent_id,
            shared_id: self.shared_id.clone(),
            conflicts: self.conflicts.clone(),
            serialization: self.serialization.as_ref().map(|s| s.unit.clone()),
        }
    }

    fn properties(&self) -> &[PropertyV3] {
        &self.properties
    }

    fn local_types(&self) -> &[JsonValue] {
        &self.types
    }

    fn property_name(property: &PropertyV3) -> &str {
        &property.common().name
    }

    fn property_flags(property: &PropertyV3) -> PropertyFlags {
        let common = property.common();
        let (is_id, as_node) = match property.scalar() {
            Some((_, scalar)) => (scalar.is_id, scalar.xml == Some(XmlMode::Node)),
            None => (false, true),
        };
        let is_isolated = match property {
            PropertyV3::Object(p) => p.is_isolated,
            PropertyV3::Array(p) => p.is_isolated,
            _ => false,
        };
        PropertyFlags {
            is_id,
            is_private: common.is_private,
            is_required: common.is_required,
            not_null: common.not_null,
            is_isolated,
            as_node,
            dependencies: common.depends.clone(),
        }
    }

    fn property_type(property: &PropertyV3) -> Result<TypeDecl, String> {
        if let Some((kind, _)) = property.scalar() {
            return Ok(TypeDecl::Simple(kind));
        }
        let decl = match property {
            PropertyV3::Object(p) => {
                let base = TypeDecl::Model(p.model.clone());
                if p.is_foreign {
                    TypeDecl::Foreign(Box::new(base))
                } else {
                    base
                }
            }
            PropertyV3::Array(p) => {
                let base = array_decl(&p.values, p.is_associative, p.restrictions.specs());
                if p.is_foreign {
                    TypeDecl::Foreign(Box::new(base))
                } else {
                    base
                }
            }
            PropertyV3::Aggregation(p) => {
                TypeDecl::Foreign(Box::new(array_decl(&p.values, false, Vec::new())))
            }
            _ => return Err("unsupported property variant".to_string()),
        };
        Ok(decl)
    }

    fn property_kind(property: &PropertyV3) -> PropertyDeclKind {
        match property {
            PropertyV3::Aggregation(p) => PropertyDeclKind::Aggregation(p.aggregations.clone()),
            _ => match property.scalar().and_then(|(_, s)| s.auto) {
                Some(auto) => PropertyDeclKind::Auto(auto),
                None => PropertyDeclKind::Plain,
            },
        }
    }

    fn property_restrictions(property: &PropertyV3) -> Vec<RestrictionSpec> {
        match property.scalar() {
            Some((_, scalar)) => scalar.restrictions.specs(),
            None => Vec::new(),
        }
    }

    fn default_value(property: &PropertyV3) -> Option<&JsonValue> {
        property.scalar().and_then(|(_, s)| s.default.as_ref())
    }
}
