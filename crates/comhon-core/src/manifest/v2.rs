//! Manifest dialect 2.0
//!
//! Properties carry a flat `type` string; arrays declare their element
//! under `values` and a single parent may be extended.

use super::{
    leaf_type, ArrayDecl, ManifestDialect, ManifestHeader, ManifestVersion, PropertyDeclKind,
    PropertyFlags, RestrictionFields, RestrictionSpec, SerializationDecl, TypeDecl, XmlMode,
};
use crate::model::AutoKind;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Top-level 2.0 manifest structure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestV2 {
    /// Dialect version, always `2.0`
    pub version: String,

    /// Short name, only present on local types
    #[serde(default)]
    pub name: Option<String>,

    /// Parent model
    #[serde(default)]
    pub extends: Option<String>,

    /// Objects are tracked by the main collection
    #[serde(default)]
    pub is_main: bool,

    /// Identity is shared with the parent model
    #[serde(default)]
    pub share_parent_id: bool,

    /// Groups of mutually exclusive properties
    #[serde(default)]
    pub conflicts: Vec<Vec<String>>,

    #[serde(default)]
    pub properties: Vec<PropertyV2>,

    /// Local types
    #[serde(default)]
    pub types: Vec<JsonValue>,

    #[serde(default)]
    pub serialization: Option<SerializationDecl>,
}

/// 2.0 property declaration
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyV2 {
    pub name: String,

    /// Scalar name, model name or `array`
    #[serde(rename = "type")]
    pub model: String,

    #[serde(default)]
    pub is_id: bool,

    #[serde(default)]
    pub is_private: bool,

    #[serde(default)]
    pub is_required: bool,

    #[serde(default)]
    pub not_null: bool,

    #[serde(default)]
    pub is_isolated: bool,

    #[serde(default)]
    pub is_foreign: bool,

    /// Array is a string-keyed map
    #[serde(default)]
    pub is_associative: bool,

    /// Properties that must be set when this one is
    #[serde(default)]
    pub depends: Vec<String>,

    #[serde(default)]
    pub default: Option<JsonValue>,

    #[serde(default)]
    pub xml: Option<XmlMode>,

    /// Element declaration of an array
    #[serde(default)]
    pub values: Option<ValuesV2>,

    /// Back-reference properties of a foreign array
    #[serde(default)]
    pub aggregations: Option<Vec<String>>,

    #[serde(default)]
    pub auto: Option<AutoKind>,

    #[serde(flatten)]
    pub restrictions: RestrictionFields,
}

/// 2.0 array element declaration
#[derive(Debug, Clone, Deserialize)]
pub struct ValuesV2 {
    /// Element node name
    pub name: String,

    #[serde(rename = "type")]
    pub model: String,

    #[serde(default)]
    pub not_null: bool,

    #[serde(default)]
    pub is_isolated: bool,

    #[serde(default)]
    pub is_associative: bool,

    #[serde(default)]
    pub values: Option<Box<ValuesV2>>,

    #[serde(flatten)]
    pub restrictions: RestrictionFields,
}

fn array_decl(
    values: &ValuesV2,
    associative: bool,
    restrictions: Vec<RestrictionSpec>,
) -> Result<TypeDecl, String> {
    let element = element_type(values)?;
    Ok(TypeDecl::Array(Box::new(ArrayDecl {
        element,
        element_name: values.name.clone(),
        associative,
        not_null_element: values.not_null,
        isolated_element: values.is_isolated,
        restrictions,
        element_restrictions: match values.model.as_str() {
            "array" => Vec::new(),
            _ => values.restrictions.specs(),
        },
    })))
}

fn element_type(values: &ValuesV2) -> Result<TypeDecl, String> {
    if values.model == "array" {
        let inner = values
            .values
            .as_ref()
            .ok_or_else(|| format!("array element {} without values", values.name))?;
        array_decl(inner, values.is_associative, values.restrictions.specs())
    } else if values.values.is_some() {
        Err(format!("element {} is not an array", values.name))
    } else {
        Ok(leaf_type(&values.model))
    }
}

impl ManifestDialect for ManifestV2 {
    type Property = PropertyV2;

    const VERSION: ManifestVersion = ManifestVersion::V2;

    fn header(&self) -> ManifestHeader {
        ManifestHeader {
            extends: self.extends.iter().cloned().collect(),
            is_main: self.is_main,
            is_abstract: false,
            share_parent_id: self.share_parent_id,
            shared_id: None,
            conflicts: self.conflicts.clone(),
            serialization: self.serialization.as_ref().map(|s| s.unit.clone()),
        }
    }

    fn properties(&self) -> &[PropertyV2] {
        &self.properties
    }

    fn local_types(&self) -> &[JsonValue] {
        &self.types
    }

    fn property_name(property: &PropertyV2) -> &str {
        &property.name
    }

    fn property_flags(property: &PropertyV2) -> PropertyFlags {
        PropertyFlags {
            is_id: property.is_id,
            is_private: property.is_private,
            is_required: property.is_required,
            not_null: property.not_null,
            is_isolated: property.is_isolated,
            as_node: property.xml == Some(XmlMode::Node),
            dependencies: property.depends.clone(),
        }
    }

    fn property_type(property: &PropertyV2) -> Result<TypeDecl, String> {
        let base = if property.model == "array" {
            let values = property
                .values
                .as_ref()
                .ok_or_else(|| "array without values".to_string())?;
            array_decl(values, property.is_associative, property.restrictions.specs())?
        } else if property.values.is_some() {
            return Err("values are only allowed on arrays".to_string());
        } else {
            leaf_type(&property.model)
        };
        if property.is_foreign || property.aggregations.is_some() {
            Ok(TypeDecl::Foreign(Box::new(base)))
        } else {
            Ok(base)
        }
    }

    fn property_kind(property: &PropertyV2) -> PropertyDeclKind {
        match (&property.aggregations, property.auto) {
            (Some(names), _) => PropertyDeclKind::Aggregation(names.clone()),
            (None, Some(auto)) => PropertyDeclKind::Auto(auto),
            (None, None) => PropertyDeclKind::Plain,
        }
    }

    fn property_restrictions(property: &PropertyV2) -> Vec<RestrictionSpec> {
        if property.model == "array" {
            Vec::new()
        } else {
            property.restrictions.specs()
        }
    }

    fn default_value(property: &PropertyV2) -> Option<&JsonValue> {
        property.default.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use crate::manifest::{parse, PropertyDeclKind, TypeDecl};
    use crate::model::SimpleKind;
    use serde_json::json;

    #[test]
    fn test_parse_person() {
        let doc = json!({
            "version": "2.0",
            "extends": "Test\\Being",
            "is_main": true,
            "properties": [
                {"name": "id", "type": "integer", "is_id": true},
                {"name": "firstName", "type": "string", "xml": "node"},
                {"name": "father", "type": "Test\\Person", "is_foreign": true},
                {
                    "name": "tags",
                    "type": "array",
                    "is_associative": true,
                    "size": "[0,3]",
                    "values": {"name": "tag", "type": "string", "enum": ["a", "b"]}
                }
            ]
        });
        let parsed = parse(&doc, "Test\\Person").unwrap();
        assert_eq!(parsed.extends, vec!["Test\\Being".to_string()]);
        assert!(parsed.is_main);
        assert_eq!(parsed.properties.len(), 4);
        assert!(parsed.properties[0].is_id);
        assert!(parsed.properties[1].as_node);
        assert_eq!(
            parsed.properties[2].type_decl,
            TypeDecl::Foreign(Box::new(TypeDecl::Model("Test\\Person".into())))
        );
        match &parsed.properties[3].type_decl {
            TypeDecl::Array(array) => {
                assert!(array.associative);
                assert_eq!(array.element, TypeDecl::Simple(SimpleKind::String));
                assert_eq!(array.restrictions.len(), 1);
                assert_eq!(array.element_restrictions.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_aggregation_on_foreign_array() {
        let doc = json!({
            "version": "2.0",
            "properties": [{
                "name": "children",
                "type": "array",
                "values": {"name": "child", "type": "Test\\Child"},
                "aggregations": ["mother"]
            }]
        });
        let parsed = parse(&doc, "Test\\Mother").unwrap();
        assert_eq!(
            parsed.properties[0].kind,
            PropertyDeclKind::Aggregation(vec!["mother".into()])
        );
        assert!(matches!(parsed.properties[0].type_decl, TypeDecl::Foreign(_)));
    }

    #[test]
    fn test_abstract_is_not_a_2_0_keyword() {
        let doc = json!({"version": "2.0", "is_abstract": true, "properties": []});
        assert!(parse(&doc, "A").is_err());
    }

    #[test]
    fn test_array_requires_values() {
        let doc = json!({"version": "2.0", "properties": [{"name": "a", "type": "array"}]});
        let err = parse(&doc, "A").unwrap_err();
        assert!(err.to_string().contains("array without values"));
    }
}
