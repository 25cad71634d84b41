//! Entity descriptors and rows.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const MODIFIED_ON: &str = "modifiedon";
pub const CREATED_ON: &str = "createdon";

/// One row as returned by the Web API.
pub type Entity = Map<String, Value>;

/// Coded field name → raw option value → label.
pub type OptionSetMap = BTreeMap<String, BTreeMap<i64, String>>;

/// Value kind of an entity property, derived from the attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    String,
    Integer,
    Number,
    Boolean,
    DateTime,
    /// Picklist, state or status code; carries a companion label field.
    OptionSet,
    /// Foreign-key GUID, exposed as `_<name>_value`.
    Lookup,
    Guid,
}

impl PropertyKind {
    /// Map a Dataverse `AttributeType` onto a kind. Types the Web API does
    /// not return as plain columns map to `None`.
    pub fn from_attribute_type(attribute_type: &str) -> Option<Self> {
        let kind = match attribute_type {
            "String" | "Memo" | "EntityName" => Self::String,
            "Integer" | "BigInt" => Self::Integer,
            "Decimal" | "Double" | "Money" => Self::Number,
            "Boolean" => Self::Boolean,
            "DateTime" => Self::DateTime,
            "Picklist" | "State" | "Status" => Self::OptionSet,
            "Lookup" | "Customer" | "Owner" => Self::Lookup,
            "Uniqueidentifier" => Self::Guid,
            _ => return None,
        };
        Some(kind)
    }

    /// Nullable JSON-schema fragment for this kind.
    pub fn json_schema(self) -> Value {
        match self {
            Self::String | Self::Lookup => json!({ "type": ["null", "string"] }),
            Self::Guid => json!({ "type": ["null", "string"], "format": "uuid" }),
            Self::Integer | Self::OptionSet => json!({ "type": ["null", "integer"] }),
            Self::Number => json!({ "type": ["null", "number"] }),
            Self::Boolean => json!({ "type": ["null", "boolean"] }),
            Self::DateTime => json!({ "type": ["null", "string"], "format": "date-time" }),
        }
    }
}

/// A named column of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Name as it appears in Web API payloads.
    pub name: String,
    pub kind: PropertyKind,
}

/// Schema descriptor for one entity set, resolved once per stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    /// Web API collection name, e.g. `accounts`; also the stream id.
    pub entity_set: String,
    /// Metadata logical name, e.g. `account`.
    pub logical_name: String,
    pub primary_key: Option<String>,
    pub properties: Vec<Property>,
}

impl EntityType {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.entity_set.fmt(f)
    }
}

/// Web API column name for a lookup attribute.
pub fn lookup_value_name(logical_name: &str) -> String {
    format!("_{logical_name}_value")
}
