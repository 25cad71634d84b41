//! Singer catalog: streams, their JSON schemas, and selection metadata.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CatalogError;
use crate::types::ReplicationState;

pub const INCLUSION_AUTOMATIC: &str = "automatic";
pub const INCLUSION_AVAILABLE: &str = "available";
pub const INCLUSION_UNSUPPORTED: &str = "unsupported";

pub const REPLICATION_INCREMENTAL: &str = "INCREMENTAL";
pub const REPLICATION_FULL_TABLE: &str = "FULL_TABLE";

/// JSON schema of one stream. Only `properties` is interpreted; every other
/// keyword is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<Value>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Schema {
    /// An `object` schema over the given properties.
    pub fn object(properties: BTreeMap<String, Value>) -> Self {
        Self {
            schema_type: Some(Value::String("object".to_string())),
            properties,
            extra: Map::new(),
        }
    }
}

/// One metadata entry; an empty breadcrumb addresses the stream itself,
/// `["properties", "<field>"]` addresses one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Metadata indexed by breadcrumb.
pub type MetadataMap = BTreeMap<Vec<String>, Map<String, Value>>;

/// Index metadata entries by breadcrumb. Later entries win.
pub fn to_map(entries: &[MetadataEntry]) -> MetadataMap {
    entries
        .iter()
        .map(|e| (e.breadcrumb.clone(), e.metadata.clone()))
        .collect()
}

/// Breadcrumb for a field.
pub fn property_breadcrumb(field: &str) -> Vec<String> {
    vec!["properties".to_string(), field.to_string()]
}

/// Whether a field survives metadata filtering.
///
/// `automatic` fields always do; `unsupported` fields and fields with
/// `selected: false` never do; anything else does.
pub fn field_selected(mdata: &MetadataMap, field: &str) -> bool {
    let Some(entry) = mdata.get(&property_breadcrumb(field)) else {
        return true;
    };
    match entry.get("inclusion").and_then(Value::as_str) {
        Some(INCLUSION_AUTOMATIC) => return true,
        Some(INCLUSION_UNSUPPORTED) => return false,
        _ => {}
    }
    entry.get("selected").and_then(Value::as_bool) != Some(false)
}

/// A stream as described in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    pub stream: String,
    pub schema: Schema,
    #[serde(default)]
    pub key_properties: Vec<String>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_method: Option<String>,
    /// Legacy stream-level selection flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

impl CatalogEntry {
    pub fn metadata_map(&self) -> MetadataMap {
        to_map(&self.metadata)
    }

    /// Selected via the legacy flag or stream-level `selected` metadata.
    pub fn is_selected(&self) -> bool {
        if self.selected == Some(true) {
            return true;
        }
        self.metadata_map()
            .get(&Vec::<String>::new())
            .and_then(|m| m.get("selected"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Root of a catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Load a catalog JSON file.
    pub fn load_at(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| CatalogError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn get_stream(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|s| s.tap_stream_id == tap_stream_id)
    }

    /// Selected streams in catalog order, rotated so an interrupted run
    /// resumes with the stream named by `currently_syncing`.
    pub fn selected_streams(&self, state: &ReplicationState) -> Vec<&CatalogEntry> {
        let selected: Vec<&CatalogEntry> = self.streams.iter().filter(|s| s.is_selected()).collect();
        let resume_at = state
            .currently_syncing
            .as_deref()
            .and_then(|current| selected.iter().position(|s| s.tap_stream_id == current));
        match resume_at {
            Some(idx) => {
                let mut rotated = selected[idx..].to_vec();
                rotated.extend_from_slice(&selected[..idx]);
                rotated
            }
            None => selected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, selected: bool) -> CatalogEntry {
        CatalogEntry {
            tap_stream_id: id.to_string(),
            stream: id.to_string(),
            schema: Schema::object(BTreeMap::new()),
            key_properties: vec![],
            metadata: vec![MetadataEntry {
                breadcrumb: vec![],
                metadata: json!({ "selected": selected }).as_object().unwrap().clone(),
            }],
            replication_key: None,
            replication_method: None,
            selected: None,
        }
    }

    fn ids(streams: &[&CatalogEntry]) -> Vec<String> {
        streams.iter().map(|s| s.tap_stream_id.clone()).collect()
    }

    #[test]
    fn unselected_streams_are_skipped() {
        let catalog = Catalog {
            streams: vec![entry("accounts", true), entry("leads", false), entry("audits", true)],
        };
        let selected = catalog.selected_streams(&ReplicationState::default());
        assert_eq!(ids(&selected), vec!["accounts", "audits"]);
    }

    #[test]
    fn currently_syncing_stream_goes_first() {
        let catalog = Catalog {
            streams: vec![entry("a", true), entry("b", true), entry("c", true)],
        };
        let state = ReplicationState {
            currently_syncing: Some("b".into()),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.selected_streams(&state)), vec!["b", "c", "a"]);
    }

    #[test]
    fn unknown_currently_syncing_keeps_catalog_order() {
        let catalog = Catalog {
            streams: vec![entry("a", true), entry("b", true)],
        };
        let state = ReplicationState {
            currently_syncing: Some("gone".into()),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.selected_streams(&state)), vec!["a", "b"]);
    }

    #[test]
    fn field_selection_rules() {
        let entries: Vec<MetadataEntry> = serde_json::from_value(json!([
            {"breadcrumb": ["properties", "id"], "metadata": {"inclusion": "automatic", "selected": false}},
            {"breadcrumb": ["properties", "name"], "metadata": {"inclusion": "available", "selected": false}},
            {"breadcrumb": ["properties", "blob"], "metadata": {"inclusion": "unsupported"}},
            {"breadcrumb": ["properties", "city"], "metadata": {"inclusion": "available"}}
        ]))
        .unwrap();
        let mdata = to_map(&entries);
        assert!(field_selected(&mdata, "id"));
        assert!(!field_selected(&mdata, "name"));
        assert!(!field_selected(&mdata, "blob"));
        assert!(field_selected(&mdata, "city"));
        assert!(field_selected(&mdata, "not_in_metadata"));
    }
}
