//! Schema discovery: entity descriptors to a Singer catalog.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use dynamics_client::{EntityType, PropertyKind, Service};
use dynamics_core::catalog::{
    property_breadcrumb, INCLUSION_AUTOMATIC, INCLUSION_AVAILABLE, REPLICATION_FULL_TABLE,
    REPLICATION_INCREMENTAL,
};
use dynamics_core::{Catalog, CatalogEntry, MetadataEntry, Schema};

use crate::driver::{determine_mode, ReplicationMode};
use crate::error::SyncError;
use crate::labels::label_field_name;

/// One catalog stream per readable entity set. No stream is pre-selected.
pub fn discover(service: &dyn Service) -> Result<Catalog, SyncError> {
    let streams: Vec<CatalogEntry> = service.entity_types()?.iter().map(catalog_entry).collect();
    tracing::info!("discovered {} stream(s)", streams.len());
    Ok(Catalog { streams })
}

/// Catalog entry for one entity set.
pub fn catalog_entry(entity: &EntityType) -> CatalogEntry {
    let mode = determine_mode(entity);
    let key_properties: Vec<String> = entity.primary_key.iter().cloned().collect();
    let replication_key = mode.replication_field().map(str::to_string);

    let mut properties = BTreeMap::new();
    let mut metadata = vec![stream_metadata(&key_properties, &mode)];

    for property in &entity.properties {
        properties.insert(property.name.clone(), property.kind.json_schema());
        let automatic = key_properties.contains(&property.name)
            || replication_key.as_deref() == Some(property.name.as_str());
        metadata.push(property_metadata(&property.name, automatic));

        if property.kind == PropertyKind::OptionSet {
            let label = label_field_name(&property.name);
            properties.insert(label.clone(), json!({ "type": ["null", "string"] }));
            metadata.push(property_metadata(&label, false));
        }
    }

    let replication_method = match mode {
        ReplicationMode::Incremental { .. } => REPLICATION_INCREMENTAL,
        ReplicationMode::Full => REPLICATION_FULL_TABLE,
    };

    CatalogEntry {
        tap_stream_id: entity.entity_set.clone(),
        stream: entity.entity_set.clone(),
        schema: Schema::object(properties),
        key_properties,
        metadata,
        replication_key,
        replication_method: Some(replication_method.to_string()),
        selected: None,
    }
}

fn stream_metadata(key_properties: &[String], mode: &ReplicationMode) -> MetadataEntry {
    let (valid_keys, method): (Vec<&str>, &str) = match mode {
        ReplicationMode::Incremental { field } => (vec![field.as_str()], REPLICATION_INCREMENTAL),
        ReplicationMode::Full => (Vec::new(), REPLICATION_FULL_TABLE),
    };
    MetadataEntry {
        breadcrumb: Vec::new(),
        metadata: object(json!({
            "table-key-properties": key_properties,
            "valid-replication-keys": valid_keys,
            "forced-replication-method": method,
        })),
    }
}

fn property_metadata(field: &str, automatic: bool) -> MetadataEntry {
    let inclusion = if automatic {
        INCLUSION_AUTOMATIC
    } else {
        INCLUSION_AVAILABLE
    };
    MetadataEntry {
        breadcrumb: property_breadcrumb(field),
        metadata: object(json!({ "inclusion": inclusion })),
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
