//! Option-set label resolution.

use serde_json::Value;

use dynamics_client::{EntityType, OptionSetMap, Service};

use crate::error::SyncError;

/// Suffix of the companion field that carries an option's label.
pub const LABEL_SUFFIX: &str = "_label";

/// Name of the label field paired with a coded field.
pub fn label_field_name(field: &str) -> String {
    format!("{field}{LABEL_SUFFIX}")
}

/// Fetch the option labels for every coded field of `entity`.
///
/// Called once per stream, before any row is read.
pub fn resolve_optionset_map(
    service: &dyn Service,
    entity: &EntityType,
) -> Result<OptionSetMap, SyncError> {
    let map = service.optionset_map(entity)?;
    tracing::debug!(
        "{}: resolved labels for {} coded field(s)",
        entity.entity_set,
        map.len()
    );
    Ok(map)
}

/// Result of looking up one raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelLookup {
    /// Raw value was null; the label is the empty string.
    Null,
    Found(String),
    /// Raw value has no entry in the table.
    Missing,
}

impl LabelLookup {
    /// The value written into the label field.
    pub fn into_value(self) -> Value {
        match self {
            LabelLookup::Null => Value::String(String::new()),
            LabelLookup::Found(label) => Value::String(label),
            LabelLookup::Missing => Value::Null,
        }
    }
}

/// Look `raw` up in the labels of `field`. `field` must be a key of `map`.
pub fn lookup(map: &OptionSetMap, field: &str, raw: &Value) -> LabelLookup {
    if raw.is_null() {
        return LabelLookup::Null;
    }
    raw.as_i64()
        .and_then(|code| map.get(field)?.get(&code))
        .map(|label| LabelLookup::Found(label.clone()))
        .unwrap_or(LabelLookup::Missing)
}
