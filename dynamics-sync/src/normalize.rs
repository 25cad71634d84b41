//! Record normalizer: one entity row in, one flat record out.
//!
//! Steps, in order:
//! 1. Read every property the entity descriptor declares.
//! 2. Reformat date-time values as UTC RFC 3339.
//! 3. Add a `<field>_label` companion for every coded field.
//! 4. Repair lookup columns that arrive as the text `"None"`.

use serde_json::Value;

use dynamics_client::{Entity, EntityType, OptionSetMap, PropertyKind};
use dynamics_core::{format_datetime, parse_datetime, Record, Watermark};

use crate::labels::{label_field_name, lookup, LabelLookup};

/// A coded value with no label in the option-set table.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingLabel {
    pub field: String,
    pub value: Value,
}

/// Output of [`normalize_entity`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: Record,
    pub missing_labels: Vec<MissingLabel>,
}

/// Normalize one row against its stream's descriptor and option sets.
///
/// Properties absent from the row are emitted as null. Missing labels are
/// logged at `warn` and reported, never fatal.
pub fn normalize_entity(
    entity: &Entity,
    entity_type: &EntityType,
    optionsets: &OptionSetMap,
) -> NormalizedRecord {
    let mut record = Record::new();
    let mut missing_labels = Vec::new();

    for property in &entity_type.properties {
        let raw = entity.get(&property.name).cloned().unwrap_or(Value::Null);
        let value = match property.kind {
            PropertyKind::DateTime => format_datetime_value(raw),
            _ => raw,
        };

        if optionsets.contains_key(&property.name) {
            let found = lookup(optionsets, &property.name, &value);
            if found == LabelLookup::Missing {
                tracing::warn!("Label not found for value `{}` on `{}`", value, property.name);
                missing_labels.push(MissingLabel {
                    field: property.name.clone(),
                    value: value.clone(),
                });
            }
            record.insert(label_field_name(&property.name), found.into_value());
        }

        record.insert(property.name.clone(), value);
    }

    repair_null_strings(&mut record);

    NormalizedRecord {
        record,
        missing_labels,
    }
}

/// Reformat a date-time string; anything unparsable passes through.
fn format_datetime_value(raw: Value) -> Value {
    match &raw {
        Value::String(s) => parse_datetime(s)
            .map(|dt| Value::String(format_datetime(dt)))
            .unwrap_or(raw),
        _ => raw,
    }
}

/// Whether `field` is named like a lookup value column (`_<name>_value`).
pub fn is_lookup_value_field(field: &str) -> bool {
    field.starts_with('_') && field.to_ascii_lowercase().ends_with("_value")
}

/// Null out lookup value columns that hold the literal text `"None"`.
///
/// Upstream serialises a null foreign key this way; no other field and no
/// other text is touched.
pub fn repair_null_strings(record: &mut Record) {
    for (field, value) in record.iter_mut() {
        if is_lookup_value_field(field) && value.as_str() == Some("None") {
            *value = Value::Null;
        }
    }
}

/// Running maximum of a stream's replication field.
#[derive(Debug, Clone)]
pub struct WatermarkTracker {
    field: Option<String>,
    max: Watermark,
}

impl WatermarkTracker {
    /// `field` is `None` for full-table streams; the watermark then never moves.
    pub fn new(field: Option<String>, initial: Watermark) -> Self {
        Self { field, max: initial }
    }

    /// Advance the maximum if `record`'s replication value is later.
    ///
    /// Once the maximum is a timestamp, values that do not parse are skipped.
    pub fn observe(&mut self, record: &Record) {
        let Some(field) = &self.field else {
            return;
        };
        let Some(value) = record.get(field).and_then(Value::as_str) else {
            return;
        };
        let candidate = Watermark::from(value);
        if candidate.instant().is_none() && self.max.instant().is_some() {
            tracing::warn!("Ignoring {} value `{}`: not a timestamp", field, value);
            return;
        }
        if candidate.is_after(&self.max) {
            self.max = candidate;
        }
    }

    pub fn current(&self) -> &Watermark {
        &self.max
    }

    pub fn into_watermark(self) -> Watermark {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynamics_client::Property;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn prop(name: &str, kind: PropertyKind) -> Property {
        Property {
            name: name.to_string(),
            kind,
        }
    }

    fn account_type() -> EntityType {
        EntityType {
            entity_set: "accounts".into(),
            logical_name: "account".into(),
            primary_key: Some("accountid".into()),
            properties: vec![
                prop("accountid", PropertyKind::Guid),
                prop("modifiedon", PropertyKind::DateTime),
                prop("industrycode", PropertyKind::OptionSet),
                prop("_parentaccountid_value", PropertyKind::Lookup),
                prop("name", PropertyKind::String),
            ],
        }
    }

    fn optionsets() -> OptionSetMap {
        let mut labels = BTreeMap::new();
        labels.insert(1, "Accounting".to_string());
        let mut map = OptionSetMap::new();
        map.insert("industrycode".to_string(), labels);
        map
    }

    fn row(value: Value) -> Entity {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn dates_are_reformatted_to_utc() {
        let entity = row(json!({"modifiedon": "2020-02-01T02:00:00+02:00"}));
        let out = normalize_entity(&entity, &account_type(), &optionsets());
        assert_eq!(out.record["modifiedon"], json!("2020-02-01T00:00:00Z"));
    }

    #[test]
    fn label_is_added_for_known_code() {
        let entity = row(json!({"industrycode": 1}));
        let out = normalize_entity(&entity, &account_type(), &optionsets());
        assert_eq!(out.record["industrycode"], json!(1));
        assert_eq!(out.record["industrycode_label"], json!("Accounting"));
        assert!(out.missing_labels.is_empty());
    }

    #[test]
    fn null_code_gets_empty_label() {
        let entity = row(json!({"industrycode": null}));
        let out = normalize_entity(&entity, &account_type(), &optionsets());
        assert_eq!(out.record["industrycode_label"], json!(""));
    }

    #[test]
    fn unknown_code_is_reported_and_label_still_set() {
        let entity = row(json!({"industrycode": 42}));
        let out = normalize_entity(&entity, &account_type(), &optionsets());
        assert!(out.record.contains_key("industrycode_label"));
        assert_eq!(out.record["industrycode_label"], Value::Null);
        assert_eq!(
            out.missing_labels,
            vec![MissingLabel {
                field: "industrycode".into(),
                value: json!(42)
            }]
        );
    }

    #[test]
    fn undeclared_properties_are_ignored_and_absent_ones_null() {
        let entity = row(json!({"@odata.etag": "W/\"1\"", "accountid": "a1"}));
        let out = normalize_entity(&entity, &account_type(), &optionsets());
        assert!(!out.record.contains_key("@odata.etag"));
        assert_eq!(out.record["name"], Value::Null);
    }

    #[test]
    fn none_text_on_lookup_column_becomes_null() {
        let entity = row(json!({"_parentaccountid_value": "None", "name": "None"}));
        let out = normalize_entity(&entity, &account_type(), &optionsets());
        assert_eq!(out.record["_parentaccountid_value"], Value::Null);
        assert_eq!(out.record["name"], json!("None"), "only lookup columns are repaired");
    }

    #[test]
    fn repair_matches_suffix_case_insensitively_and_only_exact_text() {
        let mut record = row(json!({
            "_ownerid_VALUE": "None",
            "_customerid_value": "none",
            "_regardingid_value": "None ",
            "parent_value": "None",
        }));
        repair_null_strings(&mut record);
        assert_eq!(record["_ownerid_VALUE"], Value::Null);
        assert_eq!(record["_customerid_value"], json!("none"));
        assert_eq!(record["_regardingid_value"], json!("None "));
        assert_eq!(record["parent_value"], json!("None"));
    }

    #[test]
    fn tracker_keeps_the_maximum() {
        let mut tracker = WatermarkTracker::new(
            Some("modifiedon".into()),
            Watermark::from("2020-01-01T00:00:00Z"),
        );
        for ts in ["2020-02-01T00:00:00Z", "2020-03-01T00:00:00Z", "2020-02-15T00:00:00Z"] {
            tracker.observe(&row(json!({ "modifiedon": ts })));
        }
        assert_eq!(tracker.current(), &Watermark::from("2020-03-01T00:00:00Z"));
    }

    #[test]
    fn tracker_ignores_earlier_and_missing_values() {
        let initial = Watermark::from("2020-05-01T00:00:00Z");
        let mut tracker = WatermarkTracker::new(Some("modifiedon".into()), initial.clone());
        tracker.observe(&row(json!({"modifiedon": "2020-04-01T00:00:00Z"})));
        tracker.observe(&row(json!({"modifiedon": null})));
        tracker.observe(&row(json!({})));
        assert_eq!(tracker.into_watermark(), initial);
    }

    #[test]
    fn tracker_skips_values_that_are_not_timestamps() {
        let initial = Watermark::from("2020-01-01T00:00:00Z");
        let mut tracker = WatermarkTracker::new(Some("modifiedon".into()), initial.clone());
        tracker.observe(&row(json!({"modifiedon": "n/a"})));
        tracker.observe(&row(json!({"modifiedon": "zzz"})));
        assert_eq!(tracker.current(), &initial);

        tracker.observe(&row(json!({"modifiedon": "2020-02-01T00:00:00Z"})));
        tracker.observe(&row(json!({"modifiedon": "not yet"})));
        assert_eq!(
            tracker.into_watermark(),
            Watermark::from("2020-02-01T00:00:00Z")
        );
    }

    #[test]
    fn full_table_tracker_never_moves() {
        let initial = Watermark::from("2020-01-01T00:00:00Z");
        let mut tracker = WatermarkTracker::new(None, initial.clone());
        tracker.observe(&row(json!({"modifiedon": "2021-01-01T00:00:00Z"})));
        assert_eq!(tracker.into_watermark(), initial);
    }
}
