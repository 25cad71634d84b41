#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use dynamics_client::{
    ClientError, Entity, EntityType, OptionSetMap, Property, PropertyKind, Query, Rows, Service,
};
use dynamics_core::parse_datetime;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn prop(name: &str, kind: PropertyKind) -> Property {
    Property {
        name: name.to_string(),
        kind,
    }
}

pub fn row(value: Value) -> Entity {
    value.as_object().cloned().expect("row must be a JSON object")
}

/// In-memory organisation. Queries honour `ge` filters and ascending order
/// on the filtered field, and are recorded for inspection.
#[derive(Default)]
pub struct FakeService {
    pub entities: Vec<EntityType>,
    pub rows: BTreeMap<String, Vec<Entity>>,
    pub optionsets: BTreeMap<String, OptionSetMap>,
    pub failing: BTreeSet<String>,
    pub queries: RefCell<Vec<Query>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: EntityType, rows: Vec<Entity>) -> Self {
        self.rows.insert(entity.entity_set.clone(), rows);
        self.entities.push(entity);
        self
    }

    pub fn with_optionsets(mut self, entity_set: &str, map: OptionSetMap) -> Self {
        self.optionsets.insert(entity_set.to_string(), map);
        self
    }

    pub fn failing_on(mut self, entity_set: &str) -> Self {
        self.failing.insert(entity_set.to_string());
        self
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.borrow().clone()
    }
}

impl Service for FakeService {
    fn entity_types(&self) -> Result<Vec<EntityType>, ClientError> {
        Ok(self.entities.clone())
    }

    fn optionset_map(&self, entity: &EntityType) -> Result<OptionSetMap, ClientError> {
        Ok(self
            .optionsets
            .get(&entity.entity_set)
            .cloned()
            .unwrap_or_default())
    }

    fn query<'a>(&'a self, query: Query) -> Result<Rows<'a>, ClientError> {
        self.queries.borrow_mut().push(query.clone());
        if self.failing.contains(&query.entity_set) {
            return Err(ClientError::Status {
                url: format!("fake://{}", query.entity_set),
                status: 503,
                body: "unavailable".into(),
            });
        }

        let mut rows = self
            .rows
            .get(&query.entity_set)
            .cloned()
            .unwrap_or_default();
        if let Some(filter) = &query.filter {
            // Text that is not a date passes the filter untouched.
            rows.retain(|r| match r.get(&filter.field).and_then(Value::as_str) {
                Some(text) => parse_datetime(text).map_or(true, |ts| ts >= filter.since),
                None => false,
            });
        }
        if let Some(order) = &query.order_by {
            rows.sort_by_key(|r| {
                r.get(&order.field)
                    .and_then(Value::as_str)
                    .and_then(parse_datetime)
            });
        }
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}

/// Discovered catalog entry for `entity`, marked selected.
pub fn selected_entry(entity: &EntityType) -> dynamics_core::CatalogEntry {
    let mut entry = dynamics_sync::catalog_entry(entity);
    entry.selected = Some(true);
    entry
}

pub fn account_type() -> EntityType {
    EntityType {
        entity_set: "accounts".into(),
        logical_name: "account".into(),
        primary_key: Some("accountid".into()),
        properties: vec![
            prop("_parentaccountid_value", PropertyKind::Lookup),
            prop("accountid", PropertyKind::Guid),
            prop("industrycode", PropertyKind::OptionSet),
            prop("modifiedon", PropertyKind::DateTime),
            prop("name", PropertyKind::String),
        ],
    }
}

pub fn audit_type() -> EntityType {
    EntityType {
        entity_set: "audits".into(),
        logical_name: "audit".into(),
        primary_key: Some("auditid".into()),
        properties: vec![
            prop("action", PropertyKind::Integer),
            prop("auditid", PropertyKind::Guid),
            prop("createdon", PropertyKind::DateTime),
        ],
    }
}

pub fn note_type() -> EntityType {
    EntityType {
        entity_set: "notes".into(),
        logical_name: "annotation".into(),
        primary_key: Some("annotationid".into()),
        properties: vec![
            prop("annotationid", PropertyKind::Guid),
            prop("subject", PropertyKind::String),
        ],
    }
}

pub fn industry_labels() -> OptionSetMap {
    let mut labels = BTreeMap::new();
    labels.insert(1, "Accounting".to_string());
    labels.insert(2, "Agriculture".to_string());
    let mut map = OptionSetMap::new();
    map.insert("industrycode".to_string(), labels);
    map
}
