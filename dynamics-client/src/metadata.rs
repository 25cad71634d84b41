//! Wire shapes of the `EntityDefinitions` metadata endpoints and their
//! conversion into [`EntityType`] / [`OptionSetMap`].

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::entity::{lookup_value_name, EntityType, OptionSetMap, Property, PropertyKind};

/// `{"value": [...]}` collection envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EntityDefinition {
    pub logical_name: String,
    #[serde(default)]
    pub entity_set_name: Option<String>,
    #[serde(default)]
    pub primary_id_attribute: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AttributeDefinition {
    pub logical_name: String,
    #[serde(default)]
    pub attribute_type: Option<String>,
    #[serde(default)]
    pub is_valid_for_read: Option<bool>,
    #[serde(default)]
    pub attribute_of: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct OptionSetAttribute {
    pub logical_name: String,
    #[serde(default)]
    pub option_set: Option<OptionSetDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct OptionSetDefinition {
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct OptionDefinition {
    pub value: i64,
    #[serde(default)]
    pub label: Option<Label>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Label {
    #[serde(default)]
    pub user_localized_label: Option<LocalizedLabel>,
    #[serde(default)]
    pub localized_labels: Vec<LocalizedLabel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LocalizedLabel {
    pub label: String,
}

impl Label {
    fn text(&self) -> Option<&str> {
        self.user_localized_label
            .as_ref()
            .or_else(|| self.localized_labels.first())
            .map(|l| l.label.as_str())
    }
}

impl EntityDefinition {
    /// `None` for entities with no Web API collection.
    pub(crate) fn into_entity_type(self) -> Option<EntityType> {
        let entity_set = self.entity_set_name.filter(|s| !s.is_empty())?;
        let mut properties: Vec<Property> = self
            .attributes
            .into_iter()
            .filter(|a| a.is_valid_for_read != Some(false) && a.attribute_of.is_none())
            .filter_map(|a| {
                let kind = PropertyKind::from_attribute_type(a.attribute_type.as_deref()?)?;
                let name = match kind {
                    PropertyKind::Lookup => lookup_value_name(&a.logical_name),
                    _ => a.logical_name,
                };
                Some(Property { name, kind })
            })
            .collect();
        properties.sort_by(|a, b| a.name.cmp(&b.name));
        properties.dedup_by(|a, b| a.name == b.name);

        Some(EntityType {
            entity_set,
            logical_name: self.logical_name,
            primary_key: self.primary_id_attribute,
            properties,
        })
    }
}

/// Fold option-set attributes into an [`OptionSetMap`]. Attributes seen
/// more than once merge their options.
pub(crate) fn collect_optionsets(
    map: &mut OptionSetMap,
    attributes: impl IntoIterator<Item = OptionSetAttribute>,
) {
    for attribute in attributes {
        let labels: BTreeMap<i64, String> = attribute
            .option_set
            .map(|os| os.options)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|o| {
                let text = o.label.as_ref()?.text()?.to_string();
                Some((o.value, text))
            })
            .collect();
        map.entry(attribute.logical_name).or_default().extend(labels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_maps_lookups_and_skips_unreadable() {
        let def: EntityDefinition = serde_json::from_str(
            r#"{
              "LogicalName": "account",
              "EntitySetName": "accounts",
              "PrimaryIdAttribute": "accountid",
              "Attributes": [
                {"LogicalName": "accountid", "AttributeType": "Uniqueidentifier", "IsValidForRead": true},
                {"LogicalName": "parentaccountid", "AttributeType": "Lookup", "IsValidForRead": true},
                {"LogicalName": "parentaccountidname", "AttributeType": "String", "AttributeOf": "parentaccountid"},
                {"LogicalName": "secret", "AttributeType": "String", "IsValidForRead": false},
                {"LogicalName": "entityimage", "AttributeType": "Virtual", "IsValidForRead": true},
                {"LogicalName": "industrycode", "AttributeType": "Picklist", "IsValidForRead": true}
              ]
            }"#,
        )
        .unwrap();
        let entity = def.into_entity_type().unwrap();
        let names: Vec<&str> = entity.property_names().collect();
        assert_eq!(names, vec!["_parentaccountid_value", "accountid", "industrycode"]);
        assert_eq!(entity.primary_key.as_deref(), Some("accountid"));
    }

    #[test]
    fn definition_without_entity_set_is_skipped() {
        let def: EntityDefinition =
            serde_json::from_str(r#"{"LogicalName": "internal", "EntitySetName": null}"#).unwrap();
        assert!(def.into_entity_type().is_none());
    }

    #[test]
    fn optionset_labels_prefer_user_localized() {
        let attrs: Vec<OptionSetAttribute> = serde_json::from_str(
            r#"[{
              "LogicalName": "industrycode",
              "OptionSet": {"Options": [
                {"Value": 1, "Label": {"UserLocalizedLabel": {"Label": "Accounting"}, "LocalizedLabels": [{"Label": "Comptabilite"}]}},
                {"Value": 2, "Label": {"UserLocalizedLabel": null, "LocalizedLabels": [{"Label": "Agriculture"}]}},
                {"Value": 3, "Label": null}
              ]}
            }]"#,
        )
        .unwrap();
        let mut map = OptionSetMap::new();
        collect_optionsets(&mut map, attrs);
        let labels = &map["industrycode"];
        assert_eq!(labels.get(&1).map(String::as_str), Some("Accounting"));
        assert_eq!(labels.get(&2).map(String::as_str), Some("Agriculture"));
        assert!(!labels.contains_key(&3));
    }
}
