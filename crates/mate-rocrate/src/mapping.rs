//! Declarative record → crate mappings.
//!
//! A [`MappingTable`] says, for each template node, which record field feeds
//! which attribute. In JSON:
//!
//! ```json
//! [
//!   {"target": "./", "attributes": {"name": "slug", "publisher": null}},
//!   {"target": 4, "attributes": {"instrument": ["software", "computer_uri"]}}
//! ]
//! ```
//!
//! `null` leaves the template's value alone, a string copies one field, and a
//! list collects every listed field that the record has.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::entity::{graph_nodes_mut, position_of};
use crate::error::{CrateError, Result};
use crate::record::SubmissionRecord;

/// Which `@graph` node a mapping writes into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSelector {
    Index(usize),
    Id(String),
}

impl From<usize> for NodeSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for NodeSelector {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    Field(String),
    Fields(Vec<String>),
}

impl SourceSpec {
    /// Value for the target attribute, or `None` to leave it untouched.
    fn collect(&self, record: &SubmissionRecord) -> Option<Value> {
        match self {
            SourceSpec::Field(name) => record.get(name).cloned(),
            SourceSpec::Fields(names) => {
                let values: Vec<Value> = names
                    .iter()
                    .filter_map(|name| record.get(name).cloned())
                    .collect();
                (!values.is_empty()).then_some(Value::Array(values))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMapping {
    pub target: NodeSelector,
    #[serde(default)]
    pub attributes: IndexMap<String, Option<SourceSpec>>,
}

impl NodeMapping {
    pub fn new(target: impl Into<NodeSelector>) -> Self {
        Self {
            target: target.into(),
            attributes: IndexMap::new(),
        }
    }

    pub fn field(mut self, attribute: &str, field: &str) -> Self {
        self.attributes.insert(
            attribute.to_string(),
            Some(SourceSpec::Field(field.to_string())),
        );
        self
    }

    pub fn fields(mut self, attribute: &str, fields: &[&str]) -> Self {
        self.attributes.insert(
            attribute.to_string(),
            Some(SourceSpec::Fields(fields.iter().map(|f| f.to_string()).collect())),
        );
        self
    }

    /// Declared but left to the template.
    pub fn keep(mut self, attribute: &str) -> Self {
        self.attributes.insert(attribute.to_string(), None);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingTable {
    pub nodes: Vec<NodeMapping>,
}

impl MappingTable {
    pub fn new(nodes: Vec<NodeMapping>) -> Self {
        Self { nodes }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The M@TE submission mappings: the root dataset, the three model
    /// directories and the dataset-creation action.
    pub fn mate_default() -> Self {
        Self::new(vec![
            NodeMapping::new("./")
                .keep("@type")
                .field("name", "slug")
                .field("description", "description")
                .field("creator", "creator")
                .field("contributors", "authors")
                .field("citation", "publication")
                .keep("publisher")
                .field("license", "license")
                .field("keywords", "keywords")
                .field("about", "for_codes")
                .field("funder", "funder")
                .keep("hasPart"),
            NodeMapping::new("model_inputs")
                .keep("@type")
                .field("creator", "creator")
                .field("owl:sameAs", "model_code_uri")
                .keep("programmingLanguage"),
            NodeMapping::new("model_outputs")
                .keep("@type")
                .field("creator", "creator")
                .keep("fileFormat"),
            NodeMapping::new("website_material")
                .keep("@type")
                .field("creator", "creator")
                .keep("fileFormat"),
            NodeMapping::new("#datasetCreation")
                .keep("@type")
                .field("agent", "creator")
                .fields("instrument", &["software", "computer_uri"]),
        ])
    }
}

/// Copy record fields into the crate's template nodes.
///
/// Values are deep-copied so the crate never aliases the record. A target
/// that cannot be found is an error rather than a skipped mapping.
pub fn apply_mapping(
    document: &mut Value,
    table: &MappingTable,
    record: &SubmissionRecord,
) -> Result<()> {
    let nodes = graph_nodes_mut(document)?;

    for mapping in &table.nodes {
        let index = match &mapping.target {
            NodeSelector::Index(index) => *index,
            NodeSelector::Id(id) => {
                position_of(nodes, id).ok_or_else(|| CrateError::UnknownNode(id.clone()))?
            }
        };
        let len = nodes.len();
        let node = nodes
            .get_mut(index)
            .ok_or(CrateError::NodeIndexOutOfRange { index, len })?
            .as_object_mut()
            .ok_or(CrateError::NotAnEntity { index })?;

        for (attribute, source) in &mapping.attributes {
            let Some(source) = source else {
                continue;
            };
            match source.collect(record) {
                Some(value) => {
                    node.insert(attribute.clone(), value);
                }
                None => debug!(node = index, attribute = %attribute, "no record value to map"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> SubmissionRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn list_sources_collect_present_fields_in_order() {
        let mut doc = json!({"@graph": [{"@id": "./"}]});
        let table = MappingTable::new(vec![
            NodeMapping::new(0usize).fields("contributors", &["a", "b", "c"])
        ]);
        apply_mapping(&mut doc, &table, &record(json!({"a": 1, "c": 3}))).unwrap();
        assert_eq!(doc["@graph"][0]["contributors"], json!([1, 3]));
    }

    #[test]
    fn empty_collection_leaves_attribute_untouched() {
        let mut doc = json!({"@graph": [{"@id": "./", "contributors": "template"}]});
        let table = MappingTable::new(vec![NodeMapping::new(0usize).fields("contributors", &["x"])]);
        apply_mapping(&mut doc, &table, &record(json!({}))).unwrap();
        assert_eq!(doc["@graph"][0]["contributors"], "template");
    }

    #[test]
    fn null_sources_and_missing_fields_are_skipped() {
        let mut doc = json!({"@graph": [{"@id": "./", "publisher": "kept", "name": "old"}]});
        let table = MappingTable::new(vec![NodeMapping::new("./")
            .keep("publisher")
            .field("name", "slug")
            .field("description", "description")]);
        apply_mapping(&mut doc, &table, &record(json!({"slug": "new-model"}))).unwrap();
        assert_eq!(
            doc["@graph"][0],
            json!({"@id": "./", "publisher": "kept", "name": "new-model"})
        );
    }

    #[test]
    fn mapped_values_are_copies() {
        let mut doc = json!({"@graph": [{"@id": "./"}]});
        let rec = record(json!({"creator": {"@type": "Person", "givenName": "Ada"}}));
        let table = MappingTable::new(vec![NodeMapping::new("./").field("creator", "creator")]);
        apply_mapping(&mut doc, &table, &rec).unwrap();

        doc["@graph"][0]["creator"]["givenName"] = json!("changed");
        assert_eq!(rec.get("creator").unwrap()["givenName"], "Ada");
    }

    #[test]
    fn bad_targets_are_errors() {
        let mut doc = json!({"@graph": [{"@id": "./"}, 5]});
        let rec = record(json!({"slug": "x"}));

        let out_of_range = MappingTable::new(vec![NodeMapping::new(7usize).field("name", "slug")]);
        assert!(matches!(
            apply_mapping(&mut doc, &out_of_range, &rec),
            Err(CrateError::NodeIndexOutOfRange { index: 7, len: 2 })
        ));

        let unknown = MappingTable::new(vec![NodeMapping::new("#nope").field("name", "slug")]);
        assert!(matches!(
            apply_mapping(&mut doc, &unknown, &rec),
            Err(CrateError::UnknownNode(id)) if id == "#nope"
        ));

        let scalar = MappingTable::new(vec![NodeMapping::new(1usize).field("name", "slug")]);
        assert!(matches!(
            apply_mapping(&mut doc, &scalar, &rec),
            Err(CrateError::NotAnEntity { index: 1 })
        ));

        assert!(matches!(
            apply_mapping(&mut json!({}), &scalar, &rec),
            Err(CrateError::MissingGraph)
        ));
    }

    #[test]
    fn new_attributes_follow_declared_order() {
        let mut doc = json!({"@graph": [{"@id": "./", "name": "template"}]});
        let table = MappingTable::from_json_str(
            r#"[{"target": "./", "attributes": {"zeta": "z", "name": "n", "alpha": "a"}}]"#,
        )
        .unwrap();
        let rec = record(json!({"a": 1, "n": "mapped", "z": 26}));
        apply_mapping(&mut doc, &table, &rec).unwrap();

        let keys: Vec<&str> = doc["@graph"][0]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["@id", "name", "zeta", "alpha"]);
        assert_eq!(doc["@graph"][0]["name"], "mapped");
    }

    #[test]
    fn parses_json_tables() {
        let table = MappingTable::from_json_str(
            r#"[
                {"target": "./", "attributes": {"name": "slug", "publisher": null}},
                {"target": 4, "attributes": {"instrument": ["software", "computer_uri"]}}
            ]"#,
        )
        .unwrap();
        assert_eq!(table.nodes[0].target, NodeSelector::Id("./".into()));
        assert_eq!(table.nodes[0].attributes["publisher"], None);
        assert_eq!(table.nodes[1].target, NodeSelector::Index(4));
        assert_eq!(
            table.nodes[1].attributes["instrument"],
            Some(SourceSpec::Fields(vec!["software".into(), "computer_uri".into()]))
        );
    }
}
