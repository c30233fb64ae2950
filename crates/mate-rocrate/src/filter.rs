//! Per-type attribute allow-lists ("entity templates").
//!
//! Registry lookups return far more than a crate should carry (ORCID
//! employment history, Crossref reference lists, ...). An [`EntityTemplate`]
//! maps a `@type` to the attributes worth keeping and prunes everything else.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;
use crate::{ID_KEY, TYPE_KEY};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityTemplate {
    allowed: BTreeMap<String, Vec<String>>,
}

impl EntityTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow<I, S>(mut self, type_tag: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed.insert(
            type_tag.into(),
            attributes.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.allowed.keys().map(String::as_str)
    }

    /// Allowed attributes for a type tag. An array of tags allows the union of
    /// every listed tag's attributes; `None` when no tag is known.
    pub fn allowed_for(&self, type_tag: &Value) -> Option<HashSet<&str>> {
        let lists: Vec<&Vec<String>> = match type_tag {
            Value::String(tag) => self.allowed.get(tag).into_iter().collect(),
            Value::Array(tags) => tags
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|tag| self.allowed.get(tag))
                .collect(),
            _ => Vec::new(),
        };
        if lists.is_empty() {
            return None;
        }
        Some(lists.into_iter().flatten().map(String::as_str).collect())
    }

    /// Prune every typed entity reachable from `value`, in place.
    ///
    /// `@id` and `@type` always survive. Untyped mappings keep all attributes
    /// but their children are still visited.
    pub fn apply(&self, value: &mut Value) {
        if self.is_empty() {
            return;
        }
        match value {
            Value::Object(entity) => self.apply_to_entity(entity),
            Value::Array(items) => {
                for item in items {
                    self.apply(item);
                }
            }
            _ => {}
        }
    }

    pub fn apply_to_entity(&self, entity: &mut Entity) {
        if let Some(allowed) = entity.get(TYPE_KEY).and_then(|tag| self.allowed_for(tag)) {
            entity.retain(|key, _| {
                key == ID_KEY || key == TYPE_KEY || allowed.contains(key.as_str())
            });
        }
        for child in entity.values_mut() {
            self.apply(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person_template() -> EntityTemplate {
        EntityTemplate::new()
            .allow("Person", ["givenName", "familyName", "affiliation"])
            .allow("Organization", ["name"])
    }

    #[test]
    fn strips_disallowed_attributes_of_typed_entities() {
        let mut value = json!({
            "@type": "Person",
            "@id": "https://orcid.org/0000-0001-2345-6789",
            "givenName": "Ada",
            "familyName": "Lovelace",
            "employments": ["a", "b"]
        });
        person_template().apply(&mut value);
        assert_eq!(
            value,
            json!({
                "@type": "Person",
                "@id": "https://orcid.org/0000-0001-2345-6789",
                "givenName": "Ada",
                "familyName": "Lovelace"
            })
        );
    }

    #[test]
    fn recurses_through_untyped_mappings_and_sequences() {
        let mut value = json!({
            "creator": {"@type": "Person", "givenName": "Ada", "email": "x"},
            "authors": [
                {"@type": "Person", "familyName": "Noether", "orcid_raw": {}},
                {"name": "untyped", "extra": 1}
            ],
            "slug": "model"
        });
        person_template().apply(&mut value);
        assert_eq!(value["creator"], json!({"@type": "Person", "givenName": "Ada"}));
        assert_eq!(value["authors"][0], json!({"@type": "Person", "familyName": "Noether"}));
        assert_eq!(value["authors"][1], json!({"name": "untyped", "extra": 1}));
        assert_eq!(value["slug"], "model");
    }

    #[test]
    fn nested_typed_entities_are_filtered_after_parent() {
        let mut value = json!({
            "@type": "Person",
            "givenName": "Ada",
            "affiliation": [{"@type": "Organization", "name": "Uni", "country": "AU"}]
        });
        person_template().apply(&mut value);
        assert_eq!(value["affiliation"], json!([{"@type": "Organization", "name": "Uni"}]));
    }

    #[test]
    fn array_type_tags_use_union_of_allow_lists() {
        let template = EntityTemplate::new()
            .allow("PublicationVolume", ["volumeNumber"])
            .allow("Periodical", ["issn"]);
        let mut value = json!({
            "@type": ["PublicationVolume", "Periodical", "Thing"],
            "volumeNumber": "4",
            "issn": ["1234-5678"],
            "publisher": "P"
        });
        template.apply(&mut value);
        assert_eq!(
            value,
            json!({
                "@type": ["PublicationVolume", "Periodical", "Thing"],
                "volumeNumber": "4",
                "issn": ["1234-5678"]
            })
        );
    }

    #[test]
    fn unknown_types_and_empty_template_are_no_ops() {
        let original = json!({"@type": "Dataset", "name": "x", "junk": true});
        let mut value = original.clone();
        person_template().apply(&mut value);
        assert_eq!(value, original);

        EntityTemplate::new().apply(&mut value);
        assert_eq!(value, original);
    }

    #[test]
    fn deserializes_from_type_keyed_json() {
        let template: EntityTemplate =
            serde_json::from_value(json!({"Person": ["givenName"]})).unwrap();
        assert_eq!(template.types().collect::<Vec<_>>(), vec!["Person"]);
    }
}
