use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed issue-form fields, keyed by field name (`slug`, `creator`,
/// `authors`, ...). Values are strings, lists, or Person/Organization-like
/// entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionRecord {
    fields: Map<String, Value>,
}

impl SubmissionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }
}

impl From<Map<String, Value>> for SubmissionRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}
