//! Typed view over JSON-LD values.
//!
//! JSON-LD only distinguishes a reference from an inline entity by how many
//! attributes the mapping carries. [`Shape`] makes that split explicit for
//! code that inspects a crate.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{CrateError, Result};
use crate::{GRAPH_KEY, ID_KEY};

pub type Entity = Map<String, Value>;

/// The four kinds of attribute value a crate node can hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<'a> {
    Scalar(&'a Value),
    Reference(&'a Entity),
    Entity(&'a Entity),
    Sequence(&'a [Value]),
}

impl<'a> Shape<'a> {
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Object(map) if is_reference(map) => Shape::Reference(map),
            Value::Object(map) => Shape::Entity(map),
            Value::Array(items) => Shape::Sequence(items),
            other => Shape::Scalar(other),
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Shape::Entity(_))
    }
}

/// A mapping with exactly one attribute stands in for an entity defined
/// elsewhere. Blank single-attribute bodies are given an `@id` before they are
/// classified, so after resolution that one attribute is always `@id`.
pub fn is_reference(entity: &Entity) -> bool {
    entity.len() == 1
}

/// The entity's identifier, if present and non-null.
pub fn id_of(entity: &Entity) -> Option<&Value> {
    entity.get(ID_KEY).filter(|id| !id.is_null())
}

/// Comparison key for an identifier value.
///
/// Identifiers are strings in every crate we emit; anything else is compared
/// by its JSON rendering.
pub fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn graph_nodes(document: &Value) -> Result<&Vec<Value>> {
    document
        .get(GRAPH_KEY)
        .and_then(Value::as_array)
        .ok_or(CrateError::MissingGraph)
}

pub fn graph_nodes_mut(document: &mut Value) -> Result<&mut Vec<Value>> {
    document
        .get_mut(GRAPH_KEY)
        .and_then(Value::as_array_mut)
        .ok_or(CrateError::MissingGraph)
}

/// Identifiers of the top-level nodes. Nodes without an identifier are skipped.
pub fn top_level_ids(nodes: &[Value]) -> HashSet<String> {
    nodes
        .iter()
        .filter_map(Value::as_object)
        .filter_map(id_of)
        .map(id_key)
        .collect()
}

/// Index of the top-level node whose `@id` equals `id`.
pub fn position_of(nodes: &[Value], id: &str) -> Option<usize> {
    nodes.iter().position(|node| {
        node.as_object()
            .and_then(id_of)
            .map_or(false, |candidate| id_key(candidate) == id)
    })
}
