//! Crate and entity templates.
//!
//! The crate template is the skeleton RO-Crate every submission is written
//! into; its `@graph` holds the slots the mapping table targets. The entity
//! template is the per-type allow-list used by [`EntityTemplate`]. Both ship
//! with built-in M@TE defaults and can be replaced by files on disk.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::entity::{graph_nodes, id_of};
use crate::error::{CrateError, Result};
use crate::filter::EntityTemplate;

const DEFAULT_CRATE_TEMPLATE: &str = include_str!("../templates/ro-crate-metadata.json");
const DEFAULT_ENTITY_TEMPLATE: &str = include_str!("../templates/type_templates.json");

pub fn default_crate_template() -> Result<Value> {
    parse_crate_template(DEFAULT_CRATE_TEMPLATE)
}

pub fn default_entity_template() -> Result<EntityTemplate> {
    Ok(serde_json::from_str(DEFAULT_ENTITY_TEMPLATE)?)
}

/// Parse and check a crate template: an object whose `@graph` is an array of
/// objects.
pub fn parse_crate_template(text: &str) -> Result<Value> {
    let document: Value = serde_json::from_str(text)?;
    validate_crate_template(&document)?;
    Ok(document)
}

pub fn validate_crate_template(document: &Value) -> Result<()> {
    if !document.is_object() {
        return Err(CrateError::invalid_template("crate template must be a JSON object"));
    }
    let nodes = graph_nodes(document)?;
    for (index, node) in nodes.iter().enumerate() {
        let Some(entity) = node.as_object() else {
            return Err(CrateError::NotAnEntity { index });
        };
        if id_of(entity).is_none() {
            debug!(index, "template node has no @id; one will be minted");
        }
    }
    Ok(())
}

pub fn load_crate_template(path: &Path) -> Result<Value> {
    let document = read_json(path)?;
    validate_crate_template(&document)?;
    Ok(document)
}

pub fn load_entity_template(path: &Path) -> Result<EntityTemplate> {
    let document = read_json(path)?;
    if !document.is_object() {
        return Err(CrateError::invalid_template(format!(
            "entity template {} must map @type names to attribute lists",
            path.display()
        )));
    }
    serde_json::from_value(document).map_err(|source| CrateError::TemplateJson {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|source| CrateError::TemplateUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CrateError::TemplateJson {
        path: path.to_path_buf(),
        source,
    })
}
