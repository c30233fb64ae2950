use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = CrateError> = std::result::Result<T, E>;

/// Structural failures of the crosswalk core.
///
/// Nothing here is raised for well-formed templates and mapping tables; every
/// variant points at a configuration or template bug that would otherwise
/// produce a partially filled crate.
#[derive(Debug, Error)]
pub enum CrateError {
    #[error("template unavailable at {path}: {source}")]
    TemplateUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("template at {path} is not valid JSON: {source}")]
    TemplateJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config unavailable at {path}: {source}")]
    ConfigUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config at {path} is invalid: {source}")]
    ConfigJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("document has no `@graph` array")]
    MissingGraph,

    #[error("node index {index} out of range (graph has {len} nodes)")]
    NodeIndexOutOfRange { index: usize, len: usize },

    #[error("no node with `@id` {0:?} in the graph")]
    UnknownNode(String),

    #[error("graph node {index} is not a JSON object")]
    NotAnEntity { index: usize },

    #[error("graph did not stabilize after {passes} passes ({nodes} nodes)")]
    GraphDidNotStabilize { passes: usize, nodes: usize },

    #[error("duplicate top-level `@id` {0:?}")]
    DuplicateIdentifier(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CrateError {
    pub fn invalid_template(message: impl Into<String>) -> Self {
        Self::InvalidTemplate(message.into())
    }
}
