//! RO-Crate crosswalk for M@TE model submissions.
//!
//! Turns a parsed submission record into a flat JSON-LD `@graph`:
//!
//! - [`filter`]: prune typed entities down to per-`@type` allow-lists
//! - [`mapping`]: copy record fields into the template's entity slots
//! - [`flatten`]: give nested entities identifiers and hoist them to the top
//!   level until the node list stops growing
//! - [`crosswalk`]: the whole pipeline, driven by [`config::CrosswalkConfig`]
//!
//! The tree is kept as a `serde_json::Value` so the output can be handed to
//! existing RO-Crate tooling unchanged. [`entity::Shape`] classifies a value as
//! scalar, reference, inline entity or sequence for code that inspects the
//! finished graph; the algorithms themselves work on `Value` in place.

pub mod config;
pub mod crosswalk;
pub mod entity;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod ident;
pub mod mapping;
pub mod record;
pub mod template;

pub use config::CrosswalkConfig;
pub use crosswalk::Crosswalk;
pub use entity::Shape;
pub use error::{CrateError, Result};
pub use filter::EntityTemplate;
pub use flatten::{flatten, FlattenReport, Flattener};
pub use ident::{resolve, IdMinter, RandomIdMinter};
pub use mapping::{apply_mapping, MappingTable, NodeMapping, NodeSelector, SourceSpec};
pub use record::SubmissionRecord;

/// Identifier attribute.
pub const ID_KEY: &str = "@id";

/// Type-tag attribute.
pub const TYPE_KEY: &str = "@type";

/// Node-list attribute of a crate document.
pub const GRAPH_KEY: &str = "@graph";
