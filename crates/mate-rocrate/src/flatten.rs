//! Flattening: hoist nested entities to the top of `@graph`.
//!
//! A pass walks the node list as it stood when the pass began. It first gives
//! every top-level node an identifier, so an inline copy of a top-level entity
//! is always recognised wherever the two sit in the list. Then for each node
//! it gives nested mappings an identifier, copies every nested entity body
//! that is not yet a top-level node to the end of `@graph`, and leaves a bare
//! `{"@id": ...}` behind. Nodes appended during a pass are visited by the next
//! one, so a tree of depth D settles after D growing passes plus one pass that
//! confirms nothing changed.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::entity::{
    graph_nodes, graph_nodes_mut, id_key, id_of, is_reference, top_level_ids, Entity,
};
use crate::error::{CrateError, Result};
use crate::ident::{resolve, IdMinter, RandomIdMinter, UniqueMinter};
use crate::ID_KEY;

/// Pass cap used unless overridden.
pub const DEFAULT_MAX_PASSES: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlattenReport {
    /// Full passes run, including the final pass that added nothing.
    pub passes: usize,
    /// Entities appended to `@graph`.
    pub hoisted: usize,
    /// Final node count.
    pub nodes: usize,
}

pub struct Flattener<M: IdMinter = RandomIdMinter> {
    minter: M,
    max_passes: usize,
    /// Every identifier seen at the top level or minted by this flattener.
    seen: HashSet<String>,
}

impl Flattener<RandomIdMinter> {
    pub fn new() -> Self {
        Self::with_minter(RandomIdMinter::new())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_minter(RandomIdMinter::seeded(seed))
    }
}

impl Default for Flattener<RandomIdMinter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: IdMinter> Flattener<M> {
    pub fn with_minter(minter: M) -> Self {
        Self {
            minter,
            max_passes: DEFAULT_MAX_PASSES,
            seen: HashSet::new(),
        }
    }

    pub fn max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Resolve identifiers of the mappings held directly by node `index`.
    ///
    /// Sequence elements are left alone here; [`Flattener::hoist_at`] resolves
    /// them as it reaches them.
    pub fn resolve_blank_nodes_at(&mut self, document: &mut Value, index: usize) -> Result<()> {
        let entity = self.node_at(document, index)?;
        let mut minter = UniqueMinter::new(&mut self.minter, &mut self.seen);
        for value in entity.values_mut() {
            if let Value::Object(nested) = value {
                resolve(nested, &mut minter);
            }
        }
        Ok(())
    }

    /// Hoist the entities nested in node `index`. Returns how many were
    /// appended to `@graph`.
    pub fn hoist_at(&mut self, document: &mut Value, index: usize) -> Result<usize> {
        let nodes = graph_nodes_mut(document)?;
        let len = nodes.len();
        if index >= len {
            return Err(CrateError::NodeIndexOutOfRange { index, len });
        }
        let mut present = top_level_ids(nodes);
        self.seen.extend(present.iter().cloned());

        let mut hoisted = Vec::new();
        let Some(entity) = nodes[index].as_object_mut() else {
            return Err(CrateError::NotAnEntity { index });
        };
        let mut minter = UniqueMinter::new(&mut self.minter, &mut self.seen);

        for (key, value) in entity.iter_mut() {
            match value {
                Value::Object(nested) => {
                    hoist_one(key, nested, &mut present, &mut hoisted, &mut minter);
                }
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        if let Value::Object(nested) = item {
                            hoist_one(key, nested, &mut present, &mut hoisted, &mut minter);
                        }
                    }
                }
                _ => {}
            }
        }

        let count = hoisted.len();
        nodes.extend(hoisted);
        Ok(count)
    }

    /// Run passes until `@graph` stops growing, then check that top-level
    /// identifiers are unique.
    pub fn flatten(&mut self, document: &mut Value) -> Result<FlattenReport> {
        let mut report = FlattenReport::default();

        loop {
            let before = graph_nodes(document)?.len();
            if report.passes >= self.max_passes {
                return Err(CrateError::GraphDidNotStabilize {
                    passes: report.passes,
                    nodes: before,
                });
            }

            for index in 0..before {
                self.resolve_node_at(document, index)?;
            }
            for index in 0..before {
                self.resolve_blank_nodes_at(document, index)?;
                report.hoisted += self.hoist_at(document, index)?;
            }
            report.passes += 1;

            let after = graph_nodes(document)?.len();
            debug!(pass = report.passes, before, after, "flatten pass");
            if after == before {
                report.nodes = after;
                break;
            }
        }

        ensure_unique_ids(graph_nodes(document)?)?;
        info!(
            passes = report.passes,
            hoisted = report.hoisted,
            nodes = report.nodes,
            "crate flattened"
        );
        Ok(report)
    }

    /// Top-level nodes need identifiers too; templates normally carry them.
    fn resolve_node_at(&mut self, document: &mut Value, index: usize) -> Result<()> {
        let entity = self.node_at(document, index)?;
        let mut minter = UniqueMinter::new(&mut self.minter, &mut self.seen);
        resolve(entity, &mut minter);
        Ok(())
    }

    fn node_at<'d>(&mut self, document: &'d mut Value, index: usize) -> Result<&'d mut Entity> {
        let nodes = graph_nodes_mut(document)?;
        self.seen.extend(top_level_ids(nodes));
        let len = nodes.len();
        nodes
            .get_mut(index)
            .ok_or(CrateError::NodeIndexOutOfRange { index, len })?
            .as_object_mut()
            .ok_or(CrateError::NotAnEntity { index })
    }
}

/// Flatten with a fresh random minter and the default pass cap.
pub fn flatten(document: &mut Value) -> Result<FlattenReport> {
    Flattener::new().flatten(document)
}

fn hoist_one<M: IdMinter>(
    key: &str,
    nested: &mut Entity,
    present: &mut HashSet<String>,
    hoisted: &mut Vec<Value>,
    minter: &mut M,
) {
    resolve(nested, minter);
    if is_reference(nested) {
        return;
    }
    let Some(id) = id_of(nested).map(id_key) else {
        return;
    };

    if present.insert(id.clone()) {
        debug!(attribute = key, id = %id, "hoisting nested entity");
        hoisted.push(Value::Object(nested.clone()));
    }
    nested.retain(|attribute, _| attribute == ID_KEY);
}

fn ensure_unique_ids(nodes: &[Value]) -> Result<()> {
    let mut ids = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if let Some(id) = node.as_object().and_then(id_of) {
            let id = id_key(id);
            if !ids.insert(id.clone()) {
                return Err(CrateError::DuplicateIdentifier(id));
            }
        }
    }
    Ok(())
}
