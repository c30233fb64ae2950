//! Blank-node identifiers.
//!
//! An entity keeps its `@id` if it has a non-null one. Otherwise the `url`
//! value is used, then `uri`, then a minted `#` + lowercase token.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::entity::{id_of, Entity};
use crate::ID_KEY;

/// Length of the random part of a synthetic identifier.
pub const SYNTHETIC_ID_LEN: usize = 9;

const URL_KEY: &str = "url";
const URI_KEY: &str = "uri";

/// Source of synthetic identifiers for blank nodes.
pub trait IdMinter {
    fn mint(&mut self) -> String;
}

/// `#` followed by random lowercase ASCII letters.
#[derive(Debug, Clone)]
pub struct RandomIdMinter {
    rng: StdRng,
    len: usize,
}

impl RandomIdMinter {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            len: SYNTHETIC_ID_LEN,
        }
    }

    /// Reproducible identifiers, for tests and `--seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            len: SYNTHETIC_ID_LEN,
        }
    }
}

impl Default for RandomIdMinter {
    fn default() -> Self {
        Self::new()
    }
}

impl IdMinter for RandomIdMinter {
    fn mint(&mut self) -> String {
        let mut id = String::with_capacity(self.len + 1);
        id.push('#');
        for _ in 0..self.len {
            id.push(self.rng.gen_range(b'a'..=b'z') as char);
        }
        id
    }
}

impl<M: IdMinter + ?Sized> IdMinter for &mut M {
    fn mint(&mut self) -> String {
        (**self).mint()
    }
}

/// Rejects identifiers already in use.
///
/// Collisions over 26^9 tokens are not expected, so after a few retries the
/// last candidate is accepted with a warning.
pub(crate) struct UniqueMinter<'a, M: IdMinter> {
    inner: &'a mut M,
    taken: &'a mut HashSet<String>,
}

const MAX_MINT_ATTEMPTS: usize = 16;

impl<'a, M: IdMinter> UniqueMinter<'a, M> {
    pub(crate) fn new(inner: &'a mut M, taken: &'a mut HashSet<String>) -> Self {
        Self { inner, taken }
    }
}

impl<M: IdMinter> IdMinter for UniqueMinter<'_, M> {
    fn mint(&mut self) -> String {
        let mut candidate = self.inner.mint();
        let mut attempts = 1;
        while self.taken.contains(&candidate) && attempts < MAX_MINT_ATTEMPTS {
            candidate = self.inner.mint();
            attempts += 1;
        }
        if self.taken.contains(&candidate) {
            tracing::warn!(id = %candidate, attempts, "accepting colliding synthetic id");
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// `url` wins over `uri` when both are present. Only non-empty strings count.
pub fn preferred_identifier(entity: &Entity) -> Option<&str> {
    [URL_KEY, URI_KEY].iter().find_map(|key| {
        entity
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })
}

/// Give `entity` an identifier if it lacks one. Idempotent.
///
/// A freshly added `@id` goes first so hoisted nodes read naturally; a null
/// `@id` is overwritten where it stands.
pub fn resolve<M: IdMinter + ?Sized>(entity: &mut Entity, minter: &mut M) {
    if id_of(entity).is_some() {
        return;
    }

    let id = match preferred_identifier(entity) {
        Some(existing) => existing.to_string(),
        None => minter.mint(),
    };

    if entity.contains_key(ID_KEY) {
        entity.insert(ID_KEY.to_string(), Value::String(id));
        return;
    }

    let mut resolved = Map::with_capacity(entity.len() + 1);
    resolved.insert(ID_KEY.to_string(), Value::String(id));
    resolved.extend(std::mem::take(entity));
    *entity = resolved;
}
