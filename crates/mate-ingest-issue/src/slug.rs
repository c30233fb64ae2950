//! Repository slug choice.
//!
//! A slug must be a valid repository name. If the proposed one is taken, a
//! numeric suffix is appended: `plume`, `plume_1`, `plume_2`, ...

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

pub const MAX_SLUG_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlugError {
    #[error("no slug proposed")]
    Empty,

    #[error("`{0}` is not a valid repository name (letters, digits, `-`, `_` and `.` only)")]
    Invalid(String),

    #[error("`{proposed}` and its first {attempts} suffixed variants are all taken")]
    Exhausted { proposed: String, attempts: usize },
}

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("slug pattern is valid"))
}

/// `name` for attempt 0, `name_<i>` afterwards.
pub fn encode(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        name.to_string()
    } else {
        format!("{name}_{attempt}")
    }
}

/// First candidate for which `exists` answers `false`.
pub fn choose_slug(
    proposed: &str,
    exists: &mut dyn FnMut(&str) -> bool,
) -> Result<String, SlugError> {
    let proposed = proposed.trim();
    if proposed.is_empty() {
        return Err(SlugError::Empty);
    }
    if !slug_re().is_match(proposed) || proposed.starts_with('.') {
        return Err(SlugError::Invalid(proposed.to_string()));
    }

    (0..MAX_SLUG_ATTEMPTS)
        .map(|attempt| encode(proposed, attempt))
        .find(|candidate| !exists(candidate))
        .ok_or_else(|| SlugError::Exhausted {
            proposed: proposed.to_string(),
            attempts: MAX_SLUG_ATTEMPTS,
        })
}
