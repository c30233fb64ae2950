use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CrateError, Result};
use crate::flatten::DEFAULT_MAX_PASSES;

/// Crosswalk settings, usually read from a JSON file.
///
/// Unset paths fall back to the built-in M@TE templates and mapping table.
/// Relative paths are taken relative to the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrosswalkConfig {
    pub crate_template: Option<PathBuf>,
    pub entity_template: Option<PathBuf>,
    pub mappings: Option<PathBuf>,
    pub filter_entities: bool,
    pub flatten: bool,
    pub max_passes: usize,
}

impl Default for CrosswalkConfig {
    fn default() -> Self {
        Self {
            crate_template: None,
            entity_template: None,
            mappings: None,
            filter_entities: true,
            flatten: true,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl CrosswalkConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| CrateError::ConfigUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| CrateError::ConfigJson {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.relative_to(base))
    }

    fn relative_to(mut self, base: &Path) -> Self {
        for path in [
            &mut self.crate_template,
            &mut self.entity_template,
            &mut self.mappings,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}
