//! Submission record → flattened RO-Crate.

use serde_json::Value;
use tracing::info;

use crate::config::CrosswalkConfig;
use crate::error::Result;
use crate::filter::EntityTemplate;
use crate::flatten::{Flattener, DEFAULT_MAX_PASSES};
use crate::ident::{IdMinter, RandomIdMinter};
use crate::mapping::{apply_mapping, MappingTable};
use crate::record::SubmissionRecord;
use crate::template::{
    default_crate_template, default_entity_template, load_crate_template, load_entity_template,
    read_json, validate_crate_template,
};

#[derive(Debug, Clone)]
pub struct Crosswalk {
    template: Value,
    entity_template: EntityTemplate,
    mappings: MappingTable,
    filter_entities: bool,
    flatten: bool,
    max_passes: usize,
}

impl Crosswalk {
    pub fn new(
        template: Value,
        entity_template: EntityTemplate,
        mappings: MappingTable,
    ) -> Result<Self> {
        validate_crate_template(&template)?;
        Ok(Self {
            template,
            entity_template,
            mappings,
            filter_entities: true,
            flatten: true,
            max_passes: DEFAULT_MAX_PASSES,
        })
    }

    /// Built-in M@TE templates and mappings.
    pub fn mate_default() -> Result<Self> {
        Self::new(
            default_crate_template()?,
            default_entity_template()?,
            MappingTable::mate_default(),
        )
    }

    pub fn from_config(config: &CrosswalkConfig) -> Result<Self> {
        let template = match &config.crate_template {
            Some(path) => load_crate_template(path)?,
            None => default_crate_template()?,
        };
        let entity_template = match &config.entity_template {
            Some(path) => load_entity_template(path)?,
            None => default_entity_template()?,
        };
        let mappings = match &config.mappings {
            Some(path) => serde_json::from_value(read_json(path)?)?,
            None => MappingTable::mate_default(),
        };

        Ok(Self::new(template, entity_template, mappings)?
            .with_filtering(config.filter_entities)
            .with_flattening(config.flatten)
            .max_passes(config.max_passes))
    }

    pub fn with_filtering(mut self, enabled: bool) -> Self {
        self.filter_entities = enabled;
        self
    }

    pub fn with_flattening(mut self, enabled: bool) -> Self {
        self.flatten = enabled;
        self
    }

    pub fn max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn template(&self) -> &Value {
        &self.template
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn build(&self, record: &SubmissionRecord) -> Result<Value> {
        self.build_with(record, RandomIdMinter::new())
    }

    /// Filter a copy of the record, write it into a copy of the template and
    /// flatten the result.
    pub fn build_with<M: IdMinter>(&self, record: &SubmissionRecord, minter: M) -> Result<Value> {
        let mut record = record.clone();
        if self.filter_entities {
            self.entity_template.apply_to_entity(record.as_map_mut());
        }

        let mut document = self.template.clone();
        apply_mapping(&mut document, &self.mappings, &record)?;

        if self.flatten {
            let report = Flattener::with_minter(minter)
                .max_passes(self.max_passes)
                .flatten(&mut document)?;
            info!(nodes = report.nodes, hoisted = report.hoisted, "crosswalk complete");
        }
        Ok(document)
    }

    pub fn to_json_string(&self, record: &SubmissionRecord, pretty: bool) -> Result<String> {
        let document = self.build(record)?;
        Ok(if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        })
    }
}
