use std::path::PathBuf;

use log::{debug, info};

use crate::config::Config;
use crate::ddf::DdfDataset;
use crate::error::Co2DdfResult;
use crate::source::{Domain, SourceTable};
use crate::validate::ValidationReport;

// Re-exports
pub use column_names as COL;

// Modules
pub mod column_names;
pub mod config;
pub mod ddf;
pub mod error;
pub mod fetch;
pub mod formatters;
pub mod ids;
pub mod output;
pub mod source;
pub mod transform;
pub mod validate;

/// Name given to the dataset in `datapackage.json`
pub const DATASET_NAME: &str = "ddf--cdiac--co2";

/// Outcome of a full ETL run
#[derive(Debug)]
pub struct RunSummary {
    pub files: Vec<String>,
    pub index: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub validation: ValidationReport,
}

/// Type for the CDIAC to DDF pipeline
pub struct Co2Ddf {
    pub config: Config,
}

impl Default for Co2Ddf {
    fn default() -> Self {
        Self::new()
    }
}

impl Co2Ddf {
    /// Setup the pipeline with default configuration
    pub fn new() -> Self {
        Self::new_with_config(Config::default())
    }

    /// Setup the pipeline with custom configuration
    pub fn new_with_config(config: Config) -> Self {
        debug!("config: {config:?}");
        Self { config }
    }

    /// Read the source files of `domain` and apply the configured value transforms
    pub fn load(&self, domain: Domain) -> Co2DdfResult<SourceTable> {
        let table = source::load_domain(&self.config.source_dir, domain)?;
        let transforms = transform::transforms_for(domain, &self.config);
        Ok(transform::apply(table, &transforms)?)
    }

    /// Build the DDF tables in memory
    pub fn build(&self) -> Co2DdfResult<DdfDataset> {
        info!("Reading source files from {}", self.config.source_dir.display());
        let global = self.load(Domain::Global)?;
        let nation = self.load(Domain::Nation)?;
        DdfDataset::from_tables(&global, &nation)
    }

    /// Run the whole pipeline: clean the output directory, write concepts, entities and
    /// datapoints, then the index and manifest when enabled
    pub fn run(&self) -> Co2DdfResult<RunSummary> {
        let dataset = self.build()?;
        let validation = validate::validate(&dataset)?;
        validation.log();

        let out_dir = &self.config.out_dir;
        output::cleanup(out_dir)?;
        let files = output::write_dataset(&dataset, out_dir, self.config.sigfig)?;

        let index = if self.config.write_index {
            Some(output::create_index_file(out_dir)?)
        } else {
            None
        };
        let manifest = if self.config.write_manifest {
            Some(output::write_manifest(out_dir, DATASET_NAME)?)
        } else {
            None
        };
        info!("Done!");
        Ok(RunSummary {
            files,
            index,
            manifest,
            validation,
        })
    }

    /// Whether the remote source is newer than `config.last_update`
    pub async fn has_newer_source(&self) -> Co2DdfResult<bool> {
        fetch::has_newer_source(&self.config).await
    }

    /// Download the source files when they are newer, or unconditionally with `force`.
    /// Returns the downloaded paths, empty when nothing changed.
    pub async fn update_source(&self, force: bool) -> Co2DdfResult<Vec<PathBuf>> {
        if !force && !self.has_newer_source().await? {
            info!("No newer source");
            return Ok(vec![]);
        }
        fetch::bulk_download(&self.config, &self.config.source_dir).await
    }
}
