//! Writing the DDF files, the index and the datapackage manifest.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use itertools::Itertools;
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ddf::{concepts_to_df, entities_to_df, DdfDataset};
use crate::error::Co2DdfResult;
use crate::formatters::{CSVFormatter, DatapointsFormatter, OutputFormatter, OutputGenerator};
use crate::COL;

/// This module contains the names of the files that are not derived from concept or domain ids.
pub mod paths {
    pub const DISCRETE_CONCEPTS: &str = "ddf--concepts--discrete.csv";
    pub const CONTINUOUS_CONCEPTS: &str = "ddf--concepts--continuous.csv";
    pub const INDEX: &str = "ddf--index.csv";
    pub const MANIFEST: &str = "datapackage.json";
    pub const DDF_PREFIX: &str = "ddf--";
}
use paths as PATHS;

pub fn entities_file_name(domain: &str) -> String {
    format!("ddf--entities--{domain}.csv")
}

fn is_ddf_csv(file_name: &str) -> bool {
    file_name.starts_with(PATHS::DDF_PREFIX) && file_name.ends_with(".csv")
}

/// Remove previously generated DDF files from `out_dir`, creating it if needed.
/// Files not produced by this tool are left alone.
pub fn cleanup(out_dir: &Path) -> Co2DdfResult<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    for entry in std::fs::read_dir(out_dir)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().to_string();
        if is_ddf_csv(&file_name) || file_name == PATHS::MANIFEST {
            debug!("Removing {}", entry.path().display());
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

fn write_df(path: PathBuf, formatter: &OutputFormatter, df: &mut DataFrame) -> Co2DdfResult<()> {
    let mut f = File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    formatter.save(&mut f, df)?;
    Ok(())
}

/// Write every table of `dataset`. Returns the written file names.
pub fn write_dataset(dataset: &DdfDataset, out_dir: &Path, sigfig: usize) -> Co2DdfResult<Vec<String>> {
    let plain: OutputFormatter = CSVFormatter.into();
    let datapoints: OutputFormatter = DatapointsFormatter { sigfig }.into();
    let mut written = vec![];

    info!("Creating concepts files");
    write_df(
        out_dir.join(PATHS::DISCRETE_CONCEPTS),
        &plain,
        &mut concepts_to_df(&dataset.discrete_concepts)?,
    )?;
    written.push(PATHS::DISCRETE_CONCEPTS.to_string());
    write_df(
        out_dir.join(PATHS::CONTINUOUS_CONCEPTS),
        &plain,
        &mut concepts_to_df(&dataset.continuous_concepts)?,
    )?;
    written.push(PATHS::CONTINUOUS_CONCEPTS.to_string());

    info!("Creating entities files");
    for set in &dataset.entities {
        let file_name = entities_file_name(&set.domain);
        write_df(out_dir.join(&file_name), &plain, &mut entities_to_df(set)?)?;
        written.push(file_name);
    }

    info!("Creating datapoints files");
    for series in &dataset.datapoints {
        let file_name = series.file_name();
        write_df(out_dir.join(&file_name), &datapoints, &mut series.data.clone())?;
        written.push(file_name);
    }
    info!("Wrote {} files to {}", written.len(), out_dir.display());
    Ok(written)
}

/// What a DDF file holds, derived from its name
#[derive(Debug, Clone, PartialEq)]
pub enum DdfFileKind {
    Concepts,
    Entities { domain: String },
    Datapoints { concept: String, key: Vec<String> },
}

impl DdfFileKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".csv")?;
        let parts = stem.split("--").collect_vec();
        match parts.as_slice() {
            ["ddf", "concepts", ..] => Some(Self::Concepts),
            ["ddf", "entities", domain, ..] => Some(Self::Entities {
                domain: domain.to_string(),
            }),
            ["ddf", "datapoints", concept, "by", key @ ..] if !key.is_empty() => {
                Some(Self::Datapoints {
                    concept: concept.to_string(),
                    key: key.iter().map(|k| k.to_string()).collect(),
                })
            }
            _ => None,
        }
    }

    pub fn primary_key(&self) -> Vec<String> {
        match self {
            Self::Concepts => vec![COL::CONCEPT.to_string()],
            Self::Entities { domain } => vec![domain.clone()],
            Self::Datapoints { key, .. } => key.clone(),
        }
    }
}

/// A DDF file found in the output directory
#[derive(Debug, Clone)]
pub struct DdfFile {
    pub file: String,
    pub kind: DdfFileKind,
    pub columns: Vec<String>,
}

fn read_header(path: &Path) -> Co2DdfResult<Vec<String>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_n_rows(Some(1))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect())
}

/// List the DDF csv files of `out_dir`, excluding the index, sorted by name
pub fn scan_ddf_files(out_dir: &Path) -> Co2DdfResult<Vec<DdfFile>> {
    let mut files = vec![];
    let names = std::fs::read_dir(out_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| is_ddf_csv(name) && name != PATHS::INDEX)
        .sorted();
    for file in names {
        let Some(kind) = DdfFileKind::from_file_name(&file) else {
            debug!("Skipping unrecognised file {file}");
            continue;
        };
        let columns = read_header(&out_dir.join(&file))?;
        files.push(DdfFile {
            file,
            kind,
            columns,
        });
    }
    Ok(files)
}

/// Build the `key,value,file` index from the headers of the DDF files in `out_dir`
pub fn index_df(files: &[DdfFile]) -> PolarsResult<DataFrame> {
    let mut keys = vec![];
    let mut values = vec![];
    let mut file_names = vec![];
    for f in files {
        let key = f.kind.primary_key();
        let row_values = match &f.kind {
            DdfFileKind::Datapoints { concept, .. } => vec![concept.clone()],
            _ => f
                .columns
                .iter()
                .filter(|c| !key.contains(*c))
                .cloned()
                .collect_vec(),
        };
        for value in row_values {
            keys.push(key.join(","));
            values.push(value);
            file_names.push(f.file.clone());
        }
    }
    DataFrame::new(vec![
        Series::new(COL::INDEX_KEY, keys),
        Series::new(COL::INDEX_VALUE, values),
        Series::new(COL::INDEX_FILE, file_names),
    ])
}

pub fn create_index_file(out_dir: &Path) -> Co2DdfResult<PathBuf> {
    let files = scan_ddf_files(out_dir)?;
    let mut df = index_df(&files)?;
    let path = out_dir.join(PATHS::INDEX);
    write_df(path.clone(), &CSVFormatter.into(), &mut df)?;
    info!("Index with {} entries written to {}", df.height(), path.display());
    Ok(path)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResourceField {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSchema {
    pub fields: Vec<ResourceField>,
    pub primary_key: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Resource {
    pub path: String,
    pub name: String,
    pub schema: ResourceSchema,
}

/// The `datapackage.json` manifest describing every DDF file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DataPackage {
    pub name: String,
    pub language: Language,
    pub resources: Vec<Resource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Language {
    pub id: String,
}

impl DataPackage {
    pub fn from_files(name: &str, files: &[DdfFile]) -> Self {
        let resources = files
            .iter()
            .map(|f| Resource {
                path: f.file.clone(),
                name: f.file.trim_end_matches(".csv").to_string(),
                schema: ResourceSchema {
                    fields: f
                        .columns
                        .iter()
                        .map(|c| ResourceField { name: c.clone() })
                        .collect(),
                    primary_key: f.kind.primary_key(),
                },
            })
            .collect();
        Self {
            name: name.to_string(),
            language: Language { id: "en".into() },
            resources,
        }
    }
}

pub fn write_manifest(out_dir: &Path, name: &str) -> Co2DdfResult<PathBuf> {
    let files = scan_ddf_files(out_dir)?;
    let package = DataPackage::from_files(name, &files);
    let path = out_dir.join(PATHS::MANIFEST);
    let f = File::create(&path)?;
    serde_json::to_writer_pretty(f, &package)?;
    info!(
        "Manifest with {} resources written to {}",
        package.resources.len(),
        path.display()
    );
    Ok(path)
}
