//! Reading and normalizing the CDIAC source files.
//!
//! Each domain (`global`, `nation`) is spread over one or more files, one per dataset version,
//! e.g. `global.1751_2014.csv`. The files are read with every column as a string, headers are
//! mapped to concept ids, and the frames of a domain are stacked into a single `SourceTable`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use itertools::Itertools;
use log::{debug, info, warn};
use polars::prelude::*;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::{Co2DdfError, Co2DdfResult};
use crate::ids::{concept_id_for_column, to_concept_id};
use crate::COL;

/// Version given to files without a version segment in their name
pub const DEFAULT_VERSION: &str = "default";

const MALFORMED_YEAR_HEADER: &[u8] = b"Year\"";

/// Entity domains present in the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Domain {
    Global,
    Nation,
}

impl Domain {
    /// Source files of this domain start with the domain name
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Domain::Global => COL::GLOBAL,
            Domain::Nation => COL::NATION,
        }
    }

    /// Column holding the entity id in the source table
    pub fn key(&self) -> &'static str {
        self.file_prefix()
    }

    /// Number of unit description rows below the header
    pub fn skip_rows(&self) -> usize {
        match self {
            Domain::Global => 1,
            Domain::Nation => 2,
        }
    }

    /// Key columns of the stacked table, in output order
    pub fn key_columns(&self) -> Vec<&'static str> {
        match self {
            Domain::Global => vec![COL::GLOBAL, COL::VERSION, COL::YEAR],
            Domain::Nation => vec![COL::NATION, COL::NATION_NAME, COL::VERSION, COL::YEAR],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub version: String,
}

/// All files of one domain stacked into a single frame.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub domain: Domain,
    pub data: DataFrame,
    /// `(concept id, source header)` for every measure column, in first-seen order
    pub concept_names: Vec<(String, String)>,
}

impl SourceTable {
    /// Measure columns, i.e. everything that is not a key
    pub fn measures(&self) -> Vec<String> {
        let keys = self.domain.key_columns();
        self.data
            .get_column_names()
            .into_iter()
            .filter(|name| !keys.contains(name))
            .map(|name| name.to_string())
            .collect()
    }
}

/// `global.1751_2014.csv` => `1751_2014`
pub fn version_from_file_name(file_name: &str) -> String {
    let parts = file_name.split('.').collect_vec();
    if parts.len() >= 3 {
        to_concept_id(parts[1])
    } else {
        DEFAULT_VERSION.to_string()
    }
}

/// List the csv files of `domain` in `source_dir`, sorted by name
pub fn discover(source_dir: &Path, domain: Domain) -> Co2DdfResult<Vec<SourceFile>> {
    let mut files = std::fs::read_dir(source_dir)
        .with_context(|| format!("Failed to list source directory {}", source_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_name = entry.file_name().to_string_lossy().to_string();
            (file_name.starts_with(domain.file_prefix())
                && file_name.to_lowercase().ends_with(".csv"))
            .then(|| SourceFile {
                path: entry.path(),
                version: version_from_file_name(&file_name),
            })
        })
        .collect_vec();
    if files.is_empty() {
        return Err(Co2DdfError::NoSourceFiles {
            prefix: domain.file_prefix().into(),
            dir: source_dir.to_path_buf(),
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Found {} {domain} file(s): {files:?}", files.len());
    Ok(files)
}

/// Some releases of the global file start with `Year"`. Left alone, the stray quote opens a
/// quoted field that runs to the end of the file.
fn fix_malformed_header(mut contents: Vec<u8>) -> Vec<u8> {
    if contents.starts_with(MALFORMED_YEAR_HEADER) {
        debug!("Fixing malformed year header");
        contents.remove(MALFORMED_YEAR_HEADER.len() - 1);
    }
    contents
}

fn read_csv_as_strings(path: &Path) -> Co2DdfResult<DataFrame> {
    let contents =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        // All columns as strings, cells such as "." are handled when casting
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(fix_malformed_header(contents)))
        .finish()?)
}

/// Read one source file. Returns the normalized frame and the display names of its measures.
pub fn read_source_file(
    file: &SourceFile,
    domain: Domain,
) -> Co2DdfResult<(DataFrame, Vec<(String, String)>)> {
    info!("Reading {}", file.path.display());
    let file_label = file.path.display().to_string();
    let mut df = read_csv_as_strings(&file.path)?;

    let headers = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect_vec();
    let mut ids: Vec<String> = Vec::with_capacity(headers.len());
    let mut concept_names = vec![];
    for header in &headers {
        let id = concept_id_for_column(header);
        if let Some(pos) = ids.iter().position(|existing| existing == &id) {
            return Err(Co2DdfError::DuplicateConcept {
                concept: id,
                first: headers[pos].clone(),
                second: header.clone(),
            });
        }
        if id != COL::YEAR && id != domain.key() {
            concept_names.push((id.clone(), header.split_whitespace().join(" ")));
        }
        ids.push(id);
    }
    df.set_column_names(&ids)?;
    debug!("Columns of {file_label}: {ids:?}");

    let required = match domain {
        Domain::Global => vec![COL::YEAR],
        Domain::Nation => vec![COL::YEAR, COL::NATION],
    };
    if let Some(missing) = required.iter().find(|c| !ids.iter().any(|id| id == *c)) {
        return Err(Co2DdfError::MissingColumn {
            column: missing.to_string(),
            file: file_label,
        });
    }

    let skip = domain.skip_rows().min(df.height());
    let mut df = df.slice(skip as i64, df.height() - skip);
    let height = df.height();

    for (id, _) in &concept_names {
        let values = df.column(id)?.cast(&DataType::Float64)?;
        df.with_column(values)?;
    }
    let years = df
        .column(COL::YEAR)?
        .cast(&DataType::Float64)?
        .cast(&DataType::Int64)?;
    df.with_column(years)?;
    df.with_column(Series::new(COL::VERSION, vec![file.version.as_str(); height]))?;

    match domain {
        Domain::Global => {
            df.with_column(Series::new(COL::GLOBAL, vec![COL::WORLD_ID; height]))?;
        }
        Domain::Nation => {
            df.rename(COL::NATION, COL::NATION_NAME)?;
            let nation_ids: Vec<Option<String>> = df
                .column(COL::NATION_NAME)?
                .str()?
                .into_iter()
                .map(|name| name.map(to_concept_id))
                .collect();
            df.with_column(Series::new(COL::NATION, nation_ids))?;
        }
    }

    let order = domain
        .key_columns()
        .into_iter()
        .map(|s| s.to_string())
        .chain(concept_names.iter().map(|(id, _)| id.clone()))
        .collect_vec();
    Ok((df.select(order)?, concept_names))
}

/// Drop rows without a year, logging the affected rows first
fn drop_missing_years(df: DataFrame, domain: Domain) -> Co2DdfResult<DataFrame> {
    let missing = df.column(COL::YEAR)?.is_null();
    if !missing.any() {
        return Ok(df);
    }
    let dropped = df.filter(&missing)?;
    warn!(
        "Dropping {} {domain} row(s) where year is missing:\n{}",
        dropped.height(),
        dropped.select([domain.key(), COL::YEAR])?
    );
    Ok(df.filter(&!&missing)?)
}

/// Read all files of `domain` and stack them, unioning the measure columns.
pub fn load_domain(source_dir: &Path, domain: Domain) -> Co2DdfResult<SourceTable> {
    let files = discover(source_dir, domain)?;
    let parts = files
        .iter()
        .map(|file| read_source_file(file, domain))
        .collect::<Co2DdfResult<Vec<_>>>()?;

    // First-seen order across files, first display name wins
    let mut concept_names: Vec<(String, String)> = vec![];
    for (_, names) in &parts {
        for (id, name) in names {
            if !concept_names.iter().any(|(existing, _)| existing == id) {
                concept_names.push((id.clone(), name.clone()));
            }
        }
    }
    let order = domain
        .key_columns()
        .into_iter()
        .map(|s| s.to_string())
        .chain(concept_names.iter().map(|(id, _)| id.clone()))
        .collect_vec();

    let mut stacked: Option<DataFrame> = None;
    for (mut df, _) in parts {
        let height = df.height();
        for (id, _) in &concept_names {
            if df.column(id).is_err() {
                df.with_column(Series::full_null(id, height, &DataType::Float64))?;
            }
        }
        let df = df.select(order.clone())?;
        match stacked.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&df)?;
            }
            None => stacked = Some(df),
        }
    }
    let data = stacked.with_context(|| format!("No {domain} data read"))?;
    let data = drop_missing_years(data, domain)?;
    info!("Loaded {domain} table with shape: {:?}", data.shape());

    Ok(SourceTable {
        domain,
        data,
        concept_names,
    })
}
