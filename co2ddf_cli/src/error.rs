use std::path::PathBuf;

use co2ddf::error::Co2DdfError;
use polars::error::PolarsError;

#[derive(thiserror::Error, Debug)]
pub enum Co2DdfCliError {
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("co2ddf error: {0}")]
    Co2DdfError(#[from] Co2DdfError),
    #[error("Failed to read config file {path}: {source}")]
    ConfigError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML in config file: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Co2DdfCliResult<T> = Result<T, Co2DdfCliError>;
