//! Error types.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Co2DdfError {
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("No source files starting with '{prefix}' in {dir}")]
    NoSourceFiles { prefix: String, dir: PathBuf },
    #[error("Column '{column}' not found in {file}")]
    MissingColumn { column: String, file: String },
    #[error("Columns '{first}' and '{second}' both map to concept '{concept}'")]
    DuplicateConcept {
        concept: String,
        first: String,
        second: String,
    },
    #[error("Request to {url} failed with status {status}")]
    RequestFailed { url: String, status: u16 },
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
    #[error("Wrapped reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Wrapped serde JSON error: {0}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("Wrapped IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Co2DdfResult<T> = Result<T, Co2DdfError>;

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_anyhow() {
        let anyhow_error = anyhow!("An anyhow error");
        let error: Co2DdfError = anyhow_error.into();
        assert_eq!(error.to_string(), "Wrapped anyhow error: An anyhow error");
    }

    #[test]
    fn test_duplicate_concept_message() {
        let error = Co2DdfError::DuplicateConcept {
            concept: "total_carbon_emissions".into(),
            first: "total emissions".into(),
            second: "total carbon emissions".into(),
        };
        assert!(error.to_string().contains("total_carbon_emissions"));
    }
}
