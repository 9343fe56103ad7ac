//! Error taxonomy of the analysis pipeline

use datafusion::{arrow::error::ArrowError, error::DataFusionError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Invalid static parameter, detected before any plan is executed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A quantity needed by the next step is undefined (empty join, empty input).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("underdetermined fit: {0}")]
    UnderdeterminedFit(String),

    /// Raised by a loader, propagated unchanged.
    #[error("dataset unavailable: {identifier}")]
    DatasetUnavailable {
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("encoding record value")]
    Encoding(#[source] anyhow::Error),

    #[error(transparent)]
    DataFusion(#[from] DataFusionError),

    #[error(transparent)]
    Arrow(#[from] ArrowError),

    /// Unexpected layout of an intermediate result.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

