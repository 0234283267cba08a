//! Error type shared by the loading, aggregation and charting code.

use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScorecardError {
    /// The data file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// One or more required columns are absent from the header row.
    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chart rendering failed: {0}")]
    Chart(String),
}

impl ScorecardError {
    /// True when the underlying I/O error is a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScorecardError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ScorecardError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ScorecardError::Chart(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScorecardError>;
