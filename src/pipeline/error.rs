//! Error and warning types for the health pipeline.
//!
//! Fatal conditions are `HealthError` variants and abort the batch. Non-fatal
//! conditions are `PipelineWarning` values returned alongside stage results so
//! callers can surface them without treating them as control flow.

use std::fmt;

use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, HealthError>;

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum HealthError {
    /// Required raw or derived columns are absent and cannot be derived.
    ///
    /// Carries every missing column name, not just the first one found.
    #[error("Missing required column(s): {}", missing.join(", "))]
    Schema {
        /// Column names that could not be found or derived
        missing: Vec<String>,
    },

    /// The feature schema offered to the classifier does not match the one it
    /// was trained on. Columns are never dropped or reordered to make it fit.
    #[error("Artifact mismatch: classifier expects features {expected:?}, found {found:?}")]
    ArtifactMismatch {
        /// Feature columns the artifact bundle was trained on
        expected: Vec<String>,
        /// Feature columns offered at inference
        found: Vec<String>,
    },

    /// Inconsistent or invalid configuration, including label encoder mismatches.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Model fitting failed.
    #[error("Training error: {0}")]
    Training(String),

    /// Input data cannot be processed at all (e.g. an empty table).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HealthError {
    /// Build a schema error from any list of column names.
    pub fn missing_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HealthError::Schema {
            missing: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Non-fatal conditions raised while processing a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// A value or column fell back to a documented default.
    DataQuality { column: String, message: String },
    /// A class has very few samples; the stratified split may be unstable.
    TrainingDataImbalance { class: String, count: usize },
}

impl PipelineWarning {
    pub fn data_quality(column: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineWarning::DataQuality {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Log the warning at WARN level.
    pub fn emit(&self) {
        match self {
            PipelineWarning::DataQuality { column, message } => {
                tracing::warn!(column = %column, "{}", message);
            }
            PipelineWarning::TrainingDataImbalance { class, count } => {
                tracing::warn!(class = %class, count, "{}", self);
            }
        }
    }
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::DataQuality { column, message } => {
                write!(f, "{}: {}", column, message)
            }
            PipelineWarning::TrainingDataImbalance { class, count } => write!(
                f,
                "class '{}' has only {} sample(s); stratified split may be unstable",
                class, count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_every_column() {
        let err = HealthError::missing_columns(["COGS", "Revenue"]);
        let msg = err.to_string();
        assert!(msg.contains("COGS"));
        assert!(msg.contains("Revenue"));
    }

    #[test]
    fn test_warning_display() {
        let w = PipelineWarning::TrainingDataImbalance {
            class: "Risky".to_string(),
            count: 3,
        };
        assert!(w.to_string().contains("Risky"));
        assert!(w.to_string().contains('3'));
    }
}
