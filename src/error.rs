//! Error taxonomy for the cleaning pipeline.
//!
//! Every variant is fatal: this is a batch job, so the first error aborts
//! the run before any aggregation or rendering happens.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input file does not have the expected column layout.
    #[error("schema mismatch: expected {expected} columns, found {found}")]
    SchemaMismatch { expected: usize, found: usize },

    /// The date cell of a record could not be parsed.
    #[error("record {id}: unparsable date {value:?}")]
    DateParse { id: String, value: String },

    /// The severity cell of a record holds something other than a numeric code.
    #[error("record {id}: unparsable severity code {value:?}")]
    SeverityParse { id: String, value: String },

    /// A modal-imputation column has no non-null values left to take a mode from.
    #[error("column {column}: no non-null values to compute a mode from")]
    ModeUndefined { column: &'static str },

    /// A null-policy target column is absent from the table schema.
    #[error("required column {column} is missing from the table schema")]
    MissingRequiredColumn { column: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
