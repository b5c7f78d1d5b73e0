use thiserror::Error;

/// Result type local to colframe-io.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// `row` is the zero-based data row (the header is not counted).
    #[error("row {row}, column '{column}': {reason}")]
    Parse {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("row {row} has {found} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: field {field} is not valid UTF-8")]
    InvalidUtf8 { row: usize, field: usize },

    #[error("column '{column}': {reason}")]
    Config { column: String, reason: String },

    #[error(transparent)]
    Core(#[from] colframe_core::Error),
}
