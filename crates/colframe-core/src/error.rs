use thiserror::Error;

use crate::schema::DataType;

/// Canonical result for core and the engines built on it.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("malformed pattern '{pattern}': {reason}")]
    MalformedPattern { pattern: String, reason: String },

    #[error("reducer '{reducer}' applied to an empty group of column '{column}'")]
    EmptyGroupReduction { column: String, reducer: String },

    #[error("unknown function '{name}' for {data_type} input")]
    UnknownFunction { name: String, data_type: DataType },

    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize },

    // Column length disagreement or similar structural breakage. Engines never
    // produce this on valid frames; it signals a logic defect upstream.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl Error {
    pub(crate) fn mismatch(msg: impl Into<String>) -> Self {
        Error::TypeMismatch(msg.into())
    }

    /// True for errors caused by a logic defect rather than by caller input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::InternalInvariantViolation(_))
    }
}
