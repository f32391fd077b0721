//! Error type shared by the board model, the engine and the command layer.

use thiserror::Error;

/// Everything that can go wrong while building, mutating or storing board data.
///
/// Stale taxonomy references are not errors: a task whose status names
/// a deleted category is valid data.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("cannot parse date `{input}`")]
    UnparseableDate { input: String },

    #[error("cannot delete the last remaining {kind}")]
    LastEntry { kind: &'static str },

    #[error("{kind} with id `{id}` already exists")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{kind} `{id}` not found")]
    NotFound { kind: &'static str, id: String },

    #[error("multiple tasks match `{identifier}`: {candidates}; use the id instead")]
    AmbiguousTask { identifier: String, candidates: String },

    #[error("storage failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("collaborator failure: {0}")]
    Collaborator(String),
}

impl BoardError {
    /// True for malformed input the caller can fix and resubmit.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BoardError::MissingField { .. }
                | BoardError::InvalidField { .. }
                | BoardError::UnparseableDate { .. }
                | BoardError::LastEntry { .. }
                | BoardError::DuplicateId { .. }
        )
    }
}

pub type BoardResult<T> = Result<T, BoardError>;
