//! Error types for the retrieval core
//!
//! Caller input errors fail before any network call. Collaborator errors on the
//! mandatory path (embedding, index query) abort the search. Reasoning errors
//! are swallowed by the augmenter and never reach the caller.

use thiserror::Error;

/// Errors surfaced by `search` / `search_with_reasoning`
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("unknown filter field '{field}' (expected one of: {expected})")]
    UnknownFilterField { field: String, expected: String },

    #[error("invalid filter operator '{operator}' on field '{field}'")]
    InvalidFilterOperator { field: String, operator: String },

    #[error("invalid filter value for field '{field}': {reason}")]
    InvalidFilterValue { field: String, reason: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("top_k must be a positive integer")]
    InvalidTopK,

    #[error("embedding provider error: {0}")]
    EmbeddingProvider(#[from] EmbeddingError),

    #[error("vector index error: {0}")]
    VectorIndex(#[from] IndexError),
}

impl SearchError {
    /// True for errors caused by the caller's input rather than a collaborator
    pub fn is_input_error(&self) -> bool {
        !matches!(
            self,
            SearchError::EmbeddingProvider(_) | SearchError::VectorIndex(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedder misconfigured: {0}")]
    Config(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Decode(String),

    #[error("expected {expected}-dimensional embedding, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index misconfigured: {0}")]
    Config(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("index returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed index response: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("provider returned no content")]
    EmptyResponse,
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_classification() {
        let unknown = SearchError::UnknownFilterField {
            field: "color".to_string(),
            expected: "price, location".to_string(),
        };
        assert!(unknown.is_input_error());
        assert!(SearchError::InvalidTopK.is_input_error());

        let provider = SearchError::from(EmbeddingError::Transport("timeout".to_string()));
        assert!(!provider.is_input_error());
        let index = SearchError::from(IndexError::Decode("bad json".to_string()));
        assert!(!index.is_input_error());
    }

    #[test]
    fn test_error_messages() {
        let err = SearchError::InvalidFilterOperator {
            field: "price".to_string(),
            operator: "$between".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid filter operator '$between' on field 'price'"
        );
    }
}
