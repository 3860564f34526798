//! Crate-wide error type and result alias.

use thiserror::Error;

/// Errors raised while indexing annotated documents or evaluating span queries.
#[derive(Error, Debug)]
pub enum Error {
    /// A query tree failed validation before any index access.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A cursor was used outside its contract, e.g. `current()` before the
    /// first `advance()` or after exhaustion.
    #[error("Illegal cursor state: {0}")]
    IllegalState(&'static str),

    /// Stored annotation data is malformed, truncated, or inconsistent.
    #[error("Corpus data error: {0}")]
    CorpusData(String),

    /// Error surfaced by the underlying inverted index.
    #[error(transparent)]
    Index(#[from] tantivy::TantivyError),

    /// I/O error while reading or writing index files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid_query(msg: impl Into<String>) -> Self {
        Error::InvalidQuery(msg.into())
    }

    pub(crate) fn corpus_data(msg: impl Into<String>) -> Self {
        Error::CorpusData(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
