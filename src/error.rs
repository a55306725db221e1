//! Error taxonomy shared by every core operation.
//!
//! Validation failures ([`LocatorError::Parse`], [`LocatorError::Range`]) are
//! raised before the store is touched. Store and query failures carry the
//! engine's own diagnostic text so callers can surface it verbatim.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocatorError {
    /// Input could not be interpreted as the expected type.
    #[error("parse error: {0}")]
    Parse(String),

    /// Numeric input outside its valid domain.
    #[error("range error: {0}")]
    Range(String),

    /// Source file missing, unreadable, or structurally invalid.
    #[error("ingest error: {0}")]
    Ingest(String),

    /// The query engine rejected or failed executing caller-supplied text.
    #[error("query error: {0}")]
    Query(String),

    /// Store unreachable, locked, or a schema operation failed.
    #[error("store error: {0}")]
    Store(String),

    /// A named place (such as an address) is not known.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// Export destination could not be written.
    #[error("export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, LocatorError>;

impl LocatorError {
    pub fn kind(&self) -> &'static str {
        match self {
            LocatorError::Parse(_) => "parse",
            LocatorError::Range(_) => "range",
            LocatorError::Ingest(_) => "ingest",
            LocatorError::Query(_) => "query",
            LocatorError::Store(_) => "store",
            LocatorError::Lookup(_) => "lookup",
            LocatorError::Export(_) => "export",
        }
    }

    pub(crate) fn store(context: impl std::fmt::Display, err: rusqlite::Error) -> Self {
        LocatorError::Store(format!("{context}: {err}"))
    }

    pub(crate) fn ingest(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        LocatorError::Ingest(format!("{context}: {err}"))
    }
}
