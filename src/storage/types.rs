use serde::Serialize;
use thiserror::Error;

use crate::parsers::parse_url;
use crate::types::ParsedUrl;

// ============================================================================
// Error Types
// ============================================================================

/// URL index errors
#[derive(Debug, Error)]
pub enum IndexError {
    /// Another process holds a lock on the index file
    #[error("the URL index is locked by another process")]
    Locked,

    #[error("index migration failed: {0}")]
    Migration(String),

    /// Rejected before reaching FTS5
    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    #[error("database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl IndexError {
    /// Classify a sqlx error, separating lock contention from the rest.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_error(&err.to_string()) {
            return IndexError::Locked;
        }
        IndexError::Other(err)
    }
}

pub(crate) fn is_lock_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// SearchLink
// ============================================================================

/// A URL and the text it is found by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchLink {
    pub text: String,
    pub url: ParsedUrl,
}

impl SearchLink {
    pub fn parse(url: &str, text: &str) -> crate::Result<Self> {
        Ok(Self {
            text: text.to_owned(),
            url: parse_url(url)?,
        })
    }
}
