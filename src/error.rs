//! Errors raised at the engine's input boundary.
//!
//! Matching itself never fails. These errors only surface while turning
//! caller-supplied settings into compiled form (override expressions, JSON
//! blobs), and the engine entry points log and drop them instead of
//! propagating.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid override pattern for '{term}': {source}")]
    InvalidPattern {
        term: String,
        #[source]
        source: regex::Error,
    },

    #[error("unknown regex flag '{flag}' in override for '{term}'")]
    UnknownFlag { term: String, flag: char },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
