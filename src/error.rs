//! Error taxonomy for the classification core.
//!
//! Every error here is recoverable at signal or request granularity.
//! Forecast `InsufficientData` is an outcome, not an error (see `forecast`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// A signal rejected before (or while) being classified.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputError {
    #[error("signal has no id")]
    MissingId,

    #[error("signal `{id}` has no text")]
    MissingText { id: String },

    #[error("signal `{id}` has unknown source type `{source_type}`")]
    InvalidSourceType { id: String, source_type: String },

    #[error("signal `{id}` has no timestamp")]
    MissingTimestamp { id: String },

    #[error("signal `{id}` has unparsable timestamp `{raw}`")]
    InvalidTimestamp { id: String, raw: String },

    #[error("signal `{id}` is timestamped in the future ({timestamp} > {now})")]
    FutureTimestamp {
        id: String,
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("signal `{id}` failed during classification: {detail}")]
    Internal { id: String, detail: String },
}

impl InputError {
    /// Short stable label, used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            InputError::MissingId => "missing_id",
            InputError::MissingText { .. } => "missing_text",
            InputError::InvalidSourceType { .. } => "invalid_source_type",
            InputError::MissingTimestamp { .. } => "missing_timestamp",
            InputError::InvalidTimestamp { .. } => "invalid_timestamp",
            InputError::FutureTimestamp { .. } => "future_timestamp",
            InputError::Internal { .. } => "internal",
        }
    }
}

/// Why a statistical model could not be made available.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("reading model parameters from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding model parameters: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("training corpus is empty")]
    EmptyCorpus,

    #[error("training corpus produced an empty vocabulary")]
    EmptyVocabulary,

    #[error("model parameters are inconsistent: {0}")]
    Inconsistent(String),
}

/// Lexicon data that failed to load or validate.
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("reading lexicon from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding lexicon: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("lexicon entry `{category}` has base severity {severity}, expected 1..=5")]
    Severity { category: String, severity: u8 },
}
