//! Error type shared by the engine and the `coherence` binary.
//!
//! Numeric edge cases (unknown locations, degenerate ranges, zero compensation)
//! are absorbed where they occur and never show up here. What remains are
//! failures a caller can act on: bad input, an unreachable population source,
//! a missing analysis.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid flags or environment.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The population source could not be read or parsed.
    #[error("Population source error: {0}")]
    Source(String),

    /// Snapshot save/load failed. The engine logs and ignores these.
    #[error("Snapshot persistence error: {0}")]
    Persistence(String),

    /// Lookup by identifier found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An encoded profile was built under a different snapshot.
    #[error("Encoding built for snapshot v{encoded} cannot be used with snapshot v{current}")]
    StaleEncoding { encoded: u64, current: u64 },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Background task failure (panicked or cancelled training task).
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit code for the `coherence` binary.
    ///
    /// 2 = input/config, 3 = data, 4 = compute/internal, 5 = not found.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) | Error::Io(_) | Error::Json(_) => 2,
            Error::Source(_) | Error::Http(_) => 3,
            Error::Persistence(_) | Error::StaleEncoding { .. } | Error::Internal(_) => 4,
            Error::NotFound(_) => 5,
        }
    }
}
