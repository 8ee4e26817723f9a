use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a mining run.
#[derive(Error, Debug)]
pub enum Error {
    /// A reduction or assembly step was handed input it must never see.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Transaction source or report sink could not be accessed.
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mempool file is not valid JSON.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Canonical serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Difficulty target is not a 64-digit hex string.
    #[error("invalid difficulty target {0:?}: expected 64 hex digits")]
    InvalidTarget(String),

    /// Every nonce up to the configured bound was tried.
    #[error("nonce space exhausted after {attempts} attempts")]
    SearchExhausted { attempts: u64 },

    /// The cancellation hook stopped the search.
    #[error("mining cancelled at nonce {nonce}")]
    Cancelled { nonce: u64 },

    /// Settings could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
