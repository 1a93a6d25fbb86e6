use std::{path::PathBuf, time::Duration};

use crate::domain::MessageRef;

/// Core error type for the relay.
///
/// Adapter crates should map their specific errors into this type so the relay
/// core can handle failures consistently. Incomplete setup is *not* an error; see
/// [`crate::relay::ResumeOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid path: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("cannot create store root {path}: {source}")]
    StoreInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupted store record {key}: {source}")]
    StoreCorruption {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unwrapped an absent value")]
    EmptyUnwrap,

    #[error("reposted but failed to delete original message {message:?}: {reason}")]
    CleanupFailure { message: MessageRef, reason: String },

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
