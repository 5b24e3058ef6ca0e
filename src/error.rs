//! Crate-wide error types for startup-fatal failures.
//!
//! Datapath failures (malformed packets, handshake rejects, decrypt errors)
//! are never propagated as `MixerError` — they are logged and the offending
//! unit of work is dropped in place, per the error handling policy.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MixerError {
    #[error("failed to read config file {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read authorized-keys file {path:?}: {source}")]
    AuthorizedKeysRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse authorized-keys file {path:?}: {source}")]
    AuthorizedKeysParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid public key for client {name:?} in authorized-keys file")]
    InvalidClientKey { name: String },

    #[error("failed to read server key file {path:?}: {source}")]
    ServerKeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse server key file {path:?}: {reason}")]
    ServerKeyParse { path: PathBuf, reason: String },

    #[error("no secure or plain UDP inputs configured: nothing to listen on")]
    NoInputsConfigured,

    #[error("failed to bind UDP socket on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MixerError>;
