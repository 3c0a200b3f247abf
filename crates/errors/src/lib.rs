#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the kratos download engine
//!
//! This crate provides fine-grained error types organized by domain.
//! All error types implement Clone so a single failure can be fanned out to
//! every progress subscriber and still be returned to the caller.

use std::borrow::Cow;

use thiserror::Error;

pub mod config;
pub mod download;
pub mod hash;
pub mod network;
pub mod storage;

// Re-export all error types at the root
pub use config::ConfigError;
pub use download::DownloadError;
pub use hash::HashError;
pub use network::NetworkError;
pub use storage::StorageError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether this error ended a verification session because the attempt
    /// budget ran out
    #[must_use]
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Download(DownloadError::Corrupted { .. }))
    }
}

/// Result type alias for kratos operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Network(err) => err.user_message(),
            Error::Storage(err) => err.user_message(),
            Error::Hash(err) => err.user_message(),
            Error::Download(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Network(err) => err.user_hint(),
            Error::Storage(err) => err.user_hint(),
            Error::Hash(err) => err.user_hint(),
            Error::Download(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(err) => err.is_retryable(),
            Error::Storage(err) => err.is_retryable(),
            Error::Download(err) => err.is_retryable(),
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Network(err) => err.user_code(),
            Error::Storage(err) => err.user_code(),
            Error::Hash(err) => err.user_code(),
            Error::Download(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
        }
    }
}
