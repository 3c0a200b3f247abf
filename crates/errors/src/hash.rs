//! Digest-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum HashError {
    #[error("hash algorithm name must not be empty")]
    MissingAlgorithm,

    #[error("unsupported hash algorithm: {name}")]
    UnsupportedAlgorithm { name: String },

    #[error("invalid hex digest: {message}")]
    InvalidHex { message: String },
}

impl UserFacingError for HashError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingAlgorithm | Self::UnsupportedAlgorithm { .. } => {
                Some("Supported algorithms are sha1, sha256, sha512 and blake3.")
            }
            Self::InvalidHex { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MissingAlgorithm => "hash.missing_algorithm",
            Self::UnsupportedAlgorithm { .. } => "hash.unsupported_algorithm",
            Self::InvalidHex { .. } => "hash.invalid_hex",
        };
        Some(code)
    }
}
