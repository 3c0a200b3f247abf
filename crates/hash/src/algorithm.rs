//! Closed set of digest algorithms selectable by name

use kratos_errors::{Error, HashError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digest algorithms the engine can verify downloads against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1, the digest launcher manifests publish for libraries and assets
    #[default]
    Sha1,
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    /// Every supported algorithm, in declaration order
    pub const ALL: [Self; 4] = [Self::Sha1, Self::Sha256, Self::Sha512, Self::Blake3];

    /// Canonical lower-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// Digest length in bytes
    #[must_use]
    pub fn digest_length(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 | Self::Blake3 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Look an algorithm up by name
    ///
    /// Matching ignores ASCII case and a single dash (`SHA-256` is `sha256`).
    ///
    /// # Errors
    ///
    /// Returns `HashError::MissingAlgorithm` for an empty name and
    /// `HashError::UnsupportedAlgorithm` for anything outside the closed set.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(HashError::MissingAlgorithm.into());
        }

        let normalized = trimmed.to_ascii_lowercase().replacen('-', "", 1);
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.as_str() == normalized)
            .ok_or_else(|| {
                HashError::UnsupportedAlgorithm {
                    name: name.to_string(),
                }
                .into()
            })
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
