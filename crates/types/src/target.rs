//! Download target: where an artifact comes from and where it is written

use kratos_errors::{DownloadError, Error, NetworkError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// The (source locator, destination path) pair identifying one artifact.
///
/// Fields are private so a target cannot change once it has been handed to a
/// download attempt; every constructor goes through [`DownloadTarget::from_parts`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTarget")]
pub struct DownloadTarget {
    source: Url,
    destination: PathBuf,
}

/// Unchecked wire form of a target
#[derive(Deserialize)]
struct RawTarget {
    source: Url,
    destination: PathBuf,
}

impl TryFrom<RawTarget> for DownloadTarget {
    type Error = Error;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        Self::from_parts(raw.source, raw.destination)
    }
}

impl DownloadTarget {
    /// Parse `source` and pair it with `destination`
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed, uses a scheme other than
    /// http or https, or the destination is empty.
    pub fn new(source: &str, destination: impl Into<PathBuf>) -> Result<Self, Error> {
        let source = Url::parse(source).map_err(|e| NetworkError::InvalidUrl(e.to_string()))?;
        Self::from_parts(source, destination)
    }

    /// Build a target from an already parsed URL
    ///
    /// # Errors
    ///
    /// Returns an error if the URL scheme is unsupported or the destination is empty.
    pub fn from_parts(source: Url, destination: impl Into<PathBuf>) -> Result<Self, Error> {
        match source.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(NetworkError::UnsupportedProtocol {
                    protocol: scheme.to_string(),
                }
                .into())
            }
        }

        let destination = destination.into();
        if destination.as_os_str().is_empty() {
            return Err(DownloadError::InvalidTarget {
                field: "destination".to_string(),
            }
            .into());
        }

        Ok(Self {
            source,
            destination,
        })
    }

    /// Start assembling a target field by field
    #[must_use]
    pub fn builder() -> DownloadTargetBuilder {
        DownloadTargetBuilder::default()
    }

    /// Target for an asset object stored at `<objects_dir>/<hash[..2]>/<hash>`
    ///
    /// # Errors
    ///
    /// Returns an error if `hash` is shorter than two characters or the URL is invalid.
    pub fn asset_object(objects_dir: &Path, source: &str, hash: &str) -> Result<Self, Error> {
        let prefix = hash.get(..2).ok_or_else(|| DownloadError::InvalidTarget {
            field: "hash".to_string(),
        })?;
        Self::new(source, objects_dir.join(prefix).join(hash))
    }

    #[must_use]
    pub fn source(&self) -> &Url {
        &self.source
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Directory that must exist before the destination can be opened
    #[must_use]
    pub fn parent_dir(&self) -> Option<&Path> {
        self.destination
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }
}

impl fmt::Display for DownloadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination.display())
    }
}

/// Incremental constructor reporting which required field is missing
#[derive(Debug, Default, Clone)]
pub struct DownloadTargetBuilder {
    source: Option<String>,
    destination: Option<PathBuf>,
}

impl DownloadTargetBuilder {
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Validate the collected fields
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidTarget` naming the first missing field,
    /// or the errors of [`DownloadTarget::new`].
    pub fn build(self) -> Result<DownloadTarget, Error> {
        let source = self.source.ok_or_else(|| DownloadError::InvalidTarget {
            field: "source".to_string(),
        })?;
        let destination = self
            .destination
            .ok_or_else(|| DownloadError::InvalidTarget {
                field: "destination".to_string(),
            })?;
        DownloadTarget::new(&source, destination)
    }
}
