//! Download target and verification session error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum DownloadError {
    #[error("invalid download target: missing {field}")]
    InvalidTarget { field: String },

    #[error("invalid attempt budget {value}: at least one attempt is required")]
    InvalidAttemptBudget { value: u32 },

    #[error(
        "Maximum attempt reached ({attempts}/{max_attempts}): {url} never matched the expected hash"
    )]
    Corrupted {
        url: String,
        attempts: u32,
        max_attempts: u32,
    },
}

impl UserFacingError for DownloadError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidTarget { .. } => Some("Provide both a source URL and a destination path."),
            Self::InvalidAttemptBudget { .. } => Some("Set max_attempts to 1 or more."),
            Self::Corrupted { .. } => Some(
                "The server keeps returning different content; check the expected hash or mirror.",
            ),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidTarget { .. } => "download.invalid_target",
            Self::InvalidAttemptBudget { .. } => "download.invalid_attempt_budget",
            Self::Corrupted { .. } => "download.corrupted",
        };
        Some(code)
    }
}
