//! CLI error handling

use std::fmt;

use kratos_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Download, hashing or configuration error
    Ops(kratos_errors::Error),
    /// Digest of a local file did not match `--expect`
    Mismatch { expected: String, actual: String },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Mismatch { expected, actual } => {
                write!(f, "Digest mismatch: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Ops(e) => Some(e),
            CliError::Mismatch { .. } => None,
        }
    }
}

impl From<kratos_errors::Error> for CliError {
    fn from(e: kratos_errors::Error) -> Self {
        CliError::Ops(e)
    }
}
