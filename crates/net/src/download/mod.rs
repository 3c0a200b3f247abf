//! Streaming downloads with optional hash verification
//!
//! [`DownloadAttempt`] performs one GET into one file. [`VerifiedDownloadSession`]
//! repeats attempts against the same target until the digest matches.

mod attempt;
mod options;
mod session;
mod stream;
mod validation;

pub use attempt::DownloadAttempt;
pub use options::{VerifyOptions, DEFAULT_MAX_ATTEMPTS};
pub use session::VerifiedDownloadSession;
