#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for kratos
//!
//! This crate streams remote artifacts to disk and, when an expected digest
//! is known, verifies them with a bounded number of immediate retries.

mod client;
mod download;

pub use client::{NetClient, NetConfig};
pub use download::{DownloadAttempt, VerifiedDownloadSession, VerifyOptions, DEFAULT_MAX_ATTEMPTS};

use kratos_errors::Error;
use kratos_events::ProgressSink;
use kratos_hash::HashAccumulator;
use kratos_types::DownloadTarget;

/// Download a target once
///
/// # Errors
///
/// Returns an error if the destination cannot be written, the request fails,
/// or the server answers with a non-success status.
pub async fn run_download(
    client: &NetClient,
    target: &DownloadTarget,
    sink: Option<&ProgressSink>,
    hasher: Option<&mut HashAccumulator>,
) -> Result<DownloadTarget, Error> {
    let mut attempt = DownloadAttempt::new(target);
    if let Some(sink) = sink {
        attempt = attempt.with_sink(sink);
    }
    if let Some(hasher) = hasher {
        attempt = attempt.with_hasher(hasher);
    }
    attempt.run(client).await.cloned()
}

/// Download a target until its digest equals `expected_hash`
///
/// # Errors
///
/// Returns an error if the options are invalid, an attempt fails, or every
/// attempt of the budget produced a mismatching digest.
pub async fn run_verified_download(
    client: &NetClient,
    target: DownloadTarget,
    expected_hash: &str,
    options: VerifyOptions<'_>,
) -> Result<DownloadTarget, Error> {
    VerifiedDownloadSession::new(target, expected_hash, options)?
        .start(client)
        .await
}
