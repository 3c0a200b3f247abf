//! Retry/verify state machine around repeated download attempts

use super::attempt::DownloadAttempt;
use super::options::VerifyOptions;
use crate::client::NetClient;
use kratos_errors::{DownloadError, Error};
use kratos_events::{ProgressSink, SessionEmitter, SessionInfo, SessionSender, SessionState};
use kratos_hash::{HashAccumulator, HashAlgorithm};
use kratos_types::DownloadTarget;
use reqwest::header::HeaderMap;

/// Downloads one target until its digest matches or the budget runs out
///
/// Attempts are strictly sequential. Every attempt gets a fresh
/// [`HashAccumulator`] and rewrites the same destination, so after a
/// corrupted outcome the file on disk holds the last attempt's bytes.
///
/// A transport, HTTP status or filesystem failure aborts the session at once
/// and does not consume an attempt. Only a completed attempt with the wrong
/// digest is retried.
#[derive(Debug)]
pub struct VerifiedDownloadSession<'a> {
    target: DownloadTarget,
    expected_hash: String,
    algorithm: HashAlgorithm,
    max_attempts: u32,
    attempt: u32,
    state: SessionState,
    sink: Option<&'a ProgressSink>,
    observer: Option<SessionSender>,
    headers: HeaderMap,
}

impl<'a> VerifiedDownloadSession<'a> {
    /// Create a pending session
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is unknown or `max_attempts` is zero.
    /// Nothing touches the network before these checks pass.
    pub fn new(
        target: DownloadTarget,
        expected_hash: impl Into<String>,
        options: VerifyOptions<'a>,
    ) -> Result<Self, Error> {
        let algorithm = HashAlgorithm::from_name(&options.algorithm)?;

        if options.max_attempts == 0 {
            return Err(DownloadError::InvalidAttemptBudget {
                value: options.max_attempts,
            }
            .into());
        }

        Ok(Self {
            target,
            expected_hash: expected_hash.into(),
            algorithm,
            max_attempts: options.max_attempts,
            attempt: 0,
            state: SessionState::Pending,
            sink: options.sink,
            observer: options.observer,
            headers: options.headers,
        })
    }

    #[must_use]
    pub fn target(&self) -> &DownloadTarget {
        &self.target
    }

    /// Failed verifications so far
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Snapshot handed to observers
    #[must_use]
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            expected_hash: self.expected_hash.clone(),
            algorithm: self.algorithm.as_str().to_string(),
            attempt: self.attempt,
            max_attempts: self.max_attempts,
            state: self.state,
        }
    }

    /// Run attempts until success or corruption
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Corrupted`] once `max_attempts` attempts all
    /// produced the wrong digest, or the first attempt-level error.
    pub async fn start(mut self, client: &NetClient) -> Result<DownloadTarget, Error> {
        loop {
            self.state = SessionState::Attempting;

            let mut hasher = HashAccumulator::with_algorithm(self.algorithm);
            let mut attempt = DownloadAttempt::new(&self.target)
                .with_hasher(&mut hasher)
                .with_headers(self.headers.clone());
            if let Some(sink) = self.sink {
                attempt = attempt.with_sink(sink);
            }
            attempt.run(client).await?;

            self.state = SessionState::Verifying;
            let digest = hasher.digest();

            if digest.matches_hex(&self.expected_hash) {
                self.state = SessionState::Success;
                tracing::info!(
                    url = %self.target.source(),
                    algorithm = self.algorithm.as_str(),
                    attempt = self.attempt,
                    "download verified"
                );
                self.observer.emit_success(&self.target, self.info());
                return Ok(self.target);
            }

            tracing::warn!(
                url = %self.target.source(),
                algorithm = self.algorithm.as_str(),
                expected = %self.expected_hash,
                actual = %digest.to_hex(),
                attempt = self.attempt,
                max_attempts = self.max_attempts,
                "digest mismatch"
            );

            self.state = SessionState::Retrying;
            self.observer
                .emit_retry(&self.target, self.attempt, self.info());
            self.attempt += 1;

            if self.attempt >= self.max_attempts {
                self.state = SessionState::Corrupted;
                tracing::error!(
                    url = %self.target.source(),
                    attempt = self.attempt,
                    max_attempts = self.max_attempts,
                    "download corrupted"
                );
                self.observer.emit_corrupted(&self.target, self.info());
                return Err(DownloadError::Corrupted {
                    url: self.target.source().to_string(),
                    attempts: self.attempt,
                    max_attempts: self.max_attempts,
                }
                .into());
            }
        }
    }
}
