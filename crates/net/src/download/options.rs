//! Options of a hash-verified download

use super::validation::insert_header;
use kratos_config::VerifyConfig;
use kratos_errors::Error;
use kratos_events::{ProgressSink, SessionSender};
use kratos_hash::HashAlgorithm;
use reqwest::header::HeaderMap;

/// Default attempt budget of a verification session
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for [`VerifiedDownloadSession`](super::VerifiedDownloadSession)
#[derive(Debug, Clone)]
pub struct VerifyOptions<'a> {
    /// Digest algorithm name, parsed when the session is created
    pub algorithm: String,
    pub max_attempts: u32,
    /// Shared by every attempt, so its counter accumulates across retries
    pub sink: Option<&'a ProgressSink>,
    pub observer: Option<SessionSender>,
    /// Extra request headers sent with every attempt
    pub headers: HeaderMap,
}

impl Default for VerifyOptions<'_> {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default().as_str().to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sink: None,
            observer: None,
            headers: HeaderMap::new(),
        }
    }
}

impl<'a> VerifyOptions<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take algorithm and budget from the `[verify]` configuration section
    #[must_use]
    pub fn from_config(config: &VerifyConfig) -> Self {
        Self {
            algorithm: config.algorithm.clone(),
            max_attempts: config.max_attempts,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: &'a ProgressSink) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: SessionSender) -> Self {
        self.observer = Some(observer);
        self
    }

    /// # Errors
    ///
    /// Returns an error if the name or value is not a valid HTTP header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        insert_header(&mut self.headers, name, value)?;
        Ok(self)
    }
}
