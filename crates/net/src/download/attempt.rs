//! A single GET streamed to a single destination

use super::stream::stream_to_file;
use super::validation::insert_header;
use crate::client::NetClient;
use kratos_errors::Error;
use kratos_events::ProgressSink;
use kratos_hash::HashAccumulator;
use kratos_types::DownloadTarget;
use reqwest::header::HeaderMap;

/// One network-fetch-and-write cycle for a target
///
/// The attempt borrows the target read-only and reports through an optional
/// [`ProgressSink`]. When a [`HashAccumulator`] is attached it receives every
/// chunk in network order; the caller finalizes it after [`run`](Self::run).
#[derive(Debug)]
pub struct DownloadAttempt<'a> {
    target: &'a DownloadTarget,
    sink: Option<&'a ProgressSink>,
    hasher: Option<&'a mut HashAccumulator>,
    headers: HeaderMap,
}

impl<'a> DownloadAttempt<'a> {
    #[must_use]
    pub fn new(target: &'a DownloadTarget) -> Self {
        Self {
            target,
            sink: None,
            hasher: None,
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: &'a ProgressSink) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: &'a mut HashAccumulator) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Add an extra request header
    ///
    /// # Errors
    ///
    /// Returns an error if the name or value is not a valid HTTP header.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        insert_header(&mut self.headers, name, value)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    #[must_use]
    pub fn target(&self) -> &'a DownloadTarget {
        self.target
    }

    /// Run the attempt to completion
    ///
    /// On success the sink sees `finish(target)` after the destination is
    /// flushed. On failure it sees exactly one `error` and no `finish`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or destination cannot be
    /// written, the request fails, or the server answers with a non-2xx status.
    pub async fn run(self, client: &NetClient) -> Result<&'a DownloadTarget, Error> {
        let Self {
            target,
            sink,
            hasher,
            headers,
        } = self;

        tracing::debug!(
            url = %target.source(),
            destination = %target.destination().display(),
            "starting download attempt"
        );

        match stream_to_file(client, target, sink, hasher, &headers).await {
            Ok(bytes) => {
                tracing::debug!(url = %target.source(), bytes, "download attempt finished");
                if let Some(sink) = sink {
                    sink.emit_finish(target);
                }
                Ok(target)
            }
            Err(error) => {
                tracing::debug!(url = %target.source(), error = %error, "download attempt failed");
                if let Some(sink) = sink {
                    sink.emit_error(&error);
                }
                Err(error)
            }
        }
    }
}
