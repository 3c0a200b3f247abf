//! Byte counter and progress/error/finish events for download attempts

use crate::{EventEmitter, EventLevel, EventSource};
use bytes::Bytes;
use kratos_errors::Error;
use kratos_types::DownloadTarget;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Events observable on a [`ProgressSink`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkEvent {
    /// One network chunk, already counted, hashed and written
    Progress { chunk: Bytes },

    /// The attempt failed; at most one per attempt
    Error { error: Error },

    /// End of stream reached and the destination flushed
    Finish { target: DownloadTarget },
}

impl SinkEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Error { .. } => "error",
            Self::Finish { .. } => "finish",
        }
    }

    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::Progress { .. } => EventLevel::Trace,
            Self::Error { .. } => EventLevel::Error,
            Self::Finish { .. } => EventLevel::Info,
        }
    }

    #[must_use]
    pub fn source(&self) -> EventSource {
        EventSource::DOWNLOAD
    }
}

pub type SinkSender = UnboundedSender<SinkEvent>;
pub type SinkReceiver = UnboundedReceiver<SinkEvent>;

/// Mutable byte counter plus the subscribers of one or more sequential attempts.
///
/// Subscribers are registered through `&mut self` before a download starts;
/// attempts only need `&ProgressSink`, so one sink can be shared by every
/// attempt of a verification session and the counter accumulates across them.
#[derive(Debug)]
pub struct ProgressSink {
    bytes_transferred: AtomicU64,
    expected_size: AtomicI64,
    subscribers: Vec<SinkSender>,
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes_transferred: AtomicU64::new(0),
            expected_size: AtomicI64::new(-1),
            subscribers: Vec::new(),
        }
    }

    /// Register a new observer and return its receiving end
    pub fn subscribe(&mut self) -> SinkReceiver {
        let (tx, rx) = crate::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Register an existing sender, e.g. one shared with other sinks
    pub fn add_subscriber(&mut self, sender: SinkSender) {
        self.subscribers.push(sender);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Total bytes counted by every attempt that used this sink
    #[must_use]
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.load(Ordering::Relaxed)
    }

    /// Size announced by the most recent response, or -1 if unknown
    #[must_use]
    pub fn expected_size(&self) -> i64 {
        self.expected_size.load(Ordering::Relaxed)
    }

    pub fn set_expected_size(&self, size: Option<u64>) {
        let size = size.and_then(|s| i64::try_from(s).ok()).unwrap_or(-1);
        self.expected_size.store(size, Ordering::Relaxed);
    }

    /// Add `n` bytes to the counter
    pub fn transfer_bytes(&self, n: u64) {
        self.bytes_transferred.fetch_add(n, Ordering::Relaxed);
    }

    pub fn emit_progress(&self, chunk: Bytes) {
        self.emit(SinkEvent::Progress { chunk });
    }

    pub fn emit_error(&self, error: &Error) {
        self.emit(SinkEvent::Error {
            error: error.clone(),
        });
    }

    pub fn emit_finish(&self, target: &DownloadTarget) {
        self.emit(SinkEvent::Finish {
            target: target.clone(),
        });
    }
}

impl EventEmitter<SinkEvent> for ProgressSink {
    fn event_senders(&self) -> &[UnboundedSender<SinkEvent>] {
        &self.subscribers
    }
}
