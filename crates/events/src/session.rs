//! Retry / corrupted / success notifications of a verification session

use crate::{EventEmitter, EventLevel, EventSource};
use kratos_types::DownloadTarget;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Position of a verification session in its state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No attempt made yet
    Pending,
    /// One download attempt in flight
    Attempting,
    /// Comparing the attempt's digest with the expected hash
    Verifying,
    /// Digest mismatched and the budget allows another attempt
    Retrying,
    /// Digest matched (terminal)
    Success,
    /// Attempt budget exhausted without a match (terminal)
    Corrupted,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Corrupted)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Attempting => "attempting",
            Self::Verifying => "verifying",
            Self::Retrying => "retrying",
            Self::Success => "success",
            Self::Corrupted => "corrupted",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a session taken when an event is emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub expected_hash: String,
    pub algorithm: String,
    /// Zero-based counter of failed verifications so far
    pub attempt: u32,
    pub max_attempts: u32,
    pub state: SessionState,
}

/// Events observable on a session observer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The digest of attempt number `attempt` (zero-based) did not match
    Retry {
        target: DownloadTarget,
        attempt: u32,
        session: SessionInfo,
    },

    /// The attempt budget is exhausted
    Corrupted {
        target: DownloadTarget,
        session: SessionInfo,
    },

    /// The digest matched
    Success {
        target: DownloadTarget,
        session: SessionInfo,
    },
}

impl SessionEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Retry { .. } => "retry",
            Self::Corrupted { .. } => "corrupted",
            Self::Success { .. } => "success",
        }
    }

    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::Retry { .. } => EventLevel::Warn,
            Self::Corrupted { .. } => EventLevel::Error,
            Self::Success { .. } => EventLevel::Info,
        }
    }

    #[must_use]
    pub fn source(&self) -> EventSource {
        EventSource::VERIFY
    }

    #[must_use]
    pub fn target(&self) -> &DownloadTarget {
        match self {
            Self::Retry { target, .. }
            | Self::Corrupted { target, .. }
            | Self::Success { target, .. } => target,
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionInfo {
        match self {
            Self::Retry { session, .. }
            | Self::Corrupted { session, .. }
            | Self::Success { session, .. } => session,
        }
    }
}

pub type SessionSender = UnboundedSender<SessionEvent>;
pub type SessionReceiver = UnboundedReceiver<SessionEvent>;

/// Convenience emitters for anything that can reach session observers
pub trait SessionEmitter: EventEmitter<SessionEvent> {
    fn emit_retry(&self, target: &DownloadTarget, attempt: u32, session: SessionInfo) {
        self.emit(SessionEvent::Retry {
            target: target.clone(),
            attempt,
            session,
        });
    }

    fn emit_corrupted(&self, target: &DownloadTarget, session: SessionInfo) {
        self.emit(SessionEvent::Corrupted {
            target: target.clone(),
            session,
        });
    }

    fn emit_success(&self, target: &DownloadTarget, session: SessionInfo) {
        self.emit(SessionEvent::Success {
            target: target.clone(),
            session,
        });
    }
}

impl<T: EventEmitter<SessionEvent> + ?Sized> SessionEmitter for T {}

impl EventEmitter<SessionEvent> for SessionSender {
    fn event_senders(&self) -> &[UnboundedSender<SessionEvent>] {
        std::slice::from_ref(self)
    }
}

impl EventEmitter<SessionEvent> for Option<SessionSender> {
    fn event_senders(&self) -> &[UnboundedSender<SessionEvent>] {
        self.as_slice()
    }
}
