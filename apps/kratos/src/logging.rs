//! Structured logging integration for events
//!
//! Sink and session events are turned into tracing records at the level each
//! event declares, so `--json` and `RUST_LOG` see the same history the
//! progress display renders.

use kratos_errors::UserFacingError;
use kratos_events::{EventLevel, SessionEvent, SinkEvent};

/// `tracing` needs a constant level per call site
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            EventLevel::Trace => tracing::trace!($($arg)+),
            EventLevel::Debug => tracing::debug!($($arg)+),
            EventLevel::Info => tracing::info!($($arg)+),
            EventLevel::Warn => tracing::warn!($($arg)+),
            EventLevel::Error => tracing::error!($($arg)+),
        }
    };
}

/// Log a sink event with structured fields
pub fn log_sink_event(event: &SinkEvent) {
    let source = event.source();
    match event {
        SinkEvent::Progress { chunk } => {
            log_at!(
                event.level(),
                source = source.as_str(),
                bytes = chunk.len(),
                "Chunk received"
            );
        }
        SinkEvent::Error { error } => {
            log_at!(
                event.level(),
                source = source.as_str(),
                code = ?error.user_code(),
                retryable = error.is_retryable(),
                message = %error.user_message(),
                "Download attempt failed"
            );
        }
        SinkEvent::Finish { target } => {
            log_at!(
                event.level(),
                source = source.as_str(),
                url = %target.source(),
                destination = %target.destination().display(),
                "Download attempt finished"
            );
        }
    }
}

/// Log a session event with structured fields
pub fn log_session_event(event: &SessionEvent) {
    let source = event.source();
    let target = event.target();
    let session = event.session();
    match event {
        SessionEvent::Retry { attempt, .. } => {
            log_at!(
                event.level(),
                source = source.as_str(),
                url = %target.source(),
                attempt = attempt,
                max_attempts = session.max_attempts,
                algorithm = %session.algorithm,
                "Digest mismatch, retrying"
            );
        }
        SessionEvent::Corrupted { .. } => {
            log_at!(
                event.level(),
                source = source.as_str(),
                url = %target.source(),
                attempt = session.attempt,
                max_attempts = session.max_attempts,
                expected = %session.expected_hash,
                "Download corrupted"
            );
        }
        SessionEvent::Success { .. } => {
            log_at!(
                event.level(),
                source = source.as_str(),
                url = %target.source(),
                attempt = session.attempt,
                algorithm = %session.algorithm,
                "Download verified"
            );
        }
    }
}
