#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for observing downloads in kratos
//!
//! Observers are plain unbounded channels. Two event families exist:
//!
//! - **Sink events** ([`SinkEvent`]): `progress`, `error` and `finish` for
//!   each download attempt, delivered through a [`ProgressSink`] that also
//!   counts transferred bytes.
//! - **Session events** ([`SessionEvent`]): `retry`, `corrupted` and
//!   `success` for a hash-verified download session.
//!
//! Observation never steers a download: a dropped receiver is ignored.

pub mod meta;
pub mod session;
pub mod sink;

pub use meta::{EventLevel, EventSource};
pub use session::{
    SessionEmitter, SessionEvent, SessionInfo, SessionReceiver, SessionSender, SessionState,
};
pub use sink::{ProgressSink, SinkEvent, SinkReceiver, SinkSender};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Create a new event channel
#[must_use]
pub fn channel<E>() -> (UnboundedSender<E>, UnboundedReceiver<E>) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events to every registered observer
pub trait EventEmitter<E: Clone> {
    /// Get the senders of every observer
    fn event_senders(&self) -> &[UnboundedSender<E>];

    /// Emit an event through this emitter
    fn emit(&self, event: E) {
        for sender in self.event_senders() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event.clone());
        }
    }

    /// Whether anybody is listening
    fn has_observers(&self) -> bool {
        self.event_senders().iter().any(|s| !s.is_closed())
    }
}
