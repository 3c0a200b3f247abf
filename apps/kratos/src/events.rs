//! Event handling and progress display

use crate::logging::{log_sink_event, log_session_event};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use kratos_errors::UserFacingError;
use kratos_events::{SessionEvent, SinkEvent};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} {msg}";

/// Event handler for progress display and user feedback
pub struct EventHandler {
    bar: ProgressBar,
    /// Bytes of the attempt currently streaming
    position: u64,
    /// Set by `finish`; the next chunk starts a new attempt
    attempt_done: bool,
}

impl EventHandler {
    /// Create new event handler; `quiet` hides the bar (e.g. JSON output)
    pub fn new(label: &str, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new_spinner()
        };

        if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(format!("Downloading {label}"));

        Self {
            bar,
            position: 0,
            attempt_done: false,
        }
    }

    /// Handle a sink event; `expected_size` is the sink's current estimate
    pub fn handle_sink_event(&mut self, event: &SinkEvent, expected_size: i64) {
        log_sink_event(event);

        match event {
            SinkEvent::Progress { chunk } => {
                if self.attempt_done {
                    // A retry rewrites the file from the start
                    self.attempt_done = false;
                    self.position = 0;
                }
                if let Ok(total) = u64::try_from(expected_size) {
                    self.bar.set_length(total);
                }
                self.position += chunk.len() as u64;
                self.bar.set_position(self.position);
            }
            SinkEvent::Error { error } => {
                self.bar.set_message(format!("Failed: {}", error.user_message()));
            }
            SinkEvent::Finish { .. } => {
                self.attempt_done = true;
                self.bar.set_message("Downloaded");
            }
        }
    }

    /// Handle a verification session event
    pub fn handle_session_event(&mut self, event: &SessionEvent) {
        log_session_event(event);

        match event {
            SessionEvent::Retry { attempt, session, .. } => {
                self.bar.println(format!(
                    "Digest mismatch on attempt {}/{}",
                    attempt + 1,
                    session.max_attempts
                ));
            }
            SessionEvent::Corrupted { session, .. } => {
                self.bar.abandon_with_message(format!(
                    "Corrupted after {} attempts",
                    session.attempt
                ));
            }
            SessionEvent::Success { session, .. } => {
                self.bar
                    .finish_with_message(format!("Verified ({})", session.algorithm));
            }
        }
    }

    /// Close the bar when no session event will do it
    pub fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish();
        }
    }
}
