//! Per-connection streaming session state.
//!
//! The session owns exactly one piece of mutable state, the tick cadence,
//! and the rules for changing it. Socket plumbing lives in `ws.rs`; keeping
//! the command handling here makes it testable without a connection.

use std::time::Duration;

use tracing::{debug, warn};

use crate::types::ClientCommand;

pub const DEFAULT_CADENCE_MS: u64 = 2000;
pub const MIN_CADENCE_MS: u64 = 100;
pub const MAX_CADENCE_MS: u64 = 10_000;

/// Clamp a client-requested refresh interval into the allowed range.
/// Non-finite requests (possible through lenient JSON encoders) fall back
/// to the default cadence instead of clamping garbage.
pub fn clamp_cadence_ms(requested: f64) -> u64 {
    if !requested.is_finite() {
        return DEFAULT_CADENCE_MS;
    }
    (requested as u64).clamp(MIN_CADENCE_MS, MAX_CADENCE_MS)
}

/// What the connection loop should do after an inbound text frame.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// Valid cadence change; the tick timer must be rebuilt so the new
    /// cadence takes effect immediately, not after the old one elapses.
    CadenceChanged(Duration),
    /// Unrecognized or malformed; logged and dropped, connection stays up.
    Ignored,
}

pub struct StreamSession {
    cadence: Duration,
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            cadence: Duration::from_millis(DEFAULT_CADENCE_MS),
        }
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// Apply one inbound text frame from the client.
    pub fn handle_text(&mut self, text: &str) -> Inbound {
        match serde_json::from_str::<ClientCommand>(text) {
            Ok(ClientCommand::SetRefreshInterval { interval }) => {
                let ms = clamp_cadence_ms(interval);
                self.cadence = Duration::from_millis(ms);
                debug!(cadence_ms = ms, "refresh interval updated");
                Inbound::CadenceChanged(self.cadence)
            }
            Err(e) => {
                warn!(error = %e, "ignoring unrecognized client message");
                Inbound::Ignored
            }
        }
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_clamps_to_range() {
        assert_eq!(clamp_cadence_ms(50.0), MIN_CADENCE_MS);
        assert_eq!(clamp_cadence_ms(999_999.0), MAX_CADENCE_MS);
        assert_eq!(clamp_cadence_ms(500.0), 500);
        assert_eq!(clamp_cadence_ms(100.0), 100);
        assert_eq!(clamp_cadence_ms(10_000.0), 10_000);
    }

    #[test]
    fn non_finite_requests_fall_back_to_default() {
        assert_eq!(clamp_cadence_ms(f64::NAN), DEFAULT_CADENCE_MS);
        assert_eq!(clamp_cadence_ms(f64::INFINITY), DEFAULT_CADENCE_MS);
        assert_eq!(clamp_cadence_ms(f64::NEG_INFINITY), DEFAULT_CADENCE_MS);
    }

    #[test]
    fn set_refresh_interval_updates_cadence() {
        let mut session = StreamSession::new();
        assert_eq!(session.cadence(), Duration::from_millis(DEFAULT_CADENCE_MS));

        let outcome = session.handle_text(r#"{"type":"setRefreshInterval","interval":500}"#);
        assert_eq!(outcome, Inbound::CadenceChanged(Duration::from_millis(500)));
        assert_eq!(session.cadence(), Duration::from_millis(500));
    }

    #[test]
    fn clamped_commands_still_apply() {
        let mut session = StreamSession::new();
        session.handle_text(r#"{"type":"setRefreshInterval","interval":50}"#);
        assert_eq!(session.cadence(), Duration::from_millis(100));

        session.handle_text(r#"{"type":"setRefreshInterval","interval":999999}"#);
        assert_eq!(session.cadence(), Duration::from_millis(10_000));
    }

    #[test]
    fn malformed_messages_are_ignored_and_leave_cadence_alone() {
        let mut session = StreamSession::new();
        session.handle_text(r#"{"type":"setRefreshInterval","interval":700}"#);

        for junk in [
            "not json at all",
            r#"{"type":"unknownCommand"}"#,
            r#"{"interval":500}"#,
            r#"{"type":"setRefreshInterval"}"#,
            r#"{"type":"setRefreshInterval","interval":"fast"}"#,
        ] {
            assert_eq!(session.handle_text(junk), Inbound::Ignored);
            assert_eq!(session.cadence(), Duration::from_millis(700));
        }
    }
}
