//! Streamer error types.
//!
//! Internal details are logged but never shown on the operator surface;
//! [`StreamerError::client_message`] is the only text the UI receives.

use thiserror::Error;

/// Streamer error type.
#[derive(Debug, Error)]
pub enum StreamerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Loading or saving the slot-name table failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The conferencing transport rejected an outbound call.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An operation needs an established connection first.
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// The session actor has stopped and no longer accepts messages.
    #[error("Session closed")]
    SessionClosed,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Slot registry errors.
///
/// Never surfaced to the operator: the assignment engine logs them and leaves
/// the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Slot index is not below the configured slot count.
    #[error("Slot {slot} out of range (slot count {count})")]
    OutOfRange { slot: usize, count: usize },

    /// Slot is already bound to another participant.
    #[error("Slot {slot} already bound to {occupant}")]
    Occupied { slot: usize, occupant: String },

    /// Participant already occupies a different slot.
    #[error("Participant {participant} already bound to slot {slot}")]
    ParticipantBound { participant: String, slot: usize },
}

impl StreamerError {
    /// Returns a message safe to display on the operator surface.
    pub fn client_message(&self) -> String {
        match self {
            StreamerError::Config(_)
            | StreamerError::Persistence(_)
            | StreamerError::Internal(_) => "An internal error occurred".to_string(),
            StreamerError::Transport(_) => "The conference service rejected the request".to_string(),
            StreamerError::NotConnected(_) => {
                "Not connected to the conference service yet".to_string()
            }
            StreamerError::SessionClosed => "The streamer session has ended".to_string(),
        }
    }
}

impl From<std::io::Error> for StreamerError {
    fn from(err: std::io::Error) -> Self {
        StreamerError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for StreamerError {
    fn from(err: serde_json::Error) -> Self {
        StreamerError::Persistence(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_hide_internal_details() {
        let err = StreamerError::Persistence("permission denied: /var/lib/streamer/names.json".to_string());
        assert!(!err.client_message().contains("/var/lib"));
        assert_eq!(err.client_message(), "An internal error occurred");

        let err = StreamerError::Transport("xmpp bosh 502 from 10.0.0.4".to_string());
        assert!(!err.client_message().contains("10.0.0.4"));
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", StreamerError::NotConnected("join".to_string())),
            "Not connected: join"
        );
        assert_eq!(
            format!(
                "{}",
                SlotError::Occupied {
                    slot: 2,
                    occupant: "p7".to_string()
                }
            ),
            "Slot 2 already bound to p7"
        );
        assert_eq!(
            format!("{}", SlotError::OutOfRange { slot: 9, count: 6 }),
            "Slot 9 out of range (slot count 6)"
        );
    }

    #[test]
    fn test_io_error_maps_to_persistence() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StreamerError = io.into();
        assert!(matches!(err, StreamerError::Persistence(_)));
    }
}
