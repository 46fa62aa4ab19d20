//! Conferencing transport seam.
//!
//! The transport owns signaling, media negotiation and the network. The
//! streamer only issues fire-and-forget calls against it; connection and
//! participant events come back through the session handle.

use crate::errors::StreamerError;
use common::types::ParticipantId;
use common::secret::SecretString;
use serde::{Deserialize, Serialize};

/// An audio output the operator can route slot audio to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioOutputDevice {
    pub device_id: String,
    pub label: String,
}

/// Outbound calls to the conferencing transport.
pub trait Conference: Send + 'static {
    /// Start connecting. Completion arrives as a connection event.
    ///
    /// # Errors
    ///
    /// Returns [`StreamerError::Transport`] if the attempt could not start.
    fn connect(&mut self) -> Result<(), StreamerError>;

    fn disconnect(&mut self);

    /// Join `room` as `display_name`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamerError::Transport`] if the transport refused the join.
    fn join_conference(
        &mut self,
        room: &str,
        password: Option<&SecretString>,
        display_name: &str,
    ) -> Result<(), StreamerError>;

    fn leave_conference(&mut self);

    /// Request full-resolution video for exactly `participants`.
    fn select_participants(&mut self, participants: &[ParticipantId]);

    /// # Errors
    ///
    /// Returns [`StreamerError::Transport`] if the device is unknown.
    fn set_audio_output_device(&mut self, device_id: &str) -> Result<(), StreamerError>;

    fn audio_output_devices(&mut self) -> Vec<AudioOutputDevice>;
}
