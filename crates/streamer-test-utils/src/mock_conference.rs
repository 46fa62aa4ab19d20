//! Mock conferencing transport.
//!
//! Records every outbound call so tests can check ordering, e.g. that the
//! selection is cleared before the conference is left.
//!
//! # Example
//!
//! ```rust,ignore
//! use streamer_test_utils::MockConference;
//!
//! let conference = MockConference::builder()
//!     .with_device("hdmi-1", "HDMI 1")
//!     .reject_join()
//!     .build();
//! let calls = conference.calls();
//! ```

use common::types::ParticipantId;
use common::secret::{ExposeSecret, SecretString};
use std::sync::{Arc, Mutex};
use streamer_core::errors::StreamerError;
use streamer_core::transport::{AudioOutputDevice, Conference};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConferenceCall {
    Connect,
    Disconnect,
    JoinConference {
        room: String,
        password: Option<String>,
        display_name: String,
    },
    LeaveConference,
    SelectParticipants(Vec<ParticipantId>),
    SetAudioOutput(String),
}

/// Shared view of the calls a [`MockConference`] received.
#[derive(Debug, Clone, Default)]
pub struct ConferenceCalls {
    inner: Arc<Mutex<Vec<ConferenceCall>>>,
}

impl ConferenceCalls {
    fn push(&self, call: ConferenceCall) {
        self.inner.lock().unwrap().push(call);
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConferenceCall> {
        self.inner.lock().unwrap().clone()
    }

    /// The most recent participant selection.
    #[must_use]
    pub fn last_selection(&self) -> Option<Vec<ParticipantId>> {
        self.snapshot().into_iter().rev().find_map(|call| match call {
            ConferenceCall::SelectParticipants(ids) => Some(ids),
            _ => None,
        })
    }

    /// Position of the first call equal to `call`.
    #[must_use]
    pub fn position(&self, call: &ConferenceCall) -> Option<usize> {
        self.snapshot().iter().position(|c| c == call)
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }
}

/// Mock transport for session tests.
#[derive(Debug)]
pub struct MockConference {
    calls: ConferenceCalls,
    devices: Vec<AudioOutputDevice>,
    fail_connect: bool,
    reject_join: bool,
}

impl Default for MockConference {
    fn default() -> Self {
        Self {
            calls: ConferenceCalls::default(),
            devices: vec![AudioOutputDevice {
                device_id: "default".to_string(),
                label: "Default output".to_string(),
            }],
            fail_connect: false,
            reject_join: false,
        }
    }
}

impl MockConference {
    /// Create a new MockConference builder.
    #[must_use]
    pub fn builder() -> MockConferenceBuilder {
        MockConferenceBuilder::default()
    }

    /// Handle for inspecting calls after the mock was moved into a session.
    #[must_use]
    pub fn calls(&self) -> ConferenceCalls {
        self.calls.clone()
    }
}

impl Conference for MockConference {
    fn connect(&mut self) -> Result<(), StreamerError> {
        self.calls.push(ConferenceCall::Connect);
        if self.fail_connect {
            return Err(StreamerError::Transport("connect refused".to_string()));
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.calls.push(ConferenceCall::Disconnect);
    }

    fn join_conference(
        &mut self,
        room: &str,
        password: Option<&SecretString>,
        display_name: &str,
    ) -> Result<(), StreamerError> {
        self.calls.push(ConferenceCall::JoinConference {
            room: room.to_string(),
            password: password.map(|p| p.expose_secret().to_string()),
            display_name: display_name.to_string(),
        });
        if self.reject_join {
            return Err(StreamerError::Transport("join refused".to_string()));
        }
        Ok(())
    }

    fn leave_conference(&mut self) {
        self.calls.push(ConferenceCall::LeaveConference);
    }

    fn select_participants(&mut self, participants: &[ParticipantId]) {
        self.calls
            .push(ConferenceCall::SelectParticipants(participants.to_vec()));
    }

    fn set_audio_output_device(&mut self, device_id: &str) -> Result<(), StreamerError> {
        if !self.devices.iter().any(|d| d.device_id == device_id) {
            return Err(StreamerError::Transport(format!(
                "unknown audio output {device_id}"
            )));
        }
        self.calls
            .push(ConferenceCall::SetAudioOutput(device_id.to_string()));
        Ok(())
    }

    fn audio_output_devices(&mut self) -> Vec<AudioOutputDevice> {
        self.devices.clone()
    }
}

/// Builder for MockConference.
#[derive(Debug, Default)]
pub struct MockConferenceBuilder {
    mock: MockConference,
}

impl MockConferenceBuilder {
    /// Offer an extra audio output device.
    #[must_use]
    pub fn with_device(mut self, device_id: &str, label: &str) -> Self {
        self.mock.devices.push(AudioOutputDevice {
            device_id: device_id.to_string(),
            label: label.to_string(),
        });
        self
    }

    /// Make `connect()` fail.
    #[must_use]
    pub fn fail_connect(mut self) -> Self {
        self.mock.fail_connect = true;
        self
    }

    /// Make `join_conference()` fail.
    #[must_use]
    pub fn reject_join(mut self) -> Self {
        self.mock.reject_join = true;
        self
    }

    /// Build the MockConference.
    #[must_use]
    pub fn build(self) -> MockConference {
        self.mock
    }
}
