//! Message types for the streamer core.
//!
//! Three families live here:
//!
//! - [`EngineEvent`]: everything the assignment engine reacts to, whether it
//!   came from the conferencing transport, the operator surface or MIDI.
//! - [`Command`]: side effects the engine asks its caller to perform.
//! - [`SessionMessage`]: the session actor's mailbox, which wraps engine
//!   events and adds connection lifecycle and request-reply operations via
//!   `tokio::sync::oneshot`.

use crate::errors::StreamerError;
use crate::transport::AudioOutputDevice;
use common::types::{MediaHandle, MediaKind, ParticipantId, SlotIndex};
use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// A remote or local track as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub participant_id: ParticipantId,
    pub kind: MediaKind,
    pub handle: MediaHandle,
    /// The streamer's own tracks are never mapped onto slots.
    #[serde(default)]
    pub is_local: bool,
}

impl TrackInfo {
    /// A remote track.
    #[must_use]
    pub fn remote(
        participant_id: impl Into<ParticipantId>,
        kind: MediaKind,
        handle: impl Into<MediaHandle>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            kind,
            handle: handle.into(),
            is_local: false,
        }
    }
}

/// Events processed by the assignment engine, one at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A participant joined the conference.
    Joined {
        participant_id: ParticipantId,
        display_name: String,
    },

    /// A participant left the conference.
    Left { participant_id: ParticipantId },

    /// A participant changed their display name.
    DisplayNameChanged {
        participant_id: ParticipantId,
        display_name: String,
    },

    /// A track became available.
    TrackAdded { track: TrackInfo },

    /// A track went away.
    TrackRemoved { track: TrackInfo },

    /// Operator assigned a new expected name to a slot.
    SlotRenamed { slot: SlotIndex, name: String },

    /// Operator moved a volume fader.
    VolumeSet { slot: SlotIndex, level: f32 },

    /// Raw MIDI message from the control surface.
    MidiMessage { data: Vec<u8> },

    /// Operator asked to re-attach whatever a slot shows.
    ReloadSlot { slot: SlotIndex },

    /// Session is ending: detach everything and forget all participants.
    Teardown,
}

impl EngineEvent {
    /// Returns the event type as a string for logs and metric labels.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::Joined { .. } => "joined",
            EngineEvent::Left { .. } => "left",
            EngineEvent::DisplayNameChanged { .. } => "display_name_changed",
            EngineEvent::TrackAdded { .. } => "track_added",
            EngineEvent::TrackRemoved { .. } => "track_removed",
            EngineEvent::SlotRenamed { .. } => "slot_renamed",
            EngineEvent::VolumeSet { .. } => "volume_set",
            EngineEvent::MidiMessage { .. } => "midi_message",
            EngineEvent::ReloadSlot { .. } => "reload_slot",
            EngineEvent::Teardown => "teardown",
        }
    }
}

/// Side effects emitted by the assignment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Bind a handle to the slot's rendering target for `kind`.
    Attach {
        slot: SlotIndex,
        kind: MediaKind,
        handle: MediaHandle,
    },

    /// Release a handle from the slot's rendering target for `kind`.
    Detach {
        slot: SlotIndex,
        kind: MediaKind,
        handle: MediaHandle,
    },

    /// Set the playback volume of the slot's audio target.
    SetVolume { slot: SlotIndex, level: f32 },

    /// Ask the transport for full-resolution video from exactly these
    /// participants, listed in slot order.
    NotifySelection { participants: Vec<ParticipantId> },

    /// Store the slot-name table.
    PersistSlotNames { names: Vec<String> },
}

/// Connection lifecycle as shown on the operator surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection, or torn down by the operator.
    Disconnected,
    /// `connect()` issued, waiting for the transport.
    Connecting,
    /// Connection established, no conference joined yet.
    Connected,
    /// Conference joined; participant events flow.
    Joined,
    /// The transport reported a failure. No automatic retry; the operator
    /// may connect again.
    Failed,
}

impl ConnectionState {
    /// Returns the state as a string for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Joined => "joined",
            ConnectionState::Failed => "failed",
        }
    }
}

/// Messages sent to the `StreamerSession` actor.
#[derive(Debug)]
pub enum SessionMessage {
    /// Feed one event to the assignment engine.
    Event(EngineEvent),

    /// Transport: connection established.
    ConnectionEstablished,

    /// Transport: connection attempt failed.
    ConnectionFailed { reason: String },

    /// Transport: connection dropped.
    ConnectionDisconnected,

    /// Transport: the conference was joined.
    ConferenceJoined,

    /// Operator: open the connection again after a disconnect or failure.
    Connect {
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), StreamerError>>,
    },

    /// Operator: join a room.
    JoinConference {
        room: String,
        password: Option<SecretString>,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), StreamerError>>,
    },

    /// Operator: leave the room and disconnect.
    Disconnect {
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), StreamerError>>,
    },

    /// Operator: route audio to another output device.
    ChooseAudioOutput {
        device_id: String,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), StreamerError>>,
    },

    /// Operator: list available audio output devices.
    ListAudioOutputs {
        respond_to: oneshot::Sender<Vec<AudioOutputDevice>>,
    },

    /// Get a snapshot for the operator surface.
    GetState {
        respond_to: oneshot::Sender<SessionState>,
    },
}

// ----------------------------------------------------------------------------
// Supporting Types
// ----------------------------------------------------------------------------

/// One slot as shown on the operator surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotState {
    pub index: SlotIndex,
    pub name: String,
    pub participant_id: Option<ParticipantId>,
    pub volume: f32,
    /// Rounded percentage, e.g. `"70%"`.
    pub volume_label: String,
}

/// One known participant, in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantState {
    pub participant_id: ParticipantId,
    pub display_name: Option<String>,
    pub slot: Option<SlotIndex>,
    pub has_audio: bool,
    pub has_video: bool,
}

/// Snapshot of the whole session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub connection: ConnectionState,
    pub room: Option<String>,
    pub slots: Vec<SlotState>,
    pub participants: Vec<ParticipantState>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event: EngineEvent = serde_json::from_str(
            r#"{"type":"track_added","track":{"participant_id":"p1","kind":"video","handle":"v1"}}"#,
        )
        .unwrap();

        assert_eq!(
            event,
            EngineEvent::TrackAdded {
                track: TrackInfo::remote("p1", MediaKind::Video, "v1"),
            }
        );
        assert_eq!(event.event_type(), "track_added");

        let event: EngineEvent = serde_json::from_str(r#"{"type":"teardown"}"#).unwrap();
        assert_eq!(event, EngineEvent::Teardown);
    }

    #[test]
    fn test_command_json_shape() {
        let json = serde_json::to_value(Command::Attach {
            slot: SlotIndex(2),
            kind: MediaKind::Audio,
            handle: MediaHandle::new("a9"),
        })
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!({"command": "attach", "slot": 2, "kind": "audio", "handle": "a9"})
        );
    }
}
