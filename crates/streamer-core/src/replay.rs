//! Line-oriented replay harness.
//!
//! Drives a [`StreamerSession`](crate::session::StreamerSession) from
//! newline-delimited JSON and reports every outbound call as one JSON record
//! per line. The transport and rendering surface are stand-ins that only
//! write records, which makes the binary usable for scripting and for
//! checking assignment behavior without a conferencing backend.
//!
//! Input, one object per line:
//!
//! ```text
//! {"type":"connection_established"}
//! {"type":"join_conference","room":"studio"}
//! {"type":"engine","event":{"type":"joined","participant_id":"p1","display_name":"alpha"}}
//! {"type":"state"}
//! ```
//!
//! Output records carry an `op` tag, e.g. `{"op":"attach","slot":0,"kind":"video","handle":"v1"}`.

use crate::errors::StreamerError;
use crate::messages::{EngineEvent, SessionState};
use crate::render::RenderSurface;
use crate::session::StreamerSessionHandle;
use crate::transport::{AudioOutputDevice, Conference};
use common::secret::SecretString;
use common::types::{MediaHandle, MediaKind, ParticipantId, SlotIndex};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Device every replay transport offers.
pub const DEFAULT_AUDIO_OUTPUT: &str = "default";

/// One input line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayInput {
    /// Operator connect, e.g. after a disconnect.
    Connect,
    ConnectionEstablished,
    ConnectionFailed {
        reason: String,
    },
    ConnectionDisconnected,
    ConferenceJoined,
    JoinConference {
        room: String,
        #[serde(default)]
        password: Option<String>,
    },
    Disconnect,
    ChooseAudioOutput {
        device_id: String,
    },
    ListAudioOutputs,
    /// Print a session snapshot.
    State,
    Engine {
        event: EngineEvent,
    },
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayRecord {
    Attach {
        slot: SlotIndex,
        kind: MediaKind,
        handle: MediaHandle,
    },
    Detach {
        slot: SlotIndex,
        kind: MediaKind,
        handle: MediaHandle,
    },
    SetVolume {
        slot: SlotIndex,
        level: f32,
    },
    SelectParticipants {
        participants: Vec<ParticipantId>,
    },
    Connect,
    Disconnect,
    JoinConference {
        room: String,
        display_name: String,
    },
    LeaveConference,
    SetAudioOutput {
        device_id: String,
    },
    AudioOutputs {
        devices: Vec<AudioOutputDevice>,
    },
    State {
        state: SessionState,
    },
    Error {
        message: String,
    },
}

/// Shared, line-buffered record writer.
#[derive(Clone)]
pub struct ReplaySink {
    out: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ReplaySink {
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// Write one record as a JSON line. Write failures are logged, not
    /// propagated; the session must keep running.
    pub fn emit(&self, record: &ReplayRecord) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let result = serde_json::to_writer(&mut *out, record)
            .map_err(std::io::Error::from)
            .and_then(|()| out.write_all(b"\n"))
            .and_then(|()| out.flush());
        if let Err(e) = result {
            warn!(target: "streamer.replay", error = %e, "Failed to write replay record");
        }
    }
}

/// Transport stand-in that records every call.
pub struct ReplayConference {
    sink: ReplaySink,
    devices: Vec<AudioOutputDevice>,
}

impl ReplayConference {
    #[must_use]
    pub fn new(sink: ReplaySink) -> Self {
        Self {
            sink,
            devices: vec![AudioOutputDevice {
                device_id: DEFAULT_AUDIO_OUTPUT.to_string(),
                label: "Default output".to_string(),
            }],
        }
    }
}

impl Conference for ReplayConference {
    fn connect(&mut self) -> Result<(), StreamerError> {
        self.sink.emit(&ReplayRecord::Connect);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.sink.emit(&ReplayRecord::Disconnect);
    }

    fn join_conference(
        &mut self,
        room: &str,
        _password: Option<&SecretString>,
        display_name: &str,
    ) -> Result<(), StreamerError> {
        self.sink.emit(&ReplayRecord::JoinConference {
            room: room.to_string(),
            display_name: display_name.to_string(),
        });
        Ok(())
    }

    fn leave_conference(&mut self) {
        self.sink.emit(&ReplayRecord::LeaveConference);
    }

    fn select_participants(&mut self, participants: &[ParticipantId]) {
        self.sink.emit(&ReplayRecord::SelectParticipants {
            participants: participants.to_vec(),
        });
    }

    fn set_audio_output_device(&mut self, device_id: &str) -> Result<(), StreamerError> {
        if !self.devices.iter().any(|d| d.device_id == device_id) {
            return Err(StreamerError::Transport(format!(
                "unknown audio output {device_id}"
            )));
        }
        self.sink.emit(&ReplayRecord::SetAudioOutput {
            device_id: device_id.to_string(),
        });
        Ok(())
    }

    fn audio_output_devices(&mut self) -> Vec<AudioOutputDevice> {
        self.devices.clone()
    }
}

/// Rendering stand-in with one audio and one video target per slot.
pub struct ReplaySurface {
    sink: ReplaySink,
    slot_count: usize,
}

impl ReplaySurface {
    #[must_use]
    pub fn new(sink: ReplaySink, slot_count: usize) -> Self {
        Self { sink, slot_count }
    }
}

impl RenderSurface for ReplaySurface {
    fn attach(&mut self, slot: SlotIndex, kind: MediaKind, handle: &MediaHandle) -> bool {
        if slot.get() >= self.slot_count {
            return false;
        }
        self.sink.emit(&ReplayRecord::Attach {
            slot,
            kind,
            handle: handle.clone(),
        });
        true
    }

    fn detach(&mut self, slot: SlotIndex, kind: MediaKind, handle: &MediaHandle) -> bool {
        if slot.get() >= self.slot_count {
            return false;
        }
        self.sink.emit(&ReplayRecord::Detach {
            slot,
            kind,
            handle: handle.clone(),
        });
        true
    }

    fn set_volume(&mut self, slot: SlotIndex, level: f32) -> bool {
        if slot.get() >= self.slot_count {
            return false;
        }
        self.sink.emit(&ReplayRecord::SetVolume { slot, level });
        true
    }
}

/// Forward one input line to the session.
///
/// Request failures (a refused join, an unknown audio device) are written to
/// the sink as `error` records.
///
/// # Errors
///
/// Returns [`StreamerError::SessionClosed`] once the session has stopped.
pub async fn feed(
    handle: &StreamerSessionHandle,
    sink: &ReplaySink,
    input: ReplayInput,
) -> Result<(), StreamerError> {
    let result = match input {
        ReplayInput::Connect => handle.connect().await,
        ReplayInput::ConnectionEstablished => handle.connection_established().await,
        ReplayInput::ConnectionFailed { reason } => handle.connection_failed(reason).await,
        ReplayInput::ConnectionDisconnected => handle.connection_disconnected().await,
        ReplayInput::ConferenceJoined => handle.conference_joined().await,
        ReplayInput::JoinConference { room, password } => {
            handle
                .join_conference(room, password.map(SecretString::from))
                .await
        }
        ReplayInput::Disconnect => handle.disconnect().await,
        ReplayInput::ChooseAudioOutput { device_id } => {
            handle.choose_audio_output(device_id).await
        }
        ReplayInput::ListAudioOutputs => {
            let devices = handle.audio_output_devices().await?;
            sink.emit(&ReplayRecord::AudioOutputs { devices });
            Ok(())
        }
        ReplayInput::State => {
            let state = handle.get_state().await?;
            sink.emit(&ReplayRecord::State { state });
            Ok(())
        }
        ReplayInput::Engine { event } => handle.dispatch(event).await,
    };

    match result {
        Err(StreamerError::SessionClosed) => Err(StreamerError::SessionClosed),
        Err(e) => {
            sink.emit(&ReplayRecord::Error {
                message: e.client_message(),
            });
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn lines(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    #[test]
    fn test_input_parsing() {
        let input: ReplayInput = serde_json::from_str(
            r#"{"type":"engine","event":{"type":"volume_set","slot":1,"level":0.25}}"#,
        )
        .unwrap();
        assert_eq!(
            input,
            ReplayInput::Engine {
                event: EngineEvent::VolumeSet {
                    slot: SlotIndex(1),
                    level: 0.25
                }
            }
        );

        let input: ReplayInput =
            serde_json::from_str(r#"{"type":"join_conference","room":"studio"}"#).unwrap();
        assert_eq!(
            input,
            ReplayInput::JoinConference {
                room: "studio".to_string(),
                password: None
            }
        );
    }

    #[test]
    fn test_connect_input_parses() {
        let input: ReplayInput = serde_json::from_str(r#"{"type":"connect"}"#).unwrap();
        assert_eq!(input, ReplayInput::Connect);
    }

    #[test]
    fn test_empty_participant_id_is_malformed() {
        let line = r#"{"type":"engine","event":{"type":"left","participant_id":""}}"#;
        assert!(serde_json::from_str::<ReplayInput>(line).is_err());
    }

    #[test]
    fn test_surface_writes_records() {
        let buf = SharedBuf::default();
        let mut surface = ReplaySurface::new(ReplaySink::new(Box::new(buf.clone())), 2);

        assert!(surface.attach(SlotIndex(1), MediaKind::Video, &MediaHandle::new("v1")));
        assert!(!surface.set_volume(SlotIndex(2), 0.5));

        assert_eq!(
            buf.lines(),
            vec![serde_json::json!({"op": "attach", "slot": 1, "kind": "video", "handle": "v1"})]
        );
    }

    #[test]
    fn test_conference_rejects_unknown_device() {
        let buf = SharedBuf::default();
        let mut conference = ReplayConference::new(ReplaySink::new(Box::new(buf.clone())));

        assert!(conference.set_audio_output_device("hdmi").is_err());
        conference.set_audio_output_device(DEFAULT_AUDIO_OUTPUT).unwrap();
        conference.select_participants(&[ParticipantId::new("p1")]);

        assert_eq!(
            buf.lines(),
            vec![
                serde_json::json!({"op": "set_audio_output", "device_id": "default"}),
                serde_json::json!({"op": "select_participants", "participants": ["p1"]}),
            ]
        );
    }
}
