//! Event constructors and test configuration.

use common::types::{MediaKind, ParticipantId, SlotIndex};
use std::collections::HashMap;
use streamer_core::config::Config;
use streamer_core::messages::{EngineEvent, TrackInfo};

/// Configuration with the given slot names and everything else defaulted.
#[must_use]
pub fn test_config(names: &[&str]) -> Config {
    test_config_with(names, &[])
}

/// Like [`test_config`], with extra environment entries.
#[must_use]
pub fn test_config_with(names: &[&str], extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = extra
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    vars.insert("STREAMER_SLOT_NAMES".to_string(), names.join(","));
    vars.insert(
        "STREAMER_INSTANCE_ID".to_string(),
        "streamer-test".to_string(),
    );
    Config::from_vars(&vars).expect("test configuration must be valid")
}

#[must_use]
pub fn joined(id: &str, name: &str) -> EngineEvent {
    EngineEvent::Joined {
        participant_id: ParticipantId::new(id),
        display_name: name.to_string(),
    }
}

#[must_use]
pub fn left(id: &str) -> EngineEvent {
    EngineEvent::Left {
        participant_id: ParticipantId::new(id),
    }
}

#[must_use]
pub fn renamed(id: &str, name: &str) -> EngineEvent {
    EngineEvent::DisplayNameChanged {
        participant_id: ParticipantId::new(id),
        display_name: name.to_string(),
    }
}

#[must_use]
pub fn track_added(id: &str, kind: MediaKind, handle: &str) -> EngineEvent {
    EngineEvent::TrackAdded {
        track: TrackInfo::remote(id, kind, handle),
    }
}

#[must_use]
pub fn track_removed(id: &str, kind: MediaKind, handle: &str) -> EngineEvent {
    EngineEvent::TrackRemoved {
        track: TrackInfo::remote(id, kind, handle),
    }
}

#[must_use]
pub fn slot_renamed(slot: usize, name: &str) -> EngineEvent {
    EngineEvent::SlotRenamed {
        slot: SlotIndex(slot),
        name: name.to_string(),
    }
}

#[must_use]
pub fn volume_set(slot: usize, level: f32) -> EngineEvent {
    EngineEvent::VolumeSet {
        slot: SlotIndex(slot),
        level,
    }
}

#[must_use]
pub fn midi(data: &[u8]) -> EngineEvent {
    EngineEvent::MidiMessage {
        data: data.to_vec(),
    }
}

#[must_use]
pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}
