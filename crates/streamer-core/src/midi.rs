//! MIDI control-change decoding.
//!
//! The control surface sends 3-byte control-change messages:
//!
//! | Byte | Meaning |
//! |------|---------|
//! | 0 | status, must be `0xB0` (176, control change on channel 1) |
//! | 1 | controller number; the second fader bank starts at the bank offset |
//! | 2 | value 0-127, mapped linearly to a volume in `[0, 1]` |
//!
//! Controllers at or above the bank offset are folded back onto the first
//! bank, so both banks drive the same slots. Anything that does not decode
//! is dropped; the caller never sees an error.

use common::types::SlotIndex;
use thiserror::Error;

/// Control-change status byte on channel 1.
pub const CONTROL_CHANGE: u8 = 176;

/// Largest 7-bit MIDI data value.
pub const MIDI_VALUE_MAX: u8 = 127;

/// A decoded fader move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiControl {
    pub slot: SlotIndex,
    pub level: f32,
}

/// Why a message was not turned into a fader move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MidiIgnored {
    #[error("MIDI input disabled")]
    Disabled,

    #[error("expected 3 bytes, got {0}")]
    Malformed(usize),

    #[error("status byte {0} is not control change")]
    NotControlChange(u8),
}

impl MidiIgnored {
    /// Returns the reason as a string for metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MidiIgnored::Disabled => "disabled",
            MidiIgnored::Malformed(_) => "malformed",
            MidiIgnored::NotControlChange(_) => "not_control_change",
        }
    }
}

/// Maps raw control-change messages onto slot volumes.
#[derive(Debug, Clone, Copy)]
pub struct MidiMapper {
    bank_offset: u8,
    enabled: bool,
}

impl MidiMapper {
    #[must_use]
    pub const fn new(bank_offset: u8, enabled: bool) -> Self {
        Self {
            bank_offset,
            enabled,
        }
    }

    /// Decode one message. The returned slot may still be beyond the
    /// configured slot count; range checks belong to the caller.
    ///
    /// # Errors
    ///
    /// Returns the [`MidiIgnored`] reason when the message is not a fader move.
    pub fn decode(&self, data: &[u8]) -> Result<MidiControl, MidiIgnored> {
        if !self.enabled {
            return Err(MidiIgnored::Disabled);
        }

        let [status, controller, value] = *data else {
            return Err(MidiIgnored::Malformed(data.len()));
        };

        if status != CONTROL_CHANGE {
            return Err(MidiIgnored::NotControlChange(status));
        }

        let controller = if self.bank_offset > 0 && controller >= self.bank_offset {
            controller - self.bank_offset
        } else {
            controller
        };

        Ok(MidiControl {
            slot: SlotIndex(usize::from(controller)),
            level: f32::from(value.min(MIDI_VALUE_MAX)) / f32::from(MIDI_VALUE_MAX),
        })
    }
}

impl Default for MidiMapper {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MIDI_BANK_OFFSET, true)
    }
}
