//! Rendering surface seam.
//!
//! Each slot has one audio and one video target. Calls are synchronous and
//! must not block. A missing target is reported by returning `false`; the
//! caller treats that as a no-op.

use common::types::{MediaHandle, MediaKind, SlotIndex};

/// Rendering targets for all slots.
pub trait RenderSurface: Send + 'static {
    /// Bind `handle` to the `kind` target of `slot`.
    fn attach(&mut self, slot: SlotIndex, kind: MediaKind, handle: &MediaHandle) -> bool;

    /// Release `handle` from the `kind` target of `slot`.
    fn detach(&mut self, slot: SlotIndex, kind: MediaKind, handle: &MediaHandle) -> bool;

    /// Set playback volume of the audio target of `slot`.
    fn set_volume(&mut self, slot: SlotIndex, level: f32) -> bool;
}
