//! Mock rendering surface.
//!
//! One audio and one video target per slot. `detach` only succeeds for the
//! handle the target currently shows, so a test sees a `false` (and the
//! session a render no-op) whenever the engine detaches something it never
//! attached.

use common::types::{MediaHandle, MediaKind, SlotIndex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use streamer_core::render::RenderSurface;

/// One recorded render call.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Attach(SlotIndex, MediaKind, MediaHandle),
    Detach(SlotIndex, MediaKind, MediaHandle),
    SetVolume(SlotIndex, f32),
}

#[derive(Debug, Default)]
struct SurfaceState {
    attached: HashMap<(SlotIndex, MediaKind), MediaHandle>,
    volumes: HashMap<SlotIndex, f32>,
    calls: Vec<RenderCall>,
    rejected: usize,
}

/// Shared view of a [`MockRenderSurface`].
#[derive(Debug, Clone, Default)]
pub struct SurfaceProbe {
    state: Arc<Mutex<SurfaceState>>,
}

impl SurfaceProbe {
    /// Handle currently shown by the `kind` target of `slot`.
    #[must_use]
    pub fn attached(&self, slot: usize, kind: MediaKind) -> Option<MediaHandle> {
        self.state
            .lock()
            .unwrap()
            .attached
            .get(&(SlotIndex(slot), kind))
            .cloned()
    }

    /// Number of targets showing something.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.state.lock().unwrap().attached.len()
    }

    #[must_use]
    pub fn volume(&self, slot: usize) -> Option<f32> {
        self.state
            .lock()
            .unwrap()
            .volumes
            .get(&SlotIndex(slot))
            .copied()
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RenderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that returned `false`.
    #[must_use]
    pub fn rejected(&self) -> usize {
        self.state.lock().unwrap().rejected
    }
}

/// Mock rendering surface with `slot_count` slots.
#[derive(Debug)]
pub struct MockRenderSurface {
    slot_count: usize,
    probe: SurfaceProbe,
}

impl MockRenderSurface {
    #[must_use]
    pub fn new(slot_count: usize) -> Self {
        Self {
            slot_count,
            probe: SurfaceProbe::default(),
        }
    }

    /// Handle for inspecting the surface after it was moved into a session.
    #[must_use]
    pub fn probe(&self) -> SurfaceProbe {
        self.probe.clone()
    }

    fn record(&self, call: RenderCall, ok: bool) -> bool {
        let mut state = self.probe.state.lock().unwrap();
        state.calls.push(call);
        if !ok {
            state.rejected += 1;
        }
        ok
    }
}

impl RenderSurface for MockRenderSurface {
    fn attach(&mut self, slot: SlotIndex, kind: MediaKind, handle: &MediaHandle) -> bool {
        let ok = slot.get() < self.slot_count;
        if ok {
            self.probe
                .state
                .lock()
                .unwrap()
                .attached
                .insert((slot, kind), handle.clone());
        }
        self.record(RenderCall::Attach(slot, kind, handle.clone()), ok)
    }

    fn detach(&mut self, slot: SlotIndex, kind: MediaKind, handle: &MediaHandle) -> bool {
        let ok = {
            let mut state = self.probe.state.lock().unwrap();
            if state.attached.get(&(slot, kind)) == Some(handle) {
                state.attached.remove(&(slot, kind));
                true
            } else {
                false
            }
        };
        self.record(RenderCall::Detach(slot, kind, handle.clone()), ok)
    }

    fn set_volume(&mut self, slot: SlotIndex, level: f32) -> bool {
        let ok = slot.get() < self.slot_count;
        if ok {
            self.probe
                .state
                .lock()
                .unwrap()
                .volumes
                .insert(slot, level);
        }
        self.record(RenderCall::SetVolume(slot, level), ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_requires_matching_handle() {
        let mut surface = MockRenderSurface::new(2);
        let probe = surface.probe();

        assert!(surface.attach(SlotIndex(0), MediaKind::Video, &MediaHandle::new("v1")));
        assert!(!surface.detach(SlotIndex(0), MediaKind::Video, &MediaHandle::new("v2")));
        assert!(surface.detach(SlotIndex(0), MediaKind::Video, &MediaHandle::new("v1")));

        assert_eq!(probe.attached_count(), 0);
        assert_eq!(probe.rejected(), 1);
        assert_eq!(probe.calls().len(), 3);
    }

    #[test]
    fn test_missing_slot_is_rejected() {
        let mut surface = MockRenderSurface::new(1);
        assert!(!surface.set_volume(SlotIndex(1), 0.5));
        assert!(!surface.attach(SlotIndex(3), MediaKind::Audio, &MediaHandle::new("a1")));
        assert_eq!(surface.probe().rejected(), 2);
    }
}
