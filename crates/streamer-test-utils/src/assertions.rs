//! Attachment model and binding invariant checks.

use common::types::{MediaHandle, MediaKind, ParticipantId, SlotIndex};
use std::collections::{HashMap, HashSet};
use streamer_core::engine::AssignmentEngine;
use streamer_core::messages::Command;

/// What each rendering target shows, rebuilt purely from engine commands.
///
/// Panics on a detach of a handle the target does not show and on an attach
/// over a different handle; both mean the engine lost track of the surface.
#[derive(Debug, Default, Clone)]
pub struct AttachmentModel {
    attached: HashMap<(SlotIndex, MediaKind), MediaHandle>,
    volumes: HashMap<SlotIndex, f32>,
    selection: Vec<ParticipantId>,
}

impl AttachmentModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, commands: &[Command]) {
        for command in commands {
            match command {
                Command::Attach { slot, kind, handle } => {
                    if let Some(current) = self.attached.get(&(*slot, *kind)) {
                        assert_eq!(
                            current, handle,
                            "attach of {handle} over {current} on slot {slot} {kind}"
                        );
                    }
                    self.attached.insert((*slot, *kind), handle.clone());
                }
                Command::Detach { slot, kind, handle } => {
                    let current = self.attached.remove(&(*slot, *kind));
                    assert_eq!(
                        current.as_ref(),
                        Some(handle),
                        "detach of {handle} from slot {slot} {kind}, which shows {current:?}"
                    );
                }
                Command::SetVolume { slot, level } => {
                    self.volumes.insert(*slot, *level);
                }
                Command::NotifySelection { participants } => {
                    self.selection.clone_from(participants);
                }
                Command::PersistSlotNames { .. } => {}
            }
        }
    }

    #[must_use]
    pub fn attached(&self, slot: usize, kind: MediaKind) -> Option<&MediaHandle> {
        self.attached.get(&(SlotIndex(slot), kind))
    }

    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    #[must_use]
    pub fn volume(&self, slot: usize) -> Option<f32> {
        self.volumes.get(&SlotIndex(slot)).copied()
    }

    #[must_use]
    pub fn selection(&self) -> &[ParticipantId] {
        &self.selection
    }
}

/// Check the engine's bookkeeping against itself and against `model`:
///
/// - every slot occupant is a known participant whose record points back
/// - no participant occupies two slots
/// - each target shows exactly the bound participant's handle, and unbound
///   slots show nothing
/// - the last selection equals the bound participants in slot order
pub fn assert_binding_integrity(engine: &AssignmentEngine, model: &AttachmentModel) {
    let mut seen = HashSet::new();
    let mut expected_attached = 0;

    for (slot, state) in engine.slots().iter() {
        match state.participant() {
            Some(participant) => {
                assert!(
                    seen.insert(participant.clone()),
                    "{participant} occupies more than one slot"
                );
                let record = engine
                    .tracks()
                    .get(participant)
                    .unwrap_or_else(|| panic!("slot {slot} holds unknown participant {participant}"));
                assert_eq!(
                    record.slot(),
                    Some(slot),
                    "record of {participant} disagrees with slot {slot}"
                );
                for kind in MediaKind::ALL {
                    assert_eq!(
                        model.attached(slot.get(), kind),
                        record.handle(kind),
                        "slot {slot} {kind} shows the wrong handle"
                    );
                    if record.handle(kind).is_some() {
                        expected_attached += 1;
                    }
                }
            }
            None => {
                for kind in MediaKind::ALL {
                    assert_eq!(
                        model.attached(slot.get(), kind),
                        None,
                        "unbound slot {slot} still shows {kind}"
                    );
                }
            }
        }
    }

    for record in engine.tracks().iter() {
        if let Some(slot) = record.slot() {
            assert_eq!(
                engine.slots().occupant(slot),
                Some(record.participant_id()),
                "{} claims slot {slot} it does not hold",
                record.participant_id()
            );
        }
    }

    assert_eq!(
        model.attached_count(),
        expected_attached,
        "handles attached outside any binding"
    );

    assert_eq!(
        model.selection(),
        engine.slots().bound_participants().as_slice(),
        "selection out of date"
    );
}
