//! Integration tests for slot assignment.
//!
//! Every test drives the engine through `dispatch`, replays the emitted
//! commands onto an attachment model and checks the binding invariants after
//! each step. Randomized sequences are generated with `proptest`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::types::{MediaHandle, MediaKind, SlotIndex};
use proptest::prelude::*;
use streamer_core::engine::AssignmentEngine;
use streamer_core::messages::{Command, EngineEvent};
use streamer_core::midi::MidiMapper;
use streamer_core::slots::SlotRegistry;
use streamer_test_utils::*;

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    engine: AssignmentEngine,
    model: AttachmentModel,
}

impl Harness {
    fn new(names: &[&str]) -> Self {
        Self {
            engine: AssignmentEngine::new(SlotRegistry::new(names, 0.7), MidiMapper::new(8, true)),
            model: AttachmentModel::new(),
        }
    }

    fn step(&mut self, event: EngineEvent) -> Vec<Command> {
        let commands = self.engine.dispatch(event);
        self.model.apply(&commands);
        assert_binding_integrity(&self.engine, &self.model);
        commands
    }

    fn occupant(&self, slot: usize) -> Option<&str> {
        self.engine
            .slots()
            .occupant(SlotIndex(slot))
            .map(|p| p.as_str())
    }
}

fn handle(id: &str) -> MediaHandle {
    MediaHandle::new(id)
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_join_then_track_attaches_to_named_slot() {
    let mut h = Harness::new(&["alpha", "beta"]);

    let commands = h.step(joined("p1", "alpha"));
    assert!(!commands
        .iter()
        .any(|c| matches!(c, Command::Attach { .. })));
    assert_eq!(h.occupant(0), Some("p1"));

    h.step(track_added("p1", MediaKind::Video, "v1"));
    assert_eq!(h.model.attached(0, MediaKind::Video), Some(&handle("v1")));
    assert_eq!(h.model.attached(0, MediaKind::Audio), None);
}

#[test]
fn test_participant_rename_moves_media() {
    let mut h = Harness::new(&["alpha", "beta"]);
    h.step(joined("p1", "alpha"));
    h.step(track_added("p1", MediaKind::Audio, "a1"));
    h.step(track_added("p1", MediaKind::Video, "v1"));

    h.step(renamed("p1", "beta"));

    assert_eq!(h.occupant(0), None);
    assert_eq!(h.occupant(1), Some("p1"));
    assert_eq!(h.model.attached(0, MediaKind::Video), None);
    assert_eq!(h.model.attached(1, MediaKind::Audio), Some(&handle("a1")));
    assert_eq!(h.model.attached(1, MediaKind::Video), Some(&handle("v1")));
}

#[test]
fn test_slot_rename_hands_slot_to_waiting_participant() {
    let mut h = Harness::new(&["alpha", "beta"]);
    h.step(joined("p1", "alpha"));
    h.step(track_added("p1", MediaKind::Video, "v1"));
    h.step(joined("p2", "gamma"));
    h.step(track_added("p2", MediaKind::Audio, "a2"));
    h.step(track_added("p2", MediaKind::Video, "v2"));

    let commands = h.step(slot_renamed(0, "gamma"));

    assert_eq!(h.occupant(0), Some("p2"));
    assert_eq!(h.model.attached(0, MediaKind::Video), Some(&handle("v2")));
    assert_eq!(h.model.selection(), &[pid("p2")]);
    assert_eq!(
        commands.last(),
        Some(&Command::PersistSlotNames {
            names: vec!["gamma".to_string(), "beta".to_string()]
        })
    );
    assert!(!h.engine.tracks().get(&pid("p1")).unwrap().is_bound());
}

#[test]
fn test_leave_frees_slot_and_updates_selection() {
    let mut h = Harness::new(&["alpha", "beta"]);
    h.step(joined("p1", "alpha"));
    h.step(track_added("p1", MediaKind::Audio, "a1"));
    h.step(track_added("p1", MediaKind::Video, "v1"));
    h.step(joined("p2", "beta"));

    h.step(left("p1"));

    assert_eq!(h.occupant(0), None);
    assert!(h.engine.tracks().get(&pid("p1")).is_none());
    assert_eq!(h.model.selection(), &[pid("p2")]);
    assert_eq!(h.model.attached_count(), 0);
}

#[test]
fn test_midi_fader_sets_slot_volume() {
    let mut h = Harness::new(&["a", "b", "c", "d", "e", "f"]);

    h.step(midi(&[176, 9, 64]));
    let level = h.model.volume(1).unwrap();
    assert!((level - 0.50).abs() < 0.01);

    h.step(midi(&[176, 12, 127]));
    assert!((h.model.volume(4).unwrap() - 1.0).abs() < f32::EPSILON);

    // Folds to slot 6, which does not exist
    assert!(h.step(midi(&[176, 14, 64])).is_empty());
    assert!(h.step(midi(&[176, 9])).is_empty());
}

// ============================================================================
// Tie-break and idempotence
// ============================================================================

#[test]
fn test_first_joiner_keeps_contested_slot() {
    let mut h = Harness::new(&["alpha"]);
    h.step(joined("p1", "Alpha"));
    h.step(joined("p2", "alpha"));
    h.step(track_added("p2", MediaKind::Video, "v2"));

    assert_eq!(h.occupant(0), Some("p1"));
    assert_eq!(h.model.attached(0, MediaKind::Video), None);

    // p2 waits; renaming p1 away frees the slot for p2
    h.step(renamed("p1", "off-air"));
    assert_eq!(h.occupant(0), Some("p2"));
    assert_eq!(h.model.attached(0, MediaKind::Video), Some(&handle("v2")));
}

#[test]
fn test_duplicate_events_do_not_change_state() {
    let mut h = Harness::new(&["alpha", "beta"]);
    h.step(joined("p1", "alpha"));
    h.step(track_added("p1", MediaKind::Video, "v1"));

    assert!(h.step(track_added("p1", MediaKind::Video, "v1")).is_empty());
    assert!(h.step(joined("p1", "alpha")).is_empty());

    h.step(slot_renamed(1, "beta"));
    let before = h.engine.slot_states();
    h.step(slot_renamed(1, "beta"));
    assert_eq!(h.engine.slot_states(), before);
}

#[test]
fn test_stale_removal_after_replacement_keeps_new_track() {
    let mut h = Harness::new(&["alpha"]);
    h.step(joined("p1", "alpha"));
    h.step(track_added("p1", MediaKind::Video, "v1"));
    h.step(track_added("p1", MediaKind::Video, "v2"));

    assert!(h.step(track_removed("p1", MediaKind::Video, "v1")).is_empty());
    assert_eq!(h.model.attached(0, MediaKind::Video), Some(&handle("v2")));
}

#[test]
fn test_teardown_then_rejoin() {
    let mut h = Harness::new(&["alpha", "beta"]);
    h.step(joined("p1", "alpha"));
    h.step(track_added("p1", MediaKind::Audio, "a1"));
    h.step(volume_set(0, 0.3));

    h.step(EngineEvent::Teardown);
    assert_eq!(h.model.attached_count(), 0);
    assert!(h.engine.tracks().is_empty());
    // Volumes and names survive
    assert!((h.engine.slot_states()[0].volume - 0.3).abs() < f32::EPSILON);

    h.step(joined("p1", "alpha"));
    h.step(track_added("p1", MediaKind::Audio, "a1"));
    assert_eq!(h.model.attached(0, MediaKind::Audio), Some(&handle("a1")));
}

// ============================================================================
// Randomized sequences
// ============================================================================

const PARTICIPANTS: [&str; 5] = ["p0", "p1", "p2", "p3", "p4"];
const NAMES: [&str; 5] = ["alpha", "Beta", "gamma", "ALPHA", "nobody"];
const KINDS: [MediaKind; 2] = [MediaKind::Audio, MediaKind::Video];

/// One generated step. Indices are resolved against the live engine when
/// the step runs, so track removals can target the current handle.
#[derive(Debug, Clone)]
struct Step {
    op: u8,
    participant: usize,
    name: usize,
    kind: usize,
    slot: usize,
    roll: u8,
}

fn arb_step() -> impl Strategy<Value = Step> {
    (
        0u8..12,
        0..PARTICIPANTS.len(),
        0..NAMES.len(),
        0..KINDS.len(),
        0usize..4,
        any::<u8>(),
    )
        .prop_map(|(op, participant, name, kind, slot, roll)| Step {
            op,
            participant,
            name,
            kind,
            slot,
            roll,
        })
}

fn event_for(step: &Step, engine: &AssignmentEngine, counter: &mut u32) -> EngineEvent {
    let id = PARTICIPANTS[step.participant];
    let name = NAMES[step.name];
    let kind = KINDS[step.kind];

    match step.op {
        0 | 1 => joined(id, name),
        2 => left(id),
        3 | 4 => renamed(id, name),
        5 | 6 => {
            *counter += 1;
            track_added(id, kind, &format!("{id}-{}-{counter}", kind.as_str()))
        }
        7 => {
            // Mostly the current handle, sometimes a stale one
            let current = engine
                .tracks()
                .get(&pid(id))
                .and_then(|r| r.handle(kind))
                .map(|h| h.as_str().to_string());
            match current {
                Some(current) if step.roll % 4 > 0 => track_removed(id, kind, &current),
                _ => track_removed(id, kind, "stale"),
            }
        }
        8 => slot_renamed(step.slot, name),
        9 => volume_set(step.slot, 0.25),
        10 => EngineEvent::ReloadSlot {
            slot: SlotIndex(step.slot % 3),
        },
        _ => {
            if step.roll % 10 == 0 {
                EngineEvent::Teardown
            } else {
                midi(&[176, 8 + step.slot as u8, 100])
            }
        }
    }
}

/// Replay `steps` on a fresh engine, checking the invariants after each one.
fn run_steps(steps: &[Step]) -> Vec<Vec<Command>> {
    let mut h = Harness::new(&["alpha", "beta", "gamma"]);
    let mut counter = 0;

    steps
        .iter()
        .map(|step| {
            let event = event_for(step, &h.engine, &mut counter);
            h.step(event)
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_random_sequences_keep_invariants(steps in prop::collection::vec(arb_step(), 1..300)) {
        run_steps(&steps);
    }

    #[test]
    fn prop_same_sequence_same_commands(steps in prop::collection::vec(arb_step(), 1..200)) {
        prop_assert_eq!(run_steps(&steps), run_steps(&steps));
    }
}
