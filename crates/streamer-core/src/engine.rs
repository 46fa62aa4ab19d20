//! Assignment engine.
//!
//! Pure state machine that decides which participant occupies which slot.
//! Every [`EngineEvent`] is handled to completion by [`AssignmentEngine::dispatch`],
//! which returns the [`Command`]s the caller must apply to the rendering
//! surface, the transport and the slot-name store. The engine does no I/O.
//!
//! # Invariants
//!
//! - A slot holds at most one participant and a participant holds at most
//!   one slot.
//! - A handle is attached to slot S's target exactly while its participant
//!   is bound to S. Every unbind emits the matching detaches first.
//!
//! # Tie-break
//!
//! When several participants match a free slot, the first one processed
//! wins: join order for scans, event order otherwise. Others stay unbound
//! until the slot frees (they are picked up in join order) or they rename.

use crate::messages::{Command, EngineEvent, ParticipantState, SlotState, TrackInfo};
use crate::midi::MidiMapper;
use crate::observability::record_midi_ignored;
use crate::slots::{volume_label, SlotRegistry};
use crate::tracks::{TrackRecord, TrackStore};
use common::types::{MediaKind, ParticipantId, SlotIndex};
use tracing::{debug, info, warn};

/// Owns the slot registry and the track store; all mutation goes through
/// [`AssignmentEngine::dispatch`].
#[derive(Debug, Clone)]
pub struct AssignmentEngine {
    slots: SlotRegistry,
    tracks: TrackStore,
    midi: MidiMapper,
}

impl AssignmentEngine {
    #[must_use]
    pub fn new(slots: SlotRegistry, midi: MidiMapper) -> Self {
        Self {
            slots,
            tracks: TrackStore::new(),
            midi,
        }
    }

    #[must_use]
    pub fn slots(&self) -> &SlotRegistry {
        &self.slots
    }

    #[must_use]
    pub fn tracks(&self) -> &TrackStore {
        &self.tracks
    }

    /// Handle one event and return the side effects it requires, in order.
    pub fn dispatch(&mut self, event: EngineEvent) -> Vec<Command> {
        let mut out = Vec::new();

        match event {
            EngineEvent::Joined {
                participant_id,
                display_name,
            } => self.handle_joined(&participant_id, &display_name, &mut out),

            EngineEvent::Left { participant_id } => self.handle_left(&participant_id, &mut out),

            EngineEvent::DisplayNameChanged {
                participant_id,
                display_name,
            } => self.handle_display_name_changed(&participant_id, &display_name, &mut out),

            EngineEvent::TrackAdded { track } => self.handle_track_added(track, &mut out),

            EngineEvent::TrackRemoved { track } => self.handle_track_removed(&track, &mut out),

            EngineEvent::SlotRenamed { slot, name } => {
                self.handle_slot_renamed(slot, &name, &mut out);
            }

            EngineEvent::VolumeSet { slot, level } => {
                self.handle_volume_set(slot, level, &mut out);
            }

            EngineEvent::MidiMessage { data } => self.handle_midi(&data, &mut out),

            EngineEvent::ReloadSlot { slot } => self.handle_reload(slot, &mut out),

            EngineEvent::Teardown => self.handle_teardown(&mut out),
        }

        out
    }

    /// Slots as shown on the operator surface.
    #[must_use]
    pub fn slot_states(&self) -> Vec<SlotState> {
        self.slots
            .iter()
            .map(|(index, slot)| SlotState {
                index,
                name: slot.name().to_string(),
                participant_id: slot.participant().cloned(),
                volume: slot.volume(),
                volume_label: volume_label(slot.volume()),
            })
            .collect()
    }

    /// Known participants in join order.
    #[must_use]
    pub fn participant_states(&self) -> Vec<ParticipantState> {
        self.tracks
            .iter()
            .map(|record| ParticipantState {
                participant_id: record.participant_id().clone(),
                display_name: record.display_name().map(str::to_string),
                slot: record.slot(),
                has_audio: record.handle(MediaKind::Audio).is_some(),
                has_video: record.handle(MediaKind::Video).is_some(),
            })
            .collect()
    }

    fn handle_joined(
        &mut self,
        participant_id: &ParticipantId,
        display_name: &str,
        out: &mut Vec<Command>,
    ) {
        let record = self.tracks.ensure(participant_id);
        record.set_display_name(display_name);

        if let Some(slot) = record.slot() {
            debug!(
                target: "streamer.engine",
                participant_id = %participant_id,
                slot = %slot,
                "Join for already bound participant, keeping slot"
            );
            return;
        }

        info!(
            target: "streamer.engine",
            participant_id = %participant_id,
            display_name = %display_name,
            "Participant joined"
        );

        if self.try_bind_by_name(participant_id, out) {
            self.notify(out);
        }
    }

    fn handle_left(&mut self, participant_id: &ParticipantId, out: &mut Vec<Command>) {
        if !self.tracks.contains(participant_id) {
            debug!(
                target: "streamer.engine",
                participant_id = %participant_id,
                "Leave for unknown participant ignored"
            );
            return;
        }

        let freed = self.detach_and_unbind(participant_id, out);
        self.tracks.remove(participant_id);

        info!(
            target: "streamer.engine",
            participant_id = %participant_id,
            freed_slot = ?freed,
            remaining_participants = self.tracks.len(),
            "Participant left"
        );

        if let Some(slot) = freed {
            self.fill_slot(slot, out);
        }
        self.notify(out);
    }

    fn handle_display_name_changed(
        &mut self,
        participant_id: &ParticipantId,
        display_name: &str,
        out: &mut Vec<Command>,
    ) {
        self.tracks.ensure(participant_id).set_display_name(display_name);

        let previous = self.detach_and_unbind(participant_id, out);

        let mut evicted = None;
        if let Some(slot) = self.slots.find_slot_by_name(display_name) {
            if let Some(occupant) = self.slots.occupant(slot).cloned() {
                info!(
                    target: "streamer.engine",
                    slot = %slot,
                    evicted = %occupant,
                    participant_id = %participant_id,
                    "Evicting slot occupant for renamed participant"
                );
                self.detach_and_unbind(&occupant, out);
                evicted = Some(occupant);
            }
            self.bind_and_attach(slot, participant_id, out);
        }

        if let Some(slot) = previous {
            self.fill_slot(slot, out);
        }

        if let Some(occupant) = &evicted {
            self.rehome(occupant, out);
        }

        info!(
            target: "streamer.engine",
            participant_id = %participant_id,
            display_name = %display_name,
            previous_slot = ?previous,
            slot = ?self.slots.find_slot_by_participant(participant_id),
            "Participant renamed"
        );

        self.notify(out);
    }

    fn handle_track_added(&mut self, track: TrackInfo, out: &mut Vec<Command>) {
        if track.is_local {
            debug!(target: "streamer.engine", kind = %track.kind, "Ignoring local track");
            return;
        }

        let TrackInfo {
            participant_id,
            kind,
            handle,
            ..
        } = track;

        let previous = self
            .tracks
            .upsert_track(&participant_id, kind, handle.clone());

        if previous.as_ref() == Some(&handle) {
            debug!(
                target: "streamer.engine",
                participant_id = %participant_id,
                kind = %kind,
                "Track already known"
            );
            return;
        }

        match self.tracks.get(&participant_id).and_then(TrackRecord::slot) {
            Some(slot) => {
                if let Some(old) = previous {
                    out.push(Command::Detach {
                        slot,
                        kind,
                        handle: old,
                    });
                }
                debug!(
                    target: "streamer.engine",
                    participant_id = %participant_id,
                    kind = %kind,
                    slot = %slot,
                    "Attaching track"
                );
                out.push(Command::Attach { slot, kind, handle });
            }
            None => {
                debug!(
                    target: "streamer.engine",
                    participant_id = %participant_id,
                    kind = %kind,
                    "Participant not on a slot, holding track"
                );
            }
        }
    }

    fn handle_track_removed(&mut self, track: &TrackInfo, out: &mut Vec<Command>) {
        if track.is_local {
            return;
        }

        let Some(record) = self.tracks.get(&track.participant_id) else {
            debug!(
                target: "streamer.engine",
                participant_id = %track.participant_id,
                "Track removed for unknown participant"
            );
            return;
        };

        if record.handle(track.kind) != Some(&track.handle) {
            debug!(
                target: "streamer.engine",
                participant_id = %track.participant_id,
                kind = %track.kind,
                "Stale track removal ignored"
            );
            return;
        }

        if let Some(slot) = record.slot() {
            out.push(Command::Detach {
                slot,
                kind: track.kind,
                handle: track.handle.clone(),
            });
        }

        self.tracks.remove_track(&track.participant_id, track.kind);
    }

    fn handle_slot_renamed(&mut self, slot: SlotIndex, name: &str, out: &mut Vec<Command>) {
        let previous_name = match self.slots.rename(slot, name) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(target: "streamer.engine", error = %e, "Slot rename ignored");
                return;
            }
        };

        let evicted = self.slots.occupant(slot).cloned();
        if let Some(occupant) = &evicted {
            self.detach_and_unbind(occupant, out);
        }

        self.fill_slot(slot, out);

        if let Some(occupant) = &evicted {
            self.rehome(occupant, out);
        }

        info!(
            target: "streamer.engine",
            slot = %slot,
            previous_name = %previous_name,
            name = %name,
            participant_id = ?self.slots.occupant(slot),
            "Slot renamed"
        );

        self.notify(out);
        out.push(Command::PersistSlotNames {
            names: self.slots.names(),
        });
    }

    fn handle_volume_set(&mut self, slot: SlotIndex, level: f32, out: &mut Vec<Command>) {
        if level.is_nan() {
            warn!(target: "streamer.engine", slot = %slot, "NaN volume ignored");
            return;
        }

        match self.slots.set_volume(slot, level) {
            Ok(level) => out.push(Command::SetVolume { slot, level }),
            Err(e) => {
                debug!(target: "streamer.engine", error = %e, "Volume change ignored");
            }
        }
    }

    fn handle_midi(&mut self, data: &[u8], out: &mut Vec<Command>) {
        match self.midi.decode(data) {
            Ok(control) if self.slots.contains(control.slot) => {
                self.handle_volume_set(control.slot, control.level, out);
            }
            Ok(control) => {
                record_midi_ignored("slot_out_of_range");
                debug!(
                    target: "streamer.engine",
                    slot = %control.slot,
                    slot_count = self.slots.len(),
                    "MIDI control for missing slot ignored"
                );
            }
            Err(reason) => {
                record_midi_ignored(reason.as_str());
                debug!(target: "streamer.engine", reason = %reason, "MIDI message ignored");
            }
        }
    }

    fn handle_reload(&mut self, slot: SlotIndex, out: &mut Vec<Command>) {
        let Some(record) = self
            .slots
            .occupant(slot)
            .and_then(|id| self.tracks.get(id))
        else {
            debug!(target: "streamer.engine", slot = %slot, "Nothing to reload");
            return;
        };

        for (kind, handle) in record.handles() {
            out.push(Command::Detach {
                slot,
                kind,
                handle: handle.clone(),
            });
        }
        for (kind, handle) in record.handles() {
            out.push(Command::Attach {
                slot,
                kind,
                handle: handle.clone(),
            });
        }
    }

    fn handle_teardown(&mut self, out: &mut Vec<Command>) {
        for (slot, participant_id) in self.slots.clear_bindings() {
            if let Some(record) = self.tracks.get(&participant_id) {
                for (kind, handle) in record.handles() {
                    out.push(Command::Detach {
                        slot,
                        kind,
                        handle: handle.clone(),
                    });
                }
            }
        }

        info!(
            target: "streamer.engine",
            participants = self.tracks.len(),
            "Tearing down slot assignments"
        );

        self.tracks.clear();
        self.notify(out);
    }

    fn is_bound(&self, participant_id: &ParticipantId) -> bool {
        self.tracks
            .get(participant_id)
            .is_some_and(TrackRecord::is_bound)
    }

    /// Bind an unbound participant to the slot expecting its display name,
    /// if that slot is free.
    fn try_bind_by_name(&mut self, participant_id: &ParticipantId, out: &mut Vec<Command>) -> bool {
        let Some(name) = self
            .tracks
            .get(participant_id)
            .and_then(TrackRecord::display_name)
        else {
            return false;
        };

        let Some(slot) = self.slots.find_slot_by_name(name) else {
            debug!(
                target: "streamer.engine",
                participant_id = %participant_id,
                "No slot expects this name"
            );
            return false;
        };

        if let Some(occupant) = self.slots.occupant(slot) {
            debug!(
                target: "streamer.engine",
                participant_id = %participant_id,
                slot = %slot,
                occupant = %occupant,
                "Slot taken, participant stays unbound"
            );
            return false;
        }

        self.bind_and_attach(slot, participant_id, out)
    }

    /// Move an evicted participant to another free slot expecting its
    /// display name, if there is one.
    fn rehome(&mut self, participant_id: &ParticipantId, out: &mut Vec<Command>) -> bool {
        if self.is_bound(participant_id) {
            return false;
        }
        let Some(slot) = self
            .tracks
            .get(participant_id)
            .and_then(TrackRecord::display_name)
            .and_then(|name| self.slots.find_free_slot_by_name(name))
        else {
            return false;
        };

        debug!(
            target: "streamer.engine",
            participant_id = %participant_id,
            slot = %slot,
            "Evicted participant moved to a free slot"
        );
        self.bind_and_attach(slot, participant_id, out)
    }

    /// Give a free slot to the first unbound participant, in join order,
    /// whose display name matches.
    fn fill_slot(&mut self, slot: SlotIndex, out: &mut Vec<Command>) -> bool {
        if self.slots.occupant(slot).is_some() {
            return false;
        }
        let Some(name) = self.slots.get(slot).map(|s| s.name().to_string()) else {
            return false;
        };

        let candidate = self
            .tracks
            .iter()
            .find(|record| !record.is_bound() && record.matches_name(&name))
            .map(|record| record.participant_id().clone());

        match candidate {
            Some(participant_id) => self.bind_and_attach(slot, &participant_id, out),
            None => false,
        }
    }

    fn bind_and_attach(
        &mut self,
        slot: SlotIndex,
        participant_id: &ParticipantId,
        out: &mut Vec<Command>,
    ) -> bool {
        if let Err(e) = self.slots.bind(slot, participant_id) {
            warn!(target: "streamer.engine", error = %e, "Bind refused");
            return false;
        }

        let Some(record) = self.tracks.get_mut(participant_id) else {
            // Only known participants are ever bound
            self.slots.unbind(slot);
            warn!(
                target: "streamer.engine",
                participant_id = %participant_id,
                "Bind for participant without record reverted"
            );
            return false;
        };

        record.set_slot(Some(slot));
        for (kind, handle) in record.handles() {
            out.push(Command::Attach {
                slot,
                kind,
                handle: handle.clone(),
            });
        }

        info!(
            target: "streamer.engine",
            participant_id = %participant_id,
            slot = %slot,
            "Participant bound to slot"
        );
        true
    }

    /// Detach all of the participant's handles and free its slot.
    fn detach_and_unbind(
        &mut self,
        participant_id: &ParticipantId,
        out: &mut Vec<Command>,
    ) -> Option<SlotIndex> {
        let record = self.tracks.get_mut(participant_id)?;
        let slot = record.slot()?;
        record.set_slot(None);

        for (kind, handle) in record.handles() {
            out.push(Command::Detach {
                slot,
                kind,
                handle: handle.clone(),
            });
        }

        if self.slots.unbind(slot).as_ref() != Some(participant_id) {
            warn!(
                target: "streamer.engine",
                participant_id = %participant_id,
                slot = %slot,
                "Slot registry did not hold the participant being unbound"
            );
        }

        debug!(
            target: "streamer.engine",
            participant_id = %participant_id,
            slot = %slot,
            "Participant unbound from slot"
        );
        Some(slot)
    }

    fn notify(&self, out: &mut Vec<Command>) {
        out.push(Command::NotifySelection {
            participants: self.slots.bound_participants(),
        });
    }
}
