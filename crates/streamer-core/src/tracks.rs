//! Participant track store.
//!
//! Bookkeeping only: which audio/video handles each participant currently
//! has, their display name and the slot they occupy. Nothing here touches
//! the rendering surface.
//!
//! Records are kept in first-seen order so that "first matching participant"
//! scans are reproducible.

use crate::slots::normalize_name;
use common::types::{MediaHandle, MediaKind, ParticipantId, SlotIndex};
use indexmap::IndexMap;

/// Per-participant track record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    participant_id: ParticipantId,
    display_name: Option<String>,
    audio: Option<MediaHandle>,
    video: Option<MediaHandle>,
    slot: Option<SlotIndex>,
}

impl TrackRecord {
    fn new(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            display_name: None,
            audio: None,
            video: None,
            slot: None,
        }
    }

    #[must_use]
    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    /// `None` until a join or rename event reported a name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    #[must_use]
    pub fn slot(&self) -> Option<SlotIndex> {
        self.slot
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.slot.is_some()
    }

    #[must_use]
    pub fn handle(&self, kind: MediaKind) -> Option<&MediaHandle> {
        match kind {
            MediaKind::Audio => self.audio.as_ref(),
            MediaKind::Video => self.video.as_ref(),
        }
    }

    /// Present handles, audio first.
    pub fn handles(&self) -> impl Iterator<Item = (MediaKind, &MediaHandle)> {
        MediaKind::ALL
            .into_iter()
            .filter_map(|kind| self.handle(kind).map(|handle| (kind, handle)))
    }

    /// Trackless, but still in the conference.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }

    /// Case-insensitive comparison against an already normalized name.
    #[must_use]
    pub fn matches_name(&self, normalized: &str) -> bool {
        !normalized.is_empty()
            && self
                .display_name
                .as_deref()
                .is_some_and(|name| normalize_name(name) == normalized)
    }

    pub(crate) fn set_display_name(&mut self, name: &str) {
        self.display_name = Some(name.to_string());
    }

    pub(crate) fn set_slot(&mut self, slot: Option<SlotIndex>) {
        self.slot = slot;
    }

    fn slot_for(&mut self, kind: MediaKind) -> &mut Option<MediaHandle> {
        match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        }
    }
}

/// Insertion-ordered table of track records.
#[derive(Debug, Clone, Default)]
pub struct TrackStore {
    records: IndexMap<ParticipantId, TrackRecord>,
}

impl TrackStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.records.contains_key(participant)
    }

    #[must_use]
    pub fn get(&self, participant: &ParticipantId) -> Option<&TrackRecord> {
        self.records.get(participant)
    }

    pub(crate) fn get_mut(&mut self, participant: &ParticipantId) -> Option<&mut TrackRecord> {
        self.records.get_mut(participant)
    }

    /// Fetch the record, creating an empty one if this participant is new.
    pub fn ensure(&mut self, participant: &ParticipantId) -> &mut TrackRecord {
        self.records
            .entry(participant.clone())
            .or_insert_with(|| TrackRecord::new(participant.clone()))
    }

    /// Store `handle` as the participant's `kind` track, creating the record
    /// if needed. Returns the handle it replaced.
    pub fn upsert_track(
        &mut self,
        participant: &ParticipantId,
        kind: MediaKind,
        handle: MediaHandle,
    ) -> Option<MediaHandle> {
        self.ensure(participant).slot_for(kind).replace(handle)
    }

    /// Drop the participant's `kind` track. The record itself stays, even
    /// when it ends up empty.
    pub fn remove_track(
        &mut self,
        participant: &ParticipantId,
        kind: MediaKind,
    ) -> Option<MediaHandle> {
        self.records
            .get_mut(participant)
            .and_then(|record| record.slot_for(kind).take())
    }

    /// Delete the record, keeping the order of the remaining ones.
    pub fn remove(&mut self, participant: &ParticipantId) -> Option<TrackRecord> {
        self.records.shift_remove(participant)
    }

    /// Records in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackRecord> {
        self.records.values()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
