//! Slot registry.
//!
//! A fixed, ordered list of on-screen slots. Each slot has the display name
//! it expects, an optional occupant and a playback volume. The registry only
//! keeps the table consistent; deciding who goes where is the engine's job.
//!
//! Names are compared case-insensitively and stored lowercased. A slot whose
//! name is empty never matches anyone.

use crate::errors::SlotError;
use common::types::{ParticipantId, SlotIndex};

/// Lowercase a display name for matching.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
}

/// Format a volume the way the operator surface shows it.
#[must_use]
pub fn volume_label(level: f32) -> String {
    format!("{:.0}%", (level * 100.0).round())
}

/// One on-screen slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    name: String,
    participant: Option<ParticipantId>,
    volume: f32,
}

impl Slot {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn participant(&self) -> Option<&ParticipantId> {
        self.participant.as_ref()
    }

    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn matches(&self, normalized: &str) -> bool {
        !self.name.is_empty() && self.name == normalized
    }
}

/// Fixed-size ordered slot table.
#[derive(Debug, Clone)]
pub struct SlotRegistry {
    slots: Vec<Slot>,
}

impl SlotRegistry {
    /// Create one slot per name, all unbound, all at `volume`.
    pub fn new<I, S>(names: I, volume: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let slots = names
            .into_iter()
            .map(|name| Slot {
                name: normalize_name(name.as_ref()),
                participant: None,
                volume,
            })
            .collect();
        Self { slots }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn contains(&self, slot: SlotIndex) -> bool {
        slot.get() < self.slots.len()
    }

    #[must_use]
    pub fn get(&self, slot: SlotIndex) -> Option<&Slot> {
        self.slots.get(slot.get())
    }

    /// Slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (SlotIndex(i), slot))
    }

    #[must_use]
    pub fn occupant(&self, slot: SlotIndex) -> Option<&ParticipantId> {
        self.get(slot).and_then(Slot::participant)
    }

    /// Bind `participant` to `slot`.
    ///
    /// Binding a participant to the slot it already occupies is a no-op.
    ///
    /// # Errors
    ///
    /// - [`SlotError::OutOfRange`] if `slot` does not exist
    /// - [`SlotError::Occupied`] if another participant holds the slot
    /// - [`SlotError::ParticipantBound`] if the participant holds another slot
    pub fn bind(&mut self, slot: SlotIndex, participant: &ParticipantId) -> Result<(), SlotError> {
        if let Some(current) = self.find_slot_by_participant(participant) {
            if current == slot {
                return Ok(());
            }
            return Err(SlotError::ParticipantBound {
                participant: participant.to_string(),
                slot: current.get(),
            });
        }

        let count = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot.get())
            .ok_or(SlotError::OutOfRange {
                slot: slot.get(),
                count,
            })?;

        if let Some(occupant) = &entry.participant {
            return Err(SlotError::Occupied {
                slot: slot.get(),
                occupant: occupant.to_string(),
            });
        }

        entry.participant = Some(participant.clone());
        Ok(())
    }

    /// Clear `slot`, returning whoever occupied it.
    pub fn unbind(&mut self, slot: SlotIndex) -> Option<ParticipantId> {
        self.slots
            .get_mut(slot.get())
            .and_then(|entry| entry.participant.take())
    }

    /// First slot whose name equals `name` (case-insensitive).
    #[must_use]
    pub fn find_slot_by_name(&self, name: &str) -> Option<SlotIndex> {
        let normalized = normalize_name(name);
        self.slots
            .iter()
            .position(|slot| slot.matches(&normalized))
            .map(SlotIndex)
    }

    /// First slot expecting `name` that nobody occupies.
    #[must_use]
    pub fn find_free_slot_by_name(&self, name: &str) -> Option<SlotIndex> {
        let normalized = normalize_name(name);
        self.slots
            .iter()
            .position(|slot| slot.participant.is_none() && slot.matches(&normalized))
            .map(SlotIndex)
    }

    #[must_use]
    pub fn find_slot_by_participant(&self, participant: &ParticipantId) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(|slot| slot.participant.as_ref() == Some(participant))
            .map(SlotIndex)
    }

    /// Change the name `slot` expects. Bindings are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::OutOfRange`] if `slot` does not exist.
    pub fn rename(&mut self, slot: SlotIndex, name: &str) -> Result<String, SlotError> {
        let count = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot.get())
            .ok_or(SlotError::OutOfRange {
                slot: slot.get(),
                count,
            })?;
        Ok(std::mem::replace(&mut entry.name, normalize_name(name)))
    }

    /// Store a volume, clamped to `[0, 1]`. Returns the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::OutOfRange`] if `slot` does not exist.
    pub fn set_volume(&mut self, slot: SlotIndex, level: f32) -> Result<f32, SlotError> {
        let count = self.slots.len();
        let entry = self
            .slots
            .get_mut(slot.get())
            .ok_or(SlotError::OutOfRange {
                slot: slot.get(),
                count,
            })?;
        entry.volume = level.clamp(0.0, 1.0);
        Ok(entry.volume)
    }

    /// Slot names in index order, for persistence.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|slot| slot.name.clone()).collect()
    }

    /// Bound participants in slot order.
    #[must_use]
    pub fn bound_participants(&self) -> Vec<ParticipantId> {
        self.slots
            .iter()
            .filter_map(|slot| slot.participant.clone())
            .collect()
    }

    /// Unbind every slot, returning the former bindings in slot order.
    pub fn clear_bindings(&mut self) -> Vec<(SlotIndex, ParticipantId)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.participant.take().map(|p| (SlotIndex(i), p)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn registry() -> SlotRegistry {
        SlotRegistry::new(["alpha", "Beta", "", "alpha"], 0.7)
    }

    #[test]
    fn test_names_are_lowercased() {
        assert_eq!(registry().names(), vec!["alpha", "beta", "", "alpha"]);
    }

    #[test]
    fn test_find_slot_by_name_is_case_insensitive_and_first_match() {
        let slots = registry();
        assert_eq!(slots.find_slot_by_name("ALPHA"), Some(SlotIndex(0)));
        assert_eq!(slots.find_slot_by_name("beta"), Some(SlotIndex(1)));
        assert_eq!(slots.find_slot_by_name("gamma"), None);
        // Empty slot names never match
        assert_eq!(slots.find_slot_by_name(""), None);
    }

    #[test]
    fn test_find_free_slot_skips_occupied_duplicates() {
        let mut slots = registry();
        assert_eq!(slots.find_free_slot_by_name("alpha"), Some(SlotIndex(0)));

        slots.bind(SlotIndex(0), &ParticipantId::new("p1")).unwrap();
        assert_eq!(slots.find_free_slot_by_name("ALPHA"), Some(SlotIndex(3)));

        slots.bind(SlotIndex(3), &ParticipantId::new("p2")).unwrap();
        assert_eq!(slots.find_free_slot_by_name("alpha"), None);
    }

    #[test]
    fn test_bind_rejects_occupied_slot() {
        let mut slots = registry();
        let p1 = ParticipantId::new("p1");
        let p2 = ParticipantId::new("p2");

        slots.bind(SlotIndex(0), &p1).unwrap();
        // Idempotent for the same participant
        slots.bind(SlotIndex(0), &p1).unwrap();

        let err = slots.bind(SlotIndex(0), &p2).unwrap_err();
        assert_eq!(
            err,
            SlotError::Occupied {
                slot: 0,
                occupant: "p1".to_string()
            }
        );
        assert_eq!(slots.occupant(SlotIndex(0)), Some(&p1));
    }

    #[test]
    fn test_bind_rejects_second_slot_for_same_participant() {
        let mut slots = registry();
        let p1 = ParticipantId::new("p1");

        slots.bind(SlotIndex(0), &p1).unwrap();
        let err = slots.bind(SlotIndex(1), &p1).unwrap_err();
        assert!(matches!(err, SlotError::ParticipantBound { slot: 0, .. }));
        assert_eq!(slots.occupant(SlotIndex(1)), None);
    }

    #[test]
    fn test_bind_out_of_range() {
        let mut slots = registry();
        let err = slots.bind(SlotIndex(4), &ParticipantId::new("p1")).unwrap_err();
        assert_eq!(err, SlotError::OutOfRange { slot: 4, count: 4 });
    }

    #[test]
    fn test_unbind_returns_occupant() {
        let mut slots = registry();
        let p1 = ParticipantId::new("p1");
        slots.bind(SlotIndex(1), &p1).unwrap();

        assert_eq!(slots.find_slot_by_participant(&p1), Some(SlotIndex(1)));
        assert_eq!(slots.unbind(SlotIndex(1)), Some(p1.clone()));
        assert_eq!(slots.unbind(SlotIndex(1)), None);
        assert_eq!(slots.find_slot_by_participant(&p1), None);
        assert_eq!(slots.unbind(SlotIndex(99)), None);
    }

    #[test]
    fn test_rename_keeps_binding() {
        let mut slots = registry();
        let p1 = ParticipantId::new("p1");
        slots.bind(SlotIndex(0), &p1).unwrap();

        let previous = slots.rename(SlotIndex(0), "Gamma").unwrap();
        assert_eq!(previous, "alpha");
        assert_eq!(slots.get(SlotIndex(0)).unwrap().name(), "gamma");
        assert_eq!(slots.occupant(SlotIndex(0)), Some(&p1));
        // The duplicate "alpha" at index 3 is now the first match
        assert_eq!(slots.find_slot_by_name("alpha"), Some(SlotIndex(3)));
    }

    #[test]
    fn test_set_volume_clamps() {
        let mut slots = registry();
        assert!((slots.set_volume(SlotIndex(0), 1.5).unwrap() - 1.0).abs() < f32::EPSILON);
        assert!(slots.set_volume(SlotIndex(0), -0.2).unwrap().abs() < f32::EPSILON);
        assert!(slots.set_volume(SlotIndex(7), 0.5).is_err());
    }

    #[test]
    fn test_bound_participants_and_clear() {
        let mut slots = registry();
        let p1 = ParticipantId::new("p1");
        let p2 = ParticipantId::new("p2");
        slots.bind(SlotIndex(3), &p1).unwrap();
        slots.bind(SlotIndex(1), &p2).unwrap();

        assert_eq!(slots.bound_participants(), vec![p2.clone(), p1.clone()]);

        let cleared = slots.clear_bindings();
        assert_eq!(cleared, vec![(SlotIndex(1), p2), (SlotIndex(3), p1)]);
        assert!(slots.bound_participants().is_empty());
    }

    #[test]
    fn test_volume_label_rounds() {
        assert_eq!(volume_label(0.7), "70%");
        assert_eq!(volume_label(64.0 / 127.0), "50%");
        assert_eq!(volume_label(1.0), "100%");
        assert_eq!(volume_label(0.0), "0%");
    }
}
