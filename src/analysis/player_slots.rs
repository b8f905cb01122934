// src/analysis/player_slots.rs
//
// Bijection between raw tracker ids and the two display slots {1, 2}.
// The lower track id always becomes slot 1, so output columns do not depend
// on the order the tracker happened to report players in.

use crate::error::{AnalysisError, AnalysisResult};
use crate::types::TrackId;

/// Display slot, 1 or 2.
pub type Slot = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSlots {
    ids: [TrackId; 2],
}

impl PlayerSlots {
    pub fn new(track_ids: &[TrackId]) -> AnalysisResult<Self> {
        let mut ids = track_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        match ids.as_slice() {
            &[a, b] if track_ids.len() == 2 => Ok(Self { ids: [a, b] }),
            _ => Err(AnalysisError::InvalidPlayerSlots(track_ids.to_vec())),
        }
    }

    pub fn slot_of(&self, id: TrackId) -> Option<Slot> {
        self.ids.iter().position(|&t| t == id).map(|i| i + 1)
    }

    pub fn track_of(&self, slot: Slot) -> Option<TrackId> {
        slot.checked_sub(1).and_then(|i| self.ids.get(i)).copied()
    }

    /// The other retained id.
    pub fn other(&self, id: TrackId) -> Option<TrackId> {
        match self.slot_of(id)? {
            1 => Some(self.ids[1]),
            _ => Some(self.ids[0]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_id_is_slot_one() {
        let slots = PlayerSlots::new(&[17, 4]).unwrap();
        assert_eq!(slots.slot_of(4), Some(1));
        assert_eq!(slots.slot_of(17), Some(2));
        assert_eq!(slots.slot_of(5), None);
        assert_eq!(slots, PlayerSlots::new(&[4, 17]).unwrap());
    }

    #[test]
    fn test_round_trip_both_directions() {
        let slots = PlayerSlots::new(&[9, 2]).unwrap();
        for slot in [1, 2] {
            let id = slots.track_of(slot).unwrap();
            assert_eq!(slots.slot_of(id), Some(slot));
        }
        assert_eq!(slots.track_of(0), None);
        assert_eq!(slots.track_of(3), None);
        assert_eq!(slots.other(2), Some(9));
        assert_eq!(slots.other(9), Some(2));
        assert_eq!(slots.other(1), None);
    }

    #[test]
    fn test_requires_two_distinct_ids() {
        assert!(matches!(
            PlayerSlots::new(&[3]),
            Err(AnalysisError::InvalidPlayerSlots(ids)) if ids == vec![3]
        ));
        assert!(PlayerSlots::new(&[3, 3]).is_err());
        assert!(PlayerSlots::new(&[1, 2, 3]).is_err());
        assert!(PlayerSlots::new(&[]).is_err());
    }
}
