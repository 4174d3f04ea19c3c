//! Tracks how promptly each validator's attestations were included, per epoch.
//!
//! For every `(epoch, validator)` pair the tracker keeps the best known inclusion distance, or
//! `VALIDATOR_MISSING` if the validator was seen absent from an attestation and never present.
//! Validators which were slow or missing are flagged as "interesting"; only those are reported.
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use types::{Epoch, Slot, ValidatorIndex};

/// Stored in place of an inclusion distance when a validator was absent from its committee's
/// attestation.
pub const VALIDATOR_MISSING: u64 = 65535;

/// The final state of a validator for an epoch, as handed to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorEpochRecord {
    pub validator_index: ValidatorIndex,
    pub epoch: Epoch,
    /// The inclusion distance, or `VALIDATOR_MISSING`.
    pub distance: u64,
}

impl ValidatorEpochRecord {
    pub fn is_missing(&self) -> bool {
        self.distance == VALIDATOR_MISSING
    }
}

#[derive(Debug, Default)]
pub struct ActivityTracker {
    slots_per_epoch: u64,
    /// Epoch -> validator -> inclusion distance. An absent entry means "not yet observed".
    activity: HashMap<Epoch, HashMap<ValidatorIndex, u64>>,
    interesting: HashSet<ValidatorIndex>,
    /// Incremented every time a validator is flagged, which may count a validator more than once.
    num_interesting: usize,
    first_slot_seen: Option<Slot>,
    last_slot_seen: Option<Slot>,
}

impl ActivityTracker {
    pub fn new(slots_per_epoch: u64) -> Self {
        Self {
            slots_per_epoch,
            ..Self::default()
        }
    }

    /// Record that `validator` was (or was not) part of an attestation for `duty_slot` which was
    /// included in the block at `block_slot`.
    pub fn register_presence(
        &mut self,
        validator: ValidatorIndex,
        duty_slot: Slot,
        block_slot: Slot,
        present: bool,
    ) {
        let epoch = duty_slot.epoch(self.slots_per_epoch);
        let distance = (block_slot - duty_slot).as_u64();
        let validators = self.activity.entry(epoch).or_default();
        let prev = validators.get(&validator).copied().unwrap_or(0);

        if present {
            // The inclusion distance never increases.
            if prev != 0 && distance >= prev {
                return;
            }
            validators.insert(validator, distance);

            if distance > 1 {
                self.interesting.insert(validator);
                self.num_interesting += 1;
            }

            // A validator may be absent from one aggregate and present in another for the same
            // slot within a single block. An optimal inclusion clears the earlier flag.
            if distance == 1 && self.interesting.remove(&validator) {
                self.num_interesting -= 1;
            }
        } else {
            // Known states are sticky: never downgrade a seen or missing validator.
            if prev != 0 {
                return;
            }
            validators.insert(validator, VALIDATOR_MISSING);
            self.interesting.insert(validator);
            self.num_interesting += 1;
        }
    }

    /// Record that the block at `slot` was processed.
    pub fn register_new_block(&mut self, slot: Slot) {
        if self.first_slot_seen.is_none() {
            self.first_slot_seen = Some(slot);
        }
        self.last_slot_seen = Some(slot);
    }

    /// The inclusive range of epochs which started and ended within the processed blocks.
    ///
    /// Returns `None` if no epoch was fully seen.
    pub fn fully_seen_epochs(&self) -> Option<(Epoch, Epoch)> {
        let first = self
            .first_slot_seen?
            .first_full_epoch_at_or_after(self.slots_per_epoch);
        let last = self
            .last_slot_seen?
            .last_full_epoch_before(self.slots_per_epoch)?;

        (first <= last).then_some((first, last))
    }

    /// Collect the records of interesting validators across all fully seen epochs.
    ///
    /// Records are ordered by epoch, then validator index.
    pub fn dump(&self) -> Vec<ValidatorEpochRecord> {
        let Some((first, last)) = self.fully_seen_epochs() else {
            info!(
                "No fully seen epochs to dump (first slot: {:?}, last slot: {:?})",
                self.first_slot_seen, self.last_slot_seen
            );
            return vec![];
        };

        info!(
            "Dumping {} interesting validators over epochs {}..={}",
            self.num_interesting, first, last
        );

        let mut records = vec![];
        for epoch in Epoch::range_inclusive(first, last) {
            let Some(validators) = self.activity.get(&epoch) else {
                debug!("No activity recorded for fully seen epoch {}", epoch);
                continue;
            };

            let mut epoch_records: Vec<_> = validators
                .iter()
                .filter(|(validator, _)| self.interesting.contains(validator))
                .map(|(&validator_index, &distance)| ValidatorEpochRecord {
                    validator_index,
                    epoch,
                    distance,
                })
                .collect();
            epoch_records.sort_unstable_by_key(|record| record.validator_index);
            records.append(&mut epoch_records);
        }
        records
    }

    /// The stored inclusion distance for `validator` at `epoch`, if any.
    pub fn distance(&self, epoch: Epoch, validator: ValidatorIndex) -> Option<u64> {
        self.activity.get(&epoch)?.get(&validator).copied()
    }

    pub fn is_interesting(&self, validator: ValidatorIndex) -> bool {
        self.interesting.contains(&validator)
    }

    pub fn num_interesting(&self) -> usize {
        self.num_interesting
    }

    pub fn interesting_len(&self) -> usize {
        self.interesting.len()
    }

    pub fn first_slot_seen(&self) -> Option<Slot> {
        self.first_slot_seen
    }

    pub fn last_slot_seen(&self) -> Option<Slot> {
        self.last_slot_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::SLOTS_PER_EPOCH;

    fn tracker() -> ActivityTracker {
        ActivityTracker::new(SLOTS_PER_EPOCH)
    }

    #[test]
    fn absence_is_sticky() {
        let mut tracker = tracker();
        let epoch = Epoch::new(3);

        tracker.register_presence(1, Slot::new(100), Slot::new(101), true);
        tracker.register_presence(1, Slot::new(100), Slot::new(102), false);
        assert_eq!(tracker.distance(epoch, 1), Some(1));

        tracker.register_presence(2, Slot::new(100), Slot::new(101), false);
        tracker.register_presence(2, Slot::new(100), Slot::new(102), false);
        assert_eq!(tracker.distance(epoch, 2), Some(VALIDATOR_MISSING));
        assert_eq!(tracker.num_interesting(), 1);
    }

    #[test]
    fn best_known_distance_wins() {
        let mut tracker = tracker();
        for block_slot in [105, 103, 104, 108, 102] {
            tracker.register_presence(7, Slot::new(100), Slot::new(block_slot), true);
        }
        assert_eq!(tracker.distance(Epoch::new(3), 7), Some(2));
    }

    #[test]
    fn present_overrides_missing() {
        let mut tracker = tracker();
        tracker.register_presence(7, Slot::new(100), Slot::new(101), false);
        assert!(tracker.is_interesting(7));

        // The sentinel is larger than any real distance, so a later inclusion replaces it.
        tracker.register_presence(7, Slot::new(100), Slot::new(101), true);
        assert_eq!(tracker.distance(Epoch::new(3), 7), Some(1));
        assert!(!tracker.is_interesting(7));
        assert_eq!(tracker.num_interesting(), 0);
    }

    #[test]
    fn optimal_inclusion_clears_flag() {
        let mut tracker = tracker();
        tracker.register_presence(3, Slot::new(100), Slot::new(103), true);
        assert!(tracker.is_interesting(3));
        assert_eq!(tracker.num_interesting(), 1);

        tracker.register_presence(3, Slot::new(100), Slot::new(101), true);
        assert_eq!(tracker.distance(Epoch::new(3), 3), Some(1));
        assert!(!tracker.is_interesting(3));
        assert_eq!(tracker.num_interesting(), 0);
        assert_eq!(tracker.num_interesting(), tracker.interesting_len());
    }

    #[test]
    fn counter_matches_set_for_distinct_flags() {
        let mut tracker = tracker();
        tracker.register_presence(1, Slot::new(64), Slot::new(66), true);
        tracker.register_presence(2, Slot::new(64), Slot::new(65), false);
        tracker.register_presence(3, Slot::new(64), Slot::new(65), true);
        tracker.register_presence(1, Slot::new(64), Slot::new(65), true);
        assert_eq!(tracker.num_interesting(), tracker.interesting_len());
        assert_eq!(tracker.interesting_len(), 1);
    }

    /// Known discrepancy: re-flagging an already interesting validator increments the counter
    /// again, so the counter can exceed the size of the interesting set.
    #[test]
    fn counter_diverges_on_repeated_flags() {
        let mut tracker = tracker();
        tracker.register_presence(9, Slot::new(100), Slot::new(105), true);
        tracker.register_presence(9, Slot::new(100), Slot::new(103), true);
        assert_eq!(tracker.distance(Epoch::new(3), 9), Some(3));
        assert_eq!(tracker.interesting_len(), 1);
        assert_eq!(tracker.num_interesting(), 2);

        // Clearing the flag only removes one count.
        tracker.register_presence(9, Slot::new(100), Slot::new(101), true);
        assert_eq!(tracker.interesting_len(), 0);
        assert_eq!(tracker.num_interesting(), 1);
    }

    #[test]
    fn first_and_last_slot_seen() {
        let mut tracker = tracker();
        assert_eq!(tracker.fully_seen_epochs(), None);

        tracker.register_new_block(Slot::new(32));
        tracker.register_new_block(Slot::new(40));
        tracker.register_new_block(Slot::new(95));
        assert_eq!(tracker.first_slot_seen(), Some(Slot::new(32)));
        assert_eq!(tracker.last_slot_seen(), Some(Slot::new(95)));
        assert_eq!(
            tracker.fully_seen_epochs(),
            Some((Epoch::new(1), Epoch::new(1)))
        );
    }

    #[test]
    fn partial_epochs_are_not_fully_seen() {
        let mut tracker = tracker();
        tracker.register_new_block(Slot::new(33));
        tracker.register_new_block(Slot::new(95));
        assert_eq!(tracker.fully_seen_epochs(), None);
        assert!(tracker.dump().is_empty());
    }

    #[test]
    fn dump_only_interesting_in_fully_seen_epochs() {
        let mut tracker = tracker();
        tracker.register_new_block(Slot::new(64));

        // Epoch 2: validator 5 optimal, 9 missing, 42 slow.
        tracker.register_presence(5, Slot::new(64), Slot::new(65), true);
        tracker.register_presence(9, Slot::new(64), Slot::new(65), false);
        tracker.register_presence(42, Slot::new(64), Slot::new(68), true);

        // Epoch 4 is the epoch of the last block and is never reported.
        tracker.register_presence(77, Slot::new(130), Slot::new(131), false);
        tracker.register_new_block(Slot::new(131));

        let records = tracker.dump();
        assert_eq!(
            records,
            vec![
                ValidatorEpochRecord {
                    validator_index: 9,
                    epoch: Epoch::new(2),
                    distance: VALIDATOR_MISSING,
                },
                ValidatorEpochRecord {
                    validator_index: 42,
                    epoch: Epoch::new(2),
                    distance: 4,
                },
            ]
        );
        assert!(records[0].is_missing());
    }

    #[test]
    fn interesting_flag_is_not_per_epoch() {
        let mut tracker = tracker();
        tracker.register_new_block(Slot::new(32));
        tracker.register_presence(8, Slot::new(32), Slot::new(33), true);
        tracker.register_presence(8, Slot::new(64), Slot::new(66), true);
        tracker.register_new_block(Slot::new(96));

        // The slow inclusion in epoch 2 flags the validator, so its optimal epoch 1 record is
        // also reported.
        let records = tracker.dump();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].epoch, Epoch::new(1));
        assert_eq!(records[0].distance, 1);
    }
}
