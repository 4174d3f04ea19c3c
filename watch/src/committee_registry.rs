//! Remembers committee membership so that attestations can be correlated with the validators that
//! were expected to produce them.
use log::debug;
use std::collections::{HashMap, HashSet};
use types::{Committee, CommitteeIndex, Slot};

/// Append-only store of committees, keyed by slot.
///
/// Registering the same committee twice stores a duplicate. Lookups return the first match, so
/// duplicates never change the answer.
#[derive(Debug, Default)]
pub struct CommitteeRegistry {
    committees: HashMap<Slot, Vec<Committee>>,
}

impl CommitteeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, committees: Vec<Committee>) {
        let mut seen_slots = HashSet::new();

        for committee in committees {
            if seen_slots.insert(committee.slot) {
                debug!(
                    "Registering committee info for slot {} (first index {})",
                    committee.slot, committee.index
                );
            }
            self.committees
                .entry(committee.slot)
                .or_default()
                .push(committee);
        }
    }

    /// Returns `true` if any committee is known for `slot`.
    pub fn is_known(&self, slot: Slot) -> bool {
        self.committees
            .get(&slot)
            .map_or(false, |committees| !committees.is_empty())
    }

    /// Returns the committee with `index` at `slot`, if it is known.
    pub fn get(&self, slot: Slot, index: CommitteeIndex) -> Option<&Committee> {
        self.committees
            .get(&slot)?
            .iter()
            .find(|committee| committee.index == index)
    }

    /// The number of slots with at least one known committee.
    pub fn num_slots(&self) -> usize {
        self.committees.len()
    }
}
