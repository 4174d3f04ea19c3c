//! Correlates attestations with committees to find which validators attested, and when.
use crate::activity_tracker::ActivityTracker;
use crate::committee_registry::CommitteeRegistry;
use crate::source::ChainSource;
use log::{debug, error};
use types::{Attestation, CommitteeIndex, Epoch, Slot, ValidatorIndex};

/// Failure to correlate an attestation.
///
/// Every variant means the committees we hold cannot explain the chain. None are recoverable.
#[derive(Debug)]
pub enum Error {
    BeaconNode(eth2::Error),
    /// The beacon node had no committees for the request.
    CommitteesNotFound {
        epoch: Option<Epoch>,
        slot: Option<Slot>,
    },
    /// No committee with `index` is known at `slot`.
    UnknownCommittee { slot: Slot, index: CommitteeIndex },
    /// The aggregation bitfield does not have one bit per committee member.
    AggregationBitsLength {
        slot: Slot,
        index: CommitteeIndex,
        committee_len: usize,
        bits_len: usize,
    },
}

impl From<eth2::Error> for Error {
    fn from(e: eth2::Error) -> Self {
        Error::BeaconNode(e)
    }
}

/// Owns all committee and activity state. Mutated only from the fetch loop.
pub struct Correlator {
    slots_per_epoch: u64,
    registry: CommitteeRegistry,
    tracker: ActivityTracker,
}

impl Correlator {
    pub fn new(slots_per_epoch: u64) -> Self {
        Self {
            slots_per_epoch,
            registry: CommitteeRegistry::new(),
            tracker: ActivityTracker::new(slots_per_epoch),
        }
    }

    /// Make sure the committees for the duty slot of every attestation are known.
    ///
    /// Committees for the current epoch are fetched first. If that does not cover the duty slot
    /// (e.g. the attestation refers to the previous epoch) the committees of that specific slot
    /// are fetched.
    pub async fn ensure_committees_loaded<S: ChainSource>(
        &mut self,
        source: &S,
        attestations: &[Attestation],
    ) -> Result<(), Error> {
        for attestation in attestations {
            let duty_slot = attestation.duty_slot();
            if self.registry.is_known(duty_slot) {
                continue;
            }

            debug!(
                "Missing committee info for attested slot {}, fetching current epoch",
                duty_slot
            );
            self.load_committees(source, None, None).await?;

            if !self.registry.is_known(duty_slot) {
                debug!("Fetching committees specifically for slot {}", duty_slot);
                let epoch = duty_slot.epoch(self.slots_per_epoch);
                self.load_committees(source, Some(epoch), Some(duty_slot))
                    .await?;
            }
        }

        Ok(())
    }

    async fn load_committees<S: ChainSource>(
        &mut self,
        source: &S,
        epoch: Option<Epoch>,
        slot: Option<Slot>,
    ) -> Result<(), Error> {
        let committees = source
            .get_committees(epoch, slot)
            .await?
            .ok_or(Error::CommitteesNotFound { epoch, slot })?;
        self.registry.register(committees);
        Ok(())
    }

    /// Determine, for each member of the attesting committee, whether they took part.
    pub fn correlate(
        &self,
        attestation: &Attestation,
    ) -> Result<Vec<(ValidatorIndex, bool)>, Error> {
        let slot = attestation.duty_slot();
        let index = attestation.committee_index();

        let committee = self.registry.get(slot, index).ok_or_else(|| {
            error!(
                "No committee found for attestation (committee {}, slot {})",
                index, slot
            );
            Error::UnknownCommittee { slot, index }
        })?;

        let bits = &attestation.aggregation_bits;
        if bits.len() != committee.validators.len() {
            error!(
                "Attestation does not match committee (committee {}, slot {}, {} members, {} bits)",
                index,
                slot,
                committee.validators.len(),
                bits.len()
            );
            return Err(Error::AggregationBitsLength {
                slot,
                index,
                committee_len: committee.validators.len(),
                bits_len: bits.len(),
            });
        }

        debug!(
            "Attestation for slot {} (committee {}): {}/{} members participated",
            slot,
            index,
            bits.num_set_bits(),
            bits.len()
        );

        Ok(committee
            .validators
            .iter()
            .copied()
            .zip(bits.iter())
            .collect())
    }

    /// Process all the attestations included in the block at `block_slot`.
    pub fn handle_attestations(
        &mut self,
        attestations: &[Attestation],
        block_slot: Slot,
    ) -> Result<(), Error> {
        self.tracker.register_new_block(block_slot);

        for attestation in attestations {
            for (validator, present) in self.correlate(attestation)? {
                self.tracker.register_presence(
                    validator,
                    attestation.duty_slot(),
                    block_slot,
                    present,
                );
            }
        }

        Ok(())
    }

    pub fn registry(&self) -> &CommitteeRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }
}
