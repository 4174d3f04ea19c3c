use crate::{AggregationBits, CommitteeIndex, Slot};
use serde::{Deserialize, Serialize};

/// The data upon which an attestation is based.
///
/// Only the duty slot and committee index are retained; votes are not inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationData {
    pub slot: Slot,
    #[serde(with = "crate::quoted::quoted_u64")]
    pub index: CommitteeIndex,
}

/// An aggregate attestation as included in a beacon block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub aggregation_bits: AggregationBits,
    pub data: AttestationData,
}

impl Attestation {
    /// The slot for which the committee members were asked to attest.
    pub fn duty_slot(&self) -> Slot {
        self.data.slot
    }

    pub fn committee_index(&self) -> CommitteeIndex {
        self.data.index
    }
}
