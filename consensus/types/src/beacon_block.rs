use crate::{Attestation, Slot, ValidatorIndex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlockBody {
    pub attestations: Vec<Attestation>,
}

/// A beacon block, reduced to the fields required to measure attestation inclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconBlock {
    pub slot: Slot,
    #[serde(with = "crate::quoted::quoted_u64")]
    pub proposer_index: ValidatorIndex,
    pub body: BeaconBlockBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
}

impl SignedBeaconBlock {
    pub fn slot(&self) -> Slot {
        self.message.slot
    }

    pub fn attestations(&self) -> &[Attestation] {
        &self.message.body.attestations
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisData {
    #[serde(with = "crate::quoted::quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: String,
}
