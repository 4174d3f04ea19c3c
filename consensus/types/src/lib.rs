//! Types for observing attestation inclusion on an Ethereum consensus chain.
//!
//! Only the subset of the beacon chain data structures required to correlate committees with
//! attestations is defined here. Fields of the beacon API JSON that are not listed are ignored
//! during deserialization.

pub mod aggregation_bits;
pub mod attestation;
pub mod beacon_block;
pub mod committee;
pub mod consts;
pub mod quoted;
pub mod slot_epoch;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use crate::aggregation_bits::{AggregationBits, Error as AggregationBitsError};
pub use crate::attestation::{Attestation, AttestationData};
pub use crate::beacon_block::{BeaconBlock, BeaconBlockBody, GenesisData, SignedBeaconBlock};
pub use crate::committee::Committee;
pub use crate::consts::SLOTS_PER_EPOCH;
pub use crate::slot_epoch::{Epoch, Slot};

pub type CommitteeIndex = u64;
pub type ValidatorIndex = u64;
