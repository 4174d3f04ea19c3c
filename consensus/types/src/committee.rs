use crate::{CommitteeIndex, Slot, ValidatorIndex};
use serde::{Deserialize, Serialize};

/// A beacon committee: the ordered set of validators assigned to attest at `slot`.
///
/// The order of `validators` is significant; position `i` corresponds to bit `i` of the
/// aggregation bitfield of any attestation produced by this committee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committee {
    #[serde(with = "crate::quoted::quoted_u64")]
    pub index: CommitteeIndex,
    pub slot: Slot,
    #[serde(with = "crate::quoted::quoted_u64_vec")]
    pub validators: Vec<ValidatorIndex>,
}
