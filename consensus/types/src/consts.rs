/// The number of slots in an epoch.
///
/// The monitor only supports the mainnet preset.
pub const SLOTS_PER_EPOCH: u64 = 32;
