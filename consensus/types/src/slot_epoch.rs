//! The `Slot` and `Epoch` types are defined as new types over u64 to enforce type-safety between
//! the two types.
//!
//! `Slot` and `Epoch` have implementations which permit conversion, comparison and math operations
//! between each and `u64`, however specifically not between each other.
//!
//! All math operations on `Slot` and `Epoch` are saturating, they never wrap.
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Rem, Sub, SubAssign};

#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(#[serde(with = "crate::quoted::quoted_u64")] u64);

#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(#[serde(with = "crate::quoted::quoted_u64")] u64);

macro_rules! impl_from_into_u64 {
    ($main: ident) => {
        impl From<u64> for $main {
            fn from(n: u64) -> $main {
                $main(n)
            }
        }

        impl From<$main> for u64 {
            fn from(from: $main) -> u64 {
                from.0
            }
        }

        impl $main {
            pub const fn new(n: u64) -> $main {
                $main(n)
            }

            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }
    };
}

macro_rules! impl_math_between {
    ($main: ident, $other: ident) => {
        impl Add<$other> for $main {
            type Output = $main;

            fn add(self, other: $other) -> $main {
                $main::from(self.0.saturating_add(u64::from(other)))
            }
        }

        impl AddAssign<$other> for $main {
            fn add_assign(&mut self, other: $other) {
                self.0 = self.0.saturating_add(u64::from(other));
            }
        }

        impl Sub<$other> for $main {
            type Output = $main;

            fn sub(self, other: $other) -> $main {
                $main::from(self.0.saturating_sub(u64::from(other)))
            }
        }

        impl SubAssign<$other> for $main {
            fn sub_assign(&mut self, other: $other) {
                self.0 = self.0.saturating_sub(u64::from(other));
            }
        }

        impl Rem<$other> for $main {
            type Output = $main;

            fn rem(self, modulus: $other) -> $main {
                $main::from(self.0 % u64::from(modulus))
            }
        }
    };
}

macro_rules! impl_cmp_u64 {
    ($main: ident) => {
        impl PartialEq<u64> for $main {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<u64> for $main {
            fn partial_cmp(&self, other: &u64) -> Option<Ordering> {
                Some(self.0.cmp(other))
            }
        }
    };
}

macro_rules! impl_display {
    ($type: ident) => {
        impl fmt::Display for $type {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_from_into_u64!(Slot);
impl_math_between!(Slot, Slot);
impl_math_between!(Slot, u64);
impl_cmp_u64!(Slot);
impl_display!(Slot);

impl_from_into_u64!(Epoch);
impl_math_between!(Epoch, Epoch);
impl_math_between!(Epoch, u64);
impl_cmp_u64!(Epoch);
impl_display!(Epoch);

impl Slot {
    pub fn epoch(self, slots_per_epoch: u64) -> Epoch {
        Epoch::from(self.0 / slots_per_epoch)
    }

    /// Index of this slot within its epoch, in `[0, slots_per_epoch)`.
    pub fn position_in_epoch(self, slots_per_epoch: u64) -> u64 {
        self.0 - self.epoch(slots_per_epoch).start_slot(slots_per_epoch).0
    }

    /// The first epoch that starts at or after this slot.
    ///
    /// If this slot is the first slot of its epoch then that epoch is returned, otherwise the
    /// following epoch.
    pub fn first_full_epoch_at_or_after(self, slots_per_epoch: u64) -> Epoch {
        let epoch = self.epoch(slots_per_epoch);
        if self.position_in_epoch(slots_per_epoch) == 0 {
            epoch
        } else {
            epoch + 1
        }
    }

    /// The epoch before the one containing this slot.
    ///
    /// The epoch containing `self` is never returned, even when `self` is its final slot.
    /// Returns `None` for slots in epoch 0.
    pub fn last_full_epoch_before(self, slots_per_epoch: u64) -> Option<Epoch> {
        self.epoch(slots_per_epoch)
            .as_u64()
            .checked_sub(1)
            .map(Epoch::from)
    }
}

impl Epoch {
    pub fn start_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::from(self.0.saturating_mul(slots_per_epoch))
    }

    pub fn end_slot(self, slots_per_epoch: u64) -> Slot {
        Slot::from(
            self.0
                .saturating_add(1)
                .saturating_mul(slots_per_epoch)
                .saturating_sub(1),
        )
    }

    /// Iterates across all epochs in `start..=end`.
    pub fn range_inclusive(start: Epoch, end: Epoch) -> impl Iterator<Item = Epoch> {
        (start.0..=end.0).map(Epoch::from)
    }
}
