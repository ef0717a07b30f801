//! The per-read event totals tuple.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::Serialize;

/// One of the eight summed event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Total {
    DamageOut,
    DamageIn,
    LogisticsOut,
    LogisticsIn,
    CapTransferredOut,
    CapReceivedIn,
    CapDamageDone,
    CapDamageReceived,
}

impl Total {
    /// All categories in tuple order.
    pub const ALL: [Total; 8] = [
        Total::DamageOut,
        Total::DamageIn,
        Total::LogisticsOut,
        Total::LogisticsIn,
        Total::CapTransferredOut,
        Total::CapReceivedIn,
        Total::CapDamageDone,
        Total::CapDamageReceived,
    ];
}

/// Summed magnitudes of every combat event found in one delta block.
///
/// Values are recomputed on every read and carry no history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTotals {
    pub damage_out: u64,
    pub damage_in: u64,
    pub logistics_out: u64,
    pub logistics_in: u64,
    pub cap_transferred_out: u64,
    pub cap_received_in: u64,
    pub cap_damage_done: u64,
    pub cap_damage_received: u64,
}

impl EventTotals {
    /// The all-zero tuple.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Whether every category is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Value of a single category.
    #[must_use]
    pub fn get(&self, total: Total) -> u64 {
        match total {
            Total::DamageOut => self.damage_out,
            Total::DamageIn => self.damage_in,
            Total::LogisticsOut => self.logistics_out,
            Total::LogisticsIn => self.logistics_in,
            Total::CapTransferredOut => self.cap_transferred_out,
            Total::CapReceivedIn => self.cap_received_in,
            Total::CapDamageDone => self.cap_damage_done,
            Total::CapDamageReceived => self.cap_damage_received,
        }
    }

    /// Add `amount` to a single category, saturating at `u64::MAX`.
    pub fn credit(&mut self, total: Total, amount: u64) {
        let slot = match total {
            Total::DamageOut => &mut self.damage_out,
            Total::DamageIn => &mut self.damage_in,
            Total::LogisticsOut => &mut self.logistics_out,
            Total::LogisticsIn => &mut self.logistics_in,
            Total::CapTransferredOut => &mut self.cap_transferred_out,
            Total::CapReceivedIn => &mut self.cap_received_in,
            Total::CapDamageDone => &mut self.cap_damage_done,
            Total::CapDamageReceived => &mut self.cap_damage_received,
        };
        *slot = slot.saturating_add(amount);
    }

    /// The eight values in tuple order.
    #[must_use]
    pub fn as_array(&self) -> [u64; 8] {
        Total::ALL.map(|t| self.get(t))
    }
}

impl AddAssign for EventTotals {
    fn add_assign(&mut self, rhs: Self) {
        for total in Total::ALL {
            self.credit(total, rhs.get(total));
        }
    }
}

impl Add for EventTotals {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sum for EventTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_zero() {
        assert!(EventTotals::zero().is_zero());
        assert_eq!(EventTotals::zero().as_array(), [0; 8]);
    }

    #[test]
    fn test_credit_and_get() {
        let mut totals = EventTotals::zero();
        totals.credit(Total::LogisticsIn, 40);
        totals.credit(Total::LogisticsIn, 2);
        assert_eq!(totals.get(Total::LogisticsIn), 42);
        assert!(!totals.is_zero());
    }

    #[test]
    fn test_credit_saturates() {
        let mut totals = EventTotals::zero();
        totals.credit(Total::DamageOut, u64::MAX);
        totals.credit(Total::DamageOut, 1);
        assert_eq!(totals.damage_out, u64::MAX);
    }

    #[test]
    fn test_add_is_fieldwise() {
        let a = EventTotals {
            damage_out: 1,
            cap_damage_received: 7,
            ..EventTotals::zero()
        };
        let b = EventTotals {
            damage_out: 2,
            damage_in: 3,
            ..EventTotals::zero()
        };
        let sum = a + b;
        assert_eq!(sum.as_array(), [3, 3, 0, 0, 0, 0, 0, 7]);
        assert_eq!([a, b].into_iter().sum::<EventTotals>(), sum);
    }

    #[test]
    fn test_serialize_camel_case() {
        let json = serde_json::to_string(&EventTotals::zero()).unwrap();
        assert!(json.contains("\"damageOut\":0"));
        assert!(json.contains("\"capDamageReceived\":0"));
    }
}
