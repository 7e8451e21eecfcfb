//! Monetary amount value object.

use serde::{Deserialize, Serialize};

use crate::error::{BankError, BankResult};

/// A strictly positive amount in the smallest currency unit.
///
/// Balances are plain `i64` fields guarded by the `balance >= 0` invariant at
/// commit time; `Amount` exists so every mutating operation has already proven
/// positivity before it reaches a balance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(value: i64) -> BankResult<Self> {
        if value <= 0 {
            return Err(BankError::invalid_amount(format!(
                "amount must be a positive integer, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Checked addition, guarding against smallest-unit overflow.
    pub fn checked_add(self, other: Amount) -> BankResult<Amount> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or_else(|| BankError::invalid_amount("amount overflow"))
    }
}

impl TryFrom<i64> for Amount {
    type Error = BankError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_negative() {
        assert!(matches!(Amount::new(0), Err(BankError::InvalidAmount(_))));
        assert!(matches!(Amount::new(-5), Err(BankError::InvalidAmount(_))));
        assert_eq!(Amount::new(1).unwrap().get(), 1);
    }

    #[test]
    fn checked_add_detects_overflow() {
        let a = Amount::new(i64::MAX).unwrap();
        let b = Amount::new(1).unwrap();
        assert!(a.checked_add(b).is_err());
    }

    #[test]
    fn serde_round_trip_enforces_positivity() {
        let ok: Amount = serde_json::from_str("250").unwrap();
        assert_eq!(ok.get(), 250);
        assert!(serde_json::from_str::<Amount>("0").is_err());
    }
}
