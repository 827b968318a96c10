//! Money type
//!
//! Domain primitive for monetary values. Every value carries exactly two
//! decimal places; anything finer is rounded half-up (midpoint away from
//! zero) at construction, so no floating-point drift can enter a balance.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use super::rate::Rate;

/// Number of decimal places carried by every monetary value
pub const MONEY_SCALE: u32 = 2;

/// Rounding applied whenever a value crosses into `Money`
pub const MONEY_ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// Money represents a signed, normalized monetary value.
///
/// # Invariants
/// - Scale is always exactly 2
/// - Sign is unrestricted (ledger debits are negative)
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use wallet_ledger::domain::Money;
///
/// let money = Money::new(Decimal::new(10005, 3)); // 10.005
/// assert_eq!(money.to_string(), "10.01");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Money(Decimal);

/// Errors that can occur when building or combining Money
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Invalid amount format: {0}")]
    ParseError(String),

    #[error("Amount is not a finite number")]
    NotFinite,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl Money {
    /// Create Money from a decimal, rounding half-up to two places.
    pub fn new(value: Decimal) -> Self {
        let mut normalized = value.round_dp_with_strategy(MONEY_SCALE, MONEY_ROUNDING);
        normalized.rescale(MONEY_SCALE);
        Self(normalized)
    }

    /// Zero in any currency.
    pub fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    /// Create Money from a binary float.
    ///
    /// # Errors
    /// - `MoneyError::NotFinite` for NaN and infinities
    pub fn from_f64(value: f64) -> Result<Self, MoneyError> {
        if !value.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        Decimal::from_f64(value)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(&self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Money::new)
            .ok_or(MoneyError::Overflow)
    }

    pub fn checked_sub(&self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Money::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Convert by a rate: multiply at full precision, then round the result once.
    pub fn convert(&self, rate: &Rate) -> Result<Money, MoneyError> {
        self.0
            .checked_mul(rate.value())
            .map(Money::new)
            .ok_or(MoneyError::Overflow)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        if self.0.is_zero() {
            return self;
        }
        Money(-self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money::new(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map_err(|e| MoneyError::ParseError(e.to_string()))?;
        Ok(Money::new(decimal))
    }
}

impl TryFrom<String> for Money {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Money::from_str(&value)
    }
}

impl From<Money> for String {
    fn from(money: Money) -> Self {
        money.to_string()
    }
}
