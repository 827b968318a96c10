//! Exchange rates
//!
//! Rate lookup is behind the `RateProvider` trait so the engine never holds
//! rate literals and tests can inject their own.

use rust_decimal::Decimal;

use super::Currency;

/// A strictly positive conversion factor from one currency into another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error("Rate must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("No rate available for {from} -> {to}")]
    Unsupported { from: Currency, to: Currency },

    #[error("Rate arithmetic overflow")]
    Overflow,
}

impl Rate {
    pub fn new(value: Decimal) -> Result<Self, RateError> {
        if value <= Decimal::ZERO {
            return Err(RateError::NotPositive(value));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Exact reciprocal at full decimal precision. Never rounded to money scale.
    pub fn inverse(&self) -> Result<Rate, RateError> {
        Decimal::ONE
            .checked_div(self.0)
            .map(Rate)
            .ok_or(RateError::Overflow)
    }
}

/// Source of rates for an ordered currency pair.
pub trait RateProvider: Send + Sync {
    /// Rate converting one unit of `from` into `to`.
    fn rate(&self, from: Currency, to: Currency) -> Result<Rate, RateError>;
}

/// A single fixed directional rate; the opposite direction uses its reciprocal.
#[derive(Debug, Clone)]
pub struct FixedRateProvider {
    base: Currency,
    quote: Currency,
    rate: Rate,
}

impl FixedRateProvider {
    /// One unit of `base` buys `rate` units of `quote`.
    pub fn new(base: Currency, quote: Currency, rate: Rate) -> Self {
        Self { base, quote, rate }
    }

    /// USD -> EUR at the given rate.
    pub fn usd_eur(rate: Rate) -> Self {
        Self::new(Currency::Usd, Currency::Eur, rate)
    }
}

impl RateProvider for FixedRateProvider {
    fn rate(&self, from: Currency, to: Currency) -> Result<Rate, RateError> {
        if from == self.base && to == self.quote {
            Ok(self.rate)
        } else if from == self.quote && to == self.base {
            self.rate.inverse()
        } else {
            Err(RateError::Unsupported { from, to })
        }
    }
}
