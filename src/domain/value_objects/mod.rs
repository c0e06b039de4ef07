//! Value Objects for pricing

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::PricingError;

/// Rounds an amount to cents, midpoint away from zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn usd(amount: Decimal) -> Self { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_negative(&self) -> bool { self.amount.is_sign_negative() && !self.amount.is_zero() }
    pub fn add(&self, other: &Money) -> Result<Money, PricingError> {
        if self.currency != other.currency { return Err(PricingError::CurrencyMismatch); }
        let amount = self.amount.checked_add(other.amount).ok_or_else(|| PricingError::InvalidInput(format!("{self} + {other} overflows")))?;
        Ok(Money::new(amount, &self.currency))
    }
    pub fn multiply(&self, qty: Quantity) -> Result<Money, PricingError> {
        let amount = self.amount.checked_mul(Decimal::from(qty.value())).ok_or_else(|| PricingError::InvalidInput(format!("{self} x {qty} overflows")))?;
        Ok(Money::new(amount, &self.currency))
    }
    pub fn with_amount(&self, amount: Decimal) -> Money { Money::new(amount, &self.currency) }
    pub fn rounded(&self) -> Money { Money::new(round_cents(self.amount), &self.currency) }
}

impl Default for Money { fn default() -> Self { Self::zero("USD") } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", round_cents(self.amount), self.currency) }
}

/// Purchase quantity. Never below one: absent, zero and negative requests
/// all price as a single unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Self { Self(value.max(1)) }
    pub fn normalized(requested: Option<i64>) -> Self {
        match requested {
            Some(q) if q > i64::from(u32::MAX) => Self(u32::MAX),
            Some(q) if q >= 1 => Self(q as u32),
            _ => Self::ONE,
        }
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

impl From<i64> for Quantity { fn from(q: i64) -> Self { Self::normalized(Some(q)) } }
impl From<Quantity> for u32 { fn from(q: Quantity) -> Self { q.0 } }

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
