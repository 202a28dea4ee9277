//! # Money
//!
//! Amounts live in the currency's minor unit (cents for USD, whole yen for
//! JPY). Decimal values only appear at the edges: request bodies, the
//! product catalog and log output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store currency, serialized as its lowercase ISO 4217 code
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
}

/// code, symbol, minor-unit exponent
type CurrencyInfo = (&'static str, &'static str, u32);

impl Currency {
    const ALL: [Currency; 6] = [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::JPY,
        Currency::CAD,
        Currency::AUD,
    ];

    const fn info(self) -> CurrencyInfo {
        match self {
            Currency::USD => ("usd", "$", 2),
            Currency::EUR => ("eur", "€", 2),
            Currency::GBP => ("gbp", "£", 2),
            Currency::JPY => ("jpy", "¥", 0),
            Currency::CAD => ("cad", "C$", 2),
            Currency::AUD => ("aud", "A$", 2),
        }
    }

    /// Lowercase code, as the payment gateway expects it
    pub fn as_str(&self) -> &'static str {
        self.info().0
    }

    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    fn scale(self) -> f64 {
        10_f64.powi(self.info().2 as i32)
    }

    /// Decimal amount to minor units, rounded half away from zero
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        (amount * self.scale()).round() as i64
    }

    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        amount as f64 / self.scale()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// An amount in minor units tagged with its currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount: i64,
    pub currency: Currency,
}

impl Price {
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self::from_cents(currency.to_smallest_unit(amount), currency)
    }

    pub fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::from_cents(0, currency)
    }

    /// Line total for `quantity` units; `None` on overflow
    pub fn checked_times(&self, quantity: u32) -> Option<Self> {
        self.amount
            .checked_mul(i64::from(quantity))
            .map(|amount| Self::from_cents(amount, self.currency))
    }

    /// Sum of two amounts; `None` on overflow
    pub fn checked_add(&self, other: Price) -> Option<Self> {
        self.amount
            .checked_add(other.amount)
            .map(|amount| Self::from_cents(amount, self.currency))
    }

    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Human-readable form for logs and messages, e.g. `$12.50`
    pub fn display(&self) -> String {
        let (_, symbol, exponent) = self.currency.info();
        format!(
            "{}{:.*}",
            symbol,
            exponent as usize,
            self.as_decimal()
        )
    }
}
