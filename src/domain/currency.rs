use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ngn,
    Usd,
    Eur,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Ngn, Currency::Usd, Currency::Eur];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Currency::Ngn),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(LedgerError::Input(format!("unknown currency '{other}'"))),
        }
    }
}

/// What to do when the rate table has no entry for a currency pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingRatePolicy {
    /// Treat the pair as 1:1 and log a warning.
    #[default]
    Identity,
    /// Refuse the conversion with `UnsupportedConversion`.
    Reject,
}

/// Fixed exchange rates, keyed by source then target currency.
///
/// Rates are directional: `USD -> NGN` and `NGN -> USD` are independent entries and need not be
/// reciprocal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable(HashMap<Currency, HashMap<Currency, Decimal>>);

impl RateTable {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.0.entry(from).or_default().insert(to, rate);
        self
    }

    pub fn rate(&self, from: Currency, to: Currency) -> Option<Decimal> {
        self.0.get(&from).and_then(|targets| targets.get(&to)).copied()
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::empty()
            .with_rate(Currency::Ngn, Currency::Usd, dec!(0.0012))
            .with_rate(Currency::Ngn, Currency::Eur, dec!(0.0011))
            .with_rate(Currency::Usd, Currency::Ngn, dec!(840))
            .with_rate(Currency::Usd, Currency::Eur, dec!(0.91))
            .with_rate(Currency::Eur, Currency::Ngn, dec!(910))
            .with_rate(Currency::Eur, Currency::Usd, dec!(1.1))
    }
}

/// Pure currency conversion over a static [`RateTable`].
#[derive(Debug, Clone, Default)]
pub struct CurrencyConverter {
    rates: RateTable,
    policy: MissingRatePolicy,
}

impl CurrencyConverter {
    pub fn new(rates: RateTable, policy: MissingRatePolicy) -> Self {
        Self { rates, policy }
    }

    /// Converts `amount` from one currency to another.
    ///
    /// Same-currency conversion returns `amount` untouched. A pair missing from the table is
    /// converted at 1:1 regardless of the configured policy; use [`Self::try_convert`] to
    /// honor it. An amount whose converted value does not fit a `Decimal` is `InvalidAmount`.
    pub fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Decimal> {
        if from == to {
            return Ok(amount);
        }
        match self.rates.rate(from, to) {
            Some(rate) => amount
                .checked_mul(rate)
                .ok_or(LedgerError::InvalidAmount(amount)),
            None => {
                warn!(%from, %to, "no exchange rate defined, converting at 1:1");
                Ok(amount)
            }
        }
    }

    pub fn try_convert(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Decimal> {
        if from != to
            && self.policy == MissingRatePolicy::Reject
            && self.rates.rate(from, to).is_none()
        {
            return Err(LedgerError::UnsupportedConversion { from, to });
        }
        self.convert(amount, from, to)
    }
}
