use crate::domain::currency::{CurrencyConverter, MissingRatePolicy, RateTable};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime settings, read from an optional JSON file. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Deadline for client-facing transfers, in milliseconds.
    pub transfer_timeout_ms: u64,
    pub missing_rate_policy: MissingRatePolicy,
    /// Replaces the built-in rate table when present.
    pub rates: Option<RateTable>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transfer_timeout_ms: 5_000,
            missing_rate_policy: MissingRatePolicy::Identity,
            rates: None,
        }
    }
}

impl Settings {
    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(raw).map_err(|e| LedgerError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.transfer_timeout_ms == 0 {
            return Err(LedgerError::Config(
                "transfer_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    pub fn converter(&self) -> CurrencyConverter {
        CurrencyConverter::new(
            self.rates.clone().unwrap_or_default(),
            self.missing_rate_policy,
        )
    }
}
