use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// the only currency sessions may be created in (lowercase iso code)
    pub currency: String,
    /// allowed gap between a prorated amount and its recorded days_covered
    pub proration_tolerance: Money,
    /// longest month range a single bulk application may span
    pub max_bulk_periods: u32,
    /// page size for session listings when the caller passes no limit
    pub default_session_limit: usize,
    /// processor event ids remembered for deduplication; oldest are forgotten first
    pub max_seen_events: usize,
    pub reconciliation: ReconciliationConfig,
}

/// reconciliation policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// read-then-write attempts before a stale write is surfaced
    pub max_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            proration_tolerance: Money::CENT,
            max_bulk_periods: 120,
            default_session_limit: 20,
            max_seen_events: 10_000,
            reconciliation: ReconciliationConfig::default(),
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl LedgerConfig {
    /// parse from json, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.currency = config.currency.trim().to_ascii_lowercase();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("currency must be a 3-letter code, got {:?}", self.currency),
            });
        }
        if self.proration_tolerance.as_decimal().is_sign_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: "proration_tolerance cannot be negative".to_string(),
            });
        }
        if self.max_bulk_periods == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "max_bulk_periods must be at least 1".to_string(),
            });
        }
        if self.default_session_limit == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "default_session_limit must be at least 1".to_string(),
            });
        }
        if self.max_seen_events == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "max_seen_events must be at least 1".to_string(),
            });
        }
        if self.reconciliation.max_attempts == 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "reconciliation.max_attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// case-insensitive match against the configured currency
    pub fn accepts_currency(&self, currency: &str) -> bool {
        currency.trim().eq_ignore_ascii_case(&self.currency)
    }
}
