//! Runtime configuration, read from the environment.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::{PricingError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// JSON file holding the rule records.
    pub rules_path: PathBuf,
    /// Pins "now" so repeated runs price identically.
    pub now: Option<DateTime<Utc>>,
    pub currency: String,
}

impl Default for Config {
    fn default() -> Self {
        Self { rules_path: PathBuf::from("rules.json"), now: None, currency: "USD".to_string() }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let now = match lookup("PRICING_NOW").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw.trim())
                    .map_err(|e| PricingError::InvalidInput(format!("PRICING_NOW: {e}")))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };
        let currency = lookup("PRICING_CURRENCY").map(|c| c.trim().to_uppercase()).unwrap_or(defaults.currency);
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PricingError::InvalidInput(format!("PRICING_CURRENCY: {currency} is not an ISO 4217 code")));
        }
        Ok(Self {
            rules_path: lookup("PRICING_RULES_PATH").map(PathBuf::from).unwrap_or(defaults.rules_path),
            now,
            currency,
        })
    }

    pub fn now(&self) -> DateTime<Utc> { self.now.unwrap_or_else(Utc::now) }
}
