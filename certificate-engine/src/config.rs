//! Configuration for certificate calculation and the ledger

use crate::engine::{check_rate, DEFAULT_RETENTION_RATE, DEFAULT_VAT_RATE};
use crate::types::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Certificate configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Rate and currency defaults
    pub rates: RatesConfig,

    /// Ledger behaviour
    pub ledger: LedgerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "payment-certificates".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rates: RatesConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

/// Rate configuration (fractions, not percentages)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// VAT rate for drafts started with `CertificateLedger::draft`
    pub vat_rate: Decimal,

    /// Retention withheld on cumulative work value
    pub retention_rate: Decimal,

    /// Currency for drafts on projects without a currency of record
    pub default_currency: CurrencyCode,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            vat_rate: DEFAULT_VAT_RATE,             // 15%
            retention_rate: DEFAULT_RETENTION_RATE, // 10%
            default_currency: CurrencyCode::USD,
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Log a warning when a certificate's currency differs from the
    /// project's currency of record
    pub warn_on_currency_mismatch: bool,

    /// Log a warning when cumulative claims exceed the tender sum
    pub warn_on_tender_overrun: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            warn_on_currency_mismatch: true,
            warn_on_tender_overrun: true,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(rate) = std::env::var("CERT_VAT_RATE") {
            config.rates.vat_rate = parse_rate("CERT_VAT_RATE", &rate)?;
        }

        if let Ok(rate) = std::env::var("CERT_RETENTION_RATE") {
            config.rates.retention_rate = parse_rate("CERT_RETENTION_RATE", &rate)?;
        }

        if let Ok(code) = std::env::var("CERT_DEFAULT_CURRENCY") {
            config.rates.default_currency = CurrencyCode::parse(&code)
                .map_err(|e| crate::Error::Config(format!("CERT_DEFAULT_CURRENCY: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check rates lie in `[0, 1]`
    pub fn validate(&self) -> crate::Result<()> {
        check_rate("vat_rate", self.rates.vat_rate)
            .and_then(|_| check_rate("retention_rate", self.rates.retention_rate))
            .map_err(|e| crate::Error::Config(e.to_string()))
    }
}

fn parse_rate(var: &str, value: &str) -> crate::Result<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|e| crate::Error::Config(format!("{}: {}", var, e)))
}
