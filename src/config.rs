//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has sensible defaults so the engine can run with no
//! config file at all (fresh bankroll of 100, cashout factor 0.70,
//! state file in the working directory).

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::engine::cashout::DEFAULT_CASHOUT_FACTOR;
use crate::ledger::DEFAULT_INITIAL_BALANCE;

/// Default state file path.
pub const DEFAULT_STORE_PATH: &str = "hedgebook_state.json";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bankroll: BankrollConfig,
    pub cashout: CashoutConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BankrollConfig {
    /// Starting balance when no persisted bankroll exists.
    pub initial_balance: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CashoutConfig {
    /// Haircut applied to live leg value when pricing a cashout.
    pub factor: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bankroll: BankrollConfig::default(),
            cashout: CashoutConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            initial_balance: DEFAULT_INITIAL_BALANCE,
        }
    }
}

impl Default for CashoutConfig {
    fn default() -> Self {
        Self {
            factor: DEFAULT_CASHOUT_FACTOR,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORE_PATH.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from the given path, falling back to defaults when the file
    /// does not exist. A present-but-malformed file is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.bankroll.initial_balance, dec!(100));
        assert_eq!(cfg.cashout.factor, dec!(0.70));
        assert_eq!(cfg.storage.path, DEFAULT_STORE_PATH);
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [bankroll]
            initial_balance = 250.0

            [cashout]
            factor = 0.65
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bankroll.initial_balance, dec!(250));
        assert_eq!(cfg.cashout.factor, dec!(0.65));
        // Omitted section falls back to default.
        assert_eq!(cfg.storage.path, DEFAULT_STORE_PATH);
    }

    #[test]
    fn test_parse_empty_toml_is_all_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.bankroll.initial_balance, dec!(100));
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let cfg = AppConfig::load_or_default("/tmp/hedgebook_no_such_config.toml").unwrap();
        assert_eq!(cfg.cashout.factor, dec!(0.70));
    }
}
