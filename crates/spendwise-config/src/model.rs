use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ConfigError;

/// Stores user-configurable preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_locale")]
    pub locale: String,
    #[serde(default = "Config::default_currency_symbol")]
    pub currency_symbol: String,
    /// Budget used until one has been saved.
    #[serde(default = "Config::default_budget_value")]
    pub default_budget: f64,
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom directory for ledger data. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// `tracing` filter directive, e.g. `spendwise=debug`.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: Self::default_locale(),
            currency_symbol: Self::default_currency_symbol(),
            default_budget: Self::default_budget_value(),
            backup_retention: Self::default_backup_retention(),
            data_dir: None,
            log_filter: None,
        }
    }
}

impl Config {
    pub fn default_locale() -> String {
        "en-IN".into()
    }

    pub fn default_currency_symbol() -> String {
        "₹".into()
    }

    pub fn default_budget_value() -> f64 {
        50_000.0
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    /// Platform data directory for SpendWise, falling back to the home dir.
    pub fn default_base_dir() -> PathBuf {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("spendwise")
    }

    /// The configured data directory, or `fallback` when none is set.
    pub fn resolve_data_dir(&self, fallback: &Path) -> PathBuf {
        match &self.data_dir {
            Some(path) => path.clone(),
            None => fallback.to_path_buf(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_budget.is_finite() || self.default_budget < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "default_budget must be a non-negative number, got {}",
                self.default_budget
            )));
        }
        if self.backup_retention == 0 {
            return Err(ConfigError::Invalid(
                "backup_retention must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Formats an amount with the configured currency symbol, two decimals.
    pub fn format_amount(&self, amount: f64) -> String {
        format!("{}{:.2}", self.currency_symbol, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"currency_symbol":"$"}"#).unwrap();
        assert_eq!(cfg.currency_symbol, "$");
        assert_eq!(cfg.default_budget, 50_000.0);
        assert_eq!(cfg.backup_retention, 5);
        assert_eq!(cfg.data_dir, None);
    }

    #[test]
    fn validate_rejects_nonsense() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_ok());
        cfg.default_budget = -1.0;
        assert!(cfg.validate().is_err());
        cfg.default_budget = 10.0;
        cfg.backup_retention = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn formats_with_symbol() {
        let cfg = Config::default();
        assert_eq!(cfg.format_amount(1234.5), "₹1234.50");
    }
}
