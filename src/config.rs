// ⚙️ Monitor Configuration - Thresholds as data
// Loaded from a JSON file; any missing field takes its default.

use crate::drought::DroughtThresholds;
use crate::forecast::MAX_HORIZON_DAYS;
use crate::ledger::DEFAULT_PAYOUT_AMOUNT;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Minimum daily rainfall (mm) for a wet day
    pub rain_threshold_mm: f64,

    /// Critical soil moisture (%)
    pub moisture_threshold_pct: f64,

    /// Dry streak length that triggers a payout
    pub consecutive_days: usize,

    /// Compensation per authorized payout (INR)
    pub payout_amount: f64,

    /// Days projected by the rainfall forecaster
    pub forecast_horizon_days: usize,

    /// Fixed rng seed for reproducible forecasts (None = entropy)
    pub forecast_seed: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let thresholds = DroughtThresholds::default();
        MonitorConfig {
            rain_threshold_mm: thresholds.rain_threshold_mm,
            moisture_threshold_pct: thresholds.moisture_threshold_pct,
            consecutive_days: thresholds.consecutive_days,
            payout_amount: DEFAULT_PAYOUT_AMOUNT,
            forecast_horizon_days: 5,
            forecast_seed: None,
        }
    }
}

impl MonitorConfig {
    /// Load and validate a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: MonitorConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rain_threshold_mm.is_nan() || self.rain_threshold_mm < 0.0 {
            bail!("rain_threshold_mm must be >= 0, got {}", self.rain_threshold_mm);
        }
        if self.moisture_threshold_pct.is_nan() || self.moisture_threshold_pct < 0.0 {
            bail!("moisture_threshold_pct must be >= 0, got {}", self.moisture_threshold_pct);
        }
        if self.consecutive_days == 0 {
            bail!("consecutive_days must be at least 1");
        }
        if self.payout_amount.is_nan() || self.payout_amount <= 0.0 {
            bail!("payout_amount must be positive, got {}", self.payout_amount);
        }
        if self.forecast_horizon_days == 0 || self.forecast_horizon_days > MAX_HORIZON_DAYS {
            bail!(
                "forecast_horizon_days must be between 1 and {}, got {}",
                MAX_HORIZON_DAYS,
                self.forecast_horizon_days
            );
        }
        Ok(())
    }

    pub fn thresholds(&self) -> DroughtThresholds {
        DroughtThresholds {
            rain_threshold_mm: self.rain_threshold_mm,
            moisture_threshold_pct: self.moisture_threshold_pct,
            consecutive_days: self.consecutive_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();

        assert_eq!(config.rain_threshold_mm, 5.0);
        assert_eq!(config.moisture_threshold_pct, 20.0);
        assert_eq!(config.consecutive_days, 5);
        assert_eq!(config.payout_amount, 5000.0);
        assert_eq!(config.forecast_horizon_days, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rain_threshold_mm": 7.5, "consecutive_days": 7}}"#).unwrap();

        let config = MonitorConfig::from_file(file.path()).unwrap();

        assert_eq!(config.rain_threshold_mm, 7.5);
        assert_eq!(config.consecutive_days, 7);
        assert_eq!(config.moisture_threshold_pct, 20.0);
        assert_eq!(config.thresholds().consecutive_days, 7);
    }

    #[test]
    fn test_rejects_zero_window() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"consecutive_days": 0}}"#).unwrap();

        let err = MonitorConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("consecutive_days"));
    }

    #[test]
    fn test_rejects_negative_threshold_and_amount() {
        let config = MonitorConfig {
            rain_threshold_mm: -1.0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            payout_amount: 0.0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_horizon_out_of_range() {
        for days in [0, MAX_HORIZON_DAYS + 1, usize::MAX] {
            let config = MonitorConfig {
                forecast_horizon_days: days,
                ..MonitorConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("forecast_horizon_days"));
        }

        let config = MonitorConfig {
            forecast_horizon_days: MAX_HORIZON_DAYS,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(MonitorConfig::from_file("/nonexistent/monitor.json").is_err());
    }
}
