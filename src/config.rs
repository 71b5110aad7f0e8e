//! Monitor configuration
//!
//! [`MonitorConfig`] holds every tunable of a run: population size, history
//! and display windows, forecast horizon, tick interval, RNG seed and report
//! output. It is serializable so a run can be described by a JSON file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::MonitorError;
use crate::report::ReportFormat;

/// Default number of simulated patients
pub const DEFAULT_POPULATION: usize = 100;
/// Default retained history per patient per channel
pub const DEFAULT_HISTORY_CAP: usize = 100;
/// Default number of points shown on the live charts
pub const DEFAULT_DISPLAY_WINDOW: usize = 60;
/// Default number of forecast points
pub const DEFAULT_FORECAST_HORIZON: usize = 10;
/// Default tick interval in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Largest accepted population
pub const MAX_POPULATION: usize = 100_000;
/// Largest accepted per-patient history
pub const MAX_HISTORY_CAP: usize = 1_000_000;
/// Largest accepted forecast horizon
pub const MAX_FORECAST_HORIZON: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Number of simulated patients. Default: **100**.
    pub population: usize,
    /// Display-name prefix; names are `{prefix}{id + 1}`. Default: **"Patient_"**.
    pub patient_name_prefix: String,
    /// Maximum buffered points per patient per channel. Default: **100**.
    pub history_cap: usize,
    /// Points returned for chart display. Default: **60**.
    pub display_window: usize,
    /// Number of predicted points per forecast. Default: **10**.
    pub forecast_horizon: usize,
    /// Recompute forecasts every N ticks. Default: **1**.
    pub forecast_every_ticks: u64,
    /// Wall-time interval between ticks. Default: **1000 ms**.
    pub tick_interval_ms: u64,
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Where the report is written when the monitor stops.
    pub report_path: PathBuf,
    pub report_format: ReportFormat,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            population: DEFAULT_POPULATION,
            patient_name_prefix: "Patient_".to_string(),
            history_cap: DEFAULT_HISTORY_CAP,
            display_window: DEFAULT_DISPLAY_WINDOW,
            forecast_horizon: DEFAULT_FORECAST_HORIZON,
            forecast_every_ticks: 1,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            seed: None,
            report_path: PathBuf::from("all_patients_alert_report.html"),
            report_format: ReportFormat::Html,
        }
    }
}

impl MonitorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Check every field; the first violation is returned.
    pub fn validate(&self) -> Result<(), MonitorError> {
        check_range("population", self.population, MAX_POPULATION)?;
        check_range("history_cap", self.history_cap, MAX_HISTORY_CAP)?;
        if self.display_window == 0 {
            return Err(MonitorError::invalid_config("display_window", "must be > 0"));
        }
        if self.display_window > self.history_cap {
            return Err(MonitorError::invalid_config(
                "display_window",
                format!(
                    "must not exceed history_cap ({} > {})",
                    self.display_window, self.history_cap
                ),
            ));
        }
        check_range("forecast_horizon", self.forecast_horizon, MAX_FORECAST_HORIZON)?;
        if self.forecast_every_ticks == 0 {
            return Err(MonitorError::invalid_config(
                "forecast_every_ticks",
                "must be > 0",
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(MonitorError::invalid_config("tick_interval_ms", "must be > 0"));
        }
        if self.report_path.as_os_str().is_empty() {
            return Err(MonitorError::invalid_config("report_path", "must not be empty"));
        }
        Ok(())
    }

    /// Load and validate a configuration file
    pub fn from_json_file(path: &Path) -> Result<Self, MonitorError> {
        let contents = std::fs::read_to_string(path).map_err(|source| MonitorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_json(&contents)?;
        Ok(cfg)
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self, MonitorError> {
        let cfg: MonitorConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String, MonitorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn check_range(field: &str, value: usize, max: usize) -> Result<(), MonitorError> {
    if value == 0 {
        return Err(MonitorError::invalid_config(field, "must be > 0"));
    }
    if value > max {
        return Err(MonitorError::invalid_config(
            field,
            format!("must not exceed {max} (got {value})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = MonitorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.population, 100);
        assert_eq!(cfg.history_cap, 100);
        assert_eq!(cfg.display_window, 60);
        assert_eq!(cfg.forecast_horizon, 10);
        assert_eq!(cfg.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn zero_population_is_invalid() {
        let cfg = MonitorConfig {
            population: 0,
            ..Default::default()
        };
        match cfg.validate() {
            Err(MonitorError::InvalidConfig { field, .. }) => assert_eq!(field, "population"),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn oversized_fields_are_rejected() {
        let cases = [
            (
                "population",
                MonitorConfig {
                    population: usize::MAX,
                    ..Default::default()
                },
            ),
            (
                "history_cap",
                MonitorConfig {
                    history_cap: MAX_HISTORY_CAP + 1,
                    ..Default::default()
                },
            ),
            (
                "forecast_horizon",
                MonitorConfig {
                    forecast_horizon: usize::MAX,
                    ..Default::default()
                },
            ),
        ];
        for (expected, cfg) in cases {
            match cfg.validate() {
                Err(MonitorError::InvalidConfig { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidConfig for {expected}, got {other:?}"),
            }
        }

        let at_limit = MonitorConfig {
            population: MAX_POPULATION,
            forecast_horizon: MAX_FORECAST_HORIZON,
            ..Default::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn zero_interval_is_invalid() {
        let cfg = MonitorConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn display_window_larger_than_history_is_invalid() {
        let cfg = MonitorConfig {
            history_cap: 10,
            display_window: 20,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg = MonitorConfig::from_json(r#"{"population": 5, "seed": 42}"#).unwrap();
        assert_eq!(cfg.population, 5);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.history_cap, DEFAULT_HISTORY_CAP);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        assert!(MonitorConfig::from_json(r#"{"population": 0}"#).is_err());
        assert!(MonitorConfig::from_json("not json").is_err());
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.json");
        let cfg = MonitorConfig {
            population: 3,
            seed: Some(7),
            ..Default::default()
        };
        std::fs::write(&path, cfg.to_json().unwrap()).unwrap();

        let loaded = MonitorConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn missing_config_file_reports_path() {
        let err = MonitorConfig::from_json_file(Path::new("/nonexistent/monitor.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/monitor.json"));
    }
}
