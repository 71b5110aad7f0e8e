//! Error types for Vitalwatch

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the monitoring pipeline to its host
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Failed to read configuration from {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown patient: {0}")]
    UnknownPatient(usize),

    #[error("Cannot {action} while monitor is {from}")]
    InvalidTransition { from: String, action: String },

    #[error("Failed to export report to {path}: {source}")]
    ReportExport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MonitorError {
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MonitorError::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Reasons a trend fit can fail for one channel of one patient
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Not enough points to fit a line. Callers treat this as a skip.
    #[error("Insufficient history: {points} point(s), need at least 2")]
    InsufficientHistory { points: usize },

    #[error("Non-finite value at index {index}")]
    NonFiniteInput { index: usize },

    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("Forecast horizon {horizon} overflows past {points} point(s)")]
    HorizonOverflow { points: usize, horizon: usize },
}

impl ForecastError {
    /// Whether this failure is an expected skip rather than a fault
    pub fn is_skip(&self) -> bool {
        matches!(self, ForecastError::InsufficientHistory { .. })
    }
}
