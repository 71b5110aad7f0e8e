//! Vitalwatch - Simulated multi-patient vital-signs monitoring
//!
//! Vitalwatch fabricates readings for a fixed patient population and runs them
//! through a per-tick pipeline: sample generation → threshold classification →
//! bounded history buffering → linear trend forecasting → alert logging.
//! Alerts collected during a run are exported as a grouped report when the
//! monitor stops.
//!
//! ## Modules
//!
//! - **Pipeline**: [`Monitor`] drives ticks and notifies display observers
//! - **Stages**: [`generator`], [`classifier`], [`buffer`], [`forecast`], [`alert_log`]
//! - **Output**: [`report`] renders the alert report as HTML, JSON or text

pub mod alert_log;
pub mod buffer;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod forecast;
pub mod generator;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod types;

// FFI bindings for C hosts (always available for cdylib/staticlib builds)
pub mod ffi;

pub use alert_log::{AlertLog, PatientAlerts};
pub use buffer::SeriesBuffer;
pub use classifier::AlertClassifier;
pub use config::MonitorConfig;
pub use error::{ForecastError, MonitorError};
pub use forecast::{ForecastStore, TrendForecaster};
pub use generator::{RandomSampleSource, SampleSource};
pub use pipeline::{Monitor, MonitorObserver, RunSummary, StopHandle};
pub use report::{AlertReport, ReportBuilder, ReportFormat};
pub use scheduler::{ImmediateScheduler, IntervalScheduler, TickScheduler};

/// Vitalwatch version embedded in exported reports
pub const VITALWATCH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for exported reports
pub const PRODUCER_NAME: &str = "vitalwatch";
