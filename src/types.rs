//! Core types for the Vitalwatch pipeline
//!
//! This module defines the data structures that flow through each stage of a
//! tick: generated samples, classified samples, buffered channel points,
//! forecasts, and the alert events recorded for reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable patient identifier in `[0, population)`
pub type PatientId = usize;

/// A monitored patient. Immutable once the population is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
}

impl Patient {
    /// Build a patient whose display name is 1-based (`Patient_1` for id 0)
    pub fn new(id: PatientId, prefix: &str) -> Self {
        Self {
            id,
            name: format!("{prefix}{}", id + 1),
        }
    }
}

/// Build the fixed population for a run
pub fn build_population(size: usize, prefix: &str) -> Vec<Patient> {
    (0..size).map(|id| Patient::new(id, prefix)).collect()
}

/// One synthetic vital-signs reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken (UTC)
    pub timestamp: DateTime<Utc>,
    /// Body temperature (°C)
    pub temperature: f64,
    /// Heart rate (bpm)
    pub heart_rate: u32,
    /// Blood oxygen saturation (%)
    pub oxygen_saturation: f64,
    /// Systolic blood pressure (mmHg)
    pub systolic: u32,
    /// Diastolic blood pressure (mmHg)
    pub diastolic: u32,
}

impl Sample {
    /// Value carried on a tracked channel
    pub fn channel_value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::HeartRate => f64::from(self.heart_rate),
            Channel::Oxygen => self.oxygen_saturation,
        }
    }

    /// Blood pressure rendered as `systolic/diastolic`
    pub fn blood_pressure(&self) -> String {
        format!("{}/{}", self.systolic, self.diastolic)
    }
}

/// Threshold rule that fired for a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    Fever,
    Tachycardia,
    Hypoxia,
    Hypertension,
}

impl AlertReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertReason::Fever => "Fever detected",
            AlertReason::Tachycardia => "Tachycardia detected",
            AlertReason::Hypoxia => "Hypoxia detected",
            AlertReason::Hypertension => "Hypertension detected",
        }
    }
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join reasons into the single line used in logs and reports
pub fn reason_text(reasons: &[AlertReason]) -> String {
    reasons
        .iter()
        .map(AlertReason::as_str)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A sample after threshold classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSample {
    pub sample: Sample,
    /// True iff `reasons` is non-empty
    pub alert_flag: bool,
    /// Fired rules, in fixed rule order
    pub reasons: Vec<AlertReason>,
}

impl ClassifiedSample {
    pub fn reason_text(&self) -> String {
        reason_text(&self.reasons)
    }
}

/// Vital-sign series tracked per patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Temperature,
    HeartRate,
    Oxygen,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::HeartRate, Channel::Oxygen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::HeartRate => "heart_rate",
            Channel::Oxygen => "oxygen",
        }
    }

    /// Index into per-channel arrays
    pub fn index(&self) -> usize {
        match self {
            Channel::Temperature => 0,
            Channel::HeartRate => 1,
            Channel::Oxygen => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One buffered point on a channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferedPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub alert_flag: bool,
}

/// Read-only copy of a patient's channel histories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesWindow {
    pub temperature: Vec<BufferedPoint>,
    pub heart_rate: Vec<BufferedPoint>,
    pub oxygen: Vec<BufferedPoint>,
}

impl SeriesWindow {
    pub fn channel(&self, channel: Channel) -> &[BufferedPoint] {
        match channel {
            Channel::Temperature => &self.temperature,
            Channel::HeartRate => &self.heart_rate,
            Channel::Oxygen => &self.oxygen,
        }
    }

    /// Number of points; equal across channels
    pub fn len(&self) -> usize {
        self.temperature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty()
    }
}

/// Detail view for a single buffered point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDetails {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub heart_rate: f64,
    pub oxygen_saturation: f64,
    pub alert_flag: bool,
}

impl PointDetails {
    pub fn status(&self) -> &'static str {
        if self.alert_flag {
            "Alert"
        } else {
            "Normal"
        }
    }
}

/// Predicted values for one channel, indexed right after the last buffered point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub channel: Channel,
    /// Index of the first predicted point on the history's x axis
    pub start_index: usize,
    pub values: Vec<f64>,
}

impl ForecastResult {
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Latest forecasts for one patient, one slot per channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientForecast {
    pub temperature: Option<ForecastResult>,
    pub heart_rate: Option<ForecastResult>,
    pub oxygen: Option<ForecastResult>,
}

impl PatientForecast {
    pub fn channel(&self, channel: Channel) -> Option<&ForecastResult> {
        match channel {
            Channel::Temperature => self.temperature.as_ref(),
            Channel::HeartRate => self.heart_rate.as_ref(),
            Channel::Oxygen => self.oxygen.as_ref(),
        }
    }

    pub(crate) fn set(&mut self, result: ForecastResult) {
        match result.channel {
            Channel::Temperature => self.temperature = Some(result),
            Channel::HeartRate => self.heart_rate = Some(result),
            Channel::Oxygen => self.oxygen = Some(result),
        }
    }
}

/// A recorded instance of one or more rules firing for a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub patient_id: PatientId,
    pub patient_name: String,
    pub sample: Sample,
    pub reasons: Vec<AlertReason>,
}

impl AlertEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.sample.timestamp
    }

    pub fn reason_text(&self) -> String {
        reason_text(&self.reasons)
    }
}

/// Lifecycle state of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Running,
    Stopped,
}

impl MonitorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorState::Idle => "idle",
            MonitorState::Running => "running",
            MonitorState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-patient view handed to the chart-display collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub patient_id: PatientId,
    pub patient_name: String,
    pub series: SeriesWindow,
    pub forecast: PatientForecast,
}

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// 1-based tick counter within the current run
    pub tick: u64,
    /// Patients whose sample was generated and buffered this tick
    pub patients_processed: usize,
    /// Alerts raised this tick, in population order
    pub alerts: Vec<AlertEvent>,
    /// Channel forecasts recomputed this tick
    pub forecasts_updated: usize,
    /// Channel forecasts skipped for lack of history
    pub forecasts_skipped: usize,
    /// Channel forecasts that failed and kept their previous value
    pub forecast_failures: usize,
    /// True when a stop request cut the tick short
    pub interrupted: bool,
}
