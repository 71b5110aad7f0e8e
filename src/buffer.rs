//! Bounded per-patient series history
//!
//! Each patient keeps one deque of timestamped entries carrying all three
//! channel values and the alert flag, so channel histories always have equal
//! length. Entries beyond the cap are evicted oldest first.
//!
//! Two resets exist. [`SeriesBuffer::clear`] drops the data history, which
//! also feeds forecasting. [`SeriesBuffer::reset_visual`] only hides earlier
//! points from [`SeriesBuffer::visual_window`], the view used for charts.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::trace;

use crate::error::MonitorError;
use crate::types::{BufferedPoint, Channel, ClassifiedSample, PatientId, PointDetails, SeriesWindow};

#[derive(Debug, Clone, Copy)]
struct Entry {
    timestamp: DateTime<Utc>,
    values: [f64; 3],
    alert_flag: bool,
}

impl Entry {
    fn point(&self, channel: Channel) -> BufferedPoint {
        BufferedPoint {
            timestamp: self.timestamp,
            value: self.values[channel.index()],
            alert_flag: self.alert_flag,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PatientHistory {
    entries: VecDeque<Entry>,
    /// Entries appended since the last visual reset, capped at `entries.len()`
    visible: usize,
}

/// Per-patient, per-channel bounded history
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    patients: Vec<PatientHistory>,
    cap: usize,
}

impl SeriesBuffer {
    /// Create empty histories for `population` patients
    pub fn new(population: usize, cap: usize) -> Self {
        Self {
            patients: vec![PatientHistory::default(); population],
            cap,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn population(&self) -> usize {
        self.patients.len()
    }

    /// Append one classified sample to every channel of `patient`
    pub fn append(&mut self, patient: PatientId, classified: &ClassifiedSample) -> Result<(), MonitorError> {
        let cap = self.cap;
        let history = self.history_mut(patient)?;
        let sample = &classified.sample;

        history.entries.push_back(Entry {
            timestamp: sample.timestamp,
            values: [
                sample.channel_value(Channel::Temperature),
                sample.channel_value(Channel::HeartRate),
                sample.channel_value(Channel::Oxygen),
            ],
            alert_flag: classified.alert_flag,
        });
        while history.entries.len() > cap {
            history.entries.pop_front();
            trace!(patient, cap, "evicted oldest entry");
        }
        history.visible = (history.visible + 1).min(history.entries.len());
        Ok(())
    }

    /// Most recent `length` points per channel (fewer if history is shorter)
    pub fn window(&self, patient: PatientId, length: usize) -> Result<SeriesWindow, MonitorError> {
        let history = self.history(patient)?;
        Ok(Self::tail(&history.entries, length))
    }

    /// Entire retained history
    pub fn full_window(&self, patient: PatientId) -> Result<SeriesWindow, MonitorError> {
        self.window(patient, self.cap)
    }

    /// Most recent `length` points appended since the last visual reset
    pub fn visual_window(&self, patient: PatientId, length: usize) -> Result<SeriesWindow, MonitorError> {
        let history = self.history(patient)?;
        Ok(Self::tail(&history.entries, length.min(history.visible)))
    }

    /// Values of one channel in arrival order
    pub fn channel_values(&self, patient: PatientId, channel: Channel) -> Result<Vec<f64>, MonitorError> {
        let history = self.history(patient)?;
        Ok(history
            .entries
            .iter()
            .map(|e| e.values[channel.index()])
            .collect())
    }

    /// Number of retained points for `patient` (same on every channel)
    pub fn len(&self, patient: PatientId) -> Result<usize, MonitorError> {
        Ok(self.history(patient)?.entries.len())
    }

    /// Details for the point at `index` in the retained history
    pub fn point_details(&self, patient: PatientId, index: usize) -> Result<Option<PointDetails>, MonitorError> {
        let history = self.history(patient)?;
        Ok(history.entries.get(index).map(|e| PointDetails {
            timestamp: e.timestamp,
            temperature: e.values[Channel::Temperature.index()],
            heart_rate: e.values[Channel::HeartRate.index()],
            oxygen_saturation: e.values[Channel::Oxygen.index()],
            alert_flag: e.alert_flag,
        }))
    }

    /// Drop all history for `patient`
    pub fn clear(&mut self, patient: PatientId) -> Result<(), MonitorError> {
        let history = self.history_mut(patient)?;
        history.entries.clear();
        history.visible = 0;
        Ok(())
    }

    /// Hide existing points from the visual window without touching data
    pub fn reset_visual(&mut self, patient: PatientId) -> Result<(), MonitorError> {
        self.history_mut(patient)?.visible = 0;
        Ok(())
    }

    fn tail(entries: &VecDeque<Entry>, length: usize) -> SeriesWindow {
        let skip = entries.len().saturating_sub(length);
        let mut window = SeriesWindow::default();
        for entry in entries.iter().skip(skip) {
            window.temperature.push(entry.point(Channel::Temperature));
            window.heart_rate.push(entry.point(Channel::HeartRate));
            window.oxygen.push(entry.point(Channel::Oxygen));
        }
        window
    }

    fn history(&self, patient: PatientId) -> Result<&PatientHistory, MonitorError> {
        self.patients
            .get(patient)
            .ok_or(MonitorError::UnknownPatient(patient))
    }

    fn history_mut(&mut self, patient: PatientId) -> Result<&mut PatientHistory, MonitorError> {
        self.patients
            .get_mut(patient)
            .ok_or(MonitorError::UnknownPatient(patient))
    }
}
