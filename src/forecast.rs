//! Trend forecasting
//!
//! Fits an ordinary least-squares line of value against sample index over a
//! channel's retained history and evaluates it at the next `horizon` indices.
//! Forecasts are replaced wholesale; a failed fit leaves the previous
//! forecast in place.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::buffer::SeriesBuffer;
use crate::error::{ForecastError, MonitorError};
use crate::types::{Channel, ForecastResult, PatientForecast, PatientId};

/// Minimum number of points needed to fit a line
pub const MIN_FIT_POINTS: usize = 2;

/// Fitted line `value = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Linear extrapolation over a fixed horizon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendForecaster {
    horizon: usize,
}

impl TrendForecaster {
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Fit a line through explicit `(x, value)` points
    pub fn fit(points: &[(f64, f64)]) -> Result<LinearFit, ForecastError> {
        if points.len() < MIN_FIT_POINTS {
            return Err(ForecastError::InsufficientHistory {
                points: points.len(),
            });
        }
        if let Some(index) = points
            .iter()
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(ForecastError::NonFiniteInput { index });
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (x, y) in points {
            let dx = x - mean_x;
            sxx += dx * dx;
            sxy += dx * (y - mean_y);
        }

        if sxx == 0.0 {
            return Err(ForecastError::DegenerateFit(
                "all x values are identical".to_string(),
            ));
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(ForecastError::DegenerateFit(format!(
                "non-finite coefficients (slope {slope}, intercept {intercept})"
            )));
        }

        Ok(LinearFit { slope, intercept })
    }

    /// Extrapolate explicit `(x, value)` points at `x = k..k + horizon`,
    /// where `k` is the number of points
    pub fn forecast_points(&self, points: &[(f64, f64)]) -> Result<Vec<f64>, ForecastError> {
        let fit = Self::fit(points)?;
        let k = points.len();
        let end = k
            .checked_add(self.horizon)
            .ok_or(ForecastError::HorizonOverflow {
                points: k,
                horizon: self.horizon,
            })?;
        Ok((k..end).map(|x| fit.predict(x as f64)).collect())
    }

    /// Fit `values` against their indices `0..k` and extrapolate
    pub fn forecast(&self, values: &[f64]) -> Result<Vec<f64>, ForecastError> {
        let points: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as f64, *v))
            .collect();
        self.forecast_points(&points)
    }

    /// Forecast one channel, tagging the result with where it starts
    pub fn forecast_channel(&self, channel: Channel, values: &[f64]) -> Result<ForecastResult, ForecastError> {
        Ok(ForecastResult {
            channel,
            start_index: values.len(),
            values: self.forecast(values)?,
        })
    }
}

/// Counts from refreshing one patient's forecasts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Latest forecast per patient per channel
#[derive(Debug, Clone)]
pub struct ForecastStore {
    forecasts: Vec<PatientForecast>,
}

impl ForecastStore {
    pub fn new(population: usize) -> Self {
        Self {
            forecasts: vec![PatientForecast::default(); population],
        }
    }

    pub fn get(&self, patient: PatientId) -> Option<&PatientForecast> {
        self.forecasts.get(patient)
    }

    /// Recompute every channel for `patient` from its buffered history.
    ///
    /// Channels are isolated: one failed fit is logged and keeps its previous
    /// forecast while the others still update.
    pub fn refresh(
        &mut self,
        patient: PatientId,
        patient_name: &str,
        buffer: &SeriesBuffer,
        forecaster: &TrendForecaster,
    ) -> Result<RefreshOutcome, MonitorError> {
        let slot = self
            .forecasts
            .get_mut(patient)
            .ok_or(MonitorError::UnknownPatient(patient))?;
        let mut outcome = RefreshOutcome::default();

        for channel in Channel::ALL {
            let values = buffer.channel_values(patient, channel)?;
            match forecaster.forecast_channel(channel, &values) {
                Ok(result) => {
                    slot.set(result);
                    outcome.updated += 1;
                }
                Err(e) if e.is_skip() => outcome.skipped += 1,
                Err(e) => {
                    warn!(patient = patient_name, %channel, error = %e, "Error forecasting");
                    outcome.failed += 1;
                }
            }
        }

        if outcome.updated == Channel::ALL.len() {
            debug!(
                "Forecast for {} - Temp: {:.2}, HR: {:.2}, O2: {:.2}",
                patient_name,
                last_value(slot, Channel::Temperature),
                last_value(slot, Channel::HeartRate),
                last_value(slot, Channel::Oxygen),
            );
        }

        Ok(outcome)
    }
}

fn last_value(forecast: &PatientForecast, channel: Channel) -> f64 {
    forecast
        .channel(channel)
        .and_then(ForecastResult::last)
        .unwrap_or(f64::NAN)
}
