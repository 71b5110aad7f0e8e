//! Synthetic sample generation
//!
//! Sources produce one vital-signs [`Sample`] per call for a patient. The
//! random source draws each field uniformly from a fixed physiological range
//! and can be seeded for reproducible runs.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

use crate::types::{PatientId, Sample};

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 36.0..=39.0;
pub const HEART_RATE_RANGE: RangeInclusive<u32> = 60..=120;
pub const OXYGEN_RANGE: RangeInclusive<f64> = 90.0..=100.0;
pub const SYSTOLIC_RANGE: RangeInclusive<u32> = 90..=140;
pub const DIASTOLIC_RANGE: RangeInclusive<u32> = 60..=90;

/// Trait for per-patient sample producers
pub trait SampleSource {
    /// Produce the next sample for `patient`, stamped with `timestamp`
    fn generate(&mut self, patient: PatientId, timestamp: DateTime<Utc>) -> Sample;
}

/// Uniform random readings over the fixed ranges
#[derive(Debug, Clone)]
pub struct RandomSampleSource {
    rng: StdRng,
}

impl RandomSampleSource {
    /// Create a source seeded from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a reproducible source
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl SampleSource for RandomSampleSource {
    fn generate(&mut self, _patient: PatientId, timestamp: DateTime<Utc>) -> Sample {
        Sample {
            timestamp,
            temperature: self.rng.gen_range(TEMPERATURE_RANGE),
            heart_rate: self.rng.gen_range(HEART_RATE_RANGE),
            oxygen_saturation: self.rng.gen_range(OXYGEN_RANGE),
            systolic: self.rng.gen_range(SYSTOLIC_RANGE),
            diastolic: self.rng.gen_range(DIASTOLIC_RANGE),
        }
    }
}

/// Fixed readings per patient, used to drive deterministic scenarios
///
/// Patients without an explicit reading get `default`.
#[derive(Debug, Clone)]
pub struct FixedSampleSource {
    default: Reading,
    overrides: Vec<(PatientId, Reading)>,
}

/// Vital values without a timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub heart_rate: u32,
    pub oxygen_saturation: f64,
    pub systolic: u32,
    pub diastolic: u32,
}

impl Reading {
    /// Values that trip no threshold
    pub const NORMAL: Reading = Reading {
        temperature: 37.0,
        heart_rate: 80,
        oxygen_saturation: 98.0,
        systolic: 110,
        diastolic: 70,
    };

    /// Values that trip every threshold
    pub const CRITICAL: Reading = Reading {
        temperature: 38.0,
        heart_rate: 110,
        oxygen_saturation: 92.0,
        systolic: 135,
        diastolic: 90,
    };

    pub fn at(&self, timestamp: DateTime<Utc>) -> Sample {
        Sample {
            timestamp,
            temperature: self.temperature,
            heart_rate: self.heart_rate,
            oxygen_saturation: self.oxygen_saturation,
            systolic: self.systolic,
            diastolic: self.diastolic,
        }
    }
}

impl FixedSampleSource {
    pub fn new(default: Reading) -> Self {
        Self {
            default,
            overrides: Vec::new(),
        }
    }

    pub fn with_patient(mut self, patient: PatientId, reading: Reading) -> Self {
        self.overrides.retain(|(id, _)| *id != patient);
        self.overrides.push((patient, reading));
        self
    }
}

impl SampleSource for FixedSampleSource {
    fn generate(&mut self, patient: PatientId, timestamp: DateTime<Utc>) -> Sample {
        self.overrides
            .iter()
            .find(|(id, _)| *id == patient)
            .map(|(_, reading)| reading)
            .unwrap_or(&self.default)
            .at(timestamp)
    }
}
