//! Threshold classification
//!
//! Every sample is checked against four fixed rules:
//! - temperature above 37.5 °C (fever)
//! - heart rate above 100 bpm (tachycardia)
//! - oxygen saturation below 95 % (hypoxia)
//! - systolic above 130 or diastolic above 85 mmHg (hypertension)
//!
//! Rules are independent; fired reasons are reported in that order.

use crate::types::{AlertReason, ClassifiedSample, Sample};

pub const FEVER_THRESHOLD_C: f64 = 37.5;
pub const TACHYCARDIA_THRESHOLD_BPM: u32 = 100;
pub const HYPOXIA_THRESHOLD_PCT: f64 = 95.0;
pub const SYSTOLIC_THRESHOLD_MMHG: u32 = 130;
pub const DIASTOLIC_THRESHOLD_MMHG: u32 = 85;

/// Classifier mapping a sample to its fired alert reasons
pub struct AlertClassifier;

impl AlertClassifier {
    /// Classify a sample. Total and deterministic.
    pub fn classify(sample: Sample) -> ClassifiedSample {
        let reasons = Self::reasons(&sample);
        ClassifiedSample {
            sample,
            alert_flag: !reasons.is_empty(),
            reasons,
        }
    }

    /// Fired reasons in fixed rule order
    pub fn reasons(sample: &Sample) -> Vec<AlertReason> {
        let mut reasons = Vec::with_capacity(4);

        if sample.temperature > FEVER_THRESHOLD_C {
            reasons.push(AlertReason::Fever);
        }
        if sample.heart_rate > TACHYCARDIA_THRESHOLD_BPM {
            reasons.push(AlertReason::Tachycardia);
        }
        if sample.oxygen_saturation < HYPOXIA_THRESHOLD_PCT {
            reasons.push(AlertReason::Hypoxia);
        }
        if sample.systolic > SYSTOLIC_THRESHOLD_MMHG || sample.diastolic > DIASTOLIC_THRESHOLD_MMHG {
            reasons.push(AlertReason::Hypertension);
        }

        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Reading;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    #[test]
    fn all_rules_fire_in_order() {
        let classified = AlertClassifier::classify(Reading::CRITICAL.at(Utc::now()));

        assert!(classified.alert_flag);
        assert_eq!(
            classified.reasons,
            vec![
                AlertReason::Fever,
                AlertReason::Tachycardia,
                AlertReason::Hypoxia,
                AlertReason::Hypertension,
            ]
        );
        assert_eq!(
            classified.reason_text(),
            "Fever detected; Tachycardia detected; Hypoxia detected; Hypertension detected"
        );
    }

    #[test]
    fn normal_sample_has_no_alert() {
        let classified = AlertClassifier::classify(Reading::NORMAL.at(Utc::now()));

        assert!(!classified.alert_flag);
        assert!(classified.reasons.is_empty());
        assert_eq!(classified.reason_text(), "");
    }

    #[test]
    fn thresholds_are_strict() {
        let reading = Reading {
            temperature: 37.5,
            heart_rate: 100,
            oxygen_saturation: 95.0,
            systolic: 130,
            diastolic: 85,
        };
        let classified = AlertClassifier::classify(reading.at(Utc::now()));
        assert!(!classified.alert_flag);
    }

    #[test]
    fn diastolic_alone_triggers_hypertension() {
        let reading = Reading {
            diastolic: 86,
            ..Reading::NORMAL
        };
        let classified = AlertClassifier::classify(reading.at(Utc::now()));
        assert_eq!(classified.reasons, vec![AlertReason::Hypertension]);
    }

    #[test]
    fn single_rule_keeps_flag_and_reasons_consistent() {
        let reading = Reading {
            oxygen_saturation: 91.2,
            ..Reading::NORMAL
        };
        let classified = AlertClassifier::classify(reading.at(Utc::now()));
        assert!(classified.alert_flag);
        assert_eq!(classified.reasons, vec![AlertReason::Hypoxia]);
    }
}
