//! Alert log
//!
//! Append-only record of every alert raised during a run, grouped per
//! patient for reporting. Cleared only when a new run starts.

use serde::{Deserialize, Serialize};

use crate::types::AlertEvent;

/// Alerts for one patient, in arrival order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientAlerts {
    pub patient_name: String,
    pub events: Vec<AlertEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertLog {
    events: Vec<AlertEvent>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: AlertEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[AlertEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Group events by patient name.
    ///
    /// Groups appear in order of each patient's first alert; events within a
    /// group keep arrival order.
    pub fn group_by_patient(&self) -> Vec<PatientAlerts> {
        let mut groups: Vec<PatientAlerts> = Vec::new();
        for event in &self.events {
            match groups
                .iter_mut()
                .find(|g| g.patient_name == event.patient_name)
            {
                Some(group) => group.events.push(event.clone()),
                None => groups.push(PatientAlerts {
                    patient_name: event.patient_name.clone(),
                    events: vec![event.clone()],
                }),
            }
        }
        groups
    }

    /// Load a log snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the log to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
