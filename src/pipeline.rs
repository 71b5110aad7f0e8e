//! Pipeline orchestration
//!
//! [`Monitor`] owns all run state and drives one tick at a time:
//! generate → classify → buffer → record alerts → forecast → notify.
//!
//! Lifecycle is `Idle → Running → Stopped`; starting again from `Stopped`
//! clears the alert log and re-enters `Running`. Stopping exports the report.
//! The host owns the timer: call [`Monitor::tick`] on its own schedule or hand
//! a [`TickScheduler`] to [`Monitor::run`].

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::alert_log::AlertLog;
use crate::buffer::SeriesBuffer;
use crate::classifier::AlertClassifier;
use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::forecast::{ForecastStore, TrendForecaster};
use crate::generator::{RandomSampleSource, SampleSource};
use crate::report::{ReportBuilder, ReportFormat};
use crate::scheduler::TickScheduler;
use crate::types::{
    build_population, AlertEvent, MonitorState, Patient, PatientForecast, PatientId,
    PatientSnapshot, PointDetails, SeriesWindow, TickReport,
};

/// Display-side collaborator notified synchronously by the monitor
pub trait MonitorObserver {
    /// Called once per alert, in population order
    fn on_alert(&mut self, _event: &AlertEvent) {}

    /// Called once per tick with copies of every patient's display series and forecasts
    fn on_tick_complete(&mut self, _report: &TickReport, _snapshots: &[PatientSnapshot]) {}
}

/// Cloneable stop request, honoured between patients
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Summary of a completed [`Monitor::run`]
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub alerts: usize,
    pub elapsed: Duration,
    pub report_path: PathBuf,
}

/// The monitoring pipeline
pub struct Monitor {
    config: MonitorConfig,
    patients: Vec<Patient>,
    source: Box<dyn SampleSource>,
    clock: Box<dyn Clock>,
    buffer: SeriesBuffer,
    forecaster: TrendForecaster,
    forecasts: ForecastStore,
    alert_log: AlertLog,
    observers: Vec<Box<dyn MonitorObserver>>,
    state: MonitorState,
    tick_count: u64,
    focused: PatientId,
    stop: StopHandle,
}

impl Monitor {
    /// Create a monitor with random generation and wall-clock time
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        let source = RandomSampleSource::new(config.seed);
        Self::with_parts(config, Box::new(source), Box::new(SystemClock))
    }

    /// Create a monitor with host-supplied sample and time sources
    pub fn with_parts(
        config: MonitorConfig,
        source: Box<dyn SampleSource>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, MonitorError> {
        config.validate()?;

        Ok(Self {
            patients: build_population(config.population, &config.patient_name_prefix),
            buffer: SeriesBuffer::new(config.population, config.history_cap),
            forecaster: TrendForecaster::new(config.forecast_horizon),
            forecasts: ForecastStore::new(config.population),
            alert_log: AlertLog::new(),
            observers: Vec::new(),
            state: MonitorState::Idle,
            tick_count: 0,
            focused: 0,
            stop: StopHandle::default(),
            source,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn patient(&self, id: PatientId) -> Result<&Patient, MonitorError> {
        self.patients.get(id).ok_or(MonitorError::UnknownPatient(id))
    }

    pub fn alert_log(&self) -> &AlertLog {
        &self.alert_log
    }

    pub fn buffer(&self) -> &SeriesBuffer {
        &self.buffer
    }

    /// Ticks completed in the current run
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn add_observer(&mut self, observer: Box<dyn MonitorObserver>) {
        self.observers.push(observer);
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Enter `Running`, clearing the alert log of any previous run
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if self.state == MonitorState::Running {
            return Err(self.invalid_transition("start"));
        }

        self.alert_log.clear();
        self.tick_count = 0;
        self.stop.reset();
        self.state = MonitorState::Running;
        info!(patients = self.patients.len(), "Monitor started");
        Ok(())
    }

    /// Enter `Stopped` and export the report to the configured path.
    ///
    /// The transition happens even if the export fails; the alert log is
    /// kept so [`Monitor::export_report`] can be retried.
    pub fn stop(&mut self) -> Result<PathBuf, MonitorError> {
        if self.state != MonitorState::Running {
            return Err(self.invalid_transition("stop"));
        }

        self.state = MonitorState::Stopped;
        info!(
            ticks = self.tick_count,
            alerts = self.alert_log.len(),
            "Monitor stopped"
        );

        let path = self.config.report_path.clone();
        let format = self.config.report_format;
        self.export_report(&path, format)
    }

    /// Write the current alert log as a report
    pub fn export_report(&self, path: &Path, format: ReportFormat) -> Result<PathBuf, MonitorError> {
        ReportBuilder::export(&self.alert_log, path, format, self.clock.now())
    }

    /// Run one tick over the whole population
    pub fn tick(&mut self) -> Result<TickReport, MonitorError> {
        if self.state != MonitorState::Running {
            return Err(self.invalid_transition("tick"));
        }

        self.tick_count += 1;
        let mut report = TickReport {
            tick: self.tick_count,
            patients_processed: 0,
            alerts: Vec::new(),
            forecasts_updated: 0,
            forecasts_skipped: 0,
            forecast_failures: 0,
            interrupted: false,
        };

        for id in 0..self.patients.len() {
            if self.stop.is_stop_requested() {
                report.interrupted = true;
                break;
            }
            let now = self.clock.now();
            if let Some(event) = self.process_patient(id, now)? {
                report.alerts.push(event);
            }
            report.patients_processed += 1;
        }

        if self.tick_count % self.config.forecast_every_ticks == 0 {
            for patient in &self.patients {
                let outcome =
                    self.forecasts
                        .refresh(patient.id, &patient.name, &self.buffer, &self.forecaster)?;
                report.forecasts_updated += outcome.updated;
                report.forecasts_skipped += outcome.skipped;
                report.forecast_failures += outcome.failed;
            }
        }

        if !self.observers.is_empty() {
            let snapshots = self.snapshots()?;
            for observer in &mut self.observers {
                observer.on_tick_complete(&report, &snapshots);
            }
        }

        debug!(
            tick = report.tick,
            processed = report.patients_processed,
            alerts = report.alerts.len(),
            forecasts = report.forecasts_updated,
            "Tick complete"
        );
        Ok(report)
    }

    /// Generate, classify and buffer one patient's sample; record any alert
    fn process_patient(
        &mut self,
        id: PatientId,
        now: DateTime<Utc>,
    ) -> Result<Option<AlertEvent>, MonitorError> {
        let sample = self.source.generate(id, now);
        let classified = AlertClassifier::classify(sample);
        self.buffer.append(id, &classified)?;

        let name = &self.patients[id].name;
        debug!(
            patient = %name,
            temperature = sample.temperature,
            heart_rate = sample.heart_rate,
            oxygen = sample.oxygen_saturation,
            bp = %sample.blood_pressure(),
            "Sample buffered"
        );

        if !classified.alert_flag {
            return Ok(None);
        }

        let event = AlertEvent {
            patient_id: id,
            patient_name: name.clone(),
            sample: classified.sample,
            reasons: classified.reasons,
        };
        warn!("ALERT for {}: {}", event.patient_name, event.reason_text());

        self.alert_log.record(event.clone());
        for observer in &mut self.observers {
            observer.on_alert(&event);
        }
        Ok(Some(event))
    }

    /// Drive ticks until `max_ticks` is reached or a stop is requested, then stop.
    ///
    /// Starts the monitor first if it is not already running.
    pub fn run(
        &mut self,
        scheduler: &mut dyn TickScheduler,
        max_ticks: Option<u64>,
    ) -> Result<RunSummary, MonitorError> {
        if self.state != MonitorState::Running {
            self.start()?;
        }
        let started = Instant::now();

        loop {
            let report = self.tick()?;
            let reached_limit = max_ticks.is_some_and(|max| self.tick_count >= max);
            if report.interrupted || reached_limit || self.stop.is_stop_requested() {
                break;
            }
            scheduler.wait_for_next_tick();
        }

        let elapsed = started.elapsed();
        info!(
            "Total execution time: {:.2} seconds",
            elapsed.as_secs_f64()
        );
        let ticks = self.tick_count;
        let alerts = self.alert_log.len();
        let report_path = self.stop()?;

        Ok(RunSummary {
            ticks,
            alerts,
            elapsed,
            report_path,
        })
    }

    /// Switch the displayed patient, resetting only its visual history
    pub fn focus(&mut self, patient: PatientId) -> Result<(), MonitorError> {
        self.buffer.reset_visual(patient)?;
        self.focused = patient;
        Ok(())
    }

    pub fn focused(&self) -> PatientId {
        self.focused
    }

    /// Chart series for `patient`: recent points since its last visual reset
    pub fn display_window(&self, patient: PatientId) -> Result<SeriesWindow, MonitorError> {
        self.buffer.visual_window(patient, self.config.display_window)
    }

    /// The last `length` retained points for `patient`
    pub fn history(&self, patient: PatientId, length: usize) -> Result<SeriesWindow, MonitorError> {
        self.buffer.window(patient, length)
    }

    pub fn point_details(
        &self,
        patient: PatientId,
        index: usize,
    ) -> Result<Option<PointDetails>, MonitorError> {
        self.buffer.point_details(patient, index)
    }

    pub fn forecast(&self, patient: PatientId) -> Result<&PatientForecast, MonitorError> {
        self.forecasts
            .get(patient)
            .ok_or(MonitorError::UnknownPatient(patient))
    }

    /// Drop a patient's data history. Forecasts are left as they are.
    pub fn clear_patient(&mut self, patient: PatientId) -> Result<(), MonitorError> {
        self.buffer.clear(patient)
    }

    /// Copy of one patient's display series and forecasts
    pub fn snapshot(&self, patient: PatientId) -> Result<PatientSnapshot, MonitorError> {
        let info = self.patient(patient)?;
        Ok(PatientSnapshot {
            patient_id: info.id,
            patient_name: info.name.clone(),
            series: self.display_window(patient)?,
            forecast: self.forecast(patient)?.clone(),
        })
    }

    pub fn snapshots(&self) -> Result<Vec<PatientSnapshot>, MonitorError> {
        (0..self.patients.len()).map(|id| self.snapshot(id)).collect()
    }

    fn invalid_transition(&self, action: &str) -> MonitorError {
        MonitorError::InvalidTransition {
            from: self.state.to_string(),
            action: action.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::generator::{FixedSampleSource, Reading};
    use crate::scheduler::ImmediateScheduler;
    use crate::types::{AlertReason, Channel};
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Cycles through a fixed reading sequence per patient
    struct ScriptedSource {
        scripts: Vec<Vec<Reading>>,
        calls: Vec<usize>,
    }

    impl ScriptedSource {
        fn new(scripts: Vec<Vec<Reading>>) -> Self {
            let calls = vec![0; scripts.len()];
            Self { scripts, calls }
        }
    }

    impl SampleSource for ScriptedSource {
        fn generate(&mut self, patient: PatientId, timestamp: DateTime<Utc>) -> crate::types::Sample {
            let script = &self.scripts[patient];
            let reading = script[self.calls[patient] % script.len()];
            self.calls[patient] += 1;
            reading.at(timestamp)
        }
    }

    #[derive(Default)]
    struct Recorded {
        alerts: Vec<AlertEvent>,
        ticks: Vec<(TickReport, usize)>,
    }

    struct Recorder(Rc<RefCell<Recorded>>);

    impl MonitorObserver for Recorder {
        fn on_alert(&mut self, event: &AlertEvent) {
            self.0.borrow_mut().alerts.push(event.clone());
        }

        fn on_tick_complete(&mut self, report: &TickReport, snapshots: &[PatientSnapshot]) {
            self.0.borrow_mut().ticks.push((report.clone(), snapshots.len()));
        }
    }

    /// Requests a stop as soon as the first alert is seen
    struct StopOnAlert(StopHandle);

    impl MonitorObserver for StopOnAlert {
        fn on_alert(&mut self, _event: &AlertEvent) {
            self.0.request_stop();
        }
    }

    fn clock() -> Box<ManualClock> {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        Box::new(ManualClock::new(start, chrono::Duration::seconds(1)))
    }

    fn config(population: usize, report_path: PathBuf) -> MonitorConfig {
        MonitorConfig {
            population,
            report_path,
            report_format: ReportFormat::Text,
            seed: Some(11),
            ..Default::default()
        }
    }

    #[test]
    fn lifecycle_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = Monitor::new(config(2, dir.path().join("r.txt"))).unwrap();

        assert_eq!(monitor.state(), MonitorState::Idle);
        assert!(monitor.tick().is_err());
        assert!(monitor.stop().is_err());

        monitor.start().unwrap();
        assert_eq!(monitor.state(), MonitorState::Running);
        assert!(monitor.start().is_err());

        monitor.tick().unwrap();
        monitor.stop().unwrap();
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert!(monitor.tick().is_err());

        monitor.start().unwrap();
        assert_eq!(monitor.state(), MonitorState::Running);
        assert_eq!(monitor.tick_count(), 0);
    }

    #[test]
    fn invalid_config_is_fatal() {
        let cfg = MonitorConfig {
            population: 0,
            ..Default::default()
        };
        assert!(matches!(
            Monitor::new(cfg),
            Err(MonitorError::InvalidConfig { .. })
        ));

        let oversized = MonitorConfig {
            population: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(
            Monitor::new(oversized),
            Err(MonitorError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn three_ticks_two_patients_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("report.txt");
        let source = ScriptedSource::new(vec![
            vec![Reading::NORMAL],
            vec![Reading::CRITICAL, Reading::NORMAL, Reading::CRITICAL],
        ]);
        let mut monitor =
            Monitor::with_parts(config(2, report_path.clone()), Box::new(source), clock()).unwrap();
        let recorded = Rc::new(RefCell::new(Recorded::default()));
        monitor.add_observer(Box::new(Recorder(recorded.clone())));

        let mut scheduler = ImmediateScheduler::default();
        let summary = monitor.run(&mut scheduler, Some(3)).unwrap();

        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.alerts, 2);
        assert_eq!(summary.report_path, report_path);
        assert_eq!(scheduler.waits, 2);
        assert_eq!(monitor.state(), MonitorState::Stopped);

        let events = monitor.alert_log().events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.patient_id == 1));
        assert_eq!(events[0].reasons.len(), 4);
        assert_eq!(events[0].reasons[0], AlertReason::Fever);
        assert!(events[0].timestamp() < events[1].timestamp());

        let recorded = recorded.borrow();
        assert_eq!(recorded.alerts.len(), 2);
        assert_eq!(recorded.ticks.len(), 3);
        assert!(recorded.ticks.iter().all(|(_, snapshots)| *snapshots == 2));

        let groups = monitor.alert_log().group_by_patient();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].patient_name, "Patient_2");

        let report = std::fs::read_to_string(&report_path).unwrap();
        assert_eq!(report.matches("Alert Report for ").count(), 1);
        assert!(report.contains("Alert Report for Patient_2"));
        assert!(!report.contains("Alert Report for Patient_1"));
        let rows = report
            .lines()
            .filter(|l| l.starts_with("2024-01-15"))
            .count();
        assert_eq!(rows, 2);
    }

    #[test]
    fn every_alerting_patient_gets_a_section() {
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("report.html");
        let cfg = MonitorConfig {
            report_format: ReportFormat::Html,
            ..config(2, report_path.clone())
        };
        let source = FixedSampleSource::new(Reading::CRITICAL);
        let mut monitor = Monitor::with_parts(cfg, Box::new(source), clock()).unwrap();

        monitor.run(&mut ImmediateScheduler::default(), Some(3)).unwrap();

        assert_eq!(monitor.alert_log().len(), 6);
        let html = std::fs::read_to_string(&report_path).unwrap();
        assert_eq!(html.matches("<table>").count(), 2);
    }

    #[test]
    fn buffers_and_forecasts_update_each_tick() {
        let dir = tempfile::tempdir().unwrap();
        let source = FixedSampleSource::new(Reading::NORMAL);
        let mut monitor =
            Monitor::with_parts(config(3, dir.path().join("r.txt")), Box::new(source), clock()).unwrap();
        monitor.start().unwrap();

        let first = monitor.tick().unwrap();
        assert_eq!(first.patients_processed, 3);
        assert_eq!(first.forecasts_updated, 0);
        assert_eq!(first.forecasts_skipped, 9);
        assert!(monitor.forecast(0).unwrap().temperature.is_none());

        let second = monitor.tick().unwrap();
        assert_eq!(second.forecasts_updated, 9);
        assert_eq!(second.forecasts_skipped, 0);
        assert_eq!(second.forecast_failures, 0);

        for patient in 0..3 {
            let window = monitor.history(patient, 60).unwrap();
            assert_eq!(window.temperature.len(), 2);
            assert_eq!(window.heart_rate.len(), 2);
            assert_eq!(window.oxygen.len(), 2);

            let forecast = monitor.forecast(patient).unwrap();
            for channel in Channel::ALL {
                let result = forecast.channel(channel).unwrap();
                assert_eq!(result.values.len(), 10);
                assert_eq!(result.start_index, 2);
            }
        }
        assert!(monitor.alert_log().is_empty());
    }

    #[test]
    fn stop_request_is_honoured_between_patients() {
        let dir = tempfile::tempdir().unwrap();
        let source = FixedSampleSource::new(Reading::CRITICAL);
        let mut monitor =
            Monitor::with_parts(config(3, dir.path().join("r.txt")), Box::new(source), clock()).unwrap();
        let handle = monitor.stop_handle();
        monitor.add_observer(Box::new(StopOnAlert(handle)));

        let summary = monitor.run(&mut ImmediateScheduler::default(), None).unwrap();

        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.alerts, 1);
        assert_eq!(monitor.buffer().len(0).unwrap(), 1);
        assert_eq!(monitor.buffer().len(1).unwrap(), 0);
        assert_eq!(monitor.state(), MonitorState::Stopped);
    }

    #[test]
    fn restart_clears_alert_log_but_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let source = FixedSampleSource::new(Reading::CRITICAL);
        let mut monitor =
            Monitor::with_parts(config(1, dir.path().join("r.txt")), Box::new(source), clock()).unwrap();

        monitor.run(&mut ImmediateScheduler::default(), Some(2)).unwrap();
        assert_eq!(monitor.alert_log().len(), 2);

        monitor.start().unwrap();
        assert!(monitor.alert_log().is_empty());
        assert_eq!(monitor.buffer().len(0).unwrap(), 2);
    }

    #[test]
    fn failed_export_keeps_log_for_retry() {
        let dir = tempfile::tempdir().unwrap();
        let bad_path = dir.path().join("missing").join("r.txt");
        let source = FixedSampleSource::new(Reading::CRITICAL);
        let mut monitor =
            Monitor::with_parts(config(1, bad_path), Box::new(source), clock()).unwrap();

        monitor.start().unwrap();
        monitor.tick().unwrap();
        let err = monitor.stop().unwrap_err();
        assert!(matches!(err, MonitorError::ReportExport { .. }));
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert_eq!(monitor.alert_log().len(), 1);

        let retry = dir.path().join("r.txt");
        monitor.export_report(&retry, ReportFormat::Json).unwrap();
        assert!(retry.exists());
    }

    #[test]
    fn forecast_failure_is_isolated_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let broken = Reading {
            temperature: f64::NAN,
            ..Reading::NORMAL
        };
        let source = FixedSampleSource::new(Reading::NORMAL).with_patient(0, broken);
        let mut monitor =
            Monitor::with_parts(config(2, dir.path().join("r.txt")), Box::new(source), clock()).unwrap();
        monitor.start().unwrap();

        monitor.tick().unwrap();
        let second = monitor.tick().unwrap();
        assert_eq!(second.patients_processed, 2);
        assert_eq!(second.forecast_failures, 1);
        assert_eq!(second.forecasts_updated, 5);

        let failed = monitor.forecast(0).unwrap();
        assert!(failed.temperature.is_none());
        assert!(failed.heart_rate.is_some());
        assert!(failed.oxygen.is_some());

        let healthy = monitor.forecast(1).unwrap();
        for channel in Channel::ALL {
            assert_eq!(healthy.channel(channel).unwrap().values.len(), 10);
        }
    }

    #[test]
    fn focus_resets_display_only() {
        let dir = tempfile::tempdir().unwrap();
        let source = FixedSampleSource::new(Reading::NORMAL);
        let mut monitor =
            Monitor::with_parts(config(2, dir.path().join("r.txt")), Box::new(source), clock()).unwrap();
        monitor.start().unwrap();
        monitor.tick().unwrap();
        monitor.tick().unwrap();

        monitor.focus(1).unwrap();
        assert_eq!(monitor.focused(), 1);
        assert!(monitor.display_window(1).unwrap().is_empty());
        assert_eq!(monitor.display_window(0).unwrap().len(), 2);
        assert_eq!(monitor.history(1, 60).unwrap().len(), 2);
        assert!(monitor.forecast(1).unwrap().oxygen.is_some());

        monitor.tick().unwrap();
        assert_eq!(monitor.display_window(1).unwrap().len(), 1);
        assert_eq!(monitor.snapshot(1).unwrap().series.len(), 1);

        assert!(monitor.focus(5).is_err());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let run = |path: PathBuf| {
            let mut monitor = Monitor::with_parts(
                config(5, path),
                Box::new(RandomSampleSource::seeded(5)),
                clock(),
            )
            .unwrap();
            monitor.run(&mut ImmediateScheduler::default(), Some(4)).unwrap();
            monitor.alert_log().events().to_vec()
        };

        assert_eq!(run(dir.path().join("a.txt")), run(dir.path().join("b.txt")));
    }
}
