//! Vitalwatch CLI - Command-line host for the monitoring pipeline
//!
//! Commands:
//! - run: Simulate the patient population and export the alert report
//! - classify: Classify a single reading against the alert thresholds
//! - doctor: Diagnose configuration and output health
//! - config: Print the default configuration

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vitalwatch::generator::Reading;
use vitalwatch::logging::init_tracing;
use vitalwatch::types::{AlertEvent, PatientSnapshot, TickReport};
use vitalwatch::{
    AlertClassifier, IntervalScheduler, Monitor, MonitorConfig, MonitorError, MonitorObserver,
    ReportFormat, PRODUCER_NAME, VITALWATCH_VERSION,
};

/// Vitalwatch - Simulated multi-patient vital-signs monitoring
#[derive(Parser)]
#[command(name = "vitalwatch")]
#[command(version = VITALWATCH_VERSION)]
#[command(about = "Simulate patient vitals, raise threshold alerts and forecast trends", long_about = None)]
struct Cli {
    /// Log filter (e.g. "debug" or "vitalwatch=trace"); overrides VITALWATCH_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitoring pipeline and export the alert report
    Run {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of simulated patients
        #[arg(long)]
        patients: Option<usize>,

        /// Milliseconds between ticks
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Number of ticks to run before stopping
        #[arg(long, default_value = "30")]
        ticks: u64,

        /// RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Report output path
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Report format
        #[arg(long)]
        format: Option<FormatArg>,

        /// Only print the final summary
        #[arg(long)]
        quiet: bool,
    },

    /// Classify a single reading
    Classify {
        #[arg(long)]
        temperature: f64,

        #[arg(long)]
        heart_rate: u32,

        #[arg(long)]
        oxygen: f64,

        #[arg(long)]
        systolic: u32,

        #[arg(long)]
        diastolic: u32,
    },

    /// Diagnose configuration and report output
    Doctor {
        /// Configuration file to check
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Standalone HTML document
    Html,
    /// Pretty-printed JSON
    Json,
    /// Plain text tables
    Text,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => ReportFormat::Html,
            FormatArg::Json => ReportFormat::Json,
            FormatArg::Text => ReportFormat::Text,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), VitalwatchCliError> {
    match cli.command {
        Commands::Run {
            config,
            patients,
            interval_ms,
            ticks,
            seed,
            report,
            format,
            quiet,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(patients) = patients {
                cfg.population = patients;
            }
            if let Some(interval_ms) = interval_ms {
                cfg.tick_interval_ms = interval_ms;
            }
            if seed.is_some() {
                cfg.seed = seed;
            }
            if let Some(format) = format {
                cfg.report_format = format.into();
            }
            if let Some(report) = report {
                cfg.report_path = report;
            }
            cmd_run(cfg, ticks, quiet)
        }

        Commands::Classify {
            temperature,
            heart_rate,
            oxygen,
            systolic,
            diastolic,
        } => cmd_classify(Reading {
            temperature,
            heart_rate,
            oxygen_saturation: oxygen,
            systolic,
            diastolic,
        }),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Config => {
            println!("{}", MonitorConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig, VitalwatchCliError> {
    match path {
        Some(path) => Ok(MonitorConfig::from_json_file(path)?),
        None => Ok(MonitorConfig::default()),
    }
}

/// Prints alerts and a one-line summary per tick
struct ConsoleObserver {
    quiet: bool,
}

impl MonitorObserver for ConsoleObserver {
    fn on_alert(&mut self, event: &AlertEvent) {
        if !self.quiet {
            println!(
                "ALERT {} {}: {}",
                event.timestamp().format("%Y-%m-%d %H:%M:%S"),
                event.patient_name,
                event.reason_text()
            );
        }
    }

    fn on_tick_complete(&mut self, report: &TickReport, snapshots: &[PatientSnapshot]) {
        if self.quiet {
            return;
        }
        let buffered = snapshots.iter().filter(|s| !s.series.is_empty()).count();
        println!(
            "tick {}: {} patients, {} alerts, {} forecasts updated, {} with display data",
            report.tick,
            report.patients_processed,
            report.alerts.len(),
            report.forecasts_updated,
            buffered
        );
    }
}

fn cmd_run(cfg: MonitorConfig, ticks: u64, quiet: bool) -> Result<(), VitalwatchCliError> {
    if ticks == 0 {
        return Err(VitalwatchCliError::Monitor(MonitorError::invalid_config(
            "ticks",
            "must be > 0",
        )));
    }

    let mut scheduler = IntervalScheduler::new(cfg.tick_interval());
    let mut monitor = Monitor::new(cfg)?;
    monitor.add_observer(Box::new(ConsoleObserver { quiet }));

    let summary = monitor.run(&mut scheduler, Some(ticks))?;

    println!(
        "Total execution time: {:.2} seconds ({} ticks, {} alerts)",
        summary.elapsed.as_secs_f64(),
        summary.ticks,
        summary.alerts
    );
    println!("Comprehensive report generated: {}", summary.report_path.display());
    Ok(())
}

fn cmd_classify(reading: Reading) -> Result<(), VitalwatchCliError> {
    let classified = AlertClassifier::classify(reading.at(Utc::now()));
    println!("{}", serde_json::to_string_pretty(&classified)?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), VitalwatchCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Vitalwatch version {}", VITALWATCH_VERSION),
    });

    let cfg = match config {
        Some(path) => match MonitorConfig::from_json_file(path) {
            Ok(cfg) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Configuration valid ({} patients, {} ms interval)",
                        cfg.population, cfg.tick_interval_ms
                    ),
                });
                Some(cfg)
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                });
                None
            }
        },
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "Using default configuration".to_string(),
            });
            Some(MonitorConfig::default())
        }
    };

    if let Some(cfg) = cfg {
        checks.push(check_report_dir(&cfg.report_path));
    }

    let stdout_check = if atty::is(atty::Stream::Stdout) {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is a TTY (live alert output)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdout".to_string(),
            status: CheckStatus::Ok,
            message: "stdout is redirected (consider --quiet)".to_string(),
        }
    };
    checks.push(stdout_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VITALWATCH_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Vitalwatch Doctor Report");
        println!("========================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(VitalwatchCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_report_dir(report_path: &Path) -> DoctorCheck {
    let dir = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    match std::fs::metadata(&dir) {
        Ok(meta) if !meta.is_dir() => DoctorCheck {
            name: "report_dir".to_string(),
            status: CheckStatus::Error,
            message: format!("{} is not a directory", dir.display()),
        },
        Ok(meta) if meta.permissions().readonly() => DoctorCheck {
            name: "report_dir".to_string(),
            status: CheckStatus::Error,
            message: format!("{} is read-only", dir.display()),
        },
        Ok(_) => DoctorCheck {
            name: "report_dir".to_string(),
            status: CheckStatus::Ok,
            message: format!("Report will be written to {}", report_path.display()),
        },
        Err(e) => DoctorCheck {
            name: "report_dir".to_string(),
            status: CheckStatus::Warning,
            message: format!("Cannot access {}: {}", dir.display(), e),
        },
    }
}

// Error types

#[derive(Debug)]
enum VitalwatchCliError {
    Monitor(MonitorError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<MonitorError> for VitalwatchCliError {
    fn from(e: MonitorError) -> Self {
        VitalwatchCliError::Monitor(e)
    }
}

impl From<serde_json::Error> for VitalwatchCliError {
    fn from(e: serde_json::Error) -> Self {
        VitalwatchCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<VitalwatchCliError> for CliError {
    fn from(e: VitalwatchCliError) -> Self {
        match e {
            VitalwatchCliError::Monitor(e) => {
                let (code, hint) = match &e {
                    MonitorError::InvalidConfig { .. } | MonitorError::ConfigRead { .. } => {
                        ("CONFIG_ERROR", "Run 'vitalwatch doctor' to check the configuration")
                    }
                    MonitorError::ReportExport { .. } => {
                        ("REPORT_ERROR", "Check that the report directory exists and is writable")
                    }
                    MonitorError::Json(_) => ("JSON_ERROR", "Check JSON syntax"),
                    MonitorError::UnknownPatient(_) | MonitorError::InvalidTransition { .. } => {
                        ("MONITOR_ERROR", "This is likely a bug; please report it")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            VitalwatchCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            VitalwatchCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
