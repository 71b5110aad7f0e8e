//! Alert report building
//!
//! Turns an [`AlertLog`] snapshot into an [`AlertReport`]: a title, a
//! generation timestamp, and one table per alerting patient with columns
//! Timestamp, Temperature, Heart Rate, Oxygen Level, Blood Pressure and
//! Alert. The report can be rendered as HTML, JSON or plain text and written
//! to a single local file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::alert_log::AlertLog;
use crate::error::MonitorError;
use crate::{PRODUCER_NAME, VITALWATCH_VERSION};

pub const REPORT_TITLE: &str = "Comprehensive Alert Report";
pub const COLUMNS: [&str; 6] = [
    "Timestamp",
    "Temperature",
    "Heart Rate",
    "Oxygen Level",
    "Blood Pressure",
    "Alert",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Html,
    Json,
    Text,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
            ReportFormat::Text => "text",
        }
    }

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Json => "json",
            ReportFormat::Text => "txt",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(ReportFormat::Html),
            "json" => Ok(ReportFormat::Json),
            "text" | "txt" => Ok(ReportFormat::Text),
            other => Err(MonitorError::invalid_config(
                "report_format",
                format!("unsupported format `{other}`"),
            )),
        }
    }
}

/// One table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub heart_rate: u32,
    pub oxygen_saturation: f64,
    pub blood_pressure: String,
    pub reason: String,
}

impl ReportRow {
    fn cells(&self) -> [String; 6] {
        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", self.temperature),
            self.heart_rate.to_string(),
            format!("{:.2}", self.oxygen_saturation),
            self.blood_pressure.clone(),
            self.reason.clone(),
        ]
    }
}

/// Table section for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub patient_name: String,
    pub rows: Vec<ReportRow>,
}

impl ReportSection {
    pub fn heading(&self) -> String {
        format!("Alert Report for {}", self.patient_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub report_id: String,
    pub producer: String,
    pub total_alerts: usize,
    pub sections: Vec<ReportSection>,
}

/// Builder for alert reports
pub struct ReportBuilder;

impl ReportBuilder {
    /// Build the grouped, ordered report data from a log snapshot
    pub fn build(log: &AlertLog, generated_at: DateTime<Utc>) -> AlertReport {
        let sections: Vec<ReportSection> = log
            .group_by_patient()
            .into_iter()
            .map(|group| ReportSection {
                patient_name: group.patient_name,
                rows: group
                    .events
                    .iter()
                    .map(|event| ReportRow {
                        timestamp: event.sample.timestamp,
                        temperature: event.sample.temperature,
                        heart_rate: event.sample.heart_rate,
                        oxygen_saturation: event.sample.oxygen_saturation,
                        blood_pressure: event.sample.blood_pressure(),
                        reason: event.reason_text(),
                    })
                    .collect(),
            })
            .collect();

        AlertReport {
            title: REPORT_TITLE.to_string(),
            generated_at,
            report_id: Uuid::new_v4().to_string(),
            producer: format!("{PRODUCER_NAME}/{VITALWATCH_VERSION}"),
            total_alerts: log.len(),
            sections,
        }
    }

    pub fn render(report: &AlertReport, format: ReportFormat) -> Result<String, MonitorError> {
        match format {
            ReportFormat::Html => Ok(render_html(report)),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            ReportFormat::Text => Ok(render_text(report)),
        }
    }

    /// Build, render and write the report for `log` to `path`.
    ///
    /// The log is only borrowed, so a failed write can be retried.
    pub fn export(
        log: &AlertLog,
        path: &Path,
        format: ReportFormat,
        generated_at: DateTime<Utc>,
    ) -> Result<PathBuf, MonitorError> {
        let report = Self::build(log, generated_at);
        let document = Self::render(&report, format)?;
        std::fs::write(path, document).map_err(|source| MonitorError::ReportExport {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            path = %path.display(),
            format = format.as_str(),
            patients = report.sections.len(),
            alerts = report.total_alerts,
            "Comprehensive report generated"
        );
        Ok(path.to_path_buf())
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_html(report: &AlertReport) -> String {
    let mut html = String::new();
    let title = escape_html(&report.title);

    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>{title}</title>");
    let _ = writeln!(
        html,
        "<style>\nbody {{ font-family: Helvetica, Arial, sans-serif; margin: 2em; }}\n\
         table {{ border-collapse: collapse; width: 100%; margin-bottom: 24px; }}\n\
         th {{ background: grey; color: whitesmoke; font-size: 10pt; padding: 6px; }}\n\
         td {{ background: beige; font-size: 8pt; padding: 6px; text-align: center; }}\n\
         th, td {{ border: 1px solid black; }}\n</style>"
    );
    let _ = writeln!(html, "</head>\n<body>");
    let _ = writeln!(html, "<h1>{title}</h1>");
    let _ = writeln!(
        html,
        "<p>Generated on: {}</p>",
        report.generated_at.format(TIMESTAMP_FORMAT)
    );

    if report.sections.is_empty() {
        let _ = writeln!(html, "<p>No alerts recorded.</p>");
    }

    for section in &report.sections {
        let _ = writeln!(html, "<h2>{}</h2>", escape_html(&section.heading()));
        let _ = writeln!(html, "<table>\n<tr>");
        for column in COLUMNS {
            let _ = writeln!(html, "<th>{column}</th>");
        }
        let _ = writeln!(html, "</tr>");
        for row in &section.rows {
            let _ = write!(html, "<tr>");
            for cell in row.cells() {
                let _ = write!(html, "<td>{}</td>", escape_html(&cell));
            }
            let _ = writeln!(html, "</tr>");
        }
        let _ = writeln!(html, "</table>");
    }

    let _ = writeln!(html, "</body>\n</html>");
    html
}

fn render_text(report: &AlertReport) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{}", report.title);
    let _ = writeln!(
        text,
        "Generated on: {}",
        report.generated_at.format(TIMESTAMP_FORMAT)
    );
    let _ = writeln!(text);

    if report.sections.is_empty() {
        let _ = writeln!(text, "No alerts recorded.");
    }

    for section in &report.sections {
        let _ = writeln!(text, "{}", section.heading());
        let _ = writeln!(text, "{}", COLUMNS.join(" | "));
        for row in &section.rows {
            let _ = writeln!(text, "{}", row.cells().join(" | "));
        }
        let _ = writeln!(text);
    }
    text
}
