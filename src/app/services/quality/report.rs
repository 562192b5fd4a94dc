//! Station and system reports
//!
//! Reports are immutable snapshots of an evaluation, ready for text output or
//! JSON serialisation.

use super::scorer::{Grade, QualityScore};
use crate::app::services::anomaly_detector::Anomaly;
use crate::constants::REPORT_TOP_ANOMALIES;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quality report for one station/parameter series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReport {
    pub station_id: u32,
    pub station_name: String,
    pub parameter_id: u32,
    pub parameter_name: String,
    pub time_window_start: DateTime<Utc>,
    pub time_window_end: DateTime<Utc>,
    pub observation_count: usize,
    pub quality_score: QualityScore,
    pub anomalies: Vec<Anomaly>,
    pub generated_at: DateTime<Utc>,
}

/// Identity and window of the series a report describes
#[derive(Debug, Clone)]
pub struct ReportSubject {
    pub station_id: u32,
    pub station_name: String,
    pub parameter_id: u32,
    pub parameter_name: String,
    pub time_window_start: DateTime<Utc>,
    pub time_window_end: DateTime<Utc>,
    pub observation_count: usize,
}

/// Package an evaluation into a report stamped with the current time
pub fn generate_station_report(
    subject: ReportSubject,
    quality_score: QualityScore,
    anomalies: Vec<Anomaly>,
) -> StationReport {
    StationReport {
        station_id: subject.station_id,
        station_name: subject.station_name,
        parameter_id: subject.parameter_id,
        parameter_name: subject.parameter_name,
        time_window_start: subject.time_window_start,
        time_window_end: subject.time_window_end,
        observation_count: subject.observation_count,
        quality_score,
        anomalies,
        generated_at: Utc::now(),
    }
}

/// Human-readable text block for one report
pub fn format_report_summary(report: &StationReport) -> String {
    let score = &report.quality_score;
    let components = &score.components;

    let mut lines = vec![
        format!("Quality Report: {}", report.station_name),
        format!("Parameter: {}", report.parameter_name),
        format!(
            "Period: {} to {}",
            report.time_window_start.date_naive(),
            report.time_window_end.date_naive()
        ),
        format!("Observations: {}", report.observation_count),
        String::new(),
        format!("Overall Score: {:.1}/100 (Grade: {})", score.overall, score.grade),
        String::new(),
        "Score Breakdown:".to_string(),
        format!("  Schema Validity: {:.0}%", components.schema_validity),
        format!("  Completeness: {:.0}%", components.completeness),
        format!("  Range Validity: {:.0}%", components.range_validity),
        format!("  Anomaly Score: {:.0}%", components.anomaly_score),
        String::new(),
        format!("Anomalies Detected: {}", report.anomalies.len()),
    ];

    if !report.anomalies.is_empty() {
        lines.push(String::new());
        lines.push("Top Anomalies:".to_string());
        for anomaly in report.anomalies.iter().take(REPORT_TOP_ANOMALIES) {
            lines.push(format!(
                "  - {}: {} ({})",
                anomaly.timestamp.format("%Y-%m-%d %H:%M:%S"),
                anomaly.value,
                anomaly.method
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!("Recommendation: {}", score.recommendation));

    lines.join("\n")
}

/// System-wide figures across station reports
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SystemSummary {
    pub total_stations: usize,
    pub total_observations: usize,
    pub average_score: f64,
    pub grade_distribution: BTreeMap<Grade, usize>,
    pub total_anomalies: usize,
    /// Stations graded D or F
    pub stations_with_issues: usize,
}

/// Summarise reports; empty input gives an all-zero summary
pub fn generate_system_summary(reports: &[StationReport]) -> SystemSummary {
    if reports.is_empty() {
        return SystemSummary::default();
    }

    let mut grade_distribution = BTreeMap::new();
    for report in reports {
        *grade_distribution
            .entry(report.quality_score.grade)
            .or_insert(0) += 1;
    }

    SystemSummary {
        total_stations: reports.len(),
        total_observations: reports.iter().map(|r| r.observation_count).sum(),
        average_score: reports.iter().map(|r| r.quality_score.overall).sum::<f64>()
            / reports.len() as f64,
        grade_distribution,
        total_anomalies: reports.iter().map(|r| r.anomalies.len()).sum(),
        stations_with_issues: reports
            .iter()
            .filter(|r| r.quality_score.grade.is_poor())
            .count(),
    }
}
