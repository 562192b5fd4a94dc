//! Tests for scoring and reporting


use super::report::{ReportSubject, StationReport, generate_station_report};
use super::scorer::calculate_quality_score;
use crate::app::services::anomaly_detector::{Anomaly, AnomalyMethod, AnomalySeverity};
use crate::config::ScoringWeights;
use chrono::{Duration, TimeZone, Utc};

/// Report for a station scored from the given validator outputs, with
/// `anomaly_count` IQR findings an hour apart
pub fn create_test_report(
    station_id: u32,
    completeness: f64,
    range_validity: f64,
    anomaly_rate: f64,
    anomaly_count: usize,
) -> StationReport {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let anomalies = (0..anomaly_count)
        .map(|i| Anomaly {
            timestamp: start + Duration::hours(i as i64),
            value: 40.0 + i as f64,
            method: AnomalyMethod::Iqr,
            severity: AnomalySeverity::Medium,
            message: "Value above IQR upper bound".to_string(),
            deviation: 2.5,
        })
        .collect();

    generate_station_report(
        ReportSubject {
            station_id,
            station_name: format!("Station {}", station_id),
            parameter_id: 1,
            parameter_name: "Lufttemperatur".to_string(),
            time_window_start: start,
            time_window_end: start + Duration::hours(23),
            observation_count: 24,
        },
        calculate_quality_score(
            true,
            completeness,
            range_validity,
            anomaly_rate,
            &ScoringWeights::default(),
        ),
        anomalies,
    )
}
