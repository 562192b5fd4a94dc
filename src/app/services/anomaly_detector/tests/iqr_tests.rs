//! Tests for IQR detection

use super::{hourly_timestamps, normal_temperatures, temperatures_with_spike};
use crate::app::services::anomaly_detector::{
    AnomalyMethod, AnomalySeverity, detect_iqr_anomalies, percentile,
};

#[test]
fn test_clean_data_has_no_anomalies() {
    let anomalies = detect_iqr_anomalies(&normal_temperatures(), &hourly_timestamps(10), 1.5);
    assert!(anomalies.is_empty());
}

#[test]
fn test_outlier_detected() {
    let anomalies = detect_iqr_anomalies(&temperatures_with_spike(), &hourly_timestamps(10), 1.5);

    assert_eq!(anomalies.len(), 1);
    let anomaly = &anomalies[0];
    assert_eq!(anomaly.value, 45.0);
    assert_eq!(anomaly.method, AnomalyMethod::Iqr);
    assert_eq!(anomaly.severity, AnomalySeverity::High);
    assert!(anomaly.message.contains("above IQR upper bound"));
}

#[test]
fn test_low_outlier_reports_lower_bound() {
    let values = [10.0, 10.5, 11.0, 10.2, 10.8, -20.0];
    let anomalies = detect_iqr_anomalies(&values, &hourly_timestamps(6), 1.5);

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].value, -20.0);
    assert!(anomalies[0].message.contains("below IQR lower bound"));
}

#[test]
fn test_too_few_values_returns_empty() {
    let anomalies = detect_iqr_anomalies(&[5.0, 6.0, 70.0], &hourly_timestamps(3), 1.5);
    assert!(anomalies.is_empty());
}

#[test]
fn test_zero_iqr_gives_zero_deviation() {
    let values = [3.0, 3.0, 3.0, 3.0, 3.0, 9.0];
    let anomalies = detect_iqr_anomalies(&values, &hourly_timestamps(6), 1.5);

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].deviation, 0.0);
    assert_eq!(anomalies[0].severity, AnomalySeverity::Low);
}

#[test]
fn test_percentile_interpolates_linearly() {
    let sorted = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(percentile(&sorted, 25.0), 1.75);
    assert_eq!(percentile(&sorted, 50.0), 2.5);
    assert_eq!(percentile(&sorted, 75.0), 3.25);
    assert_eq!(percentile(&sorted, 100.0), 4.0);
    assert_eq!(percentile(&[], 50.0), 0.0);
}
