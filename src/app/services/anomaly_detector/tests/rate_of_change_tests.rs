//! Tests for rate-of-change detection

use super::hourly_timestamps;
use crate::app::services::anomaly_detector::{
    AnomalyMethod, AnomalySeverity, detect_rate_of_change_anomalies,
};
use crate::config::ThresholdRegistry;

#[test]
fn test_gradual_change_is_not_flagged() {
    let values: Vec<f64> = (0..10).map(|i| 5.0 + 0.3 * i as f64).collect();
    let anomalies = detect_rate_of_change_anomalies(
        &values,
        &hourly_timestamps(10),
        "temperature",
        &ThresholdRegistry::default(),
        None,
    );
    assert!(anomalies.is_empty());
}

#[test]
fn test_rapid_change_flags_later_sample() {
    let values = [5.0, 5.2, 5.1, 20.0, 5.3, 5.2, 5.1, 5.0, 5.1, 5.2];
    let timestamps = hourly_timestamps(10);
    let anomalies = detect_rate_of_change_anomalies(
        &values,
        &timestamps,
        "temperature",
        &ThresholdRegistry::default(),
        None,
    );

    // 5.1 -> 20.0 and 20.0 -> 5.3 both exceed the 10 degree limit
    assert_eq!(anomalies.len(), 2);
    assert_eq!(anomalies[0].method, AnomalyMethod::RateOfChange);
    assert_eq!(anomalies[0].value, 20.0);
    assert_eq!(anomalies[0].timestamp, timestamps[3]);
    assert!((anomalies[0].deviation - 1.49).abs() < 1e-9);
    assert_eq!(anomalies[0].severity, AnomalySeverity::Low);
    assert_eq!(
        anomalies[0].message,
        "Rapid change of 14.90 from previous value 5.1"
    );
}

#[test]
fn test_custom_threshold_overrides_registry() {
    let values = [5.0, 8.0, 5.0, 8.0, 5.0, 8.0, 5.0, 8.0, 5.0, 8.0];
    let registry = ThresholdRegistry::default();

    let with_default =
        detect_rate_of_change_anomalies(&values, &hourly_timestamps(10), "temperature", &registry, None);
    assert!(with_default.is_empty());

    let strict = detect_rate_of_change_anomalies(
        &values,
        &hourly_timestamps(10),
        "temperature",
        &registry,
        Some(2.0),
    );
    assert_eq!(strict.len(), 9);
}

#[test]
fn test_unknown_parameter_never_flags() {
    let values = [0.0, 1000.0, -1000.0];
    let anomalies = detect_rate_of_change_anomalies(
        &values,
        &hourly_timestamps(3),
        "visibility",
        &ThresholdRegistry::default(),
        None,
    );
    assert!(anomalies.is_empty());
}

#[test]
fn test_severity_from_ratio() {
    let values = [0.0, 35.0, 10.0];
    let anomalies = detect_rate_of_change_anomalies(
        &values,
        &hourly_timestamps(3),
        "temperature",
        &ThresholdRegistry::default(),
        None,
    );

    assert_eq!(anomalies.len(), 2);
    assert_eq!(anomalies[0].severity, AnomalySeverity::High);
    assert_eq!(anomalies[1].severity, AnomalySeverity::Medium);
}

#[test]
fn test_single_value_returns_empty() {
    let anomalies = detect_rate_of_change_anomalies(
        &[5.0],
        &hourly_timestamps(1),
        "temperature",
        &ThresholdRegistry::default(),
        Some(0.1),
    );
    assert!(anomalies.is_empty());
}
