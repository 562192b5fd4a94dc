//! Tests for the anomaly detectors

mod iqr_tests;
mod rate_of_change_tests;

use chrono::{DateTime, Duration, TimeZone, Utc};

/// `count` hourly timestamps starting 2024-01-01 00:00 UTC
pub fn hourly_timestamps(count: usize) -> Vec<DateTime<Utc>> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..count)
        .map(|i| base + Duration::hours(i as i64))
        .collect()
}

/// Ordinary winter temperatures for Sweden
pub fn normal_temperatures() -> Vec<f64> {
    vec![5.2, 5.5, 5.8, 6.0, 5.9, 5.7, 5.4, 5.1, 4.8, 4.5]
}

/// Same series with a 45.0 spike at index 3
pub fn temperatures_with_spike() -> Vec<f64> {
    vec![5.2, 5.5, 5.8, 45.0, 5.9, 5.7, 5.4, 5.1, 4.8, 4.5]
}
