//! Global and rolling z-score detection

use super::anomaly::{Anomaly, AnomalyMethod, AnomalySeverity};
use crate::constants::ZSCORE_MIN_POINTS;
use chrono::{DateTime, Utc};

/// Flag values more than `threshold` population standard deviations from the
/// mean
///
/// With `window_size` set and smaller than the series, each point from index
/// `window_size` on is compared against the preceding window only. A window
/// (or series) with zero spread flags nothing.
///
/// # Arguments
///
/// * `values` - Measured values
/// * `timestamps` - Timestamp of each value; extra entries on either side are
///   ignored
/// * `threshold` - Z-score above which a value is anomalous
/// * `window_size` - Rolling window length, `None` for the whole series
pub fn detect_zscore_anomalies(
    values: &[f64],
    timestamps: &[DateTime<Utc>],
    threshold: f64,
    window_size: Option<usize>,
) -> Vec<Anomaly> {
    let len = values.len().min(timestamps.len());
    if len < ZSCORE_MIN_POINTS {
        return Vec::new();
    }
    let values = &values[..len];

    let mut anomalies = Vec::new();

    match window_size.filter(|window| *window > 0 && *window < len) {
        Some(window) => {
            for i in window..len {
                let (mean, std) = mean_and_std(&values[i - window..i]);
                if std <= 0.0 {
                    continue;
                }
                let z = ((values[i] - mean) / std).abs();
                if z > threshold {
                    anomalies.push(zscore_anomaly(
                        timestamps[i],
                        values[i],
                        z,
                        format!("Value {} is {:.1} std devs from rolling mean", values[i], z),
                    ));
                }
            }
        }
        None => {
            let (mean, std) = mean_and_std(values);
            if std > 0.0 {
                for (i, value) in values.iter().enumerate() {
                    let z = ((value - mean) / std).abs();
                    if z > threshold {
                        anomalies.push(zscore_anomaly(
                            timestamps[i],
                            *value,
                            z,
                            format!("Value {} is {:.1} std devs from mean", value, z),
                        ));
                    }
                }
            }
        }
    }

    anomalies
}

/// Mean and population standard deviation
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn zscore_anomaly(timestamp: DateTime<Utc>, value: f64, z: f64, message: String) -> Anomaly {
    Anomaly {
        timestamp,
        value,
        method: AnomalyMethod::Zscore,
        severity: AnomalySeverity::from_zscore(z),
        message,
        deviation: z,
    }
}
