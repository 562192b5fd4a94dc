//! Interquartile-range outlier detection

use super::anomaly::{Anomaly, AnomalyMethod, AnomalySeverity};
use crate::constants::IQR_MIN_POINTS;
use chrono::{DateTime, Utc};

/// Flag values outside `[Q1 - m*IQR, Q3 + m*IQR]`
///
/// Deviation is the distance past the nearest quartile in IQR units, or 0
/// when the IQR is zero.
pub fn detect_iqr_anomalies(
    values: &[f64],
    timestamps: &[DateTime<Utc>],
    multiplier: f64,
) -> Vec<Anomaly> {
    let len = values.len().min(timestamps.len());
    if len < IQR_MIN_POINTS {
        return Vec::new();
    }
    let values = &values[..len];

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    let iqr = q3 - q1;

    let lower_bound = q1 - multiplier * iqr;
    let upper_bound = q3 + multiplier * iqr;

    let scaled = |distance: f64| if iqr > 0.0 { distance / iqr } else { 0.0 };

    values
        .iter()
        .zip(timestamps)
        .filter_map(|(&value, &timestamp)| {
            let (deviation, message) = if value < lower_bound {
                (
                    scaled(q1 - value),
                    format!("Value {} is below IQR lower bound {:.2}", value, lower_bound),
                )
            } else if value > upper_bound {
                (
                    scaled(value - q3),
                    format!("Value {} is above IQR upper bound {:.2}", value, upper_bound),
                )
            } else {
                return None;
            };

            Some(Anomaly {
                timestamp,
                value,
                method: AnomalyMethod::Iqr,
                severity: AnomalySeverity::from_iqr_deviation(deviation),
                message,
                deviation,
            })
        })
        .collect()
}

/// Percentile of ascending-sorted data with linear interpolation between
/// closest ranks
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => return 0.0,
        1 => return sorted[0],
        _ => {}
    }
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
