//! Rate-of-change spike detection

use super::anomaly::{Anomaly, AnomalyMethod, AnomalySeverity};
use crate::config::ThresholdRegistry;
use crate::constants::RATE_OF_CHANGE_MIN_POINTS;
use chrono::{DateTime, Utc};

/// Flag samples that moved more than the allowed step from their predecessor
///
/// The threshold is `custom_threshold` when positive, otherwise the
/// registry's value for `parameter`. Parameters without one are never
/// flagged. The later sample of each pair carries the finding.
pub fn detect_rate_of_change_anomalies(
    values: &[f64],
    timestamps: &[DateTime<Utc>],
    parameter: &str,
    thresholds: &ThresholdRegistry,
    custom_threshold: Option<f64>,
) -> Vec<Anomaly> {
    let len = values.len().min(timestamps.len());
    if len < RATE_OF_CHANGE_MIN_POINTS {
        return Vec::new();
    }

    let Some(threshold) = custom_threshold
        .filter(|t| *t > 0.0)
        .or_else(|| thresholds.rate_of_change_for(parameter))
    else {
        return Vec::new();
    };

    (1..len)
        .filter_map(|i| {
            let previous = values[i - 1];
            let change = (values[i] - previous).abs();
            if change.is_nan() || change <= threshold {
                return None;
            }
            let ratio = change / threshold;
            Some(Anomaly {
                timestamp: timestamps[i],
                value: values[i],
                method: AnomalyMethod::RateOfChange,
                severity: AnomalySeverity::from_change_ratio(ratio),
                message: format!(
                    "Rapid change of {:.2} from previous value {}",
                    change, previous
                ),
                deviation: ratio,
            })
        })
        .collect()
}
