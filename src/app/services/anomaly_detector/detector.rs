//! Combined multi-method detection and anomaly-rate metrics

use super::anomaly::{Anomaly, AnomalyMethod};
use super::iqr::detect_iqr_anomalies;
use super::rate_of_change::detect_rate_of_change_anomalies;
use super::zscore::detect_zscore_anomalies;
use crate::config::{AnomalyConfig, ThresholdRegistry};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Runs the configured detectors over a series and merges their findings
///
/// Findings from different methods on the same sample are all kept; the
/// merged list is only ordered by timestamp.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
    thresholds: ThresholdRegistry,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig, thresholds: ThresholdRegistry) -> Self {
        Self { config, thresholds }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Run every configured method and return a timestamp-ordered list
    pub fn detect_all(
        &self,
        values: &[f64],
        timestamps: &[DateTime<Utc>],
        parameter: &str,
    ) -> Vec<Anomaly> {
        self.detect_with(values, timestamps, parameter, &self.config.methods)
    }

    /// Run only `methods`, in combinator order regardless of slice order
    pub fn detect_with(
        &self,
        values: &[f64],
        timestamps: &[DateTime<Utc>],
        parameter: &str,
        methods: &[AnomalyMethod],
    ) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        for method in AnomalyMethod::all() {
            if !methods.contains(&method) {
                continue;
            }
            let found = match method {
                AnomalyMethod::Zscore => detect_zscore_anomalies(
                    values,
                    timestamps,
                    self.config.zscore_threshold,
                    self.config.zscore_window,
                ),
                AnomalyMethod::Iqr => {
                    detect_iqr_anomalies(values, timestamps, self.config.iqr_multiplier)
                }
                AnomalyMethod::RateOfChange => detect_rate_of_change_anomalies(
                    values,
                    timestamps,
                    parameter,
                    &self.thresholds,
                    None,
                ),
            };
            debug!("{} flagged {} values for {}", method, found.len(), parameter);
            anomalies.extend(found);
        }

        // Stable, so same-timestamp findings keep method order
        anomalies.sort_by_key(|anomaly| anomaly.timestamp);
        anomalies
    }
}

/// Run `methods` (all when `None`) with default thresholds
pub fn detect_all_anomalies(
    values: &[f64],
    timestamps: &[DateTime<Utc>],
    parameter: &str,
    methods: Option<&[AnomalyMethod]>,
) -> Vec<Anomaly> {
    let detector = AnomalyDetector::default();
    match methods {
        Some(methods) => detector.detect_with(values, timestamps, parameter, methods),
        None => detector.detect_all(values, timestamps, parameter),
    }
}

/// Percentage of observations that were flagged
pub fn anomaly_rate(anomalies: &[Anomaly], total_observations: usize) -> f64 {
    if total_observations == 0 {
        return 0.0;
    }
    anomalies.len() as f64 / total_observations as f64 * 100.0
}

/// Quality score for an anomaly rate, 100 meaning nothing flagged
pub fn anomaly_score(anomaly_rate: f64) -> f64 {
    (100.0 - anomaly_rate).max(0.0)
}
