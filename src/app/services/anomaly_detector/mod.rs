//! Statistical anomaly detection for sensor series
//!
//! Three independent closed-form detectors share the signature
//! `(values, timestamps, ..) -> Vec<Anomaly>`:
//!
//! - [`zscore`] - global or causal rolling z-score (at least 3 points)
//! - [`iqr`] - interquartile-range fences (at least 4 points)
//! - [`rate_of_change`] - step size between consecutive samples against a
//!   per-parameter limit (at least 2 points)
//!
//! [`detector`] combines a selectable subset into one timestamp-ordered list
//! and converts anomaly counts into rates and scores. [`scope`] compares
//! anomaly timestamps across stations to tell sensor faults from regional
//! weather events.
//!
//! Every detector is total: short or degenerate series yield no findings
//! rather than an error.

pub mod anomaly;
pub mod detector;
pub mod iqr;
pub mod rate_of_change;
pub mod scope;
pub mod zscore;

#[cfg(test)]
mod tests;

pub use anomaly::{Anomaly, AnomalyMethod, AnomalySeverity};
pub use detector::{AnomalyDetector, anomaly_rate, anomaly_score, detect_all_anomalies};
pub use iqr::{detect_iqr_anomalies, percentile};
pub use rate_of_change::detect_rate_of_change_anomalies;
pub use scope::{ScopeClassification, ScopeFinding, ScopeSettings, classify_anomaly_scope};
pub use zscore::{detect_zscore_anomalies, mean_and_std};
