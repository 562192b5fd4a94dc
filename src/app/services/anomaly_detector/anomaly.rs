//! Anomaly findings and their classification enums

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistical test that produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyMethod {
    Zscore,
    Iqr,
    RateOfChange,
}

impl AnomalyMethod {
    /// Every method, in the order the combinator runs them
    pub fn all() -> [AnomalyMethod; 3] {
        [
            AnomalyMethod::Zscore,
            AnomalyMethod::Iqr,
            AnomalyMethod::RateOfChange,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyMethod::Zscore => "zscore",
            AnomalyMethod::Iqr => "iqr",
            AnomalyMethod::RateOfChange => "rate_of_change",
        }
    }
}

impl fmt::Display for AnomalyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal severity of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

impl AnomalySeverity {
    /// Classify a z-score: >5 high, >4 medium
    pub fn from_zscore(z: f64) -> Self {
        Self::escalate(z, 5.0, 4.0)
    }

    /// Classify an IQR multiple beyond the quartile: >3 high, >2 medium
    pub fn from_iqr_deviation(deviation: f64) -> Self {
        Self::escalate(deviation, 3.0, 2.0)
    }

    /// Classify a change-to-threshold ratio: >3 high, >2 medium
    pub fn from_change_ratio(ratio: f64) -> Self {
        Self::escalate(ratio, 3.0, 2.0)
    }

    fn escalate(measure: f64, high_above: f64, medium_above: f64) -> Self {
        if measure > high_above {
            AnomalySeverity::High
        } else if measure > medium_above {
            AnomalySeverity::Medium
        } else {
            AnomalySeverity::Low
        }
    }
}

impl fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalySeverity::Low => write!(f, "low"),
            AnomalySeverity::Medium => write!(f, "medium"),
            AnomalySeverity::High => write!(f, "high"),
        }
    }
}

/// A value flagged by one detector
///
/// `deviation` is method specific: the z-score, the IQR multiple beyond the
/// nearest quartile, or the change-to-threshold ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub method: AnomalyMethod,
    pub severity: AnomalySeverity,
    pub message: String,
    pub deviation: f64,
}
