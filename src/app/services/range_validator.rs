//! Physical range validation
//!
//! Each value is classified against the parameter's thresholds, first match
//! wins:
//!
//! 1. `value < min` - critical
//! 2. `value > max` - critical
//! 3. `value < warn_min` - warning
//! 4. `value > warn_max` - warning
//! 5. otherwise ok
//!
//! Bounds are closed: a value equal to `max` is still ok. A parameter without
//! registered thresholds is ok, since the absence of a rule is not a finding.

use crate::config::{RangeThresholds, ThresholdRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeSeverity {
    Ok,
    Warning,
    Critical,
}

impl RangeSeverity {
    /// Contribution of one result to the range validity score
    pub fn weight(self) -> f64 {
        match self {
            RangeSeverity::Ok => 1.0,
            RangeSeverity::Warning => 0.5,
            RangeSeverity::Critical => 0.0,
        }
    }
}

impl fmt::Display for RangeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSeverity::Ok => write!(f, "ok"),
            RangeSeverity::Warning => write!(f, "warning"),
            RangeSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Which bound a value crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    Min,
    Max,
    WarnMin,
    WarnMax,
}

/// Classification of a single value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeCheckResult {
    pub value: f64,
    pub parameter: String,
    pub severity: RangeSeverity,
    pub message: String,
    pub threshold_violated: Option<ThresholdKind>,
}

impl RangeCheckResult {
    fn new(
        value: f64,
        parameter: &str,
        severity: RangeSeverity,
        message: String,
        threshold_violated: Option<ThresholdKind>,
    ) -> Self {
        Self {
            value,
            parameter: parameter.to_string(),
            severity,
            message,
            threshold_violated,
        }
    }
}

/// Counts of results by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSummary {
    pub ok: usize,
    pub warning: usize,
    pub critical: usize,
    pub total: usize,
}

impl RangeSummary {
    pub fn from_results(results: &[RangeCheckResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.severity {
                RangeSeverity::Ok => summary.ok += 1,
                RangeSeverity::Warning => summary.warning += 1,
                RangeSeverity::Critical => summary.critical += 1,
            }
        }
        summary
    }

    /// Weighted validity score (0-100); 100 when there is nothing to judge
    pub fn score(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        let weighted = self.ok as f64 * RangeSeverity::Ok.weight()
            + self.warning as f64 * RangeSeverity::Warning.weight();
        weighted * 100.0 / self.total as f64
    }

    /// Number of values outside the normal band
    pub fn flagged(&self) -> usize {
        self.warning + self.critical
    }
}

/// Classify one value
///
/// # Arguments
///
/// * `value` - Measured value
/// * `parameter` - Threshold key such as `temperature`
/// * `registry` - Registered thresholds
/// * `custom` - Thresholds that take precedence over the registry
pub fn check_range(
    value: f64,
    parameter: &str,
    registry: &ThresholdRegistry,
    custom: Option<&RangeThresholds>,
) -> RangeCheckResult {
    let Some(thresholds) = custom.or_else(|| registry.range_for(parameter)) else {
        return RangeCheckResult::new(
            value,
            parameter,
            RangeSeverity::Ok,
            format!("No thresholds defined for {}", parameter),
            None,
        );
    };

    let (warn_min, warn_max) = (thresholds.warn_min(), thresholds.warn_max());

    if value < thresholds.min {
        RangeCheckResult::new(
            value,
            parameter,
            RangeSeverity::Critical,
            format!("{} value {} is below minimum {}", parameter, value, thresholds.min),
            Some(ThresholdKind::Min),
        )
    } else if value > thresholds.max {
        RangeCheckResult::new(
            value,
            parameter,
            RangeSeverity::Critical,
            format!("{} value {} is above maximum {}", parameter, value, thresholds.max),
            Some(ThresholdKind::Max),
        )
    } else if value < warn_min {
        RangeCheckResult::new(
            value,
            parameter,
            RangeSeverity::Warning,
            format!("{} value {} is unusually low (below {})", parameter, value, warn_min),
            Some(ThresholdKind::WarnMin),
        )
    } else if value > warn_max {
        RangeCheckResult::new(
            value,
            parameter,
            RangeSeverity::Warning,
            format!("{} value {} is unusually high (above {})", parameter, value, warn_max),
            Some(ThresholdKind::WarnMax),
        )
    } else {
        RangeCheckResult::new(
            value,
            parameter,
            RangeSeverity::Ok,
            format!("{} value {} is within normal range", parameter, value),
            None,
        )
    }
}

/// Classify a series and count results by severity
pub fn validate_observations(
    values: &[f64],
    parameter: &str,
    registry: &ThresholdRegistry,
) -> (Vec<RangeCheckResult>, RangeSummary) {
    let results: Vec<RangeCheckResult> = values
        .iter()
        .map(|value| check_range(*value, parameter, registry, None))
        .collect();
    let summary = RangeSummary::from_results(&results);

    debug!(
        "Range check for {}: {} ok, {} warning, {} critical",
        parameter, summary.ok, summary.warning, summary.critical
    );

    (results, summary)
}

/// Weighted score over results: ok 1.0, warning 0.5, critical 0.0
pub fn range_validity_score(results: &[RangeCheckResult]) -> f64 {
    RangeSummary::from_results(results).score()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ThresholdRegistry {
        ThresholdRegistry::default()
    }

    #[test]
    fn test_normal_temperature_is_ok() {
        let result = check_range(15.0, "temperature", &registry(), None);
        assert_eq!(result.severity, RangeSeverity::Ok);
        assert_eq!(result.threshold_violated, None);
        assert!(result.message.contains("within normal range"));
    }

    #[test]
    fn test_below_minimum_is_critical() {
        let result = check_range(-70.0, "temperature", &registry(), None);
        assert_eq!(result.severity, RangeSeverity::Critical);
        assert_eq!(result.threshold_violated, Some(ThresholdKind::Min));
        assert_eq!(result.message, "temperature value -70 is below minimum -60");
    }

    #[test]
    fn test_above_maximum_is_critical() {
        let result = check_range(100.0, "temperature", &registry(), None);
        assert_eq!(result.severity, RangeSeverity::Critical);
        assert_eq!(result.threshold_violated, Some(ThresholdKind::Max));
    }

    #[test]
    fn test_warning_bands() {
        let low = check_range(-55.0, "temperature", &registry(), None);
        assert_eq!(low.severity, RangeSeverity::Warning);
        assert_eq!(low.threshold_violated, Some(ThresholdKind::WarnMin));
        assert!(low.message.contains("unusually low"));

        let high = check_range(45.0, "temperature", &registry(), None);
        assert_eq!(high.severity, RangeSeverity::Warning);
        assert_eq!(high.threshold_violated, Some(ThresholdKind::WarnMax));
        assert!(high.message.contains("unusually high (above 40)"));
    }

    #[test]
    fn test_bounds_are_closed() {
        assert_eq!(
            check_range(55.0, "temperature", &registry(), None).severity,
            RangeSeverity::Warning
        );
        assert_eq!(
            check_range(100.0, "humidity", &registry(), None).severity,
            RangeSeverity::Ok
        );
        assert_eq!(
            check_range(40.0, "temperature", &registry(), None).severity,
            RangeSeverity::Ok
        );
    }

    #[test]
    fn test_unknown_parameter_is_ok() {
        let result = check_range(9999.0, "visibility", &registry(), None);
        assert_eq!(result.severity, RangeSeverity::Ok);
        assert_eq!(result.message, "No thresholds defined for visibility");
    }

    #[test]
    fn test_custom_thresholds_take_precedence() {
        let strict = RangeThresholds::new(0.0, 30.0, 5.0, 25.0).unwrap();
        let result = check_range(28.0, "temperature", &registry(), Some(&strict));
        assert_eq!(result.severity, RangeSeverity::Warning);

        let critical_only = RangeThresholds::critical_only(0.0, 10.0).unwrap();
        let result = check_range(10.0, "anything", &registry(), Some(&critical_only));
        assert_eq!(result.severity, RangeSeverity::Ok);
    }

    #[test]
    fn test_validate_observations_summary() {
        let (results, summary) =
            validate_observations(&[5.0, 10.0, 100.0, 45.0, -55.0], "temperature", &registry());

        assert_eq!(results.len(), 5);
        assert_eq!(
            summary,
            RangeSummary {
                ok: 2,
                warning: 2,
                critical: 1,
                total: 5
            }
        );
        assert_eq!(summary.flagged(), 3);
    }

    #[test]
    fn test_range_validity_score_weights_warnings_half() {
        let (results, summary) =
            validate_observations(&[5.0, 10.0, 15.0, 20.0, 45.0], "temperature", &registry());
        assert_eq!(range_validity_score(&results), 90.0);
        assert_eq!(summary.score(), 90.0);
    }

    #[test]
    fn test_range_validity_score_extremes() {
        assert_eq!(range_validity_score(&[]), 100.0);

        let (results, _) = validate_observations(&[100.0, -100.0], "temperature", &registry());
        assert_eq!(range_validity_score(&results), 0.0);
    }
}
