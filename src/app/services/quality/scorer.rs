//! Weighted composite quality scoring and letter grades

use crate::config::ScoringWeights;
use crate::constants::{GOOD_COMPONENT_BAR, GRADE_A_MIN, GRADE_B_MIN, GRADE_C_MIN, GRADE_D_MIN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Letter grade for an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Grade for a 0-100 score (inclusive lower bounds 90/80/70/60)
    pub fn from_score(score: f64) -> Self {
        if score >= GRADE_A_MIN {
            Grade::A
        } else if score >= GRADE_B_MIN {
            Grade::B
        } else if score >= GRADE_C_MIN {
            Grade::C
        } else if score >= GRADE_D_MIN {
            Grade::D
        } else {
            Grade::F
        }
    }

    /// D and F indicate degraded data quality
    pub fn is_poor(self) -> bool {
        matches!(self, Grade::D | Grade::F)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-component scores, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityComponents {
    pub schema_validity: f64,
    pub completeness: f64,
    pub range_validity: f64,
    pub anomaly_score: f64,
}

impl QualityComponents {
    /// Weighted sum of the components
    pub fn weighted(&self, weights: &ScoringWeights) -> f64 {
        self.schema_validity * weights.schema_validity
            + self.completeness * weights.completeness
            + self.range_validity * weights.range_validity
            + self.anomaly_score * weights.anomaly_rate
    }
}

/// Composite score with breakdown, grade and recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// 0-100, rounded to one decimal
    pub overall: f64,
    pub components: QualityComponents,
    pub grade: Grade,
    pub recommendation: String,
}

fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Round half to even at one decimal
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Combine validator outputs into one score
///
/// # Arguments
///
/// * `schema_valid` - Whether the raw response passed schema validation
/// * `completeness_percent` - Completeness (0-100)
/// * `range_validity_percent` - Weighted range validity (0-100)
/// * `anomaly_rate_percent` - Share of anomalous observations (0-100)
/// * `weights` - Component weights, already validated to sum to 1.0
///
/// # Returns
///
/// Score with components clamped to `[0, 100]`; the grade is taken from the
/// unrounded overall value
pub fn calculate_quality_score(
    schema_valid: bool,
    completeness_percent: f64,
    range_validity_percent: f64,
    anomaly_rate_percent: f64,
    weights: &ScoringWeights,
) -> QualityScore {
    let components = QualityComponents {
        schema_validity: if schema_valid { 100.0 } else { 0.0 },
        completeness: clamp_percent(completeness_percent),
        range_validity: clamp_percent(range_validity_percent),
        anomaly_score: clamp_percent(100.0 - anomaly_rate_percent),
    };

    let overall = components.weighted(weights);
    let grade = Grade::from_score(overall);
    let recommendation = component_recommendation(&components);

    debug!("Quality score {:.1} (grade {})", overall, grade);

    QualityScore {
        overall: round_one_decimal(overall),
        components,
        grade,
        recommendation,
    }
}

/// Combine station scores into one system-wide score
///
/// Components and overall are arithmetic means; the recommendation reports
/// how many stations grade D or F.
pub fn aggregate_station_scores(scores: &[QualityScore]) -> QualityScore {
    if scores.is_empty() {
        return QualityScore {
            overall: 0.0,
            components: QualityComponents::default(),
            grade: Grade::F,
            recommendation: "No data available for quality assessment".to_string(),
        };
    }

    let n = scores.len() as f64;
    let mean = |component: fn(&QualityComponents) -> f64| {
        scores.iter().map(|s| component(&s.components)).sum::<f64>() / n
    };

    let components = QualityComponents {
        schema_validity: mean(|c| c.schema_validity),
        completeness: mean(|c| c.completeness),
        range_validity: mean(|c| c.range_validity),
        anomaly_score: mean(|c| c.anomaly_score),
    };

    let overall = scores.iter().map(|s| s.overall).sum::<f64>() / n;
    let grade = Grade::from_score(overall);

    let mut grade_counts: BTreeMap<Grade, usize> = BTreeMap::new();
    for score in scores {
        *grade_counts.entry(score.grade).or_insert(0) += 1;
    }

    QualityScore {
        overall: round_one_decimal(overall),
        components,
        grade,
        recommendation: system_recommendation(&grade_counts, overall),
    }
}

fn component_recommendation(components: &QualityComponents) -> String {
    let mut issues = Vec::new();

    if components.schema_validity < 100.0 {
        issues.push("API response schema validation failed - check API compatibility".to_string());
    }
    if components.completeness < GOOD_COMPONENT_BAR {
        issues.push(format!(
            "Data completeness is low ({:.0}%) - investigate gaps",
            components.completeness
        ));
    }
    if components.range_validity < GOOD_COMPONENT_BAR {
        issues.push(format!(
            "Range validity concerns ({:.0}%) - sensor calibration may be needed",
            components.range_validity
        ));
    }
    if components.anomaly_score < GOOD_COMPONENT_BAR {
        issues.push(format!(
            "Elevated anomaly rate ({:.1}%) - review flagged values",
            100.0 - components.anomaly_score
        ));
    }

    if issues.is_empty() {
        "Data quality is excellent - no action required".to_string()
    } else {
        issues.join("; ")
    }
}

fn system_recommendation(grade_counts: &BTreeMap<Grade, usize>, overall: f64) -> String {
    let total: usize = grade_counts.values().sum();
    let poor: usize = grade_counts
        .iter()
        .filter(|(grade, _)| grade.is_poor())
        .map(|(_, count)| count)
        .sum();

    if overall >= GRADE_A_MIN {
        format!("System health excellent across {} stations", total)
    } else if poor > 0 {
        format!(
            "{} of {} stations have degraded data quality - investigate sensor issues",
            poor, total
        )
    } else if overall >= GRADE_C_MIN {
        "System health acceptable - minor issues at some stations".to_string()
    } else {
        "System-wide data quality concerns - comprehensive review needed".to_string()
    }
}
