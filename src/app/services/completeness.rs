//! Completeness and gap analysis for timestamp series
//!
//! Expected sample count comes from the analysis window and the sampling
//! interval. Consecutive samples further apart than 1.5 intervals form a gap,
//! so minor jitter in an otherwise regular series is not reported.

use crate::config::CompletenessConfig;
use crate::constants::GAP_TOLERANCE_FACTOR;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A hole in a timestamp series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// Last sample before the gap
    pub start: DateTime<Utc>,
    /// First sample after the gap
    pub end: DateTime<Utc>,
    pub duration_secs: i64,
    /// Expected samples strictly between `start` and `end`
    pub missing_count: u64,
}

impl Gap {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Outcome of a completeness analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessResult {
    pub total_expected: u64,
    pub total_present: u64,
    pub completeness_percent: f64,
    pub gaps: Vec<Gap>,
    pub longest_gap: Option<Gap>,
    pub passes_threshold: bool,
}

impl CompletenessResult {
    /// Result for a series with no samples at all
    pub fn empty() -> Self {
        Self {
            total_expected: 0,
            total_present: 0,
            completeness_percent: 0.0,
            gaps: Vec::new(),
            longest_gap: None,
            passes_threshold: false,
        }
    }

    pub fn missing_total(&self) -> u64 {
        self.gaps.iter().map(|gap| gap.missing_count).sum()
    }
}

/// Analyse a series against an expected sampling interval
///
/// Input need not be sorted. Window bounds default to the first and last
/// timestamp. An empty series yields [`CompletenessResult::empty`], which
/// fails the threshold.
///
/// # Arguments
///
/// * `timestamps` - Observation timestamps
/// * `expected_interval` - Nominal spacing between samples
/// * `window_start` - Start of the analysis window
/// * `window_end` - End of the analysis window
/// * `min_completeness` - Percentage needed to pass
pub fn analyze_completeness(
    timestamps: &[DateTime<Utc>],
    expected_interval: Duration,
    window_start: Option<DateTime<Utc>>,
    window_end: Option<DateTime<Utc>>,
    min_completeness: f64,
) -> CompletenessResult {
    let mut sorted = timestamps.to_vec();
    sorted.sort();

    let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
        return CompletenessResult::empty();
    };

    let interval_ms = expected_interval.num_milliseconds().max(1);
    let start = window_start.unwrap_or(first);
    let end = window_end.unwrap_or(last);

    let span_ms = (end - start).num_milliseconds();
    let total_expected = (span_ms.div_euclid(interval_ms) + 1).max(1) as u64;
    let total_present = sorted.len() as u64;

    let gap_threshold_ms = interval_ms as f64 * GAP_TOLERANCE_FACTOR;
    let gaps: Vec<Gap> = sorted
        .windows(2)
        .filter_map(|pair| {
            let delta = pair[1] - pair[0];
            let delta_ms = delta.num_milliseconds();
            if (delta_ms as f64) <= gap_threshold_ms {
                return None;
            }
            Some(Gap {
                start: pair[0],
                end: pair[1],
                duration_secs: delta.num_seconds(),
                missing_count: (delta_ms / interval_ms - 1).max(0) as u64,
            })
        })
        .collect();

    // First of equally long gaps wins
    let longest_gap = gaps
        .iter()
        .fold(None::<&Gap>, |longest, gap| match longest {
            Some(current) if current.duration() >= gap.duration() => Some(current),
            _ => Some(gap),
        })
        .cloned();

    let completeness_percent = (total_present as f64 * 100.0 / total_expected as f64).min(100.0);

    debug!(
        "Completeness: {}/{} samples ({:.1}%), {} gaps",
        total_present,
        total_expected,
        completeness_percent,
        gaps.len()
    );

    CompletenessResult {
        total_expected,
        total_present,
        completeness_percent,
        gaps,
        longest_gap,
        passes_threshold: completeness_percent >= min_completeness,
    }
}

/// Analyse a full series with configured interval and threshold
pub fn analyze_with_config(
    timestamps: &[DateTime<Utc>],
    config: &CompletenessConfig,
) -> CompletenessResult {
    analyze_completeness(
        timestamps,
        config.expected_interval(),
        None,
        None,
        config.min_completeness,
    )
}

/// Completeness component of the quality score
pub fn completeness_score(result: &CompletenessResult) -> f64 {
    result.completeness_percent
}

/// One human-readable line per gap
pub fn format_gap_report(gaps: &[Gap]) -> Vec<String> {
    gaps.iter()
        .map(|gap| {
            format!(
                "Gap from {} to {} ({}, {} missing observations)",
                gap.start.to_rfc3339(),
                gap.end.to_rfc3339(),
                format_duration(gap.duration()),
                gap.missing_count
            )
        })
        .collect()
}

/// `H:MM:SS`, prefixed with whole days when longer than a day
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().abs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    let sign = if duration < Duration::zero() { "-" } else { "" };

    match days {
        0 => format!("{}{}:{:02}:{:02}", sign, hours, minutes, seconds),
        1 => format!("{}1 day, {}:{:02}:{:02}", sign, hours, minutes, seconds),
        _ => format!("{}{} days, {}:{:02}:{:02}", sign, days, hours, minutes, seconds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hours(offsets: &[i64]) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        offsets.iter().map(|h| base + Duration::hours(*h)).collect()
    }

    #[test]
    fn test_complete_series_has_no_gaps() {
        let offsets: Vec<i64> = (0..24).collect();
        let result = analyze_completeness(&hours(&offsets), Duration::hours(1), None, None, 90.0);

        assert_eq!(result.total_expected, 24);
        assert_eq!(result.total_present, 24);
        assert_eq!(result.completeness_percent, 100.0);
        assert!(result.gaps.is_empty());
        assert!(result.longest_gap.is_none());
        assert!(result.passes_threshold);
    }

    #[test]
    fn test_single_gap_detected() {
        let result = analyze_completeness(
            &hours(&[0, 1, 2, 6, 7, 8, 9]),
            Duration::hours(1),
            None,
            None,
            90.0,
        );

        assert_eq!(result.gaps.len(), 1);
        let gap = &result.gaps[0];
        assert_eq!(gap.missing_count, 3);
        assert_eq!(gap.duration(), Duration::hours(4));
        assert_eq!(result.longest_gap.as_ref(), Some(gap));
        assert_eq!(result.total_expected, 10);
        assert_eq!(result.completeness_percent, 70.0);
        assert!(!result.passes_threshold);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let result = analyze_completeness(
            &hours(&[9, 0, 6, 2, 8, 1, 7]),
            Duration::hours(1),
            None,
            None,
            90.0,
        );
        assert_eq!(result.gaps.len(), 1);
        assert_eq!(result.gaps[0].start, hours(&[2])[0]);
    }

    #[test]
    fn test_empty_input_fails_threshold() {
        let result = analyze_completeness(&[], Duration::hours(1), None, None, 90.0);
        assert_eq!(result, CompletenessResult::empty());
        assert!(!result.passes_threshold);
    }

    #[test]
    fn test_single_timestamp_is_complete() {
        let result = analyze_completeness(&hours(&[5]), Duration::hours(1), None, None, 90.0);
        assert_eq!(result.total_expected, 1);
        assert_eq!(result.completeness_percent, 100.0);
    }

    #[test]
    fn test_jitter_within_tolerance_is_not_a_gap() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamps = vec![
            base,
            base + Duration::minutes(70),
            base + Duration::minutes(150),
        ];
        let result = analyze_completeness(&timestamps, Duration::hours(1), None, None, 90.0);
        assert!(result.gaps.is_empty());
    }

    #[test]
    fn test_explicit_window_counts_leading_absence() {
        let series = hours(&[12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23]);
        let window_start = hours(&[0])[0];
        let result = analyze_completeness(
            &series,
            Duration::hours(1),
            Some(window_start),
            None,
            90.0,
        );

        assert_eq!(result.total_expected, 24);
        assert_eq!(result.completeness_percent, 50.0);
        assert!(result.gaps.is_empty());
    }

    #[test]
    fn test_duplicates_cap_percent_at_hundred() {
        let result = analyze_completeness(&hours(&[0, 0, 1, 1, 2]), Duration::hours(1), None, None, 90.0);
        assert_eq!(result.total_expected, 3);
        assert_eq!(result.completeness_percent, 100.0);
    }

    #[test]
    fn test_longest_gap_prefers_first_on_tie() {
        let result = analyze_completeness(
            &hours(&[0, 3, 4, 7, 8, 14]),
            Duration::hours(1),
            None,
            None,
            90.0,
        );

        assert_eq!(result.gaps.len(), 3);
        assert_eq!(result.longest_gap.as_ref().unwrap().missing_count, 5);
        assert_eq!(result.missing_total(), 9);

        let tied = analyze_completeness(&hours(&[0, 3, 6]), Duration::hours(1), None, None, 90.0);
        assert_eq!(tied.longest_gap.unwrap().start, hours(&[0])[0]);
    }

    #[test]
    fn test_completeness_score_equals_percent() {
        let result = analyze_completeness(
            &hours(&[0, 1, 2, 6, 7, 8, 9]),
            Duration::hours(1),
            None,
            None,
            90.0,
        );
        assert_eq!(completeness_score(&result), result.completeness_percent);
    }

    #[test]
    fn test_format_gap_report() {
        let result = analyze_completeness(
            &hours(&[0, 1, 2, 6, 7]),
            Duration::hours(1),
            None,
            None,
            90.0,
        );
        let lines = format_gap_report(&result.gaps);

        assert_eq!(
            lines,
            vec![
                "Gap from 2024-01-01T02:00:00+00:00 to 2024-01-01T06:00:00+00:00 \
                 (4:00:00, 3 missing observations)"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_format_duration_with_days() {
        assert_eq!(format_duration(Duration::minutes(90)), "1:30:00");
        assert_eq!(format_duration(Duration::hours(26)), "1 day, 2:00:00");
        assert_eq!(format_duration(Duration::hours(50)), "2 days, 2:00:00");
    }
}
