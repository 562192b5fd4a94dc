//! Cross-station anomaly scope classification
//!
//! An anomaly that shows up at many stations within the same window is more
//! likely a real weather event than a faulty sensor. Findings are
//! informational and do not feed into quality scores.

use crate::constants::{DEFAULT_SCOPE_THRESHOLD_PERCENT, DEFAULT_SCOPE_WINDOW_SECS};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeClassification {
    /// Seen at too few stations; probably local to one sensor
    SensorIssue,
    /// Seen at enough stations to be a regional phenomenon
    WeatherEvent,
}

impl fmt::Display for ScopeClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeClassification::SensorIssue => write!(f, "sensor_issue"),
            ScopeClassification::WeatherEvent => write!(f, "weather_event"),
        }
    }
}

/// One group of near-simultaneous anomalies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeFinding {
    /// First timestamp of the group
    pub timestamp: DateTime<Utc>,
    pub classification: ScopeClassification,
    pub affected_stations: Vec<String>,
    /// `"affected/total"`
    pub stations_affected: String,
    pub percent_affected: f64,
}

/// Scope parameters
#[derive(Debug, Clone, Copy)]
pub struct ScopeSettings {
    pub threshold_percent: f64,
    pub window: Duration,
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            threshold_percent: DEFAULT_SCOPE_THRESHOLD_PERCENT,
            window: Duration::seconds(DEFAULT_SCOPE_WINDOW_SECS),
        }
    }
}

/// Group anomaly timestamps across stations and classify each group
///
/// The union of all timestamps is sorted and grouped greedily: a timestamp
/// joins the current group while it is within `window` of the group's first
/// timestamp. A station counts as affected by a group when any of its
/// timestamps lies within `window` of any group member. Groups reaching
/// `threshold_percent` of stations are weather events.
///
/// # Arguments
///
/// * `station_anomalies` - Anomaly timestamps per station label; stations
///   without anomalies still count towards the total
/// * `settings` - Threshold percentage and simultaneity window
pub fn classify_anomaly_scope(
    station_anomalies: &BTreeMap<String, Vec<DateTime<Utc>>>,
    settings: ScopeSettings,
) -> Vec<ScopeFinding> {
    let total_stations = station_anomalies.len();
    if total_stations == 0 {
        return Vec::new();
    }

    let mut all_timestamps: Vec<DateTime<Utc>> =
        station_anomalies.values().flatten().copied().collect();
    all_timestamps.sort();
    all_timestamps.dedup();

    let Some((&first, rest)) = all_timestamps.split_first() else {
        return Vec::new();
    };

    let mut groups: Vec<Vec<DateTime<Utc>>> = Vec::new();
    let mut current = vec![first];
    for &timestamp in rest {
        if timestamp - current[0] <= settings.window {
            current.push(timestamp);
        } else {
            groups.push(std::mem::replace(&mut current, vec![timestamp]));
        }
    }
    groups.push(current);

    groups
        .into_iter()
        .map(|group| {
            let affected_stations: Vec<String> = station_anomalies
                .iter()
                .filter(|(_, timestamps)| {
                    timestamps.iter().any(|ts| {
                        group
                            .iter()
                            .any(|member| (*ts - *member).abs() <= settings.window)
                    })
                })
                .map(|(station, _)| station.clone())
                .collect();

            let percent_affected = affected_stations.len() as f64 / total_stations as f64 * 100.0;
            let classification = if percent_affected >= settings.threshold_percent {
                ScopeClassification::WeatherEvent
            } else {
                ScopeClassification::SensorIssue
            };

            ScopeFinding {
                timestamp: group[0],
                classification,
                stations_affected: format!("{}/{}", affected_stations.len(), total_stations),
                affected_stations,
                percent_affected,
            }
        })
        .collect()
}
