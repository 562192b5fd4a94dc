//! Data models for quality evaluation
//!
//! This module contains the core data structures for representing SMHI
//! station metadata and observation series, as produced by the API client
//! and consumed read-only by every validation engine.

use crate::constants::{self, VALID_PERIODS};
use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality flag used when an observation carries none
pub const UNKNOWN_QUALITY: &str = "unknown";

// =============================================================================
// API Source and Period
// =============================================================================

/// Which SMHI observation API a series comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiSource {
    /// Meteorological observations (primary)
    #[default]
    MetObs,
    /// Hydrological observations (secondary)
    HydroObs,
}

impl ApiSource {
    /// Default base URL for this source
    pub fn default_base_url(self) -> &'static str {
        match self {
            ApiSource::MetObs => constants::METOBS_BASE_URL,
            ApiSource::HydroObs => constants::HYDROOBS_BASE_URL,
        }
    }
}

impl fmt::Display for ApiSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiSource::MetObs => write!(f, "metobs"),
            ApiSource::HydroObs => write!(f, "hydroobs"),
        }
    }
}

impl FromStr for ApiSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "metobs" | "primary" => Ok(ApiSource::MetObs),
            "hydroobs" | "secondary" => Ok(ApiSource::HydroObs),
            other => Err(Error::configuration(format!(
                "Unknown API source '{}': must be metobs or hydroobs",
                other
            ))),
        }
    }
}

/// Data period understood by the observation endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Period {
    #[serde(rename = "latest-hour")]
    LatestHour,
    #[serde(rename = "latest-day")]
    LatestDay,
    #[default]
    #[serde(rename = "latest-months")]
    LatestMonths,
    #[serde(rename = "corrected-archive")]
    CorrectedArchive,
}

impl Period {
    /// Key used in the request path
    pub fn key(self) -> &'static str {
        match self {
            Period::LatestHour => VALID_PERIODS[0],
            Period::LatestDay => VALID_PERIODS[1],
            Period::LatestMonths => VALID_PERIODS[2],
            Period::CorrectedArchive => VALID_PERIODS[3],
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "latest-hour" => Ok(Period::LatestHour),
            "latest-day" => Ok(Period::LatestDay),
            "latest-months" => Ok(Period::LatestMonths),
            "corrected-archive" => Ok(Period::CorrectedArchive),
            other => Err(Error::configuration(format!(
                "Invalid period '{}': must be one of {}",
                other,
                VALID_PERIODS.join(", ")
            ))),
        }
    }
}

// =============================================================================
// Station and Parameter Metadata
// =============================================================================

/// Station entry from a station-list response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub active: bool,
}

/// Parameter entry from the API version resource list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub unit: String,
}

// =============================================================================
// Observations
// =============================================================================

/// A single observation sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub quality: String,
}

impl Observation {
    /// Create an observation from an epoch-millisecond timestamp
    ///
    /// Returns `None` when the timestamp is outside chrono's range.
    pub fn from_epoch_millis(millis: i64, value: f64, quality: Option<&str>) -> Option<Self> {
        let timestamp = Utc.timestamp_millis_opt(millis).single()?;
        Some(Self {
            timestamp,
            value,
            quality: quality.unwrap_or(UNKNOWN_QUALITY).to_string(),
        })
    }
}

/// All observations for one station/parameter fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    pub station_id: u32,
    pub station_name: String,
    pub parameter_id: u32,
    pub parameter_name: String,
    pub unit: String,
    pub observations: Vec<Observation>,
}

impl ObservationSet {
    /// Number of observations in the set
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Check if the set has no observations
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observation values in series order
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|obs| obs.value).collect()
    }

    /// Observation timestamps in series order
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.observations.iter().map(|obs| obs.timestamp).collect()
    }

    /// Earliest and latest timestamp, if any observations exist
    pub fn time_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.observations.iter().map(|obs| obs.timestamp).min()?;
        let end = self.observations.iter().map(|obs| obs.timestamp).max()?;
        Some((start, end))
    }
}
