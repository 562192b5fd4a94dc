//! Application constants for the quality monitor
//!
//! This module contains the API endpoints, default thresholds and scoring
//! policy values used throughout the quality monitor.

// =============================================================================
// SMHI API Endpoints
// =============================================================================

/// Base URL for the meteorological observations API (primary source)
pub const METOBS_BASE_URL: &str = "https://opendata-download-metobs.smhi.se/api";

/// Base URL for the hydrological observations API (secondary source)
pub const HYDROOBS_BASE_URL: &str = "https://opendata-download-hydroobs.smhi.se/api";

/// API version segment used in every request path
pub const API_VERSION: &str = "1.0";

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("SMHI-Data-Quality-Monitor/", env!("CARGO_PKG_VERSION"));

/// Valid period keys for observation data requests
pub const VALID_PERIODS: &[&str] = &[
    "latest-hour",
    "latest-day",
    "latest-months",
    "corrected-archive",
];

// =============================================================================
// Fetcher Defaults
// =============================================================================

/// Request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Maximum number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Exponential backoff multiplier (delay = factor^attempt units)
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Largest accepted backoff multiplier
pub const MAX_BACKOFF_FACTOR: f64 = 10.0;

/// Upper bound on a single backoff wait, in seconds
pub const MAX_BACKOFF_DELAY_SECS: u64 = 300;

/// Wait assumed when a 429 response carries no Retry-After header
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

// =============================================================================
// Meteorological Parameter IDs
// =============================================================================

/// SMHI parameter identifiers and the threshold keys they map to
pub mod parameters {
    /// Hourly air temperature (°C)
    pub const TEMPERATURE: u32 = 1;

    /// Hourly mean wind speed (m/s)
    pub const WIND_SPEED: u32 = 4;

    /// Hourly relative humidity (%)
    pub const HUMIDITY: u32 = 6;

    /// Daily precipitation (mm)
    pub const PRECIPITATION: u32 = 7;

    pub const TEMPERATURE_KEY: &str = "temperature";
    pub const WIND_SPEED_KEY: &str = "wind_speed";
    pub const HUMIDITY_KEY: &str = "humidity";
    pub const PRECIPITATION_KEY: &str = "precipitation";
    pub const WATER_LEVEL_KEY: &str = "water_level";
    pub const UNKNOWN_KEY: &str = "unknown";
}

/// Default meteorological stations (id, name)
pub const DEFAULT_METOBS_STATIONS: &[(u32, &str)] = &[
    (98210, "Stockholm-Observatoriekullen"),
    (71420, "Göteborg A"),
    (52350, "Malmö A"),
    (162880, "Luleå flygplats"),
    (134110, "Östersund-Frösön"),
];

/// Default hydrological stations (id, name)
pub const DEFAULT_HYDROOBS_STATIONS: &[(u32, &str)] =
    &[(2361, "Stockholms ström"), (2251, "Göta älv")];

// =============================================================================
// Range Threshold Defaults
// =============================================================================

/// Physical range thresholds: (parameter, min, max, warn_min, warn_max)
pub const DEFAULT_RANGE_THRESHOLDS: &[(&str, f64, f64, f64, f64)] = &[
    ("temperature", -60.0, 55.0, -50.0, 40.0),
    ("wind_speed", 0.0, 80.0, 0.0, 35.0),
    ("precipitation", 0.0, 300.0, 0.0, 100.0),
    ("humidity", 0.0, 100.0, 0.0, 100.0),
    ("water_level", -10.0, 20.0, -5.0, 15.0),
];

/// Maximum plausible change between consecutive samples, per parameter
pub const DEFAULT_RATE_OF_CHANGE_THRESHOLDS: &[(&str, f64)] = &[
    ("temperature", 10.0),
    ("wind_speed", 20.0),
    ("humidity", 30.0),
];

// =============================================================================
// Anomaly Detection Defaults
// =============================================================================

/// Standard deviations from the mean before a value is flagged
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

/// IQR multiplier for outlier bounds
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Minimum series lengths for each detector
pub const ZSCORE_MIN_POINTS: usize = 3;
pub const IQR_MIN_POINTS: usize = 4;
pub const RATE_OF_CHANGE_MIN_POINTS: usize = 2;

// =============================================================================
// Completeness Defaults
// =============================================================================

/// Expected sampling interval in seconds (hourly data)
pub const DEFAULT_EXPECTED_INTERVAL_SECS: i64 = 3600;

/// Minimum acceptable completeness percentage
pub const DEFAULT_MIN_COMPLETENESS_PERCENT: f64 = 90.0;

/// A delta larger than this multiple of the expected interval is a gap
pub const GAP_TOLERANCE_FACTOR: f64 = 1.5;

// =============================================================================
// Scoring Policy
// =============================================================================

/// Default component weights (must sum to 1.0)
pub mod weights {
    pub const SCHEMA_VALIDITY: f64 = 0.20;
    pub const COMPLETENESS: f64 = 0.30;
    pub const RANGE_VALIDITY: f64 = 0.25;
    pub const ANOMALY_RATE: f64 = 0.25;

    /// Allowed absolute deviation of the weight sum from 1.0
    pub const SUM_TOLERANCE: f64 = 1e-6;
}

/// Component score below which a recommendation is emitted
pub const GOOD_COMPONENT_BAR: f64 = 90.0;

/// Grade lower bounds (inclusive)
pub const GRADE_A_MIN: f64 = 90.0;
pub const GRADE_B_MIN: f64 = 80.0;
pub const GRADE_C_MIN: f64 = 70.0;
pub const GRADE_D_MIN: f64 = 60.0;

// =============================================================================
// Cross-station Classification and Caching
// =============================================================================

/// Share of stations that must be affected for a weather event
pub const DEFAULT_SCOPE_THRESHOLD_PERCENT: f64 = 50.0;

/// Window within which anomalies count as simultaneous, in seconds
pub const DEFAULT_SCOPE_WINDOW_SECS: i64 = 3600;

/// Time-to-live for cached evaluation results, in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Number of anomalies listed in text reports
pub const REPORT_TOP_ANOMALIES: usize = 5;

/// Default number of concurrent station fetches
pub const DEFAULT_WORKERS: usize = 4;
