//! SMHI Data Quality Monitor Library
//!
//! A Rust library for assessing the trustworthiness of time-stamped sensor
//! observations retrieved from the SMHI meteorological and hydrological
//! open-data APIs.
//!
//! This library provides tools for:
//! - Fetching observation series with bounded retries, exponential backoff and
//!   rate-limit awareness
//! - Structural (schema) validation of raw API responses
//! - Physical range validation against per-parameter thresholds
//! - Completeness and gap analysis of timestamp series
//! - Multi-method statistical anomaly detection (z-score, IQR, rate of change)
//! - Weighted composite quality scoring, grading and station/system reports

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod anomaly_detector;
        pub mod api_client;
        pub mod completeness;
        pub mod evaluation;
        pub mod quality;
        pub mod range_validator;
        pub mod result_cache;
        pub mod schema_validator;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{ApiSource, Observation, ObservationSet, Period, StationInfo};
pub use app::services::quality::{Grade, QualityComponents, QualityScore};
pub use config::Config;

/// Result type alias for the quality monitor
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for fetching and configuring quality evaluations
///
/// Numeric analyzers never produce these; they are total over their input.
/// Schema violations are likewise reported as validation results rather than
/// errors, since they only degrade the score.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Network failure, timeout or server error after all retries
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Non-retryable 4xx response (other than 429)
    #[error("Client error: HTTP {status} from {url}")]
    Client { status: u16, url: String },

    /// HTTP 429 from the upstream API
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Successful response whose body could not be decoded
    #[error("Response decoding error: {message}")]
    Decode { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Processing interrupted
    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

impl Error {
    /// Create a transport error with an optional underlying cause
    pub fn transport(message: impl Into<String>, source: Option<reqwest::Error>) -> Self {
        Self::Transport {
            message: message.into(),
            source,
        }
    }

    /// Create a client error for a non-retryable status
    pub fn client(status: u16, url: impl Into<String>) -> Self {
        Self::Client {
            status,
            url: url.into(),
        }
    }

    /// Create a rate-limited error
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Create a decoding error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a configuration parse error
    pub fn config_parse(path: impl Into<String>, source: toml::de::Error) -> Self {
        Self::ConfigParse {
            path: path.into(),
            source,
        }
    }

    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a processing interrupted error
    pub fn processing_interrupted(reason: impl Into<String>) -> Self {
        Self::ProcessingInterrupted {
            reason: reason.into(),
        }
    }

    /// Whether the failure was transient (worth retrying later)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RateLimited { .. })
    }

    /// Whether the upstream API signalled rate limiting
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// HTTP status associated with the failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Client { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport {
            message: error.to_string(),
            source: Some(error),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode {
            message: error.to_string(),
        }
    }
}
