//! Configuration management and validation.
//!
//! Provides typed configuration for the fetch layer, per-parameter
//! thresholds, anomaly detection, completeness analysis and scoring weights.
//! Every structure validates its invariants at construction; configuration
//! loaded from TOML is re-validated as a whole by [`Config::validate`].

use crate::app::models::ApiSource;
use crate::app::services::anomaly_detector::AnomalyMethod;
use crate::constants::{self, weights};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

// =============================================================================
// Range Thresholds
// =============================================================================

/// Physical bounds for one parameter
///
/// Values outside `[min, max]` are physically implausible (critical);
/// values outside `[warn_min, warn_max]` are unusual (warning). Absent warn
/// bounds fall back to `min`/`max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeThresholds {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_max: Option<f64>,
}

impl RangeThresholds {
    /// Create thresholds with warning bounds
    pub fn new(min: f64, max: f64, warn_min: f64, warn_max: f64) -> Result<Self> {
        let thresholds = Self {
            min,
            max,
            warn_min: Some(warn_min),
            warn_max: Some(warn_max),
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Create thresholds without warning bounds
    pub fn critical_only(min: f64, max: f64) -> Result<Self> {
        let thresholds = Self {
            min,
            max,
            warn_min: None,
            warn_max: None,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Effective lower warning bound
    pub fn warn_min(&self) -> f64 {
        self.warn_min.unwrap_or(self.min)
    }

    /// Effective upper warning bound
    pub fn warn_max(&self) -> f64 {
        self.warn_max.unwrap_or(self.max)
    }

    /// Check `min <= warn_min <= warn_max <= max`
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.min, self.warn_min(), self.warn_max(), self.max];
        if bounds.iter().any(|b| b.is_nan()) {
            return Err(Error::configuration("Range thresholds cannot be NaN"));
        }
        if !bounds.windows(2).all(|pair| pair[0] <= pair[1]) {
            return Err(Error::configuration(format!(
                "Range thresholds must satisfy min <= warn_min <= warn_max <= max, got {} <= {} <= {} <= {}",
                self.min,
                self.warn_min(),
                self.warn_max(),
                self.max
            )));
        }
        Ok(())
    }
}

/// Per-parameter range and rate-of-change thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdRegistry {
    pub range: BTreeMap<String, RangeThresholds>,
    pub rate_of_change: BTreeMap<String, f64>,
}

impl Default for ThresholdRegistry {
    fn default() -> Self {
        let range = constants::DEFAULT_RANGE_THRESHOLDS
            .iter()
            .map(|&(name, min, max, warn_min, warn_max)| {
                (
                    name.to_string(),
                    RangeThresholds {
                        min,
                        max,
                        warn_min: Some(warn_min),
                        warn_max: Some(warn_max),
                    },
                )
            })
            .collect();

        let rate_of_change = constants::DEFAULT_RATE_OF_CHANGE_THRESHOLDS
            .iter()
            .map(|&(name, threshold)| (name.to_string(), threshold))
            .collect();

        Self {
            range,
            rate_of_change,
        }
    }
}

impl ThresholdRegistry {
    /// Registry with no thresholds at all
    pub fn empty() -> Self {
        Self {
            range: BTreeMap::new(),
            rate_of_change: BTreeMap::new(),
        }
    }

    /// Register or replace range thresholds for a parameter
    pub fn with_range(mut self, parameter: impl Into<String>, thresholds: RangeThresholds) -> Self {
        self.range.insert(parameter.into(), thresholds);
        self
    }

    /// Register or replace the rate-of-change threshold for a parameter
    pub fn with_rate_of_change(mut self, parameter: impl Into<String>, threshold: f64) -> Self {
        self.rate_of_change.insert(parameter.into(), threshold);
        self
    }

    /// Range thresholds for a parameter, if registered
    pub fn range_for(&self, parameter: &str) -> Option<&RangeThresholds> {
        self.range.get(parameter)
    }

    /// Rate-of-change threshold for a parameter, if registered
    pub fn rate_of_change_for(&self, parameter: &str) -> Option<f64> {
        self.rate_of_change.get(parameter).copied()
    }

    /// Fill in built-in thresholds for parameters the registry lacks
    ///
    /// A configuration file that overrides one parameter keeps the defaults
    /// for all others.
    pub fn merged_with_defaults(mut self) -> Self {
        let defaults = Self::default();
        for (parameter, thresholds) in defaults.range {
            self.range.entry(parameter).or_insert(thresholds);
        }
        for (parameter, threshold) in defaults.rate_of_change {
            self.rate_of_change.entry(parameter).or_insert(threshold);
        }
        self
    }

    /// Validate every registered threshold
    pub fn validate(&self) -> Result<()> {
        for (parameter, thresholds) in &self.range {
            thresholds.validate().map_err(|e| {
                Error::configuration(format!("Parameter '{}': {}", parameter, e))
            })?;
        }
        for (parameter, threshold) in &self.rate_of_change {
            if threshold.is_nan() || *threshold <= 0.0 {
                return Err(Error::configuration(format!(
                    "Rate-of-change threshold for '{}' must be positive, got {}",
                    parameter, threshold
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Scoring Weights
// =============================================================================

/// Component weights for the composite quality score
///
/// Weights must be non-negative and sum to 1.0. They are checked here and
/// never normalised at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub schema_validity: f64,
    pub completeness: f64,
    pub range_validity: f64,
    pub anomaly_rate: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            schema_validity: weights::SCHEMA_VALIDITY,
            completeness: weights::COMPLETENESS,
            range_validity: weights::RANGE_VALIDITY,
            anomaly_rate: weights::ANOMALY_RATE,
        }
    }
}

impl ScoringWeights {
    /// Create validated weights
    pub fn new(
        schema_validity: f64,
        completeness: f64,
        range_validity: f64,
        anomaly_rate: f64,
    ) -> Result<Self> {
        let weights = Self {
            schema_validity,
            completeness,
            range_validity,
            anomaly_rate,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Sum of all weights
    pub fn sum(&self) -> f64 {
        self.schema_validity + self.completeness + self.range_validity + self.anomaly_rate
    }

    /// Check non-negativity and that the weights sum to 1.0
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.schema_validity,
            self.completeness,
            self.range_validity,
            self.anomaly_rate,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::configuration(format!(
                "Scoring weights must be finite and non-negative, got {:?}",
                all
            )));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > weights::SUM_TOLERANCE {
            return Err(Error::configuration(format!(
                "Scoring weights must sum to 1.0, got {:.6}",
                sum
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Analyzer Settings
// =============================================================================

/// Anomaly detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Z-score threshold in standard deviations
    pub zscore_threshold: f64,

    /// IQR multiplier for outlier bounds
    pub iqr_multiplier: f64,

    /// Rolling window for causal z-scores (None = global)
    pub zscore_window: Option<usize>,

    /// Detectors to run
    pub methods: Vec<AnomalyMethod>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            zscore_threshold: constants::DEFAULT_ZSCORE_THRESHOLD,
            iqr_multiplier: constants::DEFAULT_IQR_MULTIPLIER,
            zscore_window: None,
            methods: AnomalyMethod::all().to_vec(),
        }
    }
}

impl AnomalyConfig {
    pub fn with_zscore_threshold(mut self, threshold: f64) -> Self {
        self.zscore_threshold = threshold;
        self
    }

    pub fn with_iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = multiplier;
        self
    }

    pub fn with_zscore_window(mut self, window: usize) -> Self {
        self.zscore_window = Some(window);
        self
    }

    pub fn with_methods(mut self, methods: &[AnomalyMethod]) -> Self {
        self.methods = methods.to_vec();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.zscore_threshold > 0.0) {
            return Err(Error::configuration(format!(
                "Z-score threshold must be positive, got {}",
                self.zscore_threshold
            )));
        }
        if !(self.iqr_multiplier >= 0.0) {
            return Err(Error::configuration(format!(
                "IQR multiplier cannot be negative, got {}",
                self.iqr_multiplier
            )));
        }
        if self.zscore_window == Some(0) {
            return Err(Error::configuration("Z-score window cannot be zero"));
        }
        Ok(())
    }
}

/// Completeness analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletenessConfig {
    /// Expected sampling interval in seconds
    pub expected_interval_secs: i64,

    /// Minimum acceptable completeness percentage
    pub min_completeness: f64,
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        Self {
            expected_interval_secs: constants::DEFAULT_EXPECTED_INTERVAL_SECS,
            min_completeness: constants::DEFAULT_MIN_COMPLETENESS_PERCENT,
        }
    }
}

impl CompletenessConfig {
    /// Expected interval as a chrono duration
    pub fn expected_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expected_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.expected_interval_secs <= 0 {
            return Err(Error::configuration(format!(
                "Expected interval must be positive, got {}s",
                self.expected_interval_secs
            )));
        }
        if !(0.0..=100.0).contains(&self.min_completeness) {
            return Err(Error::configuration(format!(
                "Minimum completeness must be within 0-100, got {}",
                self.min_completeness
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Fetch Settings
// =============================================================================

/// HTTP fetch and retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub metobs_base_url: String,
    pub hydroobs_base_url: String,
    pub api_version: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Retries after the first attempt
    pub max_retries: u32,

    /// Backoff multiplier; the wait before retry n is factor^n units
    pub backoff_factor: f64,

    /// Length of one backoff unit in milliseconds
    pub backoff_unit_ms: u64,

    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            metobs_base_url: constants::METOBS_BASE_URL.to_string(),
            hydroobs_base_url: constants::HYDROOBS_BASE_URL.to_string(),
            api_version: constants::API_VERSION.to_string(),
            timeout_ms: constants::DEFAULT_TIMEOUT_MS,
            max_retries: constants::DEFAULT_MAX_RETRIES,
            backoff_factor: constants::DEFAULT_BACKOFF_FACTOR,
            backoff_unit_ms: 1000,
            user_agent: constants::USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    /// Base URL for an API source
    pub fn base_url(&self, source: ApiSource) -> &str {
        match source {
            ApiSource::MetObs => &self.metobs_base_url,
            ApiSource::HydroObs => &self.hydroobs_base_url,
        }
    }

    /// Point both sources at one base URL (mock servers, proxies)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.metobs_base_url = url.clone();
        self.hydroobs_base_url = url;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit_ms = unit.as_millis() as u64;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::configuration("Request timeout must be positive"));
        }
        if !(1.0..=constants::MAX_BACKOFF_FACTOR).contains(&self.backoff_factor) {
            return Err(Error::configuration(format!(
                "Backoff factor must be between 1.0 and {}, got {}",
                constants::MAX_BACKOFF_FACTOR,
                self.backoff_factor
            )));
        }
        for url in [&self.metobs_base_url, &self.hydroobs_base_url] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::configuration(format!(
                    "Base URL must be http(s), got '{}'",
                    url
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Top-level Configuration
// =============================================================================

/// Global configuration for quality evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub thresholds: ThresholdRegistry,
    pub weights: ScoringWeights,
    pub anomaly: AnomalyConfig,
    pub completeness: CompletenessConfig,

    /// Concurrent station fetches in batch comparisons
    pub workers: usize,

    /// Time-to-live for cached evaluations, in seconds
    pub cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            thresholds: ThresholdRegistry::default(),
            weights: ScoringWeights::default(),
            anomaly: AnomalyConfig::default(),
            completeness: CompletenessConfig::default(),
            workers: constants::DEFAULT_WORKERS.min(num_cpus::get().max(1) * 2),
            cache_ttl_secs: constants::DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::io(
                format!("Failed to read configuration file {}", path.display()),
                e,
            )
        })?;
        let config = Self::from_toml_str(&content, &path.display().to_string())?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| Error::config_parse(origin, e))?;
        config.thresholds = config.thresholds.merged_with_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, the user config file, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_config_path() {
            Some(default_path) if default_path.exists() => Self::load(&default_path),
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `~/.config/quality-monitor/config.toml` (platform equivalent)
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quality-monitor").join("config.toml"))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_anomaly(mut self, anomaly: AnomalyConfig) -> Self {
        self.anomaly = anomaly;
        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.fetch.validate()?;
        self.thresholds.validate()?;
        self.weights.validate()?;
        self.anomaly.validate()?;
        self.completeness.validate()?;
        if self.workers == 0 {
            return Err(Error::configuration("Worker count must be at least 1"));
        }
        Ok(())
    }
}
