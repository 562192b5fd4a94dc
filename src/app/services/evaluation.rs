//! End-to-end evaluation of observation series
//!
//! Ties the engines together: schema gate on the raw payload, range check,
//! completeness, anomaly detection, scoring and the station report. Batch
//! comparison fans station fetches out over a bounded number of concurrent
//! requests and keeps going when individual stations fail.

use crate::app::models::{ApiSource, ObservationSet, Period};
use crate::app::services::anomaly_detector::{
    Anomaly, AnomalyDetector, ScopeFinding, ScopeSettings, anomaly_rate, classify_anomaly_scope,
};
use crate::app::services::api_client::{FetchedObservations, ObservationClient};
use crate::app::services::completeness::{CompletenessResult, analyze_with_config, completeness_score};
use crate::app::services::quality::{
    QualityScore, ReportSubject, StationReport, SystemSummary, aggregate_station_scores,
    calculate_quality_score, generate_station_report, generate_system_summary,
};
use crate::app::services::range_validator::{RangeSummary, validate_observations};
use crate::app::services::result_cache::ResultCache;
use crate::app::services::schema_validator::{ValidationResult, validate_observation_response};
use crate::config::Config;
use crate::constants::parameters;
use crate::{Error, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Cache of evaluations keyed by `(station_id, parameter_id)`
pub type EvaluationCache = ResultCache<(u32, u32), StationEvaluation>;

/// Everything computed for one station/parameter series
#[derive(Debug, Clone)]
pub struct StationEvaluation {
    pub schema_valid: bool,
    pub schema_results: Vec<ValidationResult>,
    pub range_summary: RangeSummary,
    pub completeness: CompletenessResult,
    /// Share of observations flagged by any detector, in percent
    pub anomaly_rate: f64,
    pub report: StationReport,
}

impl StationEvaluation {
    pub fn station_id(&self) -> u32 {
        self.report.station_id
    }

    pub fn quality_score(&self) -> &QualityScore {
        &self.report.quality_score
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.report.anomalies
    }
}

/// Threshold key for a meteorological parameter id
pub fn parameter_name_for(parameter_id: u32) -> &'static str {
    match parameter_id {
        parameters::TEMPERATURE => parameters::TEMPERATURE_KEY,
        parameters::WIND_SPEED => parameters::WIND_SPEED_KEY,
        parameters::HUMIDITY => parameters::HUMIDITY_KEY,
        parameters::PRECIPITATION => parameters::PRECIPITATION_KEY,
        _ => parameters::UNKNOWN_KEY,
    }
}

/// Run range, completeness and anomaly analysis and score the series
///
/// # Arguments
///
/// * `set` - Parsed observation series
/// * `schema_valid` - Outcome of the schema gate on the raw payload
/// * `parameter_name` - Threshold key used for range and rate-of-change checks
/// * `config` - Thresholds, weights and detector settings
pub fn evaluate_observation_set(
    set: &ObservationSet,
    schema_valid: bool,
    parameter_name: &str,
    config: &Config,
) -> StationEvaluation {
    let values = set.values();
    let timestamps = set.timestamps();

    let (_, range_summary) = validate_observations(&values, parameter_name, &config.thresholds);
    let completeness = analyze_with_config(&timestamps, &config.completeness);

    let detector = AnomalyDetector::new(config.anomaly.clone(), config.thresholds.clone());
    let anomalies = detector.detect_all(&values, &timestamps, parameter_name);
    let rate = anomaly_rate(&anomalies, set.len());

    let quality_score = calculate_quality_score(
        schema_valid,
        completeness_score(&completeness),
        range_summary.score(),
        rate,
        &config.weights,
    );

    let now = Utc::now();
    let (time_window_start, time_window_end) = set.time_window().unwrap_or((now, now));
    let subject = ReportSubject {
        station_id: set.station_id,
        station_name: set.station_name.clone(),
        parameter_id: set.parameter_id,
        parameter_name: set.parameter_name.clone(),
        time_window_start,
        time_window_end,
        observation_count: set.len(),
    };

    info!(
        "Station {} ({}): score {:.1}, grade {}, {} anomalies in {} observations",
        set.station_id,
        set.station_name,
        quality_score.overall,
        quality_score.grade,
        anomalies.len(),
        set.len()
    );

    StationEvaluation {
        schema_valid,
        schema_results: Vec::new(),
        range_summary,
        completeness,
        anomaly_rate: rate,
        report: generate_station_report(subject, quality_score, anomalies),
    }
}

/// Schema-check a fetched payload, then evaluate its parsed series
pub fn evaluate_fetched(
    fetched: &FetchedObservations,
    source: ApiSource,
    parameter_name: &str,
    config: &Config,
) -> StationEvaluation {
    let (schema_valid, schema_results) = validate_observation_response(&fetched.raw, source);
    let mut evaluation = evaluate_observation_set(&fetched.set, schema_valid, parameter_name, config);
    evaluation.schema_results = schema_results;
    evaluation
}

/// Fetch and evaluate one station, consulting the cache first
pub async fn evaluate_station(
    client: &ObservationClient,
    station_id: u32,
    parameter_id: u32,
    period: Period,
    parameter_name: &str,
    config: &Config,
    cache: Option<&EvaluationCache>,
) -> Result<StationEvaluation> {
    let key = (station_id, parameter_id);
    if let Some(cached) = cache.and_then(|cache| cache.get(&key)) {
        debug!("Using cached evaluation for station {} parameter {}", station_id, parameter_id);
        return Ok(cached);
    }

    let fetched = client
        .get_observations(parameter_id, station_id, period)
        .await?;
    let evaluation = evaluate_fetched(&fetched, client.source(), parameter_name, config);

    if let Some(cache) = cache {
        cache.insert(key, evaluation.clone());
    }
    Ok(evaluation)
}

// =============================================================================
// Batch Comparison
// =============================================================================

/// Result of evaluating several stations
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Successful evaluations, sorted by station id
    pub evaluations: Vec<StationEvaluation>,
    /// Stations that could not be fetched, sorted by station id
    pub failures: Vec<(u32, Error)>,
}

impl BatchOutcome {
    pub fn reports(&self) -> Vec<StationReport> {
        self.evaluations.iter().map(|e| e.report.clone()).collect()
    }

    pub fn system_summary(&self) -> SystemSummary {
        generate_system_summary(&self.reports())
    }

    pub fn aggregate_score(&self) -> QualityScore {
        let scores: Vec<QualityScore> = self
            .evaluations
            .iter()
            .map(|e| e.quality_score().clone())
            .collect();
        aggregate_station_scores(&scores)
    }

    /// Cross-station classification of anomaly timestamps
    ///
    /// Stations are labelled `"name (id)"` so stations sharing a name stay
    /// distinct. Stations without anomalies still count towards the total.
    pub fn anomaly_scope(&self, settings: ScopeSettings) -> Vec<ScopeFinding> {
        let station_anomalies: BTreeMap<String, Vec<_>> = self
            .evaluations
            .iter()
            .map(|e| {
                (
                    format!("{} ({})", e.report.station_name, e.station_id()),
                    e.anomalies().iter().map(|a| a.timestamp).collect(),
                )
            })
            .collect();
        classify_anomaly_scope(&station_anomalies, settings)
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Evaluate several stations concurrently
///
/// At most `config.workers` fetches are in flight. A failing station is
/// logged and recorded in [`BatchOutcome::failures`]; the rest of the batch
/// still runs.
///
/// # Arguments
///
/// * `client` - Client for the API the stations belong to
/// * `station_ids` - Stations to evaluate
/// * `parameter_id` - Parameter fetched for every station
/// * `period` - Data period
/// * `parameter_name` - Threshold key for the parameter
/// * `config` - Evaluation settings
/// * `cache` - Optional evaluation cache
/// * `progress` - Optional progress bar advanced once per station
#[allow(clippy::too_many_arguments)]
pub async fn compare_stations(
    client: &ObservationClient,
    station_ids: &[u32],
    parameter_id: u32,
    period: Period,
    parameter_name: &str,
    config: &Config,
    cache: Option<&EvaluationCache>,
    progress: Option<&ProgressBar>,
) -> BatchOutcome {
    info!(
        "Comparing {} stations for parameter {} with {} workers",
        station_ids.len(),
        parameter_id,
        config.workers
    );

    let results: Vec<(u32, Result<StationEvaluation>)> = stream::iter(station_ids.iter().copied())
        .map(|station_id| async move {
            let result = evaluate_station(
                client,
                station_id,
                parameter_id,
                period,
                parameter_name,
                config,
                cache,
            )
            .await;
            (station_id, result)
        })
        .buffer_unordered(config.workers.max(1))
        .inspect(|_| {
            if let Some(pb) = progress {
                pb.inc(1);
            }
        })
        .collect()
        .await;

    let mut outcome = BatchOutcome::default();
    for (station_id, result) in results {
        match result {
            Ok(evaluation) => outcome.evaluations.push(evaluation),
            Err(e) => {
                error!("Station {} failed: {}", station_id, e);
                outcome.failures.push((station_id, e));
            }
        }
    }
    outcome.evaluations.sort_by_key(StationEvaluation::station_id);
    outcome.failures.sort_by_key(|(station_id, _)| *station_id);

    info!(
        "Batch complete: {} evaluated, {} failed",
        outcome.evaluations.len(),
        outcome.failures.len()
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::Observation;
    use crate::app::services::anomaly_detector::ScopeClassification;
    use crate::app::services::quality::Grade;
    use chrono::{Duration, TimeZone};

    fn create_test_set(values: &[f64]) -> ObservationSet {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ObservationSet {
            station_id: 98210,
            station_name: "Stockholm-Observatoriekullen".to_string(),
            parameter_id: 1,
            parameter_name: "Lufttemperatur".to_string(),
            unit: "degree celsius".to_string(),
            observations: values
                .iter()
                .enumerate()
                .map(|(i, value)| Observation {
                    timestamp: base + Duration::hours(i as i64),
                    value: *value,
                    quality: "G".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parameter_name_for_known_ids() {
        assert_eq!(parameter_name_for(1), "temperature");
        assert_eq!(parameter_name_for(4), "wind_speed");
        assert_eq!(parameter_name_for(6), "humidity");
        assert_eq!(parameter_name_for(7), "precipitation");
        assert_eq!(parameter_name_for(39), "unknown");
    }

    #[test]
    fn test_clean_series_scores_a() {
        let values: Vec<f64> = (0..24).map(|i| 10.0 + (i % 3) as f64 * 0.5).collect();
        let evaluation =
            evaluate_observation_set(&create_test_set(&values), true, "temperature", &Config::default());

        assert!(evaluation.schema_valid);
        assert_eq!(evaluation.range_summary.ok, 24);
        assert_eq!(evaluation.completeness.completeness_percent, 100.0);
        assert!(evaluation.anomalies().is_empty());
        assert_eq!(evaluation.quality_score().overall, 100.0);
        assert_eq!(evaluation.quality_score().grade, Grade::A);
        assert_eq!(evaluation.report.observation_count, 24);
        assert_eq!(evaluation.station_id(), 98210);
    }

    #[test]
    fn test_schema_failure_costs_schema_weight() {
        let values: Vec<f64> = (0..24).map(|i| 10.0 + (i % 3) as f64 * 0.5).collect();
        let evaluation = evaluate_observation_set(
            &create_test_set(&values),
            false,
            "temperature",
            &Config::default(),
        );

        assert_eq!(evaluation.quality_score().components.schema_validity, 0.0);
        assert_eq!(evaluation.quality_score().overall, 80.0);
        assert_eq!(evaluation.quality_score().grade, Grade::B);
    }

    #[test]
    fn test_spike_lowers_range_and_anomaly_components() {
        let mut values = vec![10.0; 10];
        values[5] = 100.0;
        let evaluation =
            evaluate_observation_set(&create_test_set(&values), true, "temperature", &Config::default());

        assert_eq!(evaluation.range_summary.critical, 1);
        assert_eq!(evaluation.quality_score().components.range_validity, 90.0);
        assert!(!evaluation.anomalies().is_empty());
        assert!(evaluation.anomaly_rate > 0.0);
        assert!(evaluation.quality_score().overall < 100.0);
    }

    #[test]
    fn test_empty_set_uses_current_time_window() {
        let evaluation =
            evaluate_observation_set(&create_test_set(&[]), true, "temperature", &Config::default());

        assert_eq!(evaluation.report.observation_count, 0);
        assert_eq!(evaluation.report.time_window_start, evaluation.report.time_window_end);
        assert_eq!(evaluation.completeness.completeness_percent, 0.0);
        assert_eq!(evaluation.anomaly_rate, 0.0);
    }

    #[test]
    fn test_evaluate_fetched_runs_schema_gate() {
        let set = create_test_set(&[5.2, 4.8]);
        let fetched = FetchedObservations {
            set,
            raw: serde_json::json!({"value": "not a list"}),
        };
        let evaluation =
            evaluate_fetched(&fetched, ApiSource::MetObs, "temperature", &Config::default());

        assert!(!evaluation.schema_valid);
        assert!(!evaluation.schema_results.is_empty());
        assert_eq!(evaluation.quality_score().components.schema_validity, 0.0);
    }

    #[test]
    fn test_batch_outcome_summaries() {
        let config = Config::default();
        let clean: Vec<f64> = (0..24).map(|i| 10.0 + (i % 3) as f64 * 0.5).collect();
        let mut first = create_test_set(&clean);
        first.station_id = 52350;
        first.station_name = "Malmö A".to_string();
        let second = create_test_set(&clean);

        let outcome = BatchOutcome {
            evaluations: vec![
                evaluate_observation_set(&first, true, "temperature", &config),
                evaluate_observation_set(&second, false, "temperature", &config),
            ],
            failures: vec![(71420, Error::client(404, "http://localhost"))],
        };

        let summary = outcome.system_summary();
        assert_eq!(summary.total_stations, 2);
        assert_eq!(summary.average_score, 90.0);
        assert_eq!(outcome.aggregate_score().overall, 90.0);
        assert!(outcome.has_failures());
        assert!(outcome.anomaly_scope(ScopeSettings::default()).is_empty());
    }

    #[test]
    fn test_anomaly_scope_keeps_stations_with_same_name_apart() {
        let config = Config::default();
        let clean: Vec<f64> = (0..24).map(|i| 10.0 + (i % 3) as f64 * 0.5).collect();
        let mut spike = vec![10.0; 24];
        spike[12] = 30.0;

        let evaluations = [(1, &clean), (2, &clean), (3, &spike)]
            .into_iter()
            .map(|(id, values)| {
                let mut set = create_test_set(values);
                set.station_id = id;
                set.station_name = "Unknown".to_string();
                evaluate_observation_set(&set, true, "temperature", &config)
            })
            .collect();
        let outcome = BatchOutcome {
            evaluations,
            failures: Vec::new(),
        };

        let findings = outcome.anomaly_scope(ScopeSettings::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].stations_affected, "1/3");
        assert_eq!(findings[0].classification, ScopeClassification::SensorIssue);
        assert_eq!(findings[0].affected_stations, vec!["Unknown (3)".to_string()]);
    }
}
