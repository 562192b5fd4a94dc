//! Structural validation of raw API responses
//!
//! Responses are checked against typed views of the SMHI payloads before any
//! numeric analysis. The views are open: unknown fields are ignored. A schema
//! failure never aborts an evaluation; it zeroes the schema-validity
//! component of the quality score.

use crate::app::models::ApiSource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Ok,
    Warning,
    Critical,
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationSeverity::Ok => write!(f, "ok"),
            ValidationSeverity::Warning => write!(f, "warning"),
            ValidationSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Outcome of one validation check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub severity: ValidationSeverity,
    pub message: String,
    /// Path of the offending field, e.g. `value[3].value`
    pub field: Option<String>,
    /// Offending value, when there is a scalar to show
    pub value: Option<String>,
}

impl ValidationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            severity: ValidationSeverity::Ok,
            message: message.into(),
            field: None,
            value: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            severity: ValidationSeverity::Warning,
            message: message.into(),
            field: None,
            value: None,
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            severity: ValidationSeverity::Critical,
            message: message.into(),
            field: None,
            value: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

// =============================================================================
// Typed Views
// =============================================================================

fn default_quality() -> String {
    "G".to_string()
}

/// One entry of the `value` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationValue {
    /// Epoch milliseconds
    pub date: i64,
    /// Numeric value encoded as a string
    pub value: String,
    #[serde(default = "default_quality")]
    pub quality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMetadata {
    pub key: i64,
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default, rename = "ownerCategory")]
    pub owner_category: String,
    #[serde(default)]
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMetadata {
    pub key: i64,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetadata {
    pub key: String,
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub summary: String,
}

/// Observation data payload (same shape for both APIs)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservationResponse {
    #[serde(default)]
    pub value: Vec<ObservationValue>,
    #[serde(default)]
    pub station: Option<StationMetadata>,
    #[serde(default)]
    pub parameter: Option<ParameterMetadata>,
    #[serde(default)]
    pub period: Option<PeriodMetadata>,
}

/// Entry of a station-list payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationListItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// First structural problem found in a payload
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    pub field: Option<String>,
    pub message: String,
    pub value: Option<String>,
}

impl SchemaViolation {
    fn at(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
            value: None,
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Parse an observation payload into its typed view
///
/// Entries are checked in order so the violation names the first bad index.
pub fn parse_observation_response(
    raw: &Value,
) -> std::result::Result<ObservationResponse, SchemaViolation> {
    let Some(object) = raw.as_object() else {
        return Err(SchemaViolation {
            field: None,
            message: "response is not a JSON object".to_string(),
            value: None,
        });
    };

    let mut response = ObservationResponse::default();

    match object.get("value") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                let field = format!("value[{}]", index);
                let parsed = ObservationValue::deserialize(entry)
                    .map_err(|e| SchemaViolation::at(field.as_str(), e.to_string()))?;
                if parsed.value.trim().parse::<f64>().is_err() {
                    return Err(SchemaViolation {
                        field: Some(format!("{}.value", field)),
                        message: format!("Value '{}' is not a valid number", parsed.value),
                        value: Some(parsed.value),
                    });
                }
                response.value.push(parsed);
            }
        }
        Some(_) => return Err(SchemaViolation::at("value", "expected a list")),
    }

    response.station = metadata_block(object.get("station"), "station")?;
    response.parameter = metadata_block(object.get("parameter"), "parameter")?;
    response.period = metadata_block(object.get("period"), "period")?;

    Ok(response)
}

fn metadata_block<T: for<'de> Deserialize<'de>>(
    block: Option<&Value>,
    field: &str,
) -> std::result::Result<Option<T>, SchemaViolation> {
    match block {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|e| SchemaViolation::at(field, e.to_string())),
    }
}

/// Validate an observation data payload
///
/// Returns exactly one result: OK, or CRITICAL describing the first failure.
pub fn validate_observation_response(
    raw: &Value,
    source: ApiSource,
) -> (bool, Vec<ValidationResult>) {
    match parse_observation_response(raw) {
        Ok(response) => {
            debug!(
                "{} response passed schema validation ({} values)",
                source,
                response.value.len()
            );
            (true, vec![ValidationResult::ok("Schema validation passed")])
        }
        Err(violation) => {
            warn!("{} response failed schema validation: {}", source, violation);
            let mut result =
                ValidationResult::critical(format!("Schema validation failed: {}", violation));
            result.field = violation.field;
            result.value = violation.value;
            (false, vec![result])
        }
    }
}

/// Validate a station-list payload
///
/// A non-list `station` field is critical. Each malformed entry adds a
/// warning; the batch is valid only when there are none.
pub fn validate_station_list(raw: &Value) -> (bool, Vec<ValidationResult>) {
    let stations = match raw.get("station") {
        None | Some(Value::Null) => &[] as &[Value],
        Some(Value::Array(stations)) => stations.as_slice(),
        Some(_) => {
            return (
                false,
                vec![
                    ValidationResult::critical("Expected 'station' to be a list")
                        .with_field("station"),
                ],
            );
        }
    };

    let mut results: Vec<ValidationResult> = stations
        .iter()
        .enumerate()
        .filter_map(|(index, station)| {
            StationListItem::deserialize(station).err().map(|e| {
                ValidationResult::warning(format!("Station {} validation failed: {}", index, e))
                    .with_field(format!("station[{}]", index))
            })
        })
        .collect();

    if results.is_empty() {
        results.push(ValidationResult::ok(format!(
            "Validated {} stations",
            stations.len()
        )));
    } else {
        warn!(
            "{} of {} station entries failed validation",
            results.len(),
            stations.len()
        );
    }

    let all_valid = results.iter().all(|result| result.valid);
    (all_valid, results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_response() -> Value {
        json!({
            "value": [
                {"date": 1704067200000i64, "value": "5.2", "quality": "G"},
                {"date": 1704070800000i64, "value": "-10.5", "quality": "G"},
                {"date": 1704074400000i64, "value": "4.5"}
            ],
            "station": {
                "key": 98210,
                "name": "Stockholm-Observatoriekullen",
                "owner": "SMHI",
                "ownerCategory": "SMHI",
                "height": 43.0
            },
            "parameter": {
                "key": 1,
                "name": "Lufttemperatur",
                "summary": "momentanvärde, 1 gång/tim",
                "unit": "degree celsius"
            },
            "period": {
                "key": "latest-day",
                "from": 1704067200000i64,
                "to": 1704153600000i64,
                "summary": "Data från senaste dygnet"
            }
        })
    }

    #[test]
    fn test_valid_response_parses() {
        let response = parse_observation_response(&valid_response()).unwrap();
        assert_eq!(response.value.len(), 3);
        assert_eq!(response.value[2].quality, "G");
        assert_eq!(response.station.unwrap().key, 98210);
        assert_eq!(response.period.unwrap().from, 1704067200000);
    }

    #[test]
    fn test_valid_response_returns_single_ok() {
        let (valid, results) = validate_observation_response(&valid_response(), ApiSource::MetObs);
        assert!(valid);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, ValidationSeverity::Ok);
        assert_eq!(results[0].message, "Schema validation passed");
    }

    #[test]
    fn test_missing_value_field_is_critical() {
        let raw = json!({"value": [{"date": 1704067200000i64, "quality": "G"}]});
        let (valid, results) = validate_observation_response(&raw, ApiSource::MetObs);

        assert!(!valid);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, ValidationSeverity::Critical);
        assert_eq!(results[0].field.as_deref(), Some("value[0]"));
        assert!(results[0].message.starts_with("Schema validation failed"));
    }

    #[test]
    fn test_non_numeric_value_names_first_failure() {
        let raw = json!({
            "value": [
                {"date": 1704067200000i64, "value": "5.0"},
                {"date": 1704070800000i64, "value": "invalid"},
                {"date": 1704074400000i64, "value": "also bad"}
            ]
        });
        let (valid, results) = validate_observation_response(&raw, ApiSource::HydroObs);

        assert!(!valid);
        assert_eq!(results[0].field.as_deref(), Some("value[1].value"));
        assert_eq!(results[0].value.as_deref(), Some("invalid"));
        assert!(results[0].message.contains("'invalid' is not a valid number"));
    }

    #[test]
    fn test_extra_fields_and_empty_values_allowed() {
        let raw = json!({"value": [], "unknown_field": "ignored"});
        assert!(validate_observation_response(&raw, ApiSource::MetObs).0);

        let raw = json!({"updated": 1704067200000i64});
        assert!(validate_observation_response(&raw, ApiSource::MetObs).0);
    }

    #[test]
    fn test_malformed_metadata_block_is_critical() {
        let mut raw = valid_response();
        raw["station"] = json!({"name": "No key"});
        let (valid, results) = validate_observation_response(&raw, ApiSource::MetObs);

        assert!(!valid);
        assert_eq!(results[0].field.as_deref(), Some("station"));
    }

    #[test]
    fn test_value_not_a_list_is_critical() {
        let raw = json!({"value": {"date": 1}});
        let (valid, results) = validate_observation_response(&raw, ApiSource::MetObs);
        assert!(!valid);
        assert_eq!(results[0].field.as_deref(), Some("value"));

        assert!(!validate_observation_response(&json!([1, 2]), ApiSource::MetObs).0);
    }

    #[test]
    fn test_valid_station_list() {
        let raw = json!({
            "station": [
                {"id": 98210, "name": "Stockholm-Observatoriekullen", "latitude": 59.3417, "longitude": 18.0549, "active": true},
                {"id": 71420, "name": "Göteborg A"}
            ]
        });
        let (valid, results) = validate_station_list(&raw);

        assert!(valid);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message, "Validated 2 stations");
    }

    #[test]
    fn test_station_list_warns_per_bad_entry() {
        let raw = json!({
            "station": [
                {"id": 98210, "name": "Stockholm"},
                {"name": "Missing id"},
                {"id": "abc", "name": "Bad id"}
            ]
        });
        let (valid, results) = validate_station_list(&raw);

        assert!(!valid);
        assert_eq!(results.len(), 2);
        assert!(
            results
                .iter()
                .all(|r| r.severity == ValidationSeverity::Warning)
        );
        assert_eq!(results[0].field.as_deref(), Some("station[1]"));
        assert_eq!(results[1].field.as_deref(), Some("station[2]"));
    }

    #[test]
    fn test_station_not_a_list_is_critical() {
        let (valid, results) = validate_station_list(&json!({"station": "not a list"}));

        assert!(!valid);
        assert_eq!(results[0].severity, ValidationSeverity::Critical);
        assert_eq!(results[0].message, "Expected 'station' to be a list");
        assert_eq!(results[0].field.as_deref(), Some("station"));
    }

    #[test]
    fn test_empty_station_list_is_valid() {
        let (valid, results) = validate_station_list(&json!({"station": []}));
        assert!(valid);
        assert_eq!(results[0].message, "Validated 0 stations");
    }
}
