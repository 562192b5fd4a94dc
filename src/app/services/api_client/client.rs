//! Typed access to the SMHI observation endpoints
//!
//! Both observation APIs share the traversal
//! `version -> parameter -> station -> period -> data`, so a single client
//! parameterised by [`ApiSource`] covers meteorological and hydrological
//! series alike.

use super::fetcher::{RawResponse, ResilientFetcher};
use crate::Result;
use crate::app::models::{
    ApiSource, Observation, ObservationSet, ParameterInfo, Period, StationInfo,
};
use crate::config::FetchConfig;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Name used when a response carries no station or parameter name
const UNKNOWN_NAME: &str = "Unknown";

/// Parsed observation series together with the raw payload it came from
///
/// The raw payload is kept so the schema gate can run on exactly what the
/// API returned.
#[derive(Debug, Clone)]
pub struct FetchedObservations {
    pub set: ObservationSet,
    pub raw: RawResponse,
}

/// Client for one SMHI observation API
#[derive(Debug, Clone)]
pub struct ObservationClient {
    fetcher: ResilientFetcher,
    source: ApiSource,
    api_version: String,
}

impl ObservationClient {
    /// Create a client for `source` using the base URL configured for it
    pub fn new(source: ApiSource, config: &FetchConfig) -> Result<Self> {
        let fetcher = ResilientFetcher::new(config.base_url(source), config)?;
        Ok(Self {
            fetcher,
            source,
            api_version: config.api_version.clone(),
        })
    }

    pub fn source(&self) -> ApiSource {
        self.source
    }

    pub fn fetcher(&self) -> &ResilientFetcher {
        &self.fetcher
    }

    fn endpoint(&self, path: &str) -> String {
        format!("version/{}/{}", self.api_version, path)
    }

    /// List the parameters offered by this API
    pub async fn get_parameters(&self) -> Result<Vec<ParameterInfo>> {
        let response = self
            .fetcher
            .fetch(&format!("version/{}.json", self.api_version), &[])
            .await?;

        let parameters: Vec<ParameterInfo> = list_field(&response, "resource")
            .iter()
            .filter_map(parse_parameter)
            .collect();

        debug!("{} API offers {} parameters", self.source, parameters.len());
        Ok(parameters)
    }

    /// Raw station-list payload for a parameter
    pub async fn get_station_list_raw(&self, parameter_id: u32) -> Result<RawResponse> {
        self.fetcher
            .fetch(&self.endpoint(&format!("parameter/{}.json", parameter_id)), &[])
            .await
    }

    /// Stations measuring `parameter_id`
    ///
    /// Entries without a usable `id`/`name` are skipped with a warning.
    pub async fn get_stations(&self, parameter_id: u32) -> Result<Vec<StationInfo>> {
        let response = self.get_station_list_raw(parameter_id).await?;
        Ok(parse_station_list(&response))
    }

    /// Period keys available for a station/parameter combination
    pub async fn get_periods(&self, parameter_id: u32, station_id: u32) -> Result<Vec<String>> {
        let response = self
            .fetcher
            .fetch(
                &self.endpoint(&format!(
                    "parameter/{}/station/{}.json",
                    parameter_id, station_id
                )),
                &[],
            )
            .await?;

        Ok(list_field(&response, "period")
            .iter()
            .filter_map(|period| period.get("key").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    /// Fetch and parse one observation series
    pub async fn get_observations(
        &self,
        parameter_id: u32,
        station_id: u32,
        period: Period,
    ) -> Result<FetchedObservations> {
        let endpoint = self.endpoint(&format!(
            "parameter/{}/station/{}/period/{}/data.json",
            parameter_id,
            station_id,
            period.key()
        ));
        let raw = self.fetcher.fetch(&endpoint, &[]).await?;
        let set = parse_observation_set(&raw, station_id, parameter_id);

        info!(
            "Fetched {} observations for station {} parameter {} ({})",
            set.len(),
            set.station_id,
            set.parameter_id,
            period
        );

        Ok(FetchedObservations { set, raw })
    }

    /// Most recent observation of every station reporting `parameter_id`
    pub async fn get_latest_observations(
        &self,
        parameter_id: u32,
    ) -> Result<BTreeMap<u32, Observation>> {
        let endpoint = self.endpoint(&format!(
            "parameter/{}/station-set/all/period/latest-hour/data.json",
            parameter_id
        ));
        let response = self.fetcher.fetch(&endpoint, &[]).await?;

        let mut latest = BTreeMap::new();
        for station in list_field(&response, "station") {
            let Some(station_id) = station.get("key").and_then(json_u32) else {
                warn!("Skipping station-set entry without a numeric key");
                continue;
            };
            let last = list_field(station, "value").last().and_then(parse_observation);
            if let Some(observation) = last {
                latest.insert(station_id, observation);
            }
        }

        debug!(
            "Latest observations for parameter {}: {} stations",
            parameter_id,
            latest.len()
        );
        Ok(latest)
    }
}

// =============================================================================
// Payload Parsing
// =============================================================================

/// Build an [`ObservationSet`] from an observation data payload
///
/// Missing metadata falls back to the requested ids, `"Unknown"` names and an
/// empty unit. Entries whose value is not numeric are dropped; the schema
/// gate reports them separately.
pub fn parse_observation_set(raw: &RawResponse, station_id: u32, parameter_id: u32) -> ObservationSet {
    let entries = list_field(raw, "value");
    let observations: Vec<Observation> = entries.iter().filter_map(parse_observation).collect();

    let skipped = entries.len() - observations.len();
    if skipped > 0 {
        warn!(
            "Skipped {} malformed observations for station {}",
            skipped, station_id
        );
    }

    let station = raw.get("station");
    let parameter = raw.get("parameter");

    ObservationSet {
        station_id: station
            .and_then(|s| s.get("key"))
            .and_then(json_u32)
            .unwrap_or(station_id),
        station_name: text_field(station, "name").unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        parameter_id: parameter
            .and_then(|p| p.get("key"))
            .and_then(json_u32)
            .unwrap_or(parameter_id),
        parameter_name: text_field(parameter, "name").unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        unit: text_field(parameter, "unit").unwrap_or_default(),
        observations,
    }
}

/// Parse one `{date, value, quality}` entry
pub fn parse_observation(entry: &Value) -> Option<Observation> {
    let millis = entry.get("date")?.as_i64()?;
    let value = match entry.get("value")? {
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        Value::Number(number) => number.as_f64()?,
        _ => return None,
    };
    let quality = entry.get("quality").and_then(Value::as_str);
    Observation::from_epoch_millis(millis, value, quality)
}

/// Parse the `station` list of a station-list payload
pub fn parse_station_list(raw: &RawResponse) -> Vec<StationInfo> {
    list_field(raw, "station")
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            match serde_json::from_value::<StationInfo>(entry.clone()) {
                Ok(station) => Some(station),
                Err(e) => {
                    warn!("Skipping malformed station entry {}: {}", index, e);
                    None
                }
            }
        })
        .collect()
}

fn parse_parameter(entry: &Value) -> Option<ParameterInfo> {
    let key = match entry.get("key")? {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    Some(ParameterInfo {
        key,
        name: text_field(Some(entry), "name")
            .or_else(|| text_field(Some(entry), "title"))
            .unwrap_or_default(),
        summary: text_field(Some(entry), "summary").unwrap_or_default(),
        unit: text_field(Some(entry), "unit").unwrap_or_default(),
    })
}

fn list_field<'a>(value: &'a Value, field: &str) -> &'a [Value] {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text_field(value: Option<&Value>, field: &str) -> Option<String> {
    value?.get(field)?.as_str().map(str::to_string)
}

/// Station and parameter keys arrive as numbers or numeric strings
fn json_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
