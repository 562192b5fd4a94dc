//! Tests for the fetcher and observation client against a mock SMHI server


use crate::config::FetchConfig;
use serde_json::{Value, json};
use std::time::Duration;

/// Fetch settings pointed at a mock server with millisecond backoff
pub fn create_test_fetch_config(base_url: &str, max_retries: u32) -> FetchConfig {
    FetchConfig::default()
        .with_base_url(base_url)
        .with_max_retries(max_retries)
        .with_backoff_unit(Duration::from_millis(1))
}

/// Three hourly temperature readings for Stockholm
pub fn sample_observation_payload() -> Value {
    json!({
        "value": [
            {"date": 1704067200000i64, "value": "5.2", "quality": "G"},
            {"date": 1704070800000i64, "value": "4.8", "quality": "G"},
            {"date": 1704074400000i64, "value": "4.5", "quality": "G"}
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

/// Two-station list for parameter 1
pub fn sample_station_list_payload() -> Value {
    json!({
        "station": [
            {
                "id": 98210,
                "name": "Stockholm-Observatoriekullen",
                "latitude": 59.3417,
                "longitude": 18.0549,
                "active": true
            },
            {
                "id": 71420,
                "name": "Göteborg A",
                "latitude": 57.7156,
                "longitude": 11.9924,
                "active": true
            }
        ]
    })
}
