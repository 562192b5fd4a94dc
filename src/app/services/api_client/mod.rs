//! SMHI observation API access
//!
//! - [`fetcher`] - HTTP GET with bounded retries, exponential backoff and
//!   rate-limit detection
//! - [`client`] - typed endpoints (parameters, stations, periods,
//!   observation series, latest values) on top of the fetcher

pub mod client;
pub mod fetcher;

#[cfg(test)]
mod tests;

pub use client::{
    FetchedObservations, ObservationClient, parse_observation, parse_observation_set,
    parse_station_list,
};
pub use fetcher::{RawResponse, ResilientFetcher, parse_retry_after};
