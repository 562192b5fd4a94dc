//! Command-line argument definitions for the quality monitor
//!
//! This module defines the CLI interface using the clap derive API. Every
//! subcommand shares the logging, configuration and output flags in
//! [`CommonArgs`].

use crate::app::models::{ApiSource, Period};
use crate::app::services::evaluation::parameter_name_for;
use crate::constants::{DEFAULT_HYDROOBS_STATIONS, DEFAULT_METOBS_STATIONS, parameters};
use crate::{Error, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// Upper bound on concurrent station fetches
const MAX_WORKERS: usize = 100;

/// CLI arguments for the SMHI data quality monitor
#[derive(Debug, Clone, Parser)]
#[command(
    name = "quality-monitor",
    version,
    about = "Assess the quality of SMHI meteorological and hydrological observations",
    long_about = "Fetches observation series from the SMHI open-data APIs and scores them on \
                  schema validity, completeness, physical range validity and statistical \
                  anomalies. Produces per-station reports, system summaries and a cross-station \
                  classification of anomalies as sensor issues or weather events."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Evaluate one station's series and print its quality report
    Evaluate(EvaluateArgs),
    /// Evaluate several stations concurrently and compare them
    Compare(CompareArgs),
    /// List the stations measuring a parameter
    Stations(StationsArgs),
}

/// Flags shared by every subcommand
#[derive(Debug, Clone, ClapArgs)]
pub struct CommonArgs {
    /// Path to configuration file
    ///
    /// TOML configuration file for thresholds, weights and fetch settings.
    /// If not specified, looks for ~/.config/quality-monitor/config.toml
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    #[arg(
        long = "log-format",
        value_enum,
        default_value = "text",
        help = "Log line format written to stderr"
    )]
    pub log_format: LogFormat,

    #[arg(
        long = "format",
        value_enum,
        default_value = "text",
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,
}

/// Which series to fetch
#[derive(Debug, Clone, ClapArgs)]
pub struct SeriesArgs {
    /// SMHI parameter id (1 = air temperature, 4 = wind speed, ...)
    #[arg(short = 'p', long = "parameter", value_name = "ID")]
    pub parameter: u32,

    #[arg(
        long = "period",
        value_name = "PERIOD",
        default_value = "latest-months",
        help = "Data period: latest-hour, latest-day, latest-months or corrected-archive"
    )]
    pub period: Period,

    #[arg(
        long = "source",
        value_name = "API",
        default_value = "metobs",
        help = "Observation API: metobs or hydroobs"
    )]
    pub source: ApiSource,

    /// Threshold key for range and rate-of-change checks
    ///
    /// Derived from the parameter id for meteorological series. Hydrological
    /// series default to water_level.
    #[arg(
        long = "parameter-kind",
        value_name = "KIND",
        help = "Threshold key such as temperature or water_level"
    )]
    pub parameter_kind: Option<String>,
}

impl SeriesArgs {
    /// Threshold key used for the series
    pub fn parameter_name(&self) -> String {
        if let Some(kind) = &self.parameter_kind {
            return kind.clone();
        }
        match self.source {
            ApiSource::MetObs => parameter_name_for(self.parameter).to_string(),
            ApiSource::HydroObs => parameters::WATER_LEVEL_KEY.to_string(),
        }
    }
}

/// Arguments for the evaluate command
#[derive(Debug, Clone, Parser)]
pub struct EvaluateArgs {
    #[arg(short = 's', long = "station", value_name = "ID", help = "Station id")]
    pub station: u32,

    #[command(flatten)]
    pub series: SeriesArgs,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the compare command
#[derive(Debug, Clone, Parser)]
pub struct CompareArgs {
    /// Stations to compare (comma-separated ids)
    ///
    /// If not specified, uses the built-in station set for the chosen API.
    #[arg(
        short = 's',
        long = "stations",
        value_name = "LIST",
        help = "Comma-separated list of station ids"
    )]
    pub stations: Option<StationList>,

    #[command(flatten)]
    pub series: SeriesArgs,

    /// Number of concurrent station fetches
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        help = "Number of concurrent station fetches (overrides config)"
    )]
    pub workers: Option<usize>,

    #[arg(
        long = "scope-threshold",
        value_name = "PERCENT",
        default_value_t = crate::constants::DEFAULT_SCOPE_THRESHOLD_PERCENT,
        help = "Share of stations that makes simultaneous anomalies a weather event"
    )]
    pub scope_threshold: f64,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the stations command
#[derive(Debug, Clone, Parser)]
pub struct StationsArgs {
    /// SMHI parameter id
    #[arg(short = 'p', long = "parameter", value_name = "ID")]
    pub parameter: u32,

    #[arg(
        long = "source",
        value_name = "API",
        default_value = "metobs",
        help = "Observation API: metobs or hydroobs"
    )]
    pub source: ApiSource,

    /// Only list active stations
    #[arg(long = "active-only", help = "Only list active stations")]
    pub active_only: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Text,
    /// JSON format for scripting
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Wrapper for parsing comma-separated station id lists
#[derive(Debug, Clone, PartialEq)]
pub struct StationList {
    pub stations: Vec<u32>,
}

impl FromStr for StationList {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let stations = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| Error::configuration(format!("Invalid station id '{}'", part)))
            })
            .collect::<Result<Vec<u32>>>()?;

        if stations.is_empty() {
            return Err(Error::configuration("Station list cannot be empty"));
        }

        Ok(StationList { stations })
    }
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Commands::Evaluate(args) => &args.common,
            Commands::Compare(args) => &args.common,
            Commands::Stations(args) => &args.common,
        }
    }
}

impl CommonArgs {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode or JSON output)
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.output_format == OutputFormat::Text
    }

    /// Validate the shared arguments
    pub fn validate(&self) -> Result<()> {
        if let Some(config_file) = &self.config_file {
            if !config_file.exists() {
                return Err(Error::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }
        Ok(())
    }
}

impl CompareArgs {
    /// Station ids to compare
    pub fn station_ids(&self) -> Vec<u32> {
        match &self.stations {
            Some(list) => list.stations.clone(),
            None => {
                let defaults = match self.series.source {
                    ApiSource::MetObs => DEFAULT_METOBS_STATIONS,
                    ApiSource::HydroObs => DEFAULT_HYDROOBS_STATIONS,
                };
                defaults.iter().map(|(id, _)| *id).collect()
            }
        }
    }

    /// Validate the compare command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        self.common.validate()?;

        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(Error::configuration(
                    "Number of workers must be greater than 0",
                ));
            }
            if workers > MAX_WORKERS {
                return Err(Error::configuration(format!(
                    "Number of workers cannot exceed {}",
                    MAX_WORKERS
                )));
            }
        }

        if !(0.0..=100.0).contains(&self.scope_threshold) {
            return Err(Error::configuration(
                "Scope threshold must be between 0 and 100",
            ));
        }

        Ok(())
    }
}
