//! Command implementations for the quality monitor CLI
//!
//! This module contains the command execution logic, progress reporting and
//! result rendering for the CLI interface.

use crate::app::models::ApiSource;
use crate::app::services::anomaly_detector::{ScopeFinding, ScopeSettings};
use crate::app::services::api_client::{ObservationClient, parse_station_list};
use crate::app::services::evaluation::{
    BatchOutcome, EvaluationCache, StationEvaluation, compare_stations, evaluate_station,
};
use crate::app::services::completeness::format_gap_report;
use crate::app::services::quality::{Grade, QualityScore, SystemSummary, format_report_summary};
use crate::app::services::schema_validator::{ValidationResult, validate_station_list};
use crate::cli::args::{
    Args, Commands, CommonArgs, CompareArgs, EvaluateArgs, LogFormat, OutputFormat, StationsArgs,
};
use crate::config::Config;
use crate::{Error, Result};
use colored::{ColoredString, Colorize};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Main command runner for the quality monitor
///
/// Sets up logging, loads configuration and dispatches to the subcommand.
pub async fn run(args: Args) -> Result<()> {
    let command = args
        .command
        .ok_or_else(|| Error::configuration("No command given"))?;

    let common = command.common();
    setup_logging(common)?;
    common.validate()?;
    debug!("Command line arguments: {:?}", command);

    let start_time = Instant::now();
    let result = match &command {
        Commands::Evaluate(args) => run_evaluate(args).await,
        Commands::Compare(args) => run_compare(args).await,
        Commands::Stations(args) => run_stations(args).await,
    };

    info!("Finished in {}", HumanDuration(start_time.elapsed()));
    result
}

/// Set up structured logging based on CLI arguments
///
/// `RUST_LOG` takes precedence over the verbosity flags.
fn setup_logging(common: &CommonArgs) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = common.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("quality_monitor={}", log_level)));

    let init_result = match common.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    init_result
        .map_err(|e| Error::configuration(format!("Failed to initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load the configuration file (or defaults) and apply CLI overrides
fn load_configuration(common: &CommonArgs, workers: Option<usize>) -> Result<Config> {
    match &common.config_file {
        Some(path) => info!("Using config file: {}", path.display()),
        None => info!("No config file given, trying the default location"),
    }

    let mut config = Config::load_or_default(common.config_file.as_deref())?;
    if let Some(workers) = workers {
        config = config.with_workers(workers);
    }
    config.validate()?;

    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

// =============================================================================
// Subcommands
// =============================================================================

async fn run_evaluate(args: &EvaluateArgs) -> Result<()> {
    let config = load_configuration(&args.common, None)?;
    let client = ObservationClient::new(args.series.source, &config.fetch)?;
    let parameter_name = args.series.parameter_name();

    let spinner = args.common.show_progress().then(|| {
        create_spinner(&format!(
            "Fetching station {} parameter {}",
            args.station, args.series.parameter
        ))
    });

    let result = evaluate_station(
        &client,
        args.station,
        args.series.parameter,
        args.series.period,
        &parameter_name,
        &config,
        None,
    )
    .await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let evaluation = result?;

    match args.common.output_format {
        OutputFormat::Text => print_evaluation(&evaluation),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluation.report)?),
    }
    Ok(())
}

async fn run_compare(args: &CompareArgs) -> Result<()> {
    args.validate()?;
    let config = load_configuration(&args.common, args.workers)?;
    let client = ObservationClient::new(args.series.source, &config.fetch)?;
    let parameter_name = args.series.parameter_name();
    let station_ids = args.station_ids();
    let cache = EvaluationCache::new(config.cache_ttl());

    let progress_bar = args.common.show_progress().then(|| {
        let pb = ProgressBar::new(station_ids.len() as u64);
        pb.set_style(bar_style());
        pb.set_message(format!("Evaluating {} stations", station_ids.len()));
        pb
    });

    let outcome = compare_stations(
        &client,
        &station_ids,
        args.series.parameter,
        args.series.period,
        &parameter_name,
        &config,
        Some(&cache),
        progress_bar.as_ref(),
    )
    .await;

    if let Some(pb) = &progress_bar {
        pb.finish_and_clear();
    }

    let scope_settings = ScopeSettings {
        threshold_percent: args.scope_threshold,
        ..ScopeSettings::default()
    };

    match args.common.output_format {
        OutputFormat::Text => print_comparison(&outcome, scope_settings),
        OutputFormat::Json => print_comparison_json(&outcome, scope_settings)?,
    }

    if outcome.evaluations.is_empty() {
        if let Some((station_id, error)) = outcome.failures.into_iter().next() {
            warn!("No station could be evaluated; first failure was station {}", station_id);
            return Err(error);
        }
    }
    Ok(())
}

async fn run_stations(args: &StationsArgs) -> Result<()> {
    let config = load_configuration(&args.common, None)?;
    let client = ObservationClient::new(args.source, &config.fetch)?;

    let raw = client.get_station_list_raw(args.parameter).await?;
    let (schema_valid, schema_results) = validate_station_list(&raw);
    if !schema_valid {
        for result in &schema_results {
            warn!("Station list schema: {}", result.message);
        }
    }

    let stations: Vec<_> = parse_station_list(&raw)
        .into_iter()
        .filter(|station| !args.active_only || station.active)
        .collect();
    info!(
        "{} stations for parameter {} on {}",
        stations.len(),
        args.parameter,
        args.source
    );

    match args.common.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stations)?),
        OutputFormat::Text => {
            println!(
                "{}",
                format!(
                    "Stations for parameter {} ({})",
                    args.parameter,
                    source_label(args.source)
                )
                .bold()
            );
            for station in &stations {
                let status = if station.active {
                    "active".green()
                } else {
                    "inactive".dimmed()
                };
                println!(
                    "  {:>8}  {:<40} {:>9.4} {:>9.4}  {}",
                    station.id, station.name, station.latitude, station.longitude, status
                );
            }
            println!("\n{} stations", stations.len());
        }
    }
    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

fn source_label(source: ApiSource) -> &'static str {
    match source {
        ApiSource::MetObs => "meteorological",
        ApiSource::HydroObs => "hydrological",
    }
}

fn colored_grade(grade: Grade) -> ColoredString {
    match grade {
        Grade::A => grade.as_str().green().bold(),
        Grade::B => grade.as_str().green(),
        Grade::C => grade.as_str().yellow(),
        Grade::D => grade.as_str().red(),
        Grade::F => grade.as_str().red().bold(),
    }
}

fn print_schema_results(results: &[ValidationResult]) {
    for result in results.iter().filter(|r| !r.valid) {
        println!("{} {}", "Schema:".yellow(), result.message);
    }
}

fn print_evaluation(evaluation: &StationEvaluation) {
    let report = &evaluation.report;
    println!("{}", format_report_summary(report));
    println!("Grade: {}", colored_grade(report.quality_score.grade));

    print_schema_results(&evaluation.schema_results);

    let gaps = format_gap_report(&evaluation.completeness.gaps);
    if !gaps.is_empty() {
        println!("\nGaps:");
        for line in gaps {
            println!("  - {}", line);
        }
    }
}

fn print_comparison(outcome: &BatchOutcome, scope_settings: ScopeSettings) {
    for evaluation in &outcome.evaluations {
        print_evaluation(evaluation);
        println!("{}", "─".repeat(60));
    }

    print_system_summary(&outcome.system_summary());
    print_aggregate(&outcome.aggregate_score());
    print_scope(&outcome.anomaly_scope(scope_settings));

    if outcome.has_failures() {
        println!("\n{}", "Failed stations:".red().bold());
        for (station_id, error) in &outcome.failures {
            println!("  - {}: {}", station_id, error);
        }
    }
}

fn print_system_summary(summary: &SystemSummary) {
    println!("\n{}", "System Summary".bold());
    println!("  Stations: {}", summary.total_stations);
    println!("  Observations: {}", summary.total_observations);
    println!("  Average score: {:.1}", summary.average_score);
    println!("  Anomalies: {}", summary.total_anomalies);
    println!("  Stations with issues: {}", summary.stations_with_issues);
    let distribution: Vec<String> = summary
        .grade_distribution
        .iter()
        .map(|(grade, count)| format!("{}={}", colored_grade(*grade), count))
        .collect();
    println!("  Grades: {}", distribution.join(" "));
}

fn print_aggregate(score: &QualityScore) {
    println!(
        "\nAggregate score: {:.1}/100 (Grade: {})",
        score.overall,
        colored_grade(score.grade)
    );
    println!("  {}", score.recommendation);
}

fn print_scope(findings: &[ScopeFinding]) {
    if findings.is_empty() {
        return;
    }
    println!("\n{}", "Anomaly Scope".bold());
    for finding in findings {
        println!(
            "  {} {} ({} stations, {:.0}%): {}",
            finding.timestamp.format("%Y-%m-%d %H:%M"),
            finding.classification,
            finding.stations_affected,
            finding.percent_affected,
            finding.affected_stations.join(", ")
        );
    }
}

fn print_comparison_json(outcome: &BatchOutcome, scope_settings: ScopeSettings) -> Result<()> {
    let failures: Vec<serde_json::Value> = outcome
        .failures
        .iter()
        .map(|(station_id, error)| {
            serde_json::json!({
                "station_id": station_id,
                "error": error.to_string(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "reports": outcome.reports(),
        "summary": outcome.system_summary(),
        "aggregate": outcome.aggregate_score(),
        "scope": outcome.anomaly_scope(scope_settings),
        "failures": failures,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// =============================================================================
// Progress
// =============================================================================

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
