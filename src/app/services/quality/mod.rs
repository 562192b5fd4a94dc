//! Composite quality scoring and reporting
//!
//! - [`scorer`] - weighted 0-100 score, letter grade and recommendation per
//!   series, plus aggregation across stations
//! - [`report`] - station reports, text summaries and system-wide figures

pub mod report;
pub mod scorer;

#[cfg(test)]
mod tests;

pub use report::{
    ReportSubject, StationReport, SystemSummary, format_report_summary, generate_station_report,
    generate_system_summary,
};
pub use scorer::{
    Grade, QualityComponents, QualityScore, aggregate_station_scores, calculate_quality_score,
};
