//! Command-line parsing for the RSF occupancy dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the feed/alignment code.

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    MAX_EMA_SPAN, MAX_TRUNCATE_WEEKS, MIN_EMA_SPAN, ReportConfig, SmoothingConfig,
};
use crate::error::AppError;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rsf", version, about = "RSF gym occupancy dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive dashboard (default).
    Tui(ReportArgs),
    /// Print the summary and an ASCII chart of today vs. past same-weekday days.
    Report(ReportArgs),
    /// Print the daily peak table only (useful for scripting).
    Peaks(ReportArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Feed URL (defaults to `RSF_FEED_URL`, then the public feed).
    #[arg(long)]
    pub url: Option<String>,

    /// Keep only the trailing N weeks of the feed (0 keeps everything).
    #[arg(short = 'w', long, default_value_t = 3)]
    pub weeks: usize,

    /// Disable EMA smoothing.
    #[arg(long)]
    pub no_ema: bool,

    /// EMA span (1-60).
    #[arg(long, default_value_t = 10)]
    pub ema_span: usize,

    /// A day opens at the first count strictly above this.
    #[arg(long, default_value_t = 20)]
    pub threshold: i64,

    /// Bin width (minutes) used when resampling past days.
    #[arg(long, default_value_t = 5)]
    pub resample_minutes: u32,

    /// Facility capacity used for the percentage and reference line.
    #[arg(long, default_value_t = 150)]
    pub capacity: i64,

    /// Also print the daily peak table (`report` only).
    #[arg(long)]
    pub history: bool,

    /// Plot width (columns, `report` only).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows, `report` only).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

impl ReportArgs {
    /// Validate flags and build the pipeline configuration.
    ///
    /// `default_url` is used when `--url` is absent.
    pub fn to_config(&self, default_url: &str) -> Result<ReportConfig, AppError> {
        if self.weeks > MAX_TRUNCATE_WEEKS {
            return Err(AppError::usage(format!(
                "--weeks must be between 0 and {MAX_TRUNCATE_WEEKS} (got {}).",
                self.weeks
            )));
        }
        if !(MIN_EMA_SPAN..=MAX_EMA_SPAN).contains(&self.ema_span) {
            return Err(AppError::usage(format!(
                "--ema-span must be between {MIN_EMA_SPAN} and {MAX_EMA_SPAN} (got {}).",
                self.ema_span
            )));
        }
        if self.resample_minutes == 0 || self.resample_minutes > 24 * 60 {
            return Err(AppError::usage("--resample-minutes must be between 1 and 1440."));
        }
        if self.capacity <= 0 {
            return Err(AppError::usage("--capacity must be positive."));
        }

        Ok(ReportConfig {
            feed_url: self.url.clone().unwrap_or_else(|| default_url.to_string()),
            truncate_weeks: self.weeks,
            smoothing: SmoothingConfig {
                enabled: !self.no_ema,
                span: self.ema_span,
            },
            opening_threshold: self.threshold,
            resample_minutes: self.resample_minutes,
            capacity: self.capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> ReportArgs {
        let cli = Cli::parse_from(argv);
        match cli.command {
            Command::Tui(a) | Command::Report(a) | Command::Peaks(a) => a,
        }
    }

    #[test]
    fn defaults_match_dashboard_defaults() {
        let config = parse(&["rsf", "report"]).to_config("http://feed").unwrap();
        let expected = ReportConfig {
            feed_url: "http://feed".to_string(),
            ..ReportConfig::default()
        };
        assert_eq!(config, expected);
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "rsf", "tui", "-w", "0", "--no-ema", "--ema-span", "30", "--url", "http://x",
        ])
        .to_config("http://feed")
        .unwrap();
        assert_eq!(config.truncate_weeks, 0);
        assert!(!config.smoothing.enabled);
        assert_eq!(config.smoothing.span, 30);
        assert_eq!(config.feed_url, "http://x");
    }

    #[test]
    fn out_of_range_values_are_usage_errors() {
        let err = parse(&["rsf", "report", "--weeks", "13"]).to_config("u").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(parse(&["rsf", "report", "--ema-span", "0"]).to_config("u").is_err());
        assert!(parse(&["rsf", "report", "--ema-span", "61"]).to_config("u").is_err());
        assert!(parse(&["rsf", "report", "--resample-minutes", "0"]).to_config("u").is_err());
    }
}
