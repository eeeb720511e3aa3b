//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and loads `.env`
//! - sets up logging
//! - fetches and aligns the occupancy feed
//! - prints reports or hands over to the TUI

use clap::Parser;
use tracing::info;

use crate::cli::{Command, ReportArgs};
use crate::data::{FeedCache, FeedClient, feed_url_from_env};
use crate::domain::ReportConfig;
use crate::error::AppError;
use crate::logging::{self, LogTarget};

pub mod pipeline;

/// Entry point for the `rsf` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `rsf` and `rsf -w 4` behave like `rsf tui ...`; clap requires a subcommand
    // name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Tui(args) => {
            logging::init(LogTarget::File)?;
            crate::tui::run(config_from_args(&args)?)
        }
        Command::Report(args) => {
            logging::init(LogTarget::Stderr)?;
            handle_report(&args, OutputMode::Full)
        }
        Command::Peaks(args) => {
            logging::init(LogTarget::Stderr)?;
            handle_report(&args, OutputMode::PeaksOnly)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    PeaksOnly,
}

fn config_from_args(args: &ReportArgs) -> Result<ReportConfig, AppError> {
    args.to_config(&feed_url_from_env())
}

fn handle_report(args: &ReportArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = config_from_args(args)?;
    let client = FeedClient::new(config.feed_url.clone())?;
    let mut cache = FeedCache::default();

    info!(url = client.url(), weeks = config.truncate_weeks, "loading feed");
    let dashboard = pipeline::load_dashboard(&mut cache, &client, &config)?;

    if mode == OutputMode::Full {
        println!("{}", crate::report::format_summary(&dashboard, &config));
        println!("{}", crate::report::format_chart_title(&config));
        println!(
            "{}",
            crate::plot::render_overlay(
                &dashboard.history,
                &dashboard.today,
                config.capacity,
                args.width,
                args.height,
            )
        );
    }

    if mode == OutputMode::PeaksOnly || args.history {
        println!("{}", crate::report::format_peaks(&dashboard.peaks));
    }

    Ok(())
}

/// Rewrite argv so `rsf` defaults to `rsf tui`.
///
/// Rules:
/// - `rsf`                      -> `rsf tui`
/// - `rsf -w 4 ...`             -> `rsf tui -w 4 ...`
/// - `rsf --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "report" | "peaks");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_tui() {
        assert_eq!(rewrite_args(args(&["rsf"])), args(&["rsf", "tui"]));
        assert_eq!(
            rewrite_args(args(&["rsf", "-w", "4"])),
            args(&["rsf", "tui", "-w", "4"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(args(&["rsf", "report"])), args(&["rsf", "report"]));
        assert_eq!(rewrite_args(args(&["rsf", "--help"])), args(&["rsf", "--help"]));
        assert_eq!(rewrite_args(args(&["rsf", "peaks", "-w", "0"])), args(&["rsf", "peaks", "-w", "0"]));
    }
}
