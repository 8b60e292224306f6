//! 🚀 sweep — the front door, the bouncer, the maitre d' of the pipeline.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Parses args, sets up logging, loads config, runs the pipeline, prints
//! the report. The real work happens in the `sweep` crate. Like a manager. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use sweep::{PipelineReport, PipelineRequest};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🔭 Check who changed since a date, and whether they still have a profile photo.
#[derive(Debug, Parser)]
#[command(name = "sweep", version, about, long_about = None)]
struct Cli {
    /// Modified-since date, YYYY-MM-DD. Defaults to yesterday.
    #[arg(value_parser = parse_since)]
    since: Option<NaiveDate>,

    /// Number of concurrent enrichment workers. Defaults to runtime.worker_count (10).
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    workers: Option<u64>,

    /// Directory holding sweep.toml.
    #[arg(long, env = "SWEEP_CONFIGURATION_DIRECTORY")]
    config_dir: Option<PathBuf>,

    /// Don't draw the progress spinner.
    #[arg(long)]
    no_progress: bool,
}

fn parse_since(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| format!("'{raw}' is not a YYYY-MM-DD date: {err}"))
}

/// 🖨️ The report, the way people have been grepping it for years.
fn print_report(report: &PipelineReport) {
    for (identity, result) in &report.results {
        println!("{identity}");
        for line in result.lines() {
            println!("--->{line}");
        }
    }
    println!("*** results: {} ***", report.run.item_count);
    println!("*** took: {} ms ***", report.run.elapsed_ms());
    println!("{}", sweep::progress::render_tally(report));
}

#[tokio::main]
async fn main() -> Result<()> {
    // 📡 logs go to stderr so stdout stays a clean report
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = async {
        let mut app_config = sweep::load_config(cli.config_dir.as_deref())
            .context("💀 Couldn't load the configuration. Check --config-dir / SWEEP_CONFIGURATION_DIRECTORY and the sweep.toml inside it.")?;
        if cli.no_progress {
            app_config.runtime.show_progress = false;
        }

        let worker_count = cli
            .workers
            .map(usize::try_from)
            .transpose()
            .context("💀 That many workers doesn't fit in this machine's idea of a number")?;
        let request = PipelineRequest {
            since: cli.since,
            worker_count,
        };

        sweep::run(app_config, request).await
    }
    .await;

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            let mut the_vibes_are_giving_connection_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("error sending request")
                    || cause_str.contains("onnection refused")
                    || cause_str.contains("tcp connect error")
                    || cause_str.contains("dns error")
                {
                    the_vibes_are_giving_connection_issues = true;
                }
            }
            if the_vibes_are_giving_connection_issues {
                error!("🔧 hint: looks like a service isn't reachable. Double-check widgets.url and that the host is up.");
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_both_positionals_show_up() {
        let cli = Cli::try_parse_from(["sweep", "2024-03-14", "4", "--no-progress"])
            .expect("valid args should parse");
        assert_eq!(cli.since, NaiveDate::from_ymd_opt(2024, 3, 14));
        assert_eq!(cli.workers, Some(4));
        assert!(cli.no_progress);
    }

    #[test]
    fn the_one_where_nobody_says_anything() {
        let cli = Cli::try_parse_from(["sweep"]).expect("no args is fine, defaults apply later");
        assert_eq!(cli.since, None);
        assert_eq!(cli.workers, None);
    }

    #[test]
    fn the_one_where_the_date_is_not_a_date() {
        assert!(Cli::try_parse_from(["sweep", "yesterday-ish"]).is_err());
        assert!(Cli::try_parse_from(["sweep", "2024-13-01"]).is_err());
    }

    #[test]
    fn the_one_where_zero_workers_is_a_usage_error() {
        assert!(Cli::try_parse_from(["sweep", "2024-03-14", "0"]).is_err());
    }
}
