use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use weather_observer::{NotifyPolicy, Report, Scenario};

/// Replay weather readings through the station's observers
#[derive(Parser, Debug)]
#[command(name = "weather_station", version)]
struct Args {
    /// Scenario file (TOML). Replays the built-in walkthrough when omitted
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Keep notifying the remaining observers when one fails
    #[arg(long)]
    best_effort: bool,

    /// Log verbosity (-v debug, -vv trace); RUST_LOG overrides it
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("weather_observer={level},weather_station={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &Report) {
    println!("{}", "=== Conditions ===".bold());
    if report.conditions.is_empty() {
        println!("{}", "(no updates)".dimmed());
    }
    for line in &report.conditions {
        println!("{}", line.green());
    }

    if let Some(summary) = &report.statistics {
        println!();
        println!("{}", "=== Statistics ===".bold());
        println!("{}", summary.cyan());
    }

    if !report.failures.is_empty() {
        println!();
        println!("{}", "=== Failures ===".bold());
        for failure in &report.failures {
            match std::error::Error::source(failure) {
                Some(cause) => println!("{} {}", failure.to_string().red(), cause),
                None => println!("{}", failure.to_string().red()),
            }
        }
    }

    println!();
    println!(
        "Final state: {} deg F, {}% humidity, {} inHg",
        report.temp, report.humidity, report.pressure
    );
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => Scenario::demo(),
    };
    if args.best_effort {
        scenario = scenario.with_notify_policy(NotifyPolicy::BestEffort);
    }

    let report = match scenario.run() {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{}", err.display_all().red());
            return Err(err).context("scenario aborted");
        }
    };
    print_report(&report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["weather_station", "-s", "demos/heatwave.toml", "--best-effort", "-vv"]);
        assert_eq!(args.scenario, Some(PathBuf::from("demos/heatwave.toml")));
        assert!(args.best_effort);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["weather_station"]);
        assert!(args.scenario.is_none());
        assert!(!args.best_effort);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_heatwave_demo_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/heatwave.toml");
        let report = Scenario::load(path).unwrap().run().unwrap();

        assert_eq!(report.conditions.len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.temp, 97.5);
    }
}
