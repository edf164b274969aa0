//! Headless fight runner.
//!
//! Runs fights without any frontend, controlled from the command line.
//! Designed for CI determinism checks and balance passes.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in duel with a fixed seed
//! cargo run -p fight_headless -- run --seed 7
//!
//! # Run a scenario file
//! cargo run -p fight_headless -- run --scenario scenarios/duel.ron --seed 7
//!
//! # Verify determinism by replaying the same seed
//! cargo run -p fight_headless -- verify --seed 12345 --runs 5
//!
//! # Sweep a batch of seeds and report win rates
//! cargo run -p fight_headless -- batch --count 100
//! ```
//!
//! Reports go to stdout as JSON; logs go to stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fight_core::unit::Team;
use fight_headless::driver::{verify_determinism, FightDriver};
use fight_headless::scenario::Scenario;

#[derive(Parser)]
#[command(name = "fight_headless")]
#[command(about = "Headless fight runner for CI and balance checks")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single fight and print the JSON report
    Run {
        /// Scenario file to load; the built-in duel when omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Scenario file to load; the built-in duel when omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Run a batch of seeds and report win rates
    Batch {
        /// Scenario file to load; the built-in duel when omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of fights to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Starting seed; fight N uses seed + N
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logging goes to stderr; stdout carries the JSON report.
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run { scenario, seed }) => {
            cmd_run(scenario, seed);
        }
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => {
            cmd_verify(scenario, seed, runs);
        }
        Some(Commands::Batch {
            scenario,
            count,
            seed,
        }) => {
            cmd_batch(scenario, count, seed);
        }
        None => {
            cmd_run(None, 0);
        }
    }
}

/// Load a scenario file, falling back to the built-in duel.
fn load_scenario(path: Option<PathBuf>) -> Scenario {
    match path {
        Some(path) => match Scenario::load(&path) {
            Ok(scenario) => scenario,
            Err(e) => {
                eprintln!("Failed to load scenario '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Scenario::duel(),
    }
}

/// Run a single fight
fn cmd_run(scenario: Option<PathBuf>, seed: u64) {
    let scenario = load_scenario(scenario);
    tracing::info!(scenario = %scenario.name, seed = seed, "Running fight");

    let report = match FightDriver::new(&scenario, seed).and_then(FightDriver::run) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Fight failed: {e}");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize report: {e}");
            std::process::exit(1);
        }
    }
}

/// Verify determinism
fn cmd_verify(scenario: Option<PathBuf>, seed: u64, runs: u32) {
    let scenario = load_scenario(scenario);
    tracing::info!(
        scenario = %scenario.name,
        seed = seed,
        runs = runs,
        "Verifying determinism"
    );

    match verify_determinism(&scenario, seed, runs) {
        Ok(true) => {
            eprintln!("PASS: All {runs} runs produced identical results");
        }
        Ok(false) => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: Error during verification: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a batch of seeds
fn cmd_batch(scenario: Option<PathBuf>, count: u32, seed_start: u64) {
    let scenario = load_scenario(scenario);
    tracing::info!(
        scenario = %scenario.name,
        count = count,
        seed_start = seed_start,
        "Running batch"
    );

    let mut upper_wins = 0u32;
    let mut lower_wins = 0u32;
    let mut draws = 0u32;
    let mut total_laps = 0u64;

    for n in 0..count {
        let seed = seed_start + u64::from(n);
        let report = match FightDriver::new(&scenario, seed).and_then(FightDriver::run) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("FATAL: Fight with seed {seed} failed: {e}");
                std::process::exit(1);
            }
        };
        total_laps += u64::from(report.laps);
        match report.winner {
            Some(Team::Upper) => upper_wins += 1,
            Some(Team::Lower) => lower_wins += 1,
            _ => draws += 1,
        }
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Fights played: {count}");
    eprintln!(
        "Upper wins: {} ({:.1}%)",
        upper_wins,
        f64::from(upper_wins) / f64::from(count.max(1)) * 100.0
    );
    eprintln!(
        "Lower wins: {} ({:.1}%)",
        lower_wins,
        f64::from(lower_wins) / f64::from(count.max(1)) * 100.0
    );
    eprintln!("Draws: {draws}");
    eprintln!(
        "Average laps: {:.1}",
        total_laps as f64 / f64::from(count.max(1))
    );
}
