//! Headless battle runner.
//!
//! Runs battles without any presentation layer. Summaries go to stdout as
//! JSON, logs to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Run one battle and print its summary
//! cargo run -p arena_headless -- run --scenario skirmish
//!
//! # Watch a battle as ASCII frames
//! cargo run -p arena_headless -- visualize --scenario shield_wall --every 20
//!
//! # Run all shipped scenarios in parallel
//! cargo run -p arena_headless -- batch crates/arena_headless/scenarios --output results/
//!
//! # Verify determinism
//! cargo run -p arena_headless -- verify --scenario skirmish --runs 8
//! ```
//!
//! `RUST_LOG` overrides the log level chosen by `--verbose`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arena_core::prelude::*;
use arena_headless::{
    ascii::{render_ascii, AsciiConfig},
    batch::{expand_scenarios, run_batch, BatchConfig},
    runner::{run_scenario, verify_determinism, RunConfig, DEFAULT_MAX_TICKS},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "arena_headless")]
#[command(about = "Headless grid battle runner for scenario testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single battle and print its summary
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Stop after this many ticks without an outcome
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Write a replay record to this file
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run many scenarios in parallel
    Batch {
        /// Scenario names, RON files or directories of RON files
        #[arg(default_values_t = Scenario::BUILTIN.map(String::from))]
        scenarios: Vec<String>,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Tick cap per battle
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Directory for batch_results.json (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running a scenario several times
    Verify {
        /// Scenario to test
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick cap per run
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },

    /// Re-run a recorded battle and check its final hash
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Print the final board
        #[arg(long)]
        ascii: bool,
    },

    /// Print a battle as ASCII frames
    Visualize {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Frame interval in ticks
        #[arg(short, long, default_value = "20")]
        every: u64,

        /// Tick cap
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for results)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            max_ticks,
            record,
        } => cmd_run(&scenario, max_ticks, record),
        Commands::Batch {
            scenarios,
            parallel,
            max_ticks,
            output,
        } => cmd_batch(&scenarios, parallel, max_ticks, output),
        Commands::Verify {
            scenario,
            runs,
            max_ticks,
        } => cmd_verify(&scenario, runs, max_ticks),
        Commands::Replay { file, ascii } => cmd_replay(file, ascii),
        Commands::Visualize {
            scenario,
            every,
            max_ticks,
            no_color,
        } => cmd_visualize(&scenario, every, max_ticks, no_color),
    }
}

fn load_scenario(name: &str) -> Scenario {
    match Scenario::resolve(name) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to encode result: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a single battle
fn cmd_run(scenario: &str, max_ticks: u64, record: Option<PathBuf>) {
    let scenario = load_scenario(scenario);
    tracing::info!(scenario = %scenario.name, "Running battle");

    let config = RunConfig {
        max_ticks,
        ..RunConfig::default()
    };
    let result = match run_scenario(&scenario, &config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Battle failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(path) = record {
        if let Err(e) = result.record().save(&path) {
            eprintln!("Failed to write replay: {}", e);
            std::process::exit(1);
        }
        eprintln!("Replay saved to: {}", path.display());
    }

    print_json(&result.summary);
}

/// Run a batch of scenarios
fn cmd_batch(scenarios: &[String], parallel: u32, max_ticks: u64, output: Option<PathBuf>) {
    let scenarios = match expand_scenarios(scenarios) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to list scenarios: {}", e);
            std::process::exit(1);
        }
    };

    let config = BatchConfig {
        scenarios,
        parallel,
        max_ticks,
    };
    let results = run_batch(config);

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Battles: {}", results.summary.total);
    eprintln!("  player 1 wins: {}", results.summary.player_one_wins);
    eprintln!("  player 2 wins: {}", results.summary.player_two_wins);
    eprintln!("  draws:         {}", results.summary.draws);
    eprintln!("  unfinished:    {}", results.summary.unfinished);
    eprintln!("Duration: {:.2}s", results.duration_seconds);
    if !results.errors.is_empty() {
        eprintln!("\nFAILURES:");
        for error in &results.errors {
            eprintln!("  {}: {}", error.scenario, error.message);
        }
    }

    match output {
        Some(dir) => {
            let path = dir.join("batch_results.json");
            if let Err(e) = results.save(&path) {
                eprintln!("FATAL: Failed to save results: {}", e);
                std::process::exit(1);
            }
            eprintln!("\nResults saved to: {}", path.display());
        }
        None => print_json(&results),
    }

    if !results.errors.is_empty() {
        std::process::exit(1);
    }
}

/// Verify determinism
fn cmd_verify(scenario: &str, runs: u32, max_ticks: u64) {
    let scenario = load_scenario(scenario);
    tracing::info!(
        "Verifying determinism: {} ({} runs)",
        scenario.name,
        runs
    );

    let report = match verify_determinism(&scenario, runs, max_ticks) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Battle failed: {}", e);
            std::process::exit(1);
        }
    };

    print_json(&report);
    if report.deterministic {
        eprintln!("PASS: All {} runs produced identical results", report.hashes.len());
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

/// Replay a recorded battle
fn cmd_replay(file: PathBuf, ascii: bool) {
    tracing::info!("Verifying replay: {}", file.display());

    let record = match BattleRecord::load(&file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load replay: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Loaded replay:");
    eprintln!("  Board: {}x{}", record.config.cols, record.config.rows);
    eprintln!("  Setup actions: {}", record.actions.len());
    eprintln!("  Duration: {} ticks", record.ticks);

    match record.replay() {
        Ok(battle) => {
            eprintln!("PASS: Replay verification successful");
            eprintln!("  Final hash: {:016x}", battle.state_hash());
            if let Some(outcome) = battle.outcome() {
                eprintln!("  Outcome: {}", outcome);
            }
            if ascii {
                let config = AsciiConfig::default();
                println!("{}", render_ascii(&battle, &config));
            }
        }
        Err(e) => {
            eprintln!("FAIL: {}", e);
            std::process::exit(1);
        }
    }
}

/// Print ASCII frames of a battle
fn cmd_visualize(scenario: &str, every: u64, max_ticks: u64, no_color: bool) {
    let scenario = load_scenario(scenario);
    tracing::info!("Visualizing: {}", scenario.name);

    let config = RunConfig {
        max_ticks,
        frame_every: Some(every),
        ascii: AsciiConfig {
            use_color: !no_color,
            ..AsciiConfig::default()
        },
    };
    match run_scenario(&scenario, &config) {
        Ok(result) => {
            for frame in &result.frames {
                println!("{}", frame);
            }
        }
        Err(e) => {
            eprintln!("Battle failed: {}", e);
            std::process::exit(1);
        }
    }
}
