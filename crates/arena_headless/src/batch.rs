//! Batch runner over many scenarios.
//!
//! Runs every scenario in parallel using rayon and aggregates outcomes.
//! Battles are deterministic, so a batch is a sweep over setups rather
//! than over seeds.

use std::path::{Path, PathBuf};
use std::time::Instant;

use arena_core::prelude::{BattleOutcome, Player};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::runner::{run_scenario, BattleSummary, RunConfig, DEFAULT_MAX_TICKS};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Built-in scenario names or RON file paths.
    pub scenarios: Vec<String>,
    /// Maximum parallel battles (0 = use rayon default).
    pub parallel: u32,
    /// Tick cap per battle.
    pub max_ticks: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenarios: Scenario::BUILTIN.iter().map(|s| (*s).to_string()).collect(),
            parallel: 0,
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

impl BatchConfig {
    /// Create config for a list of scenarios.
    pub fn new(scenarios: Vec<String>) -> Self {
        Self {
            scenarios,
            ..Default::default()
        }
    }

    /// Set the tick cap.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }
}

/// Error during a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Scenario name or path.
    pub scenario: String,
    /// Error message.
    pub message: String,
}

/// Aggregate outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Battles that ran.
    pub total: u32,
    /// Victories for player one.
    pub player_one_wins: u32,
    /// Victories for player two.
    pub player_two_wins: u32,
    /// Draws.
    pub draws: u32,
    /// Battles stopped by the tick cap.
    pub unfinished: u32,
}

impl BatchSummary {
    /// Tally outcomes.
    pub fn from_battles(battles: &[BattleSummary]) -> Self {
        let mut summary = Self::default();
        for battle in battles {
            summary.total += 1;
            match battle.outcome {
                Some(BattleOutcome::Victory(Player::One)) => summary.player_one_wins += 1,
                Some(BattleOutcome::Victory(Player::Two)) => summary.player_two_wins += 1,
                Some(BattleOutcome::Draw) => summary.draws += 1,
                None => summary.unfinished += 1,
            }
        }
        summary
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-battle summaries, in scenario order.
    pub battles: Vec<BattleSummary>,
    /// Aggregate counts.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
    /// Scenarios that failed to load or build.
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Expand directories into the `.ron` files they contain, sorted by path.
/// Other entries pass through unchanged.
pub fn expand_scenarios(entries: &[String]) -> std::io::Result<Vec<String>> {
    let mut out = Vec::new();
    for entry in entries {
        let path = Path::new(entry);
        if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
                .collect();
            files.sort();
            out.extend(files.into_iter().map(|p| p.display().to_string()));
        } else {
            out.push(entry.clone());
        }
    }
    Ok(out)
}

fn run_one(name: &str, run: &RunConfig) -> Result<BattleSummary, ScenarioError> {
    let scenario = Scenario::resolve(name)?;
    Ok(run_scenario(&scenario, run)?.summary)
}

/// Run a batch of scenarios.
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!("Starting batch run: {} scenarios", config.scenarios.len());

    // Configure thread pool if specified
    if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let run = RunConfig {
        max_ticks: config.max_ticks,
        ..RunConfig::default()
    };
    let results: Vec<Result<BattleSummary, BatchError>> = config
        .scenarios
        .par_iter()
        .map(|name| {
            run_one(name, &run).map_err(|e| {
                warn!("Scenario {} failed: {}", name, e);
                BatchError {
                    scenario: name.clone(),
                    message: e.to_string(),
                }
            })
        })
        .collect();

    let (battles, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let battles: Vec<BattleSummary> = battles.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_battles(&battles);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({} failed)",
        battles.len(),
        duration_seconds,
        errors.len()
    );

    BatchResults {
        config,
        battles,
        summary,
        duration_seconds,
        errors,
    }
}
