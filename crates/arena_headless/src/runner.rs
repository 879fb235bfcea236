//! Single-battle runner.
//!
//! Drives a scenario through setup and the tick loop to an outcome (or a
//! tick cap), tallying events and optionally capturing ASCII frames.

use arena_core::prelude::{
    Battle, BattleOutcome, BattlePhase, BattleRecord, GridPos, Player, TickEvents, UnitKind,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ascii::{render_ascii, AsciiConfig};
use crate::scenario::{Scenario, ScenarioError};

/// Default tick cap, far above any timed-out battle at the default step.
pub const DEFAULT_MAX_TICKS: u64 = 100_000;

/// Options for a single run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Stop after this many battle ticks even without an outcome.
    pub max_ticks: u64,
    /// Capture an ASCII frame every N ticks (and once at the end).
    pub frame_every: Option<u64>,
    /// Frame rendering options.
    pub ascii: AsciiConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_ticks: DEFAULT_MAX_TICKS,
            frame_every: None,
            ascii: AsciiConfig {
                use_color: false,
                ..AsciiConfig::default()
            },
        }
    }
}

/// A unit still standing when the run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survivor {
    /// Unit ID.
    pub id: u32,
    /// Unit kind.
    pub kind: UnitKind,
    /// Owner.
    pub owner: Player,
    /// Final cell.
    pub cell: GridPos,
    /// Remaining health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Upgrade level.
    pub level: u8,
}

/// Event totals over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTotals {
    /// Melee hits.
    pub attacks: u32,
    /// Projectiles fired.
    pub projectiles_fired: u32,
    /// Projectiles that reached a living target.
    pub projectiles_hit: u32,
    /// Units killed.
    pub kills: u32,
    /// Completed cell moves.
    pub moves: u32,
    /// Taunts applied at battle start.
    pub taunts: u32,
}

impl EventTotals {
    /// Add one tick's events.
    pub fn record(&mut self, events: &TickEvents) {
        self.attacks += events.attacks.len() as u32;
        self.projectiles_fired += events.projectile_launches.len() as u32;
        self.projectiles_hit += events
            .projectile_impacts
            .iter()
            .filter(|i| i.damage > 0)
            .count() as u32;
        self.kills += events.kills.len() as u32;
        self.moves += events.moves.len() as u32;
        self.taunts += events.taunts.len() as u32;
    }
}

/// JSON summary of one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSummary {
    /// Scenario name.
    pub scenario: String,
    /// Outcome, or `None` if the tick cap was hit first.
    pub outcome: Option<BattleOutcome>,
    /// Winning player, if any.
    pub winner: Option<Player>,
    /// Battle ticks run.
    pub ticks: u64,
    /// Battle time in seconds.
    pub battle_seconds: f64,
    /// State hash at the end of the run.
    pub final_hash: u64,
    /// Draft and upgrade spend per player, `[one, two]`.
    pub spend: [u32; 2],
    /// Event totals.
    pub events: EventTotals,
    /// Living units at the end, in ID order.
    pub survivors: Vec<Survivor>,
}

impl BattleSummary {
    fn collect(scenario: &Scenario, battle: &Battle, events: EventTotals) -> Self {
        let survivors = battle
            .units()
            .values()
            .filter(|u| u.is_alive())
            .map(|u| Survivor {
                id: u.id().as_u32(),
                kind: u.kind(),
                owner: u.owner(),
                cell: u.pos(),
                health: u.health(),
                max_health: u.max_health(),
                level: u.level(),
            })
            .collect();
        let outcome = battle.outcome();
        Self {
            scenario: scenario.name.clone(),
            outcome,
            winner: outcome.and_then(|o| o.winner()),
            ticks: battle.tick_count(),
            battle_seconds: battle.elapsed().to_num::<f64>(),
            final_hash: battle.state_hash(),
            spend: scenario.spend(),
            events,
            survivors,
        }
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunResult {
    /// The battle in its final state.
    pub battle: Battle,
    /// JSON-ready summary.
    pub summary: BattleSummary,
    /// Captured ASCII frames, oldest first.
    pub frames: Vec<String>,
}

impl RunResult {
    /// A replay record of this run.
    #[must_use]
    pub fn record(&self) -> BattleRecord {
        BattleRecord::from_battle(&self.battle)
    }
}

/// Build a scenario's battle and run it to an outcome or the tick cap.
pub fn run_scenario(scenario: &Scenario, config: &RunConfig) -> Result<RunResult, ScenarioError> {
    let (mut battle, mut start) = scenario.setup()?;
    let step = battle.config().tick_seconds;
    while battle.phase() == BattlePhase::Setup {
        start = battle.advance_setup(step);
    }
    debug!(
        scenario = %scenario.name,
        units = battle.units().len(),
        "Running scenario"
    );

    let mut totals = EventTotals::default();
    if let Some(events) = &start {
        totals.record(events);
    }

    let mut frames = Vec::new();
    while !battle.is_finished() && battle.tick_count() < config.max_ticks {
        let events = battle.tick();
        totals.record(&events);

        if let Some(every) = config.frame_every {
            if every > 0 && battle.tick_count() % every == 0 {
                frames.push(render_ascii(&battle, &config.ascii));
            }
        }
    }
    if let Some(every) = config.frame_every {
        let ticks = battle.tick_count();
        let captured = every > 0 && ticks > 0 && ticks % every == 0;
        if !captured {
            frames.push(render_ascii(&battle, &config.ascii));
        }
    }

    match battle.outcome() {
        Some(outcome) => info!(
            scenario = %scenario.name,
            ticks = battle.tick_count(),
            %outcome,
            "Battle finished"
        ),
        None => warn!(
            scenario = %scenario.name,
            ticks = battle.tick_count(),
            "Tick cap reached without an outcome"
        ),
    }

    let summary = BattleSummary::collect(scenario, &battle, totals);
    Ok(RunResult {
        battle,
        summary,
        frames,
    })
}

/// Result of running the same scenario several times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Scenario name.
    pub scenario: String,
    /// Final hash of every run, in run order.
    pub hashes: Vec<u64>,
    /// Tick count of every run.
    pub ticks: Vec<u64>,
    /// Whether every run agreed.
    pub deterministic: bool,
}

/// Run `runs` copies of a scenario in parallel and compare final states.
pub fn verify_determinism(
    scenario: &Scenario,
    runs: u32,
    max_ticks: u64,
) -> Result<DeterminismReport, ScenarioError> {
    let config = RunConfig {
        max_ticks,
        ..RunConfig::default()
    };
    let summaries: Vec<BattleSummary> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| run_scenario(scenario, &config).map(|r| r.summary))
        .collect::<Result<_, _>>()?;

    let hashes: Vec<u64> = summaries.iter().map(|s| s.final_hash).collect();
    let ticks: Vec<u64> = summaries.iter().map(|s| s.ticks).collect();
    let deterministic = summaries.windows(2).all(|w| w[0] == w[1]);
    debug!(scenario = %scenario.name, runs, deterministic, "Determinism check");

    Ok(DeterminismReport {
        scenario: scenario.name.clone(),
        hashes,
        ticks,
        deterministic,
    })
}
