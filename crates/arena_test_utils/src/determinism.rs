//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Battles must be fully reproducible so that replays verify and so that a
//! recorded result can be trusted. Sources of non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`arena_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Units are stored in a `BTreeMap` and
//!   updated in grid scan order.
//!
//! - **Randomness**: The engine has none.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use arena_core::simulation::Battle;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run the same battle `runs` times for `ticks` ticks each and compare the
/// final state hashes.
///
/// `setup` should return a battle that has already started.
pub fn verify_battle_determinism<F>(setup: F, runs: usize, ticks: u64) -> DeterminismResult
where
    F: Fn() -> Battle,
{
    verify_determinism(
        runs,
        ticks,
        setup,
        |battle| {
            battle.tick();
        },
        Battle::state_hash,
    )
}

/// Run N battles on scoped threads and collect the final hashes.
///
/// Catches non-determinism that only shows up under different memory
/// layouts or scheduling.
pub fn run_parallel_battles<F>(setup: F, num_battles: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Battle + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup();
                    for _ in 0..num_ticks {
                        battle.tick();
                    }
                    battle.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let mut a = setup();
    let mut b = setup();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.tick();
        b.tick();

        if a.state_hash() != b.state_hash() {
            tracing::warn!(tick, "Battles diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that a serialization round-trip preserves the battle exactly,
/// including how it continues afterwards.
pub fn verify_serialization_determinism<F>(setup: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    let mut battle = setup();
    for _ in 0..num_ticks {
        battle.tick();
    }

    let Ok(bytes) = battle.serialize() else {
        return false;
    };
    let Ok(mut restored) = Battle::deserialize(&bytes) else {
        return false;
    };
    if restored.state_hash() != battle.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        battle.tick();
        restored.tick();
    }
    restored.state_hash() == battle.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle inputs.
pub mod strategies {
    use arena_core::grid::{GridPos, Player};
    use arena_core::unit_kind::UnitKind;
    use proptest::prelude::*;

    /// Any unit kind.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        prop::sample::select(UnitKind::ALL.to_vec())
    }

    /// Either player.
    pub fn arb_player() -> impl Strategy<Value = Player> {
        prop::sample::select(Player::ALL.to_vec())
    }

    /// Any cell on a `cols x rows` board.
    pub fn arb_grid_pos(cols: u32, rows: u32) -> impl Strategy<Value = GridPos> {
        (0..cols, 0..rows).prop_map(|(col, row)| GridPos::new(col, row))
    }

    /// A cell inside `player`'s zone of a `cols x rows` board.
    pub fn arb_zone_pos(cols: u32, rows: u32, player: Player) -> impl Strategy<Value = GridPos> {
        let half = rows / 2;
        let rows = match player {
            Player::Two => 0..half,
            Player::One => half..rows,
        };
        (0..cols, rows).prop_map(|(col, row)| GridPos::new(col, row))
    }

    /// A list of `(kind, cell)` drafts for one player, possibly with
    /// colliding cells.
    pub fn arb_drafts(
        cols: u32,
        rows: u32,
        player: Player,
        max: usize,
    ) -> impl Strategy<Value = Vec<(UnitKind, GridPos)>> {
        prop::collection::vec((arb_unit_kind(), arb_zone_pos(cols, rows, player)), 0..=max)
    }
}
