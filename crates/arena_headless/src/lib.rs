//! Headless battle runner for scenario testing and CI verification.
//!
//! This crate loads battle scenarios (board config, roster and a written-down
//! setup phase), runs them to an outcome without any presentation layer and
//! reports the result as JSON. This enables:
//!
//! - **Balance sweeps**: Run many setups in parallel and tally outcomes
//! - **CI verification**: Check that battles are deterministic
//! - **Replay verification**: Check that recorded battles reproduce exactly
//!
//! # Output
//!
//! - **stdout**: JSON summaries (or ASCII boards for `visualize`)
//! - **stderr**: Logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Run a built-in scenario
//! cargo run -p arena_headless -- run --scenario duel
//!
//! # Run every shipped scenario
//! cargo run -p arena_headless -- batch crates/arena_headless/scenarios
//!
//! # Record and verify a replay
//! cargo run -p arena_headless -- run --scenario skirmish --record skirmish.replay
//! cargo run -p arena_headless -- replay --file skirmish.replay --verify
//! ```

pub mod ascii;
pub mod batch;
pub mod runner;
pub mod scenario;

pub use ascii::{render_ascii, AsciiConfig};
pub use batch::{run_batch, BatchConfig, BatchResults};
pub use runner::{run_scenario, verify_determinism, BattleSummary, RunConfig};
pub use scenario::{Scenario, ScenarioError, StartMode, UnitPlacement};
