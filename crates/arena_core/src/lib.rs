//! # Arena Core
//!
//! Deterministic battle engine for a 1v1 grid autobattler.
//!
//! Players place units on their half of the board during setup; once the
//! battle starts, unit AI takes over and the board resolves on its own.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond explicit load/save helpers
//! - No randomness
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`grid`] - Board occupancy, zones and movement reservations
//! - [`pathfinding`] - A* over the grid
//! - [`unit`] - Unit entity and upgrade rules
//! - [`behavior`] - Per-kind damage, kill, battle-start and passive hooks
//! - [`systems`] - Per-tick unit AI
//! - [`simulation`] - Setup phase, tick loop and win detection
//! - [`replay`] - Battle records
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod behavior;
pub mod combat;
pub mod data;
pub mod error;
pub mod grid;
pub mod math;
pub mod pathfinding;
pub mod replay;
pub mod simulation;
pub mod systems;
pub mod unit;
pub mod unit_kind;
pub mod upgrades;
pub mod view;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::data::{BattleConfig, MovementModel, Roster, UnitData, UnitStats};
    pub use crate::error::{GameError, PlacementError, Result, UpgradeError};
    pub use crate::grid::{Grid, GridPos, Player};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::{BattleRecord, SetupAction};
    pub use crate::simulation::{Battle, BattleOutcome, BattlePhase, TickEvents};
    pub use crate::unit::{Unit, UnitId, UnitState};
    pub use crate::unit_kind::UnitKind;
    pub use crate::upgrades::{PassiveKind, UpgradeEffect, MAX_LEVEL};
    pub use crate::view::{ProjectileView, UnitView};
}
