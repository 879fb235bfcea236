//! Error types for the battle engine.
//!
//! Recoverable races (a reservation conflict, a missing path) are not errors.
//! They surface as `bool` or `Option` returns and are retried on the next tick.

use thiserror::Error;

use crate::grid::GridPos;
use crate::unit::UnitId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Rejected setup-phase placement or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The cell lies outside the board.
    #[error("Cell {0} is outside the grid")]
    OutOfBounds(GridPos),

    /// Another unit already occupies the cell.
    #[error("Cell {0} is already occupied")]
    Occupied(GridPos),

    /// The cell belongs to the other player's zone.
    #[error("Cell {0} is not owned by the placing player")]
    WrongOwner(GridPos),

    /// Placement is only legal during the setup phase.
    #[error("Units can only be placed or removed during setup")]
    WrongPhase,

    /// No unit with this identifier exists.
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),
}

/// Rejected upgrade request. The unit is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UpgradeError {
    /// The unit is already at the maximum level.
    #[error("Unit is already at max level {0}")]
    MaxLevel(u8),

    /// The requested slot was selected by an earlier upgrade.
    #[error("Upgrade slot {0} is already active")]
    SlotAlreadyActive(usize),

    /// The unit kind does not define the requested slot.
    #[error("Unit kind has no upgrade slot {0}")]
    UnknownSlot(usize),

    /// The unit kind has an upgrade tree and no slot was named.
    #[error("An upgrade slot must be selected for this unit kind")]
    SlotRequired,

    /// Dead units cannot be upgraded.
    #[error("Cannot upgrade a dead unit")]
    Dead,

    /// Upgrades are only legal during the setup phase.
    #[error("Units can only be upgraded during setup")]
    WrongPhase,
}

/// Top-level error type for all battle engine errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Placement was rejected.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// Upgrade was rejected.
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),

    /// Invalid unit reference.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// `start_battle` was called after the battle already started.
    #[error("Battle has already started")]
    BattleAlreadyStarted,

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path (or label) of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Binary state (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A replayed battle diverged from its recording.
    #[error("Replay mismatch: recorded hash {recorded}, replayed hash {replayed}")]
    ReplayMismatch {
        /// Hash stored in the record.
        recorded: u64,
        /// Hash produced by the replay.
        replayed: u64,
    },

    /// Invalid engine state.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),
}
