//! Data structures for battle configuration and unit rosters.
//!
//! All structs deserialize from RON. Fractional values are written as
//! decimals in data files and converted to fixed-point once at load time.

mod config;
mod unit_data;

pub use config::{BattleConfig, MovementModel};
pub use unit_data::{Roster, UnitData, UnitStats, MAX_BASE_STAT};

use crate::error::GameError;

/// Wrap a RON parse failure with the path (or label) it came from.
fn parse_error(path: &str, err: impl std::fmt::Display) -> GameError {
    GameError::DataParseError {
        path: path.to_string(),
        message: err.to_string(),
    }
}
