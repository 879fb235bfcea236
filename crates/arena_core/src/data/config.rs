//! Battle configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::{fixed_decimal, Fixed};

use super::parse_error;

/// How units travel between cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementModel {
    /// Reserve the next cell, animate over `1 / move_speed` seconds with an
    /// ease-in/ease-out curve, then commit the move.
    #[default]
    Tween,
    /// Jump one cell at a time with a `1 / move_speed` cooldown between jumps.
    Discrete,
}

/// Tunables for a single battle.
///
/// # Example RON
///
/// ```ron
/// BattleConfig(
///     cols: 8,
///     rows: 8,
///     tick_seconds: 0.05,
///     movement_model: Tween,
///     max_battle_seconds: Some(120.0),
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Board width in cells.
    pub cols: u32,
    /// Board height in cells; the top half belongs to player two.
    pub rows: u32,
    /// Default simulation step for [`Battle::tick`](crate::simulation::Battle::tick).
    #[serde(with = "fixed_decimal")]
    pub tick_seconds: Fixed,
    /// Length of the setup phase before the battle starts on its own.
    #[serde(with = "fixed_decimal")]
    pub setup_seconds: Fixed,
    /// Movement realisation.
    pub movement_model: MovementModel,
    /// Time a projectile spends in the air.
    #[serde(with = "fixed_decimal")]
    pub projectile_flight_seconds: Fixed,
    /// Battle time after which the result is declared a draw.
    #[serde(with = "fixed_decimal::option")]
    pub max_battle_seconds: Option<Fixed>,
    /// How long a corpse takes to fade out (presentation only).
    #[serde(with = "fixed_decimal")]
    pub corpse_fade_seconds: Fixed,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            cols: 8,
            rows: 8,
            tick_seconds: Fixed::ONE / Fixed::from_num(20),
            setup_seconds: Fixed::from_num(30),
            movement_model: MovementModel::Tween,
            projectile_flight_seconds: Fixed::from_num(0.4),
            max_battle_seconds: Some(Fixed::from_num(180)),
            corpse_fade_seconds: Fixed::ONE,
        }
    }
}

impl BattleConfig {
    /// Parse a config from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Self::parse(ron, "<inline>")
    }

    /// Load a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| parse_error(&label, e))?;
        Self::parse(&contents, &label)
    }

    fn parse(ron: &str, label: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| parse_error(label, e))?;
        config.validate().map_err(|e| parse_error(label, e))?;
        Ok(config)
    }

    /// Check that the board is playable and time advances.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.cols == 0 {
            return Err("cols must be positive".into());
        }
        if self.rows < 2 {
            return Err("rows must be at least 2 so each player has a zone".into());
        }
        if self.tick_seconds <= Fixed::ZERO {
            return Err("tick_seconds must be positive".into());
        }
        if self.projectile_flight_seconds < Fixed::ZERO {
            return Err("projectile_flight_seconds cannot be negative".into());
        }
        Ok(())
    }

    /// Builder method to set the board size.
    #[must_use]
    pub const fn with_size(mut self, cols: u32, rows: u32) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    /// Builder method to set the movement model.
    #[must_use]
    pub const fn with_movement(mut self, model: MovementModel) -> Self {
        self.movement_model = model;
        self
    }

    /// Builder method to set the tick length.
    #[must_use]
    pub const fn with_tick_seconds(mut self, seconds: Fixed) -> Self {
        self.tick_seconds = seconds;
        self
    }
}
