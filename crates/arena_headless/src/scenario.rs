//! Scenario loading and battle construction.
//!
//! A scenario is a complete setup phase written down: board and timing
//! config, an optional roster override, every placement with its upgrades,
//! and how the battle is started.

use std::path::Path;

use arena_core::prelude::{
    Battle, BattleConfig, BattlePhase, Fixed, GameError, GridPos, Player, Roster, TickEvents,
    UnitKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The engine rejected part of the setup.
    #[error("Scenario '{scenario}' rejected: {source}")]
    Rejected {
        /// Scenario name.
        scenario: String,
        /// Engine error.
        source: GameError,
    },
}

/// How the setup phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StartMode {
    /// Call `start_battle` right after the last placement.
    #[default]
    Immediate,
    /// Both players declare ready.
    BothReady,
    /// Let the setup timer run out.
    Timer,
}

/// A unit to draft during setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit kind.
    pub kind: UnitKind,
    /// Owning player.
    pub owner: Player,
    /// Target cell as `(col, row)`.
    pub cell: (u32, u32),
    /// Upgrades to buy, in order. `None` for kinds without a tree.
    #[serde(default)]
    pub upgrades: Vec<Option<usize>>,
}

impl UnitPlacement {
    /// Create a placement without upgrades.
    #[must_use]
    pub fn new(kind: UnitKind, owner: Player, col: u32, row: u32) -> Self {
        Self {
            kind,
            owner,
            cell: (col, row),
            upgrades: Vec::new(),
        }
    }

    /// Add upgrades to buy after placing.
    #[must_use]
    pub fn with_upgrades(mut self, upgrades: &[Option<usize>]) -> Self {
        self.upgrades = upgrades.to_vec();
        self
    }

    /// Target cell.
    #[must_use]
    pub fn pos(&self) -> GridPos {
        GridPos::new(self.cell.0, self.cell.1)
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Board and timing settings.
    #[serde(default)]
    pub config: BattleConfig,
    /// Unit definitions; built-in stats when absent.
    #[serde(default)]
    pub roster: Option<Roster>,
    /// Units drafted during setup.
    pub placements: Vec<UnitPlacement>,
    /// How setup ends.
    #[serde(default)]
    pub start: StartMode,
}

impl Scenario {
    /// Names accepted by [`Scenario::builtin`].
    pub const BUILTIN: [&'static str; 3] = ["duel", "skirmish", "shield_wall"];

    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A built-in scenario name, or else a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Some(scenario) => Ok(scenario),
            None => Self::load(name_or_path),
        }
    }

    /// Look up a built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "duel" => Some(Self::duel()),
            "skirmish" => Some(Self::skirmish()),
            "shield_wall" => Some(Self::shield_wall()),
            _ => None,
        }
    }

    /// Two soldiers trading blows on a 4x4 board, one-second ticks.
    #[must_use]
    pub fn duel() -> Self {
        let config = BattleConfig {
            tick_seconds: Fixed::ONE,
            max_battle_seconds: None,
            ..BattleConfig::default().with_size(4, 4)
        };
        Self {
            name: "duel".to_string(),
            description: "Soldier against soldier; the top player strikes first".to_string(),
            config,
            roster: None,
            placements: vec![
                UnitPlacement::new(UnitKind::Soldier, Player::Two, 1, 1),
                UnitPlacement::new(UnitKind::Soldier, Player::One, 1, 2),
            ],
            start: StartMode::Immediate,
        }
    }

    /// One of every kind per side on the default 8x8 board.
    #[must_use]
    pub fn skirmish() -> Self {
        let mut placements = Vec::new();
        for (col, kind) in (0u32..).zip(UnitKind::ALL) {
            let back = u32::from(kind.is_ranged());
            placements.push(UnitPlacement::new(kind, Player::Two, col + 1, 2 - back));
            placements.push(UnitPlacement::new(kind, Player::One, 6 - col, 5 + back));
        }
        Self {
            name: "skirmish".to_string(),
            description: "Mirror match with every unit kind".to_string(),
            config: BattleConfig::default(),
            roster: None,
            placements,
            start: StartMode::BothReady,
        }
    }

    /// Upgraded knights shielding archers against a berserker rush.
    #[must_use]
    pub fn shield_wall() -> Self {
        Self {
            name: "shield_wall".to_string(),
            description: "Taunting knights and archers hold against berserkers".to_string(),
            config: BattleConfig::default(),
            roster: None,
            placements: vec![
                UnitPlacement::new(UnitKind::Knight, Player::One, 2, 5)
                    .with_upgrades(&[Some(1), Some(0)]),
                UnitPlacement::new(UnitKind::Knight, Player::One, 5, 5).with_upgrades(&[Some(1)]),
                UnitPlacement::new(UnitKind::Archer, Player::One, 3, 7).with_upgrades(&[Some(2)]),
                UnitPlacement::new(UnitKind::Archer, Player::One, 4, 7),
                UnitPlacement::new(UnitKind::Berserker, Player::Two, 2, 1)
                    .with_upgrades(&[Some(0), Some(1)]),
                UnitPlacement::new(UnitKind::Berserker, Player::Two, 5, 1).with_upgrades(&[Some(0)]),
                UnitPlacement::new(UnitKind::Soldier, Player::Two, 3, 2).with_upgrades(&[None]),
                UnitPlacement::new(UnitKind::Mage, Player::Two, 7, 0),
            ],
            start: StartMode::Timer,
        }
    }

    /// Total draft and upgrade spend per player, `[one, two]`.
    #[must_use]
    pub fn spend(&self) -> [u32; 2] {
        let roster = self.roster.clone().unwrap_or_default();
        let mut spend = [0; 2];
        for placement in &self.placements {
            let cost = roster.cost(placement.kind);
            let purchases = 1 + placement.upgrades.len() as u32;
            spend[placement.owner.index()] += cost * purchases;
        }
        spend
    }

    /// Run the setup phase. The returned battle has started unless the
    /// start mode is [`StartMode::Timer`], in which case the caller drives
    /// [`Battle::advance_setup`].
    pub fn build(&self) -> Result<Battle, ScenarioError> {
        self.setup().map(|(battle, _)| battle)
    }

    /// Like [`Scenario::build`], also returning the battle-start events
    /// when the battle was started.
    pub fn setup(&self) -> Result<(Battle, Option<TickEvents>), ScenarioError> {
        let reject = |source: GameError| ScenarioError::Rejected {
            scenario: self.name.clone(),
            source,
        };

        let roster = self.roster.clone().unwrap_or_default();
        let mut battle = Battle::with_roster(self.config, roster).map_err(reject)?;

        for placement in &self.placements {
            let id = battle
                .place_unit(placement.kind, placement.owner, placement.pos())
                .map_err(reject)?;
            for &slot in &placement.upgrades {
                battle.upgrade_unit(id, slot).map_err(reject)?;
            }
        }
        debug!(
            scenario = %self.name,
            units = self.placements.len(),
            "Setup complete"
        );

        let started = match self.start {
            StartMode::Immediate => Some(battle.start_battle().map_err(reject)?),
            StartMode::BothReady => {
                let mut started = None;
                for player in Player::ALL {
                    started = battle.set_ready(player).map_err(reject)?;
                }
                started
            }
            StartMode::Timer => None,
        };
        Ok((battle, started))
    }
}
