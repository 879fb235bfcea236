//! Test fixtures and helpers.
//!
//! Pre-built boards and battle configurations for consistent testing.

use arena_core::prelude::*;
use fixed::types::I32F32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// A unit to place, plus the upgrades to apply to it during setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Kind to draft.
    pub kind: UnitKind,
    /// Owning player.
    pub owner: Player,
    /// Cell to place on.
    pub pos: GridPos,
    /// Upgrade slots applied in order.
    pub upgrades: Vec<Option<usize>>,
}

/// Fluent builder for battles in tests.
///
/// Defaults to whole-second ticks so scenario arithmetic stays readable,
/// and no time limit.
#[derive(Debug, Clone)]
pub struct BoardBuilder {
    config: BattleConfig,
    roster: Roster,
    placements: Vec<Placement>,
}

impl BoardBuilder {
    /// Start a board of the given size.
    #[must_use]
    pub fn new(cols: u32, rows: u32) -> Self {
        let mut config = BattleConfig::default()
            .with_size(cols, rows)
            .with_tick_seconds(Fixed::ONE);
        config.max_battle_seconds = None;
        Self {
            config,
            roster: Roster::default(),
            placements: Vec::new(),
        }
    }

    /// Replace the whole configuration (board size included).
    #[must_use]
    pub fn config(mut self, config: BattleConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom roster.
    #[must_use]
    pub fn roster(mut self, roster: Roster) -> Self {
        self.roster = roster;
        self
    }

    /// Set the tick length.
    #[must_use]
    pub fn tick_seconds(mut self, seconds: Fixed) -> Self {
        self.config.tick_seconds = seconds;
        self
    }

    /// Declare a draw after `seconds` of battle.
    #[must_use]
    pub fn time_limit(mut self, seconds: Fixed) -> Self {
        self.config.max_battle_seconds = Some(seconds);
        self
    }

    /// Set the movement model.
    #[must_use]
    pub fn movement(mut self, model: MovementModel) -> Self {
        self.config.movement_model = model;
        self
    }

    /// Place a level-0 unit.
    #[must_use]
    pub fn unit(self, kind: UnitKind, owner: Player, col: u32, row: u32) -> Self {
        self.upgraded(kind, owner, col, row, &[])
    }

    /// Place a unit and upgrade it.
    #[must_use]
    pub fn upgraded(
        mut self,
        kind: UnitKind,
        owner: Player,
        col: u32,
        row: u32,
        upgrades: &[Option<usize>],
    ) -> Self {
        self.placements.push(Placement {
            kind,
            owner,
            pos: GridPos::new(col, row),
            upgrades: upgrades.to_vec(),
        });
        self
    }

    /// Build the battle, still in setup.
    ///
    /// # Panics
    ///
    /// Panics if the configuration or any placement or upgrade is invalid.
    #[must_use]
    pub fn build(self) -> Battle {
        let mut battle =
            Battle::with_roster(self.config, self.roster).expect("invalid test configuration");
        for placement in self.placements {
            let id = battle
                .place_unit(placement.kind, placement.owner, placement.pos)
                .unwrap_or_else(|e| panic!("cannot place {placement:?}: {e}"));
            for slot in placement.upgrades {
                battle
                    .upgrade_unit(id, slot)
                    .unwrap_or_else(|e| panic!("cannot upgrade {id} with {slot:?}: {e}"));
            }
        }
        battle
    }

    /// Build the battle and start it.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`build`](Self::build).
    #[must_use]
    pub fn build_started(self) -> Battle {
        let mut battle = self.build();
        battle.start_battle().expect("fresh battle cannot already be started");
        battle
    }
}

/// The unit standing on a cell.
///
/// # Panics
///
/// Panics if the cell is empty.
#[must_use]
pub fn unit_at(battle: &Battle, col: u32, row: u32) -> UnitId {
    battle
        .grid()
        .unit_at(GridPos::new(col, row))
        .unwrap_or_else(|| panic!("no unit at ({col}, {row})"))
}

/// Two soldiers face to face across the zone border of a 4x4 board.
#[must_use]
pub fn melee_duel() -> BoardBuilder {
    BoardBuilder::new(4, 4)
        .unit(UnitKind::Soldier, Player::Two, 1, 1)
        .unit(UnitKind::Soldier, Player::One, 1, 2)
}

/// Every kind on both sides of an 8x8 board, at the default tick rate.
#[must_use]
pub fn mixed_skirmish() -> BoardBuilder {
    let mut builder = BoardBuilder::new(8, 8).tick_seconds(BattleConfig::default().tick_seconds);
    for (col, kind) in (0u32..).zip(UnitKind::ALL) {
        let back = u32::from(kind.is_ranged());
        builder = builder
            .unit(kind, Player::Two, col + 1, 2 - back)
            .unit(kind, Player::One, 6 - col, 5 + back);
    }
    builder
}

/// A wide board with `per_side` soldiers and archers for each player.
///
/// Used for benchmarks.
#[must_use]
pub fn large_battle(per_side: u32) -> BoardBuilder {
    let cols = per_side.max(4);
    let mut builder = BoardBuilder::new(cols, 12).tick_seconds(BattleConfig::default().tick_seconds);
    for col in 0..per_side {
        let kind = if col % 3 == 0 {
            UnitKind::Archer
        } else {
            UnitKind::Soldier
        };
        builder = builder
            .unit(kind, Player::Two, col, 1)
            .unit(kind, Player::One, col, 10);
    }
    builder
}
