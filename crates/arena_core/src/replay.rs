//! Battle records for replay and verification.
//!
//! A battle is fully determined by its configuration, its roster, the setup
//! actions applied before it started and the number of ticks it ran. A
//! record stores exactly that plus the final state hash, so replaying it
//! either reproduces the battle bit for bit or reports a mismatch.
//!
//! Records assume the battle was driven by [`Battle::tick`], i.e. with the
//! configured step.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::{BattleConfig, Roster};
use crate::error::{GameError, Result};
use crate::grid::{GridPos, Player};
use crate::simulation::{Battle, BattleOutcome};
use crate::unit::UnitId;
use crate::unit_kind::UnitKind;

/// Record file format version for compatibility.
pub const RECORD_VERSION: u32 = 1;

/// One setup-phase operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupAction {
    /// A unit was drafted onto a cell.
    Place {
        /// Kind drafted.
        kind: UnitKind,
        /// Owning player.
        owner: Player,
        /// Cell placed on.
        pos: GridPos,
    },
    /// A unit was taken off the board.
    Remove(UnitId),
    /// A unit was upgraded.
    Upgrade {
        /// Unit upgraded.
        unit: UnitId,
        /// Slot chosen, if the kind has a tree.
        slot: Option<usize>,
    },
    /// A player readied up.
    Ready(Player),
    /// Setup ended by timer or by explicit request.
    Start,
}

/// Everything needed to re-run a battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleRecord {
    /// Record format version.
    pub version: u32,
    /// Battle settings.
    pub config: BattleConfig,
    /// Unit definitions.
    pub roster: Roster,
    /// Setup actions in the order they were applied.
    pub actions: Vec<SetupAction>,
    /// Battle ticks run.
    pub ticks: u64,
    /// Result, if the battle finished.
    pub outcome: Option<BattleOutcome>,
    /// State hash after the last tick.
    pub final_hash: u64,
}

impl BattleRecord {
    /// Capture a battle in its current state.
    #[must_use]
    pub fn from_battle(battle: &Battle) -> Self {
        Self {
            version: RECORD_VERSION,
            config: *battle.config(),
            roster: battle.roster().clone(),
            actions: battle.actions().to_vec(),
            ticks: battle.tick_count(),
            outcome: battle.outcome(),
            final_hash: battle.state_hash(),
        }
    }

    /// Apply one recorded action to a battle.
    ///
    /// # Errors
    ///
    /// Returns whatever the battle returns for that action.
    pub fn apply(battle: &mut Battle, action: SetupAction) -> Result<()> {
        match action {
            SetupAction::Place { kind, owner, pos } => {
                battle.place_unit(kind, owner, pos)?;
            }
            SetupAction::Remove(id) => {
                battle.remove_unit(id)?;
            }
            SetupAction::Upgrade { unit, slot } => battle.upgrade_unit(unit, slot)?,
            SetupAction::Ready(player) => {
                battle.set_ready(player)?;
            }
            SetupAction::Start => {
                battle.start_battle()?;
            }
        }
        Ok(())
    }

    /// Re-run the battle from scratch.
    ///
    /// # Errors
    ///
    /// Fails if an action is rejected or the final hash differs.
    pub fn replay(&self) -> Result<Battle> {
        let mut battle = Battle::with_roster(self.config, self.roster.clone())?;
        for &action in &self.actions {
            Self::apply(&mut battle, action)?;
        }
        for _ in 0..self.ticks {
            battle.tick();
        }

        let replayed = battle.state_hash();
        if replayed != self.final_hash {
            return Err(GameError::ReplayMismatch {
                recorded: self.final_hash,
                replayed,
            });
        }
        Ok(battle)
    }

    /// Save the record to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize record: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to write record file: {e}")))?;
        Ok(())
    }

    /// Load a record from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails, or the file was
    /// written by an incompatible version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::Serialization(format!("Failed to read record file: {e}")))?;
        let record: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize record: {e}")))?;

        if record.version != RECORD_VERSION {
            return Err(GameError::Serialization(format!(
                "Record version mismatch: expected {RECORD_VERSION}, got {}",
                record.version
            )));
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;

    fn played() -> Battle {
        let config = BattleConfig::default().with_size(6, 6);
        let mut battle = Battle::new(config).unwrap();
        let knight = battle
            .place_unit(UnitKind::Knight, Player::Two, GridPos::new(2, 1))
            .unwrap();
        battle
            .place_unit(UnitKind::Archer, Player::Two, GridPos::new(4, 0))
            .unwrap();
        let spare = battle
            .place_unit(UnitKind::Mage, Player::One, GridPos::new(0, 5))
            .unwrap();
        battle.remove_unit(spare).unwrap();
        battle
            .place_unit(UnitKind::Berserker, Player::One, GridPos::new(2, 4))
            .unwrap();
        battle
            .place_unit(UnitKind::Soldier, Player::One, GridPos::new(3, 5))
            .unwrap();
        battle.upgrade_unit(knight, Some(1)).unwrap();
        battle.set_ready(Player::One).unwrap();
        battle.advance_setup(Fixed::from_num(100));
        battle.run_to_completion(2_000);
        battle
    }

    #[test]
    fn test_record_captures_actions() {
        let battle = played();
        let record = BattleRecord::from_battle(&battle);
        assert_eq!(record.actions.len(), 9);
        assert_eq!(record.actions.last(), Some(&SetupAction::Start));
        assert_eq!(record.ticks, battle.tick_count());
    }

    #[test]
    fn test_replay_reproduces_battle() {
        let battle = played();
        let record = BattleRecord::from_battle(&battle);
        let replayed = record.replay().unwrap();
        assert_eq!(replayed.state_hash(), battle.state_hash());
        assert_eq!(replayed.outcome(), battle.outcome());
    }

    #[test]
    fn test_tampered_record_is_detected() {
        let mut record = BattleRecord::from_battle(&played());
        record.final_hash ^= 1;
        assert!(matches!(
            record.replay(),
            Err(GameError::ReplayMismatch { .. })
        ));
    }
}
