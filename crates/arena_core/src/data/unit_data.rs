//! Per-kind base stats and costs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::{fixed_decimal, Fixed};
use crate::unit_kind::UnitKind;

use super::parse_error;

/// Upper bound for base health and damage, so fully upgraded values and
/// the damage bonuses on top of them stay well inside `u32`.
pub const MAX_BASE_STAT: u32 = 1_000_000;

/// Base (level 0) statistics for a unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum health at level 0.
    pub health: u32,
    /// Damage per hit at level 0.
    pub damage: u32,
    /// Attacks per second.
    #[serde(with = "fixed_decimal")]
    pub attack_speed: Fixed,
    /// Cells per second.
    #[serde(with = "fixed_decimal")]
    pub move_speed: Fixed,
    /// 0 for melee (8 adjacent cells), otherwise Manhattan reach.
    pub attack_range: u32,
    /// Battle-start taunt radius in cells (0 = no taunt).
    #[serde(default)]
    pub taunt_radius: u32,
    /// Battle-start taunt duration.
    #[serde(default, with = "fixed_decimal")]
    pub taunt_seconds: Fixed,
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     kind: Archer,
///     cost: 2,
///     stats: UnitStats(
///         health: 8,
///         damage: 1,
///         attack_speed: 1.0,
///         move_speed: 1.0,
///         attack_range: 3,
///     ),
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    /// Which kind this entry describes.
    pub kind: UnitKind,
    /// Currency cost to draft or upgrade. Currency itself lives outside the engine.
    pub cost: u32,
    /// Base stats.
    pub stats: UnitStats,
}

impl UnitData {
    /// Built-in definition for a kind.
    #[must_use]
    pub fn builtin(kind: UnitKind) -> Self {
        let one = Fixed::ONE;
        let (cost, stats) = match kind {
            UnitKind::Soldier => (
                1,
                UnitStats {
                    health: 10,
                    damage: 1,
                    attack_speed: one,
                    move_speed: one,
                    attack_range: 0,
                    taunt_radius: 0,
                    taunt_seconds: Fixed::ZERO,
                },
            ),
            UnitKind::Knight => (
                3,
                UnitStats {
                    health: 16,
                    damage: 1,
                    attack_speed: one,
                    move_speed: one,
                    attack_range: 0,
                    taunt_radius: 3,
                    taunt_seconds: Fixed::from_num(3),
                },
            ),
            UnitKind::Berserker => (
                3,
                UnitStats {
                    health: 12,
                    damage: 2,
                    attack_speed: one,
                    move_speed: Fixed::from_num(1.5),
                    attack_range: 0,
                    taunt_radius: 0,
                    taunt_seconds: Fixed::ZERO,
                },
            ),
            UnitKind::Archer => (
                2,
                UnitStats {
                    health: 8,
                    damage: 1,
                    attack_speed: one,
                    move_speed: one,
                    attack_range: 3,
                    taunt_radius: 0,
                    taunt_seconds: Fixed::ZERO,
                },
            ),
            UnitKind::Mage => (
                4,
                UnitStats {
                    health: 7,
                    damage: 3,
                    attack_speed: Fixed::from_num(0.5),
                    move_speed: one,
                    attack_range: 2,
                    taunt_radius: 0,
                    taunt_seconds: Fixed::ZERO,
                },
            ),
        };
        Self { kind, cost, stats }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.stats.health == 0 {
            return Err(format!("{}: health must be positive", self.kind));
        }
        if self.stats.health > MAX_BASE_STAT || self.stats.damage > MAX_BASE_STAT {
            return Err(format!(
                "{}: health and damage must not exceed {MAX_BASE_STAT}",
                self.kind
            ));
        }
        if self.stats.attack_speed <= Fixed::ZERO {
            return Err(format!("{}: attack_speed must be positive", self.kind));
        }
        if self.stats.move_speed <= Fixed::ZERO {
            return Err(format!("{}: move_speed must be positive", self.kind));
        }
        if self.kind.is_ranged() && self.stats.attack_range == 0 {
            return Err(format!("{}: ranged kinds need attack_range > 0", self.kind));
        }
        if !self.kind.is_ranged() && self.stats.attack_range != 0 {
            return Err(format!("{}: melee kinds must have attack_range 0", self.kind));
        }
        Ok(())
    }
}

/// The set of unit definitions a battle is played with.
///
/// Entries missing from a data file fall back to [`UnitData::builtin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    /// Overrides, at most one per kind.
    #[serde(default)]
    pub units: Vec<UnitData>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            units: UnitKind::ALL.into_iter().map(UnitData::builtin).collect(),
        }
    }
}

impl Roster {
    /// Parse a roster from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Self::parse(ron, "<inline>")
    }

    /// Load a roster from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| parse_error(&label, e))?;
        Self::parse(&contents, &label)
    }

    fn parse(ron: &str, label: &str) -> Result<Self> {
        let roster: Self = ron::from_str(ron).map_err(|e| parse_error(label, e))?;
        roster.validate().map_err(|e| parse_error(label, e))?;
        Ok(roster)
    }

    /// Check every entry and reject duplicate kinds.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (i, data) in self.units.iter().enumerate() {
            data.validate()?;
            if self.units[..i].iter().any(|d| d.kind == data.kind) {
                return Err(format!("{}: defined more than once", data.kind));
            }
        }
        Ok(())
    }

    /// Definition for a kind.
    #[must_use]
    pub fn get(&self, kind: UnitKind) -> UnitData {
        self.units
            .iter()
            .find(|d| d.kind == kind)
            .copied()
            .unwrap_or_else(|| UnitData::builtin(kind))
    }

    /// Base stats for a kind.
    #[must_use]
    pub fn stats(&self, kind: UnitKind) -> UnitStats {
        self.get(kind).stats
    }

    /// Draft/upgrade cost for a kind.
    #[must_use]
    pub fn cost(&self, kind: UnitKind) -> u32 {
        self.get(kind).cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roster_is_valid() {
        let roster = Roster::default();
        assert!(roster.validate().is_ok());
        assert_eq!(roster.units.len(), UnitKind::ALL.len());
    }

    #[test]
    fn test_soldier_matches_duel_baseline() {
        let stats = Roster::default().stats(UnitKind::Soldier);
        assert_eq!(stats.health, 10);
        assert_eq!(stats.damage, 1);
        assert_eq!(stats.attack_speed, Fixed::ONE);
        assert_eq!(stats.attack_range, 0);
    }

    #[test]
    fn test_knight_taunts_by_default() {
        let stats = Roster::default().stats(UnitKind::Knight);
        assert_eq!(stats.taunt_radius, 3);
        assert_eq!(stats.taunt_seconds, Fixed::from_num(3));
    }

    #[test]
    fn test_partial_roster_falls_back() {
        let roster = Roster::from_ron_str(
            r"Roster(units: [
                UnitData(
                    kind: Archer,
                    cost: 5,
                    stats: UnitStats(
                        health: 20,
                        damage: 2,
                        attack_speed: 0.5,
                        move_speed: 2.0,
                        attack_range: 4,
                    ),
                ),
            ])",
        )
        .unwrap();

        assert_eq!(roster.cost(UnitKind::Archer), 5);
        assert_eq!(roster.stats(UnitKind::Archer).attack_speed, Fixed::from_num(0.5));
        assert_eq!(roster.stats(UnitKind::Archer).taunt_radius, 0);
        assert_eq!(roster.get(UnitKind::Soldier), UnitData::builtin(UnitKind::Soldier));
    }

    #[test]
    fn test_invalid_roster_rejected() {
        let result = Roster::from_ron_str(
            r"Roster(units: [
                UnitData(
                    kind: Soldier,
                    cost: 1,
                    stats: UnitStats(
                        health: 10,
                        damage: 1,
                        attack_speed: 0.0,
                        move_speed: 1.0,
                        attack_range: 0,
                    ),
                ),
            ])",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_stats_rejected() {
        let mut roster = Roster::default();
        roster.units[0].stats.health = MAX_BASE_STAT + 1;
        assert!(roster.validate().is_err());

        let mut roster = Roster::default();
        roster.units[0].stats.health = MAX_BASE_STAT;
        roster.units[0].stats.damage = MAX_BASE_STAT;
        assert!(roster.validate().is_ok());
    }

    #[test]
    fn test_malformed_ron_reports_path() {
        let err = Roster::from_ron_str("Roster(units: [").unwrap_err();
        assert!(err.to_string().contains("<inline>"));
    }
}
