//! Unit kind identity and per-kind static tables.
//!
//! Every unit on the board is one of a small, closed set of kinds. The kind
//! selects the attack style, the upgrade tree and the behaviour hooks in
//! [`crate::behavior`]; base stats and costs come from the data-driven
//! [`Roster`](crate::data::Roster).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::UnitData;
use crate::upgrades::{self, UpgradeSlot};

/// How a unit delivers damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackStyle {
    /// Hits any of the 8 adjacent cells, damage applied immediately.
    Melee,
    /// Hits within Manhattan range via a projectile with flight time.
    Ranged,
}

/// The closed set of unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Cheap melee line unit. No upgrade tree; upgrades only scale stats.
    Soldier,
    /// Melee tank. Taunts nearby enemies when the battle starts.
    Knight,
    /// Melee bruiser. Hits harder when wounded.
    Berserker,
    /// Ranged unit firing arrows.
    Archer,
    /// Fragile ranged caster. Stronger when no ally stands next to it.
    Mage,
}

impl UnitKind {
    /// All kinds, in roster order.
    pub const ALL: [Self; 5] = [
        Self::Soldier,
        Self::Knight,
        Self::Berserker,
        Self::Archer,
        Self::Mage,
    ];

    /// Stable lowercase identifier used in data files.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Soldier => "soldier",
            Self::Knight => "knight",
            Self::Berserker => "berserker",
            Self::Archer => "archer",
            Self::Mage => "mage",
        }
    }

    /// Single-letter board glyph.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Soldier => 's',
            Self::Knight => 'k',
            Self::Berserker => 'b',
            Self::Archer => 'a',
            Self::Mage => 'm',
        }
    }

    /// Melee or ranged.
    #[must_use]
    pub const fn attack_style(self) -> AttackStyle {
        match self {
            Self::Soldier | Self::Knight | Self::Berserker => AttackStyle::Melee,
            Self::Archer | Self::Mage => AttackStyle::Ranged,
        }
    }

    /// Whether this kind fires projectiles.
    #[must_use]
    pub const fn is_ranged(self) -> bool {
        matches!(self.attack_style(), AttackStyle::Ranged)
    }

    /// The selectable upgrade slots for this kind (possibly empty).
    #[must_use]
    pub fn upgrade_tree(self) -> &'static [UpgradeSlot] {
        upgrades::tree_for(self)
    }

    /// Built-in draft cost. Battles read costs from their
    /// [`Roster`](crate::data::Roster), which may override this.
    #[must_use]
    pub fn cost(self) -> u32 {
        UnitData::builtin(self).cost
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error returned when parsing an unknown unit kind identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown unit kind: {0}")]
pub struct UnknownUnitKind(pub String);

impl FromStr for UnitKind {
    type Err = UnknownUnitKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownUnitKind(s.to_string()))
    }
}
