//! Upgrade trees as static effect descriptors.
//!
//! Each unit kind defines up to three selectable slots. A slot's effect is
//! data, interpreted by [`apply_effect`]: one-time stat changes are applied
//! once when the slot is chosen, while [`PassiveKind`] effects only flip a
//! flag that the behaviour hooks consult every tick or on the matching event.
//!
//! Independent of the slot chosen, every upgrade rescales max health and
//! damage to `floor(base × 1.5^level)`; see [`Unit::upgrade`].
//!
//! [`Unit::upgrade`]: crate::unit::Unit::upgrade

use serde::Serialize;

use crate::math::add_percent;
use crate::unit::CombatStats;
use crate::unit_kind::UnitKind;

/// Highest reachable upgrade level.
pub const MAX_LEVEL: u8 = 3;

/// Conditional combat modifiers unlocked by an upgrade slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PassiveKind {
    /// Knight: regenerates health while below half health.
    IronWill,
    /// Knight: adjacent allies deal +1 damage.
    Rally,
    /// Berserker: heals on every kill.
    Bloodlust,
    /// Berserker: +2 damage while no ally is within 2 cells.
    LoneWolf,
    /// Archer: every kill permanently adds +1 damage.
    Headhunter,
    /// Mage: the isolation bonus is doubled.
    Solitude,
}

/// What choosing an upgrade slot does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UpgradeEffect {
    /// Attacks per second increased by this percentage.
    AttackSpeedPercent(u32),
    /// Cells per second increased by this percentage.
    MoveSpeedPercent(u32),
    /// Attack range extended by this many cells.
    AttackRange(u32),
    /// Battle-start taunt radius extended by this many cells.
    TauntRadius(u32),
    /// Unlocks a conditional passive; no immediate stat change.
    Passive(PassiveKind),
}

/// One selectable ability in a unit kind's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpgradeSlot {
    /// Display name.
    pub name: &'static str,
    /// Tooltip text.
    pub description: &'static str,
    /// Effect applied when the slot is selected.
    pub effect: UpgradeEffect,
}

const KNIGHT_TREE: [UpgradeSlot; 3] = [
    UpgradeSlot {
        name: "Challenge",
        description: "Battle-start taunt reaches 2 cells further.",
        effect: UpgradeEffect::TauntRadius(2),
    },
    UpgradeSlot {
        name: "Iron Will",
        description: "Regenerate 1 health per second while below half health.",
        effect: UpgradeEffect::Passive(PassiveKind::IronWill),
    },
    UpgradeSlot {
        name: "Rally",
        description: "Adjacent allies deal +1 damage.",
        effect: UpgradeEffect::Passive(PassiveKind::Rally),
    },
];

const BERSERKER_TREE: [UpgradeSlot; 3] = [
    UpgradeSlot {
        name: "Frenzy",
        description: "Attack 50% faster.",
        effect: UpgradeEffect::AttackSpeedPercent(50),
    },
    UpgradeSlot {
        name: "Bloodlust",
        description: "Heal 3 health on every kill.",
        effect: UpgradeEffect::Passive(PassiveKind::Bloodlust),
    },
    UpgradeSlot {
        name: "Lone Wolf",
        description: "+2 damage while no ally is within 2 cells.",
        effect: UpgradeEffect::Passive(PassiveKind::LoneWolf),
    },
];

const ARCHER_TREE: [UpgradeSlot; 3] = [
    UpgradeSlot {
        name: "Longbow",
        description: "Attack range +1.",
        effect: UpgradeEffect::AttackRange(1),
    },
    UpgradeSlot {
        name: "Quickdraw",
        description: "Attack 50% faster.",
        effect: UpgradeEffect::AttackSpeedPercent(50),
    },
    UpgradeSlot {
        name: "Headhunter",
        description: "Each kill permanently adds +1 damage.",
        effect: UpgradeEffect::Passive(PassiveKind::Headhunter),
    },
];

const MAGE_TREE: [UpgradeSlot; 3] = [
    UpgradeSlot {
        name: "Reach",
        description: "Attack range +1.",
        effect: UpgradeEffect::AttackRange(1),
    },
    UpgradeSlot {
        name: "Haste",
        description: "Move 50% faster.",
        effect: UpgradeEffect::MoveSpeedPercent(50),
    },
    UpgradeSlot {
        name: "Solitude",
        description: "The bonus for standing alone is doubled.",
        effect: UpgradeEffect::Passive(PassiveKind::Solitude),
    },
];

/// Upgrade tree for a unit kind.
#[must_use]
pub fn tree_for(kind: UnitKind) -> &'static [UpgradeSlot] {
    match kind {
        UnitKind::Soldier => &[],
        UnitKind::Knight => &KNIGHT_TREE,
        UnitKind::Berserker => &BERSERKER_TREE,
        UnitKind::Archer => &ARCHER_TREE,
        UnitKind::Mage => &MAGE_TREE,
    }
}

/// Apply the one-time part of an upgrade effect.
///
/// Passive effects change nothing here; the caller records the slot and the
/// behaviour hooks look it up.
pub fn apply_effect(stats: &mut CombatStats, effect: UpgradeEffect) {
    match effect {
        UpgradeEffect::AttackSpeedPercent(percent) => {
            stats.attack_speed = add_percent(stats.attack_speed, percent);
        }
        UpgradeEffect::MoveSpeedPercent(percent) => {
            stats.move_speed = add_percent(stats.move_speed, percent);
        }
        UpgradeEffect::AttackRange(cells) => {
            stats.attack_range += cells;
        }
        UpgradeEffect::TauntRadius(cells) => {
            stats.taunt_radius += cells;
        }
        UpgradeEffect::Passive(_) => {}
    }
}
