//! The unit entity: identity, stats, AI state and upgrade state.
//!
//! A unit is pure data. Per-kind behaviour lives in [`crate::behavior`] and
//! the per-tick state machine in [`crate::systems`].

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::Projectile;
use crate::data::UnitStats;
use crate::error::UpgradeError;
use crate::grid::{GridPos, Player};
use crate::math::{fixed_serde, has_elapsed, reciprocal, scale_by_level, Fixed};
use crate::unit_kind::UnitKind;
use crate::upgrades::{apply_effect, PassiveKind, UpgradeEffect, MAX_LEVEL};

/// Stable handle to a unit in a battle.
///
/// Targets and taunters are stored as handles and re-resolved every tick,
/// so a handle to a dead unit is harmless.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct UnitId(u32);

impl UnitId {
    /// Create a unit handle from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// AI state. `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitState {
    /// No living enemy to act on.
    #[default]
    Idle,
    /// Walking toward a goal cell.
    Moving,
    /// Target in range; attacking on cooldown.
    Attacking,
    /// Health reached zero.
    Dead,
}

/// Current stats after upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    /// `floor(base health × 1.5^level)`.
    pub max_health: u32,
    /// `floor(base damage × 1.5^level)`, before passives.
    pub damage: u32,
    /// Attacks per second.
    #[serde(with = "fixed_serde")]
    pub attack_speed: Fixed,
    /// Cells per second.
    #[serde(with = "fixed_serde")]
    pub move_speed: Fixed,
    /// 0 for melee, otherwise Manhattan reach.
    pub attack_range: u32,
    /// Battle-start taunt radius.
    pub taunt_radius: u32,
    /// Battle-start taunt duration.
    #[serde(with = "fixed_serde")]
    pub taunt_seconds: Fixed,
}

impl CombatStats {
    /// Level-0 stats from base data.
    #[must_use]
    pub const fn from_base(base: &UnitStats) -> Self {
        Self {
            max_health: base.health,
            damage: base.damage,
            attack_speed: base.attack_speed,
            move_speed: base.move_speed,
            attack_range: base.attack_range,
            taunt_radius: base.taunt_radius,
            taunt_seconds: base.taunt_seconds,
        }
    }
}

/// Forced targeting applied by an enemy taunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TauntBinding {
    /// The enemy that must be attacked.
    pub taunter: UnitId,
    /// Seconds left.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
}

/// An in-progress animated step between two adjacent cells.
///
/// The unit still occupies `from` and holds the reservation on `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTween {
    /// Cell being left.
    pub from: GridPos,
    /// Reserved destination cell.
    pub to: GridPos,
    /// Seconds since the step started.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Total step time, `1 / move_speed`.
    #[serde(with = "fixed_serde")]
    pub duration: Fixed,
}

impl MoveTween {
    /// Linear progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> Fixed {
        if self.duration <= Fixed::ZERO {
            return Fixed::ONE;
        }
        (self.elapsed / self.duration).min(Fixed::ONE)
    }

    /// Whether the step has run its full duration.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        has_elapsed(self.elapsed, self.duration)
    }
}

/// A unit on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub(crate) id: UnitId,
    pub(crate) kind: UnitKind,
    pub(crate) owner: Player,
    /// Authoritative cell; during a tween this is still the source cell.
    pub(crate) pos: GridPos,
    pub(crate) base: UnitStats,
    pub(crate) stats: CombatStats,
    pub(crate) health: u32,
    pub(crate) state: UnitState,
    pub(crate) target: Option<UnitId>,
    pub(crate) path: VecDeque<GridPos>,
    #[serde(with = "fixed_serde")]
    pub(crate) attack_cooldown: Fixed,
    #[serde(with = "fixed_serde")]
    pub(crate) move_cooldown: Fixed,
    pub(crate) tween: Option<MoveTween>,
    pub(crate) level: u8,
    pub(crate) active_slots: Vec<usize>,
    pub(crate) taunt: Option<TauntBinding>,
    /// Permanent bonus damage from kill-triggered passives.
    pub(crate) kill_stacks: u32,
    #[serde(with = "fixed_serde")]
    pub(crate) regen_progress: Fixed,
    pub(crate) projectiles: Vec<Projectile>,
    /// Seconds since death, for the corpse fade.
    #[serde(with = "fixed_serde")]
    pub(crate) death_elapsed: Fixed,
}

impl Unit {
    /// Create a level-0 unit at full health.
    #[must_use]
    pub fn new(id: UnitId, kind: UnitKind, owner: Player, pos: GridPos, base: UnitStats) -> Self {
        let stats = CombatStats::from_base(&base);
        Self {
            id,
            kind,
            owner,
            pos,
            base,
            stats,
            health: stats.max_health,
            state: UnitState::Idle,
            target: None,
            path: VecDeque::new(),
            attack_cooldown: Fixed::ZERO,
            move_cooldown: Fixed::ZERO,
            tween: None,
            level: 0,
            active_slots: Vec::new(),
            taunt: None,
            kill_stacks: 0,
            regen_progress: Fixed::ZERO,
            projectiles: Vec::new(),
            death_elapsed: Fixed::ZERO,
        }
    }

    /// Handle.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Kind.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Owning player.
    #[must_use]
    pub const fn owner(&self) -> Player {
        self.owner
    }

    /// Authoritative cell.
    #[must_use]
    pub const fn pos(&self) -> GridPos {
        self.pos
    }

    /// Level-0 stats.
    #[must_use]
    pub const fn base_stats(&self) -> &UnitStats {
        &self.base
    }

    /// Current stats after upgrades.
    #[must_use]
    pub const fn stats(&self) -> &CombatStats {
        &self.stats
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> u32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> u32 {
        self.stats.max_health
    }

    /// AI state.
    #[must_use]
    pub const fn state(&self) -> UnitState {
        self.state
    }

    /// Current target handle, if any.
    #[must_use]
    pub const fn target(&self) -> Option<UnitId> {
        self.target
    }

    /// Remaining waypoints, next step first.
    #[must_use]
    pub fn path(&self) -> &VecDeque<GridPos> {
        &self.path
    }

    /// Upgrade level, 0 to [`MAX_LEVEL`].
    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Selected upgrade slots in the order they were chosen.
    #[must_use]
    pub fn active_slots(&self) -> &[usize] {
        &self.active_slots
    }

    /// Active taunt, if any.
    #[must_use]
    pub const fn taunt(&self) -> Option<TauntBinding> {
        self.taunt
    }

    /// In-progress animated step, if any.
    #[must_use]
    pub const fn tween(&self) -> Option<MoveTween> {
        self.tween
    }

    /// Projectiles this unit has in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Seconds remaining before the next attack is allowed.
    #[must_use]
    pub const fn attack_cooldown(&self) -> Fixed {
        self.attack_cooldown
    }

    /// Bonus damage accumulated from kills.
    #[must_use]
    pub const fn kill_stacks(&self) -> u32 {
        self.kill_stacks
    }

    /// Whether health has reached zero.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        matches!(self.state, UnitState::Dead)
    }

    /// Whether the unit is still fighting.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    /// Whether the unit is between two cells.
    #[must_use]
    pub const fn is_mid_move(&self) -> bool {
        self.tween.is_some()
    }

    /// Seconds between attacks.
    #[must_use]
    pub fn attack_interval(&self) -> Fixed {
        reciprocal(self.stats.attack_speed)
    }

    /// Seconds per cell.
    #[must_use]
    pub fn step_duration(&self) -> Fixed {
        reciprocal(self.stats.move_speed)
    }

    /// Whether health is at or below half of max.
    #[must_use]
    pub const fn is_wounded(&self) -> bool {
        self.health as u64 * 2 <= self.stats.max_health as u64
    }

    /// Whether an upgrade slot unlocking `passive` has been selected.
    #[must_use]
    pub fn has_passive(&self, passive: PassiveKind) -> bool {
        let tree = self.kind.upgrade_tree();
        self.active_slots.iter().any(|&slot| {
            tree.get(slot)
                .is_some_and(|s| s.effect == UpgradeEffect::Passive(passive))
        })
    }

    /// Apply one upgrade.
    ///
    /// Kinds with an upgrade tree must name an unused slot; kinds without one
    /// must pass `None`. On success the level increases, the slot's one-time
    /// effect runs, and max health and damage are recomputed from the base
    /// stats as `floor(base × 1.5^level)` with health restored to full.
    /// On failure nothing changes.
    pub fn upgrade(&mut self, slot: Option<usize>) -> Result<(), UpgradeError> {
        if self.is_dead() {
            return Err(UpgradeError::Dead);
        }
        if self.level >= MAX_LEVEL {
            return Err(UpgradeError::MaxLevel(self.level));
        }

        let tree = self.kind.upgrade_tree();
        let effect = match (tree.is_empty(), slot) {
            (true, None) => None,
            (true, Some(index)) => return Err(UpgradeError::UnknownSlot(index)),
            (false, None) => return Err(UpgradeError::SlotRequired),
            (false, Some(index)) => {
                let Some(def) = tree.get(index) else {
                    return Err(UpgradeError::UnknownSlot(index));
                };
                if self.active_slots.contains(&index) {
                    return Err(UpgradeError::SlotAlreadyActive(index));
                }
                Some((index, def.effect))
            }
        };

        self.level += 1;
        if let Some((index, effect)) = effect {
            self.active_slots.push(index);
            apply_effect(&mut self.stats, effect);
        }
        self.rescale();
        Ok(())
    }

    /// Recompute level-scaled stats from the base values and heal to full.
    fn rescale(&mut self) {
        self.stats.max_health = scale_by_level(self.base.health, self.level);
        self.stats.damage = scale_by_level(self.base.damage, self.level);
        self.health = self.stats.max_health;
    }

    /// Subtract damage, saturating at zero. Returns `true` if this hit
    /// brought a living unit to zero; the caller finishes the death.
    pub(crate) fn apply_damage(&mut self, amount: u32) -> bool {
        if self.is_dead() {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        self.health == 0
    }

    /// Restore health up to max. Dead units stay dead.
    pub(crate) fn heal(&mut self, amount: u32) {
        if self.is_alive() {
            self.health = (self.health + amount).min(self.stats.max_health);
        }
    }

    /// Drop the current path so it is recomputed next tick.
    pub(crate) fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Enter the terminal state. The caller releases the unit's cells.
    pub(crate) fn mark_dead(&mut self) {
        self.state = UnitState::Dead;
        self.health = 0;
        self.target = None;
        self.path.clear();
        self.tween = None;
        self.taunt = None;
        self.projectiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnitData;

    fn unit(kind: UnitKind) -> Unit {
        Unit::new(
            UnitId::new(1),
            kind,
            Player::One,
            GridPos::new(0, 0),
            UnitData::builtin(kind).stats,
        )
    }

    #[test]
    fn test_new_unit_is_full_health() {
        let u = unit(UnitKind::Soldier);
        assert_eq!(u.health(), 10);
        assert_eq!(u.max_health(), 10);
        assert_eq!(u.level(), 0);
        assert_eq!(u.state(), UnitState::Idle);
        assert!(u.is_alive());
    }

    #[test]
    fn test_untreed_upgrade_scales_from_base() {
        let mut u = unit(UnitKind::Soldier);
        u.apply_damage(4);

        u.upgrade(None).unwrap();
        assert_eq!(u.level(), 1);
        assert_eq!(u.max_health(), 15);
        assert_eq!(u.health(), 15); // full heal
        assert_eq!(u.stats().damage, 1); // floor(1.5)

        u.upgrade(None).unwrap();
        u.upgrade(None).unwrap();
        assert_eq!(u.max_health(), 33); // floor(10 * 3.375), not compounded floors
        assert_eq!(u.stats().damage, 3);
    }

    #[test]
    fn test_untreed_unit_rejects_slot() {
        let mut u = unit(UnitKind::Soldier);
        assert_eq!(u.upgrade(Some(0)), Err(UpgradeError::UnknownSlot(0)));
        assert_eq!(u.level(), 0);
    }

    #[test]
    fn test_treed_unit_requires_slot() {
        let mut u = unit(UnitKind::Archer);
        assert_eq!(u.upgrade(None), Err(UpgradeError::SlotRequired));
        assert_eq!(u.upgrade(Some(3)), Err(UpgradeError::UnknownSlot(3)));
        assert_eq!(u.level(), 0);
    }

    #[test]
    fn test_slot_cannot_be_taken_twice() {
        let mut u = unit(UnitKind::Archer);
        u.upgrade(Some(0)).unwrap();
        assert_eq!(u.stats().attack_range, 4);

        let before = u.clone();
        assert_eq!(u.upgrade(Some(0)), Err(UpgradeError::SlotAlreadyActive(0)));
        assert_eq!(u, before);
    }

    #[test]
    fn test_fourth_upgrade_fails_without_changes() {
        let mut u = unit(UnitKind::Knight);
        u.upgrade(Some(0)).unwrap();
        u.upgrade(Some(1)).unwrap();
        u.upgrade(Some(2)).unwrap();
        assert_eq!(u.level(), MAX_LEVEL);

        let before = u.clone();
        assert_eq!(u.upgrade(None), Err(UpgradeError::MaxLevel(3)));
        assert_eq!(u, before);
    }

    #[test]
    fn test_has_passive() {
        let mut u = unit(UnitKind::Knight);
        assert!(!u.has_passive(PassiveKind::Rally));
        u.upgrade(Some(2)).unwrap();
        assert!(u.has_passive(PassiveKind::Rally));
        assert!(!u.has_passive(PassiveKind::IronWill));
    }

    #[test]
    fn test_damage_and_death_flag() {
        let mut u = unit(UnitKind::Soldier);
        assert!(!u.apply_damage(3));
        assert_eq!(u.health(), 7);
        assert!(u.apply_damage(50));
        assert_eq!(u.health(), 0);

        u.mark_dead();
        assert!(u.is_dead());
        assert!(!u.apply_damage(1));
        u.heal(5);
        assert_eq!(u.health(), 0);
        assert_eq!(u.upgrade(None), Err(UpgradeError::Dead));
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut u = unit(UnitKind::Soldier);
        u.apply_damage(2);
        u.heal(10);
        assert_eq!(u.health(), 10);
    }

    #[test]
    fn test_wounded_threshold() {
        let mut u = unit(UnitKind::Soldier);
        assert!(!u.is_wounded());
        u.apply_damage(5);
        assert!(u.is_wounded());
    }

    #[test]
    fn test_tween_progress() {
        let tween = MoveTween {
            from: GridPos::new(0, 0),
            to: GridPos::new(0, 1),
            elapsed: Fixed::from_num(0.25),
            duration: Fixed::ONE,
        };
        assert_eq!(tween.progress(), Fixed::from_num(0.25));
        assert!(!tween.is_complete());
    }
}
