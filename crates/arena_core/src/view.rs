//! Read-only snapshots for the presentation layer.
//!
//! Views are plain copies; holding one never borrows the battle.

use serde::Serialize;

use crate::combat::Projectile;
use crate::data::BattleConfig;
use crate::grid::{GridPos, Player};
use crate::math::{ease_in_out, fixed_serde, Fixed, Vec2Fixed};
use crate::unit::{Unit, UnitId, UnitState};
use crate::unit_kind::UnitKind;

/// What a renderer needs to draw one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitView {
    /// Handle.
    pub id: UnitId,
    /// Sprite selector.
    pub kind: UnitKind,
    /// Team colour selector.
    pub owner: Player,
    /// Authoritative cell.
    pub cell: GridPos,
    /// Draw position in cell units, eased between cells mid-step.
    pub position: Vec2Fixed,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// AI state.
    pub state: UnitState,
    /// Corpse flag.
    pub is_dead: bool,
    /// Number of upgrades taken.
    pub level: u8,
    /// Enemy currently taunting this unit.
    pub taunted_by: Option<UnitId>,
    /// 1 while alive, falling to 0 as the corpse fades.
    #[serde(with = "fixed_serde")]
    pub opacity: Fixed,
}

impl UnitView {
    /// Snapshot a unit.
    #[must_use]
    pub fn new(unit: &Unit, config: &BattleConfig) -> Self {
        Self {
            id: unit.id(),
            kind: unit.kind(),
            owner: unit.owner(),
            cell: unit.pos(),
            position: render_position(unit),
            health: unit.health(),
            max_health: unit.max_health(),
            state: unit.state(),
            is_dead: unit.is_dead(),
            level: unit.level(),
            taunted_by: unit
                .taunt()
                .filter(|t| t.remaining > Fixed::ZERO)
                .map(|t| t.taunter),
            opacity: opacity(unit, config.corpse_fade_seconds),
        }
    }
}

fn render_position(unit: &Unit) -> Vec2Fixed {
    match unit.tween() {
        Some(tween) => {
            Vec2Fixed::from(tween.from).lerp(Vec2Fixed::from(tween.to), ease_in_out(tween.progress()))
        }
        None => Vec2Fixed::from(unit.pos()),
    }
}

fn opacity(unit: &Unit, fade_seconds: Fixed) -> Fixed {
    if unit.is_alive() {
        return Fixed::ONE;
    }
    if fade_seconds <= Fixed::ZERO {
        return Fixed::ZERO;
    }
    Fixed::ONE - (unit.death_elapsed / fade_seconds).min(Fixed::ONE)
}

/// What a renderer needs to draw one projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectileView {
    /// Unit that fired.
    pub shooter: UnitId,
    /// Intended victim.
    pub target: UnitId,
    /// Draw position in cell units.
    pub position: Vec2Fixed,
    /// Flight progress in `[0, 1]`.
    #[serde(with = "fixed_serde")]
    pub progress: Fixed,
}

impl ProjectileView {
    /// Snapshot a projectile.
    #[must_use]
    pub fn new(projectile: &Projectile) -> Self {
        Self {
            shooter: projectile.shooter,
            target: projectile.target,
            position: projectile.position(),
            progress: projectile.progress(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnitData;
    use crate::unit::MoveTween;

    fn soldier() -> Unit {
        Unit::new(
            UnitId::new(1),
            UnitKind::Soldier,
            Player::One,
            GridPos::new(2, 5),
            UnitData::builtin(UnitKind::Soldier).stats,
        )
    }

    #[test]
    fn test_idle_unit_draws_on_its_cell() {
        let view = UnitView::new(&soldier(), &BattleConfig::default());
        assert_eq!(view.position, Vec2Fixed::from(GridPos::new(2, 5)));
        assert_eq!(view.opacity, Fixed::ONE);
        assert_eq!(view.taunted_by, None);
    }

    #[test]
    fn test_tween_midpoint_is_eased() {
        let mut unit = soldier();
        unit.tween = Some(MoveTween {
            from: GridPos::new(2, 5),
            to: GridPos::new(2, 4),
            elapsed: Fixed::from_num(0.5),
            duration: Fixed::ONE,
        });
        let view = UnitView::new(&unit, &BattleConfig::default());
        assert_eq!(view.cell, GridPos::new(2, 5));
        assert_eq!(view.position.x, Fixed::from_num(2));
        assert_eq!(view.position.y, Fixed::from_num(4.5));
    }

    #[test]
    fn test_corpse_fades_out() {
        let mut unit = soldier();
        unit.mark_dead();
        unit.death_elapsed = Fixed::from_num(0.25);
        let config = BattleConfig::default();
        let view = UnitView::new(&unit, &config);
        assert!(view.is_dead);
        assert_eq!(view.opacity, Fixed::from_num(0.75));

        unit.death_elapsed = Fixed::from_num(5);
        assert_eq!(UnitView::new(&unit, &config).opacity, Fixed::ZERO);
    }
}
