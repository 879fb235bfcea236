//! Per-tick unit update: bookkeeping, targeting, attacking and movement.
//!
//! [`update_unit`] runs once per living unit per tick, in the grid's
//! row-major scan order. A unit later in the scan sees the effects of
//! everything earlier in the same tick.

use serde::Serialize;
use tracing::{debug, info};

use crate::behavior;
use crate::combat::{is_in_attack_range, Projectile};
use crate::data::{BattleConfig, MovementModel};
use crate::grid::{Grid, GridPos};
use crate::math::{countdown, Fixed};
use crate::pathfinding::find_path;
use crate::simulation::{TickEvents, UnitStorage};
use crate::unit::{MoveTween, Unit, UnitId, UnitState};

// ============================================================================
// Events
// ============================================================================

/// A melee hit, applied immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttackEvent {
    /// Unit that swung.
    pub attacker: UnitId,
    /// Unit that was hit.
    pub target: UnitId,
    /// Damage dealt.
    pub damage: u32,
}

/// A projectile left its shooter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectileLaunchEvent {
    /// Unit that fired.
    pub shooter: UnitId,
    /// Intended victim.
    pub target: UnitId,
    /// Damage that will land.
    pub damage: u32,
}

/// A projectile reached the end of its flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectileImpactEvent {
    /// Unit that fired.
    pub shooter: UnitId,
    /// Intended victim.
    pub target: UnitId,
    /// Damage applied, 0 if the target was already dead.
    pub damage: u32,
}

/// A unit died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KillEvent {
    /// Unit credited with the kill.
    pub killer: UnitId,
    /// Unit that died.
    pub victim: UnitId,
    /// Cell the victim died on.
    pub cell: GridPos,
}

/// A unit finished a step into a neighbouring cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveEvent {
    /// Unit that moved.
    pub unit: UnitId,
    /// Cell left.
    pub from: GridPos,
    /// Cell entered.
    pub to: GridPos,
}

/// A unit was forced to target a taunter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TauntEvent {
    /// Unit doing the taunting.
    pub taunter: UnitId,
    /// Unit being taunted.
    pub target: UnitId,
    /// Duration of the binding.
    #[serde(serialize_with = "serialize_seconds")]
    pub seconds: Fixed,
}

fn serialize_seconds<S: serde::Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.to_num::<f64>())
}

// ============================================================================
// Update
// ============================================================================

/// Everything a unit may touch while it updates.
pub struct UpdateContext<'a> {
    /// The board.
    pub grid: &'a mut Grid,
    /// Every unit except the one updating.
    pub others: &'a mut UnitStorage,
    /// Battle settings.
    pub config: &'a BattleConfig,
    /// Output for this tick.
    pub events: &'a mut TickEvents,
    /// Seconds elapsed this tick.
    pub dt: Fixed,
}

/// Advance one living unit by one tick.
///
/// Order: cooldowns, tween, projectiles and passives first; then taunt
/// resolution, retargeting, and finally attack or move. Dead units are the
/// caller's business and must not be passed here.
pub fn update_unit(unit: &mut Unit, ctx: &mut UpdateContext<'_>) {
    debug_assert!(unit.is_alive(), "dead units do not run AI");

    tick_timers(unit, ctx.dt);
    advance_tween(unit, ctx);
    advance_projectiles(unit, ctx);
    behavior::on_tick(unit, ctx.dt);

    let taunted = resolve_taunt(unit, &*ctx.others);
    if !taunted {
        retarget(unit, ctx);
    }
    act(unit, taunted, ctx);

    if let Some(taunt) = unit.taunt.as_mut() {
        taunt.remaining = countdown(taunt.remaining, ctx.dt);
    }
}

fn tick_timers(unit: &mut Unit, dt: Fixed) {
    unit.attack_cooldown = countdown(unit.attack_cooldown, dt);
    unit.move_cooldown = countdown(unit.move_cooldown, dt);
}

fn advance_tween(unit: &mut Unit, ctx: &mut UpdateContext<'_>) {
    let Some(mut tween) = unit.tween.take() else {
        return;
    };
    tween.elapsed += ctx.dt;
    if !tween.is_complete() {
        unit.tween = Some(tween);
        return;
    }

    if ctx.grid.complete_move(tween.from, tween.to, unit.id) {
        unit.pos = tween.to;
        if unit.path.front() == Some(&tween.to) {
            unit.path.pop_front();
        }
        ctx.events.moves.push(MoveEvent {
            unit: unit.id,
            from: tween.from,
            to: tween.to,
        });
    } else {
        ctx.grid.free_reservation(tween.to, unit.id);
        unit.clear_path();
        debug!(unit = %unit.id, to = %tween.to, "Step could not complete");
    }
}

fn advance_projectiles(unit: &mut Unit, ctx: &mut UpdateContext<'_>) {
    if unit.projectiles.is_empty() {
        return;
    }
    let mut landed = Vec::new();
    unit.projectiles.retain_mut(|projectile| {
        if projectile.advance(ctx.dt) {
            landed.push(*projectile);
            false
        } else {
            true
        }
    });

    for projectile in landed {
        let hit = ctx
            .others
            .get(projectile.target)
            .is_some_and(Unit::is_alive);
        let damage = if hit { projectile.damage } else { 0 };
        ctx.events.projectile_impacts.push(ProjectileImpactEvent {
            shooter: unit.id,
            target: projectile.target,
            damage,
        });
        if hit {
            strike(unit, projectile.target, damage, ctx);
        }
    }
}

/// Apply the taunt binding. Returns whether the unit is currently taunted.
fn resolve_taunt(unit: &mut Unit, others: &UnitStorage) -> bool {
    let Some(binding) = unit.taunt else {
        return false;
    };
    let taunter_alive = others.get(binding.taunter).is_some_and(Unit::is_alive);
    if !taunter_alive || binding.remaining <= Fixed::ZERO {
        unit.taunt = None;
        if unit.target == Some(binding.taunter) {
            unit.target = None;
        }
        return false;
    }
    if unit.target != Some(binding.taunter) {
        unit.target = Some(binding.taunter);
        unit.clear_path();
    }
    true
}

fn retarget(unit: &mut Unit, ctx: &UpdateContext<'_>) {
    let current_alive = unit
        .target
        .and_then(|id| ctx.others.get(id))
        .is_some_and(Unit::is_alive);
    if current_alive {
        return;
    }

    let next = nearest_enemy(unit, &*ctx.grid, &*ctx.others, |_| true);
    if next != unit.target {
        debug!(unit = %unit.id, target = ?next, "Retarget");
    }
    unit.target = next;
    unit.clear_path();
}

/// Closest living enemy by squared Euclidean distance among those accepted
/// by `filter`. Ties go to the earliest in row-major scan order.
fn nearest_enemy(
    unit: &Unit,
    grid: &Grid,
    others: &UnitStorage,
    filter: impl Fn(&Unit) -> bool,
) -> Option<UnitId> {
    let mut best: Option<(u64, UnitId)> = None;
    for cell in grid.cells() {
        let Some(id) = cell.unit() else {
            continue;
        };
        let Some(other) = others.get(id) else {
            continue;
        };
        if other.is_dead() || other.owner() == unit.owner() || !filter(other) {
            continue;
        }
        let d = other.pos().distance_squared(unit.pos());
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, id));
        }
    }
    best.map(|(_, id)| id)
}

fn act(unit: &mut Unit, taunted: bool, ctx: &mut UpdateContext<'_>) {
    let Some(target_pos) = unit
        .target
        .and_then(|id| ctx.others.get(id))
        .filter(|t| t.is_alive())
        .map(Unit::pos)
    else {
        unit.state = UnitState::Idle;
        unit.clear_path();
        return;
    };

    let range = unit.stats.attack_range;
    if !unit.is_mid_move() && is_in_attack_range(unit.pos, range, target_pos) {
        unit.state = UnitState::Attacking;
        unit.clear_path();
        try_attack(unit, ctx);
        return;
    }

    unit.state = UnitState::Moving;
    if unit.is_mid_move() {
        return;
    }

    if !taunted {
        let here = unit.pos;
        let in_range = nearest_enemy(unit, &*ctx.grid, &*ctx.others, |other| {
            is_in_attack_range(here, range, other.pos())
        });
        if let Some(id) = in_range {
            debug!(unit = %unit.id, target = %id, "Engaging enemy in range");
            unit.target = Some(id);
            unit.state = UnitState::Attacking;
            unit.clear_path();
            try_attack(unit, ctx);
            return;
        }
    }

    if unit.path.is_empty() {
        let grid = &*ctx.grid;
        let path = behavior::find_goal(unit, target_pos, grid)
            .and_then(|goal| find_path(grid, unit.pos, goal));
        match path {
            Some(path) if !path.is_empty() => unit.path = path.into(),
            _ => {
                debug!(unit = %unit.id, "No path to target");
                return;
            }
        }
    }

    match ctx.config.movement_model {
        MovementModel::Tween => start_step(unit, ctx.grid),
        MovementModel::Discrete => discrete_step(unit, ctx),
    }
}

fn try_attack(unit: &mut Unit, ctx: &mut UpdateContext<'_>) {
    if unit.attack_cooldown > Fixed::ZERO {
        return;
    }
    let Some(target) = unit.target else {
        return;
    };
    let Some(target_pos) = ctx.others.get(target).map(Unit::pos) else {
        return;
    };

    let damage = behavior::damage(unit, &*ctx.others);
    if unit.kind.is_ranged() {
        unit.projectiles.push(Projectile::new(
            unit.id,
            target,
            unit.pos,
            target_pos,
            damage,
            ctx.config.projectile_flight_seconds,
        ));
        ctx.events.projectile_launches.push(ProjectileLaunchEvent {
            shooter: unit.id,
            target,
            damage,
        });
    } else {
        ctx.events.attacks.push(AttackEvent {
            attacker: unit.id,
            target,
            damage,
        });
        strike(unit, target, damage, ctx);
    }
    unit.attack_cooldown = unit.attack_interval();
}

/// Apply damage from `attacker` to `target` and finish the kill if it dies.
fn strike(attacker: &mut Unit, target: UnitId, damage: u32, ctx: &mut UpdateContext<'_>) {
    let Some(victim) = ctx.others.get_mut(target) else {
        return;
    };
    if !victim.apply_damage(damage) {
        return;
    }

    let cell = victim.pos;
    victim.mark_dead();
    ctx.grid.release_unit(cell, target);
    info!(killer = %attacker.id, victim = %target, cell = %cell, "Unit killed");
    ctx.events.kills.push(KillEvent {
        killer: attacker.id,
        victim: target,
        cell,
    });
    behavior::on_kill(attacker);
}

/// Begin an animated step toward the next waypoint by claiming it.
fn start_step(unit: &mut Unit, grid: &mut Grid) {
    let Some(&next) = unit.path.front() else {
        return;
    };
    if next.manhattan(unit.pos) != 1 || !grid.reserve_cell(next, unit.id) {
        debug!(unit = %unit.id, cell = %next, "Reservation conflict, dropping path");
        unit.clear_path();
        return;
    }
    unit.tween = Some(MoveTween {
        from: unit.pos,
        to: next,
        elapsed: Fixed::ZERO,
        duration: unit.step_duration(),
    });
}

/// Jump one cell if the step cooldown has run out.
fn discrete_step(unit: &mut Unit, ctx: &mut UpdateContext<'_>) {
    if unit.move_cooldown > Fixed::ZERO {
        return;
    }
    let Some(&next) = unit.path.front() else {
        return;
    };
    let from = unit.pos;
    if next.manhattan(from) != 1 || !ctx.grid.move_unit(from, next, unit.id) {
        debug!(unit = %unit.id, cell = %next, "Destination taken, dropping path");
        unit.clear_path();
        return;
    }
    unit.pos = next;
    unit.path.pop_front();
    unit.move_cooldown = unit.step_duration();
    ctx.events.moves.push(MoveEvent {
        unit: unit.id,
        from,
        to: next,
    });
}
