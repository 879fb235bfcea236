//! Per-kind behaviour hooks.
//!
//! The engine calls these at fixed points: [`damage`] whenever an attack is
//! made, [`on_kill`] once per confirmed kill, [`on_battle_start`] once per
//! unit when setup ends, and [`on_tick`] during every update of a living
//! unit. Each hook dispatches on [`UnitKind`] and on the passive flags the
//! unit's upgrades have unlocked.
//!
//! Hooks receive the unit being processed separately from `others`; the
//! engine takes the acting unit out of storage for its update, so scans
//! over `others` never see the unit itself.

use crate::combat::is_in_attack_range;
use crate::grid::{Grid, GridPos};
use crate::math::{has_elapsed, Fixed};
use crate::simulation::UnitStorage;
use crate::systems::TauntEvent;
use crate::unit::{TauntBinding, Unit};
use crate::unit_kind::UnitKind;
use crate::upgrades::PassiveKind;

/// Health restored per kill by Bloodlust.
const BLOODLUST_HEAL: u32 = 3;

/// Radius within which any ally cancels the Lone Wolf bonus.
const LONE_WOLF_RADIUS: u32 = 2;

/// Bonus damage while Lone Wolf is satisfied.
const LONE_WOLF_BONUS: u32 = 2;

/// Whether any living ally of `unit` stands within Chebyshev `radius`.
fn has_ally_within(unit: &Unit, others: &UnitStorage, radius: u32) -> bool {
    others.values().any(|other| {
        other.is_alive() && other.owner() == unit.owner() && other.pos().chebyshev(unit.pos()) <= radius
    })
}

/// Damage the unit would deal right now.
///
/// Flat bonuses are summed first (kill stacks, isolation, adjacent Rally
/// knights); the Berserker's rage multiplier applies last. Reads state only.
#[must_use]
pub fn damage(unit: &Unit, others: &UnitStorage) -> u32 {
    let mut total = unit.stats().damage + unit.kill_stacks();

    match unit.kind() {
        UnitKind::Mage => {
            if !has_ally_within(unit, others, 1) {
                total += if unit.has_passive(PassiveKind::Solitude) { 2 } else { 1 };
            }
        }
        UnitKind::Berserker => {
            if unit.has_passive(PassiveKind::LoneWolf)
                && !has_ally_within(unit, others, LONE_WOLF_RADIUS)
            {
                total += LONE_WOLF_BONUS;
            }
        }
        UnitKind::Soldier | UnitKind::Knight | UnitKind::Archer => {}
    }

    let rallying = others
        .values()
        .filter(|other| {
            other.is_alive()
                && other.owner() == unit.owner()
                && other.kind() == UnitKind::Knight
                && other.has_passive(PassiveKind::Rally)
                && other.pos().chebyshev(unit.pos()) == 1
        })
        .count();
    total += u32::try_from(rallying).unwrap_or(u32::MAX);

    if unit.kind() == UnitKind::Berserker && unit.is_wounded() {
        total = total * 3 / 2;
    }
    total
}

/// React to a kill credited to `unit`.
pub fn on_kill(unit: &mut Unit) {
    if unit.has_passive(PassiveKind::Bloodlust) {
        unit.heal(BLOODLUST_HEAL);
    }
    if unit.has_passive(PassiveKind::Headhunter) {
        unit.kill_stacks += 1;
    }
}

/// Battle-start effects. Units with a taunt radius force every enemy within
/// Euclidean reach to target them for the taunt duration. When two taunters
/// reach the same enemy, whichever runs later wins.
pub fn on_battle_start(unit: &Unit, grid: &Grid, others: &mut UnitStorage) -> Vec<TauntEvent> {
    let radius = u64::from(unit.stats().taunt_radius);
    let seconds = unit.stats().taunt_seconds;
    if radius == 0 || seconds <= Fixed::ZERO || unit.is_dead() {
        return Vec::new();
    }

    let mut taunts = Vec::new();
    for id in grid.all_units() {
        let Some(enemy) = others.get_mut(id) else {
            continue;
        };
        if enemy.is_dead()
            || enemy.owner() == unit.owner()
            || enemy.pos().distance_squared(unit.pos()) > radius * radius
        {
            continue;
        }
        enemy.taunt = Some(TauntBinding {
            taunter: unit.id(),
            remaining: seconds,
        });
        if enemy.target != Some(unit.id()) {
            enemy.target = Some(unit.id());
            enemy.clear_path();
        }
        taunts.push(TauntEvent {
            taunter: unit.id(),
            target: id,
            seconds,
        });
    }
    taunts
}

/// Continuous passives, run during every update of a living unit.
pub fn on_tick(unit: &mut Unit, dt: Fixed) {
    if unit.has_passive(PassiveKind::IronWill) && below_half(unit) {
        unit.regen_progress += dt;
        while has_elapsed(unit.regen_progress, Fixed::ONE) && below_half(unit) {
            unit.regen_progress = (unit.regen_progress - Fixed::ONE).max(Fixed::ZERO);
            unit.heal(1);
        }
    } else {
        unit.regen_progress = Fixed::ZERO;
    }
}

fn below_half(unit: &Unit) -> bool {
    u64::from(unit.health()) * 2 < u64::from(unit.max_health())
}

/// Pick the cell the unit should walk to in order to attack a target
/// standing at `target`.
///
/// Melee units pick the free neighbour of the target closest to themselves.
/// Ranged units first try the straight line from the target back toward
/// themselves, standing as far out as their range allows, then fall back to
/// the closest free cell anywhere within range. A unit's own cell always
/// counts as free. Returns `None` if every candidate is taken.
#[must_use]
pub fn find_goal(unit: &Unit, target: GridPos, grid: &Grid) -> Option<GridPos> {
    let here = unit.pos();
    let usable = |pos: GridPos| pos == here || grid.is_cell_available(pos);
    let range = unit.stats().attack_range;

    if range == 0 {
        return closest(here, grid.neighbors8(target).into_iter().filter(|&p| usable(p)));
    }

    let mut line = Vec::with_capacity(range as usize);
    let mut cursor = target;
    for _ in 0..range {
        let next = cursor.step_toward(here);
        if next == cursor {
            break;
        }
        line.push(next);
        cursor = next;
    }
    if let Some(&goal) = line.iter().rev().find(|&&p| usable(p)) {
        return Some(goal);
    }

    closest(
        here,
        grid.cells()
            .map(|cell| cell.pos())
            .filter(|&p| is_in_attack_range(p, range, target) && usable(p)),
    )
}

/// Candidate with the smallest squared distance to `from`; the first
/// candidate wins ties.
fn closest(from: GridPos, candidates: impl Iterator<Item = GridPos>) -> Option<GridPos> {
    let mut best: Option<(u64, GridPos)> = None;
    for pos in candidates {
        let d = pos.distance_squared(from);
        if best.map_or(true, |(bd, _)| d < bd) {
            best = Some((d, pos));
        }
    }
    best.map(|(_, pos)| pos)
}
