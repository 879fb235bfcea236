//! Attack range rules and projectiles.
//!
//! Melee units hit any of the 8 cells around them. Ranged units hit any cell
//! within Manhattan range, ignoring whatever stands in between, and deliver
//! damage through a [`Projectile`] whose damage is fixed at launch.

use serde::{Deserialize, Serialize};

use crate::grid::GridPos;
use crate::math::{fixed_serde, has_elapsed, Fixed, Vec2Fixed};
use crate::unit::UnitId;

/// Whether a unit at `from` with `attack_range` can hit a unit at `to`.
///
/// Range 0 means melee: Chebyshev distance exactly 1. Otherwise the
/// Manhattan distance must lie in `1..=attack_range`. Occupancy of the
/// cells in between is never consulted.
#[must_use]
pub fn is_in_attack_range(from: GridPos, attack_range: u32, to: GridPos) -> bool {
    if attack_range == 0 {
        from.chebyshev(to) == 1
    } else {
        let distance = from.manhattan(to);
        distance > 0 && distance <= attack_range
    }
}

/// Damage in flight from a ranged unit.
///
/// Owned by the shooter. The target is a handle that is re-resolved on
/// impact; if it no longer refers to a living unit the damage is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unit that fired; credited with the kill.
    pub shooter: UnitId,
    /// Intended victim.
    pub target: UnitId,
    /// Shooter's cell at launch.
    pub origin: GridPos,
    /// Target's cell at launch, used for drawing only.
    pub target_cell: GridPos,
    /// Damage captured at launch.
    pub damage: u32,
    /// Seconds since launch.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Seconds from launch to impact.
    #[serde(with = "fixed_serde")]
    pub flight: Fixed,
}

impl Projectile {
    /// Launch a projectile.
    #[must_use]
    pub const fn new(
        shooter: UnitId,
        target: UnitId,
        origin: GridPos,
        target_cell: GridPos,
        damage: u32,
        flight: Fixed,
    ) -> Self {
        Self {
            shooter,
            target,
            origin,
            target_cell,
            damage,
            elapsed: Fixed::ZERO,
            flight,
        }
    }

    /// Flight progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> Fixed {
        if self.flight <= Fixed::ZERO {
            return Fixed::ONE;
        }
        (self.elapsed / self.flight).min(Fixed::ONE)
    }

    /// Advance the flight clock. Returns `true` once the projectile lands.
    pub fn advance(&mut self, dt: Fixed) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt);
        has_elapsed(self.elapsed, self.flight)
    }

    /// Straight-line position between the launch cells.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        let from = Vec2Fixed::from(self.origin);
        let to = Vec2Fixed::from(self.target_cell);
        from.lerp(to, self.progress())
    }
}
