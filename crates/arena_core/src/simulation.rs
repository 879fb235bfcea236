//! The battle engine: setup phase, battle start, tick loop and win detection.
//!
//! # Determinism
//!
//! Everything in this module is fully deterministic:
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - No randomness
//! - Units update in the grid's row-major scan order, snapshotted once per tick
//! - Same setup actions and step sizes always produce the same battle
//!
//! # Example
//!
//! ```
//! use arena_core::prelude::*;
//!
//! let mut battle = Battle::new(BattleConfig::default()).unwrap();
//! battle
//!     .place_unit(UnitKind::Soldier, Player::Two, GridPos::new(3, 3))
//!     .unwrap();
//! battle
//!     .place_unit(UnitKind::Soldier, Player::One, GridPos::new(3, 4))
//!     .unwrap();
//!
//! battle.start_battle().unwrap();
//! let outcome = battle.run_to_completion(10_000);
//! assert!(outcome.is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::behavior;
use crate::data::{BattleConfig, Roster};
use crate::error::{GameError, PlacementError, Result, UpgradeError};
use crate::grid::{Grid, GridPos, Player};
use crate::math::{countdown, fixed_serde, has_elapsed, Fixed};
use crate::replay::SetupAction;
use crate::systems::{
    update_unit, AttackEvent, KillEvent, MoveEvent, ProjectileImpactEvent, ProjectileLaunchEvent,
    TauntEvent, UpdateContext,
};
use crate::unit::{Unit, UnitId};
use crate::unit_kind::UnitKind;
use crate::view::{ProjectileView, UnitView};

/// Storage for every unit in a battle, living or dead.
///
/// Ordered by ID so iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStorage {
    units: BTreeMap<UnitId, Unit>,
    next_id: u32,
}

impl Default for UnitStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Reserve a fresh ID. IDs are never reused.
    pub fn allocate_id(&mut self) -> UnitId {
        let id = UnitId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a unit under its own ID, returning any unit it replaced.
    pub fn put(&mut self, unit: Unit) -> Option<Unit> {
        self.next_id = self.next_id.max(unit.id().as_u32() + 1);
        self.units.insert(unit.id(), unit)
    }

    /// Remove a unit.
    pub fn take(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Look up a unit.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Look up a unit mutably.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Whether a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of units, corpses included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether there are no units at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units in ID order.
    pub fn values(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Units in ID order, mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.values_mut()
    }
}

/// Result of a finished battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// One side has living units and the other has none.
    Victory(Player),
    /// Both sides died in the same tick, or the time limit ran out.
    Draw,
}

impl BattleOutcome {
    /// The winning player, if any.
    #[must_use]
    pub const fn winner(self) -> Option<Player> {
        match self {
            Self::Victory(player) => Some(player),
            Self::Draw => None,
        }
    }
}

impl fmt::Display for BattleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Victory(player) => write!(f, "{player} wins"),
            Self::Draw => f.write_str("draw"),
        }
    }
}

/// Lifecycle of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattlePhase {
    /// Players place, remove and upgrade units.
    Setup,
    /// Unit AI is running.
    Battle,
    /// A result has been reached; ticking does nothing.
    Finished(BattleOutcome),
}

/// Events produced by battle start or by one tick.
///
/// These events can be used by the presentation layer to trigger effects,
/// sounds and animations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickEvents {
    /// Melee hits.
    pub attacks: Vec<AttackEvent>,
    /// Projectiles fired.
    pub projectile_launches: Vec<ProjectileLaunchEvent>,
    /// Projectiles that landed.
    pub projectile_impacts: Vec<ProjectileImpactEvent>,
    /// Units that died.
    pub kills: Vec<KillEvent>,
    /// Completed steps.
    pub moves: Vec<MoveEvent>,
    /// Taunts applied at battle start.
    pub taunts: Vec<TauntEvent>,
    /// Set on the tick (or battle start) that decided the battle.
    pub outcome: Option<BattleOutcome>,
}

impl TickEvents {
    /// Whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
            && self.projectile_launches.is_empty()
            && self.projectile_impacts.is_empty()
            && self.kills.is_empty()
            && self.moves.is_empty()
            && self.taunts.is_empty()
            && self.outcome.is_none()
    }
}

/// A 1v1 battle on one board.
///
/// Owns the grid and every unit. The setup API places, removes and upgrades
/// units; once the battle starts, [`tick`](Self::tick) drives the unit AI
/// until one side has no living units left.
///
/// # Tick order
///
/// 1. Corpses advance their fade timer
/// 2. Living units update in row-major scan order (snapshot taken first)
/// 3. Living units are counted per side and the outcome decided
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battle {
    config: BattleConfig,
    roster: Roster,
    grid: Grid,
    units: UnitStorage,
    phase: BattlePhase,
    tick: u64,
    #[serde(with = "fixed_serde")]
    elapsed: Fixed,
    #[serde(with = "fixed_serde")]
    setup_remaining: Fixed,
    ready: [bool; 2],
    actions: Vec<SetupAction>,
}

impl Battle {
    /// Create a battle in the setup phase with the built-in roster.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if the configuration is unusable.
    pub fn new(config: BattleConfig) -> Result<Self> {
        Self::with_roster(config, Roster::default())
    }

    /// Create a battle in the setup phase with a custom roster.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if the configuration or roster
    /// is unusable.
    pub fn with_roster(config: BattleConfig, roster: Roster) -> Result<Self> {
        config.validate().map_err(GameError::InvalidState)?;
        roster.validate().map_err(GameError::InvalidState)?;
        Ok(Self {
            grid: Grid::new(config.cols, config.rows),
            units: UnitStorage::new(),
            phase: BattlePhase::Setup,
            tick: 0,
            elapsed: Fixed::ZERO,
            setup_remaining: config.setup_seconds,
            ready: [false; 2],
            actions: Vec::new(),
            config,
            roster,
        })
    }

    /// Battle settings.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// Unit definitions in use.
    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The board.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Every unit, corpses included.
    #[must_use]
    pub const fn units(&self) -> &UnitStorage {
        &self.units
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Final result, once decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<BattleOutcome> {
        match self.phase {
            BattlePhase::Finished(outcome) => Some(outcome),
            BattlePhase::Setup | BattlePhase::Battle => None,
        }
    }

    /// Whether the battle has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.phase, BattlePhase::Finished(_))
    }

    /// Number of battle ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Battle time elapsed so far.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Setup time left before the battle starts on its own.
    #[must_use]
    pub const fn setup_remaining(&self) -> Fixed {
        self.setup_remaining
    }

    /// Whether a player has readied up.
    #[must_use]
    pub const fn is_ready(&self, player: Player) -> bool {
        self.ready[player.index()]
    }

    /// Setup actions applied so far, in order.
    #[must_use]
    pub fn actions(&self) -> &[SetupAction] {
        &self.actions
    }

    /// Draft/upgrade cost of a kind. The engine never tracks currency.
    #[must_use]
    pub fn cost(&self, kind: UnitKind) -> u32 {
        self.roster.cost(kind)
    }

    /// Living units a player still has.
    #[must_use]
    pub fn living_count(&self, player: Player) -> usize {
        self.units
            .values()
            .filter(|u| u.owner() == player && u.is_alive())
            .count()
    }

    // ------------------------------------------------------------------
    // Setup phase
    // ------------------------------------------------------------------

    fn ensure_setup(&self) -> std::result::Result<(), PlacementError> {
        if self.phase == BattlePhase::Setup {
            Ok(())
        } else {
            Err(PlacementError::WrongPhase)
        }
    }

    /// Whether `player` may place a unit on `pos` right now.
    #[must_use]
    pub fn can_place_unit(&self, pos: GridPos, player: Player) -> bool {
        self.ensure_setup().is_ok() && self.grid.can_place_unit(pos, player)
    }

    /// Draft a new level-0 unit onto the board.
    ///
    /// # Errors
    ///
    /// Fails without side effects outside setup, or if the cell is out of
    /// bounds, occupied, or in the other player's zone.
    pub fn place_unit(&mut self, kind: UnitKind, owner: Player, pos: GridPos) -> Result<UnitId> {
        self.ensure_setup()?;
        self.grid.check_placement(pos, owner)?;

        let id = self.units.allocate_id();
        self.grid.place_unit(pos, id)?;
        self.units
            .put(Unit::new(id, kind, owner, pos, self.roster.stats(kind)));
        self.actions.push(SetupAction::Place { kind, owner, pos });
        debug!(unit = %id, %kind, %owner, %pos, "Unit placed");
        Ok(id)
    }

    /// Take a unit off the board during setup.
    ///
    /// # Errors
    ///
    /// Fails outside setup or if the unit does not exist.
    pub fn remove_unit(&mut self, id: UnitId) -> Result<Unit> {
        self.ensure_setup()?;
        let unit = self
            .units
            .take(id)
            .ok_or(PlacementError::UnknownUnit(id))?;
        self.grid.remove_unit(unit.pos());
        self.actions.push(SetupAction::Remove(id));
        debug!(unit = %id, "Unit removed");
        Ok(unit)
    }

    /// Upgrade a unit during setup. See [`Unit::upgrade`] for the rules.
    ///
    /// # Errors
    ///
    /// Fails without side effects outside setup, for an unknown unit, or
    /// when the upgrade itself is rejected.
    pub fn upgrade_unit(&mut self, id: UnitId, slot: Option<usize>) -> Result<()> {
        if self.phase != BattlePhase::Setup {
            return Err(UpgradeError::WrongPhase.into());
        }
        let unit = self.units.get_mut(id).ok_or(GameError::UnitNotFound(id))?;
        unit.upgrade(slot)?;
        debug!(unit = %id, level = unit.level(), ?slot, "Unit upgraded");
        self.actions.push(SetupAction::Upgrade { unit: id, slot });
        Ok(())
    }

    /// First living unit of `kind` owned by `owner`, in ID order.
    ///
    /// Lets a drafting UI decide between placing a new unit and upgrading
    /// an existing one.
    #[must_use]
    pub fn find_unit(&self, kind: UnitKind, owner: Player) -> Option<UnitId> {
        self.units
            .values()
            .find(|u| u.kind() == kind && u.owner() == owner && u.is_alive())
            .map(Unit::id)
    }

    /// Count down the setup timer. Starts the battle when it reaches zero
    /// and returns the battle-start events; otherwise returns `None`.
    pub fn advance_setup(&mut self, dt: Fixed) -> Option<TickEvents> {
        if self.phase != BattlePhase::Setup {
            return None;
        }
        self.setup_remaining = countdown(self.setup_remaining, dt);
        if self.setup_remaining > Fixed::ZERO {
            return None;
        }
        self.actions.push(SetupAction::Start);
        Some(self.begin())
    }

    /// Mark a player ready. Starts the battle once both players are ready.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::BattleAlreadyStarted`] outside setup.
    pub fn set_ready(&mut self, player: Player) -> Result<Option<TickEvents>> {
        if self.phase != BattlePhase::Setup {
            return Err(GameError::BattleAlreadyStarted);
        }
        self.ready[player.index()] = true;
        self.actions.push(SetupAction::Ready(player));
        if self.ready.iter().all(|&r| r) {
            Ok(Some(self.begin()))
        } else {
            Ok(None)
        }
    }

    /// End setup now and run every unit's battle-start hook.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::BattleAlreadyStarted`] if called a second time.
    pub fn start_battle(&mut self) -> Result<TickEvents> {
        if self.phase != BattlePhase::Setup {
            return Err(GameError::BattleAlreadyStarted);
        }
        self.actions.push(SetupAction::Start);
        Ok(self.begin())
    }

    fn begin(&mut self) -> TickEvents {
        self.phase = BattlePhase::Battle;
        self.setup_remaining = Fixed::ZERO;
        info!(
            player_one = self.living_count(Player::One),
            player_two = self.living_count(Player::Two),
            "Battle started"
        );

        let mut events = TickEvents::default();
        for id in self.grid.all_units() {
            let Some(unit) = self.units.take(id) else {
                continue;
            };
            events
                .taunts
                .extend(behavior::on_battle_start(&unit, &self.grid, &mut self.units));
            self.units.put(unit);
        }
        events.outcome = self.decide();
        events
    }

    // ------------------------------------------------------------------
    // Battle phase
    // ------------------------------------------------------------------

    /// Advance the battle by the configured step.
    pub fn tick(&mut self) -> TickEvents {
        self.tick_with(self.config.tick_seconds)
    }

    /// Advance the battle by `dt` seconds. Does nothing outside the battle
    /// phase.
    pub fn tick_with(&mut self, dt: Fixed) -> TickEvents {
        let mut events = TickEvents::default();
        if self.phase != BattlePhase::Battle {
            return events;
        }

        self.tick += 1;
        self.elapsed += dt;

        for corpse in self.units.values_mut().filter(|u| u.is_dead()) {
            corpse.death_elapsed += dt;
        }

        for id in self.grid.all_units() {
            let Some(mut unit) = self.units.take(id) else {
                continue;
            };
            if unit.is_alive() {
                let mut ctx = UpdateContext {
                    grid: &mut self.grid,
                    others: &mut self.units,
                    config: &self.config,
                    events: &mut events,
                    dt,
                };
                update_unit(&mut unit, &mut ctx);
            }
            self.units.put(unit);
        }

        events.outcome = self.decide();

        #[cfg(feature = "debug-validation")]
        if let Err(e) = self.check_invariants() {
            panic!("tick {}: {e}", self.tick);
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Battle state hash");
        }

        events
    }

    /// Check the win condition and finish the battle if it is decided.
    fn decide(&mut self) -> Option<BattleOutcome> {
        let one = self.living_count(Player::One);
        let two = self.living_count(Player::Two);
        let outcome = match (one, two) {
            (0, 0) => BattleOutcome::Draw,
            (0, _) => BattleOutcome::Victory(Player::Two),
            (_, 0) => BattleOutcome::Victory(Player::One),
            _ => match self.config.max_battle_seconds {
                Some(limit) if has_elapsed(self.elapsed, limit) => BattleOutcome::Draw,
                _ => return None,
            },
        };
        self.phase = BattlePhase::Finished(outcome);
        info!(tick = self.tick, %outcome, "Battle finished");
        Some(outcome)
    }

    /// Verify that the board and the units agree.
    ///
    /// Every living unit stands on its own cell, no corpse occupies a cell,
    /// and every reservation belongs to a living unit stepping into it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] describing the first violation.
    pub fn check_invariants(&self) -> Result<()> {
        for unit in self.units.values() {
            let on_cell = self.grid.unit_at(unit.pos()) == Some(unit.id());
            if unit.is_alive() != on_cell {
                return Err(GameError::InvalidState(format!(
                    "unit {} alive={} but on_cell={on_cell}",
                    unit.id(),
                    unit.is_alive()
                )));
            }
        }
        for cell in self.grid.cells() {
            if let Some(id) = cell.unit() {
                if !self.units.contains(id) {
                    return Err(GameError::InvalidState(format!(
                        "cell {} holds unknown unit {id}",
                        cell.pos()
                    )));
                }
            }
            if let Some(holder) = cell.reserved_by() {
                let stepping = self
                    .units
                    .get(holder)
                    .and_then(Unit::tween)
                    .is_some_and(|t| t.to == cell.pos());
                if !stepping {
                    return Err(GameError::InvalidState(format!(
                        "cell {} reserved by {holder} which is not stepping into it",
                        cell.pos()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Start the battle if needed and tick until it finishes or `max_ticks`
    /// ticks have run. Returns the outcome if one was reached.
    pub fn run_to_completion(&mut self, max_ticks: u64) -> Option<BattleOutcome> {
        if self.phase == BattlePhase::Setup {
            self.actions.push(SetupAction::Start);
            self.begin();
        }
        let mut ran = 0;
        while self.phase == BattlePhase::Battle && ran < max_ticks {
            self.tick();
            ran += 1;
        }
        self.outcome()
    }

    // ------------------------------------------------------------------
    // Rendering queries
    // ------------------------------------------------------------------

    /// Read-only view of one unit.
    #[must_use]
    pub fn unit_view(&self, id: UnitId) -> Option<UnitView> {
        self.units.get(id).map(|u| UnitView::new(u, &self.config))
    }

    /// Read-only views of every unit in ID order, corpses included.
    #[must_use]
    pub fn unit_views(&self) -> Vec<UnitView> {
        self.units
            .values()
            .map(|u| UnitView::new(u, &self.config))
            .collect()
    }

    /// Read-only views of every projectile in flight.
    #[must_use]
    pub fn projectile_views(&self) -> Vec<ProjectileView> {
        self.units
            .values()
            .flat_map(|u| u.projectiles().iter().map(ProjectileView::new))
            .collect()
    }

    // ------------------------------------------------------------------
    // Determinism
    // ------------------------------------------------------------------

    /// Hash of the full battle state.
    ///
    /// Two battles with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.elapsed.to_bits().hash(&mut hasher);
        self.phase.hash(&mut hasher);

        for cell in self.grid.cells() {
            cell.unit().hash(&mut hasher);
            cell.reserved_by().hash(&mut hasher);
        }

        self.units.len().hash(&mut hasher);
        for unit in self.units.values() {
            hash_unit(unit, &mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the battle state.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize battle: {e}")))
    }

    /// Deserialize battle state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize battle: {e}")))
    }
}

fn hash_unit(unit: &Unit, hasher: &mut impl Hasher) {
    unit.id().hash(hasher);
    unit.kind().hash(hasher);
    unit.owner().hash(hasher);
    unit.pos().hash(hasher);
    unit.health().hash(hasher);
    unit.max_health().hash(hasher);
    unit.stats().damage.hash(hasher);
    unit.stats().attack_speed.to_bits().hash(hasher);
    unit.stats().move_speed.to_bits().hash(hasher);
    unit.stats().attack_range.hash(hasher);
    unit.state().hash(hasher);
    unit.target().hash(hasher);
    unit.path().hash(hasher);
    unit.attack_cooldown.to_bits().hash(hasher);
    unit.move_cooldown.to_bits().hash(hasher);
    if let Some(tween) = unit.tween() {
        tween.to.hash(hasher);
        tween.elapsed.to_bits().hash(hasher);
    }
    unit.level().hash(hasher);
    unit.active_slots().hash(hasher);
    if let Some(taunt) = unit.taunt() {
        taunt.taunter.hash(hasher);
        taunt.remaining.to_bits().hash(hasher);
    }
    unit.kill_stacks().hash(hasher);
    unit.regen_progress.to_bits().hash(hasher);
    for projectile in unit.projectiles() {
        projectile.target.hash(hasher);
        projectile.damage.hash(hasher);
        projectile.elapsed.to_bits().hash(hasher);
    }
}
