//! Whole-battle scenarios driven through the public engine API.

use arena_core::prelude::*;
use arena_test_utils::fixtures::{fixed, fixed_f, melee_duel, mixed_skirmish, unit_at, BoardBuilder};

fn roster_with(kind: UnitKind, edit: impl FnOnce(&mut UnitStats)) -> Roster {
    let mut data = UnitData::builtin(kind);
    edit(&mut data.stats);
    Roster { units: vec![data] }
}

#[test]
fn melee_duel_trades_ten_blows() {
    let mut battle = melee_duel().build_started();
    let top = unit_at(&battle, 1, 1);
    let bottom = unit_at(&battle, 1, 2);

    let mut hits_by_top = 0;
    let mut hits_by_bottom = 0;
    while !battle.is_finished() {
        let events = battle.tick();
        for attack in &events.attacks {
            assert_eq!(attack.damage, 1);
            if attack.attacker == top {
                hits_by_top += 1;
            } else {
                hits_by_bottom += 1;
            }
        }

        let t = battle.tick_count();
        if t < 10 {
            let expected = 10 - u32::try_from(t).unwrap();
            assert_eq!(battle.unit(top).unwrap().health(), expected);
            assert_eq!(battle.unit(bottom).unwrap().health(), expected);
        }
        assert!(t <= 10, "duel should end on the tenth second");
    }

    assert_eq!(battle.tick_count(), 10);
    assert_eq!(hits_by_top, 10);
    assert_eq!(hits_by_bottom, 9);
    assert_eq!(battle.outcome(), Some(BattleOutcome::Victory(Player::Two)));
}

#[test]
fn kill_and_outcome_reported_in_the_same_tick() {
    let mut battle = melee_duel().build_started();
    let bottom = unit_at(&battle, 1, 2);

    let mut last = TickEvents::default();
    while !battle.is_finished() {
        last = battle.tick();
    }

    assert_eq!(last.kills.len(), 1);
    assert_eq!(last.kills[0].victim, bottom);
    assert_eq!(last.outcome, Some(BattleOutcome::Victory(Player::Two)));
    assert_eq!(battle.living_count(Player::One), 0);
}

#[test]
fn taunt_holds_for_its_duration_then_reverts() {
    // A slow knight stays on its cell for the whole test.
    let roster = roster_with(UnitKind::Knight, |s| s.move_speed = fixed_f(0.01));
    let mut battle = BoardBuilder::new(8, 8)
        .roster(roster)
        .unit(UnitKind::Archer, Player::Two, 0, 3)
        .unit(UnitKind::Soldier, Player::One, 1, 4)
        .unit(UnitKind::Knight, Player::One, 0, 6)
        .build();
    let archer = unit_at(&battle, 0, 3);
    let soldier = unit_at(&battle, 1, 4);
    let knight = unit_at(&battle, 0, 6);

    let start = battle.start_battle().unwrap();
    assert_eq!(start.taunts.len(), 1);
    assert_eq!(start.taunts[0].taunter, knight);
    assert_eq!(start.taunts[0].target, archer);
    assert_eq!(battle.unit(archer).unwrap().target(), Some(knight));

    for _ in 0..3 {
        let events = battle.tick();
        assert_eq!(battle.unit(archer).unwrap().target(), Some(knight));
        assert!(events
            .projectile_launches
            .iter()
            .all(|launch| launch.shooter != archer || launch.target == knight));
    }

    battle.tick();
    let a = battle.unit(archer).unwrap();
    assert!(a.taunt().is_none());
    assert_eq!(a.target(), Some(soldier));
}

#[test]
fn projectile_does_not_hit_a_target_killed_in_flight() {
    let roster = roster_with(UnitKind::Soldier, |s| s.health = 2);
    let mut battle = BoardBuilder::new(8, 8)
        .roster(roster)
        .unit(UnitKind::Soldier, Player::Two, 2, 3)
        .unit(UnitKind::Knight, Player::One, 3, 4)
        .upgraded(UnitKind::Archer, Player::One, 2, 6, &[Some(2)])
        .build_started();
    let target = unit_at(&battle, 2, 3);
    let knight = unit_at(&battle, 3, 4);
    let archer = unit_at(&battle, 2, 6);

    let first = battle.tick();
    assert_eq!(battle.unit(target).unwrap().health(), 1);
    assert_eq!(first.projectile_launches.len(), 1);
    assert_eq!(first.projectile_launches[0].shooter, archer);
    assert_eq!(first.projectile_launches[0].target, target);

    let second = battle.tick();
    assert_eq!(second.kills.len(), 1);
    assert_eq!(second.kills[0].killer, knight);
    assert_eq!(second.kills[0].victim, target);

    let impact = second
        .projectile_impacts
        .iter()
        .find(|i| i.shooter == archer)
        .expect("projectile landed");
    assert_eq!(impact.damage, 0);
    assert_eq!(battle.unit(archer).unwrap().kill_stacks(), 0);
    assert_eq!(battle.unit(target).unwrap().health(), 0);
    assert_eq!(second.outcome, Some(BattleOutcome::Victory(Player::One)));
}

#[test]
fn ranged_attack_ignores_units_in_between() {
    let mut builder = BoardBuilder::new(8, 8)
        .unit(UnitKind::Soldier, Player::Two, 2, 3)
        .unit(UnitKind::Archer, Player::One, 2, 6);
    for col in 0..8 {
        builder = builder.unit(UnitKind::Soldier, Player::One, col, 5);
    }
    let mut battle = builder.build_started();
    let target = unit_at(&battle, 2, 3);
    let archer = unit_at(&battle, 2, 6);
    assert!(battle.grid().is_occupied(GridPos::new(2, 5)));

    let events = battle.tick();
    assert!(events
        .projectile_launches
        .iter()
        .any(|l| l.shooter == archer && l.target == target));
    assert_eq!(battle.unit(archer).unwrap().state(), UnitState::Attacking);
}

#[test]
fn projectile_damage_is_captured_at_launch() {
    // A slow knight holds its cell; the soldier walks up beside the mage
    // while the first bolt is still in the air.
    let roster = roster_with(UnitKind::Knight, |s| s.move_speed = fixed_f(0.01));
    let mut config = BattleConfig::default()
        .with_size(4, 4)
        .with_tick_seconds(fixed(1));
    config.max_battle_seconds = None;
    config.projectile_flight_seconds = fixed_f(2.5);
    let mut battle = BoardBuilder::new(4, 4)
        .config(config)
        .roster(roster)
        .unit(UnitKind::Knight, Player::Two, 0, 0)
        .unit(UnitKind::Mage, Player::One, 0, 2)
        .unit(UnitKind::Soldier, Player::One, 2, 3)
        .build_started();
    let knight = unit_at(&battle, 0, 0);
    let mage = unit_at(&battle, 0, 2);
    let soldier = unit_at(&battle, 2, 3);

    let launch = battle.tick();
    // Focus bonus: no ally adjacent, 3 + 1.
    assert_eq!(launch.projectile_launches[0].damage, 4);

    battle.tick();
    battle.tick();
    let land = battle.tick();
    assert_eq!(battle.unit(soldier).unwrap().pos(), GridPos::new(1, 1));
    assert_eq!(land.projectile_impacts.len(), 1);
    assert_eq!(land.projectile_impacts[0].shooter, mage);
    assert_eq!(land.projectile_impacts[0].damage, 4);
    assert!(land.attacks.iter().any(|a| a.attacker == soldier && a.target == knight));

    // The next bolt is launched with the soldier adjacent, so no Focus.
    let next = battle.tick();
    let bolt = next
        .projectile_launches
        .iter()
        .find(|l| l.shooter == mage)
        .expect("mage fires again");
    assert_eq!(bolt.damage, 3);
}

#[test]
fn default_tick_rate_keeps_whole_second_cadence() {
    let mut battle = melee_duel()
        .tick_seconds(BattleConfig::default().tick_seconds)
        .build_started();
    let bottom = unit_at(&battle, 1, 2);

    let mut attack_ticks = Vec::new();
    for _ in 0..70 {
        let events = battle.tick();
        if events.attacks.iter().any(|a| a.attacker == bottom) {
            attack_ticks.push(battle.tick_count());
        }
    }
    assert_eq!(attack_ticks, vec![1, 21, 41, 61]);
}

#[test]
fn default_projectile_flight_lands_on_schedule() {
    let mut battle = BoardBuilder::new(4, 4)
        .tick_seconds(BattleConfig::default().tick_seconds)
        .unit(UnitKind::Soldier, Player::Two, 1, 0)
        .unit(UnitKind::Archer, Player::One, 1, 3)
        .build_started();

    let launch = battle.tick();
    assert_eq!(launch.projectile_launches.len(), 1);

    let mut landed_on = None;
    for _ in 0..20 {
        if !battle.tick().projectile_impacts.is_empty() {
            landed_on = Some(battle.tick_count());
            break;
        }
    }
    // 0.4 s at 20 ticks per second.
    assert_eq!(landed_on, Some(9));
}

#[test]
fn reservation_conflict_drops_the_path_and_repaths_next_tick() {
    // A walks right along row 4 and B wants to step up into the same
    // cell. A is scanned first and claims it.
    let roster = roster_with(UnitKind::Knight, |s| s.move_speed = fixed_f(0.01));
    let mut battle = BoardBuilder::new(5, 8)
        .roster(roster)
        .unit(UnitKind::Knight, Player::Two, 3, 3)
        .unit(UnitKind::Soldier, Player::One, 0, 4)
        .unit(UnitKind::Soldier, Player::One, 1, 5)
        .build_started();
    let a = unit_at(&battle, 0, 4);
    let b = unit_at(&battle, 1, 5);
    let contested = GridPos::new(1, 4);

    battle.tick();
    battle.check_invariants().unwrap();
    assert_eq!(battle.unit(a).unwrap().tween().map(|t| t.to), Some(contested));
    assert_eq!(
        battle.grid().cell(contested).and_then(|c| c.reserved_by()),
        Some(a)
    );
    let loser = battle.unit(b).unwrap();
    assert!(loser.tween().is_none());
    assert!(loser.path().is_empty());
    assert_eq!(loser.state(), UnitState::Moving);

    let events = battle.tick();
    battle.check_invariants().unwrap();
    assert!(events.moves.iter().any(|m| m.unit == a && m.to == contested));
    let rerouted = battle.unit(b).unwrap();
    assert_eq!(rerouted.tween().map(|t| t.to), Some(GridPos::new(2, 5)));
    assert_eq!(
        battle.grid().cell(GridPos::new(2, 5)).and_then(|c| c.reserved_by()),
        Some(b)
    );
}

#[test]
fn tween_movement_takes_one_second_per_cell() {
    let mut battle = BoardBuilder::new(1, 8)
        .unit(UnitKind::Soldier, Player::Two, 0, 0)
        .unit(UnitKind::Soldier, Player::One, 0, 7)
        .build_started();
    let top = unit_at(&battle, 0, 0);

    let first = battle.tick();
    assert!(first.moves.is_empty());
    let view = battle.unit_view(top).unwrap();
    assert_eq!(view.state, UnitState::Moving);
    assert_eq!(view.cell, GridPos::new(0, 0));
    assert_eq!(
        battle.grid().cell(GridPos::new(0, 1)).unwrap().reserved_by(),
        Some(top)
    );

    let second = battle.tick();
    assert!(second
        .moves
        .iter()
        .any(|m| m.unit == top && m.to == GridPos::new(0, 1)));
    assert_eq!(battle.unit(top).unwrap().pos(), GridPos::new(0, 1));
}

#[test]
fn discrete_movement_steps_immediately() {
    let mut battle = BoardBuilder::new(1, 8)
        .movement(MovementModel::Discrete)
        .unit(UnitKind::Soldier, Player::Two, 0, 0)
        .unit(UnitKind::Soldier, Player::One, 0, 7)
        .build_started();
    let bottom = unit_at(&battle, 0, 7);

    let first = battle.tick();
    assert!(first.moves.iter().any(|m| m.unit == bottom));
    assert_eq!(battle.unit(bottom).unwrap().pos(), GridPos::new(0, 6));
    assert!(battle.unit(bottom).unwrap().tween().is_none());
}

#[test]
fn both_movement_models_resolve_a_skirmish() {
    for model in [MovementModel::Tween, MovementModel::Discrete] {
        let mut battle = mixed_skirmish()
            .movement(model)
            .time_limit(fixed(600))
            .build_started();
        let mut ticks = 0;
        while !battle.is_finished() && ticks < 20_000 {
            battle.tick();
            battle.check_invariants().unwrap();
            ticks += 1;
        }
        assert!(battle.is_finished(), "{model:?} skirmish did not finish");
    }
}

#[test]
fn melee_unit_walks_around_a_blocker() {
    let mut battle = BoardBuilder::new(3, 6)
        .unit(UnitKind::Soldier, Player::Two, 1, 0)
        .upgraded(UnitKind::Knight, Player::One, 1, 3, &[Some(1)])
        .unit(UnitKind::Soldier, Player::One, 1, 5)
        .build_started();
    let runner = unit_at(&battle, 1, 5);

    let mut engaged = false;
    for _ in 0..30 {
        let events = battle.tick();
        if events.attacks.iter().any(|a| a.attacker == runner) {
            engaged = true;
            break;
        }
    }
    assert!(engaged, "soldier never reached the enemy");
}

#[test]
fn upgraded_units_fight_with_scaled_stats() {
    let mut battle = BoardBuilder::new(4, 4)
        .upgraded(UnitKind::Soldier, Player::Two, 1, 1, &[None, None])
        .unit(UnitKind::Soldier, Player::One, 1, 2)
        .build_started();
    let veteran = unit_at(&battle, 1, 1);
    assert_eq!(battle.unit(veteran).unwrap().max_health(), 22);

    let events = battle.tick();
    let hit = events
        .attacks
        .iter()
        .find(|a| a.attacker == veteran)
        .unwrap();
    assert_eq!(hit.damage, 2);
}

#[test]
fn dead_shooter_projectiles_are_dropped() {
    // Two fragile archers fire at each other on the same tick. The first
    // impact kills the other shooter, whose arrow never lands.
    let roster = roster_with(UnitKind::Archer, |s| s.health = 1);
    let mut battle = BoardBuilder::new(4, 4)
        .roster(roster)
        .unit(UnitKind::Archer, Player::Two, 1, 0)
        .unit(UnitKind::Archer, Player::One, 1, 3)
        .build_started();
    let top = unit_at(&battle, 1, 0);

    let volley = battle.tick();
    assert_eq!(volley.projectile_launches.len(), 2);

    let events = battle.tick();
    assert_eq!(events.kills.len(), 1);
    assert_eq!(events.kills[0].killer, top);
    assert!(battle.projectile_views().is_empty());
    assert_eq!(events.outcome, Some(BattleOutcome::Victory(Player::Two)));
    assert_eq!(battle.unit(top).unwrap().health(), 1);
}

#[test]
fn bloodlust_heals_on_kill() {
    let roster = roster_with(UnitKind::Soldier, |s| s.health = 1);
    let mut battle = BoardBuilder::new(4, 4)
        .roster(roster)
        .upgraded(UnitKind::Berserker, Player::Two, 1, 1, &[Some(1)])
        .unit(UnitKind::Soldier, Player::One, 1, 2)
        .unit(UnitKind::Soldier, Player::One, 3, 3)
        .build_started();
    let berserker = unit_at(&battle, 1, 1);

    let events = battle.tick();
    assert!(events.kills.iter().any(|k| k.killer == berserker));
    // Untouched, so the heal is capped at max health.
    assert_eq!(battle.unit(berserker).unwrap().health(), 18);
}

#[test]
fn setup_timer_drives_battle_start() {
    let mut battle = melee_duel().build();
    let mut started = None;
    for _ in 0..40 {
        if let Some(events) = battle.advance_setup(fixed_f(1.0)) {
            started = Some(events);
            break;
        }
    }
    assert!(started.is_some());
    assert_eq!(battle.phase(), BattlePhase::Battle);
    assert_eq!(battle.setup_remaining(), Fixed::ZERO);
}
