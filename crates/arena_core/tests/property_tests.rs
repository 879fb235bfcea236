//! Property tests for board bookkeeping, pathing, upgrades and whole battles.

use std::collections::BTreeMap;

use arena_core::combat::is_in_attack_range;
use arena_core::pathfinding::find_path;
use arena_core::prelude::*;
use arena_test_utils::determinism::strategies::{arb_drafts, arb_grid_pos};
use arena_test_utils::proptest::prelude::*;

#[derive(Debug, Clone)]
enum BoardOp {
    Place(GridPos, u32),
    Remove(GridPos),
    Move(GridPos, GridPos),
}

fn arb_board_op(cols: u32, rows: u32) -> impl Strategy<Value = BoardOp> {
    prop_oneof![
        (arb_grid_pos(cols, rows), 1u32..20).prop_map(|(p, id)| BoardOp::Place(p, id)),
        arb_grid_pos(cols, rows).prop_map(BoardOp::Remove),
        (arb_grid_pos(cols, rows), arb_grid_pos(cols, rows))
            .prop_map(|(from, to)| BoardOp::Move(from, to)),
    ]
}

fn random_battle(drafts_one: &[(UnitKind, GridPos)], drafts_two: &[(UnitKind, GridPos)]) -> Battle {
    let config = BattleConfig::default().with_size(6, 6);
    let mut battle = Battle::new(config).unwrap();
    for &(kind, pos) in drafts_one {
        let _ = battle.place_unit(kind, Player::One, pos);
    }
    for &(kind, pos) in drafts_two {
        let _ = battle.place_unit(kind, Player::Two, pos);
    }
    battle.start_battle().unwrap();
    battle
}

proptest! {
    #[test]
    fn board_matches_a_simple_model(ops in prop::collection::vec(arb_board_op(5, 5), 0..60)) {
        let mut grid = Grid::new(5, 5);
        let mut model: BTreeMap<GridPos, UnitId> = BTreeMap::new();

        for op in ops {
            match op {
                BoardOp::Place(pos, raw) => {
                    let id = UnitId::new(raw);
                    let result = grid.place_unit(pos, id);
                    if model.contains_key(&pos) {
                        prop_assert!(result.is_err());
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(pos, id);
                    }
                }
                BoardOp::Remove(pos) => {
                    prop_assert_eq!(grid.remove_unit(pos), model.remove(&pos));
                }
                BoardOp::Move(from, to) => {
                    let Some(&id) = model.get(&from) else {
                        continue;
                    };
                    let moved = grid.move_unit(from, to, id);
                    let expected = from != to && !model.contains_key(&to);
                    prop_assert_eq!(moved, expected);
                    if moved {
                        model.remove(&from);
                        model.insert(to, id);
                    }
                }
            }

            for cell in grid.cells() {
                prop_assert_eq!(cell.unit(), model.get(&cell.pos()).copied());
                prop_assert_eq!(cell.is_occupied(), cell.unit().is_some());
            }
        }
    }

    #[test]
    fn one_reservation_per_cell(pos in arb_grid_pos(6, 6), a in 1u32..50, b in 1u32..50) {
        prop_assume!(a != b);
        let mut grid = Grid::new(6, 6);
        let first = UnitId::new(a);
        let second = UnitId::new(b);

        prop_assert!(grid.reserve_cell(pos, first));
        prop_assert!(!grid.reserve_cell(pos, second));
        prop_assert!(!grid.free_reservation(pos, second));
        prop_assert_eq!(grid.cell(pos).unwrap().reserved_by(), Some(first));

        prop_assert!(grid.free_reservation(pos, first));
        prop_assert!(grid.reserve_cell(pos, second));
    }

    #[test]
    fn empty_board_paths_are_manhattan_length(
        start in arb_grid_pos(10, 10),
        goal in arb_grid_pos(10, 10),
    ) {
        let grid = Grid::new(10, 10);
        let path = find_path(&grid, start, goal).unwrap();
        prop_assert_eq!(path.len() as u32, start.manhattan(goal));

        let mut previous = start;
        for step in &path {
            prop_assert_eq!(previous.manhattan(*step), 1);
            previous = *step;
        }
        prop_assert_eq!(previous, goal);
    }

    #[test]
    fn melee_reach_is_symmetric(a in arb_grid_pos(8, 8), b in arb_grid_pos(8, 8)) {
        let forward = is_in_attack_range(a, 0, b);
        prop_assert_eq!(forward, is_in_attack_range(b, 0, a));
        prop_assert_eq!(forward, a.chebyshev(b) == 1);
    }

    #[test]
    fn upgrades_scale_by_three_halves(
        kind in prop::sample::select(UnitKind::ALL.to_vec()),
        health in 1u32..500,
        damage in 1u32..50,
    ) {
        let mut data = UnitData::builtin(kind);
        data.stats.health = health;
        data.stats.damage = damage;
        let mut unit = Unit::new(UnitId::new(1), kind, Player::One, GridPos::new(0, 0), data.stats);

        let tree_len = kind.upgrade_tree().len();
        for level in 1..=MAX_LEVEL {
            let slot = (tree_len > 0).then(|| usize::from(level - 1));
            unit.upgrade(slot).unwrap();

            let num = 3u32.pow(u32::from(level));
            let den = 2u32.pow(u32::from(level));
            prop_assert_eq!(unit.level(), level);
            prop_assert_eq!(unit.max_health(), health * num / den);
            prop_assert_eq!(unit.stats().damage, damage * num / den);
            prop_assert_eq!(unit.health(), unit.max_health());
        }

        let before = unit.clone();
        let slot = (tree_len > 0).then_some(0);
        prop_assert_eq!(unit.upgrade(slot), Err(UpgradeError::MaxLevel(MAX_LEVEL)));
        prop_assert_eq!(unit, before);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_battles_keep_the_board_consistent(
        ones in arb_drafts(6, 6, Player::One, 6),
        twos in arb_drafts(6, 6, Player::Two, 6),
    ) {
        let mut battle = random_battle(&ones, &twos);
        for _ in 0..600 {
            if battle.is_finished() {
                break;
            }
            battle.tick();
            prop_assert!(battle.check_invariants().is_ok());
        }
    }

    #[test]
    fn random_battles_are_deterministic(
        ones in arb_drafts(6, 6, Player::One, 5),
        twos in arb_drafts(6, 6, Player::Two, 5),
    ) {
        let mut a = random_battle(&ones, &twos);
        let mut b = random_battle(&ones, &twos);
        for _ in 0..400 {
            a.tick();
            b.tick();
            prop_assert_eq!(a.state_hash(), b.state_hash());
        }
        prop_assert_eq!(a.outcome(), b.outcome());
    }
}

#[test]
fn walled_in_goal_has_no_path() {
    let mut grid = Grid::new(5, 5);
    let goal = GridPos::new(2, 2);
    for (i, pos) in grid.neighbors8(goal).into_iter().enumerate() {
        grid.place_unit(pos, UnitId::new(i as u32 + 1)).unwrap();
    }
    assert_eq!(find_path(&grid, GridPos::new(0, 0), goal), None);

    grid.remove_unit(GridPos::new(2, 1));
    let path = find_path(&grid, GridPos::new(0, 0), goal).unwrap();
    assert_eq!(path.last(), Some(&goal));
    assert_eq!(path.len(), 4);
}
