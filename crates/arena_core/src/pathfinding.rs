//! Grid pathfinding using the A* algorithm.
//!
//! Movement is 4-directional with a uniform step cost of 1, so the
//! Manhattan heuristic is admissible and consistent and the returned path
//! is always a shortest one.
//!
//! Only physical occupancy blocks the search. Reservations are ignored
//! here and checked again when a unit actually starts a step, so a path
//! can be rejected at execution time and recomputed on the next tick.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::grid::{Grid, GridPos};

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    pos: GridPos,
    /// f_score = g_score + heuristic
    f_score: u32,
    /// Heuristic part of the f_score; prefer nodes closer to the goal on ties.
    h_score: u32,
    /// Final tie-breaker for determinism: lower coordinates first.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so reverse every comparison.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.h_score.cmp(&self.h_score))
            .then_with(|| other.tie_breaker.cmp(&self.tie_breaker))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Direction offsets for 4-directional movement.
const DIRECTIONS: [(i32, i32); 4] = [
    (0, -1), // North
    (-1, 0), // West
    (1, 0),  // East
    (0, 1),  // South
];

/// Manhattan distance heuristic.
#[inline]
fn manhattan_heuristic(a: GridPos, b: GridPos) -> u32 {
    a.manhattan(b)
}

/// Convert coordinates to a tie-breaker value for deterministic ordering.
#[inline]
fn coords_to_tie_breaker(pos: GridPos) -> u64 {
    (u64::from(pos.row) << 32) | u64::from(pos.col)
}

/// Find a shortest path from `start` to `goal`.
///
/// The returned path excludes `start` and includes `goal`. It is empty
/// when `start == goal`. Returns `None` if either endpoint is out of
/// bounds, the goal is occupied, or no route exists.
///
/// The start cell itself is allowed to be occupied (it normally holds the
/// unit asking for the path).
#[must_use]
pub fn find_path(grid: &Grid, start: GridPos, goal: GridPos) -> Option<Vec<GridPos>> {
    if !grid.is_valid_cell(goal) || !grid.is_valid_cell(start) {
        return None;
    }
    if start == goal {
        return Some(Vec::new());
    }
    if grid.is_occupied(goal) {
        return None;
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<GridPos, GridPos> = HashMap::new();
    let mut g_score: HashMap<GridPos, u32> = HashMap::new();

    let start_h = manhattan_heuristic(start, goal);
    g_score.insert(start, 0);
    open_set.push(AStarNode {
        pos: start,
        f_score: start_h,
        h_score: start_h,
        tie_breaker: coords_to_tie_breaker(start),
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return Some(reconstruct_path(&came_from, start, goal));
        }

        let current_g = g_score.get(&current.pos).copied().unwrap_or(u32::MAX);

        // Skip stale heap entries
        if current.f_score > current_g.saturating_add(current.h_score) {
            continue;
        }

        for &(dcol, drow) in &DIRECTIONS {
            let Some(next) = current.pos.offset(dcol, drow) else {
                continue;
            };
            if !grid.is_valid_cell(next) || grid.is_occupied(next) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_score.get(&next).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(next, current.pos);
                g_score.insert(next, tentative_g);

                let h = manhattan_heuristic(next, goal);
                open_set.push(AStarNode {
                    pos: next,
                    f_score: tentative_g + h,
                    h_score: h,
                    tie_breaker: coords_to_tie_breaker(next),
                });
            }
        }
    }

    None
}

/// Walk `came_from` back from the goal. The start cell is not included.
fn reconstruct_path(
    came_from: &HashMap<GridPos, GridPos>,
    start: GridPos,
    goal: GridPos,
) -> Vec<GridPos> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitId;

    fn pos(col: u32, row: u32) -> GridPos {
        GridPos::new(col, row)
    }

    fn block(grid: &mut Grid, cells: &[(u32, u32)]) {
        for (i, &(col, row)) in cells.iter().enumerate() {
            grid.place_unit(pos(col, row), UnitId::new(100 + i as u32))
                .unwrap();
        }
    }

    fn assert_contiguous(start: GridPos, path: &[GridPos]) {
        let mut prev = start;
        for &step in path {
            assert_eq!(prev.manhattan(step), 1, "non-adjacent step {prev} -> {step}");
            prev = step;
        }
    }

    #[test]
    fn test_simple_path() {
        let grid = Grid::new(10, 10);
        let path = find_path(&grid, pos(0, 0), pos(5, 5)).unwrap();

        assert_eq!(path.len(), 10);
        assert_eq!(path.last(), Some(&pos(5, 5)));
        assert!(!path.contains(&pos(0, 0)));
        assert_contiguous(pos(0, 0), &path);
    }

    #[test]
    fn test_path_to_same_cell() {
        let grid = Grid::new(10, 10);
        let path = find_path(&grid, pos(5, 5), pos(5, 5)).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_goal_out_of_bounds() {
        let grid = Grid::new(4, 4);
        assert!(find_path(&grid, pos(0, 0), pos(4, 0)).is_none());
    }

    #[test]
    fn test_start_cell_may_be_occupied() {
        let mut grid = Grid::new(4, 4);
        block(&mut grid, &[(0, 0)]);
        let path = find_path(&grid, pos(0, 0), pos(0, 2)).unwrap();
        assert_eq!(path, vec![pos(0, 1), pos(0, 2)]);
    }

    #[test]
    fn test_path_around_obstacle() {
        let mut grid = Grid::new(10, 10);
        let wall: Vec<(u32, u32)> = (2..8).map(|row| (5, row)).collect();
        block(&mut grid, &wall);

        let path = find_path(&grid, pos(2, 5), pos(8, 5)).unwrap();
        assert_contiguous(pos(2, 5), &path);
        for step in &path {
            assert!(!grid.is_occupied(*step), "path goes through {step}");
        }
        // Straight line would be 6; detour must go around row 1 or row 8
        assert!(path.len() > 6);
    }

    #[test]
    fn test_no_path_exists() {
        let mut grid = Grid::new(10, 10);
        let wall: Vec<(u32, u32)> = (0..10).map(|row| (5, row)).collect();
        block(&mut grid, &wall);

        assert!(find_path(&grid, pos(2, 5), pos(8, 5)).is_none());
    }

    #[test]
    fn test_enclosed_goal() {
        let mut grid = Grid::new(5, 5);
        block(&mut grid, &[(2, 1), (1, 2), (3, 2), (2, 3)]);

        assert!(find_path(&grid, pos(0, 0), pos(2, 2)).is_none());
        let path = find_path(&grid, pos(0, 0), pos(1, 1)).unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_occupied_goal() {
        let mut grid = Grid::new(5, 5);
        block(&mut grid, &[(3, 3)]);
        assert!(find_path(&grid, pos(0, 0), pos(3, 3)).is_none());
    }

    #[test]
    fn test_reservations_do_not_block_search() {
        let mut grid = Grid::new(3, 1);
        assert!(grid.reserve_cell(pos(1, 0), UnitId::new(9)));
        let path = find_path(&grid, pos(0, 0), pos(2, 0)).unwrap();
        assert_eq!(path, vec![pos(1, 0), pos(2, 0)]);
    }

    #[test]
    fn test_determinism() {
        let mut grid = Grid::new(20, 20);
        let wall: Vec<(u32, u32)> = (5..15).map(|row| (10, row)).collect();
        block(&mut grid, &wall);

        let path1 = find_path(&grid, pos(5, 10), pos(15, 10));
        let path2 = find_path(&grid, pos(5, 10), pos(15, 10));
        assert_eq!(path1, path2);
    }

    #[test]
    fn test_manhattan_heuristic() {
        assert_eq!(manhattan_heuristic(pos(0, 0), pos(5, 5)), 10);
        assert_eq!(manhattan_heuristic(pos(3, 7), pos(0, 0)), 10);
        assert_eq!(manhattan_heuristic(pos(5, 5), pos(5, 5)), 0);
    }
}
