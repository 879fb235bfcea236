//! Board state: cell occupancy, zone ownership and movement reservations.
//!
//! The grid is the only shared mutable resource during a battle. It owns
//! the concurrency contract for movement: a unit that starts an animated
//! step into a neighbouring cell reserves that cell first, and no second
//! unit can claim it until the reservation is released. The grid enforces
//! this itself; callers cannot mark a reserved or occupied cell available.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlacementError;
use crate::math::{Fixed, Vec2Fixed};
use crate::unit::UnitId;

/// One of the two players in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Player {
    /// Owns the bottom half of the board.
    One,
    /// Owns the top half of the board.
    Two,
}

impl Player {
    /// Both players, in index order.
    pub const ALL: [Self; 2] = [Self::One, Self::Two];

    /// The opposing player.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Zero-based index, for per-player arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "player 1"),
            Self::Two => write!(f, "player 2"),
        }
    }
}

/// Cell coordinates on the board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GridPos {
    /// Column, left to right.
    pub col: u32,
    /// Row, top to bottom.
    pub row: u32,
}

impl GridPos {
    /// Create a new grid position.
    #[must_use]
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }

    /// Manhattan distance (4-directional steps).
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }

    /// Chebyshev distance (8-directional steps).
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.col.abs_diff(other.col).max(self.row.abs_diff(other.row))
    }

    /// Squared Euclidean distance, for comparisons without square roots.
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> u64 {
        let dc = self.col.abs_diff(other.col) as u64;
        let dr = self.row.abs_diff(other.row) as u64;
        dc * dc + dr * dr
    }

    /// Offset by a signed delta. Returns `None` if either coordinate
    /// would become negative; the upper bound is the grid's business.
    #[must_use]
    pub fn offset(self, dcol: i32, drow: i32) -> Option<Self> {
        let col = i64::from(self.col) + i64::from(dcol);
        let row = i64::from(self.row) + i64::from(drow);
        if col < 0 || row < 0 || col > i64::from(u32::MAX) || row > i64::from(u32::MAX) {
            return None;
        }
        Some(Self::new(col as u32, row as u32))
    }

    /// One step toward `goal` along the axis with the larger remaining gap.
    ///
    /// Rows win ties. Returns `self` if already at `goal`.
    #[must_use]
    pub fn step_toward(self, goal: Self) -> Self {
        let dcol = self.col.abs_diff(goal.col);
        let drow = self.row.abs_diff(goal.row);
        if dcol == 0 && drow == 0 {
            return self;
        }
        if drow >= dcol {
            let row = if goal.row > self.row {
                self.row + 1
            } else {
                self.row - 1
            };
            Self::new(self.col, row)
        } else {
            let col = if goal.col > self.col {
                self.col + 1
            } else {
                self.col - 1
            };
            Self::new(col, self.row)
        }
    }
}

impl From<GridPos> for Vec2Fixed {
    fn from(pos: GridPos) -> Self {
        Self::new(Fixed::from_num(pos.col), Fixed::from_num(pos.row))
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// A single board square.
///
/// Occupancy is derived from the unit reference, so the "occupied" flag and
/// the occupant can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pos: GridPos,
    owner: Player,
    unit: Option<UnitId>,
    reserved_by: Option<UnitId>,
}

impl Cell {
    /// Cell coordinates.
    #[must_use]
    pub const fn pos(&self) -> GridPos {
        self.pos
    }

    /// Zone owner.
    #[must_use]
    pub const fn owner(&self) -> Player {
        self.owner
    }

    /// The unit physically standing here.
    #[must_use]
    pub const fn unit(&self) -> Option<UnitId> {
        self.unit
    }

    /// Whether a unit physically stands here.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.unit.is_some()
    }

    /// The unit that has claimed this cell as its next step.
    #[must_use]
    pub const fn reserved_by(&self) -> Option<UnitId> {
        self.reserved_by
    }
}

/// Fixed-size board of cells stored in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cols: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty board.
    ///
    /// # Panics
    ///
    /// Panics if `cols` or `rows` is zero.
    #[must_use]
    pub fn new(cols: u32, rows: u32) -> Self {
        assert!(cols > 0, "Grid must have at least one column");
        assert!(rows > 0, "Grid must have at least one row");

        let mut cells = Vec::with_capacity((cols as usize) * (rows as usize));
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Cell {
                    pos: GridPos::new(col, row),
                    owner: owner_for_row(row, rows),
                    unit: None,
                    reserved_by: None,
                });
            }
        }

        Self { cols, rows, cells }
    }

    /// Board width in cells.
    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    /// Board height in cells.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    #[inline]
    fn index(&self, pos: GridPos) -> Option<usize> {
        if self.is_valid_cell(pos) {
            Some((pos.row as usize) * (self.cols as usize) + (pos.col as usize))
        } else {
            None
        }
    }

    /// Bounds check.
    #[must_use]
    pub const fn is_valid_cell(&self, pos: GridPos) -> bool {
        pos.col < self.cols && pos.row < self.rows
    }

    /// Look up a cell. Returns `None` if out of bounds.
    #[must_use]
    pub fn cell(&self, pos: GridPos) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Zone owner of a row. The top half belongs to player two, the rest
    /// (including the middle row of an odd-height board) to player one.
    #[must_use]
    pub const fn owner_of_row(&self, row: u32) -> Player {
        owner_for_row(row, self.rows)
    }

    /// The unit standing on a cell.
    #[must_use]
    pub fn unit_at(&self, pos: GridPos) -> Option<UnitId> {
        self.cell(pos).and_then(Cell::unit)
    }

    /// Whether a cell holds a unit. Out-of-bounds cells count as occupied.
    #[must_use]
    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.cell(pos).map_or(true, Cell::is_occupied)
    }

    /// Setup-phase placement check: in bounds, empty, and in `player`'s zone.
    #[must_use]
    pub fn can_place_unit(&self, pos: GridPos, player: Player) -> bool {
        self.check_placement(pos, player).is_ok()
    }

    /// Same as [`can_place_unit`](Self::can_place_unit), reporting why not.
    pub fn check_placement(&self, pos: GridPos, player: Player) -> Result<(), PlacementError> {
        let cell = self.cell(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        if cell.is_occupied() {
            return Err(PlacementError::Occupied(pos));
        }
        if cell.owner != player {
            return Err(PlacementError::WrongOwner(pos));
        }
        Ok(())
    }

    /// Put a unit on a cell. Fails without side effects if the cell is out
    /// of bounds or occupied. Ownership is not checked here.
    pub fn place_unit(&mut self, pos: GridPos, unit: UnitId) -> Result<(), PlacementError> {
        let index = self.index(pos).ok_or(PlacementError::OutOfBounds(pos))?;
        let cell = &mut self.cells[index];
        if cell.is_occupied() {
            return Err(PlacementError::Occupied(pos));
        }
        cell.unit = Some(unit);
        Ok(())
    }

    /// Clear a cell, returning the unit that stood there.
    pub fn remove_unit(&mut self, pos: GridPos) -> Option<UnitId> {
        let index = self.index(pos)?;
        self.cells[index].unit.take()
    }

    /// Atomically relocate `unit` from `from` to `to`.
    ///
    /// Fails if `unit` is not at `from`, or if `to` is out of bounds,
    /// occupied, or reserved by another unit. On failure nothing changes.
    pub fn move_unit(&mut self, from: GridPos, to: GridPos, unit: UnitId) -> bool {
        let (Some(src), Some(dst)) = (self.index(from), self.index(to)) else {
            return false;
        };
        if src == dst || self.cells[src].unit != Some(unit) {
            return false;
        }
        let target = &self.cells[dst];
        if target.is_occupied() || target.reserved_by.is_some_and(|r| r != unit) {
            return false;
        }

        self.cells[src].unit = None;
        let target = &mut self.cells[dst];
        target.unit = Some(unit);
        if target.reserved_by == Some(unit) {
            target.reserved_by = None;
        }
        true
    }

    /// Claim `pos` as `unit`'s next destination.
    ///
    /// At most one claim per cell succeeds until it is released.
    pub fn reserve_cell(&mut self, pos: GridPos, unit: UnitId) -> bool {
        let Some(index) = self.index(pos) else {
            return false;
        };
        let cell = &mut self.cells[index];
        if cell.is_occupied() || cell.reserved_by.is_some() {
            return false;
        }
        cell.reserved_by = Some(unit);
        true
    }

    /// Release `unit`'s claim on `pos`. Returns `false` if `unit` did not
    /// hold it, in which case any other holder's claim is left in place.
    pub fn free_reservation(&mut self, pos: GridPos, unit: UnitId) -> bool {
        let Some(index) = self.index(pos) else {
            return false;
        };
        let cell = &mut self.cells[index];
        if cell.reserved_by == Some(unit) {
            cell.reserved_by = None;
            true
        } else {
            false
        }
    }

    /// A cell is available if it is in bounds, empty and unreserved.
    #[must_use]
    pub fn is_cell_available(&self, pos: GridPos) -> bool {
        self.cell(pos)
            .is_some_and(|c| !c.is_occupied() && c.reserved_by.is_none())
    }

    /// Finish an animated step: free `from`, occupy `to`, drop the claim on
    /// `to`. Requires `unit` to stand on `from` and hold the claim on `to`.
    pub fn complete_move(&mut self, from: GridPos, to: GridPos, unit: UnitId) -> bool {
        let holds_claim = self.cell(to).is_some_and(|c| c.reserved_by == Some(unit));
        holds_claim && self.move_unit(from, to, unit)
    }

    /// Remove every trace of `unit` from the board: its occupancy at `pos`
    /// and any reservation it holds. Used when a unit dies.
    pub fn release_unit(&mut self, pos: GridPos, unit: UnitId) {
        if let Some(index) = self.index(pos) {
            if self.cells[index].unit == Some(unit) {
                self.cells[index].unit = None;
            }
        }
        for cell in &mut self.cells {
            if cell.reserved_by == Some(unit) {
                cell.reserved_by = None;
            }
        }
    }

    /// Units on the board in row-major scan order.
    ///
    /// The result is a snapshot: each unit appears at most once.
    #[must_use]
    pub fn all_units(&self) -> Vec<UnitId> {
        self.cells.iter().filter_map(Cell::unit).collect()
    }

    /// In-bounds cells in the 8-neighbourhood of `pos`, row-major order.
    #[must_use]
    pub fn neighbors8(&self, pos: GridPos) -> Vec<GridPos> {
        let mut out = Vec::with_capacity(8);
        for drow in -1..=1 {
            for dcol in -1..=1 {
                if dcol == 0 && drow == 0 {
                    continue;
                }
                if let Some(p) = pos.offset(dcol, drow) {
                    if self.is_valid_cell(p) {
                        out.push(p);
                    }
                }
            }
        }
        out
    }
}

const fn owner_for_row(row: u32, rows: u32) -> Player {
    if row < rows / 2 {
        Player::Two
    } else {
        Player::One
    }
}
