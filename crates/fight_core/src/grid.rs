//! Grid capability consumed by the engine.
//!
//! The engine treats the battle grid as an external capability: cell
//! occupancy, bounds checks and radius enumeration come in through the
//! [`Grid`] trait. A concrete [`Board`] implementation is provided for
//! tests and the headless runner; hosts may substitute their own.
//!
//! Cell keys pack `(x << 4) | y`, which constrains coordinates to
//! `[0, 15]` per axis. This is a hard structural limit of the engine,
//! not a convenience: every cell-indexed table in the aura pipeline
//! relies on the packed key being bijective.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FightError, Result};
use crate::unit::{Team, UnitId};

/// Largest valid coordinate on either axis.
pub const MAX_CELL_COORD: u8 = 15;

/// A cell on the battle grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct GridCell {
    /// Column, in `[0, 15]`.
    pub x: u8,
    /// Row, in `[0, 15]`.
    pub y: u8,
}

impl GridCell {
    /// Create a cell, validating the packed-key bound.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::CellOutOfBounds`] when either coordinate
    /// exceeds [`MAX_CELL_COORD`].
    pub fn new(x: u32, y: u32) -> Result<Self> {
        if x > u32::from(MAX_CELL_COORD) || y > u32::from(MAX_CELL_COORD) {
            return Err(FightError::CellOutOfBounds { x, y });
        }
        Ok(Self {
            x: x as u8,
            y: y as u8,
        })
    }

    /// Pack the cell into its table key: `(x << 4) | y`.
    ///
    /// Bijective for all in-bounds cells; collisions are only possible
    /// outside the `[0, 15]` bound, which the constructor rejects.
    #[must_use]
    pub const fn key(self) -> u8 {
        (self.x << 4) | self.y
    }

    /// Unpack a cell from its table key.
    #[must_use]
    pub const fn from_key(key: u8) -> Self {
        Self {
            x: key >> 4,
            y: key & 0x0f,
        }
    }

    /// Chebyshev distance to another cell.
    #[must_use]
    pub fn distance(self, other: Self) -> u8 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }
}

/// Grid capability: occupancy, bounds and radius enumeration.
pub trait Grid {
    /// Whether the cell lies on this grid.
    fn contains(&self, cell: GridCell) -> bool;

    /// The unit occupying a cell, if any.
    fn occupant(&self, cell: GridCell) -> Option<&UnitId>;

    /// Mark a cell as occupied by a unit.
    ///
    /// # Errors
    ///
    /// Fails when the cell is off-grid or already held by another unit.
    fn occupy(&mut self, cell: GridCell, unit_id: UnitId) -> Result<()>;

    /// Release every cell held by a unit. Idempotent.
    fn release_unit(&mut self, unit_id: &UnitId);

    /// All in-bounds cells within a Chebyshev radius of `center`,
    /// including `center` itself. A negative radius yields no cells.
    fn cells_within(&self, center: GridCell, range: i32) -> Vec<GridCell>;

    /// Whether a team may place a unit on this cell before the fight
    /// starts.
    fn placement_allows(&self, team: Team, cell: GridCell) -> bool;
}

/// Reference grid implementation: a rectangular board with per-team
/// placement bands at the top (upper team) and bottom (lower team).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    width: u8,
    height: u8,
    placement_depth: u8,
    occupancy: BTreeMap<u8, UnitId>,
}

impl Board {
    /// Create a board. Both dimensions must fit the packed-key bound.
    ///
    /// # Errors
    ///
    /// Returns [`FightError::CellOutOfBounds`] when a dimension exceeds
    /// 16 cells.
    pub fn new(width: u8, height: u8) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_CELL_COORD + 1 || height > MAX_CELL_COORD + 1 {
            return Err(FightError::CellOutOfBounds {
                x: u32::from(width),
                y: u32::from(height),
            });
        }
        Ok(Self {
            width,
            height,
            placement_depth: 2,
            occupancy: BTreeMap::new(),
        })
    }

    /// Board width in cells.
    #[must_use]
    pub const fn width(&self) -> u8 {
        self.width
    }

    /// Board height in cells.
    #[must_use]
    pub const fn height(&self) -> u8 {
        self.height
    }
}

impl Grid for Board {
    fn contains(&self, cell: GridCell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    fn occupant(&self, cell: GridCell) -> Option<&UnitId> {
        self.occupancy.get(&cell.key())
    }

    fn occupy(&mut self, cell: GridCell, unit_id: UnitId) -> Result<()> {
        if !self.contains(cell) {
            return Err(FightError::CellOutOfBounds {
                x: u32::from(cell.x),
                y: u32::from(cell.y),
            });
        }
        match self.occupancy.get(&cell.key()) {
            Some(existing) if *existing != unit_id => Err(FightError::CellOccupied {
                x: cell.x,
                y: cell.y,
            }),
            _ => {
                self.occupancy.insert(cell.key(), unit_id);
                Ok(())
            }
        }
    }

    fn release_unit(&mut self, unit_id: &UnitId) {
        self.occupancy.retain(|_, occupant| occupant != unit_id);
    }

    fn cells_within(&self, center: GridCell, range: i32) -> Vec<GridCell> {
        if range < 0 {
            return Vec::new();
        }
        let range = range.min(i32::from(MAX_CELL_COORD)) as u8;
        let x_min = center.x.saturating_sub(range);
        let x_max = (center.x.saturating_add(range)).min(self.width - 1);
        let y_min = center.y.saturating_sub(range);
        let y_max = (center.y.saturating_add(range)).min(self.height - 1);

        let mut cells = Vec::new();
        for x in x_min..=x_max {
            for y in y_min..=y_max {
                cells.push(GridCell { x, y });
            }
        }
        cells
    }

    fn placement_allows(&self, team: Team, cell: GridCell) -> bool {
        if !self.contains(cell) {
            return false;
        }
        match team {
            Team::Upper => cell.y < self.placement_depth,
            Team::Lower => cell.y >= self.height - self.placement_depth,
            Team::NoTeam => false,
        }
    }
}
