//! Uniform-cell broad phase over body centres.
//!
//! Cells are squares of width `1 / fineness` keyed by integer coordinates,
//! so the unbounded y axis costs nothing for empty space. A body is filed
//! under the cell containing its centre of mass; queries search a square
//! block of `2·reach + 1` cells per side, where `reach` grows with the
//! largest body extent seen so far. Two bodies whose cells are further than
//! `reach` apart are separated by at least [`SpatialGrid::margin`].

use std::collections::HashMap;

use crate::core::geometry::Vec2;
use crate::error::{Error, Result};

type CellKey = (i64, i64);

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    fineness: u32,
    cell_width: f64,
    reach: i64,
    max_extent: f64,
    cells: HashMap<CellKey, Vec<usize>>,
    /// Cell of each body, indexed by body slot.
    members: Vec<CellKey>,
}

impl SpatialGrid {
    /// Create an empty grid with cell width `1 / fineness`.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `fineness` is zero.
    pub fn new(fineness: u32) -> Result<Self> {
        if fineness == 0 {
            return Err(Error::InvalidParam("grid fineness must be >= 1".into()));
        }
        Ok(Self {
            fineness,
            cell_width: 1.0 / f64::from(fineness),
            reach: 1,
            max_extent: 0.0,
            cells: HashMap::new(),
            members: Vec::new(),
        })
    }

    /// Cells across the unit width.
    pub fn fineness(&self) -> u32 {
        self.fineness
    }

    /// Side of one square cell, `1 / fineness`.
    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    /// Neighbourhood half-width in cells (1 means the 3×3 block).
    pub fn reach(&self) -> i64 {
        self.reach
    }

    /// Number of bodies filed in the grid.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when no body is filed.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of occupied cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Minimum gap between any two bodies that a query does not pair up.
    pub fn margin(&self) -> f64 {
        self.reach as f64 * self.cell_width - 2.0 * self.max_extent
    }

    /// Widen the search neighbourhood so bodies of `extent` (max distance
    /// from centre to sub-sphere surface) are never missed.
    pub fn ensure_extent(&mut self, extent: f64) {
        if extent <= self.max_extent {
            return;
        }
        self.reach = self.reach_for(extent);
        self.max_extent = extent;
    }

    /// Reach the grid would have after `ensure_extent(extent)`.
    fn reach_for(&self, extent: f64) -> i64 {
        if extent <= self.max_extent {
            return self.reach;
        }
        let cells = (2.0 * extent / self.cell_width).ceil() as i64;
        (cells + 1).max(1)
    }

    /// Integer cell coordinates containing `pos`.
    pub fn cell_of(&self, pos: &Vec2) -> CellKey {
        (
            (pos[0] / self.cell_width).floor() as i64,
            (pos[1] / self.cell_width).floor() as i64,
        )
    }

    /// File a new body. Slots must be inserted in order.
    pub fn insert(&mut self, slot: usize, pos: &Vec2) {
        debug_assert_eq!(slot, self.members.len(), "grid slots must be dense");
        let key = self.cell_of(pos);
        self.cells.entry(key).or_default().push(slot);
        self.members.push(key);
    }

    /// Reassign every body to the cell of its current centre.
    pub fn rebuild<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = Vec2>,
    {
        self.cells.clear();
        self.members.clear();
        for (slot, pos) in positions.into_iter().enumerate() {
            self.insert(slot, &pos);
        }
    }

    /// Sorted slots of all bodies filed within `reach` cells of `pos`.
    pub fn neighbors(&self, pos: &Vec2) -> Vec<usize> {
        self.neighbors_of_cell(self.cell_of(pos), self.reach)
    }

    /// Like [`neighbors`](Self::neighbors), but searched wide enough for a
    /// body of `extent` that is not filed yet. The grid itself is unchanged.
    pub fn neighbors_for_extent(&self, pos: &Vec2, extent: f64) -> Vec<usize> {
        self.neighbors_of_cell(self.cell_of(pos), self.reach_for(extent))
    }

    /// Every slot pair (i, j), i < j, whose cells lie within `reach` of each other,
    /// in ascending order.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, &key) in self.members.iter().enumerate() {
            pairs.extend(
                self.neighbors_of_cell(key, self.reach)
                    .into_iter()
                    .filter(|&j| j > i)
                    .map(|j| (i, j)),
            );
        }
        pairs
    }

    fn neighbors_of_cell(&self, (cx, cy): CellKey, r: i64) -> Vec<usize> {
        let block = (2 * r + 1).saturating_mul(2 * r + 1);
        let mut out = Vec::new();
        if block as usize > self.cells.len() {
            // Sparse grid: cheaper to scan occupied cells than the whole block.
            for (&(kx, ky), slots) in &self.cells {
                if (kx - cx).abs() <= r && (ky - cy).abs() <= r {
                    out.extend_from_slice(slots);
                }
            }
        } else {
            for dx in -r..=r {
                for dy in -r..=r {
                    if let Some(slots) = self.cells.get(&(cx + dx, cy + dy)) {
                        out.extend_from_slice(slots);
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }
}
