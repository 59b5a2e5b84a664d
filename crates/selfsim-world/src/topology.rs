//! Precomputed neighbor tables for a toroidal grid.
//!
//! For every cell the [`Topology`] stores the coordinates of its eight
//! Moore neighbors and, in a second reduced table, its four orthogonal
//! neighbors. Both tables are built once from the world dimensions and
//! never change afterwards; they know nothing about occupancy.
//!
//! The grid has no edges. Stepping north from row 0 lands on the last row,
//! stepping east from the last column lands on column 0, and every lookup
//! first wraps its input onto the torus, so no neighbor lookup can fail.

use selfsim_types::{Coord, Direction, Neighborhood};

use crate::error::WorldError;

/// Largest distance accepted by [`Topology::destination`].
pub const MAX_STEP_DISTANCE: usize = 2;

/// Immutable 8-way and 4-way neighbor tables, indexed row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Number of rows.
    rows: usize,
    /// Number of columns.
    columns: usize,
    /// Neighbor coordinates per cell, in [`Direction::ALL`] order.
    moore: Vec<[Coord; 8]>,
    /// Orthogonal neighbor coordinates per cell, in [`Direction::ORTHOGONAL`] order.
    von_neumann: Vec<[Coord; 4]>,
}

impl Topology {
    /// Build the neighbor tables for a `rows` x `columns` torus.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either dimension is 0,
    /// or if the cell count does not fit in `usize`.
    pub fn new(rows: usize, columns: usize) -> Result<Self, WorldError> {
        let invalid = WorldError::InvalidDimensions { rows, columns };
        if rows == 0 || columns == 0 {
            return Err(invalid);
        }
        let cell_count = rows.checked_mul(columns).ok_or(invalid)?;

        let mut moore = Vec::with_capacity(cell_count);
        let mut von_neumann = Vec::with_capacity(cell_count);
        for row in 0..rows {
            for col in 0..columns {
                let here = Coord::new(row, col);
                moore.push(Direction::ALL.map(|dir| step(here, dir, rows, columns)));
                von_neumann.push(Direction::ORTHOGONAL.map(|dir| step(here, dir, rows, columns)));
            }
        }

        Ok(Self {
            rows,
            columns,
            moore,
            von_neumann,
        })
    }

    /// Number of rows.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub const fn columns(&self) -> usize {
        self.columns
    }

    /// `(rows, columns)`.
    pub const fn size(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.moore.len()
    }

    /// Whether the coordinate lies inside the grid without wrapping.
    pub const fn contains(&self, coord: Coord) -> bool {
        coord.row < self.rows && coord.col < self.columns
    }

    /// Reduce an arbitrary coordinate onto the torus.
    pub fn wrap(&self, row: usize, col: usize) -> Coord {
        Coord::new(
            row.checked_rem(self.rows).unwrap_or(0),
            col.checked_rem(self.columns).unwrap_or(0),
        )
    }

    /// Row-major offset of an in-bounds coordinate.
    pub fn offset(&self, coord: Coord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        coord
            .row
            .checked_mul(self.columns)
            .and_then(|base| base.checked_add(coord.col))
    }

    /// Coordinate of a row-major offset.
    pub fn coord_at(&self, offset: usize) -> Option<Coord> {
        if offset >= self.cell_count() {
            return None;
        }
        let row = offset.checked_div(self.columns)?;
        let col = offset.checked_rem(self.columns)?;
        Some(Coord::new(row, col))
    }

    /// The neighboring coordinate one step away in `direction`.
    pub fn neighbor(&self, coord: Coord, direction: Direction) -> Coord {
        let here = self.wrap(coord.row, coord.col);
        self.offset(here)
            .and_then(|offset| self.moore.get(offset))
            .and_then(|row| row.get(direction.index()))
            .copied()
            .unwrap_or_else(|| step(here, direction, self.rows, self.columns))
    }

    /// All eight neighbors, clockwise from north.
    pub fn neighbors_of(&self, coord: Coord) -> [(Direction, Coord); 8] {
        let here = self.wrap(coord.row, coord.col);
        let coords = self
            .offset(here)
            .and_then(|offset| self.moore.get(offset))
            .copied()
            .unwrap_or_else(|| Direction::ALL.map(|dir| step(here, dir, self.rows, self.columns)));

        let mut out = [(Direction::North, here); 8];
        for ((slot, dir), neighbor) in out.iter_mut().zip(Direction::ALL).zip(coords) {
            *slot = (dir, neighbor);
        }
        out
    }

    /// The four orthogonal neighbors N, E, S, W.
    pub fn orthogonal_neighbors_of(&self, coord: Coord) -> [(Direction, Coord); 4] {
        let here = self.wrap(coord.row, coord.col);
        let coords = self
            .offset(here)
            .and_then(|offset| self.von_neumann.get(offset))
            .copied()
            .unwrap_or_else(|| {
                Direction::ORTHOGONAL.map(|dir| step(here, dir, self.rows, self.columns))
            });

        let mut out = [(Direction::North, here); 4];
        for ((slot, dir), neighbor) in out.iter_mut().zip(Direction::ORTHOGONAL).zip(coords) {
            *slot = (dir, neighbor);
        }
        out
    }

    /// Neighbors covered by `neighborhood`, clockwise from north.
    pub fn neighbors_in(&self, coord: Coord, neighborhood: Neighborhood) -> Vec<(Direction, Coord)> {
        match neighborhood {
            Neighborhood::Moore => self.neighbors_of(coord).to_vec(),
            Neighborhood::VonNeumann => self.orthogonal_neighbors_of(coord).to_vec(),
        }
    }

    /// The coordinate `distance` steps away in `direction`.
    ///
    /// Distance 0 is the wrapped coordinate itself.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DistanceOutOfRange`] if `distance` exceeds
    /// [`MAX_STEP_DISTANCE`].
    pub fn destination(
        &self,
        coord: Coord,
        direction: Direction,
        distance: usize,
    ) -> Result<Coord, WorldError> {
        if distance > MAX_STEP_DISTANCE {
            return Err(WorldError::DistanceOutOfRange {
                distance,
                max: MAX_STEP_DISTANCE,
            });
        }
        let mut here = self.wrap(coord.row, coord.col);
        for _ in 0..distance {
            here = self.neighbor(here, direction);
        }
        Ok(here)
    }

    /// Every coordinate in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.cell_count()).filter_map(|offset| self.coord_at(offset))
    }
}

/// One wrapped step from an in-bounds coordinate.
fn step(coord: Coord, direction: Direction, rows: usize, columns: usize) -> Coord {
    let (dr, dc) = direction.delta();
    Coord::new(wrap_step(coord.row, dr, rows), wrap_step(coord.col, dc, columns))
}

/// Move `value` by `delta` in `{-1, 0, 1}` within `[0, bound)`, wrapping.
const fn wrap_step(value: usize, delta: i8, bound: usize) -> usize {
    if delta < 0 {
        if value == 0 {
            bound.saturating_sub(1)
        } else {
            value.saturating_sub(1)
        }
    } else if delta > 0 {
        let next = value.saturating_add(1);
        if next >= bound { 0 } else { next }
    } else {
        value
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn zero_dimensions_rejected() {
        assert!(Topology::new(0, 5).is_err());
        assert!(Topology::new(5, 0).is_err());
        assert!(Topology::new(1, 1).is_ok());
    }

    #[test]
    fn interior_neighbors_match_deltas() {
        let topo = Topology::new(60, 60).unwrap();
        let here = Coord::new(30, 30);
        assert_eq!(topo.neighbor(here, Direction::NorthWest), Coord::new(29, 29));
        assert_eq!(topo.neighbor(here, Direction::North), Coord::new(29, 30));
        assert_eq!(topo.neighbor(here, Direction::NorthEast), Coord::new(29, 31));
        assert_eq!(topo.neighbor(here, Direction::West), Coord::new(30, 29));
        assert_eq!(topo.neighbor(here, Direction::East), Coord::new(30, 31));
        assert_eq!(topo.neighbor(here, Direction::SouthWest), Coord::new(31, 29));
        assert_eq!(topo.neighbor(here, Direction::South), Coord::new(31, 30));
        assert_eq!(topo.neighbor(here, Direction::SouthEast), Coord::new(31, 31));
    }

    #[test]
    fn corner_wraps_on_five_by_five() {
        let topo = Topology::new(5, 5).unwrap();
        let origin = Coord::new(0, 0);
        let hood: Vec<_> = topo.neighbors_of(origin).to_vec();
        assert!(hood.contains(&(Direction::North, Coord::new(4, 0))));
        assert!(hood.contains(&(Direction::South, Coord::new(1, 0))));
        assert!(hood.contains(&(Direction::East, Coord::new(0, 1))));
        assert!(hood.contains(&(Direction::West, Coord::new(0, 4))));
        assert!(hood.contains(&(Direction::NorthWest, Coord::new(4, 4))));
        assert!(hood.contains(&(Direction::SouthEast, Coord::new(1, 1))));
    }

    #[test]
    fn every_neighbor_in_range_for_small_sizes() {
        for rows in 1..=4 {
            for columns in 1..=4 {
                let topo = Topology::new(rows, columns).unwrap();
                for here in topo.coords() {
                    for (_, n) in topo.neighbors_of(here) {
                        assert!(topo.contains(n), "{n} escaped {rows}x{columns}");
                    }
                }
            }
        }
    }

    #[test]
    fn eight_distinct_neighbors_from_three_by_three() {
        for (rows, columns) in [(3, 3), (3, 7), (8, 3), (10, 12)] {
            let topo = Topology::new(rows, columns).unwrap();
            for here in topo.coords() {
                let distinct: BTreeSet<_> = topo.neighbors_of(here).iter().map(|(_, c)| *c).collect();
                assert_eq!(distinct.len(), 8);
                assert!(!distinct.contains(&here));
            }
        }
    }

    #[test]
    fn opposite_directions_round_trip() {
        for (rows, columns) in [(1, 1), (1, 3), (2, 2), (5, 5), (4, 9)] {
            let topo = Topology::new(rows, columns).unwrap();
            for here in topo.coords() {
                for dir in Direction::ALL {
                    let there = topo.neighbor(here, dir);
                    assert_eq!(topo.neighbor(there, dir.opposite()), here);
                }
            }
        }
    }

    #[test]
    fn orthogonal_table_is_subset_of_moore() {
        let topo = Topology::new(6, 4).unwrap();
        for here in topo.coords() {
            let moore = topo.neighbors_of(here);
            for pair in topo.orthogonal_neighbors_of(here) {
                assert!(moore.contains(&pair));
            }
        }
    }

    #[test]
    fn destination_steps_the_requested_distance() {
        let topo = Topology::new(5, 5).unwrap();
        let here = Coord::new(0, 0);
        assert_eq!(topo.destination(here, Direction::North, 0).unwrap(), here);
        assert_eq!(topo.destination(here, Direction::North, 1).unwrap(), Coord::new(4, 0));
        assert_eq!(topo.destination(here, Direction::North, 2).unwrap(), Coord::new(3, 0));
        assert_eq!(topo.destination(here, Direction::SouthEast, 2).unwrap(), Coord::new(2, 2));
        assert!(matches!(
            topo.destination(here, Direction::East, 3),
            Err(WorldError::DistanceOutOfRange { distance: 3, .. })
        ));
    }

    #[test]
    fn lookups_wrap_out_of_range_input() {
        let topo = Topology::new(5, 5).unwrap();
        assert_eq!(topo.wrap(7, 12), Coord::new(2, 2));
        assert_eq!(topo.neighbor(Coord::new(5, 5), Direction::East), Coord::new(0, 1));
    }

    #[test]
    fn offsets_round_trip() {
        let topo = Topology::new(3, 4).unwrap();
        for (offset, coord) in topo.coords().enumerate() {
            assert_eq!(topo.offset(coord), Some(offset));
            assert_eq!(topo.coord_at(offset), Some(coord));
        }
        assert_eq!(topo.offset(Coord::new(3, 0)), None);
        assert_eq!(topo.coord_at(12), None);
    }
}
