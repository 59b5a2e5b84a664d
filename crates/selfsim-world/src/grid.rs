//! The occupancy grid.
//!
//! [`World`] maps every coordinate of a [`Topology`] to at most one
//! [`Occupant`] and keeps a reverse index from occupant id to coordinate,
//! so an occupant can never appear in two cells. All mutations validate
//! first and mutate second: an operation that returns an error leaves the
//! grid exactly as it was.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use selfsim_types::{Coord, Direction, EntityId, Neighborhood, Occupant, OccupantKind};
use tracing::debug;

use crate::error::WorldError;
use crate::observer::{GridChange, WorldObserver};
use crate::topology::Topology;

/// One neighbor of a queried cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborCell {
    /// Direction from the queried cell.
    pub direction: Direction,
    /// Coordinate of the neighbor.
    pub coord: Coord,
    /// What occupies the neighbor, if anything.
    pub occupant: Option<Occupant>,
}

/// Toroidal occupancy grid with change notifications.
pub struct World {
    topology: Topology,
    /// One slot per cell, row-major.
    cells: Vec<Option<Occupant>>,
    /// Reverse index: where each placed occupant lives.
    index: BTreeMap<EntityId, Coord>,
    observers: Vec<Box<dyn WorldObserver>>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("rows", &self.topology.rows())
            .field("columns", &self.topology.columns())
            .field("occupied", &self.index.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Create an empty world of the given dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either dimension is 0.
    pub fn new(rows: usize, columns: usize) -> Result<Self, WorldError> {
        let topology = Topology::new(rows, columns)?;
        let cells = vec![None; topology.cell_count()];
        debug!(rows, columns, "world created");
        Ok(Self {
            topology,
            cells,
            index: BTreeMap::new(),
            observers: Vec::new(),
        })
    }

    /// The neighbor tables for this world.
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// `(rows, columns)`.
    pub const fn size(&self) -> (usize, usize) {
        self.topology.size()
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.index.len()
    }

    /// Register an observer notified after every successful mutation.
    pub fn add_observer(&mut self, observer: Box<dyn WorldObserver>) {
        self.observers.push(observer);
    }

    /// Put an occupant into an empty cell.
    ///
    /// # Errors
    ///
    /// - [`WorldError::OutOfBounds`] if `coord` is outside the grid.
    /// - [`WorldError::OccupiedCell`] if the cell already holds something.
    /// - [`WorldError::InvariantViolation`] if the occupant is already
    ///   placed elsewhere.
    pub fn place(&mut self, coord: Coord, occupant: Occupant) -> Result<(), WorldError> {
        let offset = self.offset_of(coord)?;
        if let Some(existing) = self.cells.get(offset).copied().flatten() {
            return Err(WorldError::OccupiedCell {
                coord,
                occupant: existing,
            });
        }
        if let Some(elsewhere) = self.index.get(&occupant.id) {
            return Err(WorldError::InvariantViolation {
                reason: format!("{occupant} is already placed at {elsewhere}"),
            });
        }

        self.set_cell(offset, Some(occupant))?;
        self.index.insert(occupant.id, coord);
        self.notify(&GridChange::Placed { coord, occupant });
        Ok(())
    }

    /// Clear a cell, returning its former occupant.
    ///
    /// Removing from an empty or out-of-bounds cell returns `None` and
    /// emits no change.
    pub fn remove(&mut self, coord: Coord) -> Option<Occupant> {
        let offset = self.topology.offset(coord)?;
        let occupant = self.cells.get_mut(offset)?.take()?;
        self.index.remove(&occupant.id);
        self.notify(&GridChange::Removed { coord, occupant });
        Some(occupant)
    }

    /// Clear whatever cell `id` occupies, returning that coordinate.
    pub fn remove_occupant(&mut self, id: EntityId) -> Option<Coord> {
        let coord = self.position_of(id)?;
        self.remove(coord).map(|_| coord)
    }

    /// Move the occupant of `old` into the empty cell `new`.
    ///
    /// # Errors
    ///
    /// - [`WorldError::OutOfBounds`] if either coordinate is outside the grid.
    /// - [`WorldError::OccupiedCell`] if `new` holds something, including
    ///   when `new == old`.
    /// - [`WorldError::EmptyCell`] if `old` holds nothing.
    pub fn move_to(&mut self, old: Coord, new: Coord) -> Result<(), WorldError> {
        let from = self.offset_of(old)?;
        let to = self.offset_of(new)?;
        if let Some(existing) = self.cells.get(to).copied().flatten() {
            return Err(WorldError::OccupiedCell {
                coord: new,
                occupant: existing,
            });
        }
        let occupant = self
            .cells
            .get(from)
            .copied()
            .flatten()
            .ok_or(WorldError::EmptyCell(old))?;

        self.set_cell(from, None)?;
        self.set_cell(to, Some(occupant))?;
        self.index.insert(occupant.id, new);
        self.notify(&GridChange::Moved {
            from: old,
            to: new,
            occupant,
        });
        Ok(())
    }

    /// Move a placed occupant into the empty cell `to`, returning where it
    /// came from.
    ///
    /// # Errors
    ///
    /// [`WorldError::NotPlaced`] if `id` is not on the grid, otherwise as
    /// [`World::move_to`].
    pub fn move_occupant(&mut self, id: EntityId, to: Coord) -> Result<Coord, WorldError> {
        let from = self.position_of(id).ok_or(WorldError::NotPlaced(id))?;
        self.move_to(from, to)?;
        Ok(from)
    }

    /// What occupies `coord`, if anything.
    pub fn occupant_at(&self, coord: Coord) -> Option<Occupant> {
        let offset = self.topology.offset(coord)?;
        self.cells.get(offset).copied().flatten()
    }

    /// Whether `coord` is inside the grid and empty.
    pub fn is_empty(&self, coord: Coord) -> bool {
        self.topology.contains(coord) && self.occupant_at(coord).is_none()
    }

    /// Where `id` is placed, if anywhere.
    pub fn position_of(&self, id: EntityId) -> Option<Coord> {
        self.index.get(&id).copied()
    }

    /// The neighbors of `coord` in the given neighborhood, clockwise from
    /// north, with their occupants.
    pub fn neighbors_of(&self, coord: Coord, neighborhood: Neighborhood) -> Vec<NeighborCell> {
        self.neighbors_in(coord, neighborhood.directions())
    }

    /// The neighbors of `coord` in the listed directions, in list order.
    pub fn neighbors_in(&self, coord: Coord, directions: &[Direction]) -> Vec<NeighborCell> {
        directions
            .iter()
            .map(|&direction| {
                let neighbor = self.topology.neighbor(coord, direction);
                NeighborCell {
                    direction,
                    coord: neighbor,
                    occupant: self.occupant_at(neighbor),
                }
            })
            .collect()
    }

    /// Occupied neighbors whose occupant satisfies `predicate`.
    pub fn neighbors_matching(
        &self,
        coord: Coord,
        neighborhood: Neighborhood,
        predicate: impl Fn(&Occupant) -> bool,
    ) -> Vec<NeighborCell> {
        self.neighbors_of(coord, neighborhood)
            .into_iter()
            .filter(|cell| cell.occupant.as_ref().is_some_and(&predicate))
            .collect()
    }

    /// Occupied neighbors of the given kind.
    pub fn neighbors_of_kind(
        &self,
        coord: Coord,
        neighborhood: Neighborhood,
        kind: OccupantKind,
    ) -> Vec<NeighborCell> {
        self.neighbors_matching(coord, neighborhood, |occupant| occupant.is(kind))
    }

    /// Coordinates of the empty neighbors of `coord`.
    pub fn empty_neighbors_of(&self, coord: Coord, neighborhood: Neighborhood) -> Vec<Coord> {
        self.neighbors_of(coord, neighborhood)
            .into_iter()
            .filter(|cell| cell.occupant.is_none())
            .map(|cell| cell.coord)
            .collect()
    }

    /// Occupant of the cell one step from `coord` in `direction`.
    pub fn neighbor_occupant(&self, coord: Coord, direction: Direction) -> Option<Occupant> {
        self.occupant_at(self.topology.neighbor(coord, direction))
    }

    /// Draw uniformly random coordinates until one satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NoSuitableCell`] after `max_attempts` failed
    /// draws.
    pub fn random_cell(
        &self,
        rng: &mut impl Rng,
        predicate: impl Fn(Coord, Option<Occupant>) -> bool,
        max_attempts: u32,
    ) -> Result<Coord, WorldError> {
        let (rows, columns) = self.size();
        for _ in 0..max_attempts {
            let coord = Coord::new(rng.random_range(0..rows), rng.random_range(0..columns));
            if predicate(coord, self.occupant_at(coord)) {
                return Ok(coord);
            }
        }
        Err(WorldError::NoSuitableCell {
            attempts: max_attempts,
        })
    }

    /// A random empty cell.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NoSuitableCell`] after `max_attempts` failed
    /// draws.
    pub fn random_empty_cell(
        &self,
        rng: &mut impl Rng,
        max_attempts: u32,
    ) -> Result<Coord, WorldError> {
        self.random_cell(rng, |_, occupant| occupant.is_none(), max_attempts)
    }

    /// A random cell holding an occupant of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NoSuitableCell`] after `max_attempts` failed
    /// draws.
    pub fn random_cell_of_kind(
        &self,
        rng: &mut impl Rng,
        kind: OccupantKind,
        max_attempts: u32,
    ) -> Result<Coord, WorldError> {
        self.random_cell(
            rng,
            |_, occupant| occupant.is_some_and(|o| o.is(kind)),
            max_attempts,
        )
    }

    /// Place `occupant` into a random empty cell, returning that cell.
    ///
    /// # Errors
    ///
    /// [`WorldError::NoSuitableCell`] if no empty cell was drawn, otherwise
    /// as [`World::place`].
    pub fn place_at_random(
        &mut self,
        occupant: Occupant,
        rng: &mut impl Rng,
        max_attempts: u32,
    ) -> Result<Coord, WorldError> {
        let coord = self.random_empty_cell(rng, max_attempts)?;
        self.place(coord, occupant)?;
        Ok(coord)
    }

    /// Every cell with its occupant, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Coord, Option<Occupant>)> + '_ {
        self.topology.coords().zip(self.cells.iter().copied())
    }

    /// Verify that the grid and the reverse index agree.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvariantViolation`] describing the first
    /// discrepancy found.
    pub fn check_invariants(&self) -> Result<(), WorldError> {
        let mut seen = 0_usize;
        for (coord, occupant) in self.cells() {
            let Some(occupant) = occupant else { continue };
            seen = seen.saturating_add(1);
            match self.index.get(&occupant.id) {
                Some(&indexed) if indexed == coord => {}
                Some(&indexed) => {
                    return Err(WorldError::InvariantViolation {
                        reason: format!("{occupant} found at {coord} but indexed at {indexed}"),
                    });
                }
                None => {
                    return Err(WorldError::InvariantViolation {
                        reason: format!("{occupant} found at {coord} but missing from index"),
                    });
                }
            }
        }
        if seen != self.index.len() {
            return Err(WorldError::InvariantViolation {
                reason: format!(
                    "{seen} occupied cells but {} indexed occupants",
                    self.index.len()
                ),
            });
        }
        Ok(())
    }

    fn offset_of(&self, coord: Coord) -> Result<usize, WorldError> {
        self.topology
            .offset(coord)
            .ok_or_else(|| WorldError::OutOfBounds {
                coord,
                rows: self.topology.rows(),
                columns: self.topology.columns(),
            })
    }

    fn set_cell(&mut self, offset: usize, value: Option<Occupant>) -> Result<(), WorldError> {
        let slot = self
            .cells
            .get_mut(offset)
            .ok_or_else(|| WorldError::InvariantViolation {
                reason: format!("cell offset {offset} outside storage"),
            })?;
        *slot = value;
        Ok(())
    }

    fn notify(&mut self, change: &GridChange) {
        for observer in &mut self.observers {
            observer.on_change(change);
        }
    }
}
