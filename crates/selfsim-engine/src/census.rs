//! Running census of the grid, fed by world change notifications.

use std::cell::Cell;
use std::rc::Rc;

use selfsim_types::OccupantKind;
use selfsim_world::{GridChange, WorldObserver};

/// Occupancy tallies at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CensusCounts {
    /// Organisms currently on the grid.
    pub organisms: usize,
    /// Food cells currently on the grid.
    pub food: usize,
    /// Placements seen since the census started.
    pub placed: u64,
    /// Removals seen since the census started.
    pub removed: u64,
    /// Moves seen since the census started.
    pub moved: u64,
}

impl CensusCounts {
    const fn apply(&mut self, change: &GridChange) {
        let kind = change.occupant().kind;
        match change {
            GridChange::Placed { .. } => {
                self.placed = self.placed.saturating_add(1);
                let slot = self.tally(kind);
                *slot = slot.saturating_add(1);
            }
            GridChange::Removed { .. } => {
                self.removed = self.removed.saturating_add(1);
                let slot = self.tally(kind);
                *slot = slot.saturating_sub(1);
            }
            GridChange::Moved { .. } => {
                self.moved = self.moved.saturating_add(1);
            }
        }
    }

    const fn tally(&mut self, kind: OccupantKind) -> &mut usize {
        match kind {
            OccupantKind::Organism => &mut self.organisms,
            OccupantKind::Food => &mut self.food,
        }
    }
}

/// Read side of a census; cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Census(Rc<Cell<CensusCounts>>);

impl Census {
    /// A census handle and the observer that feeds it.
    pub fn new() -> (Self, CensusObserver) {
        let census = Self::default();
        let observer = CensusObserver(census.clone());
        (census, observer)
    }

    /// Current tallies.
    pub fn counts(&self) -> CensusCounts {
        self.0.get()
    }
}

/// [`WorldObserver`] half of a [`Census`].
#[derive(Debug)]
pub struct CensusObserver(Census);

impl WorldObserver for CensusObserver {
    fn on_change(&mut self, change: &GridChange) {
        let mut counts = self.0.0.get();
        counts.apply(change);
        self.0.0.set(counts);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use selfsim_types::{Coord, EntityId, Occupant};
    use selfsim_world::World;

    use super::*;

    #[test]
    fn tracks_live_counts_by_kind() {
        let mut world = World::new(4, 4).unwrap();
        let (census, observer) = Census::new();
        world.add_observer(Box::new(observer));

        world
            .place(Coord::new(0, 0), Occupant::organism(EntityId(1)))
            .unwrap();
        world
            .place(Coord::new(1, 1), Occupant::food(EntityId(2)))
            .unwrap();
        world
            .place(Coord::new(2, 2), Occupant::food(EntityId(3)))
            .unwrap();
        world.move_to(Coord::new(0, 0), Coord::new(0, 1)).unwrap();
        world.remove(Coord::new(1, 1));
        // Removing an empty cell is not a change.
        world.remove(Coord::new(3, 3));

        let counts = census.counts();
        assert_eq!(counts.organisms, 1);
        assert_eq!(counts.food, 1);
        assert_eq!(counts.placed, 3);
        assert_eq!(counts.removed, 1);
        assert_eq!(counts.moved, 1);
    }
}
