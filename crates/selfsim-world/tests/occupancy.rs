//! Integration tests for the occupancy grid under sustained mutation.
//!
//! A seeded random walk of place/remove/move operations is applied to
//! worlds of several sizes; after every step the grid and its reverse
//! index must still agree and no occupant may appear twice.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc,
    clippy::arithmetic_side_effects
)]

use std::collections::BTreeSet;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use selfsim_types::{Coord, Direction, EntityId, Neighborhood, Occupant};
use selfsim_world::{GridChange, MAX_STEP_DISTANCE, RecordingObserver, World, WorldError};

fn random_coord(rng: &mut SmallRng, world: &World) -> Coord {
    let (rows, columns) = world.size();
    Coord::new(rng.random_range(0..rows), rng.random_range(0..columns))
}

fn assert_each_occupant_once(world: &World) {
    let mut ids = BTreeSet::new();
    for (coord, occupant) in world.cells() {
        if let Some(occupant) = occupant {
            assert!(ids.insert(occupant.id), "{occupant} appears twice");
            assert_eq!(world.position_of(occupant.id), Some(coord));
        }
    }
    assert_eq!(ids.len(), world.occupied_count());
}

#[test]
fn invariant_holds_through_random_mutation() {
    for (rows, columns, seed) in [(1, 1, 1), (2, 3, 2), (5, 5, 3), (8, 13, 4)] {
        let mut world = World::new(rows, columns).unwrap();
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut next_id = 1_u64;

        for _ in 0..2_000 {
            match rng.random_range(0..4) {
                0 => {
                    let coord = random_coord(&mut rng, &world);
                    let occupant = if rng.random_bool(0.5) {
                        Occupant::organism(EntityId(next_id))
                    } else {
                        Occupant::food(EntityId(next_id))
                    };
                    if world.place(coord, occupant).is_ok() {
                        next_id += 1;
                    }
                }
                1 => {
                    let coord = random_coord(&mut rng, &world);
                    let _ = world.remove(coord);
                }
                2 => {
                    let from = random_coord(&mut rng, &world);
                    let to = random_coord(&mut rng, &world);
                    let _ = world.move_to(from, to);
                }
                _ => {
                    let from = random_coord(&mut rng, &world);
                    let dir = Direction::ALL[rng.random_range(0..8)];
                    let to = world.topology().neighbor(from, dir);
                    let _ = world.move_to(from, to);
                }
            }
            world.check_invariants().unwrap();
            assert_each_occupant_once(&world);
        }
    }
}

#[test]
fn failed_move_leaves_both_cells_unchanged() {
    let mut world = World::new(4, 4).unwrap();
    let (recorder, log) = RecordingObserver::new();
    let a = Coord::new(0, 0);
    let b = Coord::new(0, 1);
    world.place(a, Occupant::organism(EntityId(1))).unwrap();
    world.place(b, Occupant::food(EntityId(2))).unwrap();
    world.add_observer(Box::new(recorder));

    let before: Vec<_> = world.cells().collect();
    let err = world.move_to(a, b).unwrap_err();
    assert!(matches!(err, WorldError::OccupiedCell { coord, .. } if coord == b));

    let err = world.move_to(Coord::new(3, 3), Coord::new(2, 2)).unwrap_err();
    assert!(matches!(err, WorldError::EmptyCell(_)));

    assert_eq!(world.cells().collect::<Vec<_>>(), before);
    assert!(log.is_empty());
    world.check_invariants().unwrap();
}

#[test]
fn observers_see_each_successful_mutation_once() {
    let mut world = World::new(3, 3).unwrap();
    let (recorder, log) = RecordingObserver::new();
    world.add_observer(Box::new(recorder));
    let cell = Occupant::organism(EntityId(1));

    world.place(Coord::new(1, 1), cell).unwrap();
    world.move_to(Coord::new(1, 1), Coord::new(0, 1)).unwrap();
    let _ = world.place(Coord::new(0, 1), Occupant::food(EntityId(2)));
    world.remove(Coord::new(0, 1));
    world.remove(Coord::new(0, 1));

    let kinds: Vec<_> = log.changes().iter().map(GridChange::kind).collect();
    assert_eq!(kinds, ["placed", "moved", "removed"]);
    assert!(log.changes().iter().all(|c| c.occupant() == cell));
}

fn moore_ring(world: &World, coord: Coord) -> Vec<(Direction, Coord)> {
    world
        .neighbors_of(coord, Neighborhood::Moore)
        .into_iter()
        .map(|n| (n.direction, n.coord))
        .collect()
}

#[test]
fn wraparound_corners_on_five_by_five() {
    let mut world = World::new(5, 5).unwrap();
    let center = Coord::new(2, 2);
    world.place(center, Occupant::organism(EntityId(1))).unwrap();

    assert_eq!(
        moore_ring(&world, Coord::new(0, 0)),
        vec![
            (Direction::North, Coord::new(4, 0)),
            (Direction::NorthEast, Coord::new(4, 1)),
            (Direction::East, Coord::new(0, 1)),
            (Direction::SouthEast, Coord::new(1, 1)),
            (Direction::South, Coord::new(1, 0)),
            (Direction::SouthWest, Coord::new(1, 4)),
            (Direction::West, Coord::new(0, 4)),
            (Direction::NorthWest, Coord::new(4, 4)),
        ]
    );
    assert_eq!(
        moore_ring(&world, Coord::new(4, 4)),
        vec![
            (Direction::North, Coord::new(3, 4)),
            (Direction::NorthEast, Coord::new(3, 0)),
            (Direction::East, Coord::new(4, 0)),
            (Direction::SouthEast, Coord::new(0, 0)),
            (Direction::South, Coord::new(0, 4)),
            (Direction::SouthWest, Coord::new(0, 3)),
            (Direction::West, Coord::new(4, 3)),
            (Direction::NorthWest, Coord::new(3, 3)),
        ]
    );
    // Neither corner ring reaches the occupied center.
    assert!(
        world
            .neighbors_of(Coord::new(0, 0), Neighborhood::Moore)
            .iter()
            .chain(world.neighbors_of(Coord::new(4, 4), Neighborhood::Moore).iter())
            .all(|n| n.occupant.is_none())
    );
    assert_eq!(world.empty_neighbors_of(Coord::new(1, 1), Neighborhood::Moore).len(), 7);

    let topology = world.topology();
    assert_eq!(
        topology
            .destination(center, Direction::North, MAX_STEP_DISTANCE)
            .unwrap(),
        Coord::new(0, 2)
    );
    assert_eq!(
        topology
            .destination(Coord::new(0, 0), Direction::NorthWest, 2)
            .unwrap(),
        Coord::new(3, 3)
    );
    assert!(matches!(
        topology.destination(center, Direction::North, 3),
        Err(WorldError::DistanceOutOfRange { distance: 3, max: 2 })
    ));
    assert!(matches!(
        world
            .topology()
            .destination(Coord::new(4, 4), Direction::SouthEast, MAX_STEP_DISTANCE + 1),
        Err(WorldError::DistanceOutOfRange { .. })
    ));
}
