//! Shared value types for the SELF simulation kernel.
//!
//! Every crate in the workspace speaks in these types: identities handed
//! out by the scheduler, grid coordinates and compass directions used by
//! the topology table, and the occupant handles stored in the world grid.
//!
//! # Modules
//!
//! - [`ids`] -- Monotonic identity newtype for entities and other occupants
//! - [`grid`] -- Coordinates, compass directions, and neighborhoods
//! - [`occupant`] -- Occupant handles carrying an explicit kind tag

pub mod grid;
pub mod ids;
pub mod occupant;

// Re-export all public types at crate root for convenience.
pub use grid::{Coord, Direction, Neighborhood, ParseDirectionError};
pub use ids::EntityId;
pub use occupant::{Occupant, OccupantKind};
