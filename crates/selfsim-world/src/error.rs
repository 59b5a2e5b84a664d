//! Error types for the `selfsim-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`]. Only
//! [`WorldError::InvariantViolation`] signals kernel corruption; every other
//! variant is an ordinary outcome the caller is expected to handle.

use selfsim_types::{Coord, EntityId, Occupant};

/// Errors that can occur during grid operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The world was asked to have zero rows or zero columns.
    #[error("invalid world dimensions {rows}x{columns}: both must be at least 1")]
    InvalidDimensions {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        columns: usize,
    },

    /// A coordinate lies outside the grid.
    #[error("coordinate {coord} is outside the {rows}x{columns} grid")]
    OutOfBounds {
        /// The offending coordinate.
        coord: Coord,
        /// Grid row count.
        rows: usize,
        /// Grid column count.
        columns: usize,
    },

    /// A placement or move target already holds an occupant.
    #[error("cell {coord} is already occupied by {occupant}")]
    OccupiedCell {
        /// The occupied cell.
        coord: Coord,
        /// Whatever currently sits there.
        occupant: Occupant,
    },

    /// A move was requested from a cell that holds nothing.
    #[error("cell {0} is empty")]
    EmptyCell(Coord),

    /// The occupant is not placed anywhere on the grid.
    #[error("occupant {0} is not on the grid")]
    NotPlaced(EntityId),

    /// Bounded random search gave up.
    #[error("no suitable cell found after {attempts} attempts")]
    NoSuitableCell {
        /// Number of random draws made before giving up.
        attempts: u32,
    },

    /// A multi-step destination was requested beyond the supported range.
    #[error("step distance {distance} exceeds the maximum of {max}")]
    DistanceOutOfRange {
        /// Requested distance.
        distance: usize,
        /// Largest supported distance.
        max: usize,
    },

    /// The occupancy invariant does not hold. Always fatal.
    #[error("occupancy invariant violated: {reason}")]
    InvariantViolation {
        /// Description of the inconsistency.
        reason: String,
    },
}

impl WorldError {
    /// Whether this error indicates kernel corruption rather than a policy
    /// outcome.
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}
