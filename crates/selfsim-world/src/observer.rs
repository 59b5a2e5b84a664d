//! Change notifications emitted by the occupancy grid.
//!
//! Every successful placement, removal, or move produces exactly one
//! [`GridChange`], delivered synchronously to each registered
//! [`WorldObserver`] after the grid has been updated. Observers see the
//! world after the mutation and can never veto it.

use std::cell::RefCell;
use std::rc::Rc;

use selfsim_types::{Coord, Occupant};

/// A single mutation of the occupancy grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridChange {
    /// An occupant was placed into an empty cell.
    Placed {
        /// Target cell.
        coord: Coord,
        /// The new occupant.
        occupant: Occupant,
    },
    /// An occupant was removed from a cell.
    Removed {
        /// The now-empty cell.
        coord: Coord,
        /// The former occupant.
        occupant: Occupant,
    },
    /// An occupant moved between cells.
    Moved {
        /// Source cell, now empty.
        from: Coord,
        /// Destination cell.
        to: Coord,
        /// The occupant that moved.
        occupant: Occupant,
    },
}

impl GridChange {
    /// The occupant involved in the change.
    pub const fn occupant(&self) -> Occupant {
        match self {
            Self::Placed { occupant, .. }
            | Self::Removed { occupant, .. }
            | Self::Moved { occupant, .. } => *occupant,
        }
    }

    /// Short name of the change for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::Removed { .. } => "removed",
            Self::Moved { .. } => "moved",
        }
    }
}

/// Receives grid changes as they happen.
pub trait WorldObserver {
    /// Called once per successful grid mutation.
    fn on_change(&mut self, change: &GridChange);
}

/// Shared handle to the changes captured by a [`RecordingObserver`].
#[derive(Debug, Clone, Default)]
pub struct ChangeLog(Rc<RefCell<Vec<GridChange>>>);

impl ChangeLog {
    /// Snapshot of all recorded changes in order.
    pub fn changes(&self) -> Vec<GridChange> {
        self.0.borrow().clone()
    }

    /// Number of recorded changes.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Discard everything recorded so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Observer that appends every change to a shared [`ChangeLog`].
#[derive(Debug, Default)]
pub struct RecordingObserver {
    log: ChangeLog,
}

impl RecordingObserver {
    /// Create an observer and the log handle it writes to.
    pub fn new() -> (Self, ChangeLog) {
        let log = ChangeLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl WorldObserver for RecordingObserver {
    fn on_change(&mut self, change: &GridChange) {
        self.log.0.borrow_mut().push(*change);
    }
}
