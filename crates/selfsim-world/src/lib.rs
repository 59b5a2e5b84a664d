//! Toroidal topology and occupancy grid for the SELF simulation kernel.
//!
//! This crate models the physical world: a fixed-size grid whose edges wrap
//! around, a neighbor table computed once per world size, and the occupancy
//! grid that enforces at most one occupant per cell.
//!
//! # Modules
//!
//! - [`error`] -- Error types for grid operations.
//! - [`topology`] -- [`Topology`], the precomputed 8-way and 4-way neighbor
//!   tables under wraparound.
//! - [`grid`] -- [`World`], the occupancy grid with placement, removal,
//!   movement, neighbor queries, and bounded random search.
//! - [`observer`] -- [`GridChange`] notifications and the
//!   [`WorldObserver`] trait consumed by renderers and diagnostics.
//!
//! [`Topology`]: topology::Topology
//! [`World`]: grid::World
//! [`GridChange`]: observer::GridChange
//! [`WorldObserver`]: observer::WorldObserver

pub mod error;
pub mod grid;
pub mod observer;
pub mod topology;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use grid::{NeighborCell, World};
pub use observer::{ChangeLog, GridChange, RecordingObserver, WorldObserver};
pub use topology::{MAX_STEP_DISTANCE, Topology};
