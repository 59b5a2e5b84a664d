//! Occupant handles stored in the world grid.
//!
//! A grid cell never holds an entity itself, only a small `Copy` handle
//! naming it. The handle carries an explicit [`OccupantKind`] so renderers
//! and behaviors classify what they see by tag instead of inspecting types.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// The closed set of things that can sit in a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupantKind {
    /// A scheduled entity that ticks every round.
    Organism,
    /// A passive, edible occupant such as a plant cell. Never ticked itself.
    Food,
}

impl OccupantKind {
    /// Whether occupants of this kind are scheduled entities.
    pub const fn is_organism(self) -> bool {
        matches!(self, Self::Organism)
    }

    /// Whether occupants of this kind can be eaten.
    pub const fn is_edible(self) -> bool {
        matches!(self, Self::Food)
    }
}

impl fmt::Display for OccupantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organism => f.write_str("organism"),
            Self::Food => f.write_str("food"),
        }
    }
}

/// Handle to whatever occupies a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occupant {
    /// Identity of the occupant.
    pub id: EntityId,
    /// Kind tag used for classification.
    pub kind: OccupantKind,
}

impl Occupant {
    /// Create a handle with an explicit kind.
    pub const fn new(id: EntityId, kind: OccupantKind) -> Self {
        Self { id, kind }
    }

    /// Handle for a scheduled entity.
    pub const fn organism(id: EntityId) -> Self {
        Self::new(id, OccupantKind::Organism)
    }

    /// Handle for a food occupant.
    pub const fn food(id: EntityId) -> Self {
        Self::new(id, OccupantKind::Food)
    }

    /// Whether this handle has the given kind.
    pub fn is(&self, kind: OccupantKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
