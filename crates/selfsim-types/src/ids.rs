//! Type-safe identifier for everything that can occupy a grid cell.
//!
//! Identities are plain monotonic counters owned by a simulation instance,
//! never process-wide statics, so two simulations running side by side
//! hand out overlapping but independent id sequences.

use serde::{Deserialize, Serialize};

/// Unique identifier for an entity or a non-entity occupant (such as food).
///
/// Identity `0` is reserved for the kernel itself and is used as the sender
/// of messages the scheduler posts on its own behalf. Allocators start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Sender identity for messages originating from the kernel.
    pub const KERNEL: Self = Self(0);

    /// The first identity an allocator hands out.
    pub const FIRST: Self = Self(1);

    /// Return the raw counter value.
    pub const fn into_inner(self) -> u64 {
        self.0
    }

    /// Whether this is the reserved kernel identity.
    pub const fn is_kernel(self) -> bool {
        self.0 == 0
    }

    /// Return the identity following this one, or `None` on overflow.
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}
