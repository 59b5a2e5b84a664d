//! Species lineage of the cell population.
//!
//! Cells sharing a genome form a species. A daughter whose mutated genome
//! matches no species seen so far founds a new one, descended from her
//! parent's species. Every member's birth and death rounds are kept, so
//! the population of any species can be asked for at any past round.
//!
//! The [`LineageTracker`] entity builds the tree from the [`CELL_BORN`] and
//! [`CELL_DIED`] topics; callers read it through the [`Lineage`] handle.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use selfsim_core::{Context, Entity, EntityError};
use selfsim_events::{HandlerError, Message};
use selfsim_types::EntityId;
use serde_json::Value;
use tracing::debug;

use crate::ecology::{CELL_BORN, CELL_DIED};

/// Errors updating the lineage tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineageError {
    /// A death was reported for a cell whose birth was never recorded.
    #[error("no recorded birth for {0}")]
    UnknownEntity(EntityId),

    /// A second birth was reported for the same cell.
    #[error("{0} was already born")]
    AlreadyBorn(EntityId),

    /// A second death was reported for the same cell.
    #[error("{entity} already died in round {round}")]
    AlreadyDead {
        /// The cell.
        entity: EntityId,
        /// Round of the first recorded death.
        round: u64,
    },
}

/// Sequential species identity, starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpeciesId(pub u64);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "species-{}", self.0)
    }
}

/// Lifetime of one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// Round the member joined.
    pub birth: u64,
    /// Round the member was dropped, if it has been.
    pub death: Option<u64>,
}

impl Member {
    /// Alive at `round`: born at or before it and not yet dead.
    pub fn alive_at(self, round: u64) -> bool {
        self.birth <= round && self.death.is_none_or(|death| round < death)
    }
}

/// One species: a genome and every cell that carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    id: SpeciesId,
    genome: String,
    parent: Option<SpeciesId>,
    first_birth: u64,
    last_death: Option<u64>,
    members: BTreeMap<EntityId, Member>,
}

impl Species {
    /// This species' id.
    pub const fn id(&self) -> SpeciesId {
        self.id
    }

    /// The genome every member carries.
    pub fn genome(&self) -> &str {
        &self.genome
    }

    /// Species the founder's parent belonged to. `None` for founders.
    pub const fn parent(&self) -> Option<SpeciesId> {
        self.parent
    }

    /// Round the first member was born.
    pub const fn first_birth(&self) -> u64 {
        self.first_birth
    }

    /// Round the most recent member died.
    pub const fn last_death(&self) -> Option<u64> {
        self.last_death
    }

    /// Members alive at `round`.
    pub fn members_alive_at(&self, round: u64) -> usize {
        self.members.values().filter(|m| m.alive_at(round)).count()
    }

    /// Members that have not died.
    pub fn living(&self) -> usize {
        self.members.values().filter(|m| m.death.is_none()).count()
    }

    /// Every member ever recorded.
    pub fn total_members(&self) -> usize {
        self.members.len()
    }
}

/// All species seen during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesTree {
    species: BTreeMap<SpeciesId, Species>,
    by_genome: BTreeMap<String, SpeciesId>,
    member_species: BTreeMap<EntityId, SpeciesId>,
}

impl SpeciesTree {
    /// Record a cell born in `round` carrying `genome`.
    ///
    /// A known genome adds a member to its species. A new genome founds a
    /// species whose parent is the species of `parent`, if that cell's
    /// birth was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::AlreadyBorn`] if `entity` was recorded before.
    pub fn record_birth(
        &mut self,
        entity: EntityId,
        parent: Option<EntityId>,
        genome: &str,
        round: u64,
    ) -> Result<SpeciesId, LineageError> {
        if self.member_species.contains_key(&entity) {
            return Err(LineageError::AlreadyBorn(entity));
        }
        let known = self.by_genome.get(genome).copied();
        let id = known.unwrap_or_else(|| self.found(genome, parent, round));
        if let Some(species) = self.species.get_mut(&id) {
            species.members.insert(
                entity,
                Member {
                    birth: round,
                    death: None,
                },
            );
        }
        self.member_species.insert(entity, id);
        Ok(id)
    }

    fn found(&mut self, genome: &str, parent: Option<EntityId>, round: u64) -> SpeciesId {
        let id = SpeciesId(u64::try_from(self.species.len()).unwrap_or(u64::MAX));
        let parent = parent.and_then(|p| self.member_species.get(&p).copied());
        self.species.insert(
            id,
            Species {
                id,
                genome: genome.to_owned(),
                parent,
                first_birth: round,
                last_death: None,
                members: BTreeMap::new(),
            },
        );
        self.by_genome.insert(genome.to_owned(), id);
        debug!(species = %id, genome = %genome, parent = ?parent, round, "New species");
        id
    }

    /// Record that `entity` died in `round`.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::UnknownEntity`] if no birth was recorded and
    /// [`LineageError::AlreadyDead`] for a repeated death.
    pub fn record_death(&mut self, entity: EntityId, round: u64) -> Result<SpeciesId, LineageError> {
        let id = *self
            .member_species
            .get(&entity)
            .ok_or(LineageError::UnknownEntity(entity))?;
        let species = self
            .species
            .get_mut(&id)
            .ok_or(LineageError::UnknownEntity(entity))?;
        let member = species
            .members
            .get_mut(&entity)
            .ok_or(LineageError::UnknownEntity(entity))?;
        if let Some(died) = member.death {
            return Err(LineageError::AlreadyDead {
                entity,
                round: died,
            });
        }
        member.death = Some(round);
        species.last_death = Some(round);
        Ok(id)
    }

    /// Look up a species.
    pub fn species(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(&id)
    }

    /// The species `entity` belongs to.
    pub fn species_of(&self, entity: EntityId) -> Option<SpeciesId> {
        self.member_species.get(&entity).copied()
    }

    /// Cells alive at `round`, summed over every species.
    pub fn entities_alive_at(&self, round: u64) -> usize {
        self.species
            .values()
            .map(|s| s.members_alive_at(round))
            .sum()
    }

    /// Number of species ever recorded.
    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// Species with at least one living member.
    pub fn extant(&self) -> impl Iterator<Item = &Species> {
        self.species.values().filter(|s| s.living() > 0)
    }
}

/// Shared read handle to the tree a [`LineageTracker`] maintains.
#[derive(Debug, Clone, Default)]
pub struct Lineage(Rc<RefCell<SpeciesTree>>);

impl Lineage {
    /// A copy of the tree as it stands.
    pub fn snapshot(&self) -> SpeciesTree {
        self.0.borrow().clone()
    }

    /// As [`SpeciesTree::entities_alive_at`].
    pub fn entities_alive_at(&self, round: u64) -> usize {
        self.0.borrow().entities_alive_at(round)
    }
}

/// Unplaced entity that records births and deaths into a [`SpeciesTree`].
#[derive(Debug)]
pub struct LineageTracker {
    tree: Lineage,
}

impl LineageTracker {
    /// A tracker and the handle to read its tree.
    pub fn new() -> (Self, Lineage) {
        let tree = Lineage::default();
        (Self { tree: tree.clone() }, tree)
    }
}

impl Entity for LineageTracker {
    fn label(&self) -> &str {
        "lineage"
    }

    fn subscription_topics(&self) -> Vec<String> {
        vec![CELL_BORN.to_owned(), CELL_DIED.to_owned()]
    }

    fn tick(&mut self, _ctx: &mut Context<'_>) -> Result<(), EntityError> {
        Ok(())
    }

    fn handle_message(
        &mut self,
        message: &Message,
        _ctx: &mut Context<'_>,
    ) -> Result<(), HandlerError> {
        let mut tree = self.tree.0.borrow_mut();
        let result = if message.is(CELL_BORN) {
            let parent = message.get("parent").and_then(Value::as_u64).map(EntityId);
            tree.record_birth(message.sender, parent, message.get_str("genome")?, message.time)
        } else if message.is(CELL_DIED) {
            tree.record_death(message.sender, message.time)
        } else {
            return Ok(());
        };
        result
            .map(|_| ())
            .map_err(|e| HandlerError::rejected(e.to_string()))
    }
}
