//! The entity contract and the context handed to every behavior call.
//!
//! An [`Entity`] is anything the scheduler ticks: an organism on the grid,
//! a model that manages food, or an unplaced observer. Entities never hold
//! references into kernel storage. Each callback receives a fresh
//! [`Context`], which is the only way to read or mutate the world, the
//! message bus, or the population.

use rand::rngs::SmallRng;
use selfsim_events::{HandlerError, Message, Payload, PostOffice};
use selfsim_types::{Coord, EntityId, OccupantKind};
use selfsim_world::{World, WorldError};

use crate::scheduler::{Kernel, RegistryError};

/// Errors an entity tick can report.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// A world operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// A new entity or occupant could not be registered.
    #[error("registry error: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: RegistryError,
    },

    /// The entity's own logic failed.
    #[error("entity failed: {reason}")]
    Failed {
        /// What went wrong.
        reason: String,
    },
}

impl EntityError {
    /// Shorthand for [`EntityError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether the error signals a broken occupancy invariant.
    pub const fn is_invariant_violation(&self) -> bool {
        match self {
            Self::World { source }
            | Self::Registry {
                source: RegistryError::Placement { source },
            } => source.is_invariant_violation(),
            Self::Registry { .. } | Self::Failed { .. } => false,
        }
    }
}

/// Behavior plugged into the scheduler.
///
/// Only [`Entity::tick`] is required. Lifecycle hooks default to no-ops and
/// messages are ignored unless [`Entity::handle_message`] is overridden.
pub trait Entity {
    /// Kind tag used when the scheduler places this entity on the grid.
    fn kind(&self) -> OccupantKind {
        OccupantKind::Organism
    }

    /// Short name for logs.
    fn label(&self) -> &str {
        "entity"
    }

    /// Topics to subscribe to when the entity is added.
    fn subscription_topics(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once, right after the entity received its id.
    fn on_joined(&mut self, _ctx: &mut Context<'_>) {}

    /// Called once, just before the entity is removed.
    fn on_leaving(&mut self, _ctx: &mut Context<'_>) {}

    /// Advance the entity by one round.
    fn tick(&mut self, ctx: &mut Context<'_>) -> Result<(), EntityError>;

    /// Handle a message delivered on a subscribed topic.
    fn handle_message(
        &mut self,
        _message: &Message,
        _ctx: &mut Context<'_>,
    ) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Mutation surface for one entity during one callback.
pub struct Context<'a> {
    me: EntityId,
    kernel: &'a mut Kernel,
    post_office: &'a mut PostOffice,
}

impl<'a> Context<'a> {
    pub(crate) const fn new(
        me: EntityId,
        kernel: &'a mut Kernel,
        post_office: &'a mut PostOffice,
    ) -> Self {
        Self {
            me,
            kernel,
            post_office,
        }
    }

    /// Id of the entity this context belongs to.
    pub const fn me(&self) -> EntityId {
        self.me
    }

    /// Current logical time.
    pub fn now(&self) -> u64 {
        self.kernel.now()
    }

    /// Where this entity sits on the grid, if placed.
    pub fn position(&self) -> Option<Coord> {
        self.kernel.world.position_of(self.me)
    }

    /// Read access to the grid.
    pub fn world(&self) -> &World {
        &self.kernel.world
    }

    /// Write access to the grid.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.kernel.world
    }

    /// The simulation's seeded random number generator.
    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.kernel.rng
    }

    /// The grid together with the random number generator, for random
    /// searches that need both at once.
    pub fn world_and_rng(&mut self) -> (&mut World, &mut SmallRng) {
        (&mut self.kernel.world, &mut self.kernel.rng)
    }

    /// Cap on random draws for grid searches.
    pub fn placement_attempts(&self) -> u32 {
        self.kernel.settings.placement_attempts
    }

    /// Post a message from this entity, stamped with the current time.
    pub fn post(&mut self, topic: &str, payload: Payload) -> u64 {
        let message = Message::new(topic, self.me, self.now()).with_payload(payload);
        self.post_office.post(message)
    }

    /// Post a fully built message as is.
    pub fn publish(&mut self, message: Message) -> u64 {
        self.post_office.post(message)
    }

    /// Subscribe this entity to more topics.
    pub fn subscribe<S: AsRef<str>>(&mut self, topics: &[S]) {
        self.post_office.subscribe(self.me, topics);
    }

    /// Unsubscribe this entity from topics.
    pub fn unsubscribe<S: AsRef<str>>(&mut self, topics: &[S]) -> usize {
        self.post_office.unsubscribe(self.me, topics)
    }

    /// Register a new, unplaced entity.
    ///
    /// Added during delivery, it ticks this round. Added during the tick
    /// phase, it first ticks next round.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IdsExhausted`] once no id is left.
    pub fn add(&mut self, entity: impl Entity + 'static) -> Result<EntityId, RegistryError> {
        self.kernel.add(self.post_office, Box::new(entity))
    }

    /// Place a new entity at `coord` and register it.
    ///
    /// # Errors
    ///
    /// As [`Simulation::spawn`](crate::Simulation::spawn).
    pub fn spawn(
        &mut self,
        coord: Coord,
        entity: impl Entity + 'static,
    ) -> Result<EntityId, RegistryError> {
        self.kernel.spawn(self.post_office, coord, Box::new(entity))
    }

    /// Remove an entity. Returns `false` if it was not registered.
    pub fn drop(&mut self, id: EntityId) -> bool {
        self.kernel.drop(self.post_office, id)
    }

    /// Remove this entity once the current callback returns.
    pub fn drop_self(&mut self) -> bool {
        self.kernel.drop(self.post_office, self.me)
    }

    /// Move this entity to the empty cell `to`, returning where it was.
    ///
    /// # Errors
    ///
    /// As [`World::move_occupant`].
    pub fn move_self(&mut self, to: Coord) -> Result<Coord, WorldError> {
        self.kernel.world.move_occupant(self.me, to)
    }

    /// Fresh identity for a non-entity occupant such as food.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IdsExhausted`] once no id is left.
    pub fn allocate_id(&mut self) -> Result<EntityId, RegistryError> {
        self.kernel.allocate_id()
    }

    /// Number of live entities, placed or not.
    pub fn population(&self) -> usize {
        self.kernel.population()
    }

    /// Number of live entities placed on the grid as organisms.
    pub fn organism_count(&self) -> usize {
        self.kernel.organism_count()
    }

    /// Whether `id` is a live entity.
    pub fn contains(&self, id: EntityId) -> bool {
        self.kernel.contains(id)
    }
}
