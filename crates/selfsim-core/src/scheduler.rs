//! The round-based scheduler and entity lifecycle registry.
//!
//! Every round runs three phases in a fixed order:
//!
//! 1. **Delivery** -- every message pending at the start of the round is
//!    handed to its recipients' [`Entity::handle_message`].
//! 2. **Tick** -- every entity registered at the start of the tick phase is
//!    ticked once, in registration order. Entities dropped earlier in the
//!    round are skipped. Entities added by a message handler tick in this
//!    round; entities added during the tick phase first tick in the next.
//! 3. **Advance** -- the logical clock moves forward by one.
//!
//! # Ownership
//!
//! Entities live in the registry as boxed trait objects. While an entity
//! runs a callback it is checked out of the registry, so the callback can
//! receive a [`Context`] with mutable access to every other part of the
//! kernel. Dropping a checked-out entity (typically itself) is recorded and
//! completed when the entity is checked back in.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use selfsim_events::{DeliveryReport, HandlerError, Message, PostOffice, topics};
use selfsim_types::{Coord, EntityId, Occupant, OccupantKind};
use selfsim_world::{World, WorldError};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, LogicalClock};
use crate::config::{ConfigError, FailureMode, SchedulerConfig, SimulationConfig};
use crate::entity::{Context, Entity, EntityError};

/// Errors that abort a round.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// An entity tick failed in [`FailureMode::Strict`].
    #[error("entity {entity_id} failed: {source}")]
    EntityFailed {
        /// The entity whose tick failed.
        entity_id: EntityId,
        /// The underlying entity error.
        source: EntityError,
    },

    /// The occupancy invariant broke. Fatal in every failure mode.
    #[error("occupancy invariant violated after {entity_id}: {source}")]
    InvariantViolation {
        /// The entity whose tick exposed the violation, or the kernel id
        /// when the end-of-round check caught it.
        entity_id: EntityId,
        /// The underlying world error.
        source: WorldError,
    },

    /// A world operation failed outside any entity.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The configuration is unusable.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },
}

/// Errors registering a new entity.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Every entity id has been handed out.
    #[error("entity ids exhausted")]
    IdsExhausted,

    /// The entity could not be placed on the grid.
    #[error("placement failed: {source}")]
    Placement {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}

/// Summary of a single round's execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    /// Logical time at which the round ran.
    pub round: u64,
    /// Number of entity ticks run.
    pub entities_ticked: usize,
    /// Entities added during the round.
    pub births: usize,
    /// Entities dropped during the round.
    pub deaths: usize,
    /// Handler invocations made during the delivery phase.
    pub messages_delivered: usize,
    /// Handler invocations that failed.
    pub handler_failures: usize,
    /// Entity ticks that failed in [`FailureMode::Lenient`].
    pub entity_failures: usize,
    /// Live entities at the end of the round.
    pub population: usize,
}

/// Kernel state reachable from a [`Context`]: everything except the post
/// office, which is borrowed separately during delivery.
pub(crate) struct Kernel {
    pub(crate) world: World,
    pub(crate) rng: SmallRng,
    pub(crate) settings: SchedulerConfig,
    clock: LogicalClock,
    /// Entities not currently checked out.
    entities: BTreeMap<EntityId, Box<dyn Entity>>,
    /// Tick order.
    order: Vec<EntityId>,
    /// Same ids as `order`, for lookups.
    members: BTreeSet<EntityId>,
    /// Checked-out entities whose drop completes at check-in.
    pending_drops: BTreeSet<EntityId>,
    /// `None` once the id space is used up.
    next_id: Option<EntityId>,
    births: usize,
    deaths: usize,
}

impl Kernel {
    fn new(config: &SimulationConfig) -> Result<Self, WorldError> {
        Ok(Self {
            world: World::new(config.world.rows, config.world.columns)?,
            rng: SmallRng::seed_from_u64(config.world.seed),
            settings: config.scheduler.clone(),
            clock: LogicalClock::new(config.world.initial_time),
            entities: BTreeMap::new(),
            order: Vec::new(),
            members: BTreeSet::new(),
            pending_drops: BTreeSet::new(),
            next_id: Some(EntityId::FIRST),
            births: 0,
            deaths: 0,
        })
    }

    pub(crate) const fn now(&self) -> u64 {
        self.clock.tick()
    }

    pub(crate) fn allocate_id(&mut self) -> Result<EntityId, RegistryError> {
        let id = self.next_id.ok_or(RegistryError::IdsExhausted)?;
        self.next_id = id.next();
        Ok(id)
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id) && !self.pending_drops.contains(&id)
    }

    pub(crate) fn population(&self) -> usize {
        self.members.len().saturating_sub(self.pending_drops.len())
    }

    pub(crate) fn add(
        &mut self,
        post_office: &mut PostOffice,
        entity: Box<dyn Entity>,
    ) -> Result<EntityId, RegistryError> {
        let id = self.allocate_id()?;
        self.register(post_office, id, entity);
        Ok(id)
    }

    pub(crate) fn spawn(
        &mut self,
        post_office: &mut PostOffice,
        coord: Coord,
        entity: Box<dyn Entity>,
    ) -> Result<EntityId, RegistryError> {
        let id = self.allocate_id()?;
        self.world.place(coord, Occupant::new(id, entity.kind()))?;
        self.register(post_office, id, entity);
        Ok(id)
    }

    fn register(&mut self, post_office: &mut PostOffice, id: EntityId, mut entity: Box<dyn Entity>) {
        self.order.push(id);
        self.members.insert(id);
        post_office.subscribe(id, &entity.subscription_topics());
        self.births = self.births.saturating_add(1);
        debug!(tick = self.now(), entity_id = %id, label = entity.label(), "entity added");

        entity.on_joined(&mut Context::new(id, self, post_office));
        if self.settings.announce_lifecycle {
            let join = Message::new(topics::JOIN, EntityId::KERNEL, self.now())
                .with("id", id.into_inner())
                .with("label", entity.label());
            post_office.post(join);
        }
        self.check_in(post_office, id, entity);
    }

    pub(crate) fn drop(&mut self, post_office: &mut PostOffice, id: EntityId) -> bool {
        if !self.contains(id) {
            return false;
        }
        match self.entities.remove(&id) {
            Some(entity) => self.finish_drop(post_office, id, entity),
            None => {
                self.pending_drops.insert(id);
            }
        }
        true
    }

    fn finish_drop(&mut self, post_office: &mut PostOffice, id: EntityId, mut entity: Box<dyn Entity>) {
        // Keeps a re-entrant drop from on_leaving from recording a new one.
        self.pending_drops.insert(id);
        entity.on_leaving(&mut Context::new(id, self, post_office));

        self.order.retain(|member| *member != id);
        self.members.remove(&id);
        self.pending_drops.remove(&id);
        let cell = self.world.remove_occupant(id);
        post_office.unsubscribe_all(id);
        self.deaths = self.deaths.saturating_add(1);
        debug!(tick = self.now(), entity_id = %id, label = entity.label(), ?cell, "entity dropped");

        if self.settings.announce_lifecycle {
            let leave = Message::new(topics::LEAVE, EntityId::KERNEL, self.now())
                .with("id", id.into_inner())
                .with("label", entity.label());
            post_office.post(leave);
        }
    }

    fn check_out(&mut self, id: EntityId) -> Option<Box<dyn Entity>> {
        if self.pending_drops.contains(&id) {
            return None;
        }
        self.entities.remove(&id)
    }

    fn check_in(&mut self, post_office: &mut PostOffice, id: EntityId, entity: Box<dyn Entity>) {
        if self.pending_drops.contains(&id) {
            self.finish_drop(post_office, id, entity);
        } else {
            self.entities.insert(id, entity);
        }
    }

    pub(crate) fn organism_count(&self) -> usize {
        self.order
            .iter()
            .filter(|id| self.contains(**id))
            .filter_map(|id| self.world.position_of(*id))
            .filter(|coord| {
                self.world
                    .occupant_at(*coord)
                    .is_some_and(|occupant| occupant.is(OccupantKind::Organism))
            })
            .count()
    }
}

/// Deliver one message to one recipient. Recipients that are no longer
/// registered are skipped.
fn deliver_to(
    kernel: &mut Kernel,
    post_office: &mut PostOffice,
    recipient: EntityId,
    message: &Message,
) -> Result<(), HandlerError> {
    let Some(mut entity) = kernel.check_out(recipient) else {
        return Ok(());
    };
    let result = entity.handle_message(message, &mut Context::new(recipient, kernel, post_office));
    kernel.check_in(post_office, recipient, entity);
    result
}

/// A grid world, its population, and the message bus between them.
pub struct Simulation {
    config: SimulationConfig,
    kernel: Kernel,
    post_office: PostOffice,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("now", &self.now())
            .field("population", &self.population())
            .field("world", &self.kernel.world)
            .field("pending_messages", &self.post_office.pending_count())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Build an empty simulation from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Config`] if the configuration fails
    /// validation, or [`SchedulerError::World`] if the grid cannot be built.
    pub fn new(config: &SimulationConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        let kernel = Kernel::new(config)?;
        info!(
            rows = config.world.rows,
            columns = config.world.columns,
            seed = config.world.seed,
            failure_mode = ?config.scheduler.failure_mode,
            "Simulation created"
        );
        Ok(Self {
            config: config.clone(),
            kernel,
            post_office: PostOffice::new(),
        })
    }

    /// Replace all state, identity counters included, with a fresh
    /// simulation built from `config`. World observers are not carried over.
    ///
    /// # Errors
    ///
    /// As [`Simulation::new`]. On error the current state is kept.
    pub fn reset(&mut self, config: &SimulationConfig) -> Result<(), SchedulerError> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Register an unplaced entity and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IdsExhausted`] once no id is left.
    pub fn add(&mut self, entity: impl Entity + 'static) -> Result<EntityId, RegistryError> {
        self.kernel.add(&mut self.post_office, Box::new(entity))
    }

    /// Place an entity at `coord` and register it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Placement`] if the cell is taken and
    /// [`RegistryError::IdsExhausted`] once no id is left. Nothing is
    /// registered in either case.
    pub fn spawn(
        &mut self,
        coord: Coord,
        entity: impl Entity + 'static,
    ) -> Result<EntityId, RegistryError> {
        self.kernel
            .spawn(&mut self.post_office, coord, Box::new(entity))
    }

    /// Remove an entity. Returns `false` if it was not registered.
    pub fn drop(&mut self, id: EntityId) -> bool {
        self.kernel.drop(&mut self.post_office, id)
    }

    /// Run `rounds` rounds and return their summaries.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchedulerError`] raised by a round; earlier
    /// rounds stay applied.
    pub fn advance(&mut self, rounds: u64) -> Result<Vec<RoundSummary>, SchedulerError> {
        let mut summaries = Vec::new();
        for _ in 0..rounds {
            summaries.push(self.step()?);
        }
        Ok(summaries)
    }

    /// Run exactly one round.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::EntityFailed`] if a tick fails in strict mode.
    /// - [`SchedulerError::InvariantViolation`] if the grid is corrupted.
    /// - [`SchedulerError::Clock`] if logical time overflows.
    pub fn step(&mut self) -> Result<RoundSummary, SchedulerError> {
        let Self {
            kernel,
            post_office,
            ..
        } = self;
        let round = kernel.now();
        kernel.births = 0;
        kernel.deaths = 0;

        // --- Delivery ---
        let report: DeliveryReport = post_office
            .deliver_all(round, |po, recipient, message| {
                deliver_to(kernel, po, recipient, message)
            });

        // --- Tick ---
        let snapshot = kernel.order.clone();
        let mut entities_ticked = 0_usize;
        let mut entity_failures = 0_usize;
        for id in snapshot {
            let Some(mut entity) = kernel.check_out(id) else {
                continue;
            };
            let result = entity.tick(&mut Context::new(id, kernel, post_office));
            entities_ticked = entities_ticked.saturating_add(1);

            let Err(error) = result else {
                kernel.check_in(post_office, id, entity);
                continue;
            };
            let label = entity.label().to_owned();
            kernel.check_in(post_office, id, entity);
            match error {
                EntityError::World { source }
                | EntityError::Registry {
                    source: RegistryError::Placement { source },
                } if source.is_invariant_violation() => {
                    return Err(SchedulerError::InvariantViolation {
                        entity_id: id,
                        source,
                    });
                }
                error => match kernel.settings.failure_mode {
                    FailureMode::Strict => {
                        return Err(SchedulerError::EntityFailed {
                            entity_id: id,
                            source: error,
                        });
                    }
                    FailureMode::Lenient => {
                        entity_failures = entity_failures.saturating_add(1);
                        warn!(tick = round, entity_id = %id, label = %label, %error, "entity tick failed");
                    }
                },
            }
        }

        if kernel.settings.check_invariants {
            kernel
                .world
                .check_invariants()
                .map_err(|source| SchedulerError::InvariantViolation {
                    entity_id: EntityId::KERNEL,
                    source,
                })?;
        }

        // --- Advance ---
        kernel.clock.advance()?;

        let summary = RoundSummary {
            round,
            entities_ticked,
            births: kernel.births,
            deaths: kernel.deaths,
            messages_delivered: report.deliveries,
            handler_failures: report.failures,
            entity_failures,
            population: kernel.population(),
        };
        debug!(
            tick = round,
            ticked = summary.entities_ticked,
            births = summary.births,
            deaths = summary.deaths,
            delivered = summary.messages_delivered,
            population = summary.population,
            "round complete"
        );
        Ok(summary)
    }

    /// Current logical time.
    pub const fn now(&self) -> u64 {
        self.kernel.now()
    }

    /// Number of live entities.
    pub fn population(&self) -> usize {
        self.kernel.population()
    }

    /// Number of live entities placed on the grid as organisms.
    pub fn organism_count(&self) -> usize {
        self.kernel.organism_count()
    }

    /// Live entity ids in tick order.
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.kernel
            .order
            .iter()
            .copied()
            .filter(|id| self.kernel.contains(*id))
            .collect()
    }

    /// Whether `id` is a live entity.
    pub fn contains(&self, id: EntityId) -> bool {
        self.kernel.contains(id)
    }

    /// Read access to the grid.
    pub const fn world(&self) -> &World {
        &self.kernel.world
    }

    /// Write access to the grid, e.g. to register observers or seed food.
    pub const fn world_mut(&mut self) -> &mut World {
        &mut self.kernel.world
    }

    /// Read access to the message bus.
    pub const fn post_office(&self) -> &PostOffice {
        &self.post_office
    }

    /// Post a message from outside any entity.
    pub fn post(&mut self, message: Message) -> u64 {
        self.post_office.post(message)
    }

    /// Subscribe any id, such as [`EntityId::KERNEL`], to topics.
    pub fn subscribe<S: AsRef<str>>(&mut self, subscriber: EntityId, topics: &[S]) {
        self.post_office.subscribe(subscriber, topics);
    }

    /// Fresh identity for a non-entity occupant such as food.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IdsExhausted`] once no id is left.
    pub fn allocate_id(&mut self) -> Result<EntityId, RegistryError> {
        self.kernel.allocate_id()
    }

    /// The configuration this simulation was built from.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }
}
