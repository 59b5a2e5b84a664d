//! Logical clock, entity contract, scheduler, and run loop for the SELF
//! simulation kernel.
//!
//! This crate owns the round cycle that drives the simulation: deliver
//! pending messages, tick every registered entity once, advance time.
//!
//! # Modules
//!
//! - [`behavior`] -- Prioritized attempt chains for organism behaviors.
//! - [`clock`] -- [`LogicalClock`], the checked round counter.
//! - [`config`] -- Configuration loading from `selfsim-config.yaml` into
//!   strongly-typed structs.
//! - [`entity`] -- The [`Entity`] trait and the [`Context`] handed to it.
//! - [`runner`] -- Bounded run loop with round callbacks.
//! - [`scheduler`] -- [`Simulation`], the entity registry and round cycle.
//!
//! [`LogicalClock`]: clock::LogicalClock
//! [`Entity`]: entity::Entity
//! [`Context`]: entity::Context
//! [`Simulation`]: scheduler::Simulation

pub mod behavior;
pub mod clock;
pub mod config;
pub mod entity;
pub mod runner;
pub mod scheduler;

pub use behavior::{Attempt, Outcome, first_success};
pub use clock::{ClockError, LogicalClock};
pub use config::{
    ConfigError, FailureMode, LoggingConfig, SchedulerConfig, SimulationBoundsConfig,
    SimulationConfig, WorldConfig,
};
pub use entity::{Context, Entity, EntityError};
pub use runner::{
    EndReason, NoOpCallback, RoundCallback, RunnerError, SimulationResult, log_simulation_end,
    run_simulation,
};
pub use scheduler::{RegistryError, RoundSummary, SchedulerError, Simulation};
