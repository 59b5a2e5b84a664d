//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and simulation execution.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: selfsim_core::ConfigError,
    },

    /// Building the simulation failed.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: selfsim_core::SchedulerError,
    },

    /// Registering a seeded entity failed.
    #[error("registry error: {source}")]
    Registry {
        /// The underlying registry error.
        #[from]
        source: selfsim_core::RegistryError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: selfsim_core::RunnerError,
    },

    /// A configured genome or gene alphabet is malformed.
    #[error("genome error: {source}")]
    Genome {
        /// The underlying parse error.
        #[from]
        source: crate::genome::GenomeError,
    },

    /// The `ecology` config section could not be read.
    #[error("ecology config error: {message}")]
    Ecology {
        /// Description of the failure.
        message: String,
    },
}
