//! Bounded simulation loop.
//!
//! [`run_simulation`] drives [`Simulation::step`] until the round limit
//! is reached or, when configured, until no organism is left on the grid.
//! A [`RoundCallback`] sees every completed round.

use tracing::{info, warn};

use crate::config::SimulationBoundsConfig;
use crate::scheduler::{RoundSummary, SchedulerError, Simulation};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A round failed.
    #[error("round error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: SchedulerError,
    },
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The configured number of rounds completed.
    MaxRoundsReached,
    /// No organism is left on the grid.
    Extinction,
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: EndReason,
    /// The last round summary, if any round completed.
    pub final_summary: Option<RoundSummary>,
    /// Total number of rounds executed.
    pub total_rounds: u64,
}

/// Callback invoked after each round completes.
pub trait RoundCallback {
    /// Called after a round completes successfully.
    fn on_round(&mut self, summary: &RoundSummary, sim: &Simulation);
}

/// A no-op round callback.
pub struct NoOpCallback;

impl RoundCallback for NoOpCallback {
    fn on_round(&mut self, _summary: &RoundSummary, _sim: &Simulation) {}
}

/// Run rounds until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a round fails.
pub fn run_simulation(
    sim: &mut Simulation,
    bounds: &SimulationBoundsConfig,
    callback: &mut dyn RoundCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<RoundSummary> = None;
    let mut total_rounds: u64 = 0;

    info!(
        max_rounds = bounds.max_rounds,
        stop_on_extinction = bounds.stop_on_extinction,
        population = sim.population(),
        "Simulation starting"
    );

    while total_rounds < bounds.max_rounds {
        let summary = sim.step()?;
        total_rounds = total_rounds.saturating_add(1);

        callback.on_round(&summary, sim);

        if bounds.stop_on_extinction && sim.organism_count() == 0 {
            info!(tick = summary.round, "No organisms left -- extinction");
            return Ok(SimulationResult {
                end_reason: EndReason::Extinction,
                final_summary: Some(summary),
                total_rounds,
            });
        }

        last_summary = Some(summary);
    }

    info!(max_rounds = bounds.max_rounds, "Round limit reached");
    Ok(SimulationResult {
        end_reason: EndReason::MaxRoundsReached,
        final_summary: last_summary,
        total_rounds,
    })
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_rounds = result.total_rounds,
        final_round = result.final_summary.as_ref().map(|s| s.round),
        final_population = result.final_summary.as_ref().map(|s| s.population),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.round,
            population = summary.population,
            births = summary.births,
            deaths = summary.deaths,
            "Final round summary"
        );
    } else {
        warn!("Simulation ended with no rounds executed");
    }
}
