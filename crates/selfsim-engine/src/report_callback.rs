//! Round callback that logs a periodic census line.

use selfsim_core::{RoundCallback, RoundSummary, Simulation};
use tracing::{debug, info};

use crate::census::Census;

/// Logs a census every `every` rounds and a debug line for every round.
pub struct ReportCallback {
    census: Census,
    every: u64,
    peak_organisms: usize,
}

impl ReportCallback {
    /// A callback reading from `census`. `every == 0` disables the
    /// periodic line.
    pub const fn new(census: Census, every: u64) -> Self {
        Self {
            census,
            every,
            peak_organisms: 0,
        }
    }

    /// Largest organism count seen after any round.
    pub const fn peak_organisms(&self) -> usize {
        self.peak_organisms
    }
}

impl RoundCallback for ReportCallback {
    fn on_round(&mut self, summary: &RoundSummary, sim: &Simulation) {
        let organisms = sim.organism_count();
        self.peak_organisms = self.peak_organisms.max(organisms);

        debug!(
            tick = summary.round,
            ticked = summary.entities_ticked,
            births = summary.births,
            deaths = summary.deaths,
            delivered = summary.messages_delivered,
            "Round complete"
        );

        let due = summary
            .round
            .checked_rem(self.every)
            .is_some_and(|r| r == 0);
        if due {
            let counts = self.census.counts();
            info!(
                tick = summary.round,
                organisms,
                food = counts.food,
                occupied = sim.world().occupied_count(),
                handler_failures = summary.handler_failures,
                entity_failures = summary.entity_failures,
                "Census"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::rc::Rc;

    use selfsim_core::{SimulationBoundsConfig, SimulationConfig, run_simulation};
    use selfsim_types::Coord;

    use super::*;
    use crate::cell::{CellParams, SimpleCell};
    use crate::ecology::CellConfig;

    #[test]
    fn peak_outlives_the_population() {
        let mut sim = Simulation::new(&SimulationConfig::default()).unwrap();
        let (census, observer) = Census::new();
        sim.world_mut().add_observer(Box::new(observer));
        let params = Rc::new(CellParams::from_config(&CellConfig::default()).unwrap());
        for col in [0, 5] {
            let cell = SimpleCell::new(Rc::clone(&params), "_".parse().unwrap(), 1);
            sim.spawn(Coord::new(0, col), cell).unwrap();
        }

        let mut callback = ReportCallback::new(census.clone(), 1);
        let bounds = SimulationBoundsConfig {
            max_rounds: 3,
            stop_on_extinction: false,
        };
        run_simulation(&mut sim, &bounds, &mut callback).unwrap();

        assert_eq!(callback.peak_organisms(), 2);
        assert_eq!(sim.organism_count(), 0);
        assert_eq!(census.counts().organisms, 0);
        assert_eq!(census.counts().removed, 2);
    }
}
