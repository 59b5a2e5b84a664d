//! Seeds a fresh simulation with the demo ecology.

use std::rc::Rc;

use selfsim_core::Simulation;
use selfsim_types::{Coord, Direction, EntityId};
use tracing::info;

use crate::cell::{CellParams, SimpleCell};
use crate::census::Census;
use crate::ecology::EcologyConfig;
use crate::error::EngineError;
use crate::genome::Genome;
use crate::lineage::{Lineage, LineageTracker};
use crate::monitor::{Monitor, TopicCounts};
use crate::plant::Plant;

/// Handles to what [`seed_ecology`] created.
#[derive(Debug)]
pub struct Seeded {
    /// Grid census, registered as a world observer.
    pub census: Census,
    /// Per-topic message counts from the monitor.
    pub topic_counts: TopicCounts,
    /// Species tree built from cell births and deaths.
    pub lineage: Lineage,
    /// The founding cell.
    pub eve: EntityId,
    /// The plant entity.
    pub plant: EntityId,
}

/// Register the census observer, the monitor, and the lineage tracker,
/// then the plant and Eve.
///
/// Eve sits at the center of the grid and the plant's root one cell east
/// of her, so her first tick can eat.
///
/// # Errors
///
/// Returns [`EngineError::Genome`] for a malformed genome or alphabet and
/// [`EngineError::Registry`] if an entity cannot be registered.
pub fn seed_ecology(sim: &mut Simulation, ecology: &EcologyConfig) -> Result<Seeded, EngineError> {
    let (census, observer) = Census::new();
    sim.world_mut().add_observer(Box::new(observer));

    let (monitor, topic_counts) = Monitor::new();
    sim.add(monitor)?;
    let (tracker, lineage) = LineageTracker::new();
    sim.add(tracker)?;

    let params = Rc::new(CellParams::from_config(&ecology.cells)?);
    let genome: Genome = ecology.cells.eve_genome.parse()?;

    let (rows, columns) = sim.world().size();
    let center = Coord::new(
        rows.checked_div(2).unwrap_or(0),
        columns.checked_div(2).unwrap_or(0),
    );
    let root = sim.world().topology().neighbor(center, Direction::East);

    // The plant ticks before Eve so food exists on her first move.
    let plant = sim.add(Plant::new(ecology.plant.clone(), root))?;
    let eve = sim.spawn(
        center,
        SimpleCell::new(params, genome.clone(), ecology.cells.eve_energy),
    )?;

    info!(
        eve = %eve,
        genome = %genome,
        at = %center,
        plant_root = %root,
        "Ecology seeded"
    );
    Ok(Seeded {
        census,
        topic_counts,
        lineage,
        eve,
        plant,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use selfsim_core::SimulationConfig;
    use selfsim_events::topics;
    use selfsim_types::OccupantKind;

    use super::*;
    use crate::ecology::{CELL_BORN, ENERGY_FREED, PLANT_CELL_EATEN};
    use crate::lineage::SpeciesId;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.world.rows = 20;
        config.world.columns = 20;
        config
    }

    #[test]
    fn seeds_eve_and_root() {
        let mut sim = Simulation::new(&small_config()).unwrap();
        let seeded = seed_ecology(&mut sim, &EcologyConfig::default()).unwrap();

        assert_eq!(sim.world().position_of(seeded.eve), Some(Coord::new(10, 10)));
        assert_eq!(
            sim.world().occupant_at(Coord::new(10, 11)).map(|o| o.kind),
            Some(OccupantKind::Food)
        );
        assert!(sim.contains(seeded.plant));
        assert_eq!(sim.population(), 4);
        assert_eq!(sim.organism_count(), 1);

        let counts = seeded.census.counts();
        assert_eq!(counts.organisms, 1);
        assert_eq!(counts.food, 1);
    }

    #[test]
    fn eve_eats_on_her_first_tick() {
        let mut sim = Simulation::new(&small_config()).unwrap();
        let seeded = seed_ecology(&mut sim, &EcologyConfig::default()).unwrap();
        sim.advance(2).unwrap();

        assert_eq!(seeded.topic_counts.get(PLANT_CELL_EATEN), 1);
        assert_eq!(seeded.topic_counts.get(ENERGY_FREED), 1);
        assert_eq!(seeded.topic_counts.get(topics::JOIN), 4);
        assert_eq!(seeded.topic_counts.get(CELL_BORN), 1);
        assert_eq!(seeded.lineage.entities_alive_at(0), 1);
    }

    #[test]
    fn long_run_keeps_grid_consistent() {
        let mut config = small_config();
        config.scheduler.check_invariants = true;
        let mut sim = Simulation::new(&config).unwrap();
        let seeded = seed_ecology(&mut sim, &EcologyConfig::default()).unwrap();

        let summaries = sim.advance(150).unwrap();
        assert_eq!(summaries.len(), 150);
        assert_eq!(summaries.iter().map(|s| s.entity_failures).sum::<usize>(), 0);
        assert_eq!(summaries.iter().map(|s| s.handler_failures).sum::<usize>(), 0);

        let counts = seeded.census.counts();
        assert_eq!(counts.organisms, sim.organism_count());
        let tree = seeded.lineage.snapshot();
        assert_eq!(tree.entities_alive_at(0), 1);
        assert_eq!(tree.species_of(seeded.eve), Some(SpeciesId(0)));
        assert_eq!(counts.organisms.saturating_add(counts.food), sim.world().occupied_count());
    }

    #[test]
    fn bad_genome_is_rejected() {
        let mut sim = Simulation::new(&small_config()).unwrap();
        let mut ecology = EcologyConfig::default();
        ecology.cells.eve_genome = "NQ".to_owned();
        let err = seed_ecology(&mut sim, &ecology).unwrap_err();
        assert!(matches!(err, EngineError::Genome { .. }));
    }
}
