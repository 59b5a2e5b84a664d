//! Engine binary for the SELF simulation kernel.
//!
//! This is the main entry point that wires a demo ecology onto the
//! kernel: genome-driven cells that eat, clone, and wander on a torus,
//! and a plant that turns the energy they spend back into food. It loads
//! configuration, seeds the grid, and runs rounds until a termination
//! condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `selfsim-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Load the `ecology` section
//! 4. Create the simulation (world, clock, post office)
//! 5. Seed the census, monitor, lineage tracker, plant, and Eve
//! 6. Run the simulation loop
//! 7. Log the result

mod cell;
mod census;
mod ecology;
mod error;
mod genome;
mod lineage;
mod monitor;
mod plant;
mod report_callback;
mod seed;

use std::path::Path;

use selfsim_core::{Simulation, SimulationConfig, log_simulation_end, run_simulation};
use selfsim_events::topics;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::ecology::EcologyConfig;
use crate::error::EngineError;
use crate::report_callback::ReportCallback;

const CONFIG_FILE: &str = "selfsim-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so report later.
    let config_found = Path::new(CONFIG_FILE).exists();
    let config = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("selfsim-engine starting");
    if !config_found {
        info!("Config file not found, using defaults");
    }
    info!(
        rows = config.world.rows,
        columns = config.world.columns,
        seed = config.world.seed,
        failure_mode = ?config.scheduler.failure_mode,
        max_rounds = config.simulation.max_rounds,
        "Configuration loaded"
    );

    // 3. Load the ecology section.
    let ecology = load_ecology_config()?;
    info!(
        eve_genome = %ecology.cells.eve_genome,
        eve_energy = ecology.cells.eve_energy,
        max_cells = ecology.cells.max_cells,
        max_plant_cells = ecology.plant.max_plant_cells,
        growth_factor = ecology.plant.growth_factor,
        "Ecology configuration loaded"
    );

    // 4. Create the simulation.
    let mut sim = Simulation::new(&config)?;
    info!(
        cells = sim.world().cell_count(),
        initial_time = sim.now(),
        "Simulation created"
    );

    // 5. Seed the ecology.
    let seeded = seed::seed_ecology(&mut sim, &ecology)?;
    info!(
        population = sim.population(),
        eve = %seeded.eve,
        plant = %seeded.plant,
        "Entities registered, entering round loop"
    );

    // 6. Run the simulation.
    let mut callback = ReportCallback::new(seeded.census.clone(), ecology.report_every);
    let result = run_simulation(&mut sim, &config.simulation, &mut callback)?;

    // 7. Log results.
    log_simulation_end(&result);

    let census = seeded.census.counts();
    info!(
        organisms = census.organisms,
        food = census.food,
        placed = census.placed,
        removed = census.removed,
        moved = census.moved,
        peak_organisms = callback.peak_organisms(),
        "Final census"
    );
    let tree = seeded.lineage.snapshot();
    info!(
        species = tree.species_count(),
        extant = tree.extant().count(),
        alive = seeded.lineage.entities_alive_at(sim.now().saturating_sub(1)),
        eve_species_members = tree
            .species_of(seeded.eve)
            .and_then(|id| tree.species(id))
            .map_or(0, lineage::Species::total_members),
        "Lineage"
    );
    for species in tree.extant() {
        debug!(
            species = %species.id(),
            genome = %species.genome(),
            parent = ?species.parent(),
            first_birth = species.first_birth(),
            last_death = ?species.last_death(),
            living = species.living(),
            total = species.total_members(),
            "Extant species"
        );
    }
    info!(
        total = seeded.topic_counts.total(),
        errors = seeded.topic_counts.get(topics::ERROR),
        "Messages delivered"
    );
    for (topic, count) in seeded.topic_counts.snapshot() {
        debug!(topic = %topic, count, "Messages delivered on topic");
    }
    info!(
        end_reason = ?result.end_reason,
        total_rounds = result.total_rounds,
        "selfsim-engine shutdown complete"
    );

    Ok(())
}

/// Load the main simulation configuration from `selfsim-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        let config = SimulationConfig::from_file(config_path)?;
        Ok(config)
    } else {
        Ok(SimulationConfig::default())
    }
}

/// Load ecology configuration from `selfsim-config.yaml`.
///
/// Reads the `ecology` section from the YAML config file. If the file
/// does not exist or lacks the `ecology` key, defaults are used.
fn load_ecology_config() -> Result<EcologyConfig, EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(EcologyConfig::default());
    }
    let contents = std::fs::read_to_string(config_path).map_err(|e| EngineError::Ecology {
        message: format!("failed to read config file: {e}"),
    })?;
    parse_ecology_section(&contents)
}

/// Extract the `ecology` section from a full config document.
fn parse_ecology_section(contents: &str) -> Result<EcologyConfig, EngineError> {
    let raw: serde_yml::Value = serde_yml::from_str(contents).map_err(|e| EngineError::Ecology {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    raw.get("ecology").map_or_else(
        || Ok(EcologyConfig::default()),
        |section| {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Ecology {
                message: format!("failed to parse ecology config: {e}"),
            })
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ecology_section_is_optional() {
        let ecology = parse_ecology_section("world:\n  rows: 10\n").unwrap();
        assert_eq!(ecology, EcologyConfig::default());
    }

    #[test]
    fn ecology_section_is_read() {
        let yaml = "
world:
  rows: 10
ecology:
  report_every: 5
  cells:
    max_cells: 12
";
        let ecology = parse_ecology_section(yaml).unwrap();
        assert_eq!(ecology.report_every, 5);
        assert_eq!(ecology.cells.max_cells, 12);
        assert_eq!(ecology.cells.eve_genome, "NESSWWWW");
    }

    #[test]
    fn malformed_ecology_section_is_an_error() {
        let err = parse_ecology_section("ecology:\n  cells: 7\n").unwrap_err();
        assert!(matches!(err, EngineError::Ecology { .. }));
    }
}
