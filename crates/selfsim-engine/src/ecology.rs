//! Parameters of the demonstration ecology, loaded from the `ecology`
//! section of `selfsim-config.yaml`.
//!
//! Defaults reproduce the classic single-Eve run: a 60x60 torus, one cell
//! with genome `NESSWWWW`, and a plant that may cover up to 880 cells.

use serde::Deserialize;

/// Topic a cell posts when it spends energy; the plant collects it.
pub const ENERGY_FREED: &str = "energy freed";

/// Topic a cell posts when it eats a food cell.
pub const PLANT_CELL_EATEN: &str = "plant cell eaten";

/// Topic a cell posts when it joins the simulation, Eve included.
pub const CELL_BORN: &str = "cell born";

/// Topic a cell posts when it clones a daughter.
pub const CELL_CLONED: &str = "cell cloned";

/// Topic a cell posts when it starves.
pub const CELL_DIED: &str = "cell died";

/// Ecology configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EcologyConfig {
    /// Cell parameters.
    #[serde(default)]
    pub cells: CellConfig,

    /// Plant parameters.
    #[serde(default)]
    pub plant: PlantConfig,

    /// Log a census line every N rounds. 0 disables it.
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

impl Default for EcologyConfig {
    fn default() -> Self {
        Self {
            cells: CellConfig::default(),
            plant: PlantConfig::default(),
            report_every: default_report_every(),
        }
    }
}

/// Parameters shared by every `SimpleCell`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CellConfig {
    /// Genome of the founding cell.
    #[serde(default = "default_eve_genome")]
    pub eve_genome: String,

    /// Energy the founding cell starts with.
    #[serde(default = "default_eve_energy")]
    pub eve_energy: i64,

    /// Symbols a mutation may write into a genome.
    #[serde(default = "default_genes")]
    pub genes: String,

    /// Energy spent every tick.
    #[serde(default = "default_energy_per_move")]
    pub energy_per_move: i64,

    /// Energy gained per food cell eaten.
    #[serde(default = "default_energy_per_food")]
    pub energy_per_food: i64,

    /// Energy needed before a cell may clone.
    #[serde(default = "default_well_fed_level")]
    pub well_fed_level: i64,

    /// Age a cell must exceed before it may clone.
    #[serde(default = "default_maturity")]
    pub maturity: u64,

    /// No cloning once the population reaches this size.
    #[serde(default = "default_max_cells")]
    pub max_cells: usize,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            eve_genome: default_eve_genome(),
            eve_energy: default_eve_energy(),
            genes: default_genes(),
            energy_per_move: default_energy_per_move(),
            energy_per_food: default_energy_per_food(),
            well_fed_level: default_well_fed_level(),
            maturity: default_maturity(),
            max_cells: default_max_cells(),
        }
    }
}

/// Parameters of the plant model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlantConfig {
    /// Largest number of food cells the plant maintains.
    #[serde(default = "default_max_plant_cells")]
    pub max_plant_cells: usize,

    /// Energy consumed per food cell grown.
    #[serde(default = "default_energy_per_food")]
    pub energy_per_cell: i64,

    /// Chance that an empty orthogonal neighbor is grown into per try.
    #[serde(default = "default_growth_factor")]
    pub growth_factor: f64,

    /// Free energy available before any cell has moved.
    #[serde(default = "default_initial_energy")]
    pub initial_energy: i64,

    /// The plant only grows when it can afford at least this many cells.
    #[serde(default = "default_min_growth_batch")]
    pub min_growth_batch: usize,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            max_plant_cells: default_max_plant_cells(),
            energy_per_cell: default_energy_per_food(),
            growth_factor: default_growth_factor(),
            initial_energy: default_initial_energy(),
            min_growth_batch: default_min_growth_batch(),
        }
    }
}

const fn default_report_every() -> u64 {
    50
}

fn default_eve_genome() -> String {
    "NESSWWWW".to_owned()
}

const fn default_eve_energy() -> i64 {
    30
}

fn default_genes() -> String {
    "NSEW_".to_owned()
}

const fn default_energy_per_move() -> i64 {
    1
}

const fn default_energy_per_food() -> i64 {
    10
}

const fn default_well_fed_level() -> i64 {
    40
}

const fn default_maturity() -> u64 {
    3
}

const fn default_max_cells() -> usize {
    1000
}

const fn default_max_plant_cells() -> usize {
    880
}

const fn default_growth_factor() -> f64 {
    0.3
}

const fn default_initial_energy() -> i64 {
    400
}

const fn default_min_growth_batch() -> usize {
    20
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_run() {
        let config = EcologyConfig::default();
        assert_eq!(config.cells.eve_genome, "NESSWWWW");
        assert_eq!(config.cells.well_fed_level, 40);
        assert_eq!(config.cells.maturity, 3);
        assert_eq!(config.plant.max_plant_cells, 880);
        assert_eq!(config.plant.energy_per_cell, 10);
    }

    #[test]
    fn partial_section_keeps_defaults() {
        let yaml = "
cells:
  eve_genome: NNNN
plant:
  growth_factor: 1.0
";
        let config: EcologyConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.cells.eve_genome, "NNNN");
        assert_eq!(config.cells.energy_per_move, 1);
        assert!((config.plant.growth_factor - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.report_every, 50);
    }
}
