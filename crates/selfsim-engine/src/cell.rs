//! `SimpleCell`, the genome-driven organism of the demo ecology.
//!
//! Every tick a living cell pays its movement cost back to the plant and
//! then tries, in order: eat an orthogonally adjacent food cell, clone into
//! an empty neighbor, or take the next step of its genome. A cell ready to
//! clone but boxed in by its neighbors stays where it is for the round. A
//! cell whose energy has run out drops itself instead.

use std::rc::Rc;

use rand::Rng;
use selfsim_core::{Attempt, Context, Entity, EntityError, Outcome, first_success};
use selfsim_events::Message;
use selfsim_types::{EntityId, Neighborhood, OccupantKind};
use tracing::{debug, trace};

use crate::ecology::{
    CELL_BORN, CELL_CLONED, CELL_DIED, CellConfig, ENERGY_FREED, PLANT_CELL_EATEN,
};
use crate::genome::{Gene, Genome, GenomeError, parse_genes};

/// Tunables shared by every cell of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellParams {
    /// Energy spent every tick.
    pub energy_per_move: i64,
    /// Energy gained per food cell eaten.
    pub energy_per_food: i64,
    /// Energy needed before cloning.
    pub well_fed_level: i64,
    /// Age that must be exceeded before cloning.
    pub maturity: u64,
    /// Organism count at which cloning stops.
    pub max_cells: usize,
    /// Genes a mutation may write.
    pub genes: Vec<Gene>,
}

impl CellParams {
    /// Build from the `ecology.cells` config section.
    ///
    /// # Errors
    ///
    /// Returns [`GenomeError`] if the gene alphabet does not parse.
    pub fn from_config(config: &CellConfig) -> Result<Self, GenomeError> {
        Ok(Self {
            energy_per_move: config.energy_per_move,
            energy_per_food: config.energy_per_food,
            well_fed_level: config.well_fed_level,
            maturity: config.maturity,
            max_cells: config.max_cells,
            genes: parse_genes(&config.genes)?,
        })
    }
}

const BEHAVIORS: [Attempt<SimpleCell>; 3] = [
    SimpleCell::eat,
    SimpleCell::clone_into_neighbor,
    SimpleCell::step,
];

/// A single-celled organism steered by its genome.
#[derive(Debug, Clone)]
pub struct SimpleCell {
    params: Rc<CellParams>,
    genome: Genome,
    state: usize,
    energy: i64,
    age: u64,
    generation: u32,
    parent: Option<EntityId>,
    birth_round: u64,
}

impl SimpleCell {
    /// A first-generation cell.
    pub const fn new(params: Rc<CellParams>, genome: Genome, energy: i64) -> Self {
        Self {
            params,
            genome,
            state: 0,
            energy,
            age: 0,
            generation: 0,
            parent: None,
            birth_round: 0,
        }
    }

    /// Round in which the cell joined the simulation.
    pub const fn birth_round(&self) -> u64 {
        self.birth_round
    }

    /// Ticks since birth or since the last clone.
    pub const fn age(&self) -> u64 {
        self.age
    }

    /// This cell's genome.
    pub const fn genome(&self) -> &Genome {
        &self.genome
    }

    /// Number of clonings between Eve and this cell.
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    fn eat(&mut self, ctx: &mut Context<'_>) -> Result<Outcome, EntityError> {
        let Some(here) = ctx.position() else {
            return Ok(Outcome::Declined);
        };
        let food = ctx
            .world()
            .neighbors_of_kind(here, Neighborhood::VonNeumann, OccupantKind::Food);
        if food.is_empty() {
            return Ok(Outcome::Declined);
        }
        let pick = ctx.rng().random_range(0..food.len());
        let Some(target) = food.get(pick) else {
            return Ok(Outcome::Declined);
        };
        let Some(eaten) = ctx.world_mut().remove(target.coord) else {
            return Ok(Outcome::Declined);
        };

        self.energy = self.energy.saturating_add(self.params.energy_per_food);
        let message = Message::new(PLANT_CELL_EATEN, ctx.me(), ctx.now()).with("id", eaten.id.0);
        ctx.publish(message);
        trace!(entity_id = %ctx.me(), food = %eaten.id, at = %target.coord, "Ate");
        Ok(Outcome::Done)
    }

    fn clone_into_neighbor(&mut self, ctx: &mut Context<'_>) -> Result<Outcome, EntityError> {
        let ready = self.energy >= self.params.well_fed_level
            && self.age > self.params.maturity
            && ctx.organism_count() < self.params.max_cells;
        if !ready {
            return Ok(Outcome::Declined);
        }
        let Some(here) = ctx.position() else {
            return Ok(Outcome::Declined);
        };
        let empty = ctx.world().empty_neighbors_of(here, Neighborhood::Moore);
        if empty.is_empty() {
            trace!(entity_id = %ctx.me(), at = %here, "No room to clone");
            return Ok(Outcome::Done);
        }
        let pick = ctx.rng().random_range(0..empty.len());
        let Some(&target) = empty.get(pick) else {
            return Ok(Outcome::Declined);
        };

        let share = self.energy.checked_div(2).unwrap_or(0);
        let genome = self.genome.mutated(ctx.rng(), &self.params.genes);
        let daughter = Self {
            params: Rc::clone(&self.params),
            genome,
            state: 0,
            energy: share,
            age: 0,
            generation: self.generation.saturating_add(1),
            parent: Some(ctx.me()),
            birth_round: 0,
        };
        let daughter_genome = daughter.genome.to_string();
        let child = ctx.spawn(target, daughter)?;

        self.energy = self.energy.saturating_sub(share);
        self.age = 0;

        let message = Message::new(CELL_CLONED, ctx.me(), ctx.now())
            .with("child", child.0)
            .with("genome", daughter_genome)
            .with("generation", self.generation.saturating_add(1));
        ctx.publish(message);
        debug!(entity_id = %ctx.me(), child = %child, at = %target, "Cloned");
        Ok(Outcome::Done)
    }

    fn step(&mut self, ctx: &mut Context<'_>) -> Result<Outcome, EntityError> {
        let gene = self.genome.gene(self.state);
        self.state = self
            .state
            .saturating_add(1)
            .checked_rem(self.genome.len())
            .unwrap_or(0);

        let Some(Gene::Step(direction)) = gene else {
            return Ok(Outcome::Done);
        };
        let Some(here) = ctx.position() else {
            return Ok(Outcome::Declined);
        };
        let target = ctx.world().topology().neighbor(here, direction);
        if !ctx.world().is_empty(target) {
            return Ok(Outcome::Declined);
        }
        ctx.move_self(target)?;
        Ok(Outcome::Done)
    }
}

impl Entity for SimpleCell {
    fn label(&self) -> &str {
        "simple-cell"
    }

    fn on_joined(&mut self, ctx: &mut Context<'_>) {
        self.birth_round = ctx.now();
        let mut message = Message::new(CELL_BORN, ctx.me(), ctx.now())
            .with("genome", self.genome.to_string())
            .with("generation", self.generation);
        if let Some(parent) = self.parent {
            message = message.with("parent", parent.0);
        }
        ctx.publish(message);
    }

    fn tick(&mut self, ctx: &mut Context<'_>) -> Result<(), EntityError> {
        if self.energy <= 0 {
            debug!(
                entity_id = %ctx.me(),
                born = self.birth_round(),
                age = self.age(),
                generation = self.generation(),
                genome = %self.genome(),
                "Starved"
            );
            let message = Message::new(CELL_DIED, ctx.me(), ctx.now())
                .with("age", self.age)
                .with("generation", self.generation);
            ctx.publish(message);
            ctx.drop_self();
            return Ok(());
        }

        let cost = self.params.energy_per_move;
        self.energy = self.energy.saturating_sub(cost);
        ctx.publish(Message::new(ENERGY_FREED, ctx.me(), ctx.now()).with("units", cost));

        first_success(self, ctx, &BEHAVIORS)?;
        self.age = self.age.saturating_add(1);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use selfsim_core::{Simulation, SimulationConfig};
    use selfsim_types::{Coord, Occupant};

    use super::*;
    use crate::monitor::Monitor;

    fn sim() -> Simulation {
        let mut config = SimulationConfig::default();
        config.world.rows = 6;
        config.world.columns = 6;
        Simulation::new(&config).unwrap()
    }

    fn params(configure: impl FnOnce(&mut CellConfig)) -> Rc<CellParams> {
        let mut config = CellConfig::default();
        configure(&mut config);
        Rc::new(CellParams::from_config(&config).unwrap())
    }

    fn cell(params: &Rc<CellParams>, genome: &str, energy: i64) -> SimpleCell {
        SimpleCell::new(Rc::clone(params), genome.parse().unwrap(), energy)
    }

    #[test]
    fn starving_cell_dies() {
        let mut sim = sim();
        let params = params(|_| {});
        let id = sim.spawn(Coord::new(2, 2), cell(&params, "_", 0)).unwrap();
        let summary = sim.step().unwrap();
        assert_eq!(summary.deaths, 1);
        assert!(!sim.contains(id));
        assert!(sim.world().is_empty(Coord::new(2, 2)));
    }

    #[test]
    fn follows_genome_and_wraps_state() {
        let mut sim = sim();
        let params = params(|_| {});
        let id = sim.spawn(Coord::new(2, 2), cell(&params, "NE", 10)).unwrap();
        sim.advance(3).unwrap();
        // N, E, then N again.
        assert_eq!(sim.world().position_of(id), Some(Coord::new(0, 3)));
    }

    #[test]
    fn blocked_step_stays_put() {
        let mut sim = sim();
        let params = params(|_| {});
        let id = sim.spawn(Coord::new(2, 2), cell(&params, "N", 10)).unwrap();
        let rock = sim.allocate_id().unwrap();
        sim.world_mut()
            .place(Coord::new(1, 2), Occupant::organism(rock))
            .unwrap();
        sim.step().unwrap();
        assert_eq!(sim.world().position_of(id), Some(Coord::new(2, 2)));
    }

    #[test]
    fn eats_orthogonal_food_before_moving() {
        let mut sim = sim();
        let params = params(|_| {});
        let id = sim.spawn(Coord::new(2, 2), cell(&params, "N", 5)).unwrap();
        let food = sim.allocate_id().unwrap();
        sim.world_mut()
            .place(Coord::new(2, 3), Occupant::food(food))
            .unwrap();
        sim.step().unwrap();
        assert_eq!(sim.world().position_of(food), None);
        assert_eq!(sim.world().position_of(id), Some(Coord::new(2, 2)));
    }

    #[test]
    fn diagonal_food_is_not_eaten() {
        let mut sim = sim();
        let params = params(|_| {});
        sim.spawn(Coord::new(2, 2), cell(&params, "_", 5)).unwrap();
        let food = sim.allocate_id().unwrap();
        sim.world_mut()
            .place(Coord::new(3, 3), Occupant::food(food))
            .unwrap();
        sim.step().unwrap();
        assert_eq!(sim.world().position_of(food), Some(Coord::new(3, 3)));
    }

    #[test]
    fn well_fed_mature_cell_clones() {
        let mut sim = sim();
        let params = params(|c| {
            c.maturity = 0;
            c.well_fed_level = 10;
        });
        sim.spawn(Coord::new(2, 2), cell(&params, "_", 40)).unwrap();
        // Round 0: age 0 is not past maturity, so the cell stays.
        let first = sim.step().unwrap();
        assert_eq!(first.births, 0);
        let second = sim.step().unwrap();
        assert_eq!(second.births, 1);
        assert_eq!(sim.organism_count(), 2);
    }

    #[test]
    fn population_cap_blocks_cloning() {
        let mut sim = sim();
        let params = params(|c| {
            c.maturity = 0;
            c.well_fed_level = 10;
            c.max_cells = 1;
        });
        sim.spawn(Coord::new(2, 2), cell(&params, "_", 40)).unwrap();
        sim.advance(4).unwrap();
        assert_eq!(sim.organism_count(), 1);
    }

    #[test]
    fn unplaced_entities_do_not_count_toward_the_cap() {
        let mut sim = sim();
        let params = params(|c| {
            c.maturity = 0;
            c.well_fed_level = 10;
            c.max_cells = 2;
        });
        sim.add(Monitor::new().0).unwrap();
        sim.add(Monitor::new().0).unwrap();
        sim.spawn(Coord::new(2, 2), cell(&params, "_", 40)).unwrap();
        assert_eq!(sim.population(), 3);

        sim.advance(6).unwrap();
        assert_eq!(sim.organism_count(), 2);
    }

    #[test]
    fn boxed_in_cell_waits_instead_of_stepping() {
        let mut sim = sim();
        let params = params(|c| {
            c.maturity = 0;
            c.well_fed_level = 38;
        });
        let here = Coord::new(2, 2);
        let id = sim.spawn(here, cell(&params, "NE", 40)).unwrap();
        let ring = sim.world().topology().neighbors_of(here);
        for (_, coord) in ring {
            let rock = sim.allocate_id().unwrap();
            sim.world_mut().place(coord, Occupant::organism(rock)).unwrap();
        }

        // Round 0 is too young to clone, so the blocked N step uses up the
        // first gene. Round 1 is ready to clone with no room and waits.
        sim.advance(2).unwrap();
        assert_eq!(sim.world().position_of(id), Some(here));
        for (_, coord) in ring {
            sim.world_mut().remove(coord);
        }

        // Round 2 is below the clone threshold and takes the E gene.
        let summary = sim.step().unwrap();
        assert_eq!(summary.births, 0);
        assert_eq!(sim.world().position_of(id), Some(Coord::new(2, 3)));
    }

    #[test]
    fn daughter_announces_birth_round_and_parent() {
        let mut sim = sim();
        let params = params(|c| {
            c.maturity = 0;
            c.well_fed_level = 10;
        });
        let eve = sim.spawn(Coord::new(2, 2), cell(&params, "_", 40)).unwrap();
        let eve_born = sim.post_office().pending().first().unwrap();
        assert!(eve_born.is(CELL_BORN));
        assert_eq!(eve_born.time, 0);
        assert!(eve_born.get("parent").is_none());

        sim.advance(2).unwrap();
        let pending = sim.post_office().pending();
        let born = pending.iter().find(|m| m.is(CELL_BORN)).unwrap();
        assert_ne!(born.sender, eve);
        assert_eq!(born.time, 1);
        assert_eq!(born.get_u64("parent").unwrap(), eve.0);
        assert_eq!(born.get_u64("generation").unwrap(), 1);
    }

    #[test]
    fn movement_cost_is_announced() {
        let mut sim = sim();
        let params = params(|c| c.energy_per_move = 3);
        let id = sim.spawn(Coord::new(2, 2), cell(&params, "_", 10)).unwrap();
        sim.step().unwrap();
        let pending = sim.post_office().pending();
        let freed = pending.iter().find(|m| m.is(ENERGY_FREED)).unwrap();
        assert_eq!(freed.sender, id);
        assert_eq!(freed.get_i64("units").unwrap(), 3);
    }
}
