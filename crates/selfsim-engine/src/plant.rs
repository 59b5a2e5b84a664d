//! The plant: an unplaced entity that owns every food cell on the grid.
//!
//! The plant holds a pool of free energy, refilled by the movement cost
//! cells announce on [`ENERGY_FREED`]. When the pool affords a batch of new
//! cells it grows food into empty orthogonal neighbors of its existing
//! cells, newest first, each neighbor taken with probability
//! `growth_factor`. A plant whose cells were all eaten regrows from its
//! root cell once that cell is free.

use rand::Rng;
use selfsim_core::{Context, Entity, EntityError};
use selfsim_events::{HandlerError, Message};
use selfsim_types::{Coord, EntityId, Neighborhood, Occupant};
use tracing::{debug, warn};

use crate::ecology::{ENERGY_FREED, PLANT_CELL_EATEN, PlantConfig};

const MAX_GROWTH_PASSES: usize = 10;

/// Food-growing plant.
#[derive(Debug)]
pub struct Plant {
    config: PlantConfig,
    root: Coord,
    energy: i64,
    cells: Vec<(EntityId, Coord)>,
}

impl Plant {
    /// A plant whose first food cell will sit at `root`.
    pub const fn new(config: PlantConfig, root: Coord) -> Self {
        let energy = config.initial_energy;
        Self {
            config,
            root,
            energy,
            cells: Vec::new(),
        }
    }

    /// Food cells the plant currently owns.
    pub const fn size(&self) -> usize {
        self.cells.len()
    }

    /// Free energy in the pool.
    pub const fn energy(&self) -> i64 {
        self.energy
    }

    fn affordable(&self) -> usize {
        let room = self.config.max_plant_cells.saturating_sub(self.cells.len());
        let budget = self
            .energy
            .checked_div(self.config.energy_per_cell)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        room.min(budget)
    }

    fn grow(&mut self, ctx: &mut Context<'_>) -> usize {
        let wanted = self.affordable();
        if wanted == 0 {
            return 0;
        }
        if self.cells.is_empty() {
            return usize::from(self.reroot(ctx));
        }
        if wanted < self.config.min_growth_batch {
            return 0;
        }

        let mut grown = 0_usize;
        for _ in 0..MAX_GROWTH_PASSES {
            let mut candidates = false;
            for index in (0..self.cells.len()).rev() {
                if grown >= wanted {
                    break;
                }
                let Some(&(_, coord)) = self.cells.get(index) else {
                    continue;
                };
                let empty = ctx
                    .world()
                    .empty_neighbors_of(coord, Neighborhood::VonNeumann);
                candidates |= !empty.is_empty();
                for target in empty {
                    if ctx.rng().random::<f64>() < self.config.growth_factor {
                        if self.sprout(ctx, target) {
                            grown = grown.saturating_add(1);
                        }
                        break;
                    }
                }
            }
            if grown >= wanted || !candidates {
                break;
            }
        }

        let spent = i64::try_from(grown)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.config.energy_per_cell);
        self.energy = self.energy.saturating_sub(spent);
        grown
    }

    /// Regrow from the root after every food cell was eaten.
    fn reroot(&mut self, ctx: &mut Context<'_>) -> bool {
        if !ctx.world().is_empty(self.root) || !self.sprout(ctx, self.root) {
            return false;
        }
        self.energy = self.energy.saturating_sub(self.config.energy_per_cell);
        true
    }

    fn sprout(&mut self, ctx: &mut Context<'_>, at: Coord) -> bool {
        let id = match ctx.allocate_id() {
            Ok(id) => id,
            Err(e) => {
                warn!(at = %at, error = %e, "Food cell not placed");
                return false;
            }
        };
        match ctx.world_mut().place(at, Occupant::food(id)) {
            Ok(()) => {
                self.cells.push((id, at));
                true
            }
            Err(e) => {
                debug!(at = %at, error = %e, "Food cell not placed");
                false
            }
        }
    }
}

impl Entity for Plant {
    fn label(&self) -> &str {
        "plant"
    }

    fn subscription_topics(&self) -> Vec<String> {
        vec![ENERGY_FREED.to_owned(), PLANT_CELL_EATEN.to_owned()]
    }

    fn on_joined(&mut self, ctx: &mut Context<'_>) {
        if !self.sprout(ctx, self.root) {
            warn!(entity_id = %ctx.me(), root = %self.root, "Plant root cell is occupied");
        }
    }

    fn tick(&mut self, ctx: &mut Context<'_>) -> Result<(), EntityError> {
        // Food can also leave the grid without a message, e.g. when a
        // caller clears cells directly.
        let world = ctx.world();
        self.cells
            .retain(|&(id, coord)| world.position_of(id) == Some(coord));

        let grown = self.grow(ctx);
        if grown > 0 {
            debug!(
                tick = ctx.now(),
                grown,
                size = self.size(),
                energy = self.energy(),
                "Plant grew"
            );
        }
        Ok(())
    }

    fn handle_message(
        &mut self,
        message: &Message,
        _ctx: &mut Context<'_>,
    ) -> Result<(), HandlerError> {
        if message.is(ENERGY_FREED) {
            let units = message.get_i64("units")?;
            if units < 0 {
                return Err(HandlerError::rejected(format!(
                    "negative energy {units} from {}",
                    message.sender
                )));
            }
            self.energy = self.energy.saturating_add(units);
        } else if message.is(PLANT_CELL_EATEN) {
            let id = EntityId(message.get_u64("id")?);
            self.cells.retain(|&(cell, _)| cell != id);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use selfsim_core::{Simulation, SimulationConfig};
    use selfsim_types::OccupantKind;

    use super::*;

    fn sim(size: usize) -> Simulation {
        let mut config = SimulationConfig::default();
        config.world.rows = size;
        config.world.columns = size;
        Simulation::new(&config).unwrap()
    }

    fn food_count(sim: &Simulation) -> usize {
        sim.world()
            .cells()
            .filter(|(_, occupant)| occupant.is_some_and(|o| o.is(OccupantKind::Food)))
            .count()
    }

    fn eager(initial_energy: i64, max_plant_cells: usize) -> PlantConfig {
        PlantConfig {
            max_plant_cells,
            energy_per_cell: 10,
            growth_factor: 1.0,
            initial_energy,
            min_growth_batch: 1,
        }
    }

    #[test]
    fn root_placed_on_join() {
        let mut sim = sim(5);
        sim.add(Plant::new(eager(0, 10), Coord::new(2, 2))).unwrap();
        assert_eq!(
            sim.world().occupant_at(Coord::new(2, 2)).map(|o| o.kind),
            Some(OccupantKind::Food)
        );
        assert_eq!(sim.organism_count(), 0);
    }

    #[test]
    fn growth_is_bounded_by_energy() {
        let mut sim = sim(9);
        sim.add(Plant::new(eager(30, 100), Coord::new(4, 4))).unwrap();
        sim.advance(5).unwrap();
        // Root plus three cells paid for from the pool.
        assert_eq!(food_count(&sim), 4);
    }

    #[test]
    fn growth_is_bounded_by_max_cells() {
        let mut sim = sim(9);
        sim.add(Plant::new(eager(1000, 6), Coord::new(4, 4))).unwrap();
        sim.advance(10).unwrap();
        assert_eq!(food_count(&sim), 6);
    }

    #[test]
    fn small_batches_wait() {
        let mut sim = sim(9);
        let mut config = eager(30, 100);
        config.min_growth_batch = 5;
        sim.add(Plant::new(config, Coord::new(4, 4))).unwrap();
        sim.advance(3).unwrap();
        assert_eq!(food_count(&sim), 1);
    }

    #[test]
    fn freed_energy_funds_growth() {
        let mut sim = sim(9);
        let plant = sim.add(Plant::new(eager(0, 100), Coord::new(4, 4))).unwrap();
        sim.step().unwrap();
        assert_eq!(food_count(&sim), 1);

        sim.post(Message::new(ENERGY_FREED, EntityId::KERNEL, sim.now()).with("units", 20));
        sim.advance(2).unwrap();
        assert_eq!(food_count(&sim), 3);
        assert!(sim.contains(plant));
    }

    #[test]
    fn regrows_from_root_after_being_eaten() {
        let mut sim = sim(5);
        sim.add(Plant::new(eager(20, 100), Coord::new(2, 2))).unwrap();
        sim.world_mut().remove(Coord::new(2, 2));
        sim.step().unwrap();
        assert_eq!(food_count(&sim), 1);
        assert!(sim.world().occupant_at(Coord::new(2, 2)).is_some());
    }

    #[test]
    fn filled_grid_stops_growing() {
        let mut sim = sim(3);
        sim.add(Plant::new(eager(10_000, 100), Coord::new(1, 1))).unwrap();
        sim.advance(5).unwrap();
        assert_eq!(food_count(&sim), 9);
    }
}
