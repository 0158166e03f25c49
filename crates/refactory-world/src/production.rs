//! Per-tick machine production.
//!
//! For each active machine with a recipe:
//!
//! 1. Inputs short: progress resets to 0, no energy is drawn.
//! 2. Energy share (`energy_cost / production_time`) cannot be drawn: the
//!    machine is deactivated, progress is kept.
//! 3. Otherwise progress advances by one. At `production_time` the inputs
//!    are deducted, the outputs credited, and progress returns to 0.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use refactory_ledger::EnergyLedger;
use refactory_types::{Machine, MachineId, Recipe, RecipeItem, WorldState};

use crate::error::WorldError;

/// Outcome of one production step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductionReport {
    /// Machines that advanced their cycle.
    pub progressed: Vec<MachineId>,
    /// Cycles completed this tick, with the outputs they credited.
    pub completed: Vec<(MachineId, Vec<RecipeItem>)>,
    /// Machines switched off for lack of energy.
    pub deactivated: Vec<MachineId>,
    /// Machines whose progress reset because inputs ran short.
    pub starved: Vec<MachineId>,
    /// Machines switched off because their recipe cannot run.
    pub rejected: Vec<MachineId>,
    /// Energy drawn across all machines.
    pub energy_drawn: Decimal,
}

/// Energy drawn by `recipe` on each tick of progress.
pub fn energy_per_tick(recipe: &Recipe) -> Result<Decimal, WorldError> {
    if recipe.production_time == 0 {
        return Err(WorldError::InvalidRecipe {
            recipe: recipe.id.clone(),
            reason: "production time must be positive",
        });
    }
    recipe
        .energy_cost
        .checked_div(Decimal::from(recipe.production_time))
        .ok_or(WorldError::ArithmeticOverflow)
}

fn has_inputs(machine: &Machine, recipe: &Recipe) -> bool {
    recipe
        .inputs
        .iter()
        .all(|input| machine.input_amount(input.kind) >= input.amount)
}

/// Deduct inputs and credit outputs for one finished cycle.
fn complete_cycle(machine: &mut Machine, recipe: &Recipe) -> Result<(), WorldError> {
    for input in &recipe.inputs {
        let slot = machine.inventory.entry(input.kind).or_insert(0);
        *slot = slot
            .checked_sub(input.amount)
            .ok_or(WorldError::ArithmeticOverflow)?;
    }
    for output in &recipe.outputs {
        let slot = machine.output_inventory.entry(output.kind).or_insert(0);
        *slot = slot
            .checked_add(output.amount)
            .ok_or(WorldError::ArithmeticOverflow)?;
    }
    machine.progress = 0;
    Ok(())
}

/// Advance every active machine by one tick.
///
/// A machine with an unusable recipe is switched off and listed in
/// [`ProductionReport::rejected`]; the other machines still run.
pub fn run_production(world: &mut WorldState) -> Result<ProductionReport, WorldError> {
    let mut report = ProductionReport::default();
    let WorldState {
        machines, energy, ..
    } = world;
    let mut ledger = EnergyLedger::new(energy);

    for machine in machines.iter_mut() {
        if !machine.active {
            continue;
        }
        let Some(recipe) = machine.recipe.clone() else {
            continue;
        };

        let share = match energy_per_tick(&recipe) {
            Ok(share) => share,
            Err(e) => {
                machine.active = false;
                machine.progress = 0;
                warn!(
                    machine_id = %machine.id,
                    recipe = %recipe.id,
                    error = %e,
                    "machine deactivated: unusable recipe"
                );
                report.rejected.push(machine.id);
                continue;
            }
        };

        if !has_inputs(machine, &recipe) {
            if machine.progress != 0 {
                debug!(machine_id = %machine.id, "inputs short, production progress reset");
            }
            machine.progress = 0;
            report.starved.push(machine.id);
            continue;
        }

        if !ledger.try_consume(share) {
            machine.active = false;
            warn!(
                machine_id = %machine.id,
                recipe = %recipe.id,
                needed = %share,
                available = %ledger.current(),
                "machine deactivated: insufficient energy"
            );
            report.deactivated.push(machine.id);
            continue;
        }
        report.energy_drawn = report.energy_drawn.saturating_add(share);

        machine.progress = machine
            .progress
            .checked_add(1)
            .ok_or(WorldError::ArithmeticOverflow)?;
        report.progressed.push(machine.id);

        if machine.progress >= recipe.production_time {
            complete_cycle(machine, &recipe)?;
            debug!(machine_id = %machine.id, recipe = %recipe.id, "production cycle complete");
            report.completed.push((machine.id, recipe.outputs.clone()));
        }
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use refactory_types::{EnergyPool, MachineKind, Position, ResourceKind};

    use super::*;

    fn iron_recipe() -> Recipe {
        Recipe {
            id: "plate".to_owned(),
            name: "Iron Plate".to_owned(),
            inputs: vec![RecipeItem {
                kind: ResourceKind::Iron,
                amount: 2,
            }],
            outputs: vec![RecipeItem {
                kind: ResourceKind::Circuit,
                amount: 1,
            }],
            production_time: 10,
            energy_cost: dec!(5),
        }
    }

    fn world(energy: Decimal, iron: u32) -> WorldState {
        let mut machine = Machine::new(
            MachineId::new(),
            MachineKind::Processor,
            Position::default(),
            Some(iron_recipe()),
        );
        machine.inventory.insert(ResourceKind::Iron, iron);
        let mut world = WorldState::default();
        world.energy = EnergyPool {
            current: energy,
            max: dec!(1000),
            regen_rate: Decimal::ZERO,
        };
        world.machines.push(machine);
        world
    }

    #[test]
    fn produces_on_the_tenth_tick() {
        let mut world = world(dec!(100), 2);
        for _ in 0..9 {
            let report = run_production(&mut world).unwrap();
            assert!(report.completed.is_empty());
        }
        let report = run_production(&mut world).unwrap();
        assert_eq!(report.completed.len(), 1);

        let machine = world.machines.first().unwrap();
        assert_eq!(machine.output_amount(ResourceKind::Circuit), 1);
        assert_eq!(machine.input_amount(ResourceKind::Iron), 0);
        assert_eq!(machine.progress, 0);
        assert_eq!(world.energy.current, dec!(95));
    }

    #[test]
    fn depleted_inputs_reset_progress() {
        let mut world = world(dec!(100), 2);
        for _ in 0..4 {
            let _ = run_production(&mut world).unwrap();
        }
        assert_eq!(world.machines.first().unwrap().progress, 4);

        world
            .machines
            .first_mut()
            .unwrap()
            .inventory
            .insert(ResourceKind::Iron, 1);
        let report = run_production(&mut world).unwrap();
        let machine = world.machines.first().unwrap();
        assert_eq!(machine.progress, 0);
        assert_eq!(report.starved, vec![machine.id]);
        assert_eq!(machine.output_amount(ResourceKind::Circuit), 0);
    }

    #[test]
    fn missing_inputs_draw_no_energy() {
        let mut world = world(dec!(100), 0);
        let _ = run_production(&mut world).unwrap();
        assert_eq!(world.energy.current, dec!(100));
    }

    #[test]
    fn energy_shortfall_deactivates_without_reset() {
        let mut world = world(dec!(1), 2);
        let _ = run_production(&mut world).unwrap();
        let _ = run_production(&mut world).unwrap();
        assert_eq!(world.machines.first().unwrap().progress, 2);

        let report = run_production(&mut world).unwrap();
        let machine = world.machines.first().unwrap();
        assert!(!machine.active);
        assert_eq!(machine.progress, 2);
        assert_eq!(report.deactivated, vec![machine.id]);

        let report = run_production(&mut world).unwrap();
        assert!(report.progressed.is_empty());
    }

    #[test]
    fn zero_production_time_is_rejected() {
        let mut recipe = iron_recipe();
        recipe.production_time = 0;
        assert!(energy_per_tick(&recipe).is_err());
    }

    #[test]
    fn unusable_recipe_is_switched_off_and_others_run() {
        let mut world = world(dec!(100), 2);
        let mut broken = iron_recipe();
        broken.production_time = 0;
        let mut bad = Machine::new(
            MachineId::new(),
            MachineKind::Assembler,
            Position::default(),
            Some(broken),
        );
        bad.inventory.insert(ResourceKind::Iron, 2);
        world.machines.insert(0, bad);

        let report = run_production(&mut world).unwrap();
        let bad = world.machines.first().unwrap();
        let good = world.machines.get(1).unwrap();
        assert!(!bad.active);
        assert_eq!(report.rejected, vec![bad.id]);
        assert_eq!(report.progressed, vec![good.id]);
        assert_eq!(good.progress, 1);
        assert_eq!(world.energy.current, dec!(99.5));

        let report = run_production(&mut world).unwrap();
        assert!(report.rejected.is_empty());
        assert_eq!(world.machines.get(1).unwrap().progress, 2);
    }
}
