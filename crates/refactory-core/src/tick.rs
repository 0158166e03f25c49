//! Tick pipeline: the fixed phase order that advances the factory floor.
//!
//! Each tick runs these phases, one after another and never overlapping:
//!
//! 1. **Wake** -- advance the tick counter, regenerate the energy pool.
//! 2. **Spawn** -- place any resource piles due this tick.
//! 3. **Scripts** -- run the active script once per robot, in list order.
//! 4. **Movement** -- step moving robots toward their targets.
//! 5. **Production** -- advance machine recipes.
//! 6. **Quota** -- complete, fail, or keep the active quota.
//!
//! The pool is audited across the whole tick and must end in bounds.
//! Robot faults never surface here; only broken world invariants do.

use tracing::{debug, info};

use refactory_ledger::{AuditReport, EnergyAudit, EnergyLedger};
use refactory_robots::ActionRules;
use refactory_script::{ScriptBudget, ScriptHost};
use refactory_types::{PlayerScript, ScriptId, SpawnedResourceId, WorldState};
use refactory_world::{
    GrantedRobotTemplate, MovementReport, ProductionReport, QuotaController, QuotaOutcome,
    Spawner, StartingWorldConfig, advance_robots, create_starting_world, run_production,
};

use crate::config::SimulationConfig;
use crate::sandbox::{self, SandboxReport};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The tick counter would overflow.
    #[error("tick counter overflow")]
    TickOverflow,

    /// A world operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: refactory_world::WorldError,
    },

    /// The energy pool broke its bounds.
    #[error("energy ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: refactory_ledger::LedgerError,
    },

    /// A script command named a script that does not exist.
    #[error("no script named or identified by {reference:?}")]
    UnknownScript {
        /// What the operator asked for.
        reference: String,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Piles spawned this tick.
    pub spawned: Vec<SpawnedResourceId>,
    /// Script phase results.
    pub scripts: SandboxReport,
    /// Movement phase results.
    pub movement: MovementReport,
    /// Production phase results.
    pub production: ProductionReport,
    /// Quota phase result.
    pub quota: QuotaOutcome,
    /// Energy flow across the tick.
    pub energy: AuditReport,
}

/// The mutable simulation state passed through the tick cycle.
#[derive(Debug)]
pub struct Simulation {
    /// The factory floor.
    pub world: WorldState,
    spawner: Spawner,
    quotas: QuotaController,
    rules: ActionRules,
    budget: ScriptBudget,
    starting: StartingWorldConfig,
    starter_scripts: Vec<PlayerScript>,
}

impl Simulation {
    /// Fresh session from `config`, with `scripts` as the player's
    /// collection. The first script starts active.
    pub fn new(config: &SimulationConfig, scripts: Vec<PlayerScript>) -> Result<Self, TickError> {
        let spawner = Spawner::new(config.spawner.clone())?;
        let quotas = QuotaController::with_default_progression(GrantedRobotTemplate {
            origin: config.world.robot_start,
            speed: config.world.robot_speed,
            energy: config.world.robot_energy,
        });
        let mut sim = Self {
            world: WorldState::default(),
            spawner,
            quotas,
            rules: config.actions,
            budget: config.script.budget,
            starting: config.world.clone(),
            starter_scripts: scripts,
        };
        sim.reset();
        Ok(sim)
    }

    /// Return to the tick-0 floor with the original scripts.
    pub fn reset(&mut self) {
        let mut world = create_starting_world(
            &self.starting,
            self.starter_scripts.clone(),
            self.quotas.first(),
        );
        let placed = self
            .spawner
            .seed_initial(&mut world, self.starting.robot_start);
        self.world = world;
        info!(placed, "session reset");
    }

    /// Swap in a restored world.
    pub fn replace_world(&mut self, world: WorldState) {
        info!(tick = world.tick, robots = world.robots.len(), "world replaced");
        self.world = world;
    }

    /// Action costs and ranges in force.
    pub const fn rules(&self) -> &ActionRules {
        &self.rules
    }

    /// Per-invocation script limits.
    pub const fn budget(&self) -> &ScriptBudget {
        &self.budget
    }

    /// Quota driver.
    pub const fn quotas(&self) -> &QuotaController {
        &self.quotas
    }

    /// Fraction of the active quota achieved, in `[0, 1]`.
    pub fn quota_progress(&self) -> f64 {
        QuotaController::progress(&self.world)
    }

    /// Ticks left on the active quota.
    pub const fn quota_time_remaining(&self) -> u64 {
        QuotaController::time_remaining(&self.world)
    }

    // -----------------------------------------------------------------------
    // Script collection
    // -----------------------------------------------------------------------

    fn find_script(&self, reference: &str) -> Result<ScriptId, TickError> {
        self.world
            .scripts
            .iter()
            .find(|s| s.name == reference || s.id.to_string() == reference)
            .map(|s| s.id)
            .ok_or_else(|| TickError::UnknownScript {
                reference: reference.to_owned(),
            })
    }

    /// Make the script with this name or id the active one.
    pub fn select_script(&mut self, reference: &str) -> Result<ScriptId, TickError> {
        let id = self.find_script(reference)?;
        self.world.active_script = Some(id);
        info!(script_id = %id, "active script selected");
        Ok(id)
    }

    /// Replace a script's source. Its statistics restart.
    pub fn edit_script(&mut self, reference: &str, source: String) -> Result<ScriptId, TickError> {
        let id = self.find_script(reference)?;
        if let Some(script) = self.world.script_mut(id) {
            script.source = source;
            script.last_modified = chrono::Utc::now();
            script.stats = refactory_types::ScriptStats::default();
        }
        info!(script_id = %id, "script edited");
        Ok(id)
    }

    /// Add a script to the collection without selecting it.
    pub fn add_script(&mut self, name: String, source: String) -> ScriptId {
        let script = PlayerScript::new(name, source);
        let id = script.id;
        info!(script_id = %id, name = %script.name, "script added");
        self.world.scripts.push(script);
        id
    }
}

/// Run one tick.
pub fn run_tick(sim: &mut Simulation, host: &mut dyn ScriptHost) -> Result<TickSummary, TickError> {
    // --- Wake ---
    let tick = sim
        .world
        .tick
        .checked_add(1)
        .ok_or(TickError::TickOverflow)?;
    sim.world.tick = tick;
    let mut audit = EnergyAudit::open(tick, &sim.world.energy);
    let regenerated = EnergyLedger::new(&mut sim.world.energy).regenerate();
    audit.record_credit(regenerated);
    debug!(tick, energy = %sim.world.energy.current, "tick start");

    // --- Spawn ---
    let spawned = sim.spawner.spawn_due(&mut sim.world, tick);

    // --- Scripts ---
    let scripts = sandbox::execute_all_robots(&mut sim.world, host, &sim.rules, &sim.budget);

    // --- Movement ---
    let movement = advance_robots(&mut sim.world);

    // --- Production ---
    let production = run_production(&mut sim.world)?;

    // --- Quota ---
    let quota = sim.quotas.evaluate(&mut sim.world)?;
    if let QuotaOutcome::Completed {
        energy_credited, ..
    } = &quota
    {
        audit.record_credit(*energy_credited);
    }

    let energy = audit.close(&sim.world.energy)?;
    debug!(
        tick,
        credits = %energy.credits,
        debits = %energy.debits,
        faults = scripts.faults.len(),
        "tick end"
    );

    Ok(TickSummary {
        tick,
        spawned,
        scripts,
        movement,
        production,
        quota,
        energy,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use refactory_script::{NativeHost, ScriptFault, ScriptRobot, starter_script};
    use refactory_types::{Position, ResourceKind, RobotStatus};

    use super::*;

    fn idle_host() -> NativeHost<impl FnMut(&ScriptRobot) -> Result<(), ScriptFault>> {
        NativeHost::new(|_: &ScriptRobot| Ok(()))
    }

    fn session() -> Simulation {
        Simulation::new(&SimulationConfig::default(), vec![starter_script()]).unwrap()
    }

    #[test]
    fn new_session_matches_starting_floor() {
        let sim = session();
        assert_eq!(sim.world.tick, 0);
        assert_eq!(sim.world.robots.len(), 1);
        assert_eq!(sim.world.machines.len(), 2);
        assert_eq!(sim.world.spawned_resources.len(), 5);
        assert_eq!(sim.world.energy.current, dec!(1000));
        assert!(sim.world.active_script().is_some());
        assert_eq!(sim.quota_time_remaining(), 9000);
    }

    #[test]
    fn tick_advances_counter_and_audits_energy() {
        let mut sim = session();
        let mut host = idle_host();
        sim.world.energy.current = dec!(500);

        let summary = run_tick(&mut sim, &mut host).unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.energy.credits, dec!(0.8));
        assert_eq!(summary.energy.debits, dec!(0.01));
        assert_eq!(sim.world.energy.current, dec!(500.79));
    }

    #[test]
    fn spawns_follow_cadence() {
        let mut sim = session();
        let mut host = idle_host();
        let mut spawned = 0_usize;
        for _ in 0..180 {
            let summary = run_tick(&mut sim, &mut host).unwrap();
            spawned = spawned.saturating_add(summary.spawned.len());
        }
        // iron at 60, 120, 180; copper at 90, 180
        assert_eq!(spawned, 5);
    }

    #[test]
    fn movement_runs_after_scripts_in_same_tick() {
        let mut sim = session();
        let mut host = NativeHost::new(|r: &ScriptRobot| {
            if r.status()? == RobotStatus::Idle {
                r.move_to(Position::new(110.0, 100.0))?;
            }
            Ok(())
        });
        run_tick(&mut sim, &mut host).unwrap();
        let robot = sim.world.robots.first().unwrap();
        assert_eq!(robot.position, Position::new(102.0, 100.0));
        assert_eq!(robot.status, RobotStatus::Moving);
    }

    #[test]
    fn quota_completion_is_detected_after_production() {
        let mut sim = session();
        let mut host = idle_host();
        sim.world
            .resources
            .get_mut(&ResourceKind::Iron)
            .unwrap()
            .amount = 50;
        let summary = run_tick(&mut sim, &mut host).unwrap();
        assert!(matches!(summary.quota, QuotaOutcome::Completed { .. }));
        assert_eq!(sim.world.robots.len(), 2);
        assert_eq!(sim.world.quota_history.len(), 1);
    }

    #[test]
    fn reset_restores_tick_zero() {
        let mut sim = session();
        let mut host = idle_host();
        let first_piles: Vec<Position> =
            sim.world.spawned_resources.iter().map(|p| p.position).collect();
        for _ in 0..70 {
            run_tick(&mut sim, &mut host).unwrap();
        }
        sim.add_script("Scratch".to_owned(), String::new());
        sim.reset();

        assert_eq!(sim.world.tick, 0);
        assert_eq!(sim.world.scripts.len(), 1);
        let piles: Vec<Position> = sim.world.spawned_resources.iter().map(|p| p.position).collect();
        assert_eq!(piles, first_piles);
    }

    #[test]
    fn script_commands_resolve_by_name() {
        let mut sim = session();
        let id = sim.add_script("Scout".to_owned(), "fn update(robot) {}".to_owned());
        assert_ne!(sim.world.active_script, Some(id));

        assert_eq!(sim.select_script("Scout").unwrap(), id);
        assert_eq!(sim.world.active_script, Some(id));

        sim.edit_script(&id.to_string(), "// empty".to_owned()).unwrap();
        assert_eq!(sim.world.active_script().unwrap().source, "// empty");

        assert!(matches!(
            sim.select_script("Missing"),
            Err(TickError::UnknownScript { .. })
        ));
    }

    #[test]
    fn empty_pool_never_goes_negative() {
        let mut sim = session();
        sim.world.energy.current = Decimal::ZERO;
        sim.world.energy.regen_rate = Decimal::ZERO;
        let mut host = NativeHost::new(|r: &ScriptRobot| {
            r.move_to(Position::new(0.0, 0.0))?;
            Ok(())
        });
        for _ in 0..3 {
            let summary = run_tick(&mut sim, &mut host).unwrap();
            assert_eq!(summary.energy.closing, Decimal::ZERO);
        }
        assert_eq!(
            sim.world.robots.first().unwrap().status,
            RobotStatus::Error
        );
    }
}
