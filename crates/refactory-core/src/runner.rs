//! Real-time run loop with operator controls.
//!
//! [`run_simulation`] wakes once per frame, turns the elapsed wall time into
//! due ticks through the [`TickScheduler`], and runs them one after another.
//! Between frames it honors pause, stop and the run limits, and applies any
//! queued [`OperatorCommand`]s. Commands are never applied mid-tick.
//!
//! Snapshots are written every `interval_ticks` ticks when an autosave store
//! is configured. A failed save or load is logged and the run continues.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use refactory_script::ScriptHost;
use refactory_store::SnapshotStore;

use crate::config::SimulationConfig;
use crate::operator::{OperatorCommand, OperatorState, SimulationEndReason};
use crate::scheduler::TickScheduler;
use crate::tick::{self, Simulation, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Ticks executed by this run.
    pub total_ticks: u64,
}

/// Periodic snapshot settings.
#[derive(Debug, Clone)]
pub struct Autosave {
    /// Where snapshots go.
    pub store: SnapshotStore,
    /// Save whenever `tick % interval_ticks == 0`.
    pub interval_ticks: u64,
}

/// Loop settings that do not change during a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// How often the loop wakes up.
    pub frame_interval: Duration,
    /// Snapshot store for autosave and the save/load commands.
    pub autosave: Option<Autosave>,
}

impl RunOptions {
    /// Options for `config`, saving to its snapshot path.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            frame_interval: Duration::from_millis(config.timing.frame_interval_ms.max(1)),
            autosave: Some(Autosave {
                store: SnapshotStore::new(config.persistence.snapshot_path.clone()),
                interval_ticks: config.persistence.interval_ticks,
            }),
        }
    }

    fn store(&self) -> Option<&SnapshotStore> {
        self.autosave.as_ref().map(|a| &a.store)
    }
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, sim: &Simulation);
}

/// A tick callback that does nothing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _sim: &Simulation) {}
}

/// Run the loop until a limit is reached or the operator stops it.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick breaks a world invariant. Robot
/// script faults never end the run.
pub async fn run_simulation(
    sim: &mut Simulation,
    host: &mut dyn ScriptHost,
    scheduler: &mut TickScheduler,
    operator: &Arc<OperatorState>,
    options: &RunOptions,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        tick = sim.world.tick,
        speed = operator.speed(),
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        "simulation starting"
    );

    let mut frames = tokio::time::interval(options.frame_interval.max(Duration::from_millis(1)));
    frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_frame = Instant::now();

    loop {
        // --- Pause ---
        if operator.is_paused() && !operator.is_stop_requested() {
            info!(tick = sim.world.tick, "simulation paused");
            operator.wait_if_paused().await;
            scheduler.reset();
            last_frame = Instant::now();
            info!(tick = sim.world.tick, "simulation resumed");
        }

        // --- Stop and limits ---
        if let Some(reason) = end_condition(operator, sim.world.tick) {
            operator.set_end_reason(reason).await;
            return Ok(SimulationResult {
                end_reason: reason,
                final_summary: last_summary,
                total_ticks,
            });
        }

        // --- Commands ---
        for command in operator.drain_commands().await {
            apply_command(sim, scheduler, operator, options.store(), command).await;
        }

        // --- Frame ---
        frames.tick().await;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(last_frame);
        last_frame = now;
        let due = scheduler.accumulate(elapsed, operator.speed());

        for _ in 0..due {
            if operator.is_paused() || operator.is_stop_requested() {
                break;
            }
            let summary = tick::run_tick(sim, host)?;
            total_ticks = total_ticks.saturating_add(1);
            callback.on_tick(&summary, sim);

            if let Some(autosave) = options.autosave.as_ref() {
                if summary.tick.checked_rem(autosave.interval_ticks) == Some(0) {
                    if let Err(e) = autosave.store.save(&sim.world).await {
                        warn!(tick = summary.tick, error = %e, "autosave failed");
                    }
                }
            }

            if operator.tick_limit_reached(summary.tick) {
                info!(
                    tick = summary.tick,
                    max_ticks = operator.max_ticks(),
                    "tick limit reached"
                );
                let reason = SimulationEndReason::MaxTicksReached;
                operator.set_end_reason(reason).await;
                return Ok(SimulationResult {
                    end_reason: reason,
                    final_summary: Some(summary),
                    total_ticks,
                });
            }
            last_summary = Some(summary);
        }
    }
}

fn end_condition(operator: &OperatorState, tick: u64) -> Option<SimulationEndReason> {
    if operator.is_stop_requested() {
        info!(tick, "operator stop requested");
        return Some(SimulationEndReason::OperatorStop);
    }
    if operator.tick_limit_reached(tick) {
        info!(tick, max_ticks = operator.max_ticks(), "tick limit reached");
        return Some(SimulationEndReason::MaxTicksReached);
    }
    if operator.time_limit_reached() {
        info!(
            max_seconds = operator.max_real_time_seconds(),
            elapsed = operator.elapsed_seconds(),
            "real-time limit reached"
        );
        return Some(SimulationEndReason::MaxRealTimeReached);
    }
    None
}

async fn apply_command(
    sim: &mut Simulation,
    scheduler: &mut TickScheduler,
    operator: &OperatorState,
    store: Option<&SnapshotStore>,
    command: OperatorCommand,
) {
    match command {
        OperatorCommand::SelectScript(name) => {
            if let Err(e) = sim.select_script(&name) {
                warn!(error = %e, "select script rejected");
            }
        }
        OperatorCommand::EditScript { script, source } => {
            if let Err(e) = sim.edit_script(&script, source) {
                warn!(error = %e, "edit script rejected");
            }
        }
        OperatorCommand::AddScript { name, source } => {
            sim.add_script(name, source);
        }
        OperatorCommand::Reset => {
            sim.reset();
            scheduler.reset();
        }
        OperatorCommand::SaveSnapshot => {
            let Some(store) = store else {
                warn!("no snapshot store configured");
                return;
            };
            if let Err(e) = store.save(&sim.world).await {
                warn!(error = %e, "snapshot save failed");
            }
        }
        OperatorCommand::LoadSnapshot => {
            let Some(store) = store else {
                warn!("no snapshot store configured");
                return;
            };
            match store.load().await {
                Ok(snapshot) => {
                    sim.replace_world(snapshot.state);
                    scheduler.reset();
                }
                Err(e) => warn!(error = %e, "snapshot load failed; keeping current world"),
            }
        }
        OperatorCommand::ReportStatus => {
            let status = operator
                .status(sim.world.tick, sim.world.robots.len(), sim.world.quota_level)
                .await;
            info!(
                tick = status.tick,
                paused = status.paused,
                speed = status.speed,
                energy = %sim.world.energy.current,
                max_energy = %sim.world.energy.max,
                robots = status.robots,
                quota_level = status.quota_level,
                quota_progress = sim.quota_progress(),
                quota_ticks_left = sim.quota_time_remaining(),
                elapsed_seconds = status.elapsed_seconds,
                "status"
            );
        }
    }
}

/// Log the end of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            energy = %summary.energy.closing,
            faults = summary.scripts.faults.len(),
            "final tick summary"
        );
    } else {
        warn!("simulation ended with no ticks executed");
    }
}
