//! Tick callback that reports progress through the log.
//!
//! Quota transitions and granted robots are logged when they happen; a
//! summary line is written every `every_ticks` ticks.

use tracing::{debug, info};

use refactory_core::runner::TickCallback;
use refactory_core::tick::{Simulation, TickSummary};
use refactory_world::QuotaOutcome;

/// Logs the state of the floor as the run progresses.
pub struct ProgressLog {
    every_ticks: u64,
    faults_since_report: usize,
}

impl ProgressLog {
    /// Report every `every_ticks` ticks (0 disables periodic lines).
    pub const fn new(every_ticks: u64) -> Self {
        Self {
            every_ticks,
            faults_since_report: 0,
        }
    }
}

impl TickCallback for ProgressLog {
    fn on_tick(&mut self, summary: &TickSummary, sim: &Simulation) {
        self.faults_since_report = self
            .faults_since_report
            .saturating_add(summary.scripts.faults.len());

        match &summary.quota {
            QuotaOutcome::Completed {
                entry,
                granted_robot: Some(robot_id),
                ..
            } => info!(tick = summary.tick, level = entry.level, robot_id = %robot_id, "robot granted"),
            QuotaOutcome::Failed { entry } => {
                debug!(tick = summary.tick, level = entry.level, "quota restarted");
            }
            _ => {}
        }

        if self.every_ticks == 0 || summary.tick.checked_rem(self.every_ticks) != Some(0) {
            return;
        }
        info!(
            tick = summary.tick,
            energy = %sim.world.energy.current,
            robots = sim.world.robots.len(),
            piles = sim.world.spawned_resources.len(),
            quota_level = sim.world.quota_level,
            quota_progress = sim.quota_progress(),
            quota_ticks_left = sim.quota_time_remaining(),
            script_faults = self.faults_since_report,
            "progress"
        );
        self.faults_since_report = 0;
    }
}
