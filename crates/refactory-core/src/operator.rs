//! Operator control state shared between the run loop and the console.
//!
//! The operator can pause and resume, change the game speed, queue script
//! and snapshot commands, and request a clean shutdown while the loop keeps
//! running. Flags and speed are atomics so the loop reads them without
//! locking; queued commands sit behind an async mutex and are drained
//! between ticks, never during one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::{SimulationBoundsConfig, TimingConfig};

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// A command applied between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorCommand {
    /// Make the named script active.
    SelectScript(String),
    /// Replace a script's source.
    EditScript {
        /// Script name or id.
        script: String,
        /// New source text.
        source: String,
    },
    /// Add a script to the collection.
    AddScript {
        /// Display name.
        name: String,
        /// Source text.
        source: String,
    },
    /// Return to the tick-0 floor.
    Reset,
    /// Write a snapshot now.
    SaveSnapshot,
    /// Replace the world with the stored snapshot.
    LoadSnapshot,
    /// Log a status line for the current tick.
    ReportStatus,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    paused: AtomicBool,
    resume_notify: Notify,
    stop_requested: AtomicBool,
    /// Game speed as `f64` bits.
    speed_bits: AtomicU64,
    min_speed: f64,
    max_speed: f64,
    started_at: DateTime<Utc>,
    max_ticks: u64,
    max_real_time_seconds: u64,
    commands: Mutex<Vec<OperatorCommand>>,
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create operator state from configuration.
    pub fn new(timing: &TimingConfig, bounds: &SimulationBoundsConfig) -> Self {
        let initial = timing.initial_speed.clamp(timing.min_speed, timing.max_speed);
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            speed_bits: AtomicU64::new(initial.to_bits()),
            min_speed: timing.min_speed,
            max_speed: timing.max_speed,
            started_at: Utc::now(),
            max_ticks: bounds.max_ticks,
            max_real_time_seconds: bounds.max_real_time_seconds,
            commands: Mutex::new(Vec::new()),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the simulation. The run loop sleeps until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the simulation and wake the run loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Flip between paused and running. Returns the new paused state.
    pub fn toggle_pause(&self) -> bool {
        if self.is_paused() {
            self.resume();
            false
        } else {
            self.pause();
            true
        }
    }

    /// Wait until the simulation is no longer paused or a stop arrives.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.resume_notify.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop. Also wakes a paused loop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record the reason the simulation ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        *self.end_reason.lock().await = Some(reason);
    }

    /// The reason the simulation ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Speed
    // -----------------------------------------------------------------------

    /// Current game speed multiplier.
    pub fn speed(&self) -> f64 {
        f64::from_bits(self.speed_bits.load(Ordering::Acquire))
    }

    /// Set the speed, clamped to the configured range.
    ///
    /// Returns the speed actually applied, or `None` for a non-finite value.
    pub fn set_speed(&self, speed: f64) -> Option<f64> {
        if !speed.is_finite() {
            return None;
        }
        let applied = speed.clamp(self.min_speed, self.max_speed);
        self.speed_bits.store(applied.to_bits(), Ordering::Release);
        Some(applied)
    }

    // -----------------------------------------------------------------------
    // Boundaries
    // -----------------------------------------------------------------------

    /// `true` if `max_ticks > 0` and `current_tick >= max_ticks`.
    pub const fn tick_limit_reached(&self, current_tick: u64) -> bool {
        self.max_ticks > 0 && current_tick >= self.max_ticks
    }

    /// `true` if a wall-clock limit is set and has passed.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Configured tick limit (0 = unlimited).
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Configured wall-clock limit in seconds (0 = unlimited).
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the next gap between ticks.
    pub async fn submit(&self, command: OperatorCommand) {
        self.commands.lock().await.push(command);
    }

    /// Take every queued command, oldest first.
    pub async fn drain_commands(&self) -> Vec<OperatorCommand> {
        std::mem::take(&mut *self.commands.lock().await)
    }

    /// Status view for display.
    pub async fn status(&self, tick: u64, robots: usize, quota_level: u32) -> SimulationStatus {
        SimulationStatus {
            tick,
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            speed: self.speed(),
            elapsed_seconds: self.elapsed_seconds(),
            max_ticks: self.max_ticks,
            max_real_time_seconds: self.max_real_time_seconds,
            robots,
            quota_level,
            end_reason: self.end_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// Point-in-time status of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatus {
    /// Current tick number.
    pub tick: u64,
    /// Whether the simulation is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Game speed multiplier.
    pub speed: f64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Configured maximum ticks (0 = unlimited).
    pub max_ticks: u64,
    /// Configured maximum real-time seconds (0 = unlimited).
    pub max_real_time_seconds: u64,
    /// Robots on the floor.
    pub robots: usize,
    /// 1-based level of the active quota.
    pub quota_level: u32,
    /// The reason the simulation ended, if applicable.
    pub end_reason: Option<SimulationEndReason>,
    /// RFC 3339 start timestamp.
    pub started_at: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn state() -> OperatorState {
        OperatorState::new(&TimingConfig::default(), &SimulationBoundsConfig::default())
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < f64::EPSILON
    }

    #[test]
    fn initial_state_is_running() {
        let state = state();
        assert!(!state.is_paused());
        assert!(!state.is_stop_requested());
        assert!(close(state.speed(), 1.0));
    }

    #[test]
    fn pause_and_resume() {
        let state = state();
        assert!(state.toggle_pause());
        assert!(state.is_paused());
        assert!(!state.toggle_pause());
        assert!(!state.is_paused());
    }

    #[test]
    fn speed_is_clamped() {
        let state = state();
        assert!(close(state.set_speed(10.0).unwrap(), 5.0));
        assert!(close(state.set_speed(0.01).unwrap(), 0.1));
        assert!(close(state.set_speed(2.5).unwrap(), 2.5));
        assert!(state.set_speed(f64::NAN).is_none());
        assert!(close(state.speed(), 2.5));
    }

    #[test]
    fn tick_limit() {
        let bounds = SimulationBoundsConfig {
            max_ticks: 100,
            max_real_time_seconds: 0,
        };
        let state = OperatorState::new(&TimingConfig::default(), &bounds);
        assert!(!state.tick_limit_reached(99));
        assert!(state.tick_limit_reached(100));
        assert!(!state.time_limit_reached());
    }

    #[test]
    fn zero_limits_mean_unlimited() {
        let state = state();
        assert!(!state.tick_limit_reached(u64::MAX));
        assert!(!state.time_limit_reached());
    }

    #[tokio::test]
    async fn commands_drain_in_order() {
        let state = state();
        state.submit(OperatorCommand::SelectScript("Scout".to_owned())).await;
        state.submit(OperatorCommand::SaveSnapshot).await;
        assert_eq!(
            state.drain_commands().await,
            vec![
                OperatorCommand::SelectScript("Scout".to_owned()),
                OperatorCommand::SaveSnapshot
            ]
        );
        assert!(state.drain_commands().await.is_empty());
    }

    #[tokio::test]
    async fn stop_wakes_paused_waiter() {
        let state = std::sync::Arc::new(state());
        state.pause();
        let waiter = {
            let state = std::sync::Arc::clone(&state);
            tokio::spawn(async move { state.wait_if_paused().await })
        };
        tokio::task::yield_now().await;
        state.request_stop();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn status_reports_end_reason() {
        let state = state();
        state.set_end_reason(SimulationEndReason::OperatorStop).await;
        let status = state.status(42, 2, 1).await;
        assert_eq!(status.tick, 42);
        assert_eq!(status.end_reason, Some(SimulationEndReason::OperatorStop));
    }
}
