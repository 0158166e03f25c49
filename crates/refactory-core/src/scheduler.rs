//! Fixed-step tick scheduler.
//!
//! Real elapsed time, scaled by the game speed, accumulates until it covers
//! one tick of simulated time. Each covered tick is reported as due and
//! removed from the accumulator, so large frame gaps catch up instead of
//! skipping. Lag beyond `max_ticks_per_frame` ticks is dropped to prevent a
//! catch-up storm after a stall.
//!
//! The scheduler only counts. Running the due ticks one after another is the
//! runner's job, which keeps tick execution non-reentrant.

use std::time::Duration;

use tracing::debug;

use crate::config::{ConfigError, TimingConfig};

/// Converts real time into a number of due ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickScheduler {
    tick_duration: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
}

impl TickScheduler {
    /// Scheduler for `timing`.
    pub fn new(timing: &TimingConfig) -> Result<Self, ConfigError> {
        let tick_duration = Duration::from_secs(1)
            .checked_div(timing.ticks_per_second)
            .ok_or_else(|| ConfigError::Invalid {
                reason: "timing.ticks_per_second must be at least 1".to_owned(),
            })?;
        if timing.max_ticks_per_frame == 0 {
            return Err(ConfigError::Invalid {
                reason: "timing.max_ticks_per_frame must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            tick_duration,
            max_ticks_per_frame: timing.max_ticks_per_frame,
            accumulator: Duration::ZERO,
        })
    }

    /// Simulated time per tick.
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Simulated time not yet turned into a tick.
    pub const fn pending(&self) -> Duration {
        self.accumulator
    }

    /// Forget accumulated time, e.g. after a pause.
    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    /// Feed `real_elapsed` at `speed` and return how many ticks are due.
    ///
    /// A non-finite or non-positive speed adds nothing.
    pub fn accumulate(&mut self, real_elapsed: Duration, speed: f64) -> u32 {
        if speed.is_finite() && speed > 0.0 {
            let scaled =
                Duration::try_from_secs_f64(real_elapsed.as_secs_f64() * speed).unwrap_or(Duration::MAX);
            self.accumulator = self.accumulator.saturating_add(scaled);
        }

        let max_lag = self.tick_duration.saturating_mul(self.max_ticks_per_frame);
        if self.accumulator > max_lag {
            let dropped = self.accumulator.saturating_sub(max_lag);
            debug!(dropped_ms = dropped.as_millis(), "tick lag clamped");
            self.accumulator = max_lag;
        }

        let mut due: u32 = 0;
        while self.accumulator >= self.tick_duration && due < self.max_ticks_per_frame {
            self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
            due = due.saturating_add(1);
        }
        due
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scheduler(max_ticks_per_frame: u32) -> TickScheduler {
        TickScheduler::new(&TimingConfig {
            ticks_per_second: 10,
            max_ticks_per_frame,
            ..TimingConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn accumulates_partial_ticks() {
        let mut s = scheduler(10);
        assert_eq!(s.accumulate(Duration::from_millis(60), 1.0), 0);
        assert_eq!(s.accumulate(Duration::from_millis(60), 1.0), 1);
        assert_eq!(s.pending(), Duration::from_millis(20));
    }

    #[test]
    fn speed_scales_time() {
        let mut s = scheduler(10);
        assert_eq!(s.accumulate(Duration::from_millis(100), 3.0), 3);
        assert_eq!(s.accumulate(Duration::from_millis(100), 0.5), 0);
        assert_eq!(s.accumulate(Duration::from_millis(100), 0.5), 1);
    }

    #[test]
    fn catches_up_without_skipping() {
        let mut s = scheduler(10);
        assert_eq!(s.accumulate(Duration::from_millis(450), 1.0), 4);
        assert_eq!(s.pending(), Duration::from_millis(50));
    }

    #[test]
    fn large_gap_is_clamped() {
        let mut s = scheduler(5);
        assert_eq!(s.accumulate(Duration::from_secs(60), 1.0), 5);
        assert_eq!(s.pending(), Duration::ZERO);
        assert_eq!(s.accumulate(Duration::ZERO, 1.0), 0);
    }

    #[test]
    fn bad_speed_adds_nothing() {
        let mut s = scheduler(5);
        assert_eq!(s.accumulate(Duration::from_secs(1), f64::NAN), 0);
        assert_eq!(s.accumulate(Duration::from_secs(1), -1.0), 0);
        assert_eq!(s.pending(), Duration::ZERO);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let timing = TimingConfig {
            ticks_per_second: 0,
            ..TimingConfig::default()
        };
        assert!(TickScheduler::new(&timing).is_err());
    }
}
