//! Tick scheduling, the tick pipeline and the run loop for ReFactory.
//!
//! This crate owns the per-tick phase order that drives the factory floor:
//! Wake, Spawn, Scripts, Movement, Production, and Quota.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `refactory-config.yaml` into
//!   strongly-typed structs.
//! - [`scheduler`] -- [`TickScheduler`]: wall time and speed to due ticks.
//! - [`sandbox`] -- The script phase: one isolated invocation per robot.
//! - [`tick`] -- [`Simulation`] and the single-tick pipeline.
//! - [`operator`] -- Pause, speed, stop and queued commands.
//! - [`runner`] -- The real-time loop around the tick pipeline.
//!
//! [`TickScheduler`]: scheduler::TickScheduler
//! [`Simulation`]: tick::Simulation

pub mod config;
pub mod operator;
pub mod runner;
pub mod sandbox;
pub mod scheduler;
pub mod tick;
