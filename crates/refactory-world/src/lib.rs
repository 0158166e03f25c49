//! Factory floor model and per-tick world simulators for ReFactory.
//!
//! The [`WorldState`] aggregate itself lives in `refactory-types`; this
//! crate holds everything that advances it outside of robot scripts.
//!
//! # Modules
//!
//! - [`catalog`] -- Resource catalog, recipes, quota progression, reward sizes.
//! - [`error`] -- Error types for world operations.
//! - [`movement`] -- Fixed-step robot movement toward targets.
//! - [`production`] -- Machine recipes: inputs, energy draw, progress, outputs.
//! - [`quota`] -- [`QuotaController`]: completion, timeout, rewards, progression.
//! - [`spawner`] -- [`Spawner`]: seeded periodic resource injection.
//! - [`starting_world`] -- The tick-0 floor.
//!
//! [`WorldState`]: refactory_types::WorldState

pub mod catalog;
pub mod error;
pub mod movement;
pub mod production;
pub mod quota;
pub mod spawner;
pub mod starting_world;

pub use error::WorldError;
pub use movement::{MovementReport, advance_robots};
pub use production::{ProductionReport, energy_per_tick, run_production};
pub use quota::{GrantedRobotTemplate, QuotaController, QuotaOutcome};
pub use spawner::{Bounds, SpawnRule, Spawner, SpawnerConfig};
pub use starting_world::{StartingWorldConfig, create_starting_world};
