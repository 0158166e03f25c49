//! Shared type definitions for the ReFactory simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace: the world state and every entity it owns. Types flow to
//! `TypeScript` via `ts-rs` for a front end to render.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity identifiers
//! - [`enums`] -- Resource, machine, status and reward enumerations
//! - [`structs`] -- Entity structs and the [`WorldState`] aggregate

pub mod enums;
pub mod ids;
pub mod structs;

pub use enums::{MachineKind, ResourceKind, RewardKind, RobotStatus, SenseKind, UnknownVariant};
pub use ids::{MachineId, RobotId, ScriptId, SpawnedResourceId};
pub use structs::{
    EnergyPool, Machine, PlayerScript, Position, Quota, QuotaHistoryEntry, QuotaReward, Recipe,
    RecipeItem, ResourceRecord, Robot, ScriptStats, SpawnedResource, WorldState,
};

#[cfg(test)]
mod tests {
    #[test]
    fn export_bindings() {
        // Exporting writes the TypeScript files under `bindings/`.
        use ts_rs::TS;

        let _ = crate::ids::RobotId::export_all();
        let _ = crate::ids::MachineId::export_all();
        let _ = crate::ids::SpawnedResourceId::export_all();
        let _ = crate::ids::ScriptId::export_all();

        let _ = crate::enums::ResourceKind::export_all();
        let _ = crate::enums::MachineKind::export_all();
        let _ = crate::enums::RobotStatus::export_all();
        let _ = crate::enums::SenseKind::export_all();
        let _ = crate::enums::RewardKind::export_all();

        let _ = crate::structs::WorldState::export_all();
    }
}
