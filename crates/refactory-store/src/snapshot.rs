//! JSON snapshots of the whole world.
//!
//! A snapshot is the full [`WorldState`] plus a timestamp. The resource
//! map is written as an ordered list of `(kind, record)` pairs and rebuilt
//! on load. Saves go to a temporary sibling file first and are renamed into
//! place, so a crash mid-write never leaves a truncated snapshot behind.
//!
//! Loading only ever returns a value. The caller swaps it into the
//! simulation, which means a failed load leaves the running world alone.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use refactory_types::WorldState;

use crate::error::StoreError;

/// Current on-disk format.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// A persisted world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// On-disk format version.
    pub format: u32,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
    /// The world.
    pub state: WorldState,
}

impl WorldSnapshot {
    /// Capture `state` now.
    pub fn capture(state: &WorldState) -> Self {
        Self {
            format: SNAPSHOT_FORMAT,
            saved_at: Utc::now(),
            state: state.clone(),
        }
    }

    /// Check the invariants a running world relies on.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.format != SNAPSHOT_FORMAT {
            return Err(StoreError::Invalid(format!(
                "unsupported snapshot format {}",
                self.format
            )));
        }
        let energy = &self.state.energy;
        if energy.current < Decimal::ZERO || energy.current > energy.max {
            return Err(StoreError::Invalid(format!(
                "energy {} outside [0, {}]",
                energy.current, energy.max
            )));
        }
        if let Some(robot) = self
            .state
            .robots
            .iter()
            .find(|r| r.carrying.is_some() != (r.carry_amount > 0))
        {
            return Err(StoreError::Invalid(format!(
                "robot {} has inconsistent cargo",
                robot.id
            )));
        }
        for robot in &self.state.robots {
            if !robot.speed.is_finite() || robot.speed < 0.0 {
                return Err(StoreError::Invalid(format!(
                    "robot {} has unusable speed {}",
                    robot.id, robot.speed
                )));
            }
            if !robot.position.is_finite() || robot.target_position.is_some_and(|t| !t.is_finite())
            {
                return Err(StoreError::Invalid(format!(
                    "robot {} has a non-finite position",
                    robot.id
                )));
            }
        }
        for machine in &self.state.machines {
            if !machine.position.is_finite() {
                return Err(StoreError::Invalid(format!(
                    "machine {} has a non-finite position",
                    machine.id
                )));
            }
            if let Some(recipe) = machine.recipe.as_ref() {
                if recipe.production_time == 0 {
                    return Err(StoreError::Invalid(format!(
                        "machine {} recipe {} has zero production time",
                        machine.id, recipe.id
                    )));
                }
                if recipe.energy_cost < Decimal::ZERO {
                    return Err(StoreError::Invalid(format!(
                        "machine {} recipe {} has negative energy cost",
                        machine.id, recipe.id
                    )));
                }
            }
        }
        if let Some(pile) = self
            .state
            .spawned_resources
            .iter()
            .find(|p| !p.position.is_finite())
        {
            return Err(StoreError::Invalid(format!(
                "resource pile {} has a non-finite position",
                pile.id
            )));
        }
        if let Some(active) = self.state.active_script {
            if !self.state.scripts.iter().any(|s| s.id == active) {
                return Err(StoreError::Invalid(format!(
                    "active script {active} is not in the script list"
                )));
            }
        }
        Ok(())
    }
}

/// Reads and writes snapshots at one path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Store bound to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Whether a snapshot file is present.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Write `state` to disk.
    pub async fn save(&self, state: &WorldState) -> Result<WorldSnapshot, StoreError> {
        let snapshot = WorldSnapshot::capture(state);
        let bytes = serde_json::to_vec(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        info!(
            tick = state.tick,
            path = %self.path.display(),
            bytes = bytes.len(),
            "snapshot saved"
        );
        Ok(snapshot)
    }

    /// Read and validate the snapshot.
    pub async fn load(&self) -> Result<WorldSnapshot, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(self.io_error(e)),
        };
        let snapshot: WorldSnapshot =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        snapshot.validate()?;

        debug!(path = %self.path.display(), saved_at = %snapshot.saved_at, "snapshot decoded");
        info!(tick = snapshot.state.tick, path = %self.path.display(), "snapshot loaded");
        Ok(snapshot)
    }
}
