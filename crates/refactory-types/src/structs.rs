//! Core entity structs for the ReFactory simulation.
//!
//! These are plain data types. Behavior that advances them tick by tick lives
//! in `refactory-world`, `refactory-ledger` and `refactory-robots`; this
//! module only carries a few read helpers on [`WorldState`] so every crate
//! looks entities up the same way.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{MachineKind, ResourceKind, RewardKind, RobotStatus};
use crate::ids::{MachineId, RobotId, ScriptId, SpawnedResourceId};

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A point on the continuous 2D factory floor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Construct a position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Take one straight-line step of length `step` toward `target`.
    ///
    /// Returns the new position and whether the target was reached. When the
    /// remaining distance is at most `step` the result snaps exactly onto the
    /// target.
    pub fn step_towards(self, target: Self, step: f64) -> (Self, bool) {
        let distance = self.distance(target);
        if distance <= step {
            return (target, true);
        }
        let ratio = step / distance;
        let next = Self {
            x: (target.x - self.x).mul_add(ratio, self.x),
            y: (target.y - self.y).mul_add(ratio, self.y),
        };
        (next, false)
    }

    /// Whether both coordinates are finite numbers.
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Offset this position by `(dx, dy)`.
    pub const fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

// ---------------------------------------------------------------------------
// Robots
// ---------------------------------------------------------------------------

/// A scripted worker on the factory floor.
///
/// `carry_amount` is zero exactly when `carrying` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Robot {
    /// Unique robot identifier.
    pub id: RobotId,
    /// Current position.
    pub position: Position,
    /// Where the robot is heading, if it is moving.
    pub target_position: Option<Position>,
    /// Distance covered per tick while moving.
    pub speed: f64,
    /// The resource kind currently held, if any.
    pub carrying: Option<ResourceKind>,
    /// How many units are held.
    pub carry_amount: u32,
    /// State machine position.
    pub status: RobotStatus,
    /// Diagnostic text, usually the last fault message.
    pub current_instruction: Option<String>,
    /// Local energy budget. Informational; costed actions draw from the
    /// shared [`EnergyPool`].
    #[ts(as = "String")]
    pub energy: Decimal,
}

impl Robot {
    /// Create an idle, empty-handed robot.
    pub fn new(id: RobotId, position: Position, speed: f64, energy: Decimal) -> Self {
        Self {
            id,
            position,
            target_position: None,
            speed,
            carrying: None,
            carry_amount: 0,
            status: RobotStatus::Idle,
            current_instruction: None,
            energy,
        }
    }

    /// Whether the robot currently holds cargo.
    pub const fn is_carrying(&self) -> bool {
        self.carrying.is_some()
    }

    /// Put the robot into the sticky error state with a diagnostic.
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = RobotStatus::Error;
        self.current_instruction = Some(message.into());
    }
}

// ---------------------------------------------------------------------------
// Floor pickups
// ---------------------------------------------------------------------------

/// A harvestable pile of one resource kind lying on the floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SpawnedResource {
    /// Unguessable identifier.
    pub id: SpawnedResourceId,
    /// Where it lies.
    pub position: Position,
    /// What it is.
    pub kind: ResourceKind,
    /// Units available. Always positive for a live pile.
    pub amount: u32,
}

// ---------------------------------------------------------------------------
// Machines and recipes
// ---------------------------------------------------------------------------

/// One `(resource, amount)` line of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RecipeItem {
    /// Resource consumed or produced.
    pub kind: ResourceKind,
    /// Units per cycle.
    pub amount: u32,
}

/// A static production definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Recipe {
    /// Stable recipe key, e.g. `"circuit"`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Ordered inputs consumed at the end of each cycle.
    pub inputs: Vec<RecipeItem>,
    /// Outputs credited at the end of each cycle.
    pub outputs: Vec<RecipeItem>,
    /// Ticks of progress per cycle. Must be positive.
    pub production_time: u32,
    /// Total energy per cycle, drawn in equal parts each tick.
    #[ts(as = "String")]
    pub energy_cost: Decimal,
}

/// A machine on the factory floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Machine {
    /// Unique machine identifier.
    pub id: MachineId,
    /// Functional category.
    pub kind: MachineKind,
    /// Where it stands.
    pub position: Position,
    /// The recipe it runs, if any. Storage machines have none.
    pub recipe: Option<Recipe>,
    /// Ticks of uninterrupted progress in the current cycle.
    pub progress: u32,
    /// Input buffer.
    pub inventory: BTreeMap<ResourceKind, u32>,
    /// Output buffer.
    pub output_inventory: BTreeMap<ResourceKind, u32>,
    /// Inactive machines are skipped by the production step.
    pub active: bool,
}

impl Machine {
    /// Create an empty, active machine.
    pub fn new(id: MachineId, kind: MachineKind, position: Position, recipe: Option<Recipe>) -> Self {
        Self {
            id,
            kind,
            position,
            recipe,
            progress: 0,
            inventory: BTreeMap::new(),
            output_inventory: BTreeMap::new(),
            active: true,
        }
    }

    /// Units of `kind` in the input buffer.
    pub fn input_amount(&self, kind: ResourceKind) -> u32 {
        self.inventory.get(&kind).copied().unwrap_or(0)
    }

    /// Units of `kind` in the output buffer.
    pub fn output_amount(&self, kind: ResourceKind) -> u32 {
        self.output_inventory.get(&kind).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Resource catalog
// ---------------------------------------------------------------------------

/// Catalog entry for one resource kind plus the player's accumulated total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceRecord {
    /// Which resource this row describes.
    pub kind: ResourceKind,
    /// Display name.
    pub name: String,
    /// Display icon.
    pub icon: String,
    /// Units delivered so far. Reset to zero when a quota on it fails.
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// Energy
// ---------------------------------------------------------------------------

/// The single shared energy pool. Invariant: `0 <= current <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EnergyPool {
    /// Energy available now.
    #[ts(as = "String")]
    pub current: Decimal,
    /// Capacity.
    #[ts(as = "String")]
    pub max: Decimal,
    /// Energy restored at the start of each tick.
    #[ts(as = "String")]
    pub regen_rate: Decimal,
}

// ---------------------------------------------------------------------------
// Quotas
// ---------------------------------------------------------------------------

/// Reward granted when a quota is met.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QuotaReward {
    /// What happens.
    pub kind: RewardKind,
    /// Player-facing text.
    pub description: String,
}

/// A timed resource-collection objective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Quota {
    /// Tracked resource.
    pub resource: ResourceKind,
    /// Accumulated amount required.
    pub target_amount: u64,
    /// Ticks allowed from the quota's start tick.
    pub time_limit: u64,
    /// Applied on success.
    pub reward: QuotaReward,
}

/// One immutable row of the quota audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QuotaHistoryEntry {
    /// Player level when the quota closed.
    pub level: u32,
    /// Whether the target was met.
    pub success: bool,
    /// Tracked resource.
    pub resource: ResourceKind,
    /// Required amount.
    pub target_amount: u64,
    /// Amount reached when the quota closed.
    pub actual_amount: u64,
    /// Ticks elapsed since the quota started.
    pub time_used: u64,
    /// Reward text, present on success only.
    pub reward_description: Option<String>,
    /// Tick at which the entry was written.
    pub tick: u64,
}

// ---------------------------------------------------------------------------
// Scripts
// ---------------------------------------------------------------------------

/// Cumulative execution statistics for one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScriptStats {
    /// Successful invocations.
    pub invocations: u64,
    /// Wall time across successful invocations, in microseconds.
    pub total_time_us: u64,
    /// Energy charged across successful invocations, fee included.
    #[ts(as = "String")]
    pub energy_used: Decimal,
}

impl ScriptStats {
    /// Mean wall time per invocation in microseconds, or zero before the first run.
    pub fn average_time_us(&self) -> u64 {
        self.total_time_us.checked_div(self.invocations).unwrap_or(0)
    }
}

/// A named, player-authored robot program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PlayerScript {
    /// Unique identifier.
    pub id: ScriptId,
    /// Display name, used by the console's `select` command.
    pub name: String,
    /// Program text.
    pub source: String,
    /// When the text last changed.
    pub last_modified: DateTime<Utc>,
    /// Profiling counters.
    pub stats: ScriptStats,
}

impl PlayerScript {
    /// Create a script with empty statistics.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: ScriptId::new(),
            name: name.into(),
            source: source.into(),
            last_modified: Utc::now(),
            stats: ScriptStats::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

/// The authoritative simulation state.
///
/// Exactly one instance is live at a time; it is owned by the simulation
/// driver and lent to each tick phase in turn. The resource map serializes
/// as an ordered list of `(kind, record)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldState {
    /// Ticks completed.
    pub tick: u64,
    /// Shared energy pool.
    pub energy: EnergyPool,
    /// Player level.
    pub level: u32,
    /// Resource catalog with accumulated totals.
    #[serde(with = "resource_pairs")]
    #[ts(as = "Vec<(ResourceKind, ResourceRecord)>")]
    pub resources: BTreeMap<ResourceKind, ResourceRecord>,
    /// Robots in stable creation order. Script execution follows this order.
    pub robots: Vec<Robot>,
    /// Machines in stable creation order.
    pub machines: Vec<Machine>,
    /// Piles waiting to be picked up.
    pub spawned_resources: Vec<SpawnedResource>,
    /// Every script the player has written.
    pub scripts: Vec<PlayerScript>,
    /// The script every robot runs.
    pub active_script: Option<ScriptId>,
    /// The objective in progress, `None` once the progression is exhausted.
    pub current_quota: Option<Quota>,
    /// Tick at which the current quota (re)started.
    pub quota_start_tick: u64,
    /// One-based position of the current quota in the progression.
    pub quota_level: u32,
    /// Closed quotas, oldest first.
    pub quota_history: Vec<QuotaHistoryEntry>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            tick: 0,
            energy: EnergyPool {
                current: Decimal::ZERO,
                max: Decimal::ZERO,
                regen_rate: Decimal::ZERO,
            },
            level: 1,
            resources: BTreeMap::new(),
            robots: Vec::new(),
            machines: Vec::new(),
            spawned_resources: Vec::new(),
            scripts: Vec::new(),
            active_script: None,
            current_quota: None,
            quota_start_tick: 0,
            quota_level: 1,
            quota_history: Vec::new(),
        }
    }
}

impl WorldState {
    /// Look up a robot.
    pub fn robot(&self, id: RobotId) -> Option<&Robot> {
        self.robots.iter().find(|r| r.id == id)
    }

    /// Look up a robot mutably.
    pub fn robot_mut(&mut self, id: RobotId) -> Option<&mut Robot> {
        self.robots.iter_mut().find(|r| r.id == id)
    }

    /// Look up a machine.
    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machines.iter().find(|m| m.id == id)
    }

    /// Look up a machine mutably.
    pub fn machine_mut(&mut self, id: MachineId) -> Option<&mut Machine> {
        self.machines.iter_mut().find(|m| m.id == id)
    }

    /// Look up a floor pile.
    pub fn spawned_resource(&self, id: SpawnedResourceId) -> Option<&SpawnedResource> {
        self.spawned_resources.iter().find(|r| r.id == id)
    }

    /// Remove a floor pile, returning it if it was still there.
    pub fn take_spawned_resource(&mut self, id: SpawnedResourceId) -> Option<SpawnedResource> {
        let index = self.spawned_resources.iter().position(|r| r.id == id)?;
        Some(self.spawned_resources.remove(index))
    }

    /// Accumulated total for one resource kind.
    pub fn resource_amount(&self, kind: ResourceKind) -> u64 {
        self.resources.get(&kind).map_or(0, |r| r.amount)
    }

    /// The active script, if one is selected and still exists.
    pub fn active_script(&self) -> Option<&PlayerScript> {
        let id = self.active_script?;
        self.scripts.iter().find(|s| s.id == id)
    }

    /// Look up a script by id, mutably.
    pub fn script_mut(&mut self, id: ScriptId) -> Option<&mut PlayerScript> {
        self.scripts.iter_mut().find(|s| s.id == id)
    }
}

/// Serde adapter flattening the resource map into `(kind, record)` pairs.
mod resource_pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::ResourceRecord;
    use crate::enums::ResourceKind;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<ResourceKind, ResourceRecord>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(&ResourceKind, &ResourceRecord)> = map.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<ResourceKind, ResourceRecord>, D::Error> {
        let pairs: Vec<(ResourceKind, ResourceRecord)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
