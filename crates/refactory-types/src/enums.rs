//! Enumeration types for the ReFactory simulation.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A kind of resource that can be harvested, delivered, or produced.
///
/// The serialized and script-facing names are lowercase (`"iron"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ResourceKind {
    /// Raw iron ore.
    Iron,
    /// Raw copper ore.
    Copper,
    /// Circuit boards assembled from ore.
    Circuit,
}

impl ResourceKind {
    /// Every resource kind, in catalog order.
    pub const ALL: [Self; 3] = [Self::Iron, Self::Copper, Self::Circuit];

    /// The lowercase name used in scripts, configuration, and snapshots.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Iron => "iron",
            Self::Copper => "copper",
            Self::Circuit => "circuit",
        }
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown name into one of the enums here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub expected: &'static str,
    /// The rejected input.
    pub value: String,
}

impl core::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown {}: {:?}", self.expected, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for ResourceKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "iron" => Ok(Self::Iron),
            "copper" => Ok(Self::Copper),
            "circuit" => Ok(Self::Circuit),
            other => Err(UnknownVariant {
                expected: "resource kind",
                value: other.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Machines
// ---------------------------------------------------------------------------

/// The functional category of a machine on the factory floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MachineKind {
    /// Combines several inputs into a finished product.
    Assembler,
    /// Pulls raw material out of a deposit.
    Extractor,
    /// Passive sink that only accumulates deliveries.
    Storage,
    /// Refines one input into another.
    Processor,
}

impl MachineKind {
    /// The lowercase name used in scripts and snapshots.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assembler => "assembler",
            Self::Extractor => "extractor",
            Self::Storage => "storage",
            Self::Processor => "processor",
        }
    }
}

impl core::fmt::Display for MachineKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Robots
// ---------------------------------------------------------------------------

/// Robot status state machine.
///
/// `Idle` is the initial state. `Error` is sticky: nothing clears it except
/// the next successful action issued by the robot's own script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RobotStatus {
    /// Resting; no target.
    #[default]
    Idle,
    /// En route to a target position.
    Moving,
    /// Handling cargo after a pickup.
    Working,
    /// The last action or script invocation failed.
    Error,
}

impl RobotStatus {
    /// The lowercase name exposed to scripts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Moving => "moving",
            Self::Working => "working",
            Self::Error => "error",
        }
    }
}

impl core::fmt::Display for RobotStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a `sense` call is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SenseKind {
    /// Spawned resources lying on the floor.
    Resources,
    /// Machines.
    Machines,
}

impl FromStr for SenseKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "resources" | "resource" => Ok(Self::Resources),
            "machines" | "machine" => Ok(Self::Machines),
            other => Err(UnknownVariant {
                expected: "sense kind",
                value: other.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Quotas
// ---------------------------------------------------------------------------

/// The reward applied when a quota is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RewardKind {
    /// Add another robot to the floor.
    GrantRobot,
    /// Raise the energy pool's per-tick regeneration.
    BoostEnergyRegen,
    /// Increase the player level and the energy pool's capacity.
    LevelUp,
}
