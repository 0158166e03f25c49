//! Default starting factory floor.
//!
//! One robot at the start position, a storage machine and a circuit
//! assembler to its right, a full energy pool, and the first quota of the
//! progression active from tick 0.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use refactory_types::{
    EnergyPool, Machine, MachineId, MachineKind, PlayerScript, Position, Quota, Robot, RobotId,
    WorldState,
};

use crate::catalog::{circuit_recipe, resource_catalog};

/// Parameters of the starting floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingWorldConfig {
    /// Where the first robot stands. Granted robots line up to its right.
    #[serde(default = "default_robot_start")]
    pub robot_start: Position,
    /// Per-tick movement speed of every robot.
    #[serde(default = "default_robot_speed")]
    pub robot_speed: f64,
    /// Informational per-robot energy.
    #[serde(default = "default_robot_energy")]
    pub robot_energy: Decimal,
    /// Energy pool at tick 0.
    #[serde(default = "default_initial_energy")]
    pub initial_energy: Decimal,
    /// Energy pool capacity at tick 0.
    #[serde(default = "default_max_energy")]
    pub max_energy: Decimal,
    /// Energy restored per tick.
    #[serde(default = "default_regen_rate")]
    pub regen_rate: Decimal,
    /// Storage machine position.
    #[serde(default = "default_storage_position")]
    pub storage_position: Position,
    /// Circuit assembler position.
    #[serde(default = "default_assembler_position")]
    pub assembler_position: Position,
}

const fn default_robot_start() -> Position {
    Position::new(100.0, 100.0)
}

const fn default_robot_speed() -> f64 {
    2.0
}

const fn default_robot_energy() -> Decimal {
    Decimal::from_parts(100, 0, 0, false, 0)
}

const fn default_initial_energy() -> Decimal {
    Decimal::from_parts(1000, 0, 0, false, 0)
}

const fn default_max_energy() -> Decimal {
    Decimal::from_parts(1000, 0, 0, false, 0)
}

const fn default_regen_rate() -> Decimal {
    Decimal::from_parts(8, 0, 0, false, 1)
}

const fn default_storage_position() -> Position {
    Position::new(400.0, 100.0)
}

const fn default_assembler_position() -> Position {
    Position::new(400.0, 250.0)
}

impl Default for StartingWorldConfig {
    fn default() -> Self {
        Self {
            robot_start: default_robot_start(),
            robot_speed: default_robot_speed(),
            robot_energy: default_robot_energy(),
            initial_energy: default_initial_energy(),
            max_energy: default_max_energy(),
            regen_rate: default_regen_rate(),
            storage_position: default_storage_position(),
            assembler_position: default_assembler_position(),
        }
    }
}

/// Build the tick-0 world.
///
/// `scripts` become the player's script collection; the first one is
/// selected as active. `first_quota` is usually the head of the
/// progression.
pub fn create_starting_world(
    config: &StartingWorldConfig,
    scripts: Vec<PlayerScript>,
    first_quota: Option<Quota>,
) -> WorldState {
    let robot = Robot::new(
        RobotId::new(),
        config.robot_start,
        config.robot_speed,
        config.robot_energy,
    );
    let storage = Machine::new(
        MachineId::new(),
        MachineKind::Storage,
        config.storage_position,
        None,
    );
    let assembler = Machine::new(
        MachineId::new(),
        MachineKind::Assembler,
        config.assembler_position,
        Some(circuit_recipe()),
    );

    let active_script = scripts.first().map(|s| s.id);

    WorldState {
        tick: 0,
        energy: EnergyPool {
            current: config.initial_energy.min(config.max_energy),
            max: config.max_energy,
            regen_rate: config.regen_rate,
        },
        level: 1,
        resources: resource_catalog(),
        robots: vec![robot],
        machines: vec![storage, assembler],
        spawned_resources: Vec::new(),
        scripts,
        active_script,
        current_quota: first_quota,
        quota_start_tick: 0,
        quota_level: 1,
        quota_history: Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use refactory_types::{ResourceKind, RobotStatus};

    use super::*;
    use crate::catalog::default_quota_progression;

    #[test]
    fn starting_world_matches_defaults() {
        let script = PlayerScript::new("Main Controller", "fn update(robot) {}");
        let script_id = script.id;
        let world = create_starting_world(
            &StartingWorldConfig::default(),
            vec![script],
            default_quota_progression().into_iter().next(),
        );

        assert_eq!(world.energy.current, dec!(1000));
        assert_eq!(world.energy.regen_rate, dec!(0.8));
        assert_eq!(world.robots.len(), 1);
        let robot = world.robots.first().unwrap();
        assert_eq!(robot.position, Position::new(100.0, 100.0));
        assert_eq!(robot.status, RobotStatus::Idle);
        assert_eq!(world.machines.len(), 2);
        assert_eq!(world.active_script, Some(script_id));
        assert_eq!(
            world.current_quota.as_ref().map(|q| q.resource),
            Some(ResourceKind::Iron)
        );
        assert_eq!(world.resource_amount(ResourceKind::Circuit), 0);
    }

    #[test]
    fn config_fills_missing_fields() {
        let config: StartingWorldConfig = serde_json::from_str(r#"{"robot_speed": 3.0}"#).unwrap();
        assert!((config.robot_speed - 3.0).abs() < f64::EPSILON);
        assert_eq!(config.max_energy, dec!(1000));
    }
}
