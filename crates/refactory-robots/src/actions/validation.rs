//! Ordered precondition checks for robot actions.
//!
//! Checks run against the world before any energy is charged. Each check
//! either yields a plan the API then executes, a benign skip, or an
//! [`ActionError`].
//!
//! Pickup order:
//! 1. Pile gone → skip.
//! 2. Robot already carrying → skip.
//! 3. Pile farther than the pickup range → `OutOfRange`.
//! 4. Pile empty → `InvalidState`.
//!
//! Dropoff order:
//! 1. Robot not carrying → skip.
//! 2. Machine unknown → `InvalidState`.
//! 3. Machine farther than the dropoff range → `OutOfRange`.

use core::str::FromStr;

use refactory_types::{
    MachineId, Position, ResourceKind, Robot, RobotId, SpawnedResourceId, WorldState,
};

use super::costs::ActionRules;
use crate::error::ActionError;

/// A benign reason to do nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another robot already took the pile.
    ResourceGone,
    /// The robot's hands are full.
    AlreadyCarrying,
    /// The robot has nothing to deliver.
    NotCarrying,
}

impl SkipReason {
    /// Short description for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResourceGone => "resource gone",
            Self::AlreadyCarrying => "already carrying",
            Self::NotCarrying => "not carrying",
        }
    }
}

/// Result of a passed-or-skipped check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precheck<T> {
    /// All preconditions hold.
    Proceed(T),
    /// Nothing to do; not an error.
    Skip(SkipReason),
}

/// Validated pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupPlan {
    /// Pile to remove.
    pub resource: SpawnedResourceId,
    /// Kind it holds.
    pub kind: ResourceKind,
    /// Units it holds.
    pub amount: u32,
}

/// Validated dropoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropoffPlan {
    /// Receiving machine.
    pub machine: MachineId,
    /// Cargo kind.
    pub kind: ResourceKind,
    /// Cargo units.
    pub amount: u32,
}

/// Parse an identifier handed over by a script.
pub fn parse_ref<T: FromStr>(raw: &str, what: &str) -> Result<T, ActionError> {
    raw.parse::<T>()
        .ok()
        .ok_or_else(|| ActionError::invalid(format!("malformed {what} id: {raw:?}")))
}

/// Look up the acting robot.
pub fn acting_robot(world: &WorldState, robot: RobotId) -> Result<&Robot, ActionError> {
    world
        .robot(robot)
        .ok_or_else(|| ActionError::invalid(format!("robot {robot} no longer exists")))
}

/// Reject non-finite movement targets.
pub fn check_target(target: Position) -> Result<(), ActionError> {
    if target.x.is_finite() && target.y.is_finite() {
        Ok(())
    } else {
        Err(ActionError::invalid("move target must be finite"))
    }
}

/// Reject negative or non-finite sense radii.
pub fn check_radius(radius: f64) -> Result<(), ActionError> {
    if radius.is_finite() && radius >= 0.0 {
        Ok(())
    } else {
        Err(ActionError::invalid(format!("sense radius must be a finite non-negative number, got {radius}")))
    }
}

/// Validate a pickup.
pub fn check_pickup(
    world: &WorldState,
    robot: RobotId,
    resource: SpawnedResourceId,
    rules: &ActionRules,
) -> Result<Precheck<PickupPlan>, ActionError> {
    let bot = acting_robot(world, robot)?;
    let Some(pile) = world.spawned_resource(resource) else {
        return Ok(Precheck::Skip(SkipReason::ResourceGone));
    };
    if bot.is_carrying() {
        return Ok(Precheck::Skip(SkipReason::AlreadyCarrying));
    }
    let distance = bot.position.distance(pile.position);
    if distance > rules.pickup_range {
        return Err(ActionError::OutOfRange {
            distance,
            max: rules.pickup_range,
        });
    }
    if pile.amount == 0 {
        return Err(ActionError::invalid(format!("resource {resource} is empty")));
    }
    Ok(Precheck::Proceed(PickupPlan {
        resource,
        kind: pile.kind,
        amount: pile.amount,
    }))
}

/// Validate a dropoff.
pub fn check_dropoff(
    world: &WorldState,
    robot: RobotId,
    machine: MachineId,
    rules: &ActionRules,
) -> Result<Precheck<DropoffPlan>, ActionError> {
    let bot = acting_robot(world, robot)?;
    let (Some(kind), amount) = (bot.carrying, bot.carry_amount) else {
        return Ok(Precheck::Skip(SkipReason::NotCarrying));
    };
    let target = world
        .machine(machine)
        .ok_or_else(|| ActionError::invalid(format!("machine {machine} does not exist")))?;
    let distance = bot.position.distance(target.position);
    if distance > rules.dropoff_range {
        return Err(ActionError::OutOfRange {
            distance,
            max: rules.dropoff_range,
        });
    }
    Ok(Precheck::Proceed(DropoffPlan {
        machine,
        kind,
        amount,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use refactory_types::{Machine, MachineKind, SpawnedResource};

    use super::*;

    fn setup(robot_at: Position, pile_at: Position, amount: u32) -> (WorldState, RobotId, SpawnedResourceId) {
        let robot = Robot::new(RobotId::new(), robot_at, 2.0, Decimal::ZERO);
        let pile = SpawnedResource {
            id: SpawnedResourceId::new(),
            position: pile_at,
            kind: ResourceKind::Iron,
            amount,
        };
        let ids = (robot.id, pile.id);
        let mut world = WorldState::default();
        world.robots.push(robot);
        world.spawned_resources.push(pile);
        (world, ids.0, ids.1)
    }

    #[test]
    fn pickup_in_range_proceeds() {
        let (world, robot, pile) = setup(Position::new(0.0, 0.0), Position::new(20.0, 0.0), 1);
        let check = check_pickup(&world, robot, pile, &ActionRules::default()).unwrap();
        assert!(matches!(check, Precheck::Proceed(plan) if plan.amount == 1));
    }

    #[test]
    fn pickup_out_of_range_errors() {
        let (world, robot, pile) = setup(Position::new(0.0, 0.0), Position::new(20.5, 0.0), 1);
        let err = check_pickup(&world, robot, pile, &ActionRules::default()).unwrap_err();
        assert!(matches!(err, ActionError::OutOfRange { .. }));
    }

    #[test]
    fn vanished_pile_is_a_skip_even_when_far() {
        let (world, robot, _) = setup(Position::new(0.0, 0.0), Position::new(500.0, 0.0), 1);
        let check = check_pickup(&world, robot, SpawnedResourceId::new(), &ActionRules::default()).unwrap();
        assert_eq!(check, Precheck::Skip(SkipReason::ResourceGone));
    }

    #[test]
    fn carrying_robot_skips_pickup() {
        let (mut world, robot, pile) = setup(Position::new(0.0, 0.0), Position::new(1.0, 0.0), 1);
        let bot = world.robot_mut(robot).unwrap();
        bot.carrying = Some(ResourceKind::Copper);
        bot.carry_amount = 1;
        let check = check_pickup(&world, robot, pile, &ActionRules::default()).unwrap();
        assert_eq!(check, Precheck::Skip(SkipReason::AlreadyCarrying));
    }

    #[test]
    fn empty_pile_is_invalid() {
        let (world, robot, pile) = setup(Position::new(0.0, 0.0), Position::new(1.0, 0.0), 0);
        let err = check_pickup(&world, robot, pile, &ActionRules::default()).unwrap_err();
        assert!(matches!(err, ActionError::InvalidState { .. }));
    }

    #[test]
    fn dropoff_checks_machine_then_range() {
        let (mut world, robot, _) = setup(Position::new(0.0, 0.0), Position::new(1.0, 0.0), 1);
        let rules = ActionRules::default();
        let machine = Machine::new(MachineId::new(), MachineKind::Storage, Position::new(30.0, 0.0), None);
        let machine_id = machine.id;
        world.machines.push(machine);

        assert_eq!(
            check_dropoff(&world, robot, machine_id, &rules).unwrap(),
            Precheck::Skip(SkipReason::NotCarrying)
        );

        let bot = world.robot_mut(robot).unwrap();
        bot.carrying = Some(ResourceKind::Iron);
        bot.carry_amount = 1;
        assert!(matches!(
            check_dropoff(&world, robot, MachineId::new(), &rules).unwrap_err(),
            ActionError::InvalidState { .. }
        ));
        assert!(matches!(
            check_dropoff(&world, robot, machine_id, &rules).unwrap_err(),
            ActionError::OutOfRange { .. }
        ));
    }

    #[test]
    fn malformed_ref_is_invalid_state() {
        let err = parse_ref::<SpawnedResourceId>("resource-1", "resource").unwrap_err();
        assert!(matches!(err, ActionError::InvalidState { .. }));
    }

    #[test]
    fn radius_must_be_sane() {
        assert!(check_radius(10.0).is_ok());
        assert!(check_radius(-1.0).is_err());
        assert!(check_radius(f64::NAN).is_err());
    }
}
