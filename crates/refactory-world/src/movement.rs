//! Per-tick robot movement.
//!
//! Every robot whose status is `Moving` advances a fixed step of `speed`
//! units toward its target. The step does not depend on real elapsed time, so
//! a replay of the same inputs lands on the same positions.

use tracing::debug;

use refactory_types::{RobotId, RobotStatus, WorldState};

/// Outcome of one movement step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementReport {
    /// Robots that moved but are still en route.
    pub moved: Vec<RobotId>,
    /// Robots that reached their target this tick.
    pub arrived: Vec<RobotId>,
}

/// Advance every moving robot by one step.
///
/// A robot within `speed` of its target snaps onto it, drops the target and
/// becomes `Idle`. A `Moving` robot without a target also becomes `Idle`.
pub fn advance_robots(world: &mut WorldState) -> MovementReport {
    let mut report = MovementReport::default();

    for robot in &mut world.robots {
        if robot.status != RobotStatus::Moving {
            continue;
        }
        let Some(target) = robot.target_position else {
            robot.status = RobotStatus::Idle;
            continue;
        };

        let (next, arrived) = robot.position.step_towards(target, robot.speed);
        robot.position = next;
        if arrived {
            robot.status = RobotStatus::Idle;
            robot.target_position = None;
            debug!(robot_id = %robot.id, x = next.x, y = next.y, "robot arrived");
            report.arrived.push(robot.id);
        } else {
            report.moved.push(robot.id);
        }
    }

    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use refactory_types::{Position, Robot};

    use super::*;

    fn world_with_robot(at: Position, target: Option<Position>, status: RobotStatus) -> WorldState {
        let mut robot = Robot::new(RobotId::new(), at, 2.0, Decimal::ZERO);
        robot.target_position = target;
        robot.status = status;
        let mut world = WorldState::default();
        world.robots.push(robot);
        world
    }

    #[test]
    fn reaches_target_in_exactly_five_ticks() {
        let target = Position::new(10.0, 0.0);
        let mut world = world_with_robot(Position::new(0.0, 0.0), Some(target), RobotStatus::Moving);

        for expected_x in [2.0, 4.0, 6.0, 8.0] {
            let report = advance_robots(&mut world);
            let robot = world.robots.first().unwrap();
            assert!((robot.position.x - expected_x).abs() < 1e-9);
            assert_eq!(robot.status, RobotStatus::Moving);
            assert_eq!(report.moved.len(), 1);
        }

        let report = advance_robots(&mut world);
        let robot = world.robots.first().unwrap();
        assert_eq!(robot.position, target);
        assert_eq!(robot.status, RobotStatus::Idle);
        assert!(robot.target_position.is_none());
        assert_eq!(report.arrived, vec![robot.id]);
    }

    #[test]
    fn non_moving_robots_stay_put() {
        let start = Position::new(5.0, 5.0);
        let mut world = world_with_robot(start, Some(Position::new(50.0, 5.0)), RobotStatus::Error);
        let report = advance_robots(&mut world);
        assert_eq!(world.robots.first().unwrap().position, start);
        assert!(report.moved.is_empty());
    }

    #[test]
    fn moving_without_target_becomes_idle() {
        let mut world = world_with_robot(Position::default(), None, RobotStatus::Moving);
        let _ = advance_robots(&mut world);
        assert_eq!(world.robots.first().unwrap().status, RobotStatus::Idle);
    }
}
