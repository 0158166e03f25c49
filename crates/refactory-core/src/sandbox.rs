//! Script phase of the tick: run the active script once per robot.
//!
//! Robots run in list order, one at a time, so robot N sees every change
//! made by robots before it in the same tick. Each robot first pays the
//! invocation fee; a robot that cannot pay is put in the error state and
//! skipped. Any fault from the host lands on that robot only.
//!
//! For the duration of the phase the world is moved into an
//! `Rc<RefCell<_>>` shared with the per-robot capabilities, then moved back.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use refactory_ledger::EnergyLedger;
use refactory_robots::{ActionRules, ErrorKind};
use refactory_script::{ScriptBudget, ScriptHost, ScriptRobot, ScriptSource};
use refactory_types::{RobotId, WorldState};

/// Diagnostic for a robot that could not pay its invocation fee.
pub const INSUFFICIENT_ENERGY_MESSAGE: &str = "insufficient energy";

/// One robot's failed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotFault {
    /// The robot.
    pub robot_id: RobotId,
    /// Classification.
    pub kind: ErrorKind,
    /// Text written to the robot's `current_instruction`.
    pub message: String,
}

/// What the script phase did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxReport {
    /// Invocations that ran to completion.
    pub completed: u32,
    /// Robots that did not, fee shortfalls included.
    pub faults: Vec<RobotFault>,
    /// Fees plus action charges of every invocation.
    pub energy_used: Decimal,
}

/// Run the active script for every robot.
pub fn execute_all_robots(
    world: &mut WorldState,
    host: &mut dyn ScriptHost,
    rules: &ActionRules,
    budget: &ScriptBudget,
) -> SandboxReport {
    let mut report = SandboxReport::default();
    let Some(script) = world.active_script().cloned() else {
        return report;
    };
    let robot_ids: Vec<RobotId> = world.robots.iter().map(|r| r.id).collect();
    let shared = Rc::new(RefCell::new(std::mem::take(world)));
    let source = ScriptSource {
        id: script.id,
        text: &script.source,
    };

    for robot_id in robot_ids {
        let fee = rules.costs.invocation;
        {
            let mut w = shared.borrow_mut();
            if EnergyLedger::new(&mut w.energy).charge(fee).is_err() {
                if let Some(robot) = w.robot_mut(robot_id) {
                    robot.mark_error(INSUFFICIENT_ENERGY_MESSAGE);
                }
                debug!(robot_id = %robot_id, "invocation fee not covered");
                report.faults.push(RobotFault {
                    robot_id,
                    kind: ErrorKind::InsufficientEnergy,
                    message: INSUFFICIENT_ENERGY_MESSAGE.to_owned(),
                });
                continue;
            }
        }

        let handle = ScriptRobot::bind(Rc::clone(&shared), robot_id, *rules);
        let started = Instant::now();
        let result = host.invoke(&source, handle.clone(), budget);
        let elapsed = started.elapsed();
        handle.expire();

        let charged = fee.saturating_add(handle.energy_charged());
        report.energy_used = report.energy_used.saturating_add(charged);

        let mut w = shared.borrow_mut();
        match result {
            Ok(()) => {
                report.completed = report.completed.saturating_add(1);
                if let Some(entry) = w.script_mut(script.id) {
                    let stats = &mut entry.stats;
                    stats.invocations = stats.invocations.saturating_add(1);
                    let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
                    stats.total_time_us = stats.total_time_us.saturating_add(micros);
                    stats.energy_used = stats.energy_used.saturating_add(charged);
                }
            }
            Err(fault) => {
                let message = fault.to_string();
                warn!(
                    robot_id = %robot_id,
                    kind = %fault.kind().as_str(),
                    error = %message,
                    "robot script fault"
                );
                if let Some(robot) = w.robot_mut(robot_id) {
                    robot.mark_error(message.clone());
                }
                report.faults.push(RobotFault {
                    robot_id,
                    kind: fault.kind(),
                    message,
                });
            }
        }
    }

    *world = match Rc::try_unwrap(shared) {
        Ok(cell) => cell.into_inner(),
        Err(still_shared) => still_shared.borrow().clone(),
    };
    report
}
