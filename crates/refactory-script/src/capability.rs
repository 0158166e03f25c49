//! The robot capability handed to a script.
//!
//! [`ScriptRobot`] is the only thing a script can reach. It is bound to one
//! robot, forwards every call to a fresh [`RobotApi`] over the shared world,
//! and stops working once the sandbox expires it at the end of the
//! invocation. Handles are cheap to clone; clones share the binding.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rust_decimal::Decimal;

use refactory_robots::{
    ActionError, ActionOutcome, ActionRules, Inventory, RobotApi, Sensed, parse_ref,
};
use refactory_types::{
    MachineId, Position, RobotId, RobotStatus, SenseKind, SpawnedResourceId, WorldState,
};

/// Capability bound to one robot for one invocation.
#[derive(Debug, Clone)]
pub struct ScriptRobot {
    world: Rc<RefCell<WorldState>>,
    robot: RobotId,
    rules: ActionRules,
    live: Rc<Cell<bool>>,
    charged: Rc<Cell<Decimal>>,
}

impl ScriptRobot {
    /// Bind a new, live handle.
    pub fn bind(world: Rc<RefCell<WorldState>>, robot: RobotId, rules: ActionRules) -> Self {
        Self {
            world,
            robot,
            rules,
            live: Rc::new(Cell::new(true)),
            charged: Rc::new(Cell::new(Decimal::ZERO)),
        }
    }

    /// The bound robot.
    pub const fn robot_id(&self) -> RobotId {
        self.robot
    }

    /// Whether the handle still works.
    pub fn is_live(&self) -> bool {
        self.live.get()
    }

    /// Disable this handle and every clone of it.
    pub fn expire(&self) {
        self.live.set(false);
    }

    /// Energy charged through this handle and its clones.
    pub fn energy_charged(&self) -> Decimal {
        self.charged.get()
    }

    fn with_api<T>(
        &self,
        f: impl FnOnce(&mut RobotApi<'_>) -> Result<T, ActionError>,
    ) -> Result<T, ActionError> {
        if !self.live.get() {
            return Err(ActionError::invalid("robot handle used after its invocation ended"));
        }
        let mut world = self
            .world
            .try_borrow_mut()
            .ok()
            .ok_or_else(|| ActionError::invalid("world is busy"))?;
        let mut api = RobotApi::new(&mut world, self.robot, self.rules);
        let result = f(&mut api);
        self.charged
            .set(self.charged.get().saturating_add(api.energy_charged()));
        result
    }

    /// Current position.
    pub fn position(&self) -> Result<Position, ActionError> {
        self.with_api(|api| api.get_position())
    }

    /// Current cargo.
    pub fn inventory(&self) -> Result<Inventory, ActionError> {
        self.with_api(|api| api.get_inventory())
    }

    /// Current status.
    pub fn status(&self) -> Result<RobotStatus, ActionError> {
        self.with_api(|api| api.get_status())
    }

    /// Shared pool balance.
    pub fn energy(&self) -> Result<Decimal, ActionError> {
        self.with_api(|api| Ok(api.energy()))
    }

    /// Entities of `kind` within `radius`, nearest first.
    pub fn sense(&self, radius: f64, kind: SenseKind) -> Result<Vec<Sensed>, ActionError> {
        self.with_api(|api| api.sense(radius, kind))
    }

    /// Head for `target`.
    pub fn move_to(&self, target: Position) -> Result<ActionOutcome, ActionError> {
        self.with_api(|api| api.move_to(target))
    }

    /// Take a floor pile.
    pub fn pickup(&self, resource: SpawnedResourceId) -> Result<ActionOutcome, ActionError> {
        self.with_api(|api| api.pickup(resource))
    }

    /// Deliver cargo to a machine.
    pub fn dropoff(&self, machine: MachineId) -> Result<ActionOutcome, ActionError> {
        self.with_api(|api| api.dropoff(machine))
    }

    /// [`pickup`](Self::pickup) by an identifier string from a script.
    pub fn pickup_ref(&self, raw: &str) -> Result<ActionOutcome, ActionError> {
        match parse_ref(raw, "resource") {
            Ok(resource) => self.pickup(resource),
            Err(err) => Err(self.reject(err)),
        }
    }

    /// [`dropoff`](Self::dropoff) by an identifier string from a script.
    pub fn dropoff_ref(&self, raw: &str) -> Result<ActionOutcome, ActionError> {
        match parse_ref(raw, "machine") {
            Ok(machine) => self.dropoff(machine),
            Err(err) => Err(self.reject(err)),
        }
    }

    /// Refusals made before reaching the API still put the robot in error.
    fn reject(&self, err: ActionError) -> ActionError {
        if self.live.get() {
            if let Ok(mut world) = self.world.try_borrow_mut() {
                if let Some(robot) = world.robot_mut(self.robot) {
                    robot.mark_error(err.to_string());
                }
            }
        }
        err
    }
}
