//! The per-robot action API.
//!
//! A [`RobotApi`] is bound to one robot for one call. Costed actions follow
//! the same shape: validate, charge the shared pool, then mutate the world.
//! If validation or the charge fails the world is left exactly as it was,
//! apart from the acting robot moving into the `Error` state.

use rust_decimal::Decimal;
use tracing::debug;

use refactory_ledger::EnergyLedger;
use refactory_types::{
    MachineId, MachineKind, Position, ResourceKind, ResourceRecord, Robot, RobotId, RobotStatus,
    SenseKind, SpawnedResourceId, WorldState,
};
use refactory_world::catalog::resource_label;

use crate::actions::costs::{ActionKind, ActionRules};
use crate::actions::validation::{
    Precheck, SkipReason, acting_robot, check_dropoff, check_pickup, check_radius, check_target,
};
use crate::error::ActionError;

/// What a costed action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action happened and was charged.
    Performed,
    /// Nothing happened and nothing was charged.
    Skipped(SkipReason),
}

impl ActionOutcome {
    /// Whether the action happened.
    pub const fn performed(self) -> bool {
        matches!(self, Self::Performed)
    }
}

/// What a robot is holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inventory {
    /// Cargo kind, if any.
    pub kind: Option<ResourceKind>,
    /// Cargo units. Zero when `kind` is `None`.
    pub amount: u32,
}

/// What a sensed entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensedKind {
    /// A floor pile of this resource.
    Resource(ResourceKind),
    /// A machine of this kind.
    Machine(MachineKind),
}

impl SensedKind {
    /// Lowercase label for scripts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resource(kind) => kind.as_str(),
            Self::Machine(kind) => kind.as_str(),
        }
    }
}

/// One entity returned by a sense call.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensed {
    /// Identifier as text, ready to pass back to `pickup` or `dropoff`.
    pub id: String,
    /// What it is.
    pub kind: SensedKind,
    /// Where it is.
    pub position: Position,
    /// Distance from the robot.
    pub distance: f64,
    /// Units in a pile, or total units buffered in a machine's input.
    pub amount: u64,
}

/// Capability surface for one robot.
#[derive(Debug)]
pub struct RobotApi<'w> {
    world: &'w mut WorldState,
    robot: RobotId,
    rules: ActionRules,
    charged: Decimal,
}

impl<'w> RobotApi<'w> {
    /// Bind the API to `robot`.
    pub const fn new(world: &'w mut WorldState, robot: RobotId, rules: ActionRules) -> Self {
        Self {
            world,
            robot,
            rules,
            charged: Decimal::ZERO,
        }
    }

    /// The bound robot.
    pub const fn robot_id(&self) -> RobotId {
        self.robot
    }

    /// Energy charged through this binding so far.
    pub const fn energy_charged(&self) -> Decimal {
        self.charged
    }

    // -----------------------------------------------------------------------
    // Pure reads
    // -----------------------------------------------------------------------

    /// Current position.
    pub fn get_position(&self) -> Result<Position, ActionError> {
        acting_robot(self.world, self.robot).map(|r| r.position)
    }

    /// Current cargo.
    pub fn get_inventory(&self) -> Result<Inventory, ActionError> {
        acting_robot(self.world, self.robot).map(|r| Inventory {
            kind: r.carrying,
            amount: r.carry_amount,
        })
    }

    /// Current status.
    pub fn get_status(&self) -> Result<RobotStatus, ActionError> {
        acting_robot(self.world, self.robot).map(|r| r.status)
    }

    /// Shared pool balance.
    pub const fn energy(&self) -> Decimal {
        self.world.energy.current
    }

    // -----------------------------------------------------------------------
    // Costed actions
    // -----------------------------------------------------------------------

    /// Everything of `kind` within `radius`, nearest first.
    pub fn sense(&mut self, radius: f64, kind: SenseKind) -> Result<Vec<Sensed>, ActionError> {
        let result = self.sense_inner(radius, kind);
        self.record(result)
    }

    fn sense_inner(&mut self, radius: f64, kind: SenseKind) -> Result<Vec<Sensed>, ActionError> {
        check_radius(radius)?;
        let origin = acting_robot(self.world, self.robot)?.position;
        self.charge(ActionKind::Sense)?;

        let mut hits: Vec<Sensed> = match kind {
            SenseKind::Resources => self
                .world
                .spawned_resources
                .iter()
                .map(|r| Sensed {
                    id: r.id.to_string(),
                    kind: SensedKind::Resource(r.kind),
                    position: r.position,
                    distance: origin.distance(r.position),
                    amount: u64::from(r.amount),
                })
                .filter(|s| s.distance <= radius)
                .collect(),
            SenseKind::Machines => self
                .world
                .machines
                .iter()
                .map(|m| Sensed {
                    id: m.id.to_string(),
                    kind: SensedKind::Machine(m.kind),
                    position: m.position,
                    distance: origin.distance(m.position),
                    amount: m.inventory.values().map(|v| u64::from(*v)).sum(),
                })
                .filter(|s| s.distance <= radius)
                .collect(),
        };
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(hits)
    }

    /// Head for `target`. Re-issuing overwrites the previous target.
    pub fn move_to(&mut self, target: Position) -> Result<ActionOutcome, ActionError> {
        let result = self.move_to_inner(target);
        self.record(result)
    }

    fn move_to_inner(&mut self, target: Position) -> Result<ActionOutcome, ActionError> {
        check_target(target)?;
        acting_robot(self.world, self.robot)?;
        self.charge(ActionKind::Move)?;
        let robot = self.robot_mut()?;
        robot.target_position = Some(target);
        robot.status = RobotStatus::Moving;
        robot.current_instruction = None;
        Ok(ActionOutcome::Performed)
    }

    /// Take a floor pile.
    pub fn pickup(&mut self, resource: SpawnedResourceId) -> Result<ActionOutcome, ActionError> {
        let result = self.pickup_inner(resource);
        self.record(result)
    }

    fn pickup_inner(&mut self, resource: SpawnedResourceId) -> Result<ActionOutcome, ActionError> {
        let plan = match check_pickup(self.world, self.robot, resource, &self.rules)? {
            Precheck::Proceed(plan) => plan,
            Precheck::Skip(reason) => return Ok(self.skip(reason)),
        };
        self.charge(ActionKind::Pickup)?;

        let pile = self
            .world
            .take_spawned_resource(plan.resource)
            .ok_or_else(|| ActionError::invalid(format!("resource {resource} vanished")))?;
        let robot = self.robot_mut()?;
        robot.carrying = Some(pile.kind);
        robot.carry_amount = pile.amount;
        robot.target_position = None;
        robot.status = RobotStatus::Working;
        robot.current_instruction = None;
        debug!(robot_id = %self.robot, kind = %pile.kind, amount = pile.amount, "resource picked up");
        Ok(ActionOutcome::Performed)
    }

    /// Deliver all cargo to a machine.
    pub fn dropoff(&mut self, machine: MachineId) -> Result<ActionOutcome, ActionError> {
        let result = self.dropoff_inner(machine);
        self.record(result)
    }

    fn dropoff_inner(&mut self, machine: MachineId) -> Result<ActionOutcome, ActionError> {
        let plan = match check_dropoff(self.world, self.robot, machine, &self.rules)? {
            Precheck::Proceed(plan) => plan,
            Precheck::Skip(reason) => return Ok(self.skip(reason)),
        };

        // Compute every new count before charging so nothing fails afterwards.
        let target = self
            .world
            .machine(plan.machine)
            .ok_or_else(|| ActionError::invalid(format!("machine {machine} does not exist")))?;
        let buffered = target
            .input_amount(plan.kind)
            .checked_add(plan.amount)
            .ok_or_else(|| ActionError::invalid("machine inventory overflow"))?;
        let total = self
            .world
            .resource_amount(plan.kind)
            .checked_add(u64::from(plan.amount))
            .ok_or_else(|| ActionError::invalid("resource total overflow"))?;

        self.charge(ActionKind::Dropoff)?;

        if let Some(m) = self.world.machine_mut(plan.machine) {
            m.inventory.insert(plan.kind, buffered);
        }
        self.world
            .resources
            .entry(plan.kind)
            .or_insert_with(|| {
                let (name, icon) = resource_label(plan.kind);
                ResourceRecord {
                    kind: plan.kind,
                    name: name.to_owned(),
                    icon: icon.to_owned(),
                    amount: 0,
                }
            })
            .amount = total;

        let robot = self.robot_mut()?;
        robot.carrying = None;
        robot.carry_amount = 0;
        robot.status = RobotStatus::Idle;
        robot.current_instruction = None;
        debug!(robot_id = %self.robot, machine_id = %machine, kind = %plan.kind, amount = plan.amount, "cargo delivered");
        Ok(ActionOutcome::Performed)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn robot_mut(&mut self) -> Result<&mut Robot, ActionError> {
        let id = self.robot;
        self.world
            .robot_mut(id)
            .ok_or_else(|| ActionError::invalid(format!("robot {id} no longer exists")))
    }

    fn charge(&mut self, kind: ActionKind) -> Result<(), ActionError> {
        let cost = self.rules.costs.cost(kind);
        EnergyLedger::new(&mut self.world.energy).charge(cost)?;
        self.charged = self.charged.saturating_add(cost);
        Ok(())
    }

    fn skip(&self, reason: SkipReason) -> ActionOutcome {
        debug!(robot_id = %self.robot, reason = reason.as_str(), "action skipped");
        ActionOutcome::Skipped(reason)
    }

    /// Failures leave the robot in the sticky error state.
    fn record<T>(&mut self, result: Result<T, ActionError>) -> Result<T, ActionError> {
        if let Err(err) = &result {
            let id = self.robot;
            if let Some(robot) = self.world.robot_mut(id) {
                robot.mark_error(err.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use refactory_types::{EnergyPool, Machine, SpawnedResource};
    use refactory_world::catalog::resource_catalog;

    use super::*;

    struct Floor {
        world: WorldState,
        robot: RobotId,
        pile: SpawnedResourceId,
        storage: MachineId,
    }

    fn floor(energy: Decimal) -> Floor {
        let robot = Robot::new(RobotId::new(), Position::new(100.0, 100.0), 2.0, dec!(100));
        let pile = SpawnedResource {
            id: SpawnedResourceId::new(),
            position: Position::new(110.0, 100.0),
            kind: ResourceKind::Iron,
            amount: 1,
        };
        let storage = Machine::new(MachineId::new(), MachineKind::Storage, Position::new(120.0, 100.0), None);
        let ids = (robot.id, pile.id, storage.id);
        let mut world = WorldState::default();
        world.energy = EnergyPool {
            current: energy,
            max: dec!(1000),
            regen_rate: dec!(0.8),
        };
        world.resources = resource_catalog();
        world.robots.push(robot);
        world.spawned_resources.push(pile);
        world.machines.push(storage);
        Floor {
            world,
            robot: ids.0,
            pile: ids.1,
            storage: ids.2,
        }
    }

    #[test]
    fn pickup_then_dropoff_transfers_exact_amount() {
        let mut f = floor(dec!(10));
        let rules = ActionRules::default();

        let mut api = RobotApi::new(&mut f.world, f.robot, rules);
        assert_eq!(api.pickup(f.pile).unwrap(), ActionOutcome::Performed);
        assert_eq!(
            api.get_inventory().unwrap(),
            Inventory {
                kind: Some(ResourceKind::Iron),
                amount: 1
            }
        );
        assert_eq!(api.get_status().unwrap(), RobotStatus::Working);
        assert_eq!(api.dropoff(f.storage).unwrap(), ActionOutcome::Performed);
        assert_eq!(api.energy_charged(), dec!(1.0));

        let robot = f.world.robot(f.robot).unwrap();
        assert!(robot.carrying.is_none());
        assert_eq!(robot.carry_amount, 0);
        assert_eq!(robot.status, RobotStatus::Idle);
        assert_eq!(f.world.machine(f.storage).unwrap().input_amount(ResourceKind::Iron), 1);
        assert_eq!(f.world.resource_amount(ResourceKind::Iron), 1);
        assert!(f.world.spawned_resources.is_empty());
        assert_eq!(f.world.energy.current, dec!(9.0));
    }

    #[test]
    fn second_pickup_of_same_pile_is_skipped() {
        let mut f = floor(dec!(10));
        let other = Robot::new(RobotId::new(), Position::new(105.0, 100.0), 2.0, dec!(100));
        let other_id = other.id;
        f.world.robots.push(other);

        let first = RobotApi::new(&mut f.world, f.robot, ActionRules::default())
            .pickup(f.pile)
            .unwrap();
        assert!(first.performed());

        let before = f.world.energy.current;
        let second = RobotApi::new(&mut f.world, other_id, ActionRules::default())
            .pickup(f.pile)
            .unwrap();
        assert_eq!(second, ActionOutcome::Skipped(SkipReason::ResourceGone));
        assert_eq!(f.world.energy.current, before);
        assert!(f.world.robot(other_id).unwrap().carrying.is_none());
    }

    #[test]
    fn failed_charge_leaves_world_untouched() {
        let mut f = floor(dec!(0.3));
        let err = RobotApi::new(&mut f.world, f.robot, ActionRules::default())
            .pickup(f.pile)
            .unwrap_err();
        assert!(matches!(err, ActionError::InsufficientEnergy { .. }));
        assert_eq!(f.world.spawned_resources.len(), 1);
        assert_eq!(f.world.energy.current, dec!(0.3));

        let robot = f.world.robot(f.robot).unwrap();
        assert!(robot.carrying.is_none());
        assert_eq!(robot.status, RobotStatus::Error);
        assert!(robot.current_instruction.as_deref().unwrap().contains("insufficient energy"));
    }

    #[test]
    fn move_to_charges_and_sets_target() {
        let mut f = floor(dec!(10));
        let target = Position::new(300.0, 300.0);
        let mut api = RobotApi::new(&mut f.world, f.robot, ActionRules::default());
        api.move_to(target).unwrap();
        api.move_to(target).unwrap();
        let robot = f.world.robot(f.robot).unwrap();
        assert_eq!(robot.status, RobotStatus::Moving);
        assert_eq!(robot.target_position, Some(target));
        assert_eq!(f.world.energy.current, dec!(9.8));
    }

    #[test]
    fn success_clears_sticky_error() {
        let mut f = floor(dec!(10));
        f.world.robot_mut(f.robot).unwrap().mark_error("boom");
        RobotApi::new(&mut f.world, f.robot, ActionRules::default())
            .move_to(Position::new(0.0, 0.0))
            .unwrap();
        let robot = f.world.robot(f.robot).unwrap();
        assert_eq!(robot.status, RobotStatus::Moving);
        assert!(robot.current_instruction.is_none());
    }

    #[test]
    fn sense_filters_by_radius_and_sorts() {
        let mut f = floor(dec!(10));
        f.world.spawned_resources.push(SpawnedResource {
            id: SpawnedResourceId::new(),
            position: Position::new(103.0, 100.0),
            kind: ResourceKind::Copper,
            amount: 2,
        });
        f.world.spawned_resources.push(SpawnedResource {
            id: SpawnedResourceId::new(),
            position: Position::new(900.0, 900.0),
            kind: ResourceKind::Copper,
            amount: 1,
        });
        let mut api = RobotApi::new(&mut f.world, f.robot, ActionRules::default());
        let hits = api.sense(50.0, SenseKind::Resources).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits.first().unwrap().kind, SensedKind::Resource(ResourceKind::Copper));
        assert_eq!(api.energy_charged(), dec!(0.05));

        let machines = api.sense(50.0, SenseKind::Machines).unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines.first().unwrap().kind.as_str(), "storage");
    }

    #[test]
    fn dropoff_out_of_range_keeps_cargo() {
        let mut f = floor(dec!(10));
        let bot = f.world.robot_mut(f.robot).unwrap();
        bot.carrying = Some(ResourceKind::Copper);
        bot.carry_amount = 3;
        bot.position = Position::new(500.0, 500.0);

        let err = RobotApi::new(&mut f.world, f.robot, ActionRules::default())
            .dropoff(f.storage)
            .unwrap_err();
        assert!(matches!(err, ActionError::OutOfRange { .. }));
        let robot = f.world.robot(f.robot).unwrap();
        assert_eq!(robot.carry_amount, 3);
        assert_eq!(f.world.resource_amount(ResourceKind::Copper), 0);
        assert_eq!(f.world.energy.current, dec!(10));
    }
}
