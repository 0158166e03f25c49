//! Quota controller.
//!
//! One quota is active at a time. After production each tick the controller
//! checks, in order:
//!
//! - **Met**: the tracked resource total reached the target. A success entry
//!   is appended, the reward applied, and the next quota in the progression
//!   becomes active (or none once the progression is exhausted).
//! - **Expired**: `time_limit` ticks passed since the quota started. A
//!   failure entry is appended, the tracked total is reset to 0, and the same
//!   quota restarts with a fresh start tick.

use rust_decimal::Decimal;
use tracing::info;

use refactory_ledger::EnergyLedger;
use refactory_types::{
    Position, Quota, QuotaHistoryEntry, RewardKind, Robot, RobotId, WorldState,
};

use crate::catalog::{GRANTED_ROBOT_SPACING, LEVEL_UP_MAX_ENERGY, REGEN_BOOST, default_quota_progression};
use crate::error::WorldError;

/// What the controller did this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaOutcome {
    /// No active quota; the progression is finished.
    Exhausted,
    /// Still in progress.
    InProgress,
    /// The quota was met.
    Completed {
        /// The history entry written.
        entry: QuotaHistoryEntry,
        /// Robot granted by the reward, if any.
        granted_robot: Option<RobotId>,
        /// Energy added to the pool by the reward.
        energy_credited: Decimal,
    },
    /// The quota timed out and restarted.
    Failed {
        /// The history entry written.
        entry: QuotaHistoryEntry,
    },
}

/// Parameters for robots granted by rewards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrantedRobotTemplate {
    /// Position of the first robot; granted robots line up to its right.
    pub origin: Position,
    /// Speed of granted robots.
    pub speed: f64,
    /// Informational energy of granted robots.
    pub energy: Decimal,
}

/// Drives the fixed quota progression.
#[derive(Debug, Clone)]
pub struct QuotaController {
    progression: Vec<Quota>,
    template: GrantedRobotTemplate,
}

impl QuotaController {
    /// Controller over a custom progression.
    pub const fn new(progression: Vec<Quota>, template: GrantedRobotTemplate) -> Self {
        Self {
            progression,
            template,
        }
    }

    /// Controller over the default five-step progression.
    pub fn with_default_progression(template: GrantedRobotTemplate) -> Self {
        Self::new(default_quota_progression(), template)
    }

    /// The progression, in order.
    pub fn progression(&self) -> &[Quota] {
        &self.progression
    }

    /// First quota of the progression.
    pub fn first(&self) -> Option<Quota> {
        self.progression.first().cloned()
    }

    /// Fraction of the active quota achieved, in `[0, 1]`.
    pub fn progress(world: &WorldState) -> f64 {
        let Some(quota) = world.current_quota.as_ref() else {
            return 0.0;
        };
        if quota.target_amount == 0 {
            return 1.0;
        }
        let ratio = world.resource_amount(quota.resource) as f64 / quota.target_amount as f64;
        ratio.min(1.0)
    }

    /// Ticks left before the active quota expires.
    pub const fn time_remaining(world: &WorldState) -> u64 {
        let Some(quota) = world.current_quota.as_ref() else {
            return 0;
        };
        let elapsed = world.tick.saturating_sub(world.quota_start_tick);
        quota.time_limit.saturating_sub(elapsed)
    }

    /// Evaluate the active quota against the post-production world.
    pub fn evaluate(&self, world: &mut WorldState) -> Result<QuotaOutcome, WorldError> {
        let Some(quota) = world.current_quota.clone() else {
            return Ok(QuotaOutcome::Exhausted);
        };

        if world.resource_amount(quota.resource) >= quota.target_amount {
            return self.complete(world, &quota);
        }
        if Self::time_remaining(world) == 0 {
            return Ok(Self::fail(world, &quota));
        }
        Ok(QuotaOutcome::InProgress)
    }

    fn complete(&self, world: &mut WorldState, quota: &Quota) -> Result<QuotaOutcome, WorldError> {
        let entry = QuotaHistoryEntry {
            level: world.quota_level,
            success: true,
            resource: quota.resource,
            target_amount: quota.target_amount,
            actual_amount: world.resource_amount(quota.resource),
            time_used: world.tick.saturating_sub(world.quota_start_tick),
            reward_description: Some(quota.reward.description.clone()),
            tick: world.tick,
        };
        world.quota_history.push(entry.clone());

        let (granted_robot, energy_credited) = self.apply_reward(world, quota.reward.kind)?;

        let next_index = usize::try_from(world.quota_level)
            .ok()
            .ok_or(WorldError::ArithmeticOverflow)?;
        world.quota_level = world
            .quota_level
            .checked_add(1)
            .ok_or(WorldError::ArithmeticOverflow)?;
        world.current_quota = self.progression.get(next_index).cloned();
        world.quota_start_tick = world.tick;

        info!(
            tick = world.tick,
            quota_level = entry.level,
            resource = %quota.resource,
            time_used = entry.time_used,
            reward = %quota.reward.description,
            "quota completed"
        );
        if world.current_quota.is_none() {
            info!(tick = world.tick, "quota progression complete");
        }

        Ok(QuotaOutcome::Completed {
            entry,
            granted_robot,
            energy_credited,
        })
    }

    fn fail(world: &mut WorldState, quota: &Quota) -> QuotaOutcome {
        let actual_amount = world.resource_amount(quota.resource);
        let entry = QuotaHistoryEntry {
            level: world.quota_level,
            success: false,
            resource: quota.resource,
            target_amount: quota.target_amount,
            actual_amount,
            time_used: world.tick.saturating_sub(world.quota_start_tick),
            reward_description: None,
            tick: world.tick,
        };
        world.quota_history.push(entry.clone());

        if let Some(record) = world.resources.get_mut(&quota.resource) {
            record.amount = 0;
        }
        world.quota_start_tick = world.tick;

        info!(
            tick = world.tick,
            quota_level = entry.level,
            resource = %quota.resource,
            actual_amount,
            target_amount = quota.target_amount,
            "quota failed, restarting"
        );
        QuotaOutcome::Failed { entry }
    }

    /// Apply `kind`, returning any granted robot and the energy credited.
    fn apply_reward(
        &self,
        world: &mut WorldState,
        kind: RewardKind,
    ) -> Result<(Option<RobotId>, Decimal), WorldError> {
        match kind {
            RewardKind::GrantRobot => {
                let offset = GRANTED_ROBOT_SPACING * world.robots.len() as f64;
                let robot = Robot::new(
                    RobotId::new(),
                    self.template.origin.offset(offset, 0.0),
                    self.template.speed,
                    self.template.energy,
                );
                let id = robot.id;
                world.robots.push(robot);
                Ok((Some(id), Decimal::ZERO))
            }
            RewardKind::BoostEnergyRegen => {
                EnergyLedger::new(&mut world.energy).boost_regen(REGEN_BOOST)?;
                Ok((None, Decimal::ZERO))
            }
            RewardKind::LevelUp => {
                world.level = world
                    .level
                    .checked_add(1)
                    .ok_or(WorldError::ArithmeticOverflow)?;
                let mut ledger = EnergyLedger::new(&mut world.energy);
                ledger.raise_max(LEVEL_UP_MAX_ENERGY)?;
                // The new capacity arrives filled.
                let credited = ledger.credit(LEVEL_UP_MAX_ENERGY);
                Ok((None, credited))
            }
        }
    }
}
