//! Energy costs and interaction ranges for robot actions.
//!
//! Costs are [`Decimal`] so that small fees such as 0.01 add up exactly.
//!
//! | Action     | Cost |
//! |------------|------|
//! | move       | 0.1  |
//! | pickup     | 0.5  |
//! | dropoff    | 0.5  |
//! | sense      | 0.05 |
//! | invocation | 0.01 |
//!
//! Pickup reaches 20 units, dropoff 25.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A costed robot operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Set a movement target.
    Move,
    /// Take a floor pile.
    Pickup,
    /// Deliver cargo to a machine.
    Dropoff,
    /// Look around.
    Sense,
    /// Run the robot's script once.
    Invocation,
}

/// Per-call energy costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCosts {
    /// `move_to` cost.
    #[serde(default = "default_move_cost")]
    pub move_to: Decimal,
    /// `pickup` cost.
    #[serde(default = "default_pickup_cost")]
    pub pickup: Decimal,
    /// `dropoff` cost.
    #[serde(default = "default_dropoff_cost")]
    pub dropoff: Decimal,
    /// `sense` and scan cost.
    #[serde(default = "default_sense_cost")]
    pub sense: Decimal,
    /// Flat fee per script invocation.
    #[serde(default = "default_invocation_cost")]
    pub invocation: Decimal,
}

const fn default_move_cost() -> Decimal {
    Decimal::from_parts(1, 0, 0, false, 1)
}

const fn default_pickup_cost() -> Decimal {
    Decimal::from_parts(5, 0, 0, false, 1)
}

const fn default_dropoff_cost() -> Decimal {
    Decimal::from_parts(5, 0, 0, false, 1)
}

const fn default_sense_cost() -> Decimal {
    Decimal::from_parts(5, 0, 0, false, 2)
}

const fn default_invocation_cost() -> Decimal {
    Decimal::from_parts(1, 0, 0, false, 2)
}

impl Default for ActionCosts {
    fn default() -> Self {
        Self {
            move_to: default_move_cost(),
            pickup: default_pickup_cost(),
            dropoff: default_dropoff_cost(),
            sense: default_sense_cost(),
            invocation: default_invocation_cost(),
        }
    }
}

impl ActionCosts {
    /// Cost of one `kind` call.
    pub const fn cost(&self, kind: ActionKind) -> Decimal {
        match kind {
            ActionKind::Move => self.move_to,
            ActionKind::Pickup => self.pickup,
            ActionKind::Dropoff => self.dropoff,
            ActionKind::Sense => self.sense,
            ActionKind::Invocation => self.invocation,
        }
    }
}

/// Costs plus interaction ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionRules {
    /// Energy per call.
    #[serde(default)]
    pub costs: ActionCosts,
    /// Maximum distance to a pile for `pickup`.
    #[serde(default = "default_pickup_range")]
    pub pickup_range: f64,
    /// Maximum distance to a machine for `dropoff`.
    #[serde(default = "default_dropoff_range")]
    pub dropoff_range: f64,
}

const fn default_pickup_range() -> f64 {
    20.0
}

const fn default_dropoff_range() -> f64 {
    25.0
}

impl Default for ActionRules {
    fn default() -> Self {
        Self {
            costs: ActionCosts::default(),
            pickup_range: default_pickup_range(),
            dropoff_range: default_dropoff_range(),
        }
    }
}
