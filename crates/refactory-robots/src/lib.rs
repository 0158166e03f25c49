//! Energy-metered robot action API for ReFactory.
//!
//! A script never touches the world directly. It receives a capability
//! bound to its own robot, and every effect goes through [`RobotApi`]:
//! precondition checks, then an all-or-nothing charge against the shared
//! energy pool, then the world mutation.
//!
//! # Pickup and dropoff policy
//!
//! Benign races (pile already taken, hands already full, nothing to
//! deliver) are silent skips that cost nothing. Bad references, targets out
//! of range and empty piles are [`ActionError`]s, and so is any charge the
//! pool cannot cover.
//!
//! # Modules
//!
//! - [`actions`] -- Costs, ranges and ordered precondition checks.
//! - [`api`] -- [`RobotApi`], the per-robot capability surface.
//! - [`error`] -- [`ActionError`] and the [`ErrorKind`] fault classification.

pub mod actions;
pub mod api;
pub mod error;

pub use actions::costs::{ActionCosts, ActionKind, ActionRules};
pub use actions::validation::{SkipReason, parse_ref};
pub use api::{ActionOutcome, Inventory, RobotApi, Sensed, SensedKind};
pub use error::{ActionError, ErrorKind};
