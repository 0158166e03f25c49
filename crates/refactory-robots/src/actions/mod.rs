//! Costs, ranges, and precondition checks for robot actions.
//!
//! # Submodules
//!
//! - [`costs`] -- Energy cost per action and interaction ranges.
//! - [`validation`] -- Ordered precondition checks run before charging.

pub mod costs;
pub mod validation;
