//! Error types for the `refactory-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`].

use refactory_ledger::LedgerError;
use refactory_types::{MachineId, RobotId};

/// Errors that can occur while advancing the world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A robot was not found in the world state.
    #[error("robot not found: {0}")]
    RobotNotFound(RobotId),

    /// A machine was not found in the world state.
    #[error("machine not found: {0}")]
    MachineNotFound(MachineId),

    /// A recipe definition cannot be run.
    #[error("invalid recipe {recipe}: {reason}")]
    InvalidRecipe {
        /// Recipe key.
        recipe: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The spawn area is empty or inverted.
    #[error("invalid spawn bounds: {0}")]
    InvalidBounds(&'static str),

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in world calculation")]
    ArithmeticOverflow,

    /// The energy ledger refused an operation.
    #[error("energy ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: LedgerError,
    },
}
