//! Energy ledger for the ReFactory simulation.
//!
//! Every costed operation in the simulation (robot actions, script
//! invocations, machine production) draws from one shared [`EnergyPool`].
//! This crate is the only place that pool is debited or credited.
//!
//! # Modules
//!
//! - [`ledger`] -- [`EnergyLedger`]: charge-or-fail debits, regeneration,
//!   clamped credits and capacity changes.
//! - [`audit`] -- [`EnergyAudit`]: per-tick debit/credit totals and the
//!   `0 <= current <= max` bounds check.
//!
//! # Usage
//!
//! ```
//! use refactory_ledger::EnergyLedger;
//! use refactory_types::EnergyPool;
//! use rust_decimal::Decimal;
//!
//! let mut pool = EnergyPool {
//!     current: Decimal::new(1, 0),
//!     max: Decimal::new(10, 0),
//!     regen_rate: Decimal::new(8, 1),
//! };
//! let mut ledger = EnergyLedger::new(&mut pool);
//! assert!(ledger.try_consume(Decimal::new(5, 1)));
//! assert!(!ledger.try_consume(Decimal::new(5, 0)));
//! ```
//!
//! [`EnergyPool`]: refactory_types::EnergyPool

pub mod audit;
pub mod ledger;

pub use audit::{AuditReport, EnergyAudit, verify_bounds};
pub use ledger::EnergyLedger;

use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when operating on the energy pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The pool does not hold enough energy for the debit.
    #[error("insufficient energy: needed {needed}, available {available}")]
    InsufficientEnergy {
        /// Amount requested.
        needed: Decimal,
        /// Amount in the pool at the time of the request.
        available: Decimal,
    },

    /// Amounts passed to the ledger must not be negative.
    #[error("energy amount must not be negative, got {amount}")]
    NegativeAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// The pool left its `0 <= current <= max` bounds.
    #[error("energy out of bounds: current {current}, max {max}")]
    OutOfBounds {
        /// Current energy.
        current: Decimal,
        /// Capacity.
        max: Decimal,
    },

    /// A Decimal operation overflowed.
    #[error("energy arithmetic overflow")]
    Overflow,
}
