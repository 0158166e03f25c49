//! Charge-or-fail operations against the shared [`EnergyPool`].
//!
//! The ledger borrows the pool for the duration of one operation or one
//! phase. A debit either applies in full or not at all; there is no partial
//! charge and no separate "check then charge" step.

use rust_decimal::Decimal;
use tracing::debug;

use refactory_types::EnergyPool;

use crate::LedgerError;

/// Mutable view over the shared energy pool.
#[derive(Debug)]
pub struct EnergyLedger<'p> {
    pool: &'p mut EnergyPool,
}

impl<'p> EnergyLedger<'p> {
    /// Wrap a pool.
    pub const fn new(pool: &'p mut EnergyPool) -> Self {
        Self { pool }
    }

    /// Energy available now.
    pub const fn current(&self) -> Decimal {
        self.pool.current
    }

    /// Pool capacity.
    pub const fn max(&self) -> Decimal {
        self.pool.max
    }

    /// Debit `amount` if the pool holds at least that much.
    ///
    /// Returns `false` without touching the pool otherwise. Negative amounts
    /// are refused.
    pub fn try_consume(&mut self, amount: Decimal) -> bool {
        self.charge(amount).is_ok()
    }

    /// Debit `amount`, reporting why when it cannot be charged.
    pub fn charge(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount { amount });
        }
        if self.pool.current < amount {
            return Err(LedgerError::InsufficientEnergy {
                needed: amount,
                available: self.pool.current,
            });
        }
        self.pool.current = self
            .pool
            .current
            .checked_sub(amount)
            .ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    /// Apply one tick of regeneration, clamped to capacity.
    ///
    /// Returns the amount actually credited.
    pub fn regenerate(&mut self) -> Decimal {
        let rate = self.pool.regen_rate;
        self.credit(rate)
    }

    /// Credit up to `amount`, clamped to capacity. Returns the amount applied.
    pub fn credit(&mut self, amount: Decimal) -> Decimal {
        if amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let headroom = self
            .pool
            .max
            .checked_sub(self.pool.current)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO);
        let applied = amount.min(headroom);
        self.pool.current = self
            .pool
            .current
            .checked_add(applied)
            .unwrap_or(self.pool.max);
        applied
    }

    /// Raise capacity by `amount`. The current balance is unchanged.
    pub fn raise_max(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount { amount });
        }
        self.pool.max = self
            .pool
            .max
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        debug!(max = %self.pool.max, "energy capacity raised");
        Ok(())
    }

    /// Raise the per-tick regeneration rate by `amount`.
    pub fn boost_regen(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount { amount });
        }
        self.pool.regen_rate = self
            .pool
            .regen_rate
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        debug!(regen_rate = %self.pool.regen_rate, "energy regeneration boosted");
        Ok(())
    }
}
