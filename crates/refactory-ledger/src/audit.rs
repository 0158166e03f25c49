//! Per-tick energy audit.
//!
//! The audit is opened with the pool balance at the start of a tick and
//! closed with the balance at the end. Credits (regeneration, rewards) are
//! recorded explicitly; debits are everything else that left the pool, since
//! [`EnergyLedger::charge`](crate::EnergyLedger::charge) is the only way out.
//!
//! ```text
//! closing == opening + credits - debits
//! ```

use rust_decimal::Decimal;
use tracing::warn;

use refactory_types::EnergyPool;

use crate::LedgerError;

/// Totals for one closed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditReport {
    /// The audited tick.
    pub tick: u64,
    /// Balance when the audit opened.
    pub opening: Decimal,
    /// Energy credited during the tick.
    pub credits: Decimal,
    /// Energy debited during the tick.
    pub debits: Decimal,
    /// Balance when the audit closed.
    pub closing: Decimal,
}

/// Open audit for the tick in progress.
#[derive(Debug, Clone, Copy)]
pub struct EnergyAudit {
    tick: u64,
    opening: Decimal,
    credits: Decimal,
}

impl EnergyAudit {
    /// Start auditing `tick` from the pool's current balance.
    pub const fn open(tick: u64, pool: &EnergyPool) -> Self {
        Self {
            tick,
            opening: pool.current,
            credits: Decimal::ZERO,
        }
    }

    /// Record a credit applied to the pool.
    pub fn record_credit(&mut self, amount: Decimal) {
        self.credits = self.credits.saturating_add(amount);
    }

    /// Close the audit, deriving the debit total, and check pool bounds.
    pub fn close(self, pool: &EnergyPool) -> Result<AuditReport, LedgerError> {
        verify_bounds(pool)?;
        let debits = self
            .opening
            .checked_add(self.credits)
            .and_then(|v| v.checked_sub(pool.current))
            .ok_or(LedgerError::Overflow)?;
        Ok(AuditReport {
            tick: self.tick,
            opening: self.opening,
            credits: self.credits,
            debits,
            closing: pool.current,
        })
    }
}

/// Check `0 <= current <= max`.
pub fn verify_bounds(pool: &EnergyPool) -> Result<(), LedgerError> {
    if pool.current < Decimal::ZERO || pool.current > pool.max {
        warn!(current = %pool.current, max = %pool.max, "energy pool out of bounds");
        return Err(LedgerError::OutOfBounds {
            current: pool.current,
            max: pool.max,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::EnergyLedger;

    #[test]
    fn audit_derives_debits() {
        let mut pool = EnergyPool {
            current: dec!(100),
            max: dec!(1000),
            regen_rate: dec!(0.8),
        };
        let mut audit = EnergyAudit::open(7, &pool);
        let mut ledger = EnergyLedger::new(&mut pool);
        audit.record_credit(ledger.regenerate());
        assert!(ledger.try_consume(dec!(0.5)));
        assert!(ledger.try_consume(dec!(0.01)));

        let report = audit.close(&pool).unwrap();
        assert_eq!(report.tick, 7);
        assert_eq!(report.credits, dec!(0.8));
        assert_eq!(report.debits, dec!(0.51));
        assert_eq!(report.closing, dec!(100.29));
    }

    #[test]
    fn bounds_violation_is_reported() {
        let pool = EnergyPool {
            current: dec!(11),
            max: dec!(10),
            regen_rate: Decimal::ZERO,
        };
        assert!(verify_bounds(&pool).is_err());
        assert!(EnergyAudit::open(1, &pool).close(&pool).is_err());
    }
}
