//! Error types for robot actions.
//!
//! Every action failure is recoverable: the script boundary turns it into a
//! robot status change and never lets it abort the tick.

use rust_decimal::Decimal;

use refactory_ledger::LedgerError;

/// Why a robot action was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// The shared pool cannot cover the action's cost.
    #[error("insufficient energy: needed {needed}, available {available}")]
    InsufficientEnergy {
        /// Cost of the action.
        needed: Decimal,
        /// Pool balance at the time of the call.
        available: Decimal,
    },

    /// The target is farther than the action allows.
    #[error("target out of range: distance {distance:.1}, max {max:.1}")]
    OutOfRange {
        /// Distance from the robot to the target.
        distance: f64,
        /// Maximum allowed distance.
        max: f64,
    },

    /// The action does not make sense for the current world state.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Human-readable explanation.
        reason: String,
    },
}

impl ActionError {
    /// Shorthand for [`ActionError::InvalidState`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientEnergy { .. } => ErrorKind::InsufficientEnergy,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }
}

impl From<LedgerError> for ActionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientEnergy { needed, available } => {
                Self::InsufficientEnergy { needed, available }
            }
            other => Self::invalid(other.to_string()),
        }
    }
}

/// Classification of any per-robot fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A cost could not be charged.
    InsufficientEnergy,
    /// A pickup or dropoff target was too far away.
    OutOfRange,
    /// A referenced entity is gone, malformed, or in the wrong state.
    InvalidState,
    /// The script itself failed: syntax, runtime, or budget.
    ScriptFault,
}

impl ErrorKind {
    /// Stable lowercase label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InsufficientEnergy => "insufficient_energy",
            Self::OutOfRange => "out_of_range",
            Self::InvalidState => "invalid_state",
            Self::ScriptFault => "script_fault",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn ledger_shortfall_maps_to_insufficient_energy() {
        let err = ActionError::from(LedgerError::InsufficientEnergy {
            needed: dec!(0.5),
            available: dec!(0.1),
        });
        assert_eq!(err.kind(), ErrorKind::InsufficientEnergy);
        assert_eq!(
            err.to_string(),
            "insufficient energy: needed 0.5, available 0.1"
        );
    }

    #[test]
    fn out_of_range_message_is_readable() {
        let err = ActionError::OutOfRange {
            distance: 42.31,
            max: 20.0,
        };
        assert_eq!(err.to_string(), "target out of range: distance 42.3, max 20.0");
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }
}
