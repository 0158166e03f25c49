//! Script fault types.
//!
//! A [`ScriptFault`] is anything that stops one robot's script invocation.
//! The sandbox turns it into that robot's `Error` status; it never escapes
//! the tick.

use std::time::Duration;

use refactory_robots::{ActionError, ErrorKind};

/// Why a script invocation failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptFault {
    /// The source did not compile.
    #[error("script compile error: {message}")]
    Compile {
        /// Parser diagnostic.
        message: String,
    },

    /// The script raised an error of its own.
    #[error("script runtime error: {message}")]
    Runtime {
        /// Interpreter diagnostic.
        message: String,
    },

    /// The invocation used up its operation budget.
    #[error("script exceeded its budget of {limit} operations")]
    BudgetExceeded {
        /// Operations allowed per invocation.
        limit: u64,
    },

    /// The invocation ran past its wall-clock budget.
    #[error("script exceeded its time budget of {limit:?}")]
    Timeout {
        /// Time allowed per invocation.
        limit: Duration,
    },

    /// A robot action failed and the script did not handle it.
    #[error("{source}")]
    Action {
        /// The action failure.
        #[from]
        source: ActionError,
    },
}

impl ScriptFault {
    /// Shorthand for [`ScriptFault::Runtime`].
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Classify the fault.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Action { source } => source.kind(),
            Self::Compile { .. }
            | Self::Runtime { .. }
            | Self::BudgetExceeded { .. }
            | Self::Timeout { .. } => ErrorKind::ScriptFault,
        }
    }
}
