//! The script host contract.
//!
//! A [`ScriptHost`] runs one script body for one robot: given the source and
//! a [`ScriptRobot`] capability it either runs to completion or returns a
//! [`ScriptFault`]. Hosts must enforce the [`ScriptBudget`] they are handed
//! so that no script can stall the tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use refactory_types::ScriptId;

use crate::capability::ScriptRobot;
use crate::error::ScriptFault;

/// Source handed to a host for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct ScriptSource<'a> {
    /// Script identity, used as a compile cache key.
    pub id: ScriptId,
    /// Script text.
    pub text: &'a str,
}

/// Limits applied to every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptBudget {
    /// Interpreter operations allowed per invocation.
    #[serde(default = "default_max_operations")]
    pub max_operations: u64,
    /// Wall-clock time allowed per invocation, in milliseconds.
    #[serde(default = "default_wall_clock_ms")]
    pub wall_clock_ms: u64,
    /// Maximum function call nesting.
    #[serde(default = "default_max_call_levels")]
    pub max_call_levels: usize,
}

const fn default_max_operations() -> u64 {
    100_000
}

const fn default_wall_clock_ms() -> u64 {
    50
}

const fn default_max_call_levels() -> usize {
    32
}

impl Default for ScriptBudget {
    fn default() -> Self {
        Self {
            max_operations: default_max_operations(),
            wall_clock_ms: default_wall_clock_ms(),
            max_call_levels: default_max_call_levels(),
        }
    }
}

impl ScriptBudget {
    /// The wall-clock budget as a [`Duration`].
    pub const fn wall_clock(&self) -> Duration {
        Duration::from_millis(self.wall_clock_ms)
    }
}

/// Something that can run a robot script.
pub trait ScriptHost {
    /// Run `script` once for the robot bound to `robot`.
    fn invoke(
        &mut self,
        script: &ScriptSource<'_>,
        robot: ScriptRobot,
        budget: &ScriptBudget,
    ) -> Result<(), ScriptFault>;
}

/// Host backed by a Rust closure instead of script text.
///
/// Ignores the source. Handy for embedding and for tests that need exact
/// control over what each robot does.
pub struct NativeHost<F> {
    program: F,
}

impl<F> NativeHost<F>
where
    F: FnMut(&ScriptRobot) -> Result<(), ScriptFault>,
{
    /// Wrap a closure.
    pub const fn new(program: F) -> Self {
        Self { program }
    }
}

impl<F> std::fmt::Debug for NativeHost<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHost").finish_non_exhaustive()
    }
}

impl<F> ScriptHost for NativeHost<F>
where
    F: FnMut(&ScriptRobot) -> Result<(), ScriptFault>,
{
    fn invoke(
        &mut self,
        _script: &ScriptSource<'_>,
        robot: ScriptRobot,
        _budget: &ScriptBudget,
    ) -> Result<(), ScriptFault> {
        (self.program)(&robot)
    }
}
