//! Sandboxed robot scripts for ReFactory.
//!
//! Player code never sees the world. A [`ScriptHost`] runs one script body
//! for one robot, handing it a [`ScriptRobot`] capability that is bound to
//! that robot and expires when the invocation returns. Faults of any kind
//! come back as a [`ScriptFault`]; the caller decides what happens to the
//! robot.
//!
//! # Modules
//!
//! - [`capability`] -- [`ScriptRobot`], the only object a script can reach.
//! - [`error`] -- [`ScriptFault`].
//! - [`host`] -- The [`ScriptHost`] trait, budgets, and a closure-backed host.
//! - [`rhai_host`] -- The production host on a locked-down Rhai engine.
//! - [`starter`] -- The script new sessions start with.

pub mod capability;
pub mod error;
pub mod host;
pub mod rhai_host;
pub mod starter;

pub use capability::ScriptRobot;
pub use error::ScriptFault;
pub use host::{NativeHost, ScriptBudget, ScriptHost, ScriptSource};
pub use rhai_host::RhaiScriptHost;
pub use starter::{STARTER_SCRIPT, STARTER_SCRIPT_NAME, starter_script};
