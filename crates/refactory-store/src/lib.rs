//! Snapshot persistence for ReFactory.
//!
//! The simulation saves the whole world every few hundred ticks and on
//! operator request. Failures are reported as [`StoreError`] values and
//! never change the running world.

pub mod error;
pub mod snapshot;

pub use error::StoreError;
pub use snapshot::{SNAPSHOT_FORMAT, SnapshotStore, WorldSnapshot};
