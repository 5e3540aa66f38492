//! Versioned observations of the shared canvas.

pub mod client;
pub mod store;
pub mod types;

pub use client::{ProbeMode, SnapshotClient};
pub use store::{SnapshotStore, StoreOutcome};
pub use types::{PredictionError, Snapshot, UNVERSIONED};
