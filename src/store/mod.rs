//! Store module: durable collection snapshots.
//!
//! Provides:
//! - The snapshot document and its statistics
//! - The retry ledger
//! - Atomic snapshot persistence

pub mod durable;
pub mod ledger;
pub mod snapshot;

pub use durable::{write_atomic, DurableStore};
pub use ledger::{LedgerEntry, RetryLedger, MAX_ATTEMPTS};
pub use snapshot::{Snapshot, SnapshotStats};
