//! Storage layer for Frostbook.
//!
//! This crate provides:
//! - An in-memory implementation of the engine's `LedgerStore` port
//! - A JSON snapshot format used for fixtures and by the `closer` binary

pub mod error;
pub mod memory;
pub mod snapshot;

pub use error::{RecordError, SnapshotError};
pub use memory::{FrozenPeriodRows, LoadCounters, MemoryStore, OwnerRecords};
pub use snapshot::{FrozenPeriodRecord, Snapshot};
