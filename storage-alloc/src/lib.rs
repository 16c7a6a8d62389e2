// SPDX-License-Identifier: GPL-3.0-only

//! Partition space allocation
//!
//! Finds room for new partitions across a fleet of disks and commits them
//! through a [`PartitionBackend`](storage_contracts::PartitionBackend):
//!
//! - [`enumerator`] opens every disk's table, existing or fresh
//! - [`free_space`] derives free regions from a table
//! - [`solver`] turns a size request into a placement on one disk
//! - [`committer`] adds the placement to the table and persists it
//! - [`reconciler`] counts partitions that already satisfy a request
//! - [`facts`] reports on disks without touching them
//! - [`orchestrator`] ties the above together for one request
//!
//! Everything runs on the calling thread. Disks are visited in the order the
//! backend lists them and free regions in ascending start order, so a run is
//! deterministic for a given on-disk state.

pub mod committer;
pub mod context;
pub mod enumerator;
pub mod facts;
pub mod free_space;
pub mod orchestrator;
pub mod reconciler;
pub mod solver;

pub use context::ProvisionContext;
pub use orchestrator::ensure;
pub use reconciler::Reconciliation;
pub use solver::{Demand, Region};

pub type Result<T> = std::result::Result<T, storage_contracts::StorageError>;
