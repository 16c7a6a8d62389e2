// SPDX-License-Identifier: GPL-3.0-only

//! Contracts between the provisioning core and partitioning backends

pub mod protocol;
pub mod traits;

pub use protocol::{StorageError, StorageErrorKind};
pub use traits::{PartitionBackend, TableProbe};
