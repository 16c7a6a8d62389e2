// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for storage provisioning
//!
//! This crate defines the single source of truth for the provisioning domain.
//! These models are used throughout the stack:
//!
//! - **storage-sys**: Builds `Device` and `PartitionTable` values from `lsblk`/`sfdisk`
//! - **storage-alloc**: Solves placements and produces `AllocationResult`s
//! - **storage-app**: Serializes `EnsureReport` and `DiskFacts` as its JSON report
//!
//! ## Units
//!
//! Geometry is always in sectors of the owning device. Requests are in MiB and
//! converted once, per disk, by [`mib_to_sectors`].

pub mod allocation;
pub mod common;
pub mod constraint;
pub mod disk;
pub mod facts;
pub mod filesystem;
pub mod partition;
pub mod table;

pub use allocation::{
    AllocationRequest, AllocationResult, AllocationStrategy, EnsureReport, SizeRequirement,
};
pub use common::{
    GPT_ALIGNMENT_BYTES, LEGACY_LABEL_LIMIT_BYTES, MIB, SectorRange, TIB, bytes_to_pretty,
    mib_to_sectors, sectors_to_bytes,
};
pub use constraint::{Constraint, ConstraintViolation};
pub use disk::{Device, PartitionTableType};
pub use facts::{DiskFacts, FreeRegionFacts, PartitionFacts};
pub use filesystem::{FilesystemDescriptor, FilesystemType};
pub use partition::{FreeRegion, Geometry, Partition, PartitionRole, partition_path};
pub use table::{PartitionTable, TableError};
