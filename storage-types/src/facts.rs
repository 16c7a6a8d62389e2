//! Read-only disk snapshot models

use serde::{Deserialize, Serialize};

use crate::disk::PartitionTableType;
use crate::filesystem::FilesystemType;

/// Everything reported about one disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskFacts {
    /// Device path (e.g., "/dev/sda")
    pub path: String,

    pub model: String,

    /// Table type, present or planned for a fresh device
    pub table: PartitionTableType,

    /// True when the device carries no table yet
    pub unlabeled: bool,

    pub sector_size: u64,

    /// Length in sectors
    pub length: u64,

    /// Size in bytes
    pub size: u64,

    /// Size for humans (e.g., "465.76 GB")
    pub size_pretty: String,

    pub primary: Vec<PartitionFacts>,
    pub extended: Vec<PartitionFacts>,
    pub logical: Vec<PartitionFacts>,
    pub raid: Vec<PartitionFacts>,
    pub lvm: Vec<PartitionFacts>,

    pub free: Vec<FreeRegionFacts>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionFacts {
    pub number: u32,
    pub path: String,
    pub start: u64,
    pub end: u64,
    pub length: u64,
    /// Size in bytes
    pub size: u64,
    pub filesystem: Option<FilesystemType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRegionFacts {
    pub start: u64,
    pub end: u64,
    pub length: u64,
    /// Size in bytes
    pub size: u64,
}
