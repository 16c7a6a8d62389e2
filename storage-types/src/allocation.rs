//! Allocation request and result models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::sectors_to_bytes;
use crate::filesystem::FilesystemType;
use crate::partition::Partition;
use crate::table::PartitionTable;

/// How big the partition has to be, in MiB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeRequirement {
    /// Exactly this many MiB
    Exact(u64),
    /// At least this many MiB, as large as the chosen region allows
    Minimum(u64),
    /// Whatever the largest free region holds after the free-space reserve
    Unbounded,
}

impl SizeRequirement {
    /// Smallest size in MiB an existing partition needs to satisfy this
    pub fn threshold_mib(self) -> u64 {
        match self {
            Self::Exact(mib) | Self::Minimum(mib) => mib,
            Self::Unbounded => 0,
        }
    }
}

/// Region selection rule for minimum-size requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationStrategy {
    /// Largest qualifying region wins
    #[default]
    Largest,
    /// First qualifying region in ascending start order wins
    FirstFit,
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Largest => f.write_str("largest"),
            Self::FirstFit => f.write_str("first-fit"),
        }
    }
}

impl FromStr for AllocationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "largest" => Ok(Self::Largest),
            "first-fit" => Ok(Self::FirstFit),
            other => Err(format!(
                "invalid strategy '{other}', expected 'largest' or 'first-fit'"
            )),
        }
    }
}

/// What the caller wants to exist once a run finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub size: SizeRequirement,

    /// Free space in MiB that must remain after the new partition
    pub minfree_mib: Option<u64>,

    /// Filesystem to create the partition for; also filters existing matches
    pub filesystem: Option<FilesystemType>,

    /// Number of partitions wanted (per disk when `repeated`)
    pub count: u32,

    /// Satisfy the request on every disk rather than `count` times in total
    pub repeated: bool,
}

impl AllocationRequest {
    pub fn new(size: SizeRequirement) -> Self {
        Self {
            size,
            minfree_mib: None,
            filesystem: None,
            count: 1,
            repeated: false,
        }
    }

    pub fn with_minfree(mut self, mib: u64) -> Self {
        self.minfree_mib = Some(mib);
        self
    }

    pub fn with_filesystem(mut self, filesystem: FilesystemType) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn repeated(mut self, repeated: bool) -> Self {
        self.repeated = repeated;
        self
    }
}

/// One partition that satisfies a request, created or pre-existing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Disk device path
    pub disk: String,

    /// Partition number in the disk's table
    pub number: u32,

    /// Partition device path
    pub path: String,

    /// First sector
    pub start: u64,

    /// Last sector (inclusive)
    pub end: u64,

    /// Size in bytes
    pub size: u64,

    pub filesystem: Option<FilesystemType>,
}

impl AllocationResult {
    /// Describe `partition` as it sits in `table`
    pub fn from_partition(table: &PartitionTable, partition: &Partition) -> Self {
        Self {
            disk: table.path().to_string(),
            number: partition.number,
            path: partition.path(table.path()),
            start: partition.geometry.start,
            end: partition.geometry.end,
            size: sectors_to_bytes(partition.geometry.length, table.sector_size()),
            filesystem: partition.filesystem,
        }
    }
}

/// Outcome of an ensure run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureReport {
    /// True when at least one partition was committed
    pub changed: bool,

    /// Partitions that already satisfied the request
    pub existing: Vec<AllocationResult>,

    /// Partitions created by this run
    pub created: Vec<AllocationResult>,

    /// Partitions still wanted after every disk was tried
    pub missing: u32,
}
