//! Partition and free-space models
//!
//! All geometry is expressed in sectors of the owning device. `end` is
//! inclusive, so `length == end - start + 1`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::SectorRange;
use crate::filesystem::FilesystemType;

/// A contiguous sector range on a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// First sector (inclusive)
    pub start: u64,

    /// Last sector (inclusive)
    pub end: u64,

    /// Number of sectors
    pub length: u64,
}

impl Geometry {
    /// Geometry of `length` sectors starting at `start`. `length` must be
    /// non-zero.
    pub fn new(start: u64, length: u64) -> Self {
        Self {
            start,
            end: start + length.max(1) - 1,
            length: length.max(1),
        }
    }

    /// Geometry spanning `[start, end]`
    pub fn from_range(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            length: end - start + 1,
        }
    }

    pub fn range(&self) -> SectorRange {
        SectorRange::new(self.start, self.end)
    }

    pub fn overlaps(&self, other: &Geometry) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, other: &Geometry) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

/// Role a partition plays in its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    Primary,
    Extended,
    Logical,
    Raid,
    Lvm,
}

impl PartitionRole {
    /// Logical partitions live inside an extended container and do not take
    /// a primary slot.
    pub fn uses_primary_slot(self) -> bool {
        self != PartitionRole::Logical
    }
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primary => "primary",
            Self::Extended => "extended",
            Self::Logical => "logical",
            Self::Raid => "raid",
            Self::Lvm => "lvm",
        };
        f.write_str(name)
    }
}

/// A partition entry in a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Table-assigned number (1-based)
    pub number: u32,

    pub role: PartitionRole,

    pub geometry: Geometry,

    /// Detected or requested filesystem
    pub filesystem: Option<FilesystemType>,

    /// Partition type code as stored in the table, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_code: Option<String>,
}

impl Partition {
    pub fn new(number: u32, role: PartitionRole, geometry: Geometry) -> Self {
        Self {
            number,
            role,
            geometry,
            filesystem: None,
            type_code: None,
        }
    }

    pub fn with_filesystem(mut self, filesystem: Option<FilesystemType>) -> Self {
        self.filesystem = filesystem;
        self
    }

    pub fn with_type_code(mut self, type_code: impl Into<String>) -> Self {
        self.type_code = Some(type_code.into());
        self
    }

    /// Device node for this partition on `disk_path`
    pub fn path(&self, disk_path: &str) -> String {
        partition_path(disk_path, self.number)
    }
}

/// Device node of partition `number` on `disk_path`.
///
/// Disks whose name ends in a digit (`nvme0n1`, `mmcblk0`, `loop0`) get a `p`
/// separator.
pub fn partition_path(disk_path: &str, number: u32) -> String {
    if disk_path.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{disk_path}p{number}")
    } else {
        format!("{disk_path}{number}")
    }
}

/// A maximal run of sectors not covered by any partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeRegion {
    pub start: u64,
    pub end: u64,
    pub length: u64,
}

impl FreeRegion {
    pub fn from_range(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            length: end - start + 1,
        }
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::from_range(self.start, self.end)
    }
}
