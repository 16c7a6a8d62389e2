//! Filesystem type models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Filesystem types a partition can be created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilesystemType {
    #[serde(rename = "ext2")]
    Ext2,
    #[serde(rename = "ext3")]
    Ext3,
    #[serde(rename = "ext4")]
    Ext4,
    #[serde(rename = "xfs")]
    Xfs,
    #[serde(rename = "btrfs")]
    Btrfs,
    #[serde(rename = "fat16")]
    Fat16,
    #[serde(rename = "fat32")]
    Fat32,
    #[serde(rename = "ntfs")]
    Ntfs,
    #[serde(rename = "linux-swap")]
    LinuxSwap,
}

impl FilesystemType {
    pub const ALL: [FilesystemType; 9] = [
        Self::Ext2,
        Self::Ext3,
        Self::Ext4,
        Self::Xfs,
        Self::Btrfs,
        Self::Fat16,
        Self::Fat32,
        Self::Ntfs,
        Self::LinuxSwap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ext2 => "ext2",
            Self::Ext3 => "ext3",
            Self::Ext4 => "ext4",
            Self::Xfs => "xfs",
            Self::Btrfs => "btrfs",
            Self::Fat16 => "fat16",
            Self::Fat32 => "fat32",
            Self::Ntfs => "ntfs",
            Self::LinuxSwap => "linux-swap",
        }
    }
}

impl fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilesystemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|fs| fs.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|fs| fs.as_str()).collect();
                format!("invalid filesystem '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// A filesystem as the backend will record it for a new partition.
///
/// `fs_type` may differ from what the caller asked for when the backend
/// substitutes an equivalent; callers must compare before using it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesystemDescriptor {
    /// Filesystem the backend will record
    pub fs_type: FilesystemType,

    /// Partition type code written to the table (MBR id or GPT GUID)
    pub type_code: String,
}
