//! Disk data models
//!
//! A `Device` is the probed identity of a physical disk. It never changes
//! during a run; everything that does change lives in `PartitionTable`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::{GPT_ALIGNMENT_BYTES, LEGACY_LABEL_LIMIT_BYTES, sectors_to_bytes};

/// Physical block device as reported by the partitioning backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Device {
    /// Device path (e.g., "/dev/sda")
    pub path: String,

    /// Disk model name
    pub model: String,

    /// Logical sector size in bytes
    pub sector_size: u64,

    /// Total length in sectors
    pub length: u64,

    /// Start-alignment grain in sectors
    pub alignment_sectors: u64,
}

impl Device {
    /// Build a device with the default 1 MiB alignment grain.
    pub fn new(path: impl Into<String>, model: impl Into<String>, sector_size: u64, length: u64) -> Self {
        Self {
            path: path.into(),
            model: model.into(),
            sector_size,
            length,
            alignment_sectors: default_alignment_sectors(sector_size),
        }
    }

    /// Override the alignment grain (clamped to at least one sector).
    pub fn with_alignment(mut self, alignment_sectors: u64) -> Self {
        self.alignment_sectors = alignment_sectors.max(1);
        self
    }

    /// Total size in bytes
    pub fn size_bytes(&self) -> u64 {
        sectors_to_bytes(self.length, self.sector_size)
    }

    /// Kernel name without the `/dev/` prefix
    pub fn name(&self) -> &str {
        self.path.strip_prefix("/dev/").unwrap_or(&self.path)
    }

    /// Table type a fresh (unlabeled) table on this device gets when the caller
    /// asks for `requested`.
    ///
    /// Legacy tables cannot address the whole of devices above 1 TiB, so such
    /// requests are upgraded to `gpt`.
    pub fn fresh_label(&self, requested: PartitionTableType) -> PartitionTableType {
        if requested == PartitionTableType::Msdos && self.size_bytes() > LEGACY_LABEL_LIMIT_BYTES {
            PartitionTableType::Gpt
        } else {
            requested
        }
    }
}

fn default_alignment_sectors(sector_size: u64) -> u64 {
    if sector_size == 0 {
        1
    } else {
        (GPT_ALIGNMENT_BYTES / sector_size).max(1)
    }
}

/// Partition table format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PartitionTableType {
    /// Legacy MBR / DOS table
    #[default]
    Msdos,
    /// GUID partition table
    Gpt,
}

impl PartitionTableType {
    /// Highest partition number a table of this type can hold as a
    /// primary (non-logical) entry.
    pub fn max_primary_partitions(self) -> u32 {
        match self {
            Self::Msdos => 4,
            Self::Gpt => 128,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Msdos => "msdos",
            Self::Gpt => "gpt",
        }
    }
}

impl fmt::Display for PartitionTableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionTableType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "msdos" | "dos" | "mbr" => Ok(Self::Msdos),
            "gpt" => Ok(Self::Gpt),
            other => Err(format!(
                "invalid partition table type '{other}', expected 'msdos' or 'gpt'"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TIB;

    fn disk_of_bytes(bytes: u64) -> Device {
        Device::new("/dev/sdz", "Test Disk", 512, bytes / 512)
    }

    #[test]
    fn fresh_label_upgrades_large_msdos_requests() {
        let big = disk_of_bytes(2 * TIB);
        assert_eq!(big.fresh_label(PartitionTableType::Msdos), PartitionTableType::Gpt);
        assert_eq!(big.fresh_label(PartitionTableType::Gpt), PartitionTableType::Gpt);
    }

    #[test]
    fn fresh_label_keeps_msdos_at_or_below_threshold() {
        let exact = disk_of_bytes(TIB);
        assert_eq!(exact.fresh_label(PartitionTableType::Msdos), PartitionTableType::Msdos);

        let small = disk_of_bytes(8 * 1024 * 1024 * 1024);
        assert_eq!(small.fresh_label(PartitionTableType::Msdos), PartitionTableType::Msdos);
    }

    #[test]
    fn default_alignment_follows_sector_size() {
        assert_eq!(Device::new("/dev/sda", "", 512, 100).alignment_sectors, 2048);
        assert_eq!(Device::new("/dev/sda", "", 4096, 100).alignment_sectors, 256);
        assert_eq!(Device::new("/dev/sda", "", 512, 100).with_alignment(0).alignment_sectors, 1);
    }

    #[test]
    fn table_type_parsing_normalizes_aliases() {
        assert_eq!("dos".parse::<PartitionTableType>(), Ok(PartitionTableType::Msdos));
        assert_eq!("MBR".parse::<PartitionTableType>(), Ok(PartitionTableType::Msdos));
        assert_eq!("gpt".parse::<PartitionTableType>(), Ok(PartitionTableType::Gpt));
        assert!("apm".parse::<PartitionTableType>().is_err());
    }

    #[test]
    fn test_device_serialization() {
        let disk = Device::new("/dev/nvme0n1", "Samsung SSD 970 EVO", 512, 1_953_525_168);
        let json = serde_json::to_string(&disk).unwrap();
        let deserialized: Device = serde_json::from_str(&json).unwrap();
        assert_eq!(disk, deserialized);
        assert_eq!(disk.name(), "nvme0n1");
        assert_eq!(disk.alignment_sectors, 2048);
    }
}
