//! In-memory partition table
//!
//! A `PartitionTable` is a draft of a device's layout. Adding a partition only
//! changes the draft; the backend persists it on commit. Partitions stay
//! sorted by start sector.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::SectorRange;
use crate::constraint::{Constraint, ConstraintViolation};
use crate::disk::{Device, PartitionTableType};
use crate::partition::{Partition, PartitionRole};

/// Bytes occupied by a GPT partition entry array (128 entries of 128 bytes)
const GPT_ENTRY_ARRAY_BYTES: u64 = 16 * 1024;

/// Legacy tables store 32-bit LBAs
const MSDOS_MAX_SECTORS: u64 = 1 << 32;

/// Why a partition could not be added to a table
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("constraint violated: {0}")]
    Constraint(#[from] ConstraintViolation),
    #[error("sectors {start}-{end} fall outside the usable range {usable_start}-{usable_end}")]
    OutOfBounds {
        start: u64,
        end: u64,
        usable_start: u64,
        usable_end: u64,
    },
    #[error("overlaps partition {number}")]
    Overlap { number: u32 },
    #[error("no free {table} partition slot")]
    NoFreeSlot { table: PartitionTableType },
    #[error("cannot add a {role} partition")]
    UnsupportedRole { role: PartitionRole },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionTable {
    pub device: Device,

    pub table_type: PartitionTableType,

    /// Partitions ordered by start sector
    pub partitions: Vec<Partition>,

    /// True when no table exists on the device yet
    pub fresh: bool,

    /// Numbers of partitions added since the last commit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub staged: Vec<u32>,
}

impl PartitionTable {
    /// A table read back from the device
    pub fn existing(
        device: Device,
        table_type: PartitionTableType,
        mut partitions: Vec<Partition>,
    ) -> Self {
        partitions.sort_by_key(|p| p.geometry.start);
        Self {
            device,
            table_type,
            partitions,
            fresh: false,
            staged: Vec::new(),
        }
    }

    /// An empty table that only exists in memory until committed
    pub fn fresh(device: Device, table_type: PartitionTableType) -> Self {
        Self {
            device,
            table_type,
            partitions: Vec::new(),
            fresh: true,
            staged: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.device.path
    }

    pub fn sector_size(&self) -> u64 {
        self.device.sector_size
    }

    /// Sectors partitions may occupy: the device minus the areas the table
    /// format reserves for itself.
    pub fn usable_range(&self) -> SectorRange {
        let length = self.device.length;
        match self.table_type {
            PartitionTableType::Msdos => {
                // sector 0 holds the MBR
                let addressable = length.min(MSDOS_MAX_SECTORS);
                SectorRange::new(1, addressable.saturating_sub(1))
            }
            PartitionTableType::Gpt => {
                let sector_size = self.sector_size().max(1);
                let entry_sectors = GPT_ENTRY_ARRAY_BYTES.div_ceil(sector_size);
                // protective MBR + header, then the entry array; the backup
                // header and array mirror it at the end
                let first = 2 + entry_sectors;
                let last = length.saturating_sub(2 + entry_sectors);
                SectorRange::new(first, last)
            }
        }
    }

    pub fn partitions_with_role(&self, role: PartitionRole) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().filter(move |p| p.role == role)
    }

    pub fn partition(&self, number: u32) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.number == number)
    }

    pub fn staged_partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions
            .iter()
            .filter(|p| self.staged.contains(&p.number))
    }

    /// True when the draft differs from what is on disk
    pub fn is_dirty(&self) -> bool {
        self.fresh || !self.staged.is_empty()
    }

    /// Lowest unused primary slot
    pub fn next_number(&self) -> Option<u32> {
        (1..=self.table_type.max_primary_partitions())
            .find(|n| !self.partitions.iter().any(|p| p.number == *n))
    }

    /// Add `partition` to the draft, assigning it the next free number.
    ///
    /// The geometry is re-checked against `constraint`, the usable range and
    /// every existing partition. Nothing changes on error.
    pub fn add_partition(
        &mut self,
        mut partition: Partition,
        constraint: &Constraint,
    ) -> Result<u32, TableError> {
        if matches!(partition.role, PartitionRole::Logical | PartitionRole::Extended) {
            return Err(TableError::UnsupportedRole {
                role: partition.role,
            });
        }

        constraint.check(&partition.geometry)?;

        let usable = self.usable_range();
        let geometry = partition.geometry;
        if !usable.contains(geometry.start) || !usable.contains(geometry.end) {
            return Err(TableError::OutOfBounds {
                start: geometry.start,
                end: geometry.end,
                usable_start: usable.start,
                usable_end: usable.end,
            });
        }

        if let Some(existing) = self
            .partitions
            .iter()
            .find(|p| p.geometry.overlaps(&geometry))
        {
            return Err(TableError::Overlap {
                number: existing.number,
            });
        }

        let number = self.next_number().ok_or(TableError::NoFreeSlot {
            table: self.table_type,
        })?;

        partition.number = number;
        let position = self
            .partitions
            .partition_point(|p| p.geometry.start < geometry.start);
        self.partitions.insert(position, partition);
        self.staged.push(number);
        Ok(number)
    }

    /// Forget staged state after the backend persisted the draft
    pub fn mark_committed(&mut self) {
        self.fresh = false;
        self.staged.clear();
    }
}
