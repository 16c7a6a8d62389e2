// SPDX-License-Identifier: GPL-3.0-only

//! Read-only disk facts

use storage_types::{
    DiskFacts, FreeRegionFacts, Partition, PartitionFacts, PartitionRole, PartitionTable,
    bytes_to_pretty, sectors_to_bytes,
};

use crate::enumerator::list_every_disk;
use crate::free_space::free_regions;
use crate::{ProvisionContext, Result};

/// Enumerate the fleet and describe it. Nothing is written.
pub fn collect(ctx: &ProvisionContext<'_>) -> Result<Vec<DiskFacts>> {
    let disks = list_every_disk(ctx)?;
    Ok(snapshot(&disks))
}

pub fn snapshot(disks: &[PartitionTable]) -> Vec<DiskFacts> {
    disks.iter().map(describe_disk).collect()
}

fn describe_disk(table: &PartitionTable) -> DiskFacts {
    let sector_size = table.sector_size();
    let size = table.device.size_bytes();
    let by_role = |role: PartitionRole| -> Vec<PartitionFacts> {
        table
            .partitions_with_role(role)
            .map(|p| describe_partition(table, p))
            .collect()
    };

    DiskFacts {
        path: table.path().to_string(),
        model: table.device.model.clone(),
        table: table.table_type,
        unlabeled: table.fresh,
        sector_size,
        length: table.device.length,
        size,
        size_pretty: bytes_to_pretty(&size, false),
        primary: by_role(PartitionRole::Primary),
        extended: by_role(PartitionRole::Extended),
        logical: by_role(PartitionRole::Logical),
        raid: by_role(PartitionRole::Raid),
        lvm: by_role(PartitionRole::Lvm),
        free: free_regions(table)
            .into_iter()
            .map(|r| FreeRegionFacts {
                start: r.start,
                end: r.end,
                length: r.length,
                size: sectors_to_bytes(r.length, sector_size),
            })
            .collect(),
    }
}

fn describe_partition(table: &PartitionTable, partition: &Partition) -> PartitionFacts {
    PartitionFacts {
        number: partition.number,
        path: partition.path(table.path()),
        start: partition.geometry.start,
        end: partition.geometry.end,
        length: partition.geometry.length,
        size: sectors_to_bytes(partition.geometry.length, table.sector_size()),
        filesystem: partition.filesystem,
    }
}
