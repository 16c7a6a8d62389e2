// SPDX-License-Identifier: GPL-3.0-only

//! Free-space location
//!
//! Free regions are the table's usable range minus every partition extent.
//! They are derived from the table on each call and never stored, so a
//! region list is only valid until the table changes.

use storage_types::{FreeRegion, PartitionTable};

/// Free regions of `table` in ascending start order
pub fn free_regions(table: &PartitionTable) -> Vec<FreeRegion> {
    let usable = table.usable_range();
    if usable.is_empty() {
        return Vec::new();
    }

    let mut regions = Vec::new();
    let mut cursor = usable.start;

    // Partitions are kept sorted by start; logical partitions sit inside
    // their extended container and never move the cursor.
    for partition in &table.partitions {
        let extent = partition.geometry;
        if extent.start > usable.end {
            break;
        }
        if extent.end < cursor {
            continue;
        }
        if extent.start > cursor {
            regions.push(FreeRegion::from_range(cursor, extent.start - 1));
        }
        cursor = cursor.max(extent.end.saturating_add(1));
        if cursor > usable.end {
            return regions;
        }
    }

    if cursor <= usable.end {
        regions.push(FreeRegion::from_range(cursor, usable.end));
    }

    regions
}
