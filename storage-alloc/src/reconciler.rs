// SPDX-License-Identifier: GPL-3.0-only

//! Existing-space reconciliation
//!
//! Counts partitions that already satisfy a request so a run only creates
//! what is missing. Running the same request twice therefore changes nothing
//! the second time.

use storage_types::{
    AllocationRequest, AllocationResult, AllocationStrategy, Partition, PartitionRole,
    PartitionTable, mib_to_sectors,
};

use crate::committer::resolve_filesystem;
use crate::solver::solve;
use crate::{ProvisionContext, Result};

/// Outcome of scanning the fleet for a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Qualifying partitions in enumeration order
    pub existing: Vec<AllocationResult>,

    /// Partitions still to create
    pub missing: u32,

    /// Per-disk shortfall, indexed like the scanned disks. Only filled for
    /// repeated requests.
    pub deficits: Vec<u32>,

    /// Short disks that currently have room for the request
    pub placeable: u32,
}

fn saturating_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Type code the backend writes for the requested filesystem on each of
/// `disks`. Partitions are created unformatted, so this is how a previous
/// run's partitions are recognized. `None` where no filesystem was requested
/// or the backend would record a different one.
pub fn type_codes(
    ctx: &ProvisionContext<'_>,
    disks: &[PartitionTable],
    request: &AllocationRequest,
) -> Result<Vec<Option<String>>> {
    let Some(fs) = request.filesystem else {
        return Ok(vec![None; disks.len()]);
    };
    disks
        .iter()
        .map(|disk| {
            let descriptor = resolve_filesystem(ctx, disk.table_type, fs)?;
            Ok(descriptor.map(|d| d.type_code))
        })
        .collect()
}

/// Scan primary partitions of `disks` for ones satisfying `request`.
///
/// `type_codes` is indexed like `disks` (see [`type_codes`]); a partition
/// without a filesystem satisfies a filesystem filter when its type code
/// matches.
pub fn find_existing(
    disks: &[PartitionTable],
    request: &AllocationRequest,
    strategy: AllocationStrategy,
    type_codes: &[Option<String>],
) -> Reconciliation {
    let want = request.count;
    let mut reconciliation = Reconciliation::default();

    for (index, disk) in disks.iter().enumerate() {
        let limit = if request.repeated {
            usize::MAX
        } else {
            usize::try_from(want)
                .unwrap_or(usize::MAX)
                .saturating_sub(reconciliation.existing.len())
        };
        let type_code = type_codes.get(index).and_then(|code| code.as_deref());
        let found = qualifying(disk, request, type_code, limit);
        let on_disk = saturating_count(found.len());
        reconciliation.existing.extend(found);

        if request.repeated {
            let deficit = want.saturating_sub(on_disk);
            if deficit > 0 {
                tracing::debug!("{}: {} of {} present", disk.path(), on_disk, want);
                let minfree = request.minfree_mib.unwrap_or(0);
                if solve(disk, request.size, minfree, strategy).is_some() {
                    reconciliation.placeable += 1;
                }
            }
            reconciliation.missing = reconciliation.missing.saturating_add(deficit);
            reconciliation.deficits.push(deficit);
        }
    }

    if !request.repeated {
        reconciliation.missing =
            want.saturating_sub(saturating_count(reconciliation.existing.len()));
    }

    tracing::debug!(
        "found {} matching partitions, {} missing",
        reconciliation.existing.len(),
        reconciliation.missing
    );
    reconciliation
}

/// Up to `limit` partitions on `disk` that satisfy `request`
fn qualifying(
    disk: &PartitionTable,
    request: &AllocationRequest,
    type_code: Option<&str>,
    limit: usize,
) -> Vec<AllocationResult> {
    let sector_size = disk.sector_size();
    let threshold = mib_to_sectors(request.size.threshold_mib(), sector_size) * sector_size;

    disk.partitions_with_role(PartitionRole::Primary)
        .filter(|p| p.geometry.length.saturating_mul(sector_size) >= threshold)
        .filter(|p| match request.filesystem {
            None => true,
            Some(wanted) => p.filesystem == Some(wanted) || typed_for(p, type_code),
        })
        .take(limit)
        .map(|p| AllocationResult::from_partition(disk, p))
        .collect()
}

/// Unformatted and carrying the type code written for the filesystem
fn typed_for(partition: &Partition, type_code: Option<&str>) -> bool {
    match (partition.filesystem, &partition.type_code, type_code) {
        (None, Some(have), Some(want)) => have.eq_ignore_ascii_case(want),
        _ => false,
    }
}
