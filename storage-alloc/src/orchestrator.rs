// SPDX-License-Identifier: GPL-3.0-only

//! Request orchestration
//!
//! One `ensure` call reconciles the request against what already exists and
//! then creates what is missing, disk by disk. Commits are never rolled back:
//! a run that stops halfway leaves the partitions it already created.

use storage_contracts::{StorageError, StorageErrorKind};
use storage_types::{AllocationRequest, AllocationResult, EnsureReport, PartitionTable};

use crate::committer::commit;
use crate::enumerator::list_disks;
use crate::reconciler::{find_existing, type_codes};
use crate::solver::solve;
use crate::{ProvisionContext, Result};

/// Make sure `request` is satisfied on the fleet.
///
/// Shortfalls are reported through `missing`; only fatal backend errors
/// return `Err`.
pub fn ensure(ctx: &ProvisionContext<'_>, request: &AllocationRequest) -> Result<EnsureReport> {
    if request.count == 0 {
        return Err(StorageError::new(
            StorageErrorKind::InvalidInput,
            "count must be at least 1",
        ));
    }
    ctx.backend.ensure_available()?;

    let mut disks = list_disks(ctx)?;
    let codes = type_codes(ctx, &disks, request)?;
    let reconciliation = find_existing(&disks, request, ctx.strategy, &codes);
    tracing::info!(
        "{} matching partitions found, {} missing across {} disks",
        reconciliation.existing.len(),
        reconciliation.missing,
        disks.len()
    );

    let (created, missing) = if reconciliation.missing == 0 {
        (Vec::new(), 0)
    } else if request.repeated {
        if reconciliation.placeable < reconciliation.missing {
            tracing::debug!(
                "{} short disks have room for the request",
                reconciliation.placeable
            );
        }
        fill_each_disk(ctx, &mut disks, request, &reconciliation.deficits)?
    } else {
        round_robin(ctx, &mut disks, request, reconciliation.missing)?
    };

    if missing > 0 {
        tracing::warn!("{} partitions could not be placed", missing);
    }

    let report = EnsureReport {
        changed: !created.is_empty(),
        existing: reconciliation.existing,
        created,
        missing,
    };
    tracing::info!(
        "{} {} partitions",
        if ctx.dry_run { "would create" } else { "created" },
        report.created.len()
    );
    Ok(report)
}

/// One attempt per disk per pass until nothing is missing or a pass creates
/// nothing.
fn round_robin(
    ctx: &ProvisionContext<'_>,
    disks: &mut [PartitionTable],
    request: &AllocationRequest,
    mut missing: u32,
) -> Result<(Vec<AllocationResult>, u32)> {
    let mut created = Vec::new();

    while missing > 0 {
        let mut progress = false;
        for disk in disks.iter_mut() {
            if missing == 0 {
                break;
            }
            if let Some(result) = attempt(ctx, disk, request)? {
                created.push(result);
                missing -= 1;
                progress = true;
            }
        }
        if !progress {
            break;
        }
    }

    Ok((created, missing))
}

/// Work each disk until its own deficit is met or it has no more room.
fn fill_each_disk(
    ctx: &ProvisionContext<'_>,
    disks: &mut [PartitionTable],
    request: &AllocationRequest,
    deficits: &[u32],
) -> Result<(Vec<AllocationResult>, u32)> {
    let mut created = Vec::new();
    let mut missing = 0;

    for (disk, deficit) in disks.iter_mut().zip(deficits) {
        let mut deficit = *deficit;
        while deficit > 0 {
            match attempt(ctx, disk, request)? {
                Some(result) => {
                    created.push(result);
                    deficit -= 1;
                }
                None => break,
            }
        }
        if deficit > 0 {
            tracing::debug!("{}: {} still missing", disk.path(), deficit);
        }
        missing += deficit;
    }

    Ok((created, missing))
}

fn attempt(
    ctx: &ProvisionContext<'_>,
    disk: &mut PartitionTable,
    request: &AllocationRequest,
) -> Result<Option<AllocationResult>> {
    let minfree = request.minfree_mib.unwrap_or(0);
    let Some(region) = solve(disk, request.size, minfree, ctx.strategy) else {
        tracing::debug!("{}: no room for {:?}", disk.path(), request.size);
        return Ok(None);
    };
    commit(ctx, disk, &region, request.filesystem)
}
