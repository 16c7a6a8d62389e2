// SPDX-License-Identifier: GPL-3.0-only

//! Partition commit
//!
//! Adds a solved region to a draft copy of the table and asks the backend to
//! persist it. Only a successful commit replaces the caller's table; a
//! rejected draft is simply dropped.

use storage_contracts::{StorageError, TableProbe};
use storage_types::{
    AllocationResult, FilesystemDescriptor, FilesystemType, Partition, PartitionRole,
    PartitionTable, PartitionTableType,
};

use crate::solver::Region;
use crate::{ProvisionContext, Result};

/// Create a primary partition over `region` on `table`.
///
/// `Ok(None)` means this attempt failed and the caller should try another
/// disk. `Err` is reserved for fatal backend errors.
pub fn commit(
    ctx: &ProvisionContext<'_>,
    table: &mut PartitionTable,
    region: &Region,
    filesystem: Option<FilesystemType>,
) -> Result<Option<AllocationResult>> {
    let descriptor = match filesystem {
        Some(requested) => match resolve_filesystem(ctx, table.table_type, requested)? {
            Some(descriptor) => Some(descriptor),
            None => return Ok(None),
        },
        None => None,
    };

    // the partition is typed for the filesystem but never formatted
    let mut partition = Partition::new(0, PartitionRole::Primary, region.geometry);
    if let Some(descriptor) = &descriptor {
        partition = partition.with_type_code(descriptor.type_code.clone());
    }

    let mut draft = table.clone();
    let number = match draft.add_partition(partition, &region.constraint) {
        Ok(number) => number,
        Err(e) => {
            tracing::warn!(
                "{}: cannot add partition at {}-{}: {e}",
                table.path(),
                region.geometry.start,
                region.geometry.end
            );
            return Ok(None);
        }
    };

    if ctx.dry_run {
        tracing::info!(
            "{}: would create partition {} at {}-{}",
            draft.path(),
            number,
            region.geometry.start,
            region.geometry.end
        );
        let result = describe(&draft, number);
        *table = draft;
        return Ok(result);
    }

    if let Err(e) = ctx.backend.commit(&draft) {
        return recoverable(table, e);
    }
    draft.mark_committed();
    tracing::info!(
        "{}: committed partition {} at {}-{}",
        draft.path(),
        number,
        region.geometry.start,
        region.geometry.end
    );

    *table = reread(ctx, draft, region)?;
    let number = table
        .partitions
        .iter()
        .find(|p| p.geometry.start == region.geometry.start)
        .map(|p| p.number)
        .unwrap_or(number);
    Ok(describe(table, number))
}

/// Ask the backend how it would record `requested`. Substitutions are
/// refused so the device never ends up with an unexpected format.
pub(crate) fn resolve_filesystem(
    ctx: &ProvisionContext<'_>,
    table_type: PartitionTableType,
    requested: FilesystemType,
) -> Result<Option<FilesystemDescriptor>> {
    match ctx.backend.filesystem_descriptor(table_type, requested) {
        Ok(descriptor) if descriptor.fs_type == requested => Ok(Some(descriptor)),
        Ok(descriptor) => {
            tracing::warn!(
                "{} would record {} instead of {}",
                ctx.backend.name(),
                descriptor.fs_type,
                requested
            );
            Ok(None)
        }
        Err(e) if !e.is_fatal() => {
            tracing::warn!("{}: {e}", ctx.backend.name());
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn recoverable(table: &PartitionTable, error: StorageError) -> Result<Option<AllocationResult>> {
    if error.is_fatal() {
        tracing::error!("{}: commit failed: {error}", table.path());
        Err(error)
    } else {
        tracing::warn!("{}: commit rejected: {error}", table.path());
        Ok(None)
    }
}

/// The backend's view of the committed table, which carries the final
/// numbering and geometry. Falls back to the draft when the new partition
/// cannot be found there.
fn reread(
    ctx: &ProvisionContext<'_>,
    draft: PartitionTable,
    region: &Region,
) -> Result<PartitionTable> {
    match ctx.backend.read_table(&draft.device)? {
        TableProbe::Existing(table)
            if table
                .partitions
                .iter()
                .any(|p| p.geometry.overlaps(&region.geometry)) =>
        {
            Ok(table)
        }
        _ => {
            tracing::debug!("{}: keeping draft after commit", draft.path());
            Ok(draft)
        }
    }
}

fn describe(table: &PartitionTable, number: u32) -> Option<AllocationResult> {
    table
        .partition(number)
        .map(|partition| AllocationResult::from_partition(table, partition))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{Demand, place};
    use storage_contracts::StorageErrorKind;
    use storage_testing::MemoryBackend;
    use storage_types::{AllocationStrategy, Device, Geometry, PartitionTableType};

    fn device() -> Device {
        Device::new("/dev/sda", "Disk", 512, 100_000).with_alignment(1)
    }

    fn open(backend: &MemoryBackend) -> PartitionTable {
        let ctx = ProvisionContext::new(backend).with_label(PartitionTableType::Gpt);
        crate::enumerator::list_disks(&ctx).unwrap().remove(0)
    }

    fn region(table: &PartitionTable, sectors: u64) -> Region {
        place(table, Demand::Exact(sectors), 0, AllocationStrategy::Largest).unwrap()
    }

    #[test]
    fn commits_and_reports_assigned_number() {
        let backend = MemoryBackend::new().with_blank_disk(device());
        let ctx = ProvisionContext::new(&backend);
        let mut table = open(&backend);
        let r = region(&table, 1000);

        let result = commit(&ctx, &mut table, &r, Some(FilesystemType::Ext4))
            .unwrap()
            .unwrap();

        assert_eq!(result.disk, "/dev/sda");
        assert_eq!(result.number, 1);
        assert_eq!(result.path, "/dev/sda1");
        assert_eq!(result.start, 34);
        assert_eq!(result.end, 1033);
        assert_eq!(result.size, 1000 * 512);
        // typed for ext4, not formatted
        assert_eq!(result.filesystem, None);
        assert_eq!(backend.commit_count(), 1);
        assert!(!table.is_dirty());

        let stored = backend.table("/dev/sda").unwrap();
        assert_eq!(stored.table_type, PartitionTableType::Gpt);
        assert_eq!(stored.partitions.len(), 1);
        assert_eq!(stored.partitions[0].type_code.as_deref(), Some("ext4"));
    }

    #[test]
    fn substituted_filesystem_is_a_failed_attempt() {
        let backend = MemoryBackend::new()
            .with_blank_disk(device())
            .with_substitution(FilesystemType::Fat16, FilesystemType::Fat32);
        let ctx = ProvisionContext::new(&backend);
        let mut table = open(&backend);
        let before = table.clone();
        let r = region(&table, 1000);

        let result = commit(&ctx, &mut table, &r, Some(FilesystemType::Fat16)).unwrap();

        assert!(result.is_none());
        assert_eq!(table, before);
        assert_eq!(backend.commit_count(), 0);
    }

    #[test]
    fn add_rejection_leaves_table_untouched() {
        let backend = MemoryBackend::new().with_labeled_disk(
            device(),
            PartitionTableType::Gpt,
            vec![Partition::new(1, PartitionRole::Primary, Geometry::new(500, 100))],
        );
        let ctx = ProvisionContext::new(&backend);
        let mut table = open(&backend);
        let before = table.clone();
        // overlaps partition 1
        let g = Geometry::new(450, 100);
        let r = Region {
            geometry: g,
            constraint: storage_types::Constraint::exact(g),
        };

        assert!(commit(&ctx, &mut table, &r, None).unwrap().is_none());
        assert_eq!(table, before);
        assert_eq!(backend.commit_count(), 0);
    }

    #[test]
    fn backend_rejection_is_not_fatal() {
        let backend = MemoryBackend::new()
            .with_blank_disk(device())
            .failing_commits(StorageError::rejected("layout refused"));
        let ctx = ProvisionContext::new(&backend);
        let mut table = open(&backend);
        let r = region(&table, 1000);

        assert!(commit(&ctx, &mut table, &r, None).unwrap().is_none());
        assert!(table.partitions.is_empty());
        assert!(backend.table("/dev/sda").is_none());
    }

    #[test]
    fn io_failure_propagates() {
        let backend = MemoryBackend::new()
            .with_blank_disk(device())
            .failing_commits(StorageError::io("write error on /dev/sda"));
        let ctx = ProvisionContext::new(&backend);
        let mut table = open(&backend);
        let r = region(&table, 1000);

        let err = commit(&ctx, &mut table, &r, None).unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::Io);
    }

    #[test]
    fn dry_run_keeps_draft_without_committing() {
        let backend = MemoryBackend::new().with_blank_disk(device());
        let ctx = ProvisionContext::new(&backend).dry_run(true);
        let mut table = open(&backend);
        let r = region(&table, 1000);

        let result = commit(&ctx, &mut table, &r, None).unwrap().unwrap();

        assert_eq!(result.number, 1);
        assert_eq!(table.partitions.len(), 1);
        assert!(table.is_dirty());
        assert_eq!(backend.commit_count(), 0);
        assert!(backend.table("/dev/sda").is_none());
    }
}
