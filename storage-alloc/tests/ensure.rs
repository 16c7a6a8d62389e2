use storage_alloc::{ProvisionContext, ensure, facts};
use storage_contracts::{StorageError, StorageErrorKind};
use storage_testing::{MemoryBackend, load_by_name};
use storage_types::{
    AllocationRequest, AllocationStrategy, Device, FilesystemType, Geometry, MIB, Partition,
    PartitionRole, PartitionTableType, SizeRequirement, mib_to_sectors,
};

fn fleet(name: &str) -> MemoryBackend {
    load_by_name(name).expect("fleet spec").backend()
}

#[test]
fn second_run_changes_nothing() {
    let backend = fleet("blank-pair");
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Minimum(100))
        .with_filesystem(FilesystemType::Ext4)
        .with_count(2);

    let first = ensure(&ctx, &request).unwrap();
    assert!(first.changed);
    assert_eq!(first.created.len(), 2);
    assert_eq!(first.created[0].path, "/dev/sda1");
    assert_eq!(first.created[1].path, "/dev/sdb1");
    // largest region, start and end on the 1 MiB grain
    assert_eq!(first.created[0].start, 2048);
    assert_eq!(first.created[0].size, 1023 * MIB);
    // typed for ext4 but left unformatted
    assert_eq!(first.created[0].filesystem, None);
    let stored = backend.table("/dev/sda").unwrap();
    assert_eq!(stored.partitions[0].filesystem, None);

    let second = ensure(&ctx, &request).unwrap();
    assert!(!second.changed);
    assert!(second.created.is_empty());
    assert_eq!(second.existing, first.created);
    assert_eq!(second.missing, 0);
    assert_eq!(backend.commit_count(), 2);
}

#[test]
fn typed_partitions_only_match_their_own_filesystem() {
    let backend = MemoryBackend::new()
        .with_blank_disk(Device::new("/dev/sda", "Disk", 512, mib_to_sectors(1024, 512)));
    let ctx = ProvisionContext::new(&backend);
    let ext4 = AllocationRequest::new(SizeRequirement::Exact(100))
        .with_filesystem(FilesystemType::Ext4);
    let swap = AllocationRequest::new(SizeRequirement::Exact(100))
        .with_filesystem(FilesystemType::LinuxSwap);

    assert!(ensure(&ctx, &ext4).unwrap().changed);
    assert!(!ensure(&ctx, &ext4).unwrap().changed);

    let report = ensure(&ctx, &swap).unwrap();
    assert!(report.existing.is_empty());
    assert_eq!(report.created[0].path, "/dev/sda2");
    assert!(!ensure(&ctx, &swap).unwrap().changed);
    assert_eq!(backend.commit_count(), 2);
}

#[test]
fn idempotent_with_odd_sector_size() {
    let backend = MemoryBackend::new().with_blank_disk(Device::new("/dev/sda", "Odd", 520, 100_000));
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Exact(1));

    let first = ensure(&ctx, &request).unwrap();
    assert_eq!(first.created[0].size, 2016 * 520);
    assert!(!ensure(&ctx, &request).unwrap().changed);
}

#[test]
fn repeated_counts_missing_per_disk() {
    let backend = fleet("five-disks");
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Minimum(100)).repeated(true);

    let report = ensure(&ctx, &request).unwrap();
    let disks: Vec<&str> = report.created.iter().map(|c| c.disk.as_str()).collect();
    assert_eq!(disks, vec!["/dev/vda", "/dev/vdc", "/dev/vde"]);
    assert_eq!(report.missing, 2);
    assert!(report.changed);
}

#[test]
fn existing_partitions_are_matched_by_filesystem() {
    let backend = fleet("mixed-fleet");
    let ctx = ProvisionContext::new(&backend);

    // sda1 and sdc1 are ext4; sdb1 is xfs and never counts
    let request = AllocationRequest::new(SizeRequirement::Minimum(100))
        .with_filesystem(FilesystemType::Ext4)
        .with_count(2);
    let report = ensure(&ctx, &request).unwrap();
    assert!(!report.changed);
    let paths: Vec<&str> = report.existing.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/dev/sda1", "/dev/sdc1"]);
    assert_eq!(backend.commit_count(), 0);
}

#[test]
fn full_msdos_table_is_skipped() {
    let backend = fleet("mixed-fleet");
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Minimum(100))
        .with_filesystem(FilesystemType::Ext4)
        .with_count(4);

    let report = ensure(&ctx, &request).unwrap();
    let created: Vec<&str> = report.created.iter().map(|c| c.path.as_str()).collect();
    // sdb has free space but no primary slot left
    assert_eq!(created, vec!["/dev/sda2", "/dev/sdc3"]);
    assert_eq!(report.missing, 0);
    assert_eq!(backend.table("/dev/sdb").unwrap().partitions.len(), 4);
}

#[test]
fn device_selection_and_nvme_naming() {
    let backend = fleet("mixed-fleet");
    let ctx = ProvisionContext::new(&backend).with_devices(vec!["nvme0n1".to_string()]);
    let request = AllocationRequest::new(SizeRequirement::Exact(256));

    let report = ensure(&ctx, &request).unwrap();
    assert_eq!(report.created.len(), 1);
    let created = &report.created[0];
    assert_eq!(created.path, "/dev/nvme0n1p1");
    assert_eq!(created.start, 256);
    assert_eq!(created.size, 256 * MIB);
    assert_eq!(
        backend.table("/dev/nvme0n1").unwrap().table_type,
        PartitionTableType::Msdos
    );
}

#[test]
fn large_blank_disk_gets_gpt() {
    let backend = fleet("large-blank");
    let ctx = ProvisionContext::new(&backend).with_label(PartitionTableType::Msdos);
    let request = AllocationRequest::new(SizeRequirement::Unbounded).with_count(2);

    let report = ensure(&ctx, &request).unwrap();
    assert_eq!(report.created.len(), 2);
    assert_eq!(
        backend.table("/dev/sda").unwrap().table_type,
        PartitionTableType::Gpt
    );
    assert_eq!(
        backend.table("/dev/sdb").unwrap().table_type,
        PartitionTableType::Msdos
    );
}

#[test]
fn first_fit_takes_earliest_region() {
    let device = Device::new("/dev/sda", "Disk", 512, mib_to_sectors(512, 512));
    let taken = Partition::new(
        1,
        PartitionRole::Primary,
        Geometry::new(mib_to_sectors(60, 512), mib_to_sectors(10, 512)),
    );
    let request = AllocationRequest::new(SizeRequirement::Minimum(20)).with_count(2);

    let backend = MemoryBackend::new().with_labeled_disk(
        device.clone(),
        PartitionTableType::Gpt,
        vec![taken.clone()],
    );
    let ctx = ProvisionContext::new(&backend).with_strategy(AllocationStrategy::FirstFit);
    let report = ensure(&ctx, &request).unwrap();
    assert_eq!(report.created[0].start, 2048);

    let backend =
        MemoryBackend::new().with_labeled_disk(device, PartitionTableType::Gpt, vec![taken]);
    let ctx = ProvisionContext::new(&backend).with_strategy(AllocationStrategy::Largest);
    let report = ensure(&ctx, &request).unwrap();
    assert_eq!(report.created[0].start, mib_to_sectors(70, 512));
}

#[test]
fn dry_run_plans_without_writing() {
    let backend = fleet("blank-pair");
    let ctx = ProvisionContext::new(&backend).dry_run(true);
    let request = AllocationRequest::new(SizeRequirement::Exact(100)).with_count(3);

    let report = ensure(&ctx, &request).unwrap();
    assert!(report.changed);
    assert_eq!(report.created.len(), 3);
    // the planned partition on sda is seen as used by the next pass
    assert_eq!(report.created[2].path, "/dev/sda2");
    assert_eq!(backend.commit_count(), 0);
    assert!(backend.table("/dev/sda").is_none());
}

#[test]
fn io_failure_aborts_run() {
    let backend = fleet("blank-pair").failing_commits(StorageError::io("sfdisk: write failed"));
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Exact(100));

    let err = ensure(&ctx, &request).unwrap_err();
    assert_eq!(err.kind, StorageErrorKind::Io);
}

#[test]
fn rejected_commits_leave_request_missing() {
    let backend = fleet("blank-pair").failing_commits(StorageError::rejected("does not fit"));
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Exact(100)).with_count(2);

    let report = ensure(&ctx, &request).unwrap();
    assert!(!report.changed);
    assert_eq!(report.missing, 2);
}

#[test]
fn substituted_filesystem_creates_nothing() {
    let backend =
        fleet("blank-pair").with_substitution(FilesystemType::Fat16, FilesystemType::Fat32);
    let ctx = ProvisionContext::new(&backend);
    let request =
        AllocationRequest::new(SizeRequirement::Exact(100)).with_filesystem(FilesystemType::Fat16);

    let report = ensure(&ctx, &request).unwrap();
    assert!(report.created.is_empty());
    assert_eq!(report.missing, 1);
    assert_eq!(backend.commit_count(), 0);
}

#[test]
fn unreadable_disk_aborts_before_any_commit() {
    let backend = MemoryBackend::new()
        .with_blank_disk(Device::new("/dev/sda", "A", 512, mib_to_sectors(100, 512)))
        .with_unreadable_disk(Device::new("/dev/sdb", "B", 512, mib_to_sectors(100, 512)));
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Exact(10));

    assert!(ensure(&ctx, &request).is_err());
    assert_eq!(backend.commit_count(), 0);
}

#[test]
fn foreign_label_only_skips_that_disk() {
    let backend = MemoryBackend::new()
        .with_foreign_disk(Device::new("/dev/sda", "Sun", 512, mib_to_sectors(100, 512)), "sun")
        .with_blank_disk(Device::new("/dev/sdb", "B", 512, mib_to_sectors(100, 512)));
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Exact(10));

    let report = ensure(&ctx, &request).unwrap();
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].disk, "/dev/sdb");
    assert_eq!(report.missing, 0);
    assert!(backend.table("/dev/sda").is_none());

    // facts refuse to describe a partial fleet
    assert!(facts::collect(&ctx).is_err());
}

fn gib_disk() -> MemoryBackend {
    MemoryBackend::new().with_blank_disk(Device::new(
        "/dev/sda",
        "Disk",
        512,
        mib_to_sectors(1024, 512),
    ))
}

#[test]
fn minfree_is_left_at_the_tail() {
    let backend = gib_disk();
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Minimum(100))
        .with_minfree(200)
        .with_count(2);

    let report = ensure(&ctx, &request).unwrap();
    assert_eq!(report.created.len(), 1);
    // 1023 MiB usable after the 1 MiB grain, 200 MiB kept back
    let created = &report.created[0];
    assert_eq!(created.start, 2048);
    assert_eq!(created.size, 823 * MIB);
    assert_eq!(created.end, mib_to_sectors(824, 512) - 1);
    // the reserve leaves no room for the second partition
    assert_eq!(report.missing, 1);

    let disks = facts::collect(&ctx).unwrap();
    let tail = disks[0].free.last().unwrap();
    assert_eq!(tail.start, created.end + 1);
    assert_eq!(tail.size, 200 * MIB);
}

#[test]
fn minfree_alone_takes_the_rest_of_the_region() {
    let backend = gib_disk();
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Unbounded).with_minfree(1000);

    let first = ensure(&ctx, &request).unwrap();
    assert_eq!(first.created.len(), 1);
    assert_eq!(first.created[0].size, 23 * MIB);

    // any partition satisfies an unbounded request
    let second = ensure(&ctx, &request).unwrap();
    assert!(!second.changed);
    assert_eq!(second.existing, first.created);
}

#[test]
fn minfree_larger_than_the_disk_creates_nothing() {
    let backend = gib_disk();
    let ctx = ProvisionContext::new(&backend);
    let request = AllocationRequest::new(SizeRequirement::Unbounded).with_minfree(1023);

    let report = ensure(&ctx, &request).unwrap();
    assert!(!report.changed);
    assert_eq!(report.missing, 1);
    assert_eq!(backend.commit_count(), 0);
}

#[test]
fn facts_describe_mixed_fleet() {
    let backend = fleet("mixed-fleet");
    let ctx = ProvisionContext::new(&backend);

    let disks = facts::collect(&ctx).unwrap();
    assert_eq!(disks.len(), 4);
    assert_eq!(disks[1].primary.len(), 2);
    assert_eq!(disks[1].raid.len(), 1);
    assert_eq!(disks[1].lvm.len(), 1);
    assert_eq!(disks[2].extended.len(), 1);
    assert_eq!(disks[2].logical[0].path, "/dev/sdc5");
    assert!(disks[3].unlabeled);
    assert_eq!(disks[3].sector_size, 4096);
}
