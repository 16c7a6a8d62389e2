// SPDX-License-Identifier: GPL-3.0-only

//! In-memory partition backend

use std::cell::{Cell, RefCell};

use storage_contracts::{PartitionBackend, StorageError, StorageErrorKind, TableProbe};
use storage_types::{
    Device, FilesystemDescriptor, FilesystemType, Partition, PartitionTable, PartitionTableType,
};

#[derive(Debug, Clone)]
struct MemoryDisk {
    device: Device,
    table: Option<PartitionTable>,
    read_error: Option<StorageError>,
}

/// A fleet of disks held in memory.
///
/// Commits replace the stored table, so a second run against the same
/// backend sees the first run's partitions. Builder methods configure
/// failures for exercising error paths.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    disks: RefCell<Vec<MemoryDisk>>,
    substitutions: Vec<(FilesystemType, FilesystemType)>,
    commit_error: Option<StorageError>,
    unavailable: bool,
    commits: Cell<u32>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device with no partition table
    pub fn with_blank_disk(self, device: Device) -> Self {
        self.push(MemoryDisk {
            device,
            table: None,
            read_error: None,
        })
    }

    pub fn with_labeled_disk(
        self,
        device: Device,
        table_type: PartitionTableType,
        partitions: Vec<Partition>,
    ) -> Self {
        let table = PartitionTable::existing(device.clone(), table_type, partitions);
        self.push(MemoryDisk {
            device,
            table: Some(table),
            read_error: None,
        })
    }

    /// A device whose table cannot be read
    pub fn with_unreadable_disk(self, device: Device) -> Self {
        let error = StorageError::io(format!("{}: input/output error", device.path));
        self.push(MemoryDisk {
            device,
            table: None,
            read_error: Some(error),
        })
    }

    /// A device labeled with a table type the backend cannot handle
    pub fn with_foreign_disk(self, device: Device, label: &str) -> Self {
        let error = StorageError::new(
            StorageErrorKind::Unsupported,
            format!("unsupported partition table label: {label}"),
        );
        self.push(MemoryDisk {
            device,
            table: None,
            read_error: Some(error),
        })
    }

    /// Record `to` whenever `from` is requested
    pub fn with_substitution(mut self, from: FilesystemType, to: FilesystemType) -> Self {
        self.substitutions.push((from, to));
        self
    }

    /// Fail every commit with `error`
    pub fn failing_commits(mut self, error: StorageError) -> Self {
        self.commit_error = Some(error);
        self
    }

    /// Pretend the partitioning tools are missing
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Number of successful commits so far
    pub fn commit_count(&self) -> u32 {
        self.commits.get()
    }

    /// The stored table of `path`, if it has one
    pub fn table(&self, path: &str) -> Option<PartitionTable> {
        self.disks
            .borrow()
            .iter()
            .find(|d| d.device.path == path)
            .and_then(|d| d.table.clone())
    }

    fn push(self, disk: MemoryDisk) -> Self {
        self.disks.borrow_mut().push(disk);
        self
    }

    fn not_found(path: &str) -> StorageError {
        StorageError::new(StorageErrorKind::NotFound, format!("no such device: {path}"))
    }
}

impl PartitionBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::new(
                StorageErrorKind::Unavailable,
                "partitioning tools are not installed",
            ));
        }
        Ok(())
    }

    fn list_devices(&self) -> Result<Vec<Device>, StorageError> {
        Ok(self
            .disks
            .borrow()
            .iter()
            .map(|d| d.device.clone())
            .collect())
    }

    fn read_table(&self, device: &Device) -> Result<TableProbe, StorageError> {
        let disks = self.disks.borrow();
        let disk = disks
            .iter()
            .find(|d| d.device.path == device.path)
            .ok_or_else(|| Self::not_found(&device.path))?;

        if let Some(error) = &disk.read_error {
            return Err(error.clone());
        }

        Ok(match &disk.table {
            Some(table) => TableProbe::Existing(table.clone()),
            None => TableProbe::Absent,
        })
    }

    fn filesystem_descriptor(
        &self,
        _table_type: PartitionTableType,
        fs: FilesystemType,
    ) -> Result<FilesystemDescriptor, StorageError> {
        let recorded = self
            .substitutions
            .iter()
            .find(|(from, _)| *from == fs)
            .map_or(fs, |(_, to)| *to);
        Ok(FilesystemDescriptor {
            fs_type: recorded,
            type_code: recorded.as_str().to_string(),
        })
    }

    fn commit(&self, table: &PartitionTable) -> Result<(), StorageError> {
        if let Some(error) = &self.commit_error {
            return Err(error.clone());
        }

        let mut disks = self.disks.borrow_mut();
        let disk = disks
            .iter_mut()
            .find(|d| d.device.path == table.path())
            .ok_or_else(|| Self::not_found(table.path()))?;

        // like a real partitioner, only the type code reaches the disk
        let mut stored = table.clone();
        for partition in stored.partitions.iter_mut() {
            if table.staged.contains(&partition.number) {
                partition.filesystem = None;
            }
        }
        stored.mark_committed();
        disk.table = Some(stored);
        self.commits.set(self.commits.get() + 1);
        Ok(())
    }
}
