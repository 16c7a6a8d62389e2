// SPDX-License-Identifier: GPL-3.0-only

use storage_types::{
    Device, FilesystemDescriptor, FilesystemType, PartitionTable, PartitionTableType,
};

use crate::StorageError;

/// Result of looking for a partition table on a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableProbe {
    /// The device carries a readable table
    Existing(PartitionTable),
    /// The device is unlabeled
    Absent,
}

/// Everything the provisioning core needs from a partitioning toolchain.
///
/// All geometry crosses this boundary in sectors. Implementations are used
/// from a single thread; one commit owns its device until it returns.
pub trait PartitionBackend {
    /// Short name used in logs (e.g., "sfdisk")
    fn name(&self) -> &str;

    /// Fails with `Unavailable` when the toolchain cannot be used at all
    fn ensure_available(&self) -> Result<(), StorageError>;

    /// Physical block devices in a stable order
    fn list_devices(&self) -> Result<Vec<Device>, StorageError>;

    fn read_table(&self, device: &Device) -> Result<TableProbe, StorageError>;

    /// Filesystem metadata the backend would record for `fs` on a table of
    /// `table_type`. The returned type may differ from `fs` when the backend
    /// substitutes one.
    ///
    /// Only the partition type code is written; the partition stays
    /// unformatted, so later reads report no filesystem on it.
    fn filesystem_descriptor(
        &self,
        table_type: PartitionTableType,
        fs: FilesystemType,
    ) -> Result<FilesystemDescriptor, StorageError>;

    /// Persist the table's staged partitions (and the label itself when the
    /// table is fresh). `Rejected` leaves the device untouched; any other
    /// error means its state is unknown.
    fn commit(&self, table: &PartitionTable) -> Result<(), StorageError>;
}
