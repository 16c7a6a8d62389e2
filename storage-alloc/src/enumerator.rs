// SPDX-License-Identifier: GPL-3.0-only

//! Device enumeration
//!
//! Opens the partition table of every device the backend lists. Unlabeled
//! devices get a fresh in-memory table that only reaches the disk if a
//! partition is later committed to it.

use storage_contracts::TableProbe;
use storage_types::{Device, PartitionTable, PartitionTableType};

use crate::{ProvisionContext, Result};

/// Tables for the devices in the run, in backend order.
///
/// Devices whose table the backend cannot handle (a non-fatal read error,
/// such as a foreign label) are left out. Any other read error aborts the
/// whole listing.
pub fn list_disks(ctx: &ProvisionContext<'_>) -> Result<Vec<PartitionTable>> {
    open_tables(ctx, false)
}

/// Like [`list_disks`], but every read error aborts.
pub fn list_every_disk(ctx: &ProvisionContext<'_>) -> Result<Vec<PartitionTable>> {
    open_tables(ctx, true)
}

fn open_tables(ctx: &ProvisionContext<'_>, strict: bool) -> Result<Vec<PartitionTable>> {
    let devices = ctx.backend.list_devices()?;
    tracing::debug!("{} listed {} devices", ctx.backend.name(), devices.len());

    let mut tables = Vec::with_capacity(devices.len());
    for device in devices {
        if !ctx.wants_device(&device) {
            tracing::debug!("Skipping {} (not selected)", device.path);
            continue;
        }

        let probe = match ctx.backend.read_table(&device) {
            Ok(probe) => probe,
            Err(e) if !strict && !e.is_fatal() => {
                tracing::warn!("Skipping {}: {e}", device.path);
                continue;
            }
            Err(e) => return Err(e),
        };
        let table = match probe {
            TableProbe::Existing(table) => {
                tracing::debug!(
                    "{}: {} table with {} partitions",
                    table.path(),
                    table.table_type,
                    table.partitions.len()
                );
                table
            }
            TableProbe::Absent => open_fresh(device, ctx.default_label),
        };
        tables.push(table);
    }

    Ok(tables)
}

/// Fresh table for an unlabeled device, upgrading `msdos` to `gpt` on
/// devices too large for a legacy table.
pub fn open_fresh(device: Device, requested: PartitionTableType) -> PartitionTable {
    let label = device.fresh_label(requested);
    if label != requested {
        tracing::info!(
            "{}: using {} instead of {} for a {} byte device",
            device.path,
            label,
            requested,
            device.size_bytes()
        );
    } else {
        tracing::debug!("{}: no partition table, drafting {}", device.path, label);
    }
    PartitionTable::fresh(device, label)
}
