//! sfdisk JSON parsing and script rendering

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Deserialize;
use storage_types::{
    Device, FilesystemType, Geometry, Partition, PartitionTable, PartitionTableType,
};

use crate::part_types;
use crate::{Result, SysError};

#[derive(Debug, Deserialize)]
pub struct SfdiskOutput {
    pub partitiontable: SfdiskPartitionTable,
}

#[derive(Debug, Deserialize)]
pub struct SfdiskPartitionTable {
    /// e.g. "gpt", "dos"
    pub label: String,
    pub firstlba: Option<u64>,
    pub lastlba: Option<u64>,
    pub sectorsize: Option<u64>,
    pub partitions: Option<Vec<SfdiskPartition>>,
}

#[derive(Debug, Deserialize)]
pub struct SfdiskPartition {
    /// e.g. "/dev/sda1"
    pub node: String,
    pub start: u64,
    pub size: u64,
    #[serde(rename = "type")]
    pub ty: String,
}

const MISSING_TABLE: &str = "does not contain a recognized partition table";

const LAYOUT_REJECTIONS: [&str; 5] = [
    "failed to add",
    "does not fit",
    "out of range",
    "overlap",
    "no free sector",
];

/// True when sfdisk failed only because the device is unlabeled
pub fn is_missing_table(stderr: &str) -> bool {
    stderr.contains(MISSING_TABLE)
}

/// True when sfdisk refused a script because of its layout. sfdisk checks the
/// whole script before writing, so the device is unchanged in that case.
pub fn is_layout_rejection(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    LAYOUT_REJECTIONS.iter().any(|needle| stderr.contains(needle))
}

pub fn table_type_from_label(label: &str) -> Option<PartitionTableType> {
    match label {
        "dos" => Some(PartitionTableType::Msdos),
        "gpt" => Some(PartitionTableType::Gpt),
        _ => None,
    }
}

/// Partition number from a node name like `/dev/sda3` or `/dev/nvme0n1p3`
pub fn partition_number(disk_path: &str, node: &str) -> Option<u32> {
    let suffix = node.strip_prefix(disk_path)?;
    let suffix = suffix.strip_prefix('p').unwrap_or(suffix);
    suffix.parse().ok()
}

/// Build the table of `device` from `sfdisk --json` output. `filesystems`
/// maps partition paths to the filesystem lsblk found on them.
pub fn parse_table(
    json: &str,
    device: Device,
    filesystems: &HashMap<String, FilesystemType>,
) -> Result<PartitionTable> {
    let output: SfdiskOutput = serde_json::from_str(json).map_err(|e| SysError::Parse {
        what: format!("sfdisk output for {}", device.path),
        reason: e.to_string(),
    })?;
    let pt = output.partitiontable;

    let table_type = table_type_from_label(&pt.label)
        .ok_or_else(|| SysError::UnsupportedLabel(pt.label.clone()))?;

    if let Some(sector_size) = pt.sectorsize
        && sector_size != device.sector_size
    {
        tracing::warn!(
            "{}: sfdisk reports {} byte sectors, lsblk {}",
            device.path,
            sector_size,
            device.sector_size
        );
    }
    tracing::trace!(
        "{}: sfdisk usable lba {:?}-{:?}",
        device.path,
        pt.firstlba,
        pt.lastlba
    );

    let partitions = pt
        .partitions
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let number =
                partition_number(&device.path, &entry.node).unwrap_or(index as u32 + 1);
            let role = part_types::role_for(table_type, number, &entry.ty);
            // catalog spelling, so codes compare equal to descriptor codes
            let type_code = part_types::find_by_id(table_type, &entry.ty)
                .map_or(entry.ty, |known| known.ty.clone());
            Partition::new(number, role, Geometry::new(entry.start, entry.size))
                .with_filesystem(filesystems.get(&entry.node).copied())
                .with_type_code(type_code)
        })
        .collect();

    Ok(PartitionTable::existing(device, table_type, partitions))
}

fn script_type(table_type: PartitionTableType, partition: &Partition) -> String {
    match (&partition.type_code, partition.filesystem) {
        (Some(code), _) if part_types::find_by_id(table_type, code).is_some() => code.clone(),
        (_, Some(fs)) => part_types::type_for_filesystem(table_type, fs).to_string(),
        _ => match table_type {
            PartitionTableType::Msdos => part_types::DOS_LINUX.to_string(),
            PartitionTableType::Gpt => part_types::GPT_LINUX_FILESYSTEM.to_string(),
        },
    }
}

/// sfdisk script creating the staged partitions of `table`. Fresh tables get
/// a `label:` header and are written whole; existing tables are meant to be
/// fed to `sfdisk --append`.
pub fn render_script(table: &PartitionTable) -> String {
    let mut script = String::new();
    if table.fresh {
        let _ = writeln!(script, "label: {}", sfdisk_label(table.table_type));
    }
    let _ = writeln!(script, "unit: sectors");
    script.push('\n');

    let partitions: Vec<&Partition> = if table.fresh {
        table.partitions.iter().collect()
    } else {
        table.staged_partitions().collect()
    };
    for partition in partitions {
        let _ = writeln!(
            script,
            "start={}, size={}, type={}",
            partition.geometry.start,
            partition.geometry.length,
            script_type(table.table_type, partition)
        );
    }
    script
}

fn sfdisk_label(table_type: PartitionTableType) -> &'static str {
    match table_type {
        PartitionTableType::Msdos => "dos",
        PartitionTableType::Gpt => "gpt",
    }
}
