//! lsblk JSON parsing for device discovery

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use storage_types::{Device, FilesystemType};

use crate::{Result, SysError};

/// Columns for the device listing
pub const DEVICE_COLUMNS: &str = "NAME,PATH,TYPE,SIZE,LOG-SEC,MODEL";

/// Columns for the per-disk filesystem listing
pub const FILESYSTEM_COLUMNS: &str = "PATH,FSTYPE,FSVER";

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: Option<String>,
    path: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    size: Value,
    #[serde(rename = "log-sec", default)]
    log_sec: Value,
    model: Option<String>,
    fstype: Option<String>,
    fsver: Option<String>,
    #[serde(default)]
    children: Vec<LsblkDevice>,
}

/// Older util-linux prints numbers as strings even with `--bytes`
fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse(json: &str) -> Result<LsblkOutput> {
    serde_json::from_str(json).map_err(|e| SysError::Parse {
        what: "lsblk output".to_string(),
        reason: e.to_string(),
    })
}

/// Whole disks from `lsblk --json --bytes --nodeps`, in listing order
pub fn parse_devices(json: &str) -> Result<Vec<Device>> {
    let output = parse(json)?;
    let mut devices = Vec::new();

    for entry in output.blockdevices {
        if entry.kind.as_deref() != Some("disk") {
            continue;
        }

        let path = match (&entry.path, &entry.name) {
            (Some(path), _) => path.clone(),
            (None, Some(name)) => format!("/dev/{name}"),
            (None, None) => continue,
        };

        let sector_size = as_u64(&entry.log_sec).unwrap_or(512);
        let size = as_u64(&entry.size).unwrap_or(0);
        if size == 0 || sector_size == 0 {
            tracing::debug!("{path}: no media, skipping");
            continue;
        }

        let model = entry
            .model
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        devices.push(Device::new(path, model, sector_size, size / sector_size));
    }

    Ok(devices)
}

/// Map a `FSTYPE`/`FSVER` pair to a known filesystem
pub fn filesystem_from(fstype: &str, fsver: Option<&str>) -> Option<FilesystemType> {
    match fstype {
        "ext2" => Some(FilesystemType::Ext2),
        "ext3" => Some(FilesystemType::Ext3),
        "ext4" => Some(FilesystemType::Ext4),
        "xfs" => Some(FilesystemType::Xfs),
        "btrfs" => Some(FilesystemType::Btrfs),
        "ntfs" => Some(FilesystemType::Ntfs),
        "swap" => Some(FilesystemType::LinuxSwap),
        "vfat" => match fsver.map(str::to_ascii_uppercase).as_deref() {
            Some("FAT16") => Some(FilesystemType::Fat16),
            Some("FAT32") => Some(FilesystemType::Fat32),
            _ => None,
        },
        _ => None,
    }
}

/// Filesystems found on a disk's partitions, keyed by partition path
pub fn parse_filesystems(json: &str) -> Result<HashMap<String, FilesystemType>> {
    fn walk(entries: &[LsblkDevice], found: &mut HashMap<String, FilesystemType>) {
        for entry in entries {
            if let (Some(path), Some(fstype)) = (&entry.path, &entry.fstype)
                && let Some(fs) = filesystem_from(fstype, entry.fsver.as_deref())
            {
                found.insert(path.clone(), fs);
            }
            walk(&entry.children, found);
        }
    }

    let output = parse(json)?;
    let mut found = HashMap::new();
    walk(&output.blockdevices, &mut found);
    Ok(found)
}
