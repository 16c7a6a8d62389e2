use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storage_types::{
    Device, FilesystemType, Geometry, Partition, PartitionRole, PartitionTable,
    PartitionTableType, mib_to_sectors,
};

use crate::errors::{Result, TestingError};
use crate::memory::MemoryBackend;

/// A fleet of disks described in TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetSpec {
    pub name: String,
    pub disks: Vec<DiskSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSpec {
    pub path: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_sector_size")]
    pub sector_size: u64,
    pub size_mib: u64,
    /// Absent for an unlabeled disk
    pub table: Option<PartitionTableType>,
    #[serde(default)]
    pub unreadable: bool,
    #[serde(default)]
    pub partitions: Vec<PartitionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub number: u32,
    #[serde(default = "default_role")]
    pub role: PartitionRole,
    pub start_mib: u64,
    pub size_mib: u64,
    pub filesystem: Option<FilesystemType>,
}

fn default_sector_size() -> u64 {
    512
}

fn default_role() -> PartitionRole {
    PartitionRole::Primary
}

impl DiskSpec {
    pub fn device(&self) -> Device {
        Device::new(
            self.path.clone(),
            self.model.clone(),
            self.sector_size,
            mib_to_sectors(self.size_mib, self.sector_size),
        )
    }

    pub fn partitions(&self) -> Vec<Partition> {
        self.partitions
            .iter()
            .map(|p| {
                let geometry = Geometry::new(
                    mib_to_sectors(p.start_mib, self.sector_size),
                    mib_to_sectors(p.size_mib, self.sector_size),
                );
                Partition::new(p.number, p.role, geometry).with_filesystem(p.filesystem)
            })
            .collect()
    }
}

impl FleetSpec {
    /// A backend holding exactly the disks this spec describes
    pub fn backend(&self) -> MemoryBackend {
        self.disks
            .iter()
            .fold(MemoryBackend::new(), |backend, disk| {
                match (disk.unreadable, disk.table) {
                    (true, _) => backend.with_unreadable_disk(disk.device()),
                    (false, Some(table)) => {
                        backend.with_labeled_disk(disk.device(), table, disk.partitions())
                    }
                    (false, None) => backend.with_blank_disk(disk.device()),
                }
            })
    }
}

pub fn workspace_root() -> PathBuf {
    if let Ok(value) = std::env::var("STORAGE_TESTING_WORKSPACE_ROOT") {
        return PathBuf::from(value);
    }

    if let Ok(current_dir) = std::env::current_dir()
        && current_dir.join("resources/lab-specs").exists()
    {
        return current_dir;
    }

    let manifest_root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    if manifest_root.join("resources/lab-specs").exists() {
        return manifest_root;
    }

    PathBuf::from(".")
}

pub fn specs_root() -> PathBuf {
    workspace_root().join("resources/lab-specs")
}

pub fn spec_path_for_name(spec_name: &str) -> PathBuf {
    specs_root().join(format!("{}.toml", spec_name))
}

pub fn load_by_name(spec_name: &str) -> Result<FleetSpec> {
    let path = spec_path_for_name(spec_name);
    if !path.exists() {
        return Err(TestingError::SpecNotFound {
            spec_name: spec_name.to_string(),
        });
    }

    let raw = fs::read_to_string(&path).map_err(|error| TestingError::SpecInvalid {
        spec_name: spec_name.to_string(),
        reason: error.to_string(),
    })?;

    parse(spec_name, &raw)
}

pub fn parse(spec_name: &str, raw: &str) -> Result<FleetSpec> {
    let spec: FleetSpec = toml::from_str(raw).map_err(|error| TestingError::SpecInvalid {
        spec_name: spec_name.to_string(),
        reason: error.to_string(),
    })?;

    validate(&spec)?;
    Ok(spec)
}

pub fn validate(spec: &FleetSpec) -> Result<()> {
    let invalid = |reason: String| TestingError::SpecInvalid {
        spec_name: if spec.name.is_empty() {
            "<unknown>".to_string()
        } else {
            spec.name.clone()
        },
        reason,
    };

    if spec.name.is_empty() {
        return Err(invalid("name must not be empty".to_string()));
    }

    if spec.disks.is_empty() {
        return Err(invalid("disks must not be empty".to_string()));
    }

    let mut paths = HashSet::new();
    for disk in &spec.disks {
        if !paths.insert(disk.path.as_str()) {
            return Err(invalid(format!("duplicate disk {}", disk.path)));
        }

        if disk.sector_size == 0 || disk.size_mib == 0 {
            return Err(invalid(format!(
                "{}: sector_size and size_mib must be positive",
                disk.path
            )));
        }

        if disk.table.is_none() && !disk.partitions.is_empty() {
            return Err(invalid(format!(
                "{}: partitions require a table",
                disk.path
            )));
        }

        let mut numbers = HashSet::new();
        for partition in &disk.partitions {
            if !numbers.insert(partition.number) {
                return Err(invalid(format!(
                    "{}: duplicate partition {}",
                    disk.path, partition.number
                )));
            }
            if partition.start_mib + partition.size_mib > disk.size_mib {
                return Err(invalid(format!(
                    "{}: partition {} extends past the end of the disk",
                    disk.path, partition.number
                )));
            }
        }
    }

    Ok(())
}

/// The tables a fresh enumeration of `spec` would see for labeled disks
pub fn labeled_tables(spec: &FleetSpec) -> Vec<PartitionTable> {
    spec.disks
        .iter()
        .filter_map(|disk| {
            disk.table
                .map(|table| PartitionTable::existing(disk.device(), table, disk.partitions()))
        })
        .collect()
}
