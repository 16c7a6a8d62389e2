//! Partition type catalog
//!
//! Maps the type codes sfdisk prints (hex bytes for dos, GUIDs for gpt) to
//! partition roles, and filesystems to the type code a new partition gets.

use serde::Deserialize;
use storage_types::{FilesystemType, PartitionRole, PartitionTableType};

/// Linux filesystem data, used when nothing more specific applies
pub const GPT_LINUX_FILESYSTEM: &str = "0FC63DAF-8483-4772-8E79-3D69D8477DE4";
pub const DOS_LINUX: &str = "83";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PartitionTypeInfo {
    /// `dos` or `gpt`, as sfdisk labels them
    pub table_type: String,
    pub ty: String,
    pub name: String,
    pub role: PartitionRole,
    #[serde(default)]
    pub filesystems: Vec<FilesystemType>,
}

#[derive(Deserialize)]
struct PartitionTypeCatalog {
    types: Vec<PartitionTypeInfo>,
}

const CATALOG_TOML: &str = include_str!("../../resources/types/partition_types.toml");

/// Known partition types
pub static PARTITION_TYPES: std::sync::LazyLock<Vec<PartitionTypeInfo>> =
    std::sync::LazyLock::new(|| match toml::from_str::<PartitionTypeCatalog>(CATALOG_TOML) {
        Ok(catalog) => catalog.types,
        Err(e) => {
            tracing::error!("partition type catalog is invalid: {e}");
            vec![]
        }
    });

fn sfdisk_label(table_type: PartitionTableType) -> &'static str {
    match table_type {
        PartitionTableType::Msdos => "dos",
        PartitionTableType::Gpt => "gpt",
    }
}

/// Canonical form of a type code: dos codes lose any `0x` prefix and leading
/// zeros, GUIDs are compared case-insensitively.
fn normalize(ty: &str) -> String {
    let ty = ty.trim();
    let ty = ty
        .strip_prefix("0x")
        .or_else(|| ty.strip_prefix("0X"))
        .unwrap_or(ty);
    let trimmed = ty.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else if ty.contains('-') {
        ty.to_ascii_lowercase()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

pub fn find_by_id(table_type: PartitionTableType, ty: &str) -> Option<&'static PartitionTypeInfo> {
    let label = sfdisk_label(table_type);
    let wanted = normalize(ty);
    PARTITION_TYPES
        .iter()
        .find(|p| p.table_type == label && normalize(&p.ty) == wanted)
}

/// Role of an existing partition. Numbers 5 and up on a dos table are
/// logical partitions whatever their type.
pub fn role_for(table_type: PartitionTableType, number: u32, ty: &str) -> PartitionRole {
    if table_type == PartitionTableType::Msdos && number >= 5 {
        return PartitionRole::Logical;
    }
    find_by_id(table_type, ty)
        .map(|info| info.role)
        .unwrap_or(PartitionRole::Primary)
}

/// Type code for a new partition that will hold `fs`
pub fn type_for_filesystem(table_type: PartitionTableType, fs: FilesystemType) -> &'static str {
    let label = sfdisk_label(table_type);
    PARTITION_TYPES
        .iter()
        .find(|p| p.table_type == label && p.filesystems.contains(&fs))
        .map(|p| p.ty.as_str())
        .unwrap_or(match table_type {
            PartitionTableType::Msdos => DOS_LINUX,
            PartitionTableType::Gpt => GPT_LINUX_FILESYSTEM,
        })
}
