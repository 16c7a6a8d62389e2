// SPDX-License-Identifier: GPL-3.0-only

//! Run settings
//!
//! Flags override the config file, the config file overrides built-in
//! defaults. Everything is validated here, before any disk is touched.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use storage_types::{
    AllocationRequest, AllocationStrategy, FilesystemType, PartitionTableType, SizeRequirement,
};
use thiserror::Error;

use crate::cli::{EnsureArgs, FactsArgs};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("size and minsize are mutually exclusive")]
    ConflictingSize,
    #[error("one of size, minsize or minfree is required")]
    MissingSize,
    #[error("count must be at least 1")]
    ZeroCount,
}

/// Keys accepted in the config file; names match the long flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub size: Option<u64>,
    pub minsize: Option<u64>,
    pub minfree: Option<u64>,
    pub count: Option<u32>,
    pub repeated: Option<bool>,
    pub filesystem: Option<FilesystemType>,
    pub label: Option<PartitionTableType>,
    pub strategy: Option<AllocationStrategy>,
    #[serde(default)]
    pub devices: Vec<String>,
    pub dry_run: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Fully resolved settings for `ensure`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureSettings {
    pub request: AllocationRequest,
    pub label: PartitionTableType,
    pub strategy: AllocationStrategy,
    pub devices: Vec<String>,
    pub dry_run: bool,
}

/// Fully resolved settings for `facts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactsSettings {
    pub label: PartitionTableType,
    pub devices: Vec<String>,
}

fn size_requirement(
    size: Option<u64>,
    minsize: Option<u64>,
) -> Result<Option<SizeRequirement>, ConfigError> {
    match (size, minsize) {
        (Some(_), Some(_)) => Err(ConfigError::ConflictingSize),
        (Some(mib), None) => Ok(Some(SizeRequirement::Exact(mib))),
        (None, Some(mib)) => Ok(Some(SizeRequirement::Minimum(mib))),
        (None, None) => Ok(None),
    }
}

fn pick_devices(flags: &[String], file: &[String]) -> Vec<String> {
    if flags.is_empty() {
        file.to_vec()
    } else {
        flags.to_vec()
    }
}

impl EnsureSettings {
    pub fn resolve(flags: &EnsureArgs, file: &FileConfig) -> Result<Self, ConfigError> {
        // a size given on the command line replaces the file's, whichever
        // kind either of them is
        let from_flags = size_requirement(flags.size, flags.minsize)?;
        let from_file = size_requirement(file.size, file.minsize)?;
        let minfree = flags.minfree.or(file.minfree);

        let size = match (from_flags.or(from_file), minfree) {
            (Some(size), _) => size,
            (None, Some(_)) => SizeRequirement::Unbounded,
            (None, None) => return Err(ConfigError::MissingSize),
        };

        let count = flags.count.or(file.count).unwrap_or(1);
        if count == 0 {
            return Err(ConfigError::ZeroCount);
        }

        let mut request = AllocationRequest::new(size)
            .with_count(count)
            .repeated(flags.repeated || file.repeated.unwrap_or(false));
        request.minfree_mib = minfree;
        request.filesystem = flags.filesystem.or(file.filesystem);

        Ok(Self {
            request,
            label: flags.label.or(file.label).unwrap_or_default(),
            strategy: flags.strategy.or(file.strategy).unwrap_or_default(),
            devices: pick_devices(&flags.devices, &file.devices),
            dry_run: flags.dry_run || file.dry_run.unwrap_or(false),
        })
    }
}

impl FactsSettings {
    pub fn resolve(flags: &FactsArgs, file: &FileConfig) -> Self {
        Self {
            label: flags.label.or(file.label).unwrap_or_default(),
            devices: pick_devices(&flags.devices, &file.devices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file(raw: &str) -> FileConfig {
        toml::from_str(raw).unwrap()
    }

    #[test]
    fn defaults() {
        let flags = EnsureArgs {
            size: Some(512),
            ..Default::default()
        };
        let settings = EnsureSettings::resolve(&flags, &FileConfig::default()).unwrap();
        assert_eq!(settings.request.size, SizeRequirement::Exact(512));
        assert_eq!(settings.request.count, 1);
        assert!(!settings.request.repeated);
        assert_eq!(settings.label, PartitionTableType::Msdos);
        assert_eq!(settings.strategy, AllocationStrategy::Largest);
        assert!(!settings.dry_run);
    }

    #[test]
    fn flags_override_file() {
        let cfg = file(
            r#"
            size = 100
            count = 3
            label = "gpt"
            filesystem = "xfs"
            devices = ["/dev/sdb"]
            "#,
        );
        let flags = EnsureArgs {
            minsize: Some(200),
            filesystem: Some(FilesystemType::Ext4),
            ..Default::default()
        };
        let settings = EnsureSettings::resolve(&flags, &cfg).unwrap();
        assert_eq!(settings.request.size, SizeRequirement::Minimum(200));
        assert_eq!(settings.request.count, 3);
        assert_eq!(settings.request.filesystem, Some(FilesystemType::Ext4));
        assert_eq!(settings.label, PartitionTableType::Gpt);
        assert_eq!(settings.devices, vec!["/dev/sdb"]);
    }

    #[test]
    fn minfree_alone_means_unbounded() {
        let flags = EnsureArgs {
            minfree: Some(1024),
            ..Default::default()
        };
        let settings = EnsureSettings::resolve(&flags, &FileConfig::default()).unwrap();
        assert_eq!(settings.request.size, SizeRequirement::Unbounded);
        assert_eq!(settings.request.minfree_mib, Some(1024));
    }

    #[test]
    fn validation_errors() {
        let none = EnsureArgs::default();
        assert!(matches!(
            EnsureSettings::resolve(&none, &FileConfig::default()),
            Err(ConfigError::MissingSize)
        ));

        let both = file("size = 1\nminsize = 2");
        assert!(matches!(
            EnsureSettings::resolve(&none, &both),
            Err(ConfigError::ConflictingSize)
        ));

        let zero = EnsureArgs {
            size: Some(1),
            count: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            EnsureSettings::resolve(&zero, &FileConfig::default()),
            Err(ConfigError::ZeroCount)
        ));
    }

    #[test]
    fn unknown_keys_and_values_are_rejected() {
        assert!(toml::from_str::<FileConfig>("sise = 10").is_err());
        assert!(toml::from_str::<FileConfig>("filesystem = \"zfs\"").is_err());
        assert!(toml::from_str::<FileConfig>("label = \"apm\"").is_err());
    }

    #[test]
    fn loads_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "minsize = 4096\nstrategy = \"first-fit\"\ndry-run = true").unwrap();

        let cfg = FileConfig::load(tmp.path()).unwrap();
        assert_eq!(cfg.minsize, Some(4096));
        assert_eq!(cfg.strategy, Some(AllocationStrategy::FirstFit));
        assert_eq!(cfg.dry_run, Some(true));

        let missing = FileConfig::load(Path::new("/nonexistent/provision.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn facts_settings() {
        let cfg = file("label = \"gpt\"\ndevices = [\"sda\"]");
        let settings = FactsSettings::resolve(&FactsArgs::default(), &cfg);
        assert_eq!(settings.label, PartitionTableType::Gpt);
        assert_eq!(settings.devices, vec!["sda"]);
    }
}
