// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;
use std::process::Output;

use duct::cmd;
use storage_contracts::{PartitionBackend, StorageError, TableProbe};
use storage_types::{Device, FilesystemDescriptor, FilesystemType, PartitionTable, PartitionTableType};

use crate::{Result, SysError, lsblk, part_types, sfdisk};

/// Backend driving `lsblk` and `sfdisk`
#[derive(Debug, Clone)]
pub struct SfdiskBackend {
    lsblk: String,
    sfdisk: String,
}

impl Default for SfdiskBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SfdiskBackend {
    pub fn new() -> Self {
        Self::with_tools("lsblk", "sfdisk")
    }

    /// Use other binaries, e.g. absolute paths or wrappers
    pub fn with_tools(lsblk: impl Into<String>, sfdisk: impl Into<String>) -> Self {
        Self {
            lsblk: lsblk.into(),
            sfdisk: sfdisk.into(),
        }
    }

    fn require(&self, tool: &str) -> Result<()> {
        which::which(tool)
            .map(|_| ())
            .map_err(|_| SysError::ToolMissing(tool.to_string()))
    }

    fn filesystems(&self, device: &Device) -> HashMap<String, FilesystemType> {
        let listing = run(
            &self.lsblk,
            &["--json", "-o", lsblk::FILESYSTEM_COLUMNS, &device.path],
            None,
        )
        .and_then(|output| capture(&self.lsblk, output))
        .and_then(|json| lsblk::parse_filesystems(&json));

        match listing {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("{}: cannot list filesystems: {e}", device.path);
                HashMap::new()
            }
        }
    }
}

fn run(program: &str, args: &[&str], stdin: Option<&str>) -> Result<Output> {
    tracing::debug!("running {program} {}", args.join(" "));
    let mut expression = cmd(program, args.iter().copied())
        .stdout_capture()
        .stderr_capture()
        .unchecked();
    if let Some(input) = stdin {
        expression = expression.stdin_bytes(input.as_bytes().to_vec());
    }
    Ok(expression.run()?)
}

fn capture(program: &str, output: Output) -> Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(classify_failure(program, stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Error for a failed tool run, judged from its stderr
pub fn classify_failure(program: &str, stderr: &str) -> SysError {
    if sfdisk::is_layout_rejection(stderr) {
        SysError::Rejected(stderr.to_string())
    } else if stderr.contains("Permission denied") {
        SysError::PermissionDenied(stderr.to_string())
    } else if stderr.contains("No such file or directory") || stderr.contains("not a block device")
    {
        SysError::DeviceNotFound(stderr.to_string())
    } else {
        SysError::CommandFailed {
            command: program.to_string(),
            stderr: stderr.to_string(),
        }
    }
}

impl PartitionBackend for SfdiskBackend {
    fn name(&self) -> &str {
        "sfdisk"
    }

    fn ensure_available(&self) -> std::result::Result<(), StorageError> {
        self.require(&self.lsblk)?;
        self.require(&self.sfdisk)?;
        Ok(())
    }

    fn list_devices(&self) -> std::result::Result<Vec<Device>, StorageError> {
        let output = run(
            &self.lsblk,
            &["--json", "--bytes", "--nodeps", "-o", lsblk::DEVICE_COLUMNS],
            None,
        )?;
        let json = capture(&self.lsblk, output)?;
        Ok(lsblk::parse_devices(&json)?)
    }

    fn read_table(&self, device: &Device) -> std::result::Result<TableProbe, StorageError> {
        let output = run(&self.sfdisk, &["--json", &device.path], None)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if sfdisk::is_missing_table(&stderr) {
                return Ok(TableProbe::Absent);
            }
            return Err(classify_failure(&self.sfdisk, stderr.trim()).into());
        }

        let json = String::from_utf8_lossy(&output.stdout);
        let filesystems = self.filesystems(device);
        let table = sfdisk::parse_table(&json, device.clone(), &filesystems)?;
        Ok(TableProbe::Existing(table))
    }

    fn filesystem_descriptor(
        &self,
        table_type: PartitionTableType,
        fs: FilesystemType,
    ) -> std::result::Result<FilesystemDescriptor, StorageError> {
        Ok(FilesystemDescriptor {
            fs_type: fs,
            type_code: part_types::type_for_filesystem(table_type, fs).to_string(),
        })
    }

    fn commit(&self, table: &PartitionTable) -> std::result::Result<(), StorageError> {
        if !table.is_dirty() {
            return Ok(());
        }

        let script = sfdisk::render_script(table);
        tracing::debug!("{}: sfdisk script\n{}", table.path(), script);

        let mut args = vec!["--no-reread"];
        if !table.fresh {
            args.push("--append");
        }
        args.push(table.path());

        let output = run(&self.sfdisk, &args, Some(&script))?;
        capture(&self.sfdisk, output)?;
        tracing::info!("{}: partition table written", table.path());
        Ok(())
    }
}
