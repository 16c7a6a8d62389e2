// SPDX-License-Identifier: GPL-3.0-only

use storage_contracts::{StorageError, StorageErrorKind};
use thiserror::Error;

/// Error types for system-level operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found in PATH")]
    ToolMissing(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The tool refused the requested layout and left the device as it was
    #[error("Layout rejected: {0}")]
    Rejected(String),

    #[error("Unsupported partition table label: {0}")]
    UnsupportedLabel(String),

    #[error("{command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Cannot parse {what}: {reason}")]
    Parse { what: String, reason: String },
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;

impl From<SysError> for StorageError {
    fn from(error: SysError) -> Self {
        let kind = match &error {
            SysError::ToolMissing(_) => StorageErrorKind::Unavailable,
            SysError::PermissionDenied(_) => StorageErrorKind::PermissionDenied,
            SysError::DeviceNotFound(_) => StorageErrorKind::NotFound,
            SysError::Rejected(_) => StorageErrorKind::Rejected,
            SysError::UnsupportedLabel(_) => StorageErrorKind::Unsupported,
            SysError::Parse { .. } => StorageErrorKind::Internal,
            SysError::Io(_) | SysError::CommandFailed { .. } => StorageErrorKind::Io,
        };
        StorageError::new(kind, error.to_string())
    }
}
