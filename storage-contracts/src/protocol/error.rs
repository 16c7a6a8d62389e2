// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageErrorKind {
    InvalidInput,
    NotFound,
    PermissionDenied,
    /// The backend refused a layout or value; the device is untouched
    Rejected,
    Unsupported,
    /// Partitioning tools are missing
    Unavailable,
    /// Reading or writing the device failed
    Io,
    Internal,
}

impl StorageErrorKind {
    /// Fatal errors abort the whole run; the rest only fail the current
    /// attempt so the caller can move on to the next disk.
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::Rejected | Self::Unsupported)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::Rejected => "rejected",
            Self::Unsupported => "unsupported",
            Self::Unavailable => "unavailable",
            Self::Io => "io",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}: {message}", .kind.as_str())]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Io, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Rejected, message)
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_roundtrips() {
        let error = StorageError::new(StorageErrorKind::Rejected, "partition does not fit");
        let json = serde_json::to_string(&error).expect("serialize error");
        let parsed: StorageError = serde_json::from_str(&json).expect("deserialize error");
        assert_eq!(parsed, error);
        assert!(json.contains("\"rejected\""));
    }

    #[test]
    fn only_rejections_are_recoverable() {
        assert!(!StorageError::rejected("overlap").is_fatal());
        assert!(!StorageErrorKind::Unsupported.is_fatal());
        assert!(StorageError::io("write failed").is_fatal());
        assert!(StorageErrorKind::Unavailable.is_fatal());
        assert!(StorageErrorKind::NotFound.is_fatal());
    }

    #[test]
    fn kind_names_match_serde() {
        let json = serde_json::to_string(&StorageErrorKind::PermissionDenied).unwrap();
        assert_eq!(json, format!("\"{}\"", StorageErrorKind::PermissionDenied.as_str()));
        assert_eq!(StorageError::io("boom").to_string(), "io: boom");
    }
}
