// SPDX-License-Identifier: GPL-3.0-only

//! JSON documents written to stdout

use serde::Serialize;
use storage_contracts::StorageError;
use storage_types::DiskFacts;

use crate::config::ConfigError;

#[derive(Debug, Clone, Serialize)]
pub struct FactsReport {
    pub changed: bool,
    pub disks: Vec<DiskFacts>,
}

impl FactsReport {
    pub fn new(disks: Vec<DiskFacts>) -> Self {
        Self {
            changed: false,
            disks,
        }
    }
}

/// Written instead of a result when the run fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReport {
    pub failed: bool,
    pub kind: String,
    pub msg: String,
}

impl FailureReport {
    pub fn from_error(error: &anyhow::Error) -> Self {
        let kind = if error.downcast_ref::<ConfigError>().is_some() {
            "config"
        } else if let Some(storage) = error.downcast_ref::<StorageError>() {
            storage.kind.as_str()
        } else {
            "internal"
        };

        Self {
            failed: true,
            kind: kind.to_string(),
            msg: format!("{error:#}"),
        }
    }

    /// Process exit status: 2 for bad settings, 1 for everything else
    pub fn exit_code(&self) -> u8 {
        if self.kind == "config" { 2 } else { 1 }
    }
}

pub fn render<T: Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
