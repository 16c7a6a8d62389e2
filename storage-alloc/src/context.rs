// SPDX-License-Identifier: GPL-3.0-only

use storage_contracts::PartitionBackend;
use storage_types::{AllocationStrategy, Device, PartitionTableType};

/// Settings shared by every component for the duration of one run
pub struct ProvisionContext<'a> {
    pub backend: &'a dyn PartitionBackend,

    /// Table type for devices that have none yet
    pub default_label: PartitionTableType,

    pub strategy: AllocationStrategy,

    /// Restrict the run to these devices; empty means all
    pub devices: Vec<String>,

    /// Plan placements without committing them
    pub dry_run: bool,
}

impl<'a> ProvisionContext<'a> {
    pub fn new(backend: &'a dyn PartitionBackend) -> Self {
        Self {
            backend,
            default_label: PartitionTableType::default(),
            strategy: AllocationStrategy::default(),
            devices: Vec::new(),
            dry_run: false,
        }
    }

    pub fn with_label(mut self, label: PartitionTableType) -> Self {
        self.default_label = label;
        self
    }

    pub fn with_strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_devices(mut self, devices: Vec<String>) -> Self {
        self.devices = devices;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether `device` is part of this run. Entries match the full path or
    /// the bare kernel name.
    pub fn wants_device(&self, device: &Device) -> bool {
        self.devices.is_empty()
            || self
                .devices
                .iter()
                .any(|wanted| wanted == &device.path || wanted == device.name())
    }
}
