// SPDX-License-Identifier: GPL-3.0-only

//! Test support for partition provisioning
//!
//! [`MemoryBackend`] implements the partition backend contract without
//! touching real devices. Fleets can be built in code or loaded from the TOML
//! specs under `resources/lab-specs`.

pub mod errors;
pub mod memory;
pub mod spec;

pub use errors::TestingError;
pub use memory::MemoryBackend;
pub use spec::{FleetSpec, load_by_name};
