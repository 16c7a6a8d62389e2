// SPDX-License-Identifier: GPL-3.0-only

//! Partitioning backend on top of util-linux
//!
//! Devices and filesystems come from `lsblk`, partition tables are read and
//! written with `sfdisk`. Both tools are driven through their JSON and
//! script interfaces:
//! - [`lsblk`] parses device listings
//! - [`sfdisk`] parses table dumps and renders commit scripts
//! - [`part_types`] maps partition type codes to roles and filesystems
//!
//! Writing a table requires root; reading usually does too.

pub mod backend;
pub mod error;
pub mod lsblk;
pub mod part_types;
pub mod sfdisk;

pub use backend::SfdiskBackend;
pub use error::{Result, SysError};
