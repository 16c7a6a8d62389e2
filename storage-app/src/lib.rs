// SPDX-License-Identifier: GPL-3.0-only

//! Command-line front end for partition provisioning
//!
//! Resolves settings from flags and an optional TOML file, runs one command
//! against a [`PartitionBackend`] and renders the JSON report.

pub mod cli;
pub mod config;
pub mod report;

use storage_alloc::{ProvisionContext, facts};
use storage_contracts::PartitionBackend;

use crate::cli::{Cli, Command};
use crate::config::{EnsureSettings, FactsSettings, FileConfig};
use crate::report::FactsReport;

/// Whether the command may write to disks
pub fn writes_to_disk(cli: &Cli, file: &FileConfig) -> bool {
    match &cli.command {
        Command::Ensure(args) => !(args.dry_run || file.dry_run.unwrap_or(false)),
        Command::Facts(_) => false,
    }
}

/// Run the parsed command and return the report to print
pub fn execute(
    cli: &Cli,
    file: &FileConfig,
    backend: &dyn PartitionBackend,
) -> anyhow::Result<String> {
    match &cli.command {
        Command::Ensure(args) => {
            let settings = EnsureSettings::resolve(args, file)?;
            tracing::debug!("ensure settings: {settings:?}");

            let ctx = ProvisionContext::new(backend)
                .with_label(settings.label)
                .with_strategy(settings.strategy)
                .with_devices(settings.devices)
                .dry_run(settings.dry_run);
            let outcome = storage_alloc::ensure(&ctx, &settings.request)?;

            tracing::info!(
                "{} existing, {} created, {} missing",
                outcome.existing.len(),
                outcome.created.len(),
                outcome.missing
            );
            Ok(report::render(&outcome, cli.pretty)?)
        }
        Command::Facts(args) => {
            let settings = FactsSettings::resolve(args, file);
            let ctx = ProvisionContext::new(backend)
                .with_label(settings.label)
                .with_devices(settings.devices);
            let disks = facts::collect(&ctx)?;
            Ok(report::render(&FactsReport::new(disks), cli.pretty)?)
        }
    }
}
