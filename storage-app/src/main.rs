// SPDX-License-Identifier: GPL-3.0-only

use std::process::ExitCode;

use clap::Parser;
use storage_provision::cli::Cli;
use storage_provision::config::FileConfig;
use storage_provision::report::{self, FailureReport};
use storage_sys::SfdiskBackend;
use tracing_subscriber::{EnvFilter, fmt};

fn run(cli: &Cli) -> anyhow::Result<String> {
    let file = FileConfig::load_optional(cli.config.as_deref())?;

    if storage_provision::writes_to_disk(cli, &file) && unsafe { libc::geteuid() } != 0 {
        tracing::warn!("Not running as root; writing partition tables will likely fail");
    }

    let backend = SfdiskBackend::new();
    storage_provision::execute(cli, &file, &backend)
}

fn main() -> ExitCode {
    // stdout carries the report only
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("storage_provision=info,storage_alloc=info,warn")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("storage-provision v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!("{error:#}");
            let failure = FailureReport::from_error(&error);
            match report::render(&failure, cli.pretty) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::error!("cannot render failure report: {e}"),
            }
            ExitCode::from(failure.exit_code())
        }
    }
}
