// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use storage_types::{AllocationStrategy, FilesystemType, PartitionTableType};

#[derive(Debug, Parser)]
#[command(name = "storage-provision", version)]
#[command(about = "Ensure partitions of a given size exist across the machine's disks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with defaults for any flag
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long, global = true)]
    pub pretty: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create partitions until the request is satisfied
    Ensure(EnsureArgs),
    /// Describe disks, partitions and free space without changing anything
    Facts(FactsArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct EnsureArgs {
    /// Exact partition size in MiB
    #[arg(long, conflicts_with = "minsize")]
    pub size: Option<u64>,

    /// Minimum partition size in MiB; the partition takes the whole region
    #[arg(long)]
    pub minsize: Option<u64>,

    /// Free space in MiB to leave behind the new partition
    #[arg(long)]
    pub minfree: Option<u64>,

    /// Number of partitions wanted
    #[arg(long)]
    pub count: Option<u32>,

    /// Want `count` partitions on every disk
    #[arg(long)]
    pub repeated: bool,

    #[arg(long)]
    pub filesystem: Option<FilesystemType>,

    /// Table type for unlabeled disks
    #[arg(long)]
    pub label: Option<PartitionTableType>,

    #[arg(long)]
    pub strategy: Option<AllocationStrategy>,

    /// Only consider this disk (path or name); repeatable
    #[arg(long = "device")]
    pub devices: Vec<String>,

    /// Plan without writing to any disk
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FactsArgs {
    /// Table type assumed for unlabeled disks
    #[arg(long)]
    pub label: Option<PartitionTableType>,

    /// Only describe this disk (path or name); repeatable
    #[arg(long = "device")]
    pub devices: Vec<String>,
}
