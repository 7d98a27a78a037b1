//! Command-line interface definitions for the `clusterform` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI for the `clusterform` binary.
#[derive(Debug, Parser)]
#[command(
    name = "clusterform",
    about = "Plan and provision cluster infrastructure with Terraform",
    version,
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Minimum level of diagnostic events written to stderr. `RUST_LOG`
    /// takes precedence when set.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    pub(crate) log_level: LogLevel,
    /// Subcommand to run.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Diagnostic verbosity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum LogLevel {
    /// Warnings and errors only.
    Warn,
    /// Lifecycle progress.
    Info,
    /// Individual tool invocations and store writes.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    pub(crate) const fn as_filter(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Cluster lifecycle subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Write a new cluster plan and record it.
    #[command(name = "plan")]
    Plan(PlanCommand),
    /// Create or update the infrastructure of a planned cluster.
    #[command(name = "provision")]
    Provision(ProvisionCommand),
    /// Destroy the infrastructure of a cluster and forget it.
    #[command(name = "destroy")]
    Destroy(ClusterArgs),
    /// List the clusters under the assets directory.
    #[command(name = "list", visible_alias = "ls")]
    List(ListCommand),
    /// Forget a cluster without touching its infrastructure.
    #[command(name = "remove", visible_alias = "rm")]
    Remove(ClusterArgs),
    /// Print the master load balancer address of a cluster.
    #[command(name = "ip")]
    Ip(ClusterArgs),
}

/// Arguments for `clusterform plan`.
#[derive(Debug, Parser)]
pub(crate) struct PlanCommand {
    /// Cluster name; also the name of its directory under the assets root.
    pub(crate) name: String,
    /// Provider that creates the machines. Omit for hand-managed machines.
    #[arg(long, value_name = "PROVIDER")]
    pub(crate) provider: Option<String>,
    /// Provider option recorded in the plan.
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    pub(crate) options: Vec<(String, String)>,
    /// Number of etcd nodes.
    #[arg(long, default_value_t = 1)]
    pub(crate) etcd_nodes: u32,
    /// Number of master nodes.
    #[arg(long, default_value_t = 1)]
    pub(crate) master_nodes: u32,
    /// Number of worker nodes.
    #[arg(long, default_value_t = 1)]
    pub(crate) worker_nodes: u32,
    /// Number of ingress nodes.
    #[arg(long, default_value_t = 0)]
    pub(crate) ingress_nodes: u32,
    /// Number of storage nodes.
    #[arg(long, default_value_t = 0)]
    pub(crate) storage_nodes: u32,
}

/// Arguments for `clusterform provision`.
#[derive(Debug, Parser)]
pub(crate) struct ProvisionCommand {
    /// Cluster name.
    pub(crate) name: String,
    /// Apply even when the execution plan destroys resources.
    #[arg(long)]
    pub(crate) allow_destruction: bool,
}

/// Arguments for `clusterform list`.
#[derive(Debug, Parser)]
pub(crate) struct ListCommand {
    /// Include cluster directories that have no recorded state.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

/// Arguments naming a single cluster.
#[derive(Debug, Parser)]
pub(crate) struct ClusterArgs {
    /// Cluster name.
    pub(crate) name: String,
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))
}
