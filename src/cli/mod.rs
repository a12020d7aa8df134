//! Command-line interface definitions for the `linode-machine` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser};

/// Top-level CLI for the `linode-machine` binary.
///
/// Driver options come from `LINODE_*` environment variables and
/// `linode-machine.toml`; the subcommands only name the machine to act on.
#[derive(Debug, Parser)]
#[command(
    name = "linode-machine",
    version,
    about = "Provision and manage the lifecycle of a Linode instance",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create an instance and wait until it runs.
    #[command(name = "create")]
    Create(CreateCommand),
    /// Boot an existing instance.
    #[command(name = "start")]
    Start(InstanceArgs),
    /// Gracefully shut an instance down.
    #[command(name = "stop")]
    Stop(InstanceArgs),
    /// Reboot an instance.
    #[command(name = "restart")]
    Restart(InstanceArgs),
    /// Shut an instance down; identical to `stop`.
    #[command(name = "kill")]
    Kill(InstanceArgs),
    /// Delete an instance. Succeeds when it is already gone.
    #[command(name = "remove")]
    Remove(InstanceArgs),
    /// Print the lifecycle state of an instance.
    #[command(name = "state")]
    State(InstanceArgs),
    /// Print the public IPv4 address of an instance.
    #[command(name = "ip")]
    Ip(InstanceArgs),
    /// Print the service URL of an instance.
    #[command(name = "url")]
    Url(InstanceArgs),
    /// Print SSH connection details of an instance.
    #[command(name = "ssh")]
    Ssh(InstanceArgs),
}

/// Arguments for `linode-machine create`.
#[derive(Debug, Args)]
pub(crate) struct CreateCommand {
    /// Machine name, used as the label unless `LINODE_LABEL` is set.
    #[arg(long, value_name = "NAME", default_value = "linode-machine")]
    pub(crate) name: String,
    /// Private key path; the keypair is generated when it does not exist.
    #[arg(long, value_name = "PATH", default_value = "id_linode")]
    pub(crate) ssh_key: String,
}

/// Selects an existing instance.
#[derive(Debug, Args)]
pub(crate) struct InstanceArgs {
    /// Remote identifier of the instance.
    #[arg(long, value_name = "ID")]
    pub(crate) instance_id: u64,
}
