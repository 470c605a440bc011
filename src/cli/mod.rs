//! Command-line interface definitions for the `inlets-provision` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `inlets-provision` binary.
#[derive(Debug, Parser)]
#[command(
    name = "inlets-provision",
    about = "Provision inlets exit nodes on Azure Container Instances",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Abandon the operation after this many seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub(crate) timeout: Option<u64>,
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Operations exposed by the binary.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Create or converge an exit node and print its identifier.
    #[command(name = "provision", about = "Create or converge an exit node")]
    Provision(ProvisionCommand),
    /// Report whether an exit node is ready.
    #[command(name = "status", about = "Report whether an exit node is ready")]
    Status(HostIdArgs),
    /// Remove an exit node's container group.
    #[command(name = "delete", about = "Remove an exit node")]
    Delete(HostIdArgs),
}

/// Arguments for `inlets-provision provision`.
#[derive(Debug, Args)]
pub(crate) struct ProvisionCommand {
    /// Host name, reused for the resource group and the container group.
    #[arg(long)]
    pub(crate) name: String,
    /// Azure region, for example `westeurope`.
    #[arg(long)]
    pub(crate) region: String,
    /// Token tunnel clients must present.
    #[arg(long, env = "INLETS_TOKEN", hide_env_values = true)]
    pub(crate) token: String,
    /// Backend parameter such as `subscriptionID=<uuid>`; repeatable.
    #[arg(long = "additional", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub(crate) additional: Vec<(String, String)>,
}

/// Arguments naming a previously provisioned host.
#[derive(Debug, Args)]
pub(crate) struct HostIdArgs {
    /// Identifier printed by `provision`.
    pub(crate) id: String,
}

/// Parses `KEY=VALUE`, splitting on the first `=`.
pub(crate) fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.trim().to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, found '{raw}'")),
    }
}
