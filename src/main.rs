//! Binary entry point for the `inlets-provision` CLI.

mod cli;

use std::io::{self, Write};
use std::process;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use inlets_provision::{
    BasicHost, CallContext, CloudProvisioner, ErrorKind, ProvisionError, ProvisionedHost,
    Provisioner, ProvisionerConfig,
};

use cli::{Cli, Command, ProvisionCommand};

/// Exit code for a host that exists but is not ready yet.
const EXIT_NOT_READY: i32 = 2;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

impl CliError {
    const fn exit_code(&self) -> i32 {
        match self {
            Self::Provision(err) if matches!(err.kind(), ErrorKind::NotReady) => EXIT_NOT_READY,
            _ => 1,
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            err.exit_code()
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn call_context(timeout: Option<u64>) -> CallContext {
    timeout.map_or_else(CallContext::new, |secs| {
        CallContext::with_timeout(Duration::from_secs(secs))
    })
}

fn build_host(args: ProvisionCommand) -> Result<BasicHost, ProvisionError> {
    args.additional
        .into_iter()
        .fold(
            BasicHost::builder()
                .name(args.name)
                .region(args.region)
                .token(args.token),
            |builder, (key, value)| builder.additional(key, value),
        )
        .build()
}

async fn connect() -> Result<CloudProvisioner, CliError> {
    let config =
        ProvisionerConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let provisioner = CloudProvisioner::from_config(&config).await?;
    debug!(provider = %provisioner.kind(), "provisioner ready");
    Ok(provisioner)
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let ctx = call_context(cli.timeout);
    match cli.command {
        Command::Provision(args) => {
            let host = build_host(args)?;
            let provisioner = connect().await?;
            let snapshot = provisioner.provision(&host, &ctx).await?;
            write_host(io::stdout(), &snapshot);
        }
        Command::Status(args) => {
            let provisioner = connect().await?;
            let snapshot = provisioner.status(&args.id, &ctx).await?;
            write_host(io::stdout(), &snapshot);
        }
        Command::Delete(args) => {
            let provisioner = connect().await?;
            provisioner.delete(&args.id, &ctx).await?;
            writeln!(io::stdout(), "deleted id={}", args.id).ok();
        }
    }
    Ok(())
}

fn write_host(mut target: impl Write, host: &ProvisionedHost) {
    writeln!(
        target,
        "id={} ip={} status={}",
        host.id, host.ip, host.status
    )
    .ok();
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
