//! Binary entry point for the `linode-machine` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use linode_machine::{
    ConfigError, Configuration, DriverError, DriverOptions, InstanceId, LinodeClient,
    LinodeDriver, MachineState, ProvisionFailure, SshKeygen,
};

mod cli;

use cli::{Cli, CreateCommand, InstanceArgs};

const DEFAULT_MACHINE_NAME: &str = "linode-machine";
const DEFAULT_KEY_PATH: &str = "id_linode";

type Driver = LinodeDriver<LinodeClient, SshKeygen>;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Provision(#[from] ProvisionFailure),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let options = DriverOptions::load_without_cli_args()?;
    match cli {
        Cli::Create(args) => create(&options, args).await,
        Cli::Start(args) => Ok(targeted(&options, &args)?.start().await?),
        Cli::Stop(args) => Ok(targeted(&options, &args)?.stop().await?),
        Cli::Restart(args) => Ok(targeted(&options, &args)?.restart().await?),
        Cli::Kill(args) => Ok(targeted(&options, &args)?.kill().await?),
        Cli::Remove(args) => remove(&options, &args).await,
        Cli::State(args) => state(&options, &args).await,
        Cli::Ip(args) => {
            let driver = attached(&options, &args).await?;
            emit(&driver.ip()?.to_string())
        }
        Cli::Url(args) => {
            let driver = attached(&options, &args).await?;
            emit(&driver.url()?)
        }
        Cli::Ssh(args) => {
            let driver = attached(&options, &args).await?;
            emit(&format!(
                "hostname: {}\nport: {}\nuser: {}",
                driver.ssh_hostname()?,
                driver.ssh_port(),
                driver.ssh_username()
            ))
        }
    }
}

async fn create(options: &DriverOptions, args: CreateCommand) -> Result<(), CliError> {
    let config = Configuration::from_options(options, &args.name)?;
    let mut driver = LinodeDriver::new(config, SshKeygen::new(args.ssh_key));
    let instance = driver.create().await?;
    emit(&format!(
        "created instance {} ({}) at {}",
        instance.id, instance.label, instance.public_ip
    ))
}

async fn remove(options: &DriverOptions, args: &InstanceArgs) -> Result<(), CliError> {
    let mut driver = targeted(options, args)?;
    driver.remove().await?;
    emit(&format!("removed instance {}", args.instance_id))
}

async fn state(options: &DriverOptions, args: &InstanceArgs) -> Result<(), CliError> {
    let driver = targeted(options, args)?;
    let fetched = driver.fetch_status().await;
    emit(MachineState::from_fetch(&fetched).as_str())?;
    fetched.map(|_| ()).map_err(CliError::from)
}

/// Driver aimed at an instance by id alone, for calls that need no address.
fn targeted(options: &DriverOptions, args: &InstanceArgs) -> Result<Driver, CliError> {
    let config = Configuration::from_options(options, DEFAULT_MACHINE_NAME)?;
    Ok(LinodeDriver::new(config, SshKeygen::new(DEFAULT_KEY_PATH))
        .for_instance(InstanceId::new(args.instance_id)))
}

/// Driver that has fetched the instance and its addresses.
async fn attached(options: &DriverOptions, args: &InstanceArgs) -> Result<Driver, CliError> {
    let config = Configuration::from_options(options, DEFAULT_MACHINE_NAME)?;
    let mut driver = LinodeDriver::new(config, SshKeygen::new(DEFAULT_KEY_PATH));
    driver.attach(InstanceId::new(args.instance_id)).await?;
    Ok(driver)
}

fn emit(line: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}")?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "linode-machine: {err}").ok();
    if let CliError::Provision(failure) = err
        && let Some(instance_id) = failure.instance_id
    {
        writeln!(
            target,
            "linode-machine: instance {instance_id} was left behind; remove it with `linode-machine remove --instance-id {instance_id}`"
        )
        .ok();
    }
}
