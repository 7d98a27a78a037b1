//! Binary entry point for the clusterform CLI.

mod cli;

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use clusterform::{
    ClusterStateStore, ClusterWorkflow, ConfigError, EnvironmentSecrets,
    PlanRequest, ProvisionConfig, ProvisionOpts, ProvisionOrchestrator, SshKeygen, StoreError,
    StreamingCommandRunner, WorkflowError, write_listing,
};

use cli::{Cli, Command, LogLevel, PlanCommand};

type Orchestrator =
    ProvisionOrchestrator<StreamingCommandRunner, EnvironmentSecrets, SshKeygen<StreamingCommandRunner>>;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("could not write output: {0}")]
    Output(#[from] io::Error),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level);
    let exit_code = match dispatch(cli.command) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.as_filter())),
        )
        .init();
}

fn dispatch(command: Command) -> Result<(), CliError> {
    let config = ProvisionConfig::load_without_cli_args()?;
    config.validate()?;
    let layout = config.layout();
    let store = ClusterStateStore::open(&config.store_path())?;
    let result = {
        let workflow = ClusterWorkflow::new(&layout, &store);
        let mut stdout = io::stdout().lock();
        run_command(command, &config, &workflow, &mut stdout)
    };
    store.close();
    result
}

fn run_command(
    command: Command,
    config: &ProvisionConfig,
    workflow: &ClusterWorkflow<'_>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    debug!(?command, "dispatching");
    match command {
        Command::Plan(args) => {
            let name = args.name.clone();
            let plan = workflow.plan(&config.registry(), plan_request(args))?;
            writeln!(
                out,
                "Generated plan file at {}",
                config.layout().plan_file(&name)
            )?;
            if plan.provisioner.is_managed() {
                writeln!(out, "Run `clusterform provision {name}` to create the machines")?;
            } else {
                writeln!(out, "Fill in the node details before installing")?;
            }
        }
        Command::Provision(args) => {
            let opts = ProvisionOpts {
                allow_destruction: args.allow_destruction,
            };
            let plan = workflow.provision(&orchestrator(config)?, &args.name, opts, out)?;
            writeln!(
                out,
                "Cluster {} provisioned; master load balancer: {}",
                args.name, plan.master.load_balanced_fqdn
            )?;
        }
        Command::Destroy(args) => {
            workflow.destroy(&orchestrator(config)?, &args.name, out)?;
            writeln!(out, "Cluster {} destroyed", args.name)?;
        }
        Command::List(args) => {
            let listings = workflow.list(args.verbose)?;
            write_listing(out, &listings)?;
        }
        Command::Remove(args) => {
            workflow.remove(&args.name)?;
            writeln!(out, "Cluster {} removed", args.name)?;
        }
        Command::Ip(args) => {
            let address = workflow.address(&args.name)?;
            writeln!(out, "{address}")?;
        }
    }
    Ok(())
}

fn plan_request(args: PlanCommand) -> PlanRequest {
    PlanRequest {
        name: args.name,
        provider: args.provider,
        options: args.options.into_iter().collect(),
        etcd_nodes: args.etcd_nodes,
        master_nodes: args.master_nodes,
        worker_nodes: args.worker_nodes,
        ingress_nodes: args.ingress_nodes,
        storage_nodes: args.storage_nodes,
    }
}

fn orchestrator(config: &ProvisionConfig) -> Result<Orchestrator, CliError> {
    Ok(ProvisionOrchestrator::new(
        config.orchestrator_settings()?,
        StreamingCommandRunner,
        EnvironmentSecrets,
        SshKeygen::new(config.ssh_keygen_bin.clone(), StreamingCommandRunner),
    ))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

/// Writes `err` followed by one `caused by:` line per underlying cause.
///
/// Causes whose text already appears in the previous line are skipped, since
/// several variants embed their source in their own message.
fn write_error(mut target: impl Write, err: &CliError) {
    let mut previous = err.to_string();
    writeln!(target, "{previous}").ok();
    let mut cause = std::error::Error::source(err);
    while let Some(inner) = cause {
        let text = inner.to_string();
        if !previous.contains(&text) {
            writeln!(target, "caused by: {text}").ok();
            previous = text;
        }
        cause = std::error::Error::source(inner);
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
