use anyhow::{Context, Result};
use clap::Parser;
use picker_cli::{error::CliError, logging, runner};
use picker_controller::{
    cell_config::CellConfig,
    node::{NodeOptions, DEFAULT_NODE_NAME, ROOT_NAMESPACE},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version)]
struct Args {
    /// Name this node registers under
    #[arg(long, default_value = DEFAULT_NODE_NAME)]
    node_name: String,

    #[arg(long, default_value = ROOT_NAMESPACE)]
    namespace: String,

    /// Cell config, json or yaml. Bundled UR5 cell is used when missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the resolved config as yaml and exit
    #[arg(long)]
    print_config: bool,

    /// Log as json lines
    #[arg(long)]
    json_logs: bool,

    /// Sets the level of verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_config(path: Option<&PathBuf>) -> std::result::Result<CellConfig, CliError> {
    match path {
        Some(path) => CellConfig::load(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        }),
        None => CellConfig::included().map_err(CliError::IncludedConfig),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref()).context("No usable cell config")?;

    if args.print_config {
        print!("{}", config.serialize_to_yaml()?);
        return Ok(());
    }

    logging::setup_tracing(args.verbose, args.json_logs);

    let node = NodeOptions::new(&args.node_name, &args.namespace).map_err(CliError::from)?;
    tracing::info!("Starting {}", node);

    let report = runner::run_simulated(node, config).await?;
    for step in report.failed_steps() {
        tracing::warn!(
            plan_succeeded = step.plan_succeeded,
            execution = %step.execution,
            "Step {} did not go as planned",
            step.step
        );
    }
    if let Some(target) = &report.final_target {
        tracing::info!(
            "Finished {} steps, last target at [{:.3}, {:.3}, {:.3}]",
            report.steps.len(),
            target.position.x,
            target.position.y,
            target.position.z
        );
    }
    Ok(())
}
