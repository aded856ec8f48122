mod archive;
mod cli;
mod error;
mod storage;
mod telemetry;
mod wiring;

use clap::Parser;
use dac_committee_loop::CommitteeLoop;
use dac_config::NodeConfig;

use crate::cli::{Cli, Commands};
use crate::error::NodeResult;

#[tokio::main]
async fn main() {
    telemetry::init();
    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "dac_node exiting with error");
            err.exit_code()
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> NodeResult<()> {
    let config = NodeConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_committee_loop(&config).await,
        Commands::DumpTrees { archive_path } => {
            let storage = wiring::build_storage(&config)?;
            archive::dump_trees(&config, storage, &archive_path).await
        }
        Commands::LoadTrees { archive_path } => {
            let storage = wiring::build_storage(&config)?;
            archive::load_trees(storage, &archive_path).await
        }
    }
}

async fn run_committee_loop(config: &NodeConfig) -> NodeResult<()> {
    let storage = wiring::build_storage(config)?;
    let gateway = wiring::build_gateway_client(config)?;
    let signer = wiring::build_signer(config)?;
    let loop_config = wiring::committee_loop_config(config);

    let mut committee_loop = CommitteeLoop::new(storage, gateway, signer, loop_config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received, exiting at next suspension point");
        let _ = shutdown_tx.send(true);
    });

    Ok(committee_loop.run_until_shutdown(shutdown_rx).await?)
}

/// Waits for SIGINT or SIGTERM (spec.md §5). The committee loop itself only ever
/// suspends at I/O boundaries, so a signal received mid-transition takes effect at the
/// next such boundary, not mid-computation.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
