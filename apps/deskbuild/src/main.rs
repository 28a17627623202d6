//! deskbuild - declarative multi-package build orchestrator
//!
//! Reads component descriptors from a manifest directory, resolves them
//! into a deterministic build order, and drives the staged lifecycle
//! executor over the dependency graph with a bounded worker pool.

mod cli;
mod display;
mod error;
mod events;
mod loader;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::error::CliError;
use clap::Parser;
use deskbuild_builder::{BuildConfig, ComponentBuilder, ProcessRunner};
use deskbuild_ops::Orchestrator;
use deskbuild_resolver::DependencyGraph;
use deskbuild_store::{RunIndex, VendorStore};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Application error: {e}");
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Main application logic; returns whether the run fully succeeded
async fn run(cli: Cli) -> Result<bool, CliError> {
    info!("Starting deskbuild v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Build {
            jobs,
            build_root,
            artifact_root,
            vendor_root,
            mirror,
        } => {
            run_build(
                &cli.global,
                jobs,
                build_root,
                artifact_root,
                vendor_root,
                mirror,
            )
            .await
        }
        Commands::Order => run_order(&cli.global).await,
    }
}

async fn run_build(
    global: &GlobalArgs,
    jobs: usize,
    build_root: PathBuf,
    artifact_root: PathBuf,
    vendor_root: PathBuf,
    mirror: Option<PathBuf>,
) -> Result<bool, CliError> {
    if jobs == 0 {
        return Err(CliError::InvalidArguments(
            "--jobs must be at least 1".to_string(),
        ));
    }

    let descriptors = loader::load_descriptors(&global.manifest_dir).await?;
    info!(components = descriptors.len(), "Loaded descriptors");

    let mirror = mirror.unwrap_or_else(|| global.manifest_dir.join("mirror"));
    let index = Arc::new(RunIndex::new(Arc::new(loader::scan_mirror(&mirror).await?)));
    let fetcher = Arc::new(loader::MirrorFetcher::new(mirror));

    let (event_sender, event_receiver) = deskbuild_events::channel();
    let drain = events::spawn_drain(event_receiver);

    let store = Arc::new(VendorStore::new(vendor_root, fetcher));
    let builder = ComponentBuilder::new(
        BuildConfig::new(build_root, artifact_root),
        store,
        index,
        Arc::new(ProcessRunner),
    )
    .with_events(event_sender.clone());

    let orchestrator = Orchestrator::new(builder)
        .with_jobs(jobs)
        .with_events(event_sender.clone());

    // Ctrl-C stops scheduling; running stages finish first
    let abort = orchestrator.abort_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, aborting after current stages");
            abort.abort();
        }
    });

    let outcome = orchestrator.run_all(descriptors).await?;

    // Close the channel so the drain task sees the end of the stream
    drop(orchestrator);
    drop(event_sender);
    let _ = drain.await;

    display::render_outcome(&outcome, global.json);
    Ok(outcome.report.all_succeeded())
}

async fn run_order(global: &GlobalArgs) -> Result<bool, CliError> {
    let descriptors = loader::load_descriptors(&global.manifest_dir).await?;
    let graph = DependencyGraph::from_descriptors(descriptors)?;
    let resolution = graph.resolve_order()?;

    for name in &resolution.order {
        println!("{name}");
    }
    for name in &resolution.external_requirements {
        warn!(name = %name, "External requirement, must be satisfied by the build host");
    }
    for cycle in &resolution.runtime_cycles {
        warn!(cycle = ?cycle, "Runtime dependency cycle detected");
    }

    Ok(true)
}

/// Initialize the tracing subscriber
fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("deskbuild={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
