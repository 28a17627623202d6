//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// deskbuild - declarative multi-package build orchestrator
#[derive(Parser)]
#[command(name = "deskbuild")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declarative multi-package build orchestrator")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output the final report in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Directory containing component descriptors (*.toml)
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub manifest_dir: PathBuf,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Resolve and build every component in the manifest directory
    #[command(alias = "b")]
    Build {
        /// Number of components built concurrently
        #[arg(short, long, default_value_t = 4)]
        jobs: usize,

        /// Directory for per-component work trees
        #[arg(long, value_name = "DIR", default_value = "build")]
        build_root: PathBuf,

        /// Directory for packaged artifacts
        #[arg(long, value_name = "DIR", default_value = "artifacts")]
        artifact_root: PathBuf,

        /// Directory for the vendored dependency cache
        #[arg(long, value_name = "DIR", default_value = "vendor")]
        vendor_root: PathBuf,

        /// Local mirror of prebuilt dependencies; defaults to
        /// `<manifest-dir>/mirror`
        #[arg(long, value_name = "DIR")]
        mirror: Option<PathBuf>,
    },

    /// Print the resolved build order without building anything
    Order,
}
