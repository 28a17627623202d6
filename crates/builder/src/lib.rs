#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Staged lifecycle execution for deskbuild
//!
//! Runs one component through its linear lifecycle:
//! lock -> fetch -> prepare -> build -> package. Every stage is gated on
//! its predecessor; any failure short-circuits the remaining stages. The
//! build stage sees only the vendored dependency set: once a component is
//! locked and fetched, no stage needs the network.

mod abort;
mod config;
mod lifecycle;
mod patches;
mod runner;
mod state;

pub use abort::AbortToken;
pub use config::BuildConfig;
pub use lifecycle::{ArtifactMetadata, BuiltArtifact, ComponentBuilder};
pub use patches::apply_patches;
pub use runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use state::{LifecycleState, StageOutcome};
