#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Dependency graph resolution for deskbuild
//!
//! Builds a directed graph over component descriptors, produces a
//! deterministic topological build order from build-time edges, computes
//! runtime closures for meta-package assembly, and exposes an execution
//! plan (ready-queue over the DAG) for the orchestration driver.
//!
//! Only build edges constrain ordering. A dependency name absent from the
//! input set is treated as externally satisfied: it never fails resolution
//! but is surfaced as an external requirement for a pre-flight host check.

mod closure;
mod execution;
mod graph;
mod order;

pub use closure::close_runtime_dependencies;
pub use execution::ExecutionPlan;
pub use graph::DependencyGraph;
pub use order::Resolution;
