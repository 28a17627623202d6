//! Dependency resolution error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("cyclic build dependency among: {}", names.join(" -> "))]
    CyclicDependency { names: Vec<String> },
}
