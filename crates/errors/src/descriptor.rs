//! Descriptor validation error types
//!
//! Any of these means the raw descriptor is malformed; the whole input set
//! is rejected before resolution starts.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum DescriptorError {
    #[error("component name is empty")]
    EmptyComponentName,

    #[error("{component}: dependency name is empty")]
    EmptyDependencyName { component: String },

    #[error("{component}: lifecycle stage `{phase}` is missing a command")]
    MissingStageCommand { component: String, phase: String },

    #[error("{component}: patch `{patch}` has no discoverable source")]
    UnknownPatch { component: String, patch: String },

    #[error("duplicate component name `{name}` in input set")]
    DuplicateComponent { name: String },

    #[error("{component}: invalid version `{version}`: {message}")]
    InvalidVersion {
        component: String,
        version: String,
        message: String,
    },

    #[error("{component}: invalid requirement `{requirement}` on `{dependency}`: {message}")]
    InvalidRequirement {
        component: String,
        dependency: String,
        requirement: String,
        message: String,
    },

    #[error("{component}: failed to parse descriptor: {message}")]
    ParseFailed { component: String, message: String },
}
