#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for deskbuild
//!
//! The central type is [`ComponentDescriptor`]: the validated, in-memory
//! form of one component's declared metadata (identity, dependency edges,
//! patch list, staged lifecycle). Raw descriptors arrive as TOML and pass
//! through [`RawDescriptor::validate`] exactly once; everything downstream
//! works on the typed model.

mod descriptor;
mod meta;
mod raw;
mod report;
mod vendor;

pub use descriptor::{
    ComponentDescriptor, DepKind, Dependency, Lifecycle, PatchRef, SourcePin, StagePhase,
    StageStep, UpstreamSource,
};
pub use meta::MetaPackage;
pub use raw::RawDescriptor;
pub use report::{BuildReport, ComponentStatus};
pub use vendor::{LockedDependency, VendorLock};

/// Semantic version, re-exported for workspace-wide use
pub use semver::Version;
/// Version requirement, re-exported for workspace-wide use
pub use semver::VersionReq;
