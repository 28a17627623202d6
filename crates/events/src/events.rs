//! Domain-driven event types
//!
//! Events are grouped by functional domain: resolution, lifecycle
//! execution, patch application, and general diagnostics.

use deskbuild_types::StagePhase;
use serde::{Deserialize, Serialize};

/// Top-level application event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AppEvent {
    Resolver(ResolverEvent),
    Build(BuildEvent),
    Patch(PatchEvent),
    General(GeneralEvent),
}

/// Dependency resolution events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResolverEvent {
    /// Build order resolved
    OrderResolved { order: Vec<String> },
    /// A dependency name resolves outside the input set and must be
    /// satisfied by the build host
    ExternalRequirement { name: String },
    /// Cycle among pure runtime edges; tolerated but worth surfacing
    RuntimeCycleDetected { names: Vec<String> },
}

/// Lifecycle execution events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BuildEvent {
    Started {
        component: String,
    },
    StageStarted {
        component: String,
        stage: String,
    },
    StageCompleted {
        component: String,
        stage: String,
    },
    /// A declared stage command finished
    CommandCompleted {
        component: String,
        phase: StagePhase,
        command: String,
    },
    DependencyLocked {
        component: String,
        name: String,
        version: String,
    },
    DependencyVendored {
        component: String,
        name: String,
        version: String,
    },
    Succeeded {
        component: String,
    },
    Failed {
        component: String,
        reason: String,
    },
    Skipped {
        component: String,
        caused_by: String,
    },
    MetaAssembled {
        component: String,
        members: Vec<String>,
    },
}

/// Patch application events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PatchEvent {
    Applied { component: String, patch: String },
    /// Already recorded as applied; re-running prepare is a no-op
    AlreadyApplied { component: String, patch: String },
}

/// General diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GeneralEvent {
    Message { message: String },
    Aborted,
}
