//! Validated component descriptor model

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Dependency kind
///
/// One unified edge type: build edges constrain build order, runtime edges
/// feed the install-time closure, recommend edges are soft and never block
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepKind {
    Build,
    Runtime,
    Recommend,
}

impl fmt::Display for DepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Runtime => write!(f, "runtime"),
            Self::Recommend => write!(f, "recommend"),
        }
    }
}

/// One declared dependency edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// Version constraint; `*` when the descriptor declared a bare name
    pub requirement: VersionReq,
    pub kind: DepKind,
}

impl Dependency {
    /// Create a new dependency edge
    pub fn new(name: impl Into<String>, requirement: VersionReq, kind: DepKind) -> Self {
        Self {
            name: name.into(),
            requirement,
            kind,
        }
    }

    /// Dependency on any version
    pub fn any(name: impl Into<String>, kind: DepKind) -> Self {
        Self::new(name, VersionReq::STAR, kind)
    }
}

/// Pinned upstream reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePin {
    Tag(String),
    Commit(String),
}

/// Upstream source location with its pin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSource {
    pub url: String,
    pub pin: SourcePin,
}

/// Reference to a patch applied before the build stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRef {
    /// Stable identifier, unique within one descriptor
    pub id: String,
    /// Patch file, relative to the descriptor's directory
    pub file: PathBuf,
}

/// Lifecycle phase a stage step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagePhase {
    Prepare,
    Build,
    Package,
}

impl fmt::Display for StagePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prepare => write!(f, "prepare"),
            Self::Build => write!(f, "build"),
            Self::Package => write!(f, "package"),
        }
    }
}

/// One declared stage command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageStep {
    pub phase: StagePhase,
    pub command: String,
    /// Working directory relative to the component's build root
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

/// Ordered staged lifecycle
///
/// Empty for meta-packages, which have no build of their own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lifecycle {
    pub steps: Vec<StageStep>,
}

impl Lifecycle {
    /// Whether this lifecycle declares no work at all
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps belonging to one phase, in declared order
    pub fn phase_steps(&self, phase: StagePhase) -> impl Iterator<Item = &StageStep> {
        self.steps.iter().filter(move |s| s.phase == phase)
    }
}

/// Validated descriptor for one buildable component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub source: Option<UpstreamSource>,
    pub dependencies: Vec<Dependency>,
    pub patches: Vec<PatchRef>,
    pub lifecycle: Lifecycle,
    /// Declared build outputs, collected at packaging
    pub outputs: Vec<PathBuf>,
}

impl ComponentDescriptor {
    /// Build-time dependency edges
    pub fn build_deps(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.iter().filter(|d| d.kind == DepKind::Build)
    }

    /// Runtime dependency edges
    pub fn runtime_deps(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DepKind::Runtime)
    }

    /// Soft recommend edges
    pub fn recommends(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DepKind::Recommend)
    }

    /// Names of build dependencies, deduplicated and ordered
    pub fn build_dep_names(&self) -> BTreeSet<String> {
        self.build_deps().map(|d| d.name.clone()).collect()
    }

    /// A descriptor with an empty lifecycle is a meta-package: it exists
    /// only to aggregate its members' dependencies.
    pub fn is_meta(&self) -> bool {
        self.lifecycle.is_empty()
    }

    /// `name-version` identity used for directory layout and display
    pub fn ident(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

impl fmt::Display for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ident())
    }
}
