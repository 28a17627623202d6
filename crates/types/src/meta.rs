//! Meta-package assembly
//!
//! A meta-package has no build of its own; it aggregates the identities of
//! its members as hard runtime dependencies and the union of their soft
//! recommend edges. Assembly happens once, after the members have resolved,
//! and the result is immutable.

use crate::descriptor::ComponentDescriptor;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Descriptor-only aggregate artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaPackage {
    pub name: String,
    pub version: Version,
    /// Member identities: the meta's direct member set, not a transitive
    /// closure
    pub runtime_dependencies: BTreeSet<String>,
    /// Union of members' recommend edges; soft, surfaced separately and
    /// never upgraded to hard requirements
    pub recommends: BTreeSet<String>,
}

impl MetaPackage {
    /// Assemble a meta-package from its member descriptors
    pub fn assemble(
        name: impl Into<String>,
        version: Version,
        members: &[&ComponentDescriptor],
    ) -> Self {
        let name = name.into();
        let runtime_dependencies: BTreeSet<String> =
            members.iter().map(|m| m.name.clone()).collect();

        let recommends: BTreeSet<String> = members
            .iter()
            .flat_map(|m| m.recommends().map(|d| d.name.clone()))
            .filter(|n| *n != name && !runtime_dependencies.contains(n))
            .collect();

        Self {
            name,
            version,
            runtime_dependencies,
            recommends,
        }
    }
}
