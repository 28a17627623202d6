//! Dependency index and lock creation
//!
//! The index answers "which versions of this name exist, and with what
//! content hash". It covers both in-run descriptors and host-provided
//! capabilities; locking does not care which side a candidate comes from.

use dashmap::DashMap;
use deskbuild_errors::{Error, StoreError};
use deskbuild_types::{ComponentDescriptor, Version, VendorLock};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One published candidate version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub version: Version,
    /// blake3 hex digest of the candidate's content
    pub hash: String,
}

/// Source of candidate versions for dependency locking
pub trait DependencyIndex: Send + Sync {
    /// Known candidates for a name, any order
    fn candidates(&self, name: &str) -> Vec<Candidate>;
}

/// Simple in-memory index
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    entries: BTreeMap<String, Vec<Candidate>>,
}

impl InMemoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a candidate version
    pub fn publish(&mut self, name: impl Into<String>, version: Version, hash: impl Into<String>) {
        self.entries.entry(name.into()).or_default().push(Candidate {
            version,
            hash: hash.into(),
        });
    }
}

impl DependencyIndex for InMemoryIndex {
    fn candidates(&self, name: &str) -> Vec<Candidate> {
        self.entries.get(name).cloned().unwrap_or_default()
    }
}

/// Index layering components packaged during the current run over a base
/// of pre-provisioned candidates
///
/// A dependency name can resolve to another descriptor in the same run:
/// the scheduler starts a dependent's locking stage only after every build
/// dependency has packaged, and packaging publishes here, so the fresh
/// artifact is always visible by the time a dependent locks.
pub struct RunIndex {
    base: Arc<dyn DependencyIndex>,
    built: DashMap<String, Vec<Candidate>>,
}

impl RunIndex {
    /// Create a run index over a base of host-provided candidates
    pub fn new(base: Arc<dyn DependencyIndex>) -> Self {
        Self {
            base,
            built: DashMap::new(),
        }
    }

    /// Record a freshly packaged component so later locks can pin it
    pub fn publish(&self, name: impl Into<String>, version: Version, hash: impl Into<String>) {
        self.built.entry(name.into()).or_default().push(Candidate {
            version,
            hash: hash.into(),
        });
    }
}

impl DependencyIndex for RunIndex {
    fn candidates(&self, name: &str) -> Vec<Candidate> {
        let mut candidates = self.base.candidates(name);
        if let Some(built) = self.built.get(name) {
            candidates.extend(built.iter().cloned());
        }
        candidates
    }
}

/// Resolve every build-time dependency of a component to an exact
/// version/hash pin
///
/// Picks the highest candidate version satisfying each declared
/// requirement. The resulting lock is owned by this component alone.
///
/// # Errors
///
/// Returns `StoreError::UnresolvableDependency` if any build dependency has
/// no satisfying candidate.
pub fn lock_dependencies(
    descriptor: &ComponentDescriptor,
    index: &dyn DependencyIndex,
) -> Result<VendorLock, Error> {
    let mut lock = VendorLock::new(&descriptor.name);

    for dep in descriptor.build_deps() {
        let best = index
            .candidates(&dep.name)
            .into_iter()
            .filter(|c| dep.requirement.matches(&c.version))
            .max_by(|a, b| a.version.cmp(&b.version))
            .ok_or_else(|| StoreError::UnresolvableDependency {
                name: dep.name.clone(),
                requirement: dep.requirement.to_string(),
            })?;

        lock.pin(&dep.name, best.version, best.hash);
    }

    Ok(lock)
}
