//! Vendor lock types
//!
//! A vendor lock pins every build-time dependency of one component to an
//! exact version and content hash. It is produced by the locking stage,
//! owned exclusively by that component, and read-only for every later
//! stage. Locks are never shared across components.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One pinned build-time dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedDependency {
    pub version: Version,
    /// blake3 hex digest of the fetched content
    pub hash: String,
}

/// Pinned snapshot of a component's resolved build-time dependencies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorLock {
    pub component: String,
    /// name -> pinned version/hash, in name order
    pub entries: BTreeMap<String, LockedDependency>,
}

impl VendorLock {
    /// Create an empty lock for a component
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Pin a dependency
    pub fn pin(&mut self, name: impl Into<String>, version: Version, hash: impl Into<String>) {
        self.entries.insert(
            name.into(),
            LockedDependency {
                version,
                hash: hash.into(),
            },
        );
    }

    /// Look up a pinned dependency
    pub fn get(&self, name: &str) -> Option<&LockedDependency> {
        self.entries.get(name)
    }

    /// Number of pinned dependencies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the lock pins nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
