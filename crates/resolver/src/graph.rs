//! Dependency graph over component descriptors

use deskbuild_errors::{DescriptorError, Error};
use deskbuild_types::{ComponentDescriptor, DepKind};
use std::collections::{BTreeMap, BTreeSet};

/// Directed graph keyed by component name
///
/// Nodes are descriptors; edges are declared dependency names tagged with
/// their kind. Edge targets outside the node set are external requirements.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, ComponentDescriptor>,
}

impl DependencyGraph {
    /// Build a graph from a set of descriptors
    ///
    /// # Errors
    ///
    /// Returns `DescriptorError::DuplicateComponent` if two descriptors
    /// share a name; the input set is invalid and nothing is resolved.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ComponentDescriptor>,
    ) -> Result<Self, Error> {
        let mut nodes = BTreeMap::new();
        for descriptor in descriptors {
            let name = descriptor.name.clone();
            if nodes.insert(name.clone(), descriptor).is_some() {
                return Err(DescriptorError::DuplicateComponent { name }.into());
            }
        }
        Ok(Self { nodes })
    }

    /// Look up a descriptor by name
    pub fn get(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.nodes.get(name)
    }

    /// Whether a name is part of the input set
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Component names in ascending order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// All descriptors in name order
    pub fn descriptors(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.nodes.values()
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no components
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// In-set dependency targets of `name` for one edge kind, name-ordered
    pub(crate) fn edges_of_kind(&self, name: &str, kind: DepKind) -> BTreeSet<&str> {
        self.nodes.get(name).map_or_else(BTreeSet::new, |d| {
            d.dependencies
                .iter()
                .filter(|dep| dep.kind == kind && self.contains(&dep.name))
                .map(|dep| dep.name.as_str())
                .collect()
        })
    }

    /// Names referenced as hard dependencies but absent from the input set
    ///
    /// These are assumed present on the build host; the caller surfaces
    /// them for pre-flight verification. Soft recommend edges are not
    /// requirements and are not listed.
    pub fn external_requirements(&self) -> BTreeSet<String> {
        self.nodes
            .values()
            .flat_map(|d| d.dependencies.iter())
            .filter(|dep| dep.kind != DepKind::Recommend && !self.contains(&dep.name))
            .map(|dep| dep.name.clone())
            .collect()
    }

    /// Cycles among pure runtime edges
    ///
    /// Runtime cycles never block the build order, but they are reported so
    /// the caller can surface them. Each returned group is one strongly
    /// connected set of components, in name order.
    pub fn runtime_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited: BTreeSet<String> = BTreeSet::new();

        // A name-ordered scan keeps the output deterministic.
        for start in self.nodes.keys() {
            if visited.contains(start) {
                continue;
            }
            if let Some(group) = self.runtime_scc(start) {
                visited.extend(group.iter().cloned());
                cycles.push(group);
            } else {
                visited.insert(start.clone());
            }
        }
        cycles
    }

    /// Strongly connected runtime-edge group containing `start`, if it is a
    /// real cycle (more than one node, or a self edge)
    fn runtime_scc(&self, start: &str) -> Option<Vec<String>> {
        let forward = self.runtime_reachable(start);
        if !forward.contains(start) {
            return None;
        }

        // start reaches itself through runtime edges; collect every node on
        // such a loop: those reachable from start that also reach start.
        let mut group: Vec<String> = forward
            .iter()
            .filter(|n| self.runtime_reachable(n).contains(start))
            .map(|n| (*n).to_string())
            .collect();
        group.sort();
        Some(group)
    }

    /// Names reachable from `name` by one or more runtime edges
    fn runtime_reachable<'a>(&'a self, name: &str) -> BTreeSet<&'a str> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = self.edges_of_kind(name, DepKind::Runtime).into_iter().collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.edges_of_kind(next, DepKind::Runtime));
            }
        }
        seen
    }
}
