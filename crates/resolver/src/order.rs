//! Deterministic topological build order

use crate::graph::DependencyGraph;
use deskbuild_errors::{Error, ResolveError};
use deskbuild_types::DepKind;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

/// Result of resolving a descriptor set
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Component names, build dependencies first; identical across runs for
    /// identical input
    pub order: Vec<String>,
    /// Dependency names assumed satisfied by the build host
    pub external_requirements: BTreeSet<String>,
    /// Cycles among pure runtime edges; tolerated, surfaced for reporting
    pub runtime_cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Resolve a build order over build-time dependency edges
    ///
    /// Kahn's algorithm with an ascending-name tie-break among ready nodes,
    /// so the order is reproducible byte for byte across runs. Runtime and
    /// recommend edges never constrain the order.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::CyclicDependency` naming every node on some
    /// cycle if the build edges are cyclic.
    pub fn resolve_order(&self) -> Result<Resolution, Error> {
        let mut in_degree: BTreeMap<&str, usize> = self.names().map(|n| (n, 0)).collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for name in self.names() {
            for dep in self.edges_of_kind(name, DepKind::Build) {
                *in_degree
                    .get_mut(name)
                    .ok_or_else(|| Error::internal("in-degree table missing node"))? += 1;
                dependents.entry(dep).or_default().push(name);
            }
        }

        // Min-heap on name: among nodes with no remaining predecessors the
        // lexicographically smallest builds first.
        let mut ready: BinaryHeap<Reverse<&str>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| Reverse(*name))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(name)) = ready.pop() {
            order.push(name.to_string());
            for dependent in dependents.get(name).into_iter().flatten().copied() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        if order.len() != self.len() {
            let stuck: BTreeSet<&str> = in_degree
                .iter()
                .filter(|(_, degree)| **degree > 0)
                .map(|(name, _)| *name)
                .collect();
            return Err(ResolveError::CyclicDependency {
                names: self.extract_build_cycle(&stuck),
            }
            .into());
        }

        Ok(Resolution {
            order,
            external_requirements: self.external_requirements(),
            runtime_cycles: self.runtime_cycles(),
        })
    }

    /// Walk build edges among the stuck nodes until a node repeats, then
    /// return the nodes on that loop in walk order
    fn extract_build_cycle(&self, stuck: &BTreeSet<&str>) -> Vec<String> {
        let Some(start) = stuck.iter().next() else {
            return Vec::new();
        };

        let mut path: Vec<&str> = Vec::new();
        let mut current = *start;
        loop {
            if let Some(pos) = path.iter().position(|n| *n == current) {
                return path[pos..].iter().map(|n| (*n).to_string()).collect();
            }
            path.push(current);

            // Every stuck node has at least one in-set build edge to
            // another stuck node, otherwise Kahn would have drained it.
            let next = self
                .edges_of_kind(current, DepKind::Build)
                .into_iter()
                .find(|dep| stuck.contains(dep));
            match next {
                Some(dep) => current = dep,
                None => return path.iter().map(|n| (*n).to_string()).collect(),
            }
        }
    }
}
