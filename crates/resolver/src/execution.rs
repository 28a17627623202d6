//! Ready-queue execution plan over the build DAG
//!
//! The orchestration driver owns one plan per run: a component becomes
//! ready once every in-set build dependency has completed; a failure skips
//! the failed component's transitive dependents without touching
//! independent branches.

use crate::graph::DependencyGraph;
use deskbuild_types::DepKind;
use std::collections::{BTreeMap, BTreeSet};

/// Scheduling state for one run
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Remaining in-set build dependencies per pending component
    in_degree: BTreeMap<String, usize>,
    /// Reverse build edges among scheduled components
    dependents: BTreeMap<String, Vec<String>>,
}

impl ExecutionPlan {
    /// Create a plan over a subset of the graph's components
    ///
    /// Only edges between two scheduled components count toward readiness;
    /// external requirements and unscheduled names (meta-packages) are
    /// assumed satisfied.
    pub fn new<'a>(graph: &DependencyGraph, scheduled: impl IntoIterator<Item = &'a str>) -> Self {
        let scheduled: BTreeSet<&str> = scheduled.into_iter().collect();
        let mut in_degree: BTreeMap<String, usize> =
            scheduled.iter().map(|n| ((*n).to_string(), 0)).collect();
        let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for name in &scheduled {
            for dep in graph.edges_of_kind(name, DepKind::Build) {
                if !scheduled.contains(dep) {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(*name) {
                    *degree += 1;
                }
                dependents
                    .entry(dep.to_string())
                    .or_default()
                    .push((*name).to_string());
            }
        }

        Self {
            in_degree,
            dependents,
        }
    }

    /// Components ready to start, in name order
    pub fn ready(&self) -> Vec<String> {
        self.in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Mark a component complete; returns dependents that became ready
    pub fn complete(&mut self, name: &str) -> Vec<String> {
        self.in_degree.remove(name);

        let mut newly_ready = Vec::new();
        for dependent in self.dependents.get(name).cloned().unwrap_or_default() {
            if let Some(degree) = self.in_degree.get_mut(&dependent) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    newly_ready.push(dependent);
                }
            }
        }
        newly_ready.sort();
        newly_ready
    }

    /// Mark a component failed; returns its transitive dependents, removed
    /// from the plan so they are never attempted
    pub fn fail(&mut self, name: &str) -> Vec<String> {
        self.in_degree.remove(name);

        let mut skipped = BTreeSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(next) = stack.pop() {
            for dependent in self.dependents.get(&next).cloned().unwrap_or_default() {
                if self.in_degree.remove(&dependent).is_some() {
                    skipped.insert(dependent.clone());
                    stack.push(dependent);
                }
            }
        }
        skipped.into_iter().collect()
    }

    /// Components not yet completed, failed, or skipped
    pub fn pending(&self) -> usize {
        self.in_degree.len()
    }

    /// Remaining component names, in name order
    pub fn remaining(&self) -> Vec<String> {
        self.in_degree.keys().cloned().collect()
    }

    /// Whether every scheduled component has reached a terminal state
    pub fn is_done(&self) -> bool {
        self.in_degree.is_empty()
    }
}
