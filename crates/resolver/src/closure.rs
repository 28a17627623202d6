//! Transitive runtime dependency closure

use crate::graph::DependencyGraph;
use deskbuild_types::DepKind;
use std::collections::BTreeSet;

/// Compute the transitive runtime closure of one component
///
/// Traverses `Runtime` edges only: recommends are soft and never silently
/// upgraded to hard requirements, and build edges are irrelevant at install
/// time. External names are included in the result but cannot be traversed
/// further. The starting component itself is never part of the closure,
/// even when runtime edges loop back through a diamond. Idempotent by
/// construction: the result depends only on the graph.
pub fn close_runtime_dependencies(graph: &DependencyGraph, name: &str) -> BTreeSet<String> {
    let mut closure = BTreeSet::new();
    let mut stack: Vec<String> = direct_runtime_deps(graph, name);

    while let Some(next) = stack.pop() {
        if next == name || !closure.insert(next.clone()) {
            continue;
        }
        stack.extend(direct_runtime_deps(graph, &next));
    }

    closure
}

fn direct_runtime_deps(graph: &DependencyGraph, name: &str) -> Vec<String> {
    graph.get(name).map_or_else(Vec::new, |d| {
        d.dependencies
            .iter()
            .filter(|dep| dep.kind == DepKind::Runtime)
            .map(|dep| dep.name.clone())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::component;
    use deskbuild_types::Dependency;

    #[test]
    fn diamond_closure_excludes_self_and_deduplicates() {
        // m -> {b, c}, b -> a, c -> a
        let graph = DependencyGraph::from_descriptors(vec![
            component("m", vec![
                Dependency::any("b", DepKind::Runtime),
                Dependency::any("c", DepKind::Runtime),
            ]),
            component("b", vec![Dependency::any("a", DepKind::Runtime)]),
            component("c", vec![Dependency::any("a", DepKind::Runtime)]),
            component("a", vec![]),
        ])
        .unwrap();

        let closure = close_runtime_dependencies(&graph, "m");
        let expected: BTreeSet<String> =
            ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(closure, expected);
    }

    #[test]
    fn closure_is_idempotent() {
        let graph = DependencyGraph::from_descriptors(vec![
            component("xterm", vec![Dependency::any("libxft", DepKind::Runtime)]),
            component("libxft", vec![Dependency::any("freetype", DepKind::Runtime)]),
            component("freetype", vec![]),
        ])
        .unwrap();

        let first = close_runtime_dependencies(&graph, "xterm");
        let second = close_runtime_dependencies(&graph, "xterm");
        assert_eq!(first, second);
    }

    #[test]
    fn runtime_loop_never_includes_the_start() {
        let graph = DependencyGraph::from_descriptors(vec![
            component("gtk", vec![Dependency::any("glib", DepKind::Runtime)]),
            component("glib", vec![Dependency::any("gtk", DepKind::Runtime)]),
        ])
        .unwrap();

        let closure = close_runtime_dependencies(&graph, "gtk");
        assert!(closure.contains("glib"));
        assert!(!closure.contains("gtk"));
    }

    #[test]
    fn recommends_and_build_edges_are_excluded() {
        let graph = DependencyGraph::from_descriptors(vec![
            component("xterm", vec![
                Dependency::any("libxft", DepKind::Runtime),
                Dependency::any("fontconfig", DepKind::Recommend),
                Dependency::any("gcc", DepKind::Build),
            ]),
            component("libxft", vec![]),
            component("fontconfig", vec![]),
        ])
        .unwrap();

        let closure = close_runtime_dependencies(&graph, "xterm");
        assert!(closure.contains("libxft"));
        assert!(!closure.contains("fontconfig"));
        assert!(!closure.contains("gcc"));
    }

    #[test]
    fn external_runtime_names_are_included_but_not_traversed() {
        let graph = DependencyGraph::from_descriptors(vec![component(
            "xterm",
            vec![Dependency::any("ncurses", DepKind::Runtime)],
        )])
        .unwrap();

        let closure = close_runtime_dependencies(&graph, "xterm");
        assert_eq!(closure.len(), 1);
        assert!(closure.contains("ncurses"));
    }
}
