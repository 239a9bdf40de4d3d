//! Dependency Graph Module
//!
//! Bidirectional record of which cached keys were computed from which others.

use std::collections::{BTreeSet, HashMap, HashSet};

// == Dependency Graph ==
/// Directed edges `dependent -> depends_on`, indexed in both directions.
///
/// `dependents` and `dependencies` are mutual inverses at all times; empty
/// sets are pruned so churned keys leave nothing behind.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// depends_on -> keys that depend on it
    dependents: HashMap<String, HashSet<String>>,
    /// dependent -> keys it depends on
    dependencies: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // == Add Dependency ==
    /// Records that `key` depends on `depends_on`. Idempotent.
    pub fn add_dependency(&mut self, key: &str, depends_on: &str) {
        self.dependents
            .entry(depends_on.to_string())
            .or_default()
            .insert(key.to_string());
        self.dependencies
            .entry(key.to_string())
            .or_default()
            .insert(depends_on.to_string());
    }

    // == Remove Dependency ==
    /// Removes exactly the edge `key -> depends_on`.
    pub fn remove_dependency(&mut self, key: &str, depends_on: &str) {
        remove_edge(&mut self.dependents, depends_on, key);
        remove_edge(&mut self.dependencies, key, depends_on);
    }

    // == Dependents ==
    /// Keys that would need invalidation if `key` changes.
    pub fn dependents(&self, key: &str) -> BTreeSet<String> {
        collect(self.dependents.get(key))
    }

    // == Dependencies ==
    /// Keys that `key` was derived from.
    pub fn dependencies(&self, key: &str) -> BTreeSet<String> {
        collect(self.dependencies.get(key))
    }

    // == Remove Dependencies ==
    /// Drops every edge touching `key`, on both sides.
    ///
    /// Keys that depended on `key` lose their back-reference to it, and every
    /// edge where `key` was the dependent is removed.
    pub fn remove_dependencies(&mut self, key: &str) {
        if let Some(dependents) = self.dependents.remove(key) {
            for dependent in dependents {
                remove_edge(&mut self.dependencies, &dependent, key);
            }
        }
        if let Some(upstream) = self.dependencies.remove(key) {
            for depends_on in upstream {
                remove_edge(&mut self.dependents, &depends_on, key);
            }
        }
    }

    // == Remove Outgoing ==
    /// Drops only the edges where `key` is the dependent.
    ///
    /// Used when a key is overwritten with a new dependency list; keys that
    /// depend on `key` keep their edges.
    pub fn remove_outgoing(&mut self, key: &str) {
        if let Some(upstream) = self.dependencies.remove(key) {
            for depends_on in upstream {
                remove_edge(&mut self.dependents, &depends_on, key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
        self.dependencies.clear();
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(HashSet::len).sum()
    }

    /// Every key that appears on either end of an edge.
    pub fn tracked_keys(&self) -> BTreeSet<String> {
        self.dependents
            .keys()
            .chain(self.dependencies.keys())
            .cloned()
            .collect()
    }
}

fn remove_edge(map: &mut HashMap<String, HashSet<String>>, from: &str, to: &str) {
    if let Some(set) = map.get_mut(from) {
        set.remove(to);
        if set.is_empty() {
            map.remove(from);
        }
    }
}

fn collect(set: Option<&HashSet<String>>) -> BTreeSet<String> {
    set.map(|s| s.iter().cloned().collect()).unwrap_or_default()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Both indexes must describe the same edge set.
    fn assert_mutual_inverse(graph: &DependencyGraph) {
        for (depends_on, dependents) in &graph.dependents {
            for dependent in dependents {
                assert!(graph.dependencies(dependent).contains(depends_on));
            }
        }
        for (dependent, upstream) in &graph.dependencies {
            for depends_on in upstream {
                assert!(graph.dependents(depends_on).contains(dependent));
            }
        }
    }

    #[test]
    fn test_add_dependency_both_directions() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("user:1", "profile:1");

        assert_eq!(graph.dependents("profile:1"), keys(&["user:1"]));
        assert_eq!(graph.dependencies("user:1"), keys(&["profile:1"]));
        assert_mutual_inverse(&graph);
    }

    #[test]
    fn test_add_dependency_idempotent() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        graph.add_dependency("a", "b");

        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_remove_single_edge() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        graph.add_dependency("a", "c");

        graph.remove_dependency("a", "b");

        assert_eq!(graph.dependencies("a"), keys(&["c"]));
        assert!(graph.dependents("b").is_empty());
        assert_mutual_inverse(&graph);
    }

    #[test]
    fn test_remove_dependencies_is_two_sided() {
        let mut graph = DependencyGraph::new();
        // b sits in the middle: a -> b -> c
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "c");
        graph.add_dependency("x", "c");

        graph.remove_dependencies("b");

        assert!(graph.dependencies("a").is_empty());
        assert!(graph.dependents("b").is_empty());
        assert!(graph.dependencies("b").is_empty());
        assert_eq!(graph.dependents("c"), keys(&["x"]));
        assert!(!graph.tracked_keys().contains("b"));
        assert!(!graph.tracked_keys().contains("a"));
        assert_mutual_inverse(&graph);
    }

    #[test]
    fn test_remove_outgoing_keeps_incoming() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        graph.add_dependency("b", "c");

        graph.remove_outgoing("b");

        assert_eq!(graph.dependents("b"), keys(&["a"]));
        assert!(graph.dependents("c").is_empty());
        assert_mutual_inverse(&graph);
    }

    #[test]
    fn test_clear() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("a", "b");
        graph.clear();

        assert_eq!(graph.edge_count(), 0);
        assert!(graph.tracked_keys().is_empty());
    }
}
