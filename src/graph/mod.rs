//! Recompilation dependency graph: which compilation units must be
//! recompiled when a unit changes.
//!
//! The graph is rebuilt wholesale by [`consolidate::consolidate`] on each
//! build-step pass and read-only afterwards; there is no incremental patching
//! and therefore no partial-update race to defend against.

pub mod consolidate;
pub mod index;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::Directed;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use index::TypeId;

/// The consolidated graph: a directed petgraph `StableGraph` of compilation
/// units with an O(1) lookup index. An edge `a -> b` means "a change to `a`
/// invalidates `b`".
pub struct RecompilationGraph {
    graph: StableGraph<TypeId, (), Directed>,
    unit_index: HashMap<TypeId, NodeIndex>,
}

impl RecompilationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            unit_index: HashMap::new(),
        }
    }

    /// Add a compilation unit node. Returns the existing index if the unit
    /// has already been added.
    pub fn add_unit(&mut self, unit: TypeId) -> NodeIndex {
        if let Some(&existing) = self.unit_index.get(&unit) {
            return existing;
        }
        let idx = self.graph.add_node(unit.clone());
        self.unit_index.insert(unit, idx);
        idx
    }

    /// Record that a change to `changed` invalidates `dependent`. Duplicate
    /// edges collapse silently; self-edges are legal (a unit may need to
    /// recompile itself).
    pub fn add_invalidation(&mut self, changed: TypeId, dependent: TypeId) {
        let from = self.add_unit(changed);
        let to = self.add_unit(dependent);
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, ());
        }
    }

    /// The units that must be recompiled when `changed` changes. Empty when
    /// the unit is unknown or has no dependents.
    pub fn invalidated_by(&self, changed: &TypeId) -> BTreeSet<TypeId> {
        let Some(&idx) = self.unit_index.get(changed) else {
            return BTreeSet::new();
        };
        self.graph
            .edges(idx)
            .map(|e| self.graph[e.target()].clone())
            .collect()
    }

    /// Number of compilation units in the graph.
    pub fn unit_count(&self) -> usize {
        self.unit_index.len()
    }

    /// Number of invalidation edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_index.is_empty()
    }

    /// Canonical sorted view of the whole graph, keyed by changed unit.
    /// Units with no dependents are omitted.
    pub fn edges(&self) -> BTreeMap<TypeId, BTreeSet<TypeId>> {
        let mut out: BTreeMap<TypeId, BTreeSet<TypeId>> = BTreeMap::new();
        for edge in self.graph.edge_references() {
            out.entry(self.graph[edge.source()].clone())
                .or_default()
                .insert(self.graph[edge.target()].clone());
        }
        out
    }
}

impl Default for RecompilationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for RecompilationGraph {
    fn eq(&self, other: &Self) -> bool {
        self.edges() == other.edges()
    }
}

impl Eq for RecompilationGraph {}

impl std::fmt::Debug for RecompilationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecompilationGraph")
            .field("units", &self.unit_count())
            .field("edges", &self.edges())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_duplicate_unit_returns_same_index() {
        let mut graph = RecompilationGraph::new();
        let a = graph.add_unit(TypeId::from("com.acme.A"));
        let b = graph.add_unit(TypeId::from("com.acme.A"));
        assert_eq!(a, b);
        assert_eq!(graph.unit_count(), 1);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = RecompilationGraph::new();
        graph.add_invalidation(TypeId::from("A"), TypeId::from("B"));
        graph.add_invalidation(TypeId::from("A"), TypeId::from("B"));
        assert_eq!(graph.edge_count(), 1, "the same logical edge is stored once");
    }

    #[test]
    fn test_invalidated_by_unknown_unit_is_empty() {
        let graph = RecompilationGraph::new();
        assert!(graph.invalidated_by(&TypeId::from("ghost.Unit")).is_empty());
    }

    #[test]
    fn test_self_dependency_preserved() {
        let mut graph = RecompilationGraph::new();
        graph.add_invalidation(TypeId::from("A"), TypeId::from("A"));
        let deps = graph.invalidated_by(&TypeId::from("A"));
        assert!(deps.contains(&TypeId::from("A")), "self edge must survive");
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let mut g1 = RecompilationGraph::new();
        g1.add_invalidation(TypeId::from("A"), TypeId::from("B"));
        g1.add_invalidation(TypeId::from("A"), TypeId::from("C"));

        let mut g2 = RecompilationGraph::new();
        g2.add_invalidation(TypeId::from("A"), TypeId::from("C"));
        g2.add_invalidation(TypeId::from("A"), TypeId::from("B"));

        assert_eq!(g1, g2);
    }
}
