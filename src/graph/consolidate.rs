//! Consolidation of per-contributor dependency maps into one canonical
//! recompilation graph.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::RecompilationGraph;
use super::index::{TypeId, TypeIndex};

/// One contributor's raw "type -> types to recompile when it changes" map.
/// Both sides may reference nested types; consolidation collapses them.
pub type RawDependencyMap = HashMap<TypeId, HashSet<TypeId>>;

/// Merge all contributed maps into one graph, resolving every key and value
/// to its outermost compilation unit.
///
/// Duplicate logical edges across contributions collapse via set union, and
/// distinct nested keys that resolve to the same outer unit merge under that
/// single key. The result replaces any previous graph wholesale — callers
/// swap it in atomically and treat it as read-only until the next pass.
pub fn consolidate(
    index: &dyn TypeIndex,
    contributions: &[RawDependencyMap],
) -> RecompilationGraph {
    // Resolve and union into sorted maps first so node/edge insertion order
    // (and therefore Debug output) is deterministic across passes.
    let mut merged: BTreeMap<TypeId, BTreeSet<TypeId>> = BTreeMap::new();
    for contribution in contributions {
        for (key, dependents) in contribution {
            let resolved_key = index.outermost_of(key);
            let entry = merged.entry(resolved_key).or_default();
            for dependent in dependents {
                entry.insert(index.outermost_of(dependent));
            }
        }
    }

    let mut graph = RecompilationGraph::new();
    for (changed, dependents) in merged {
        for dependent in dependents {
            graph.add_invalidation(changed.clone(), dependent);
        }
    }
    graph
}
