//! FILENAME: engine/src/dependency_graph.rs
//! PURPOSE: Tracks which statistics are sourced from which, and orders cascades.
//! CONTEXT: A statistic reads either raw records or exactly one other
//! statistic's stored rows. That makes the source graph a forest: every node
//! has at most one upstream and any number of dependents. When a statistic
//! changes, it and everything transitively sourced from it must be recomputed
//! upstream-first.
//!
//! TERMINOLOGY:
//! - Upstream: the statistic a node reads its rows from.
//! - Dependents: statistics whose upstream is a given node (reverse lookup).
//!
//! USAGE:
//! 1. Build a graph from the catalogue with `DependencyGraph::from_nodes()`.
//! 2. Before re-sourcing a statistic, call `would_create_cycle()`.
//! 3. To refresh a statistic and everything downstream, run the ids returned
//!    by `cascade_order()` strictly in order.

use std::collections::VecDeque;
use rustc_hash::{FxHashMap, FxHashSet};

/// Unique identifier for a statistic within a catalogue.
pub type StatisticId = u32;

/// Anything that can sit in the source graph.
pub trait DependencyNode {
    fn id(&self) -> StatisticId;
    /// The statistic this node reads from, if it reads from one.
    fn upstream_id(&self) -> Option<StatisticId>;
}

/// Error type for cycle detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// The statistics involved in the cycle, in upstream order.
    pub cycle_path: Vec<StatisticId>,
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Circular statistic source detected: ")?;
        for (i, id) in self.cycle_path.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "#{}", id)?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleError {}

/// Forward (upstream) and reverse (dependents) mappings between statistics.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// upstream[S] = the statistic S reads from.
    upstream: FxHashMap<StatisticId, StatisticId>,

    /// dependents[U] = statistics reading from U, sorted by id.
    dependents: FxHashMap<StatisticId, Vec<StatisticId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Builds the graph from every statistic in a catalogue.
    pub fn from_nodes<'a, N, I>(nodes: I) -> Self
    where
        N: DependencyNode + 'a,
        I: IntoIterator<Item = &'a N>,
    {
        let mut graph = DependencyGraph::new();
        for node in nodes {
            graph.set_upstream(node.id(), node.upstream_id());
        }
        graph
    }

    /// Sets (or clears) the upstream of a statistic, replacing any previous one.
    ///
    /// # Note
    /// This does NOT check for cycles. Use `would_create_cycle()` first.
    pub fn set_upstream(&mut self, id: StatisticId, upstream: Option<StatisticId>) {
        self.clear_upstream(id);
        if let Some(up) = upstream {
            let deps = self.dependents.entry(up).or_default();
            if let Err(pos) = deps.binary_search(&id) {
                deps.insert(pos, id);
            }
            self.upstream.insert(id, up);
        }
    }

    /// Detaches a statistic from its upstream.
    pub fn clear_upstream(&mut self, id: StatisticId) {
        if let Some(old) = self.upstream.remove(&id) {
            if let Some(deps) = self.dependents.get_mut(&old) {
                deps.retain(|&d| d != id);
                if deps.is_empty() {
                    self.dependents.remove(&old);
                }
            }
        }
    }

    /// Removes a statistic and every edge touching it.
    pub fn remove(&mut self, id: StatisticId) {
        self.clear_upstream(id);
        if let Some(children) = self.dependents.remove(&id) {
            for child in children {
                self.upstream.remove(&child);
            }
        }
    }

    pub fn upstream_of(&self, id: StatisticId) -> Option<StatisticId> {
        self.upstream.get(&id).copied()
    }

    /// Direct dependents only, sorted by id.
    pub fn downstream_of(&self, id: StatisticId) -> &[StatisticId] {
        self.dependents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Checks if making `new_upstream` the source of `id` would create a cycle,
    /// i.e. whether `id` is already an ancestor of `new_upstream`.
    pub fn would_create_cycle(&self, id: StatisticId, new_upstream: StatisticId) -> bool {
        let mut visited = FxHashSet::default();
        let mut current = Some(new_upstream);
        while let Some(node) = current {
            if node == id {
                return true;
            }
            if !visited.insert(node) {
                // Pre-existing loop that does not pass through `id`.
                return false;
            }
            current = self.upstream_of(node);
        }
        false
    }

    /// All transitive dependents (not including the statistic itself), BFS order.
    pub fn all_downstream_of(&self, id: StatisticId) -> Vec<StatisticId> {
        let mut order = self.expand(id);
        order.remove(0);
        order
    }

    /// The recompute sequence for a change to `id`: `id` first, then every
    /// transitive dependent, each after all of its ancestors.
    ///
    /// # Returns
    /// - `Ok(Vec<StatisticId>)` - ids to recompute, in order, each exactly once.
    /// - `Err(CycleError)` - if `id` sits on a source cycle.
    pub fn cascade_order(&self, id: StatisticId) -> Result<Vec<StatisticId>, CycleError> {
        if let Some(cycle_path) = self.cycle_through(id) {
            return Err(CycleError { cycle_path });
        }
        Ok(self.expand(id))
    }

    /// Breadth-first expansion through dependents; first-reached position wins.
    fn expand(&self, id: StatisticId) -> Vec<StatisticId> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            for &dep in self.downstream_of(current) {
                if !seen.contains(&dep) {
                    queue.push_back(dep);
                }
            }
        }

        order
    }

    /// Follows upstream links from `id`; returns the loop if it comes back to `id`.
    fn cycle_through(&self, id: StatisticId) -> Option<Vec<StatisticId>> {
        let mut path = vec![id];
        let mut visited = FxHashSet::default();
        visited.insert(id);
        let mut current = self.upstream_of(id);

        while let Some(node) = current {
            path.push(node);
            if node == id {
                path.reverse();
                return Some(path);
            }
            if !visited.insert(node) {
                return None;
            }
            current = self.upstream_of(node);
        }
        None
    }

    /// Returns the number of statistics that read from another statistic.
    pub fn sourced_count(&self) -> usize {
        self.upstream.len()
    }
}

// ============================================================================
// CATALOGUE-LEVEL QUERIES
// ============================================================================

/// The statistic `id` reads from, looked up in `all`.
pub fn upstream_of<'a, N: DependencyNode>(id: StatisticId, all: &'a [N]) -> Option<&'a N> {
    let up = all.iter().find(|n| n.id() == id)?.upstream_id()?;
    all.iter().find(|n| n.id() == up)
}

/// Direct dependents of `id`, in id order.
pub fn downstream_of<'a, N: DependencyNode>(id: StatisticId, all: &'a [N]) -> Vec<&'a N> {
    let mut deps: Vec<&N> = all.iter().filter(|n| n.upstream_id() == Some(id)).collect();
    deps.sort_by_key(|n| n.id());
    deps
}

/// Cascade order for `id` over a full catalogue.
pub fn cascade_order<N: DependencyNode>(id: StatisticId, all: &[N]) -> Result<Vec<StatisticId>, CycleError> {
    DependencyGraph::from_nodes(all).cascade_order(id)
}
