//! Transitive data-flow queries.
//!
//! Wraps the lazy direct-edge overlay with the two queries the rest of
//! the system asks: everything reachable from an occurrence, and every
//! maximal path out of it. Paths stop at a node with no further edges, at
//! the depth bound (marked truncated), or at a node already on the
//! current path.

use rustc_hash::FxHashSet;

use crate::features::ast::domain::NodeId;
use crate::features::data_flow::domain::flow::FlowPath;
use crate::features::pdg::infrastructure::def_use::{DataDeps, Direction};

pub struct FlowEngine<'a> {
    deps: &'a DataDeps<'a>,
    max_depth: usize,
}

impl<'a> FlowEngine<'a> {
    pub fn new(deps: &'a DataDeps<'a>, max_depth: usize) -> Self {
        Self { deps, max_depth }
    }

    fn step(&self, occurrence: NodeId, direction: Direction) -> Vec<NodeId> {
        match direction {
            Direction::Backward => self.deps.parents_of(occurrence),
            Direction::Forward => self.deps.children_of(occurrence),
        }
    }

    /// Ordered transitive closure from `origin` (origin excluded).
    /// Breadth-first, deduplicated, deterministic.
    pub fn reachable(&self, origin: NodeId, direction: Direction) -> Vec<NodeId> {
        let mut seen = FxHashSet::default();
        seen.insert(origin);
        let mut frontier = vec![origin];
        let mut out = Vec::new();
        let mut depth = 0;
        while !frontier.is_empty() && depth < self.max_depth {
            let mut next = Vec::new();
            for &occurrence in &frontier {
                for reached in self.step(occurrence, direction) {
                    if seen.insert(reached) {
                        out.push(reached);
                        next.push(reached);
                    }
                }
            }
            frontier = next;
            depth += 1;
        }
        out
    }

    /// Every maximal path out of `origin`, depth-first in edge order.
    pub fn paths(&self, origin: NodeId, direction: Direction) -> Vec<FlowPath> {
        let mut paths = Vec::new();
        let mut current = vec![origin];
        let mut on_path = FxHashSet::default();
        on_path.insert(origin);
        self.extend_path(direction, &mut current, &mut on_path, &mut paths);
        paths
    }

    fn extend_path(
        &self,
        direction: Direction,
        current: &mut Vec<NodeId>,
        on_path: &mut FxHashSet<NodeId>,
        out: &mut Vec<FlowPath>,
    ) {
        if current.len() >= self.max_depth {
            out.push(FlowPath {
                occurrences: current.clone(),
                truncated: true,
            });
            return;
        }
        let tail = *current.last().expect("path is never empty");
        let next: Vec<NodeId> = self
            .step(tail, direction)
            .into_iter()
            .filter(|occ| !on_path.contains(occ))
            .collect();
        if next.is_empty() {
            out.push(FlowPath {
                occurrences: current.clone(),
                truncated: false,
            });
            return;
        }
        for occurrence in next {
            current.push(occurrence);
            on_path.insert(occurrence);
            self.extend_path(direction, current, on_path, out);
            on_path.remove(&occurrence);
            current.pop();
        }
    }
}
