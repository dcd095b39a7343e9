//! BT-006: Dependency graph. Interactive traversal and cycle detection.
//!
//! Edges point dependency → dependent. Every node without a parent hangs off
//! a synthetic root, so one walk from the root reaches the whole graph.
//!
//! The traversal is an explicit state object. Each step hands out one target
//! and waits for the caller to report whether it succeeded. A node is
//! released once every parent has reported: it is visited when all parents
//! succeeded and skipped otherwise, and a skip counts as a failure for its
//! own children. Among released nodes the order is FIFO, ties broken by edge
//! insertion order.

use super::types::DependencyIndex;
use indexmap::IndexMap;
use std::collections::VecDeque;
use tracing::debug;

/// Name of the synthetic start node. Never yielded by a traversal.
pub const ROOT: &str = "__START__";

const ROOT_ID: NodeId = 0;

type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    name: String,
    children: Vec<NodeId>,
    parents: Vec<NodeId>,
}

/// Immutable dependency graph. Build with [`DependencyGraphBuilder`] or
/// [`DependencyGraph::from_index`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    ids: IndexMap<String, NodeId>,
}

/// Incremental graph construction. Duplicate edges are ignored.
#[derive(Debug, Clone)]
pub struct DependencyGraphBuilder {
    graph: DependencyGraph,
}

impl Default for DependencyGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraphBuilder {
    pub fn new() -> Self {
        let mut graph = DependencyGraph {
            nodes: Vec::new(),
            ids: IndexMap::new(),
        };
        graph.intern(ROOT);
        Self { graph }
    }

    /// Ensure a node exists.
    pub fn add_node(mut self, name: &str) -> Self {
        self.graph.intern(name);
        self
    }

    /// `dependent` must run after `dependency`.
    pub fn add_edge(mut self, dependency: &str, dependent: &str) -> Self {
        let from = self.graph.intern(dependency);
        let to = self.graph.intern(dependent);
        self.graph.link(from, to);
        self
    }

    /// Attach parentless nodes to the root and freeze the graph.
    pub fn build(mut self) -> DependencyGraph {
        let orphans: Vec<NodeId> = (1..self.graph.nodes.len())
            .filter(|&id| self.graph.nodes[id].parents.is_empty())
            .collect();
        for id in orphans {
            self.graph.link(ROOT_ID, id);
        }
        self.graph
    }
}

impl DependencyGraph {
    /// Build from a target → dependencies index. Children are ordered by
    /// index order, then by each target's dependency list.
    pub fn from_index(index: &DependencyIndex) -> Self {
        let mut builder = DependencyGraphBuilder::new();
        for (target, deps) in index {
            builder = builder.add_node(target);
            for dep in deps {
                builder = builder.add_edge(dep, target);
            }
        }
        let graph = builder.build();
        debug!(nodes = graph.len(), "built dependency graph");
        graph
    }

    fn intern(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            children: Vec::new(),
            parents: Vec::new(),
        });
        self.ids.insert(name.to_string(), id);
        id
    }

    fn link(&mut self, from: NodeId, to: NodeId) {
        if self.nodes[from].children.contains(&to) {
            return;
        }
        self.nodes[from].children.push(to);
        self.nodes[to].parents.push(from);
    }

    /// Number of targets, excluding the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        name != ROOT && self.ids.contains_key(name)
    }

    /// Target names in insertion order, excluding the root.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes[1..].iter().map(|n| n.name.as_str())
    }

    /// Direct dependents of `name`.
    pub fn children(&self, name: &str) -> Vec<&str> {
        self.ids
            .get(name)
            .map(|&id| {
                self.nodes[id]
                    .children
                    .iter()
                    .map(|&c| self.nodes[c].name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fresh traversal state over this graph.
    pub fn traversal(&self) -> Traversal<'_> {
        Traversal::new(self)
    }

    /// Drive a traversal with a callback reporting each target's success.
    /// Returns the sorted names of every target that was not visited.
    pub fn walk(&self, mut visit: impl FnMut(&str) -> bool) -> Vec<String> {
        let mut traversal = self.traversal();
        let mut success = true;
        loop {
            match traversal.advance(success) {
                Step::Visit(name) => success = visit(name),
                Step::Done(skipped) => return skipped,
            }
        }
    }

    /// Dependency-respecting order of all targets, assuming every step
    /// succeeds. Targets on a cycle never appear.
    pub fn install_order(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.len());
        self.walk(|name| {
            order.push(name.to_string());
            true
        });
        order
    }

    /// First cycle found by depth-first search from every target in
    /// insertion order. The path is the search stack followed by the
    /// repeated node, e.g. `[a, b, c, a]`.
    pub fn find_first_cycle(&self) -> Option<Vec<String>> {
        let mut finished = vec![false; self.nodes.len()];
        let mut on_stack = vec![false; self.nodes.len()];
        let mut stack = Vec::new();
        for start in 1..self.nodes.len() {
            if finished[start] {
                continue;
            }
            if let Some(path) = self.cycle_from(start, &mut finished, &mut on_stack, &mut stack) {
                return Some(path);
            }
        }
        None
    }

    fn cycle_from(
        &self,
        id: NodeId,
        finished: &mut [bool],
        on_stack: &mut [bool],
        stack: &mut Vec<NodeId>,
    ) -> Option<Vec<String>> {
        stack.push(id);
        on_stack[id] = true;
        for &child in &self.nodes[id].children {
            if on_stack[child] {
                let mut path: Vec<String> =
                    stack.iter().map(|&n| self.nodes[n].name.clone()).collect();
                path.push(self.nodes[child].name.clone());
                return Some(path);
            }
            if finished[child] {
                continue;
            }
            if let Some(path) = self.cycle_from(child, finished, on_stack, stack) {
                return Some(path);
            }
        }
        stack.pop();
        on_stack[id] = false;
        finished[id] = true;
        None
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// One traversal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<'g> {
    /// Run this target, then report its outcome to the next `advance` call.
    Visit(&'g str),

    /// Traversal finished. Sorted names of every target not visited,
    /// whether pruned by a failure or never reached.
    Done(Vec<String>),
}

/// Per-pass traversal bookkeeping. Two passes never share one.
#[derive(Debug)]
pub struct Traversal<'g> {
    graph: &'g DependencyGraph,
    queue: VecDeque<NodeId>,
    /// Parents that have not reported yet
    pending: Vec<usize>,
    /// Some parent failed or was skipped
    doomed: Vec<bool>,
    visited: Vec<bool>,
    skipped: Vec<bool>,
    current: Option<NodeId>,
}

impl<'g> Traversal<'g> {
    fn new(graph: &'g DependencyGraph) -> Self {
        let count = graph.nodes.len();
        let mut traversal = Self {
            graph,
            queue: VecDeque::new(),
            pending: graph.nodes.iter().map(|n| n.parents.len()).collect(),
            doomed: vec![false; count],
            visited: vec![false; count],
            skipped: vec![false; count],
            current: None,
        };
        traversal.visited[ROOT_ID] = true;
        traversal.release_children(ROOT_ID, true);
        traversal
    }

    fn release_children(&mut self, id: NodeId, success: bool) {
        for &child in &self.graph.nodes[id].children {
            if !success {
                self.doomed[child] = true;
            }
            self.pending[child] -= 1;
            if self.pending[child] == 0 {
                self.queue.push_back(child);
            }
        }
    }

    /// Report the outcome of the previously yielded target and move on.
    /// `success` is ignored on the first call.
    pub fn advance(&mut self, success: bool) -> Step<'g> {
        if let Some(id) = self.current.take() {
            self.visited[id] = true;
            if !success {
                debug!(node = %self.graph.nodes[id].name, "target failed, pruning dependents");
            }
            self.release_children(id, success);
        }

        while let Some(id) = self.queue.pop_front() {
            if self.doomed[id] {
                debug!(node = %self.graph.nodes[id].name, "skipping target");
                self.skipped[id] = true;
                self.release_children(id, false);
                continue;
            }
            self.current = Some(id);
            return Step::Visit(&self.graph.nodes[id].name);
        }

        Step::Done(self.unvisited())
    }

    fn unvisited(&self) -> Vec<String> {
        let mut names: Vec<String> = (1..self.graph.nodes.len())
            .filter(|&id| self.skipped[id] || !self.visited[id])
            .map(|id| self.graph.nodes[id].name.clone())
            .collect();
        names.sort();
        names
    }
}
