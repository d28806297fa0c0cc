//! Dependency graph over one process's tasks.
//!
//! Design:
//! - Forward edges: task -> its prerequisites (what it waits for)
//! - Reverse edges: task -> its dependents (who waits for it)
//! - Invariant: edges and reverse_edges must be kept in sync
//!
//! The graph is pure over its input: it validates and orders a process
//! definition but holds no execution state.

use std::collections::{HashMap, HashSet};

use crate::domain::{FlowlineError, TaskId};

/// Prerequisite graph for the tasks of one process.
///
/// Both edge directions are maintained for O(1) lookups:
/// - `edges`: TaskId -> set of prerequisite TaskIds
/// - `reverse_edges`: TaskId -> set of dependent TaskIds
#[derive(Debug, Default)]
pub struct TaskGraph {
    /// All known tasks, in insertion order (kept for deterministic
    /// traversal starts).
    nodes: Vec<TaskId>,

    /// Forward edges: task -> tasks it depends on.
    edges: HashMap<TaskId, HashSet<TaskId>>,

    /// Reverse edges: task -> tasks that depend on it.
    reverse_edges: HashMap<TaskId, HashSet<TaskId>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task with no edges yet. Idempotent.
    pub fn add_task(&mut self, task: TaskId) {
        if !self.nodes.contains(&task) {
            self.nodes.push(task);
        }
    }

    /// Add an edge: `task` requires `prerequisite`.
    ///
    /// Both endpoints are registered if they were not already. Updates
    /// both maps:
    /// - edges: task -> {prerequisite}
    /// - reverse_edges: prerequisite -> {task}
    pub fn add_prerequisite(&mut self, task: TaskId, prerequisite: TaskId) {
        self.add_task(task);
        self.add_task(prerequisite);
        self.edges.entry(task).or_default().insert(prerequisite);
        self.reverse_edges
            .entry(prerequisite)
            .or_default()
            .insert(task);
    }

    /// Prerequisites of a task.
    pub fn prerequisites_of(&self, task: TaskId) -> Vec<TaskId> {
        self.edges
            .get(&task)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tasks that list `task` as a prerequisite.
    pub fn dependents_of(&self, task: TaskId) -> Vec<TaskId> {
        self.reverse_edges
            .get(&task)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Tasks with an empty prerequisite set; these seed a new run.
    pub fn roots(&self) -> Vec<TaskId> {
        self.nodes
            .iter()
            .copied()
            .filter(|t| self.edges.get(t).map(|d| d.is_empty()).unwrap_or(true))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check whether adding `task` -> `prerequisite` would be legal.
    ///
    /// Rejects self-edges and edges that would close a cycle (i.e. the
    /// candidate prerequisite already reaches `task` through its own
    /// prerequisite chain). Used by authoring before an edge is
    /// persisted.
    pub fn validate_edge(&self, task: TaskId, prerequisite: TaskId) -> Result<(), FlowlineError> {
        if task == prerequisite {
            return Err(FlowlineError::validation(
                "a task cannot be its own prerequisite",
            ));
        }
        // Walk prerequisite edges out of `prerequisite`; reaching
        // `task` means the new edge would close a loop.
        let mut stack = vec![prerequisite];
        let mut seen: HashSet<TaskId> = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == task {
                return Err(FlowlineError::CircularDependency(task));
            }
            if !seen.insert(node) {
                continue;
            }
            if let Some(deps) = self.edges.get(&node) {
                stack.extend(deps.iter().copied());
            }
        }
        Ok(())
    }

    /// Produce a dependency-respecting linear order of every task, or
    /// fail with `CircularDependency` naming a task on the offending
    /// path.
    ///
    /// Post-order DFS over prerequisite edges, iterative with explicit
    /// (node, next-child) frames so pathological graphs cannot blow the
    /// call stack. Two markers per task: on the current path (cycle
    /// probe) and fully emitted (memoized skip).
    pub fn order(&self) -> Result<Vec<TaskId>, FlowlineError> {
        let mut emitted: Vec<TaskId> = Vec::with_capacity(self.nodes.len());
        let mut done: HashSet<TaskId> = HashSet::new();
        let mut on_path: HashSet<TaskId> = HashSet::new();

        for &start in &self.nodes {
            if done.contains(&start) {
                continue;
            }

            let mut stack: Vec<Frame> = vec![Frame::new(start, self.prerequisites_of(start))];
            on_path.insert(start);

            while let Some(frame) = stack.last_mut() {
                if let Some(child) = frame.next_child() {
                    if done.contains(&child) {
                        continue;
                    }
                    if on_path.contains(&child) {
                        return Err(FlowlineError::CircularDependency(child));
                    }
                    on_path.insert(child);
                    let child_frame = Frame::new(child, self.prerequisites_of(child));
                    stack.push(child_frame);
                } else {
                    // All prerequisites emitted; emit the task itself.
                    let node = frame.node;
                    on_path.remove(&node);
                    done.insert(node);
                    emitted.push(node);
                    stack.pop();
                }
            }
        }

        Ok(emitted)
    }
}

/// One DFS frame: a task plus a cursor over its prerequisite list.
struct Frame {
    node: TaskId,
    children: Vec<TaskId>,
    next: usize,
}

impl Frame {
    fn new(node: TaskId, children: Vec<TaskId>) -> Self {
        Self {
            node,
            children,
            next: 0,
        }
    }

    fn next_child(&mut self) -> Option<TaskId> {
        let child = self.children.get(self.next).copied();
        if child.is_some() {
            self.next += 1;
        }
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;

    fn task_id() -> TaskId {
        TaskId::from_ulid(Ulid::new())
    }

    fn position(order: &[TaskId], task: TaskId) -> usize {
        order
            .iter()
            .position(|t| *t == task)
            .expect("task missing from order")
    }

    #[test]
    fn new_graph_is_empty() {
        let graph = TaskGraph::new();
        assert!(graph.is_empty());
        assert!(graph.roots().is_empty());
        assert!(graph.order().unwrap().is_empty());
    }

    #[test]
    fn add_prerequisite_creates_both_edges() {
        let mut graph = TaskGraph::new();
        let a = task_id();
        let b = task_id();

        graph.add_prerequisite(b, a); // B waits for A

        assert_eq!(graph.prerequisites_of(b), vec![a]);
        assert_eq!(graph.dependents_of(a), vec![b]);
        assert!(graph.prerequisites_of(a).is_empty());
    }

    #[test]
    fn roots_are_tasks_without_prerequisites() {
        let mut graph = TaskGraph::new();
        let a = task_id();
        let b = task_id();
        let c = task_id();

        graph.add_task(a);
        graph.add_prerequisite(b, a);
        graph.add_prerequisite(c, a);

        assert_eq!(graph.roots(), vec![a]);
    }

    #[test]
    fn order_puts_every_task_after_its_prerequisites() {
        let mut graph = TaskGraph::new();
        let a = task_id();
        let b = task_id();
        let c = task_id();
        let d = task_id();

        // a -> b -> d, a -> c -> d
        graph.add_prerequisite(b, a);
        graph.add_prerequisite(c, a);
        graph.add_prerequisite(d, b);
        graph.add_prerequisite(d, c);

        let order = graph.order().unwrap();
        assert_eq!(order.len(), 4);
        assert!(position(&order, a) < position(&order, b));
        assert!(position(&order, a) < position(&order, c));
        assert!(position(&order, b) < position(&order, d));
        assert!(position(&order, c) < position(&order, d));
    }

    #[test]
    fn order_emits_each_task_exactly_once() {
        let mut graph = TaskGraph::new();
        let a = task_id();
        let b = task_id();
        let c = task_id();

        // Diamond shortcut: c depends on both a and b, b depends on a.
        graph.add_prerequisite(b, a);
        graph.add_prerequisite(c, b);
        graph.add_prerequisite(c, a);

        let order = graph.order().unwrap();
        assert_eq!(order.len(), 3);
        let unique: HashSet<TaskId> = order.iter().copied().collect();
        assert_eq!(unique.len(), 3);
    }

    #[rstest]
    #[case::self_loop(1)]
    #[case::pair(2)]
    #[case::triangle(3)]
    #[case::long(10)]
    fn cycles_of_any_length_are_detected(#[case] len: usize) {
        let mut graph = TaskGraph::new();
        let ids: Vec<TaskId> = (0..len).map(|_| task_id()).collect();
        for i in 0..len {
            graph.add_prerequisite(ids[i], ids[(i + 1) % len]);
        }

        assert!(matches!(
            graph.order(),
            Err(FlowlineError::CircularDependency(_))
        ));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut graph = TaskGraph::new();
        let a = task_id();
        let b = task_id();
        let c = task_id();

        graph.add_prerequisite(b, a);
        graph.add_prerequisite(c, b);
        graph.add_prerequisite(c, a); // shortcut edge

        assert!(graph.order().is_ok());
    }

    #[test]
    fn convergent_paths_are_not_a_cycle() {
        let mut graph = TaskGraph::new();
        let a = task_id();
        let b = task_id();
        let c = task_id();
        let d = task_id();

        // a -> b -> d and a -> c -> d converge at d.
        graph.add_prerequisite(b, a);
        graph.add_prerequisite(c, a);
        graph.add_prerequisite(d, b);
        graph.add_prerequisite(d, c);

        assert!(graph.order().is_ok());
    }

    #[test]
    fn validate_edge_rejects_self_reference() {
        let mut graph = TaskGraph::new();
        let a = task_id();
        graph.add_task(a);

        let err = graph.validate_edge(a, a).unwrap_err();
        assert!(matches!(err, FlowlineError::Validation(_)));
    }

    #[test]
    fn validate_edge_rejects_closing_a_loop() {
        let mut graph = TaskGraph::new();
        let a = task_id();
        let b = task_id();
        let c = task_id();

        graph.add_prerequisite(b, a);
        graph.add_prerequisite(c, b);

        // a requiring c would close a -> b -> c -> a.
        let err = graph.validate_edge(a, c).unwrap_err();
        assert!(matches!(err, FlowlineError::CircularDependency(_)));

        // The legal direction is still fine.
        assert!(graph.validate_edge(c, a).is_ok());
    }

    #[test]
    fn deep_chain_does_not_overflow_the_stack() {
        let mut graph = TaskGraph::new();
        let ids: Vec<TaskId> = (0..10_000).map(|_| task_id()).collect();
        // Edges added tail-first so traversal starts at the deep end
        // and actually descends the full chain.
        for pair in ids.windows(2).rev() {
            graph.add_prerequisite(pair[1], pair[0]);
        }

        let order = graph.order().unwrap();
        assert_eq!(order.len(), ids.len());
        assert_eq!(order.first(), ids.first());
        assert_eq!(order.last(), ids.last());
    }
}
