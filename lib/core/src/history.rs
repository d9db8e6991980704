//! Bounded undo/redo history of structural patches.

use crate::graph::{Edge, Node};
use std::collections::VecDeque;

/// One structural edit, addressed by index into the node or edge list.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    InsertNode { index: usize, node: Node },
    RemoveNode { index: usize, node: Node },
    ReplaceNode { index: usize, before: Node, after: Node },
    InsertEdge { index: usize, edge: Edge },
    RemoveEdge { index: usize, edge: Edge },
}

impl Edit {
    pub fn inverse(&self) -> Edit {
        match self {
            Edit::InsertNode { index, node } => Edit::RemoveNode {
                index: *index,
                node: node.clone(),
            },
            Edit::RemoveNode { index, node } => Edit::InsertNode {
                index: *index,
                node: node.clone(),
            },
            Edit::ReplaceNode { index, before, after } => Edit::ReplaceNode {
                index: *index,
                before: after.clone(),
                after: before.clone(),
            },
            Edit::InsertEdge { index, edge } => Edit::RemoveEdge {
                index: *index,
                edge: edge.clone(),
            },
            Edit::RemoveEdge { index, edge } => Edit::InsertEdge {
                index: *index,
                edge: edge.clone(),
            },
        }
    }

    fn apply(&self, nodes: &mut Vec<Node>, edges: &mut Vec<Edge>) {
        match self {
            Edit::InsertNode { index, node } => {
                nodes.insert((*index).min(nodes.len()), node.clone());
            }
            Edit::RemoveNode { index, node } => {
                if let Some(at) = locate(nodes, *index, |n| n.id == node.id) {
                    nodes.remove(at);
                }
            }
            Edit::ReplaceNode { index, before, after } => {
                if let Some(at) = locate(nodes, *index, |n| n.id == before.id) {
                    nodes[at] = after.clone();
                }
            }
            Edit::InsertEdge { index, edge } => {
                edges.insert((*index).min(edges.len()), edge.clone());
            }
            Edit::RemoveEdge { index, edge } => {
                if let Some(at) = locate(edges, *index, |e| e.id == edge.id) {
                    edges.remove(at);
                }
            }
        }
    }
}

/// Trusts the recorded index, falling back to a scan when it no longer matches.
fn locate<T>(items: &[T], index: usize, matches: impl Fn(&T) -> bool) -> Option<usize> {
    match items.get(index) {
        Some(item) if matches(item) => Some(index),
        _ => items.iter().position(matches),
    }
}

/// Ordered list of edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    edits: Vec<Edit>,
}

impl Patch {
    pub fn new(edits: Vec<Edit>) -> Self {
        Self { edits }
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Reversed list of inverted edits.
    pub fn inverse(&self) -> Patch {
        Patch {
            edits: self.edits.iter().rev().map(Edit::inverse).collect(),
        }
    }

    pub fn apply(&self, nodes: &mut Vec<Node>, edges: &mut Vec<Edge>) {
        for edit in &self.edits {
            edit.apply(nodes, edges);
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub label: String,
    pub forward: Patch,
    pub inverse: Patch,
}

impl HistoryEntry {
    pub fn new(label: impl Into<String>, forward: Patch) -> Self {
        let inverse = forward.inverse();
        Self {
            label: label.into(),
            forward,
            inverse,
        }
    }
}

/// Entries before `applied` are undoable, the rest redoable.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    applied: usize,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            applied: 0,
            capacity,
        }
    }

    /// Drops redoable entries, then evicts the oldest beyond capacity.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        self.entries.truncate(self.applied);
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.applied = self.entries.len();
    }

    /// Index of the last applied entry, -1 when none.
    pub fn pointer(&self) -> isize {
        self.applied as isize - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.entries.len()
    }

    /// Moves the pointer back and returns the entry to revert.
    pub fn step_back(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.applied -= 1;
        self.entries.get(self.applied)
    }

    /// Moves the pointer forward and returns the entry to reapply.
    pub fn step_forward(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.applied += 1;
        self.entries.get(self.applied - 1)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.applied = 0;
    }
}
