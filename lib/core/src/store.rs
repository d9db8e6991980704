//! Per-tab mutable graph state.
//!
//! Every structural mutation runs through [`GraphStore::commit`], which hands
//! out a [`Draft`] recording each edit and pushes the resulting patch onto
//! the history. Node and edge lists live behind `Arc`s and are copied on
//! write, so a [`GraphSnapshot`] taken before a commit never changes.

use crate::deletion::descendants_of;
use crate::graph::{Edge, EdgeId, Node, NodeId, NodePatch, Position};
use crate::history::{Edit, History, HistoryEntry, Patch};
use crate::layout::LayoutConfig;
use crate::occupancy::OccupancyGrid;
use crate::{Error, Result};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub max_history: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_history: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreState {
    Empty,
    Populated,
}

/// Immutable view of the graph at one point in time.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub nodes: Arc<Vec<Node>>,
    pub edges: Arc<Vec<Edge>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub nodes_added: usize,
    pub edges_added: usize,
    pub nodes_linked: usize,
}

impl MergeSummary {
    pub fn is_empty(&self) -> bool {
        self.nodes_added == 0 && self.edges_added == 0 && self.nodes_linked == 0
    }
}

/// Node whose cell was released at drag start.
#[derive(Debug, Clone)]
struct LiftedNode {
    id: NodeId,
    cell: Position,
}

/// Recording view handed to [`GraphStore::commit`].
pub struct Draft<'a> {
    nodes: &'a mut Vec<Node>,
    edges: &'a mut Vec<Edge>,
    occupied: &'a mut OccupancyGrid,
    edits: Vec<Edit>,
}

impl<'a> Draft<'a> {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes[..]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges[..]
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index(id).is_some()
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.id == id)
    }

    /// Appends a node unless its id exists. A conflicting cell is claimed anyway.
    pub fn insert_node(&mut self, node: Node) -> bool {
        if self.contains_node(&node.id) {
            debug!("Node {} already present, skipping", node.id);
            return false;
        }
        match node.position {
            Some(position) => self.claim(position, &node.id),
            None => debug!("Node {} has no position; occupancy untouched", node.id),
        }
        let index = self.nodes.len();
        self.nodes.push(node.clone());
        self.edits.push(Edit::InsertNode { index, node });
        true
    }

    pub fn replace_node(&mut self, index: usize, after: Node) {
        let Some(before) = self.nodes.get(index).cloned() else {
            warn!("No node at index {} to replace", index);
            return;
        };
        if before.position != after.position {
            if let Some(old) = before.position {
                self.free(old, index);
            }
            if let Some(new) = after.position {
                self.claim(new, &after.id);
            }
        }
        self.nodes[index] = after.clone();
        self.edits.push(Edit::ReplaceNode { index, before, after });
    }

    pub fn remove_node(&mut self, index: usize) -> Option<Node> {
        if index >= self.nodes.len() {
            return None;
        }
        if let Some(position) = self.nodes[index].position {
            self.free(position, index);
        }
        let node = self.nodes.remove(index);
        self.edits.push(Edit::RemoveNode {
            index,
            node: node.clone(),
        });
        Some(node)
    }

    pub fn insert_edge(&mut self, edge: Edge) -> bool {
        if self.contains_edge(&edge.id) {
            return false;
        }
        let index = self.edges.len();
        self.edges.push(edge.clone());
        self.edits.push(Edit::InsertEdge { index, edge });
        true
    }

    pub fn remove_edge(&mut self, index: usize) -> Option<Edge> {
        if index >= self.edges.len() {
            return None;
        }
        let edge = self.edges.remove(index);
        self.edits.push(Edit::RemoveEdge {
            index,
            edge: edge.clone(),
        });
        Some(edge)
    }

    fn claim(&mut self, position: Position, id: &str) {
        if !self.occupied.reserve(position) {
            warn!("Position {} already occupied; placing node {} anyway", position, id);
        }
    }

    /// Releases a cell unless another node still sits on it.
    fn free(&mut self, position: Position, owner: usize) {
        let shared = self
            .nodes
            .iter()
            .enumerate()
            .any(|(i, n)| i != owner && n.position == Some(position));
        if !shared {
            self.occupied.release(position);
        }
    }
}

pub struct GraphStore {
    config: StoreConfig,
    nodes: Arc<Vec<Node>>,
    edges: Arc<Vec<Edge>>,
    occupied: OccupancyGrid,
    history: History,
    lifted: Option<LiftedNode>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl GraphStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            nodes: Arc::new(Vec::new()),
            edges: Arc::new(Vec::new()),
            occupied: OccupancyGrid::new(),
            history: History::new(config.max_history),
            lifted: None,
        }
    }

    /// Rebuilds a store from saved nodes and edges, with empty history.
    pub fn from_parts(config: StoreConfig, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut store = Self::new(config);
        store.nodes = Arc::new(nodes);
        store.edges = Arc::new(edges);
        store.resync_occupied();
        store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: Arc::clone(&self.nodes),
            edges: Arc::clone(&self.edges),
        }
    }

    pub fn occupied(&self) -> &OccupancyGrid {
        &self.occupied
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.id == id)
    }

    pub fn state(&self) -> StoreState {
        if self.nodes.is_empty() {
            StoreState::Empty
        } else {
            StoreState::Populated
        }
    }

    /// Id of the node currently lifted by a drag.
    pub fn dragging(&self) -> Option<&str> {
        self.lifted.as_ref().map(|l| l.id.as_str())
    }

    /// Occupancy derived from node positions.
    pub fn derived_occupancy(&self) -> OccupancyGrid {
        OccupancyGrid::from_positions(self.nodes.iter().filter_map(|n| n.position))
    }

    /// Runs `f` against a recording draft and pushes the edits as one history entry.
    ///
    /// An in-flight drag is cancelled first. Nothing is recorded when `f`
    /// makes no edits.
    pub fn commit<R>(&mut self, label: &str, f: impl FnOnce(&mut Draft<'_>) -> R) -> R {
        self.cancel_drag();
        let mut draft = Draft {
            nodes: Arc::make_mut(&mut self.nodes),
            edges: Arc::make_mut(&mut self.edges),
            occupied: &mut self.occupied,
            edits: Vec::new(),
        };
        let out = f(&mut draft);
        let edits = draft.edits;
        if !edits.is_empty() {
            debug!("Committing '{}' with {} edits", label, edits.len());
            self.history.push(HistoryEntry::new(label, Patch::new(edits)));
        }
        out
    }

    /// Adds nodes, skipping ids that already exist. Returns how many were added.
    pub fn add_nodes(&mut self, nodes: Vec<Node>) -> usize {
        self.commit("add nodes", |draft| {
            nodes.into_iter().filter(|n| draft.insert_node(n.clone())).count()
        })
    }

    /// Applies partial updates. Unknown ids are skipped with a warning.
    pub fn update_nodes(&mut self, updates: Vec<(NodeId, NodePatch)>) -> usize {
        self.commit("update nodes", |draft| {
            let mut updated = 0;
            for (id, patch) in updates {
                let Some(index) = draft.node_index(&id) else {
                    warn!("Cannot update missing node {}", id);
                    continue;
                };
                let after = patch.apply(&draft.nodes()[index]);
                if after != draft.nodes()[index] {
                    draft.replace_node(index, after);
                    updated += 1;
                }
            }
            updated
        })
    }

    pub fn add_edges(&mut self, edges: Vec<Edge>) -> usize {
        self.commit("add edges", |draft| {
            edges.into_iter().filter(|e| draft.insert_edge(e.clone())).count()
        })
    }

    pub fn remove_edges_by_ids(&mut self, ids: &[EdgeId]) -> usize {
        let ids: AHashSet<&str> = ids.iter().map(String::as_str).collect();
        self.commit("remove edges", |draft| {
            let doomed: Vec<usize> = draft
                .edges()
                .iter()
                .enumerate()
                .filter(|(_, e)| ids.contains(e.id.as_str()))
                .map(|(i, _)| i)
                .collect();
            for &index in doomed.iter().rev() {
                draft.remove_edge(index);
            }
            doomed.len()
        })
    }

    /// Removes `start` and its descendants, every edge touching them, and
    /// their ids from surviving nodes' children. Returns the removed ids.
    pub fn remove_nodes_recursively(&mut self, start: &str) -> Vec<NodeId> {
        let doomed = descendants_of(start, &self.nodes);
        if doomed.is_empty() {
            warn!("Cannot delete missing node {}", start);
            return Vec::new();
        }

        self.commit("delete nodes", |draft| {
            let edge_hits: Vec<usize> = draft
                .edges()
                .iter()
                .enumerate()
                .filter(|(_, e)| doomed.contains(&e.source) || doomed.contains(&e.target))
                .map(|(i, _)| i)
                .collect();
            for &index in edge_hits.iter().rev() {
                draft.remove_edge(index);
            }

            let node_hits: Vec<usize> = draft
                .nodes()
                .iter()
                .enumerate()
                .filter(|(_, n)| doomed.contains(&n.id))
                .map(|(i, _)| i)
                .collect();
            let mut removed = Vec::with_capacity(node_hits.len());
            for &index in node_hits.iter().rev() {
                if let Some(node) = draft.remove_node(index) {
                    removed.push(node.id);
                }
            }
            removed.reverse();

            let orphaned: Vec<(usize, Node)> = draft
                .nodes()
                .iter()
                .enumerate()
                .filter(|(_, n)| n.child_nodes.iter().any(|c| doomed.contains(c)))
                .map(|(i, n)| {
                    let mut next = n.clone();
                    next.child_nodes.retain(|c| !doomed.contains(c));
                    (i, next)
                })
                .collect();
            for (index, next) in orphaned {
                draft.replace_node(index, next);
            }
            removed
        })
    }

    /// Inserts new nodes, links new children into existing nodes, then adds
    /// edges whose endpoints both exist. One history entry.
    ///
    /// Ids already present are filtered against the state at commit time.
    pub fn merge(&mut self, label: &str, nodes: Vec<Node>, edges: Vec<Edge>) -> MergeSummary {
        self.commit(label, |draft| {
            let mut summary = MergeSummary::default();
            let mut links = Vec::new();
            for node in nodes {
                if draft.contains_node(&node.id) {
                    if !node.child_nodes.is_empty() {
                        links.push(node);
                    }
                } else if draft.insert_node(node) {
                    summary.nodes_added += 1;
                }
            }

            for incoming in links {
                let Some(index) = draft.node_index(&incoming.id) else {
                    continue;
                };
                let mut next = draft.nodes()[index].clone();
                let mut changed = false;
                for child in &incoming.child_nodes {
                    if draft.contains_node(child) && next.add_child(child) {
                        changed = true;
                    }
                }
                if changed {
                    draft.replace_node(index, next);
                    summary.nodes_linked += 1;
                }
            }

            for edge in edges {
                if !draft.contains_node(&edge.source) || !draft.contains_node(&edge.target) {
                    debug!("Dropping edge {} with a missing endpoint", edge.id);
                    continue;
                }
                if draft.insert_edge(edge) {
                    summary.edges_added += 1;
                }
            }
            summary
        })
    }

    /// Frees a cell without touching history.
    pub fn remove_occupied_position(&mut self, position: Position) -> bool {
        self.occupied.release(position)
    }

    /// Lifts a node: its cell is released until the drag ends or is cancelled.
    pub fn begin_drag(&mut self, id: &str) -> Result<Position> {
        self.cancel_drag();
        let node = self.node(id).ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        let cell = node.position.ok_or_else(|| Error::MissingPosition(id.to_string()))?;
        self.remove_occupied_position(cell);
        self.lifted = Some(LiftedNode {
            id: id.to_string(),
            cell,
        });
        Ok(cell)
    }

    /// Snaps a dropped node to the closest free grid cell and records the move.
    /// A non-finite drop point is rejected and leaves any drag in flight.
    pub fn end_drag(&mut self, id: &str, drop_x: f64, drop_y: f64, layout: &LayoutConfig) -> Result<Position> {
        if !drop_x.is_finite() || !drop_y.is_finite() {
            return Err(Error::InvalidInput(format!(
                "drop point ({}, {}) is not finite",
                drop_x, drop_y
            )));
        }
        match self.lifted.take() {
            Some(lifted) if lifted.id == id => {}
            Some(other) => {
                self.restore_lifted(other);
                self.lift_in_place(id);
            }
            None => self.lift_in_place(id),
        }

        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| Error::NodeNotFound(id.to_string()))?;
        let current = self.nodes[index].position;
        let target = self.occupied.closest_free_grid_cell(
            drop_x,
            drop_y,
            layout.horizontal_gap,
            layout.vertical_gap,
        );

        if current == Some(target) {
            self.occupied.reserve(target);
            return Ok(target);
        }
        self.commit("move node", |draft| {
            let after = NodePatch::position(target).apply(&draft.nodes()[index]);
            draft.replace_node(index, after);
        });
        Ok(target)
    }

    /// Puts a lifted node's cell back. Returns whether a drag was in flight.
    pub fn cancel_drag(&mut self) -> bool {
        match self.lifted.take() {
            Some(lifted) => {
                debug!("Cancelling drag of {}", lifted.id);
                self.restore_lifted(lifted);
                true
            }
            None => false,
        }
    }

    pub fn undo(&mut self) -> bool {
        self.cancel_drag();
        let Some(entry) = self.history.step_back() else {
            return false;
        };
        debug!("Undoing '{}'", entry.label);
        entry
            .inverse
            .apply(Arc::make_mut(&mut self.nodes), Arc::make_mut(&mut self.edges));
        self.resync_occupied();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_drag();
        let Some(entry) = self.history.step_forward() else {
            return false;
        };
        debug!("Redoing '{}'", entry.label);
        entry
            .forward
            .apply(Arc::make_mut(&mut self.nodes), Arc::make_mut(&mut self.edges));
        self.resync_occupied();
        true
    }

    /// Drops all nodes, edges, occupancy and history.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    fn resync_occupied(&mut self) {
        self.occupied = self.derived_occupancy();
    }

    fn restore_lifted(&mut self, lifted: LiftedNode) {
        if self.node(&lifted.id).and_then(|n| n.position) == Some(lifted.cell) {
            self.occupied.reserve(lifted.cell);
        }
    }

    fn lift_in_place(&mut self, id: &str) {
        if let Some(cell) = self.node(id).and_then(|n| n.position) {
            self.occupied.release(cell);
        }
    }
}
