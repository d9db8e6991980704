// Transaction graph model - nodes, edges and grid positions
use crate::network::Network;
use ahash::AHashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type NodeId = String;
pub type EdgeId = String;

/// Raw transfer amount in the network's minor unit.
pub type Amount = Decimal;

/// Integer grid cell occupied by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    #[inline]
    #[must_use]
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressClass {
    Whitelisted,
    Blacklisted,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "class")]
pub enum NodeKind {
    Address(AddressClass),
    Transaction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressAttributes {
    pub address: String,
    pub network: Network,
    pub whitelisted: bool,
    pub blacklisted: bool,
    pub is_main: bool,
    /// Remaining fields reported by the address info lookup.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub info: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAttributes {
    pub tx_id: String,
    pub block: Option<u64>,
    pub value: Amount,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeAttributes {
    Address(AddressAttributes),
    Transaction(TransactionAttributes),
}

/// A graph vertex: an address or a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: Option<Position>,
    pub is_right: bool,
    pub mother_node: Option<NodeId>,
    #[serde(default)]
    pub child_nodes: Vec<NodeId>,
    pub attributes: NodeAttributes,
}

impl Node {
    #[inline]
    #[must_use]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_mother(mut self, mother: impl Into<NodeId>) -> Self {
        self.mother_node = Some(mother.into());
        self
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self.kind, NodeKind::Transaction)
    }

    pub fn is_address(&self) -> bool {
        matches!(self.kind, NodeKind::Address(_))
    }

    pub fn address(&self) -> Option<&AddressAttributes> {
        match &self.attributes {
            NodeAttributes::Address(attrs) => Some(attrs),
            NodeAttributes::Transaction(_) => None,
        }
    }

    /// Appends a child id unless already present. Returns whether it was added.
    pub fn add_child(&mut self, child: &str) -> bool {
        if child == self.id || self.child_nodes.iter().any(|c| c == child) {
            return false;
        }
        self.child_nodes.push(child.to_string());
        true
    }
}

/// Partial update applied by `GraphStore::update_nodes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    /// `Some(None)` clears the position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Option<Position>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_right: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_nodes: Option<Vec<NodeId>>,
    /// Merged into an address node's info map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Map<String, serde_json::Value>>,
}

impl NodePatch {
    #[must_use]
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(Some(position)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.is_right.is_none()
            && self.child_nodes.is_none()
            && self.info.is_none()
    }

    /// Returns a patched copy; the input node is left untouched.
    #[must_use]
    pub fn apply(&self, node: &Node) -> Node {
        let mut next = node.clone();
        if let Some(position) = self.position {
            next.position = position;
        }
        if let Some(is_right) = self.is_right {
            next.is_right = is_right;
        }
        if let Some(children) = &self.child_nodes {
            next.child_nodes.clear();
            for child in children {
                next.add_child(child);
            }
        }
        if let (Some(info), NodeAttributes::Address(attrs)) = (&self.info, &mut next.attributes) {
            for (key, value) in info {
                attrs.info.insert(key.clone(), value.clone());
            }
        }
        next
    }
}

/// Directed relation between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub value: Amount,
    pub timestamp: Option<i64>,
    pub token: Network,
}

impl Edge {
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

/// Deduplicated node/edge set produced by normalization and hop expansion.
///
/// Insertion order is preserved; lookups go through an id index.
#[derive(Debug, Clone, Default)]
pub struct Subgraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: AHashMap<NodeId, usize>,
    edge_index: AHashMap<EdgeId, usize>,
}

impl Subgraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edge_index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        match self.node_index.get(id) {
            Some(&i) => self.nodes.get_mut(i),
            None => None,
        }
    }

    /// Inserts a node unless its id is already present. Returns whether it was inserted.
    pub fn insert_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Inserts an edge unless its id is already present. Returns whether it was inserted.
    pub fn insert_edge(&mut self, edge: Edge) -> bool {
        if self.edge_index.contains_key(&edge.id) {
            return false;
        }
        self.edge_index.insert(edge.id.clone(), self.edges.len());
        self.edges.push(edge);
        true
    }

    /// Post-pass: every node bearing a mother inside this set is appended to
    /// that mother's children.
    pub fn link_children(&mut self) {
        let links: Vec<(usize, NodeId)> = self
            .nodes
            .iter()
            .filter_map(|node| {
                let mother = node.mother_node.as_ref()?;
                let &index = self.node_index.get(mother)?;
                Some((index, node.id.clone()))
            })
            .collect();
        for (index, child) in links {
            self.nodes[index].add_child(&child);
        }
    }

    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes, self.edges)
    }
}
