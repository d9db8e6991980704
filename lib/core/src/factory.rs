//! Builders for well-formed nodes and edges.

use crate::graph::{
    AddressAttributes, AddressClass, Amount, Edge, Node, NodeAttributes, NodeId, NodeKind,
    TransactionAttributes,
};
use crate::network::Network;
use crate::records::AddressInfo;

/// Whitelisted wins over Blacklisted when both flags are set.
pub fn classify(info: &AddressInfo) -> NodeKind {
    let class = if info.is_whitelisted() {
        AddressClass::Whitelisted
    } else if info.is_blacklisted() {
        AddressClass::Blacklisted
    } else {
        AddressClass::Plain
    };
    NodeKind::Address(class)
}

pub fn make_address_node(
    address: &str,
    is_right: bool,
    mother: Option<&str>,
    network: Network,
    info: &AddressInfo,
) -> Node {
    Node {
        id: address.to_string(),
        kind: classify(info),
        position: None,
        is_right,
        mother_node: mother.map(str::to_string),
        child_nodes: Vec::new(),
        attributes: NodeAttributes::Address(AddressAttributes {
            address: address.to_string(),
            network,
            whitelisted: info.is_whitelisted(),
            blacklisted: info.is_blacklisted(),
            is_main: false,
            info: info.extra.clone(),
        }),
    }
}

/// Root node of a tab: the investigated address itself.
pub fn make_main_node(address: &str, network: Network, info: &AddressInfo) -> Node {
    let mut node = make_address_node(address, false, None, network, info);
    if let NodeAttributes::Address(attrs) = &mut node.attributes {
        attrs.is_main = true;
    }
    node
}

pub fn make_transaction_node(
    tx_id: &str,
    is_right: bool,
    block: Option<u64>,
    value: Amount,
    timestamp: Option<i64>,
    child_ids: Vec<NodeId>,
    mother: Option<&str>,
) -> Node {
    let mut node = Node {
        id: tx_id.to_string(),
        kind: NodeKind::Transaction,
        position: None,
        is_right,
        mother_node: mother.map(str::to_string),
        child_nodes: Vec::with_capacity(child_ids.len()),
        attributes: NodeAttributes::Transaction(TransactionAttributes {
            tx_id: tx_id.to_string(),
            block,
            value,
            timestamp,
        }),
    };
    for child in &child_ids {
        node.add_child(child);
    }
    node
}

pub fn make_edge(
    id: impl Into<String>,
    source: &str,
    target: &str,
    value: Amount,
    timestamp: Option<i64>,
    token: Network,
) -> Edge {
    Edge {
        id: id.into(),
        source: source.to_string(),
        target: target.to_string(),
        value,
        timestamp,
        token,
    }
}

/// `source-target-disambiguator`, or `source-target` when there is none.
pub fn edge_id(source: &str, target: &str, disambiguator: Option<&str>) -> String {
    match disambiguator {
        Some(extra) => format!("{}-{}-{}", source, target, extra),
        None => format!("{}-{}", source, target),
    }
}
