//! Turns one graph data response into a deduplicated node/edge set.
//!
//! One strategy per [`NetworkFamily`]: UTXO responses model the transaction
//! as its own node, account responses collapse it into the edge.

use crate::factory::{edge_id, make_address_node, make_edge, make_main_node, make_transaction_node};
use crate::graph::{Amount, Subgraph};
use crate::network::{Network, NetworkFamily};
use crate::records::{
    AddressInfo, AddressMapEntry, Direction, GraphPayload, RelationType, TransactionMapEntry,
};
use crate::{Error, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Dispatches on the network family. A payload of the wrong shape is rejected.
pub fn normalize(
    network: Network,
    main: &str,
    main_info: &AddressInfo,
    payload: &GraphPayload,
    direction: Direction,
) -> Result<Subgraph> {
    match (network.family(), payload) {
        (NetworkFamily::Utxo, GraphPayload::Utxo(map)) => {
            Ok(normalize_btc(main, main_info, &map.transaction_list, direction))
        }
        (NetworkFamily::Account, GraphPayload::Account(map)) => Ok(normalize_non_btc(
            main,
            main_info,
            &map.address_list,
            network,
            direction,
        )),
        _ => Err(Error::InvalidInput(format!(
            "graph payload does not match network {}",
            network
        ))),
    }
}

/// Running net flow between the main address and one transaction.
struct MainTxFlow {
    tx_id: String,
    net: Amount,
    timestamp: Option<i64>,
}

/// main → tx → address for outgoing flow, address → tx → main for incoming.
///
/// The main↔tx edge is keyed by the transaction alone; values of all entries
/// touching the same transaction are summed and the edge direction follows
/// the sign of the total.
pub fn normalize_btc(
    main: &str,
    main_info: &AddressInfo,
    entries: &[TransactionMapEntry],
    direction: Direction,
) -> Subgraph {
    let mut graph = Subgraph::new();
    graph.insert_node(make_main_node(main, Network::Btc, main_info));

    let mut flows: Vec<MainTxFlow> = Vec::new();
    let mut flow_index: AHashMap<String, usize> = AHashMap::new();
    let mut tx_edges = Vec::new();

    for entry in entries {
        let (Some(tx), Some(addr)) = (entry.transaction.as_ref(), entry.address.as_ref()) else {
            warn!("Skipping incomplete transaction entry: missing transaction or address");
            continue;
        };
        let (Some(tx_id), Some(related)) = (tx.tx_id.as_deref(), addr.addr.as_deref()) else {
            warn!("Skipping incomplete transaction entry: missing tx id or address");
            continue;
        };

        let mother_value = entry.mother_value.unwrap_or_default();
        let is_right = mother_value > Amount::ZERO;
        let allowed = if is_right {
            direction.allows_right()
        } else {
            direction.allows_left()
        };
        if !allowed {
            continue;
        }

        let slot = *flow_index.entry(tx_id.to_string()).or_insert_with(|| {
            flows.push(MainTxFlow {
                tx_id: tx_id.to_string(),
                net: Amount::ZERO,
                timestamp: None,
            });
            flows.len() - 1
        });
        flows[slot].net += mother_value;
        flows[slot].timestamp = tx.timestamp;

        graph.insert_node(make_transaction_node(
            tx_id,
            is_right,
            tx.block,
            tx.value.unwrap_or_default(),
            tx.timestamp,
            Vec::new(),
            Some(main),
        ));
        if related != main {
            graph.insert_node(make_address_node(
                related,
                is_right,
                Some(tx_id),
                Network::Btc,
                &addr.info(),
            ));
        }

        let child_value = entry.child_value.unwrap_or_default().abs();
        let stamp = tx.timestamp.map(|t| t.to_string()).unwrap_or_default();
        let (source, target) = if is_right { (tx_id, related) } else { (related, tx_id) };
        tx_edges.push(make_edge(
            edge_id(source, target, Some(&stamp)),
            source,
            target,
            child_value,
            tx.timestamp,
            Network::Btc,
        ));
    }

    for flow in flows {
        if flow.net.is_zero() {
            debug!("Dropping zero net flow edge for tx {}", flow.tx_id);
            continue;
        }
        let (source, target) = if flow.net > Amount::ZERO {
            (main, flow.tx_id.as_str())
        } else {
            (flow.tx_id.as_str(), main)
        };
        graph.insert_edge(make_edge(
            format!("{}_{}", main, flow.tx_id),
            source,
            target,
            flow.net.abs(),
            flow.timestamp,
            Network::Btc,
        ));
    }
    for edge in tx_edges {
        graph.insert_edge(edge);
    }

    graph.link_children();
    graph
}

/// main → address for `OUT`, address → main for `IN`. Entries naming the main
/// address itself are skipped.
pub fn normalize_non_btc(
    main: &str,
    main_info: &AddressInfo,
    entries: &[AddressMapEntry],
    network: Network,
    direction: Direction,
) -> Subgraph {
    let mut graph = Subgraph::new();
    graph.insert_node(make_main_node(main, network, main_info));

    for (index, entry) in entries.iter().enumerate() {
        let (Some(addr), Some(relation)) = (entry.address.as_ref(), entry.relation_type) else {
            warn!("Skipping incomplete address entry {}", index);
            continue;
        };
        let Some(related) = addr.addr.as_deref() else {
            warn!("Skipping address entry {} without address", index);
            continue;
        };
        if related == main {
            continue;
        }

        let is_right = relation == RelationType::Out;
        let allowed = if is_right {
            direction.allows_right()
        } else {
            direction.allows_left()
        };
        if !allowed {
            continue;
        }

        graph.insert_node(make_address_node(related, is_right, Some(main), network, &addr.info()));

        let tx = entry.transaction.as_ref();
        let index_tag = index.to_string();
        let disambiguator = tx.and_then(|t| t.tx_id.as_deref()).unwrap_or(&index_tag);
        let (source, target) = if is_right { (main, related) } else { (related, main) };
        graph.insert_edge(make_edge(
            edge_id(source, target, Some(disambiguator)),
            source,
            target,
            entry.relation_value.unwrap_or_default().abs(),
            tx.and_then(|t| t.timestamp),
            network,
        ));
    }

    graph.link_children();
    graph
}

/// Net amount exchanged with one counterparty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetFlow {
    pub address: String,
    /// Positive when the main address sent more than it received.
    pub net: Amount,
}

/// Sums relation values per counterparty, `OUT` positive and `IN` negative.
/// Order follows first appearance.
pub fn net_flow_by_address(entries: &[AddressMapEntry]) -> Vec<NetFlow> {
    let mut flows: Vec<NetFlow> = Vec::new();
    let mut index: AHashMap<&str, usize> = AHashMap::new();
    for entry in entries {
        let (Some(address), Some(relation)) = (
            entry.address.as_ref().and_then(|a| a.addr.as_deref()),
            entry.relation_type,
        ) else {
            continue;
        };
        let value = entry.relation_value.unwrap_or_default().abs();
        let signed = match relation {
            RelationType::Out => value,
            RelationType::In => -value,
        };
        let slot = *index.entry(address).or_insert_with(|| {
            flows.push(NetFlow {
                address: address.to_string(),
                net: Amount::ZERO,
            });
            flows.len() - 1
        });
        flows[slot].net += signed;
    }
    flows
}
