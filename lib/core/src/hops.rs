//! Attaches a denylist trace to a graph.
//!
//! Starting at a root node, the hop whose wallet is the current frontier is
//! consumed and turned into `prev → tx → frontier`; the previous address
//! becomes the new frontier. Every hop sharing the consumed transaction is
//! dropped from the working set, so malformed or cyclic traces terminate.

use crate::factory::{edge_id, make_address_node, make_edge, make_transaction_node};
use crate::graph::Subgraph;
use crate::network::Network;
use crate::records::{AddressInfo, Hop};
use crate::{Error, Result};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HopSummary {
    pub hops_consumed: usize,
    pub nodes_added: usize,
    pub edges_added: usize,
}

pub fn expand_hops(graph: &mut Subgraph, root: &str, hops: &[Hop], network: Network) -> Result<HopSummary> {
    if !graph.contains_node(root) {
        return Err(Error::NodeNotFound(root.to_string()));
    }

    let mut remaining: Vec<&Hop> = hops.iter().filter(|h| h.is_complete()).collect();
    let mut frontier = root.to_string();
    let mut summary = HopSummary::default();
    let no_info = AddressInfo::default();

    while !remaining.is_empty() {
        let Some(at) = remaining
            .iter()
            .position(|h| h.wallet_address.as_deref() == Some(frontier.as_str()))
        else {
            debug!("Hop chain ends at {}", frontier);
            break;
        };
        let hop = remaining.remove(at);
        let (Some(tx), Some(prev)) = (hop.tx_hash.as_deref(), hop.prev_address.as_deref()) else {
            continue;
        };
        remaining.retain(|h| h.tx_hash.as_deref() != Some(tx));
        summary.hops_consumed += 1;

        if graph.insert_node(make_transaction_node(
            tx,
            false,
            hop.block,
            hop.value.unwrap_or_default(),
            hop.timestamp,
            Vec::new(),
            Some(frontier.as_str()),
        )) {
            summary.nodes_added += 1;
            if let Some(node) = graph.node_mut(&frontier) {
                node.add_child(tx);
            }
        }

        let info = hop.address_info.as_ref().unwrap_or(&no_info);
        if graph.insert_node(make_address_node(prev, false, Some(tx), network, info)) {
            summary.nodes_added += 1;
            if let Some(node) = graph.node_mut(tx) {
                node.add_child(prev);
            }
        }

        let value = hop.value.unwrap_or_default().abs();
        for (source, target) in [(prev, tx), (tx, frontier.as_str())] {
            if graph.insert_edge(make_edge(edge_id(source, target, None), source, target, value, hop.timestamp, network)) {
                summary.edges_added += 1;
            }
        }

        frontier = prev.to_string();
    }

    Ok(summary)
}
