//! Orchestrates fetch → normalize → layout → commit for each tab.
//!
//! Network calls run without holding any tab lock. Results are filtered
//! against the tab's state at commit time, so overlapping expansions never
//! insert duplicates.

use crate::client::{GraphDataService, QueryParams};
use ahash::AHashSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use txmap_core::{
    expand_hops, factory, net_flow_by_address, normalize, AddressInfo, Amount, Direction,
    Error, GraphPayload, LayoutConfig, LayoutEngine, MergeSummary, NetFlow, Network, Node,
    NodeId, Position, Result, Subgraph, TransactionDetail,
};
use txmap_storage::{Tab, TabHandle, TabManager};

pub const NO_DATA_NOTICE: &str = "no matching transactions";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionReport {
    #[serde(flatten)]
    pub summary: MergeSummary,
    pub denylisted: bool,
    pub hops_consumed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub net_flow: Vec<NetFlow>,
}

/// Result of a graph-changing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome {
    Applied(ExpansionReport),
    NoData { notice: String },
    /// The tab or node went away while the request was in flight.
    Stale,
}

/// A user-added address next to an existing node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    pub address: String,
    pub is_right: bool,
    #[serde(default)]
    pub info: AddressInfo,
    #[serde(default)]
    pub value: Amount,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

pub struct Explorer {
    service: Arc<dyn GraphDataService>,
    tabs: Arc<TabManager>,
    layout: LayoutConfig,
}

impl Explorer {
    pub fn new(service: Arc<dyn GraphDataService>, tabs: Arc<TabManager>, layout: LayoutConfig) -> Self {
        Self { service, tabs, layout }
    }

    pub fn tabs(&self) -> &Arc<TabManager> {
        &self.tabs
    }

    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Opens (or re-activates) the tab for `address` and expands it from the origin.
    pub async fn search(&self, network: Network, address: &str, params: &QueryParams) -> Result<Outcome> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::InvalidInput("search address must not be empty".to_string()));
        }
        let handle = self.tabs.create_tab(address, network)?;
        self.tabs.set_active(address)?;
        self.tabs.record_search(address);
        info!("Searching {} on {}", address, network);

        let existing = handle.read().store().node(address).cloned();
        let anchor = existing.unwrap_or_else(|| {
            factory::make_main_node(address, network, &AddressInfo::default()).with_position(Position::ORIGIN)
        });
        let params = params.clone().with_direction(Direction::All);
        self.expand_from(&handle, network, anchor, &params, true).await
    }

    /// Fetches and attaches the neighbourhood of an existing address node.
    pub async fn expand(&self, tab_id: &str, node_id: &str, params: &QueryParams) -> Result<Outcome> {
        let Some(handle) = self.tabs.get_tab(tab_id) else {
            warn!("Expand requested for missing tab {}", tab_id);
            return Ok(Outcome::Stale);
        };
        let (network, source) = {
            let tab = handle.read();
            (tab.network(), tab.store().node(node_id).cloned())
        };
        let Some(source) = source else {
            warn!("Expand requested for missing node {} in tab {}", node_id, tab_id);
            return Ok(Outcome::Stale);
        };
        if source.is_transaction() {
            return Err(Error::InvalidInput(format!("{} is a transaction; only addresses expand", node_id)));
        }
        self.expand_from(&handle, network, source, params, false).await
    }

    /// `seeding` lets the anchor be absent from the store (search).
    async fn expand_from(
        &self,
        handle: &TabHandle,
        network: Network,
        anchor: Node,
        params: &QueryParams,
        seeding: bool,
    ) -> Result<Outcome> {
        if anchor.position.is_none() {
            return Err(Error::MissingPosition(anchor.id.clone()));
        }
        let address = anchor.id.clone();

        let (payload, info, denylist) = tokio::try_join!(
            self.service.transaction_map(network, &address, params),
            self.service.address_info(network, &address),
            self.service.denylist_info(&address),
        )?;

        let mut subgraph = normalize(network, &address, &info, &payload, params.direction)?;
        let mut hops_consumed = 0;
        if let Some(hops) = denylist.hops() {
            hops_consumed = expand_hops(&mut subgraph, &address, hops, network)?.hops_consumed;
        }
        let net_flow = match &payload {
            GraphPayload::Account(map) => net_flow_by_address(&map.address_list),
            GraphPayload::Utxo(_) => Vec::new(),
        };
        let fetched_edges = subgraph.edges().len();

        let mut tab = handle.write();
        if !seeding && !tab.store().contains_node(&address) {
            warn!("Node {} was removed while its expansion was in flight", address);
            return Ok(Outcome::Stale);
        }
        let summary = self.commit_subgraph(&mut tab, subgraph, &anchor);

        if fetched_edges == 0 || (summary.edges_added == 0 && summary.nodes_added == 0) {
            info!("Expansion of {} found nothing new", address);
            return Ok(Outcome::NoData {
                notice: NO_DATA_NOTICE.to_string(),
            });
        }
        info!(
            "Expanded {}: {} nodes, {} edges",
            address, summary.nodes_added, summary.edges_added
        );
        Ok(Outcome::Applied(ExpansionReport {
            summary,
            denylisted: denylist.is_hit(),
            hops_consumed,
            net_flow,
        }))
    }

    /// Lays out what is new against the current grid and commits once.
    ///
    /// Child links are only kept towards new nodes, so deleting a node never
    /// reaches into nodes an earlier expansion owns.
    ///
    /// The anchor is re-read from the tab, so a node moved while its fetch was
    /// in flight keeps its new cell. `fallback` covers a seed that is not on
    /// the graph yet.
    fn commit_subgraph(&self, tab: &mut Tab, subgraph: Subgraph, fallback: &Node) -> MergeSummary {
        let store = tab.store_mut();
        store.cancel_drag();
        let anchor = match store.node(&fallback.id) {
            Some(current) if current.position.is_some() => current.clone(),
            _ => fallback.clone(),
        };

        let (nodes, edges) = subgraph.into_parts();
        let fresh_ids: AHashSet<NodeId> = nodes
            .iter()
            .filter(|n| !store.contains_node(&n.id))
            .map(|n| n.id.clone())
            .collect();
        let (fresh, existing): (Vec<Node>, Vec<Node>) = nodes
            .into_iter()
            .map(|mut n| {
                n.child_nodes.retain(|c| fresh_ids.contains(c));
                n
            })
            .partition(|n| fresh_ids.contains(&n.id));

        let mut grid = store.occupied().clone();
        let known: Vec<(NodeId, Position)> = store
            .nodes()
            .iter()
            .filter_map(|n| n.position.map(|p| (n.id.clone(), p)))
            .collect();
        let mut merged = LayoutEngine::new(self.layout)
            .with_known_positions(known)
            .layout(fresh, &anchor, &mut grid);
        merged.extend(existing);
        store.merge("expand", merged, edges)
    }

    /// Adds one address next to `source_id`, linked by a single edge.
    pub fn add_node(&self, tab_id: &str, source_id: &str, request: NewNode) -> Result<Outcome> {
        let address = request.address.trim();
        if address.is_empty() {
            return Err(Error::InvalidInput("address must not be empty".to_string()));
        }
        let Some(handle) = self.tabs.get_tab(tab_id) else {
            warn!("Add requested for missing tab {}", tab_id);
            return Ok(Outcome::Stale);
        };
        let mut tab = handle.write();
        let network = tab.network();
        let store = tab.store_mut();
        store.cancel_drag();

        let Some(source) = store.node(source_id).cloned() else {
            warn!("Add requested next to missing node {}", source_id);
            return Ok(Outcome::Stale);
        };
        if store.contains_node(address) {
            warn!("Node {} already exists; not adding", address);
            return Ok(Outcome::NoData {
                notice: format!("{} is already on the graph", address),
            });
        }

        let mut grid = store.occupied().clone();
        let position = LayoutEngine::new(self.layout)
            .place_next_to(&source, request.is_right, &mut grid)
            .ok_or_else(|| Error::MissingPosition(source_id.to_string()))?;
        let node = factory::make_address_node(address, request.is_right, Some(source_id), network, &request.info)
            .with_position(position);
        let (from, to) = if request.is_right { (source_id, address) } else { (address, source_id) };
        let edge = factory::make_edge(
            factory::edge_id(from, to, None),
            from,
            to,
            request.value.abs(),
            request.timestamp,
            network,
        );
        let mut link = source;
        link.child_nodes = vec![address.to_string()];

        let summary = store.merge("add node", vec![node, link], vec![edge]);
        Ok(Outcome::Applied(ExpansionReport {
            summary,
            denylisted: false,
            hops_consumed: 0,
            net_flow: Vec::new(),
        }))
    }

    pub fn delete_node(&self, tab_id: &str, node_id: &str) -> Result<Vec<NodeId>> {
        let handle = self.tab(tab_id)?;
        let removed = handle.write().store_mut().remove_nodes_recursively(node_id);
        if removed.is_empty() {
            return Err(Error::NodeNotFound(node_id.to_string()));
        }
        info!("Deleted {} nodes under {}", removed.len(), node_id);
        Ok(removed)
    }

    pub fn begin_drag(&self, tab_id: &str, node_id: &str) -> Result<Position> {
        self.tab(tab_id)?.write().store_mut().begin_drag(node_id)
    }

    pub fn end_drag(&self, tab_id: &str, node_id: &str, x: f64, y: f64) -> Result<Position> {
        self.tab(tab_id)?.write().store_mut().end_drag(node_id, x, y, &self.layout)
    }

    pub fn cancel_drag(&self, tab_id: &str) -> Result<bool> {
        Ok(self.tab(tab_id)?.write().store_mut().cancel_drag())
    }

    pub fn undo(&self, tab_id: &str) -> Result<bool> {
        Ok(self.tab(tab_id)?.write().store_mut().undo())
    }

    pub fn redo(&self, tab_id: &str) -> Result<bool> {
        Ok(self.tab(tab_id)?.write().store_mut().redo())
    }

    /// Keyboard undo: applies to the active tab only.
    pub fn undo_active(&self) -> bool {
        self.tabs
            .active_handle()
            .map_or(false, |handle| handle.write().store_mut().undo())
    }

    pub fn redo_active(&self) -> bool {
        self.tabs
            .active_handle()
            .map_or(false, |handle| handle.write().store_mut().redo())
    }

    pub async fn transaction_detail(&self, tab_id: &str, tx_id: &str) -> Result<TransactionDetail> {
        let network = self.tab(tab_id)?.read().network();
        let detail = self.service.transaction_detail(network, tx_id).await?;
        if detail.address_list.is_empty() {
            return Err(Error::NoData(format!("no addresses recorded for {}", tx_id)));
        }
        Ok(detail)
    }

    fn tab(&self, tab_id: &str) -> Result<Arc<RwLock<Tab>>> {
        self.tabs
            .get_tab(tab_id)
            .ok_or_else(|| Error::TabNotFound(tab_id.to_string()))
    }
}
