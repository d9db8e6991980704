//! # txmap Core
//!
//! Core library for the txmap transaction graph explorer.
//!
//! This crate turns blockchain graph-data responses into a laid-out node/edge
//! graph and keeps per-tab mutable state:
//!
//! - [`OccupancyGrid`] - Which grid cells are claimed, nearest-free searches
//! - [`normalize`] - Backend responses to deduplicated nodes/edges, per network family
//! - [`LayoutEngine`] - Tiered left/right placement around an anchor
//! - [`GraphStore`] - Copy-on-write graph with bounded undo/redo history
//! - [`expand_hops`] - Denylist trace attachment
//!
//! ## Example
//!
//! ```rust
//! use txmap_core::{
//!     normalize_non_btc, AddressInfo, Direction, GraphStore, LayoutConfig, LayoutEngine,
//!     Network, OccupancyGrid, Position, StoreConfig,
//! };
//!
//! let info = AddressInfo::default();
//! let graph = normalize_non_btc("0xmain", &info, &[], Network::Eth, Direction::All);
//! let (nodes, edges) = graph.into_parts();
//!
//! let anchor = nodes[0].clone().with_position(Position::ORIGIN);
//! let mut grid = OccupancyGrid::new();
//! let placed = LayoutEngine::new(LayoutConfig::default()).layout(nodes, &anchor, &mut grid);
//!
//! let mut store = GraphStore::new(StoreConfig::default());
//! store.merge("search", placed, edges);
//! assert_eq!(store.nodes()[0].position, Some(Position::ORIGIN));
//! assert!(store.undo());
//! ```

pub mod deletion;
pub mod error;
pub mod factory;
pub mod format;
pub mod graph;
pub mod history;
pub mod hops;
pub mod layout;
pub mod network;
pub mod normalize;
pub mod occupancy;
pub mod records;
pub mod store;

pub use deletion::descendants_of;
pub use error::{Error, Result};
pub use factory::{classify, make_address_node, make_edge, make_main_node, make_transaction_node};
pub use format::{format_timestamp, format_token_value, TimeZoneLabel};
pub use graph::{
    AddressAttributes, AddressClass, Amount, Edge, EdgeId, Node, NodeAttributes, NodeId, NodeKind,
    NodePatch, Position, Subgraph, TransactionAttributes,
};
pub use history::{Edit, History, HistoryEntry, Patch};
pub use hops::{expand_hops, HopSummary};
pub use layout::{LayoutConfig, LayoutEngine, Placement};
pub use network::{Network, NetworkFamily, ERC_USDT_TOKEN_ID};
pub use normalize::{net_flow_by_address, normalize, normalize_btc, normalize_non_btc, NetFlow};
pub use occupancy::{OccupancyGrid, GRID_LIMIT};
pub use records::{
    AddressInfo, AddressMap, AddressMapEntry, AddressRecord, DenylistDetail, DenylistResponse,
    Direction, GraphPayload, Hop, RelationType, TransactionDetail, TransactionMap,
    TransactionMapEntry, TransactionRecord,
};
pub use store::{Draft, GraphSnapshot, GraphStore, MergeSummary, StoreConfig, StoreState};
