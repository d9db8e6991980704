//! # txmap
//!
//! Backend for exploring blockchain transaction graphs.
//!
//! txmap fetches the neighbourhood of an address from a graph data service,
//! turns it into deduplicated nodes and edges, places them on a grid next to
//! the node they were expanded from, and keeps every change undoable per tab.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! txmap --http-port 8780 --backend-url http://localhost:8080
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use txmap::prelude::*;
//!
//! let mut store = GraphStore::new(StoreConfig::default());
//! let main = make_main_node("0xmain", Network::Eth, &AddressInfo::default())
//!     .with_position(Position::ORIGIN);
//! store.add_nodes(vec![main]);
//!
//! store.begin_drag("0xmain").unwrap();
//! let dropped = store.end_drag("0xmain", 410.0, 90.0, &LayoutConfig::default()).unwrap();
//! assert_eq!(dropped, Position::new(400, 100));
//!
//! assert!(store.undo());
//! assert_eq!(store.nodes()[0].position, Some(Position::ORIGIN));
//! ```
//!
//! ## Crate Structure
//!
//! - [`txmap-core`](https://docs.rs/txmap-core) - Graph model, normalization, layout, occupancy, history
//! - [`txmap-storage`](https://docs.rs/txmap-storage) - Tabs, recent searches, snapshots
//! - [`txmap-api`](https://docs.rs/txmap-api) - Graph data service client, expansion orchestrator, REST API

// Re-export core types
pub use txmap_core::{
    descendants_of, expand_hops, format_timestamp, format_token_value, make_address_node,
    make_edge, make_main_node, make_transaction_node, normalize, AddressInfo, Direction, Edge,
    Error, GraphPayload, GraphStore, History, LayoutConfig, LayoutEngine, Network, Node,
    NodePatch, OccupancyGrid, Position, Result, StoreConfig, Subgraph, TimeZoneLabel,
};

// Re-export storage
pub use txmap_storage::{SnapshotManager, Tab, TabManager, TabManagerConfig};

// Re-export API
pub use txmap_api::{Explorer, GraphDataService, HttpGraphDataService, Outcome, QueryParams, RestApi, ServiceConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        make_address_node, make_edge, make_main_node, make_transaction_node, AddressInfo,
        Direction, Edge, Error, Explorer, GraphStore, LayoutConfig, LayoutEngine, Network, Node,
        NodePatch, OccupancyGrid, Outcome, Position, QueryParams, Result, StoreConfig,
        TabManager, TabManagerConfig,
    };
}
