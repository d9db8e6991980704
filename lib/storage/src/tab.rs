use serde::{Deserialize, Serialize};
use txmap_core::{GraphStore, Network, StoreConfig};

pub const DEFAULT_ZOOM: f64 = 1.0;

/// One investigated address: its graph, history and view settings.
pub struct Tab {
    id: String,
    network: Network,
    zoom_level: f64,
    store: GraphStore,
}

impl Tab {
    pub fn new(id: impl Into<String>, network: Network, config: StoreConfig) -> Self {
        Self {
            id: id.into(),
            network,
            zoom_level: DEFAULT_ZOOM,
            store: GraphStore::new(config),
        }
    }

    pub fn from_store(id: impl Into<String>, network: Network, zoom_level: f64, store: GraphStore) -> Self {
        Self {
            id: id.into(),
            network,
            zoom_level,
            store,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    pub fn set_zoom_level(&mut self, zoom: f64) {
        self.zoom_level = zoom;
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    /// Empties the graph and history and restores the default zoom; only the
    /// network survives.
    pub fn reset(&mut self) {
        self.store.reset();
        self.zoom_level = DEFAULT_ZOOM;
    }

    pub fn summary(&self) -> TabSummary {
        TabSummary {
            id: self.id.clone(),
            network: self.network,
            zoom_level: self.zoom_level,
            node_count: self.store.nodes().len(),
            edge_count: self.store.edges().len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSummary {
    pub id: String,
    pub network: Network,
    pub zoom_level: f64,
    pub node_count: usize,
    pub edge_count: usize,
}
