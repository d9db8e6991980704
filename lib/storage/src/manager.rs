use crate::recent::RecentSearches;
use crate::snapshot::{SnapshotDescription, SnapshotManager, TabSnapshotData};
use crate::tab::{Tab, TabSummary};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use txmap_core::{Error, GraphStore, Network, Result, StoreConfig};

pub type TabHandle = Arc<RwLock<Tab>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabManagerConfig {
    pub max_tabs: usize,
    pub max_recent_searches: usize,
    pub store: StoreConfig,
}

impl Default for TabManagerConfig {
    fn default() -> Self {
        Self {
            max_tabs: 5,
            max_recent_searches: 10,
            store: StoreConfig::default(),
        }
    }
}

#[derive(Default)]
struct TabSet {
    order: Vec<String>,
    tabs: HashMap<String, TabHandle>,
    active: Option<String>,
}

/// Open tabs, the active tab and recent searches.
///
/// Each tab sits behind its own lock; the registry lock is only held while
/// looking tabs up or changing the set.
pub struct TabManager {
    config: TabManagerConfig,
    tabs: RwLock<TabSet>,
    recent: RwLock<RecentSearches>,
    snapshots: Option<Arc<SnapshotManager>>,
}

impl TabManager {
    pub fn new(config: TabManagerConfig) -> Self {
        Self {
            config,
            tabs: RwLock::new(TabSet::default()),
            recent: RwLock::new(RecentSearches::new(config.max_recent_searches)),
            snapshots: None,
        }
    }

    /// Same as [`TabManager::new`], with tab snapshots saved under `snapshot_dir`.
    pub fn with_snapshot_dir<P: AsRef<Path>>(config: TabManagerConfig, snapshot_dir: P) -> Result<Self> {
        let snapshots = SnapshotManager::new(snapshot_dir).map_err(|e| Error::Snapshot(e.to_string()))?;
        let mut manager = Self::new(config);
        manager.snapshots = Some(Arc::new(snapshots));
        Ok(manager)
    }

    pub fn config(&self) -> &TabManagerConfig {
        &self.config
    }

    /// Opens a tab, or returns the existing one for `id`.
    pub fn create_tab(&self, id: &str, network: Network) -> Result<TabHandle> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::InvalidInput("tab id must not be empty".to_string()));
        }
        let mut set = self.tabs.write();
        if let Some(handle) = set.tabs.get(id) {
            return Ok(handle.clone());
        }
        if set.order.len() >= self.config.max_tabs {
            return Err(Error::TabLimitReached(self.config.max_tabs));
        }
        info!("Opening tab {} ({})", id, network);
        let handle = Arc::new(RwLock::new(Tab::new(id, network, self.config.store)));
        set.order.push(id.to_string());
        set.tabs.insert(id.to_string(), handle.clone());
        if set.active.is_none() {
            set.active = Some(id.to_string());
        }
        Ok(handle)
    }

    pub fn get_tab(&self, id: &str) -> Option<TabHandle> {
        self.tabs.read().tabs.get(id).cloned()
    }

    /// Closes a tab. The first remaining tab becomes active if the closed one was.
    pub fn remove_tab(&self, id: &str) -> bool {
        let mut set = self.tabs.write();
        if set.tabs.remove(id).is_none() {
            return false;
        }
        set.order.retain(|t| t != id);
        if set.active.as_deref() == Some(id) {
            set.active = set.order.first().cloned();
        }
        info!("Closed tab {}", id);
        true
    }

    pub fn reset_tab(&self, id: &str) -> Result<()> {
        let handle = self.get_tab(id).ok_or_else(|| Error::TabNotFound(id.to_string()))?;
        handle.write().reset();
        debug!("Reset tab {}", id);
        Ok(())
    }

    pub fn list_tabs(&self) -> Vec<TabSummary> {
        let set = self.tabs.read();
        set.order
            .iter()
            .filter_map(|id| set.tabs.get(id))
            .map(|handle| handle.read().summary())
            .collect()
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.read().order.len()
    }

    pub fn active_tab(&self) -> Option<String> {
        self.tabs.read().active.clone()
    }

    pub fn active_handle(&self) -> Option<TabHandle> {
        let set = self.tabs.read();
        set.active.as_ref().and_then(|id| set.tabs.get(id)).cloned()
    }

    pub fn set_active(&self, id: &str) -> Result<()> {
        let mut set = self.tabs.write();
        if !set.tabs.contains_key(id) {
            return Err(Error::TabNotFound(id.to_string()));
        }
        set.active = Some(id.to_string());
        Ok(())
    }

    pub fn set_zoom(&self, id: &str, zoom: f64) -> Result<()> {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(Error::InvalidInput(format!("invalid zoom level {}", zoom)));
        }
        let handle = self.get_tab(id).ok_or_else(|| Error::TabNotFound(id.to_string()))?;
        handle.write().set_zoom_level(zoom);
        Ok(())
    }

    pub fn record_search(&self, term: &str) {
        self.recent.write().record(term);
    }

    pub fn remove_recent_search(&self, term: &str) -> bool {
        self.recent.write().remove(term)
    }

    pub fn recent_searches(&self) -> Vec<String> {
        self.recent.read().terms()
    }

    /// Closes every tab and forgets recent searches.
    pub fn clear(&self) {
        *self.tabs.write() = TabSet::default();
        self.recent.write().clear();
    }

    pub fn snapshot_data(&self, id: &str) -> Result<TabSnapshotData> {
        let handle = self.get_tab(id).ok_or_else(|| Error::TabNotFound(id.to_string()))?;
        let tab = handle.read();
        Ok(TabSnapshotData::capture(&tab))
    }

    /// Opens (or replaces) a tab from saved data with empty history.
    pub fn restore(&self, data: TabSnapshotData) -> Result<TabHandle> {
        let store = GraphStore::from_parts(self.config.store, data.nodes, data.edges);
        let tab = Tab::from_store(data.tab_id.clone(), data.network, data.zoom_level, store);

        let mut set = self.tabs.write();
        if !set.tabs.contains_key(&data.tab_id) {
            if set.order.len() >= self.config.max_tabs {
                return Err(Error::TabLimitReached(self.config.max_tabs));
            }
            set.order.push(data.tab_id.clone());
        }
        let handle = Arc::new(RwLock::new(tab));
        set.tabs.insert(data.tab_id.clone(), handle.clone());
        set.active = Some(data.tab_id);
        Ok(handle)
    }

    pub fn save_snapshot(&self, id: &str) -> Result<SnapshotDescription> {
        let snapshots = self.snapshot_manager()?;
        let data = self.snapshot_data(id)?;
        snapshots
            .create_tab_snapshot(&data)
            .map_err(|e| Error::Snapshot(e.to_string()))
    }

    pub fn list_snapshots(&self, id: &str) -> Result<Vec<SnapshotDescription>> {
        self.snapshot_manager()?
            .list_tab_snapshots(id)
            .map_err(|e| Error::Snapshot(e.to_string()))
    }

    pub fn load_snapshot(&self, id: &str, name: &str) -> Result<TabHandle> {
        let data = self
            .snapshot_manager()?
            .load_tab_snapshot(id, name)
            .map_err(|e| Error::Snapshot(e.to_string()))?;
        self.restore(data)
    }

    pub fn delete_snapshot(&self, id: &str, name: &str) -> Result<bool> {
        self.snapshot_manager()?
            .delete_tab_snapshot(id, name)
            .map_err(|e| Error::Snapshot(e.to_string()))
    }

    fn snapshot_manager(&self) -> Result<&SnapshotManager> {
        self.snapshots
            .as_deref()
            .ok_or_else(|| Error::Snapshot("no snapshot directory configured".to_string()))
    }
}

impl Default for TabManager {
    fn default() -> Self {
        Self::new(TabManagerConfig::default())
    }
}
