pub mod manager;
pub mod recent;
pub mod snapshot;
pub mod tab;

pub use manager::{TabHandle, TabManager, TabManagerConfig};
pub use recent::RecentSearches;
pub use snapshot::{SnapshotDescription, SnapshotManager, TabSnapshotData};
pub use tab::{Tab, TabSummary, DEFAULT_ZOOM};
