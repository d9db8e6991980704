// Tab snapshots: gzip-compressed JSON with a SHA-256 checksum
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use txmap_core::{Edge, Network, Node};

use crate::tab::Tab;

const SNAPSHOT_EXTENSION: &str = "snapshot";

/// Snapshot description for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDescription {
    pub name: String,
    pub creation_time: Option<String>,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Everything needed to reopen a tab. History is not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabSnapshotData {
    pub tab_id: String,
    pub network: Network,
    pub zoom_level: f64,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub created_at: String,
}

impl TabSnapshotData {
    pub fn capture(tab: &Tab) -> Self {
        Self {
            tab_id: tab.id().to_string(),
            network: tab.network(),
            zoom_level: tab.zoom_level(),
            nodes: tab.store().nodes().to_vec(),
            edges: tab.store().edges().to_vec(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Compresses snapshot data into the on-disk/download format.
pub fn encode(data: &TabSnapshotData) -> Result<Vec<u8>> {
    let json_data = serde_json::to_vec(data)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json_data)?;
    Ok(encoder.finish()?)
}

/// Inverse of [`encode`]; verifies `expected_checksum` when given.
pub fn decode(bytes: &[u8], expected_checksum: Option<&str>) -> Result<TabSnapshotData> {
    if let Some(expected) = expected_checksum {
        let actual = checksum(bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(anyhow!("Checksum mismatch: expected {}, got {}", expected, actual));
        }
    }
    let mut decoder = GzDecoder::new(bytes);
    let mut json_data = Vec::new();
    decoder.read_to_end(&mut json_data)?;
    Ok(serde_json::from_slice(&json_data)?)
}

pub struct SnapshotManager {
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_dir: P) -> Result<Self> {
        let snapshot_dir = snapshot_dir.as_ref().to_path_buf();
        fs::create_dir_all(&snapshot_dir)?;
        Ok(Self { snapshot_dir })
    }

    /// Addresses may carry characters that are unsafe in paths.
    fn tab_snapshot_dir(&self, tab_id: &str) -> PathBuf {
        let safe: String = tab_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.snapshot_dir.join(safe)
    }

    fn generate_snapshot_name(tab_id: &str) -> String {
        let now: DateTime<Utc> = Utc::now();
        let prefix: String = tab_id.chars().take(16).filter(|c| c.is_ascii_alphanumeric()).collect();
        format!(
            "{}-{}.{}",
            prefix,
            now.format("%Y-%m-%d-%H-%M-%S-%3f"),
            SNAPSHOT_EXTENSION
        )
    }

    fn describe(path: &Path, name: String) -> Result<SnapshotDescription> {
        let metadata = fs::metadata(path)?;
        let file_data = fs::read(path)?;
        let creation_time = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%dT%H:%M:%SZ").to_string());
        Ok(SnapshotDescription {
            name,
            creation_time,
            size: metadata.len(),
            checksum: Some(checksum(&file_data)),
        })
    }

    pub fn create_tab_snapshot(&self, data: &TabSnapshotData) -> Result<SnapshotDescription> {
        let tab_dir = self.tab_snapshot_dir(&data.tab_id);
        fs::create_dir_all(&tab_dir)?;

        let snapshot_name = Self::generate_snapshot_name(&data.tab_id);
        let snapshot_path = tab_dir.join(&snapshot_name);
        fs::write(&snapshot_path, encode(data)?)?;

        Self::describe(&snapshot_path, snapshot_name)
    }

    /// Newest first.
    pub fn list_tab_snapshots(&self, tab_id: &str) -> Result<Vec<SnapshotDescription>> {
        let tab_dir = self.tab_snapshot_dir(tab_id);
        if !tab_dir.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&tab_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                snapshots.push(Self::describe(&path, name.to_string())?);
            }
        }

        snapshots.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(snapshots)
    }

    pub fn load_tab_snapshot(&self, tab_id: &str, snapshot_name: &str) -> Result<TabSnapshotData> {
        let snapshot_path = self.snapshot_path(tab_id, snapshot_name)?;
        if !snapshot_path.exists() {
            return Err(anyhow!("Snapshot '{}' not found for tab '{}'", snapshot_name, tab_id));
        }
        decode(&fs::read(&snapshot_path)?, None)
    }

    pub fn delete_tab_snapshot(&self, tab_id: &str, snapshot_name: &str) -> Result<bool> {
        let snapshot_path = self.snapshot_path(tab_id, snapshot_name)?;
        if snapshot_path.exists() {
            fs::remove_file(&snapshot_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn snapshot_path(&self, tab_id: &str, snapshot_name: &str) -> Result<PathBuf> {
        if snapshot_name.contains(['/', '\\']) || snapshot_name.starts_with('.') {
            return Err(anyhow!("Invalid snapshot name '{}'", snapshot_name));
        }
        Ok(self.tab_snapshot_dir(tab_id).join(snapshot_name))
    }
}
