use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::LogicalRange;
use crate::drawing::{Drawing, DrawingSnapshot, Folder};
use crate::error::{ChartError, ChartResult};
use crate::ingest::sanitize_source_id;

use super::config::WorkspaceConfig;

pub const CHART_STATE_DIR: &str = "Drawings";

/// Everything a chart hands to persistence.
///
/// `source_id` is shared by every timeframe file of one instrument, so the
/// same annotations come back whichever timeframe is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartStateRecord {
    pub source_id: String,
    #[serde(default)]
    pub drawings: Vec<Drawing>,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub config: WorkspaceConfig,
    #[serde(default)]
    pub visible_range: Option<LogicalRange>,
}

impl ChartStateRecord {
    #[must_use]
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            drawings: Vec::new(),
            folders: Vec::new(),
            config: WorkspaceConfig::default(),
            visible_range: None,
        }
    }

    #[must_use]
    pub fn drawing_snapshot(&self) -> DrawingSnapshot {
        DrawingSnapshot {
            drawings: self.drawings.clone(),
            folders: self.folders.clone(),
        }
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            ChartError::Serialization(format!("failed to serialize chart state: {e}"))
        })
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| ChartError::Serialization(format!("failed to parse chart state: {e}")))
    }
}

/// Directory-backed store: one JSON file per instrument under
/// `<root>/Drawings/`.
#[derive(Debug, Clone)]
pub struct ChartStateStore {
    root: PathBuf,
}

impl ChartStateStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `source_id`. The id is made path-safe first.
    #[must_use]
    pub fn path_for(&self, source_id: &str) -> PathBuf {
        self.root
            .join(CHART_STATE_DIR)
            .join(format!("{}.json", sanitize_source_id(source_id)))
    }

    pub fn save(&self, record: &ChartStateRecord) -> ChartResult<()> {
        let dir = self.root.join(CHART_STATE_DIR);
        fs::create_dir_all(&dir)
            .map_err(|err| ChartError::io(format!("create {}", dir.display()), err))?;
        let path = self.path_for(&record.source_id);
        let json = record.to_json_pretty()?;
        fs::write(&path, json)
            .map_err(|err| ChartError::io(format!("write {}", path.display()), err))?;
        info!(
            source_id = record.source_id.as_str(),
            drawings = record.drawings.len(),
            "saved chart state"
        );
        Ok(())
    }

    /// Loads the record for `source_id`; a missing file is `Ok(None)`.
    pub fn load(&self, source_id: &str) -> ChartResult<Option<ChartStateRecord>> {
        let path = self.path_for(source_id);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(source_id, "no saved chart state");
                return Ok(None);
            }
            Err(err) => return Err(ChartError::io(format!("read {}", path.display()), err)),
        };
        ChartStateRecord::from_json_str(&json).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChartStateRecord, ChartStateStore};

    #[test]
    fn path_is_sanitized() {
        let store = ChartStateStore::new("/tmp/ws");
        let path = store.path_for("../etc/passwd");
        assert!(path.ends_with("Drawings/___etc_passwd.json"));
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let record = ChartStateRecord::new("eurusd");
        let json = record.to_json_pretty().expect("json");
        assert!(json.contains("\"sourceId\""));
        assert!(json.contains("\"visibleRange\""));
        let minimal = ChartStateRecord::from_json_str(r#"{"sourceId":"x"}"#).expect("parse");
        assert!(minimal.drawings.is_empty());
        assert_eq!(minimal.config, record.config);
    }
}
