// Run artifact struct definitions
//
// Sidecar JSON written next to each label container, describing how the
// matrices inside it were produced and what their columns mean.

use crate::dataset::classes::LabelFormat;
use crate::error::{LabelError, Result};
use crate::pipeline::inventory::Partition;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Debug, Clone)]
pub struct LabelManifest {
    pub created_at: DateTime<Utc>,
    pub partition: Partition,
    pub sample_frame_rate: f64,
    pub label_format: LabelFormat,
    /// Column names, in matrix column order
    pub labels: Vec<String>,
    /// Rows (frames) per stored video
    pub videos: BTreeMap<String, usize>,
}

/// `labels/trainval.npz` → `labels/trainval.npz.json`
pub fn manifest_path(container: &Path) -> PathBuf {
    let mut name = container.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

pub fn write_manifest(container: &Path, manifest: &LabelManifest) -> Result<PathBuf> {
    let path = manifest_path(container);
    let content = serde_json::to_string_pretty(manifest).map_err(|e| LabelError::Json {
        source_name: path.display().to_string(),
        source: e,
    })?;
    fs::write(&path, content).map_err(|e| LabelError::io(&path, e))?;
    Ok(path)
}
