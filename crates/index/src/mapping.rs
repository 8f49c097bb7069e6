use anyhow::{Context, Result};
use ingest::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Person display name -> vector-store collection, persisted as one JSON object.
///
/// Keys keep their original spelling; lookups compare normalized forms.
/// Iteration, and therefore tie-breaking between keys that normalize to the
/// same value, follows sorted key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionMapping {
    entries: BTreeMap<String, String>,
}

impl CollectionMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, person_name: &str, collection: &str) {
        self.entries
            .insert(person_name.to_string(), collection.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Collection for `person_name`, matched accent- and case-insensitively.
    pub fn resolve(&self, person_name: &str) -> Option<&str> {
        let wanted = normalize(person_name);
        self.iter()
            .find(|(name, _)| normalize(name) == wanted)
            .map(|(_, collection)| collection)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .context(format!("Failed to read mapping file: {:?}", path))?;
        serde_json::from_str(&content).context(format!("Invalid mapping file: {:?}", path))
    }

    /// Replace the file at `path` with this mapping. The JSON goes to a
    /// sibling temp file first and is renamed over `path`, so readers see
    /// either the old mapping or the new one.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        let tmp_path = staging_path(path);
        fs::write(&tmp_path, json)
            .await
            .context(format!("Failed to write mapping file: {:?}", tmp_path))?;
        fs::rename(&tmp_path, path)
            .await
            .context(format!("Failed to replace mapping file: {:?}", path))?;
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
