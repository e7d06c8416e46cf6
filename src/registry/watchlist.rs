use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::RegistryError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub type_id: i64,
    /// Reference price of one unit (one run for blueprints), in millions of ISK.
    pub price: f64,
    pub type_name: String,
}

/// Item types the operator wants to hear about, keyed by type id.
///
/// Read-only for the monitor; edits happen in `registry.json` between runs.
#[derive(Debug, Clone, Default)]
pub struct WatchList {
    entries: HashMap<i64, WatchEntry>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = WatchEntry>) -> Result<Self, RegistryError> {
        let mut list = Self::new();
        for entry in entries {
            validate_entry(entry.type_id, &entry)?;
            list.entries.insert(entry.type_id, entry);
        }
        Ok(list)
    }

    /// Parses the registry file format: an object keyed by type id. `null` is an empty list.
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let parsed: Option<HashMap<i64, WatchEntry>> = serde_json::from_str(raw)?;
        let entries = parsed.unwrap_or_default();
        for (id, entry) in &entries {
            validate_entry(*id, entry)?;
        }
        Ok(Self { entries })
    }

    /// A missing file is an empty watch-list, not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("⚠️  Watch-list {} not found, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let list = Self::from_json(&raw)?;
        tracing::info!("Loaded {} watched item types from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn get(&self, type_id: i64) -> Option<&WatchEntry> {
        self.entries.get(&type_id)
    }

    pub fn contains(&self, type_id: i64) -> bool {
        self.entries.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchEntry> {
        self.entries.values()
    }
}

fn validate_entry(key: i64, entry: &WatchEntry) -> Result<(), RegistryError> {
    if key != entry.type_id {
        return Err(RegistryError::Precondition(format!(
            "watch-list key {} does not match type_id {}",
            key, entry.type_id
        )));
    }
    if !entry.price.is_finite() || entry.price <= 0.0 {
        return Err(RegistryError::Precondition(format!(
            "watch-list price for type {} must be a positive number, got {}",
            entry.type_id, entry.price
        )));
    }
    Ok(())
}
