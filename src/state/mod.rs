//! Tracked resources.
//!
//! The state file records, per resource address, the resource type and the
//! Resource Manager id of the object it manages. Nothing else is kept: every
//! other attribute is refreshed from the remote object on each run.
//!
//! ```json
//! {
//!   "version": 1,
//!   "serial": 4,
//!   "resources": {
//!     "cpu-alert": {
//!       "resource_type": "azurerm_monitor_scheduled_query_rules",
//!       "id": "/subscriptions/.../scheduledQueryRules/cpu-alert",
//!       "updated_at": "2024-05-01T10:00:00Z"
//!     }
//!   }
//! }
//! ```

pub mod persistence;

pub use persistence::{JsonPersistence, MemoryPersistence, StatePersistence};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Highest state file format this build understands
pub const STATE_VERSION: u32 = 1;

/// Errors that can occur while reading or writing state
#[derive(Error, Debug)]
pub enum StateError {
    #[error("State file '{path}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("State file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;

/// One tracked resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub resource_type: String,
    pub id: String,
    pub updated_at: DateTime<Utc>,
}

/// On-disk layout of the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    /// Incremented on every save
    pub serial: u64,
    #[serde(default)]
    pub resources: BTreeMap<String, StateEntry>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            resources: BTreeMap::new(),
        }
    }
}

/// In-memory view of the state with explicit persistence.
pub struct StateManager {
    backend: Arc<dyn StatePersistence>,
    state: RwLock<StateFile>,
}

impl StateManager {
    /// Load state through `backend`.
    pub fn open(backend: Arc<dyn StatePersistence>) -> StateResult<Self> {
        let state = backend.load()?;
        if state.version > STATE_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: state.version,
                supported: STATE_VERSION,
            });
        }
        debug!("Loaded state with {} resources", state.resources.len());
        Ok(Self {
            backend,
            state: RwLock::new(state),
        })
    }

    /// Load state from a JSON file, empty if it does not exist yet.
    pub fn json(path: impl Into<PathBuf>) -> StateResult<Self> {
        Self::open(Arc::new(JsonPersistence::new(path)))
    }

    pub fn get(&self, address: &str) -> Option<StateEntry> {
        self.state.read().resources.get(address).cloned()
    }

    /// Id tracked for `address`, if any.
    pub fn id(&self, address: &str) -> Option<String> {
        self.state.read().resources.get(address).map(|e| e.id.clone())
    }

    pub fn set(&self, address: impl Into<String>, resource_type: impl Into<String>, id: impl Into<String>) {
        let entry = StateEntry {
            resource_type: resource_type.into(),
            id: id.into(),
            updated_at: Utc::now(),
        };
        self.state.write().resources.insert(address.into(), entry);
    }

    pub fn remove(&self, address: &str) -> Option<StateEntry> {
        self.state.write().resources.remove(address)
    }

    /// Tracked addresses in sorted order.
    pub fn addresses(&self) -> Vec<String> {
        self.state.read().resources.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().resources.is_empty()
    }

    pub fn serial(&self) -> u64 {
        self.state.read().serial
    }

    /// Bump the serial and write through the backend.
    pub fn persist(&self) -> StateResult<()> {
        let snapshot = {
            let mut state = self.state.write();
            state.serial += 1;
            state.version = STATE_VERSION;
            state.clone()
        };
        self.backend.save(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_get_remove() {
        let manager = StateManager::open(Arc::new(MemoryPersistence::new())).unwrap();
        assert!(manager.is_empty());

        manager.set("cpu", "azurerm_monitor_scheduled_query_rules", "/subscriptions/sub/x");
        assert_eq!(manager.id("cpu").as_deref(), Some("/subscriptions/sub/x"));
        assert_eq!(manager.addresses(), vec!["cpu".to_string()]);

        let removed = manager.remove("cpu").unwrap();
        assert_eq!(removed.id, "/subscriptions/sub/x");
        assert_eq!(manager.get("cpu"), None);
    }

    #[test]
    fn test_persist_bumps_serial() {
        let backend = Arc::new(MemoryPersistence::new());
        let manager = StateManager::open(backend.clone()).unwrap();
        manager.set("a", "t", "id-a");
        manager.persist().unwrap();
        manager.persist().unwrap();

        let saved = backend.load().unwrap();
        assert_eq!(saved.serial, 2);
        assert_eq!(saved.resources["a"].id, "id-a");
    }

    #[test]
    fn test_newer_version_rejected() {
        let backend = Arc::new(MemoryPersistence::with_state(StateFile {
            version: STATE_VERSION + 1,
            ..Default::default()
        }));
        let err = StateManager::open(backend).err().unwrap();
        assert!(matches!(err, StateError::UnsupportedVersion { .. }));
    }
}
