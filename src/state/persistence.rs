//! State persistence backends.
//!
//! - **JSON**: a single file, replaced atomically on save
//! - **Memory**: for tests

use super::{StateError, StateFile, StateResult};
use parking_lot::RwLock;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage for a [`StateFile`].
pub trait StatePersistence: Send + Sync {
    /// Read the stored state. A missing store yields an empty state.
    fn load(&self) -> StateResult<StateFile>;

    /// Replace the stored state.
    fn save(&self, state: &StateFile) -> StateResult<()>;
}

// ============================================================================
// JSON Persistence Backend
// ============================================================================

/// JSON file backend
pub struct JsonPersistence {
    path: PathBuf,
}

impl JsonPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatePersistence for JsonPersistence {
    fn load(&self) -> StateResult<StateFile> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}, starting empty", self.path.display());
                return Ok(StateFile::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(StateFile::default());
        }

        serde_json::from_str(&content).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, state: &StateFile) -> StateResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        {
            let file = fs::File::create(&temp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, state)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        fs::rename(&temp, &self.path)?;

        debug!(
            "Saved state serial {} to {}",
            state.serial,
            self.path.display()
        );
        Ok(())
    }
}

// ============================================================================
// Memory Persistence Backend
// ============================================================================

/// In-memory backend (for testing)
#[derive(Default)]
pub struct MemoryPersistence {
    state: RwLock<StateFile>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StateFile) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

impl StatePersistence for MemoryPersistence {
    fn load(&self) -> StateResult<StateFile> {
        Ok(self.state.read().clone())
    }

    fn save(&self, state: &StateFile) -> StateResult<()> {
        *self.state.write() = state.clone();
        Ok(())
    }
}
