use crate::schema::{SavedState, StoreError};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a world is persisted between sessions.
///
/// `load` never fails: a missing, unreadable or corrupt save reads as
/// nothing saved, and the caller starts fresh.
pub trait StateStore {
    fn save(&mut self, state: &SavedState) -> Result<(), StoreError>;
    fn load(&self) -> Option<SavedState>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

pub fn default_state_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("RESTRACK_SAVE") {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".restrack_state.json"))
}

fn decode(body: &str) -> Result<SavedState, StoreError> {
    let value: Value = serde_json::from_str(body)?;
    SavedState::from_value(value)
}

#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Like `load`, but reports why a present save could not be read.
    pub fn try_load(&self) -> Result<Option<SavedState>, StoreError> {
        let body = match fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        decode(&body).map(Some)
    }
}

impl StateStore for FileStateStore {
    fn save(&mut self, state: &SavedState) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, body)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    fn load(&self) -> Option<SavedState> {
        match self.try_load() {
            Ok(state) => state,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring unreadable save");
                None
            }
        }
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "save cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Keeps the encoded blob in memory; used by tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    body: Option<String>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl StateStore for MemoryStateStore {
    fn save(&mut self, state: &SavedState) -> Result<(), StoreError> {
        self.body = Some(serde_json::to_string(state)?);
        Ok(())
    }

    fn load(&self) -> Option<SavedState> {
        let body = self.body.as_deref()?;
        match decode(body) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(error = %err, "ignoring unreadable save");
                None
            }
        }
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.body = None;
        Ok(())
    }
}
