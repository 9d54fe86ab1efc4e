use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Registry holding the absolute path of the most recently saved screenshot
///
/// Written by the clipboard watcher, read by hotkey actions on another thread.
/// Clones share the same slot. The path is swapped as a whole `Arc`, so a
/// reader sees either the old or the new value, never a mix.
///
/// The registry does not own the file: it may have been deleted since it was
/// recorded, and readers must check existence before using it.
#[derive(Debug, Clone, Default)]
pub struct LatestFileRegistry {
    slot: Arc<RwLock<Option<Arc<PathBuf>>>>,
}

impl LatestFileRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly saved file
    pub fn set(&self, path: impl Into<PathBuf>) {
        let path = Arc::new(path.into());
        log::debug!("Latest file set to {:?}", path);
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(path);
    }

    /// Path of the most recent save, if any
    pub fn get(&self) -> Option<PathBuf> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|path| path.as_ref().clone())
    }

    /// Forget the recorded path
    pub fn clear(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// Check whether a path has been recorded
    pub fn is_set(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Check whether the recorded path equals `path`
    pub fn is(&self, path: &Path) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .is_some_and(|latest| latest.as_path() == path)
    }
}
