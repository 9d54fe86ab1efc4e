use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::input::InputBackend;
use crate::clipboard::backend::{self, ClipboardError, SharedClipboard};
use crate::models::LatestFileRegistry;

#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("No screenshot saved yet")]
    NothingSaved,

    #[error("Latest screenshot no longer exists: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),

    #[error("{0}")]
    Input(String),

    /// Both the clipboard paste and the typing fallback failed
    #[error("Paste failed ({paste}); typing failed ({typing})")]
    Failed { paste: String, typing: String },
}

/// How a path reached its destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// Clipboard swap plus paste chord
    Pasted(PathBuf),
    /// Typed keystroke by keystroke
    Typed(PathBuf),
    /// Left on the clipboard, no input sent
    Copied(PathBuf),
}

impl Injection {
    pub fn path(&self) -> &Path {
        match self {
            Injection::Pasted(path) | Injection::Typed(path) | Injection::Copied(path) => path,
        }
    }
}

/// Delays around the paste chord
#[derive(Debug, Clone, Copy)]
pub struct InjectorTiming {
    /// Wait after setting the clipboard, before the chord
    pub settle: Duration,
    /// Wait after the chord so the target reads the clipboard
    pub paste_grace: Duration,
    /// Delay before the previous clipboard text is put back
    pub restore_delay: Duration,
}

impl Default for InjectorTiming {
    fn default() -> Self {
        InjectorTiming {
            settle: Duration::from_millis(100),
            paste_grace: Duration::from_millis(100),
            restore_delay: Duration::from_millis(500),
        }
    }
}

/// Puts the latest screenshot path into the focused application
pub struct PathInjector<I: InputBackend> {
    clipboard: SharedClipboard,
    input: I,
    timing: InjectorTiming,
    pending_restore: Option<JoinHandle<()>>,
}

impl<I: InputBackend> PathInjector<I> {
    pub fn new(clipboard: SharedClipboard, input: I) -> Self {
        PathInjector {
            clipboard,
            input,
            timing: InjectorTiming::default(),
            pending_restore: None,
        }
    }

    pub fn with_timing(mut self, timing: InjectorTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Paste the registry's path, `NothingSaved` if there is none
    pub fn inject_latest(&mut self, registry: &LatestFileRegistry) -> Result<Injection, InjectError> {
        let path = registry.get().ok_or(InjectError::NothingSaved)?;
        self.inject_path(&path)
    }

    /// Paste `path` at the caret
    ///
    /// Tries clipboard swap + paste chord first and types the path if that
    /// raised an error. The previous clipboard text is restored in the
    /// background either way.
    pub fn inject_path(&mut self, path: &Path) -> Result<Injection, InjectError> {
        if !path.exists() {
            return Err(InjectError::NotFound(path.to_path_buf()));
        }
        let text = path.to_string_lossy();

        match self.paste_via_clipboard(&text) {
            Ok(()) => {
                log::info!("Pasted {}", path.display());
                Ok(Injection::Pasted(path.to_path_buf()))
            }
            Err(paste) => {
                log::warn!("Clipboard paste failed ({}), typing path instead", paste);
                match self.input.type_text(&text) {
                    Ok(()) => {
                        log::info!("Typed {}", path.display());
                        Ok(Injection::Typed(path.to_path_buf()))
                    }
                    Err(typing) => Err(InjectError::Failed {
                        paste: paste.to_string(),
                        typing: typing.to_string(),
                    }),
                }
            }
        }
    }

    /// Copy the registry's path to the clipboard
    pub fn copy_latest(&mut self, registry: &LatestFileRegistry) -> Result<Injection, InjectError> {
        let path = registry.get().ok_or(InjectError::NothingSaved)?;
        self.copy_path(&path)
    }

    /// Leave `path` on the clipboard; nothing is restored afterwards
    pub fn copy_path(&mut self, path: &Path) -> Result<Injection, InjectError> {
        if !path.exists() {
            return Err(InjectError::NotFound(path.to_path_buf()));
        }
        // A pending restore would overwrite the copy
        self.wait_for_restore();

        backend::lock(&self.clipboard)?.set_text(&path.to_string_lossy())?;
        log::info!("Copied {} to clipboard", path.display());
        Ok(Injection::Copied(path.to_path_buf()))
    }

    /// Block until a scheduled clipboard restore has run
    pub fn wait_for_restore(&mut self) {
        if let Some(handle) = self.pending_restore.take()
            && handle.join().is_err()
        {
            log::warn!("Clipboard restore thread panicked");
        }
    }

    fn paste_via_clipboard(&mut self, text: &str) -> Result<(), InjectError> {
        // Back up the user's text, not a path we put there ourselves
        self.wait_for_restore();

        let swap = ClipboardSwap::begin(&self.clipboard, text, self.timing.restore_delay)?;
        thread::sleep(self.timing.settle);

        let result = self.input.paste_chord();
        if result.is_ok() {
            thread::sleep(self.timing.paste_grace);
        }

        self.pending_restore = swap.release();
        result
    }
}

/// Clipboard temporarily holding injected text
///
/// Creating it backs up the current text and sets the new one. Releasing
/// or dropping it schedules the restore on a background thread after
/// `delay`. With no previous text there is nothing to restore.
pub struct ClipboardSwap {
    clipboard: SharedClipboard,
    previous: Option<String>,
    delay: Duration,
    released: bool,
}

impl ClipboardSwap {
    pub fn begin(
        clipboard: &SharedClipboard,
        text: &str,
        delay: Duration,
    ) -> Result<Self, ClipboardError> {
        let mut backend = backend::lock(clipboard)?;
        let previous = match backend.get_text() {
            Ok(previous) => previous,
            Err(e) => {
                log::debug!("Could not back up clipboard text: {}", e);
                None
            }
        };
        backend.set_text(text)?;

        Ok(ClipboardSwap {
            clipboard: Arc::clone(clipboard),
            previous,
            delay,
            released: false,
        })
    }

    /// Schedule the restore, returning its thread if one was started
    pub fn release(mut self) -> Option<JoinHandle<()>> {
        self.schedule_restore()
    }

    fn schedule_restore(&mut self) -> Option<JoinHandle<()>> {
        if self.released {
            return None;
        }
        self.released = true;

        let Some(previous) = self.previous.take().filter(|text| !text.is_empty()) else {
            log::debug!("No previous clipboard text to restore");
            return None;
        };

        let clipboard = Arc::clone(&self.clipboard);
        let delay = self.delay;
        let spawned = thread::Builder::new()
            .name("clipboard-restore".to_string())
            .spawn(move || {
                thread::sleep(delay);
                match backend::lock(&clipboard).and_then(|mut backend| backend.set_text(&previous)) {
                    Ok(()) => log::debug!("Restored previous clipboard text"),
                    Err(e) => log::warn!("Failed to restore clipboard: {}", e),
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Failed to schedule clipboard restore: {}", e);
                None
            }
        }
    }
}

impl Drop for ClipboardSwap {
    fn drop(&mut self) {
        let _ = self.schedule_restore();
    }
}
