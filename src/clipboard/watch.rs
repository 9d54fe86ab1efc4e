use std::sync::Arc;
use std::time::Duration;

use super::backend::{self, ClipboardError, SharedClipboard};
use super::reader::try_read_image;
use crate::app::{AppContext, Shutdown};
use crate::image::{Fingerprint, ImageStore, fingerprint};
use crate::models::SavedScreenshot;

/// Polling cadence
#[derive(Debug, Clone, Copy)]
pub struct WatchSettings {
    /// Time between clipboard checks
    pub interval: Duration,
    /// Pause after a failed check
    pub error_penalty: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        WatchSettings {
            interval: Duration::from_millis(500),
            error_penalty: Duration::from_secs(1),
        }
    }
}

/// Result of one clipboard check
#[derive(Debug)]
pub enum TickOutcome {
    /// Clipboard holds no readable image
    NoImage,
    /// Same image as the last one saved
    Unchanged,
    /// New image written and recorded as latest
    Saved(SavedScreenshot),
    /// New image could not be written; it is retried next tick
    SaveFailed,
}

/// Failure of a single check; the loop logs it and keeps going
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),

    #[error("Failed to fingerprint clipboard image: {0}")]
    Fingerprint(#[from] image::ImageError),
}

/// Polls the clipboard and saves every new image
pub struct ClipboardWatcher {
    clipboard: SharedClipboard,
    store: ImageStore,
    ctx: Arc<AppContext>,
    settings: WatchSettings,
    last_fingerprint: Option<Fingerprint>,
    /// Image whose save failed, so the retry does not log again
    failed_fingerprint: Option<Fingerprint>,
}

impl ClipboardWatcher {
    pub fn new(clipboard: SharedClipboard, store: ImageStore, ctx: Arc<AppContext>) -> Self {
        ClipboardWatcher {
            clipboard,
            store,
            ctx,
            settings: WatchSettings::default(),
            last_fingerprint: None,
            failed_fingerprint: None,
        }
    }

    pub fn with_settings(mut self, settings: WatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Check the clipboard once
    ///
    /// On `Saved` the registry already holds the new path.
    pub fn tick(&mut self) -> Result<TickOutcome, WatchError> {
        let image = {
            let mut clipboard = backend::lock(&self.clipboard)?;
            try_read_image(&mut **clipboard)
        };
        let Some(image) = image else {
            return Ok(TickOutcome::NoImage);
        };

        let current = fingerprint(&image)?;
        if self.last_fingerprint == Some(current) {
            return Ok(TickOutcome::Unchanged);
        }

        let directory = self.ctx.save_dir();
        match self.store.store(&image, &directory) {
            Ok(saved) => {
                self.last_fingerprint = Some(current);
                self.failed_fingerprint = None;
                self.ctx.latest().set(saved.path.clone());
                log::info!(
                    "Saved {}x{} screenshot from {}: {}",
                    image.width(),
                    image.height(),
                    image.source(),
                    saved.path.display()
                );
                Ok(TickOutcome::Saved(saved))
            }
            Err(e) => {
                if self.failed_fingerprint == Some(current) {
                    log::debug!("Retrying save of {:?} failed: {}", current, e);
                } else {
                    log::error!("Failed to save screenshot: {}", e);
                    self.failed_fingerprint = Some(current);
                }
                Ok(TickOutcome::SaveFailed)
            }
        }
    }

    /// Poll until `shutdown` is triggered
    pub fn run(&mut self, shutdown: &Shutdown) {
        log::info!(
            "Watching clipboard every {:?}, saving to {}",
            self.settings.interval,
            self.ctx.save_dir().display()
        );

        while !shutdown.is_triggered() {
            let pause = match self.tick() {
                Ok(_) => self.settings.interval,
                Err(e) => {
                    log::error!("Clipboard check failed: {}", e);
                    self.settings.error_penalty
                }
            };
            shutdown.wait(pause);
        }

        log::info!("Clipboard watcher stopped");
    }
}
