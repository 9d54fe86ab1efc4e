use chrono::{DateTime, Local};
use image::ImageFormat;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::{ClipboardImage, SavedScreenshot};

/// File name prefix for saved screenshots
pub const FILE_PREFIX: &str = "screenshot_";
/// File extension for saved screenshots (lossless)
pub const FILE_EXTENSION: &str = "png";

/// Errors writing a screenshot to disk
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to create save directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to save screenshot to {path:?}: {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to resolve absolute path of {path:?}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

type Clock = Box<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Writes clipboard images as timestamped PNG files
///
/// Names have second granularity. Two saves within the same second write the
/// same name and the later one overwrites the earlier: a save only happens
/// after the fingerprint changed, so this loses at most one of two images
/// copied within a second.
pub struct ImageStore {
    clock: Clock,
}

impl ImageStore {
    /// Create a store stamping files with the local wall clock
    pub fn new() -> Self {
        ImageStore {
            clock: Box::new(Local::now),
        }
    }

    /// Create a store with a custom clock
    pub fn with_clock(clock: impl Fn() -> DateTime<Local> + Send + Sync + 'static) -> Self {
        ImageStore {
            clock: Box::new(clock),
        }
    }

    /// Write `image` into `directory`, creating the directory if needed
    pub fn store(
        &self,
        image: &ClipboardImage,
        directory: &Path,
    ) -> Result<SavedScreenshot, StoreError> {
        fs::create_dir_all(directory).map_err(|source| StoreError::CreateDir {
            path: directory.to_path_buf(),
            source,
        })?;

        let created_at = (self.clock)();
        let path = directory.join(file_name_for(&created_at));
        let path = std::path::absolute(&path).map_err(|source| StoreError::Resolve {
            path: path.clone(),
            source,
        })?;

        if path.exists() {
            log::debug!("Overwriting {:?} (saved within the same second)", path);
        }

        image
            .pixels()
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|source| StoreError::SaveFailed {
                path: path.clone(),
                source,
            })?;

        log::debug!(
            "Wrote {}x{} screenshot to {:?}",
            image.width(),
            image.height(),
            path
        );

        Ok(SavedScreenshot { path, created_at })
    }
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `screenshot_<YYYYMMDD_HHMMSS>.png`
pub fn file_name_for(timestamp: &DateTime<Local>) -> String {
    format!(
        "{}{}.{}",
        FILE_PREFIX,
        timestamp.format("%Y%m%d_%H%M%S"),
        FILE_EXTENSION
    )
}
