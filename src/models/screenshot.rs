use chrono::{DateTime, Local};
use image::RgbaImage;
use std::path::PathBuf;

use crate::clipboard::ClipboardFormat;

/// Decoded bitmap taken from the clipboard during one poll iteration
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardImage {
    pixels: RgbaImage,
    /// Clipboard format the image was decoded from
    source: ClipboardFormat,
}

impl ClipboardImage {
    pub fn new(pixels: RgbaImage, source: ClipboardFormat) -> Self {
        ClipboardImage { pixels, source }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// RGBA8 pixel buffer, row-major, top row first
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn source(&self) -> ClipboardFormat {
        self.source
    }
}

/// A screenshot written to disk by the image store
///
/// Never mutated after creation. The file may be deleted by the user at any
/// time, so consumers check existence before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedScreenshot {
    /// Absolute path of the written file
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
}

impl SavedScreenshot {
    /// File name without directory, for log lines
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}
