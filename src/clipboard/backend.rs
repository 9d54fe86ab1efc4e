use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Clipboard failures
///
/// All of these are transient from the watcher's point of view: the next
/// tick simply tries again.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// Clipboard could not be opened (held by another application, no display)
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    /// Image data was present but could not be decoded
    #[error("Failed to decode clipboard image: {0}")]
    Decode(String),

    /// Reading or writing a format failed after the clipboard was opened
    #[error("Clipboard access failed: {0}")]
    Access(String),
}

/// Image formats checked on the clipboard, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipboardFormat {
    /// Device-independent bitmap (`CF_DIB`)
    Dib,
    /// Device-dependent bitmap handle (`CF_BITMAP`)
    Bitmap,
}

impl ClipboardFormat {
    /// Formats in the order the reader tries them
    pub const PRIORITY: [ClipboardFormat; 2] = [ClipboardFormat::Dib, ClipboardFormat::Bitmap];
}

impl fmt::Display for ClipboardFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardFormat::Dib => write!(f, "CF_DIB"),
            ClipboardFormat::Bitmap => write!(f, "CF_BITMAP"),
        }
    }
}

/// Raw image data as handed over by a backend, before decoding
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePayload {
    /// `BITMAPINFO` header followed by pixel data, no file header
    Dib(Vec<u8>),
    /// Complete BMP file including `BITMAPFILEHEADER`
    Bmp(Vec<u8>),
    /// Already decoded RGBA8 pixels, top row first
    Rgba {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

/// Exclusive access to the clipboard, released when dropped
pub trait ClipboardSession {
    /// Check whether the clipboard currently offers `format`
    fn has_format(&mut self, format: ClipboardFormat) -> bool;

    /// Read the raw payload for `format`
    fn read_image(&mut self, format: ClipboardFormat) -> Result<ImagePayload, ClipboardError>;
}

/// Trait for clipboard backend abstraction
/// Image reads go through an exclusive session; text operations are used by
/// the path injector to swap and restore the clipboard.
pub trait ClipboardBackend: Send {
    /// Open the clipboard for reading images
    fn open(&mut self) -> Result<Box<dyn ClipboardSession + '_>, ClipboardError>;

    /// Current text content, `None` if the clipboard holds no text
    fn get_text(&mut self) -> Result<Option<String>, ClipboardError>;

    /// Replace the clipboard content with `text`
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;

    /// Get the backend name (for logging/debugging)
    fn name(&self) -> &'static str;
}

/// Process-wide clipboard handle shared by the watcher and the injector
pub type SharedClipboard = Arc<Mutex<Box<dyn ClipboardBackend>>>;

/// Wrap a backend for sharing between threads
pub fn share(backend: Box<dyn ClipboardBackend>) -> SharedClipboard {
    Arc::new(Mutex::new(backend))
}

/// Lock the shared clipboard, mapping a poisoned lock to `Unavailable`
pub fn lock(
    clipboard: &SharedClipboard,
) -> Result<MutexGuard<'_, Box<dyn ClipboardBackend>>, ClipboardError> {
    clipboard
        .lock()
        .map_err(|_| ClipboardError::Unavailable("clipboard lock poisoned".to_string()))
}
