pub mod backend;
pub mod reader;
pub mod system;
pub mod watch;

pub use backend::{
    ClipboardBackend, ClipboardError, ClipboardFormat, ClipboardSession, ImagePayload,
    SharedClipboard,
};
pub use reader::try_read_image;
pub use system::SystemClipboard;
pub use watch::{ClipboardWatcher, TickOutcome, WatchError, WatchSettings};

/// Create the clipboard backend for the current platform, ready for sharing
/// between the watcher and the path injector
pub fn create_backend() -> Result<SharedClipboard, ClipboardError> {
    let backend = SystemClipboard::new()?;
    log::info!("Using {} clipboard backend", backend.name());
    Ok(backend::share(Box::new(backend)))
}
