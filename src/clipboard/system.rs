use super::backend::{ClipboardBackend, ClipboardError, ClipboardFormat, ClipboardSession, ImagePayload};

/// Clipboard backend for the desktop clipboard
///
/// Text goes through `arboard` on every platform. On Windows, images are read
/// from the raw `CF_DIB` / `CF_BITMAP` formats via `clipboard-win` while the
/// clipboard is held open. Elsewhere `arboard`'s decoded image fills the DIB
/// slot and no bitmap fallback exists.
pub struct SystemClipboard {
    clipboard: arboard::Clipboard,
}

impl SystemClipboard {
    /// Connect to the system clipboard
    pub fn new() -> Result<Self, ClipboardError> {
        let clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        log::debug!("SystemClipboard initialized successfully");
        Ok(SystemClipboard { clipboard })
    }
}

impl ClipboardBackend for SystemClipboard {
    #[cfg(windows)]
    fn open(&mut self) -> Result<Box<dyn ClipboardSession + '_>, ClipboardError> {
        windows_session::WindowsSession::open().map(|s| Box::new(s) as Box<dyn ClipboardSession>)
    }

    #[cfg(not(windows))]
    fn open(&mut self) -> Result<Box<dyn ClipboardSession + '_>, ClipboardError> {
        Ok(Box::new(ArboardSession {
            clipboard: &mut self.clipboard,
        }))
    }

    fn get_text(&mut self) -> Result<Option<String>, ClipboardError> {
        match self.clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(ClipboardError::Access(e.to_string())),
        }
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::Access(e.to_string()))?;
        log::debug!("Wrote {} bytes text to clipboard", text.len());
        Ok(())
    }

    fn name(&self) -> &'static str {
        if cfg!(windows) { "Win32" } else { "arboard" }
    }
}

#[cfg(not(windows))]
struct ArboardSession<'a> {
    clipboard: &'a mut arboard::Clipboard,
}

#[cfg(not(windows))]
impl ClipboardSession for ArboardSession<'_> {
    fn has_format(&mut self, format: ClipboardFormat) -> bool {
        // arboard only exposes one decoded image; report it in the DIB slot
        format == ClipboardFormat::Dib
    }

    fn read_image(&mut self, format: ClipboardFormat) -> Result<ImagePayload, ClipboardError> {
        if format != ClipboardFormat::Dib {
            return Err(ClipboardError::Access(format!("{} not supported", format)));
        }

        let image = self.clipboard.get_image().map_err(|e| match e {
            arboard::Error::ContentNotAvailable => {
                ClipboardError::Access("no image on clipboard".to_string())
            }
            arboard::Error::ConversionFailure => ClipboardError::Decode(e.to_string()),
            other => ClipboardError::Unavailable(other.to_string()),
        })?;

        Ok(ImagePayload::Rgba {
            width: image.width as u32,
            height: image.height as u32,
            pixels: image.bytes.into_owned(),
        })
    }
}

#[cfg(windows)]
mod windows_session {
    use super::*;

    const CF_BITMAP: u32 = 2;
    const CF_DIB: u32 = 8;
    const OPEN_ATTEMPTS: usize = 10;

    /// Holds the clipboard open; `clipboard_win::Clipboard` closes it on drop
    pub(super) struct WindowsSession {
        _guard: clipboard_win::Clipboard,
    }

    impl WindowsSession {
        pub(super) fn open() -> Result<Self, ClipboardError> {
            let guard = clipboard_win::Clipboard::new_attempts(OPEN_ATTEMPTS)
                .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            Ok(WindowsSession { _guard: guard })
        }
    }

    fn format_id(format: ClipboardFormat) -> u32 {
        match format {
            ClipboardFormat::Dib => CF_DIB,
            ClipboardFormat::Bitmap => CF_BITMAP,
        }
    }

    impl ClipboardSession for WindowsSession {
        fn has_format(&mut self, format: ClipboardFormat) -> bool {
            clipboard_win::raw::is_format_avail(format_id(format))
        }

        fn read_image(&mut self, format: ClipboardFormat) -> Result<ImagePayload, ClipboardError> {
            let mut out = Vec::new();
            match format {
                ClipboardFormat::Dib => {
                    clipboard_win::raw::get_vec(CF_DIB, &mut out)
                        .map_err(|e| ClipboardError::Access(e.to_string()))?;
                    Ok(ImagePayload::Dib(out))
                }
                ClipboardFormat::Bitmap => {
                    clipboard_win::raw::get_bitmap(&mut out)
                        .map_err(|e| ClipboardError::Access(e.to_string()))?;
                    Ok(ImagePayload::Bmp(out))
                }
            }
        }
    }
}
