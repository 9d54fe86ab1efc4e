//! In-memory stand-ins for the clipboard, synthetic input and OS hotkeys

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::app::AppContext;

use crate::clipboard::{
    ClipboardBackend, ClipboardError, ClipboardFormat, ClipboardSession, ImagePayload,
};
use crate::hotkey::{Combination, HotkeyBackend, HotkeyError, HotkeyId};
use crate::inject::{InjectError, InputBackend};
use crate::storage::{Config, ConfigStorage, JsonConfigStorage};
use crate::ui::Notifier;

/// Context with its config file in `dir` and screenshots under `dir/shots`
pub fn test_context(dir: &Path) -> Arc<AppContext> {
    test_context_with(dir, dir.join("shots"))
}

/// Context with its config file in `dir` saving to `save_path`
pub fn test_context_with(dir: &Path, save_path: PathBuf) -> Arc<AppContext> {
    let storage = JsonConfigStorage::new(dir.join("screenshot_config.json"));
    storage
        .save(&Config {
            save_path,
            hotkey: "ctrl+alt+p".to_string(),
        })
        .unwrap();
    Arc::new(AppContext::load(Box::new(storage), None).unwrap())
}

#[derive(Debug, Default)]
struct ClipboardState {
    images: HashMap<ClipboardFormat, ImagePayload>,
    text: Option<String>,
    opens: usize,
    closes: usize,
    fail_open: bool,
    fail_set_text: bool,
    text_writes: Vec<String>,
}

/// Clipboard backed by shared state; clones observe the same clipboard
#[derive(Debug, Clone, Default)]
pub struct FakeClipboard {
    state: Arc<Mutex<ClipboardState>>,
}

impl FakeClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ClipboardState> {
        self.state.lock().unwrap()
    }

    pub fn put_image(&self, format: ClipboardFormat, payload: ImagePayload) {
        let mut state = self.state();
        state.text = None;
        state.images.insert(format, payload);
    }

    /// Replace the content with a single RGBA image, as a copy would
    pub fn copy_image(&self, width: u32, height: u32, color: [u8; 4]) {
        let mut state = self.state();
        state.text = None;
        state.images.clear();
        state
            .images
            .insert(ClipboardFormat::Dib, rgba_payload(width, height, color));
    }

    pub fn put_text(&self, text: &str) {
        let mut state = self.state();
        state.images.clear();
        state.text = Some(text.to_string());
    }

    pub fn text(&self) -> Option<String> {
        self.state().text.clone()
    }

    pub fn text_writes(&self) -> Vec<String> {
        self.state().text_writes.clone()
    }

    pub fn opens(&self) -> usize {
        self.state().opens
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }

    pub fn fail_open(&self, fail: bool) {
        self.state().fail_open = fail;
    }

    pub fn fail_set_text(&self, fail: bool) {
        self.state().fail_set_text = fail;
    }
}

struct FakeSession {
    state: Arc<Mutex<ClipboardState>>,
}

impl ClipboardSession for FakeSession {
    fn has_format(&mut self, format: ClipboardFormat) -> bool {
        self.state.lock().unwrap().images.contains_key(&format)
    }

    fn read_image(&mut self, format: ClipboardFormat) -> Result<ImagePayload, ClipboardError> {
        self.state
            .lock()
            .unwrap()
            .images
            .get(&format)
            .cloned()
            .ok_or_else(|| ClipboardError::Access(format!("{} not available", format)))
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.closes += 1;
        }
    }
}

impl ClipboardBackend for FakeClipboard {
    fn open(&mut self) -> Result<Box<dyn ClipboardSession + '_>, ClipboardError> {
        let mut state = self.state();
        if state.fail_open {
            return Err(ClipboardError::Unavailable("held by another process".to_string()));
        }
        state.opens += 1;
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
        }))
    }

    fn get_text(&mut self) -> Result<Option<String>, ClipboardError> {
        Ok(self.state().text.clone())
    }

    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut state = self.state();
        if state.fail_set_text {
            return Err(ClipboardError::Access("set_text rejected".to_string()));
        }
        state.images.clear();
        state.text = Some(text.to_string());
        state.text_writes.push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Fake"
    }
}

/// Solid-colour RGBA payload
pub fn rgba_payload(width: u32, height: u32, color: [u8; 4]) -> ImagePayload {
    ImagePayload::Rgba {
        width,
        height,
        pixels: color
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect(),
    }
}

/// Build a packed 24-bit DIB; `pixel(x, y)` returns RGB with y counted from the top
pub fn dib_24bit(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 3]) -> Vec<u8> {
    let row_len = (width as usize * 3).div_ceil(4) * 4;
    let mut dib = Vec::with_capacity(40 + row_len * height as usize);
    dib.extend_from_slice(&40u32.to_le_bytes());
    dib.extend_from_slice(&(width as i32).to_le_bytes());
    dib.extend_from_slice(&(height as i32).to_le_bytes());
    dib.extend_from_slice(&1u16.to_le_bytes());
    dib.extend_from_slice(&24u16.to_le_bytes());
    dib.extend_from_slice(&0u32.to_le_bytes());
    dib.extend_from_slice(&((row_len * height as usize) as u32).to_le_bytes());
    dib.extend_from_slice(&2835i32.to_le_bytes());
    dib.extend_from_slice(&2835i32.to_le_bytes());
    dib.extend_from_slice(&0u32.to_le_bytes());
    dib.extend_from_slice(&0u32.to_le_bytes());

    for y in (0..height).rev() {
        let start = dib.len();
        for x in 0..width {
            let [r, g, b] = pixel(x, y);
            dib.extend_from_slice(&[b, g, r]);
        }
        dib.resize(start + row_len, 0);
    }
    dib
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Paste,
    Typed(String),
}

#[derive(Debug, Default)]
struct InputState {
    events: Vec<InputEvent>,
    fail_paste: bool,
    fail_typing: bool,
}

/// Records synthetic input instead of sending it
#[derive(Debug, Clone, Default)]
pub struct FakeInput {
    state: Arc<Mutex<InputState>>,
}

impl FakeInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn fail_paste(&self, fail: bool) {
        self.state.lock().unwrap().fail_paste = fail;
    }

    pub fn fail_typing(&self, fail: bool) {
        self.state.lock().unwrap().fail_typing = fail;
    }
}

impl InputBackend for FakeInput {
    fn paste_chord(&mut self) -> Result<(), InjectError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_paste {
            return Err(InjectError::Input("paste chord rejected".to_string()));
        }
        state.events.push(InputEvent::Paste);
        Ok(())
    }

    fn type_text(&mut self, text: &str) -> Result<(), InjectError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_typing {
            return Err(InjectError::Input("typing rejected".to_string()));
        }
        state.events.push(InputEvent::Typed(text.to_string()));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct HotkeyState {
    /// Combinations owned by some other process
    taken: HashSet<String>,
    registered: HashMap<HotkeyId, String>,
    attempts: Vec<String>,
    next_id: HotkeyId,
}

/// OS hotkey table with configurable conflicts
#[derive(Debug, Clone, Default)]
pub struct FakeHotkeys {
    state: Arc<Mutex<HotkeyState>>,
}

impl FakeHotkeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a combination as owned by another process
    pub fn take(&self, combination: &str) {
        self.state
            .lock()
            .unwrap()
            .taken
            .insert(combination.to_string());
    }

    /// Simulate another process stealing a combination we hold
    pub fn steal(&self, combination: &str) {
        let mut state = self.state.lock().unwrap();
        state.registered.retain(|_, c| c != combination);
        state.taken.insert(combination.to_string());
    }

    pub fn release(&self, combination: &str) {
        self.state.lock().unwrap().taken.remove(combination);
    }

    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().attempts.clone()
    }

    pub fn registered(&self) -> Vec<String> {
        let mut registered: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .registered
            .values()
            .cloned()
            .collect();
        registered.sort();
        registered
    }
}

impl HotkeyBackend for FakeHotkeys {
    fn register(&mut self, combination: &Combination) -> Result<HotkeyId, HotkeyError> {
        let mut state = self.state.lock().unwrap();
        let name = combination.to_string();
        state.attempts.push(name.clone());
        if state.taken.contains(&name) || state.registered.values().any(|c| *c == name) {
            return Err(HotkeyError::Conflict {
                combination: name,
                reason: "owned by another process".to_string(),
            });
        }
        state.next_id += 1;
        let id = state.next_id;
        state.registered.insert(id, name);
        Ok(id)
    }

    fn unregister(&mut self, id: HotkeyId) -> Result<(), HotkeyError> {
        let mut state = self.state.lock().unwrap();
        match state.registered.remove(&id) {
            Some(_) => Ok(()),
            None => Err(HotkeyError::NotBound(format!("id {}", id))),
        }
    }
}

/// Collects notices instead of printing them
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn record(&self, title: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{}: {}", title, message));
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, title: &str, message: &str) {
        self.record(title, message);
    }

    fn warn(&self, title: &str, message: &str) {
        self.record(title, message);
    }

    fn fatal(&self, title: &str, message: &str) {
        self.record(title, message);
    }
}
