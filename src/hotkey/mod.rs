//! System-wide hotkeys: parsing, registration with fallbacks, and the
//! service thread that owns the OS registrations

pub mod backend;
pub mod combination;
pub mod dispatcher;
pub mod service;
pub mod system;

pub use backend::{HotkeyAction, HotkeyBackend, HotkeyBinding, HotkeyError, HotkeyId};
pub use combination::{Combination, CombinationError, Key, Modifiers};
pub use dispatcher::{
    COPY_HOTKEY, FALLBACK_HOTKEYS, HotkeyDispatcher, copy_combination, default_primary,
    validate_primary,
};
pub use service::{HotkeyHandle, HotkeyService, ServiceSettings, StartupReport};
pub use system::GlobalHotkeyBackend;
