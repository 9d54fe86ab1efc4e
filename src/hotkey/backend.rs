use std::fmt;

use super::combination::{Combination, CombinationError};

/// Identifier the OS layer assigns to a registered hotkey
pub type HotkeyId = u32;

/// Hotkey registration failures
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    /// Combination is already owned, usually by another process
    #[error("Hotkey {combination} is already in use: {reason}")]
    Conflict { combination: String, reason: String },

    /// Primary combination and every fallback failed
    #[error("No hotkey could be registered (tried {})", tried.join(", "))]
    Exhausted { tried: Vec<String> },

    #[error("Hotkey {0} is not bound")]
    NotBound(String),

    /// The OS hotkey facility could not be initialised or has stopped
    #[error("Global hotkeys unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    InvalidCombination(#[from] CombinationError),
}

/// What a hotkey does when pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyAction {
    /// Paste the latest screenshot path at the caret
    PastePath,
    /// Copy the latest screenshot path to the clipboard only
    CopyPath,
}

impl fmt::Display for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotkeyAction::PastePath => write!(f, "paste latest path"),
            HotkeyAction::CopyPath => write!(f, "copy latest path"),
        }
    }
}

/// A combination bound to an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub combination: Combination,
    pub action: HotkeyAction,
}

/// Trait for OS hotkey registration
/// Registration is system-wide: the hotkey fires whichever window has focus.
pub trait HotkeyBackend {
    /// Register a combination, reporting conflicts as `HotkeyError::Conflict`
    fn register(&mut self, combination: &Combination) -> Result<HotkeyId, HotkeyError>;

    /// Release a previously registered hotkey
    fn unregister(&mut self, id: HotkeyId) -> Result<(), HotkeyError>;
}
