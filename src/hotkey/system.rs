use global_hotkey::GlobalHotKeyManager;
use global_hotkey::hotkey::{Code, HotKey, Modifiers as OsModifiers};
use std::collections::HashMap;

use super::backend::{HotkeyBackend, HotkeyError, HotkeyId};
use super::combination::{Combination, Key, Modifiers};

/// Hotkey backend on top of the `global-hotkey` crate
///
/// On Windows the manager owns a hidden window, so it must be created, used
/// and dropped on one thread that also pumps messages. The hotkey service
/// takes care of that.
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    registered: HashMap<HotkeyId, HotKey>,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Result<Self, HotkeyError> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| HotkeyError::Unavailable(e.to_string()))?;
        log::debug!("Global hotkey manager created");
        Ok(GlobalHotkeyBackend {
            manager,
            registered: HashMap::new(),
        })
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(&mut self, combination: &Combination) -> Result<HotkeyId, HotkeyError> {
        let hotkey = to_os_hotkey(combination)?;

        self.manager.register(hotkey).map_err(|e| match e {
            global_hotkey::Error::AlreadyRegistered(_) | global_hotkey::Error::FailedToRegister(_) => {
                HotkeyError::Conflict {
                    combination: combination.to_string(),
                    reason: e.to_string(),
                }
            }
            other => HotkeyError::Unavailable(other.to_string()),
        })?;

        let id = hotkey.id();
        self.registered.insert(id, hotkey);
        Ok(id)
    }

    fn unregister(&mut self, id: HotkeyId) -> Result<(), HotkeyError> {
        let hotkey = self
            .registered
            .remove(&id)
            .ok_or_else(|| HotkeyError::NotBound(format!("id {}", id)))?;

        self.manager
            .unregister(hotkey)
            .map_err(|e| HotkeyError::NotBound(e.to_string()))
    }
}

/// Translate a combination into the OS-level hotkey
pub fn to_os_hotkey(combination: &Combination) -> Result<HotKey, HotkeyError> {
    let modifiers = combination.modifiers();
    let mut os_modifiers = OsModifiers::empty();
    if modifiers.contains(Modifiers::CTRL) {
        os_modifiers |= OsModifiers::CONTROL;
    }
    if modifiers.contains(Modifiers::ALT) {
        os_modifiers |= OsModifiers::ALT;
    }
    if modifiers.contains(Modifiers::SHIFT) {
        os_modifiers |= OsModifiers::SHIFT;
    }
    if modifiers.contains(Modifiers::SUPER) {
        os_modifiers |= OsModifiers::SUPER;
    }

    let code = key_code(combination.key()).ok_or_else(|| {
        HotkeyError::Unavailable(format!("no key code for {}", combination.key()))
    })?;

    Ok(HotKey::new(Some(os_modifiers), code))
}

fn key_code(key: Key) -> Option<Code> {
    let code = match key {
        Key::Letter(c) => match c {
            'a' => Code::KeyA,
            'b' => Code::KeyB,
            'c' => Code::KeyC,
            'd' => Code::KeyD,
            'e' => Code::KeyE,
            'f' => Code::KeyF,
            'g' => Code::KeyG,
            'h' => Code::KeyH,
            'i' => Code::KeyI,
            'j' => Code::KeyJ,
            'k' => Code::KeyK,
            'l' => Code::KeyL,
            'm' => Code::KeyM,
            'n' => Code::KeyN,
            'o' => Code::KeyO,
            'p' => Code::KeyP,
            'q' => Code::KeyQ,
            'r' => Code::KeyR,
            's' => Code::KeyS,
            't' => Code::KeyT,
            'u' => Code::KeyU,
            'v' => Code::KeyV,
            'w' => Code::KeyW,
            'x' => Code::KeyX,
            'y' => Code::KeyY,
            'z' => Code::KeyZ,
            _ => return None,
        },
        Key::Digit(c) => match c {
            '0' => Code::Digit0,
            '1' => Code::Digit1,
            '2' => Code::Digit2,
            '3' => Code::Digit3,
            '4' => Code::Digit4,
            '5' => Code::Digit5,
            '6' => Code::Digit6,
            '7' => Code::Digit7,
            '8' => Code::Digit8,
            '9' => Code::Digit9,
            _ => return None,
        },
        Key::Function(n) => match n {
            1 => Code::F1,
            2 => Code::F2,
            3 => Code::F3,
            4 => Code::F4,
            5 => Code::F5,
            6 => Code::F6,
            7 => Code::F7,
            8 => Code::F8,
            9 => Code::F9,
            10 => Code::F10,
            11 => Code::F11,
            12 => Code::F12,
            _ => return None,
        },
    };
    Some(code)
}
