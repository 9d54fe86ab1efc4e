use enigo::{
    Direction::{Click, Press, Release},
    Enigo, Key, Keyboard, Settings,
};

use super::injector::InjectError;

/// Synthetic keyboard input sent to the focused window
pub trait InputBackend {
    /// Send the platform paste chord (Ctrl+V, Cmd+V on macOS)
    fn paste_chord(&mut self) -> Result<(), InjectError>;

    /// Type `text` as individual keystrokes
    fn type_text(&mut self, text: &str) -> Result<(), InjectError>;
}

/// `enigo` keyboard controller
///
/// Not `Send` on every platform, so it is created on the thread that uses it.
pub struct EnigoInput {
    enigo: Enigo,
}

impl EnigoInput {
    pub fn new() -> Result<Self, InjectError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| InjectError::Input(format!("Failed to create keyboard controller: {}", e)))?;
        Ok(EnigoInput { enigo })
    }
}

impl InputBackend for EnigoInput {
    fn paste_chord(&mut self) -> Result<(), InjectError> {
        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        let enigo = &mut self.enigo;
        let result = enigo
            .key(modifier, Press)
            .and_then(|_| enigo.key(Key::Unicode('v'), Click));
        // Never leave the modifier held down
        let released = enigo.key(modifier, Release);

        result
            .and(released)
            .map_err(|e| InjectError::Input(format!("Paste chord failed: {}", e)))
    }

    fn type_text(&mut self, text: &str) -> Result<(), InjectError> {
        self.enigo
            .text(text)
            .map_err(|e| InjectError::Input(format!("Typing failed: {}", e)))
    }
}

/// Stand-in used when no keyboard controller could be created
///
/// Every call fails, so paste actions report an error while the copy
/// action keeps working.
pub struct UnavailableInput {
    reason: String,
}

impl UnavailableInput {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableInput {
            reason: reason.into(),
        }
    }
}

impl InputBackend for UnavailableInput {
    fn paste_chord(&mut self) -> Result<(), InjectError> {
        Err(InjectError::Input(self.reason.clone()))
    }

    fn type_text(&mut self, _text: &str) -> Result<(), InjectError> {
        Err(InjectError::Input(self.reason.clone()))
    }
}

impl<I: InputBackend + ?Sized> InputBackend for Box<I> {
    fn paste_chord(&mut self) -> Result<(), InjectError> {
        (**self).paste_chord()
    }

    fn type_text(&mut self, text: &str) -> Result<(), InjectError> {
        (**self).type_text(text)
    }
}

/// Keyboard controller for the current thread, or `UnavailableInput`
pub fn system_input() -> Box<dyn InputBackend> {
    match EnigoInput::new() {
        Ok(input) => Box::new(input),
        Err(e) => {
            log::error!("{}", e);
            Box::new(UnavailableInput::new(e.to_string()))
        }
    }
}
