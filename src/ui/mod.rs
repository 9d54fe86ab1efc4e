//! User-facing messages
//!
//! Dialogs are out of scope: everything goes through `Notifier`, and the
//! console implementation prints to stdout/stderr.

use std::fmt;
use std::path::Path;

use crate::hotkey::{COPY_HOTKEY, HotkeyAction, StartupReport};

/// Where status messages for the user end up
pub trait Notifier: Send + Sync {
    fn info(&self, title: &str, message: &str);
    fn warn(&self, title: &str, message: &str);
    /// Startup cannot continue
    fn fatal(&self, title: &str, message: &str);
}

/// Prints notices to the terminal
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, title: &str, message: &str) {
        println!("[{}]\n{}\n", title, message);
    }

    fn warn(&self, title: &str, message: &str) {
        log::warn!("{}: {}", title, message);
        eprintln!("[{}]\n{}\n", title, message);
    }

    fn fatal(&self, title: &str, message: &str) {
        log::error!("{}: {}", title, message);
        eprintln!("[{}] FATAL\n{}\n", title, message);
    }
}

fn copy_label() -> String {
    COPY_HOTKEY.to_uppercase()
}

/// Notice shown once the watcher and hotkeys are up
pub fn startup_message(report: &StartupReport, save_dir: &Path) -> String {
    let mut lines = vec![format!("Saving screenshots to: {}", save_dir.display())];

    match &report.primary {
        Ok(combination) => lines.push(format!(
            "Press {} to paste the latest screenshot path",
            combination.label()
        )),
        Err(reason) => lines.push(format!("Paste hotkey unavailable: {}", reason)),
    }

    if report.copy_bound {
        lines.push(format!(
            "Press {} to copy the latest screenshot path",
            copy_label()
        ));
    } else {
        lines.push(format!("Backup hotkey {} unavailable", copy_label()));
    }

    lines.push("Press Ctrl+C to exit".to_string());
    lines.join("\n")
}

pub fn nothing_saved_message() -> String {
    "No screenshot has been saved yet. Copy an image to the clipboard first.".to_string()
}

pub fn missing_file_message(path: &Path) -> String {
    format!("The latest screenshot no longer exists:\n{}", path.display())
}

pub fn action_failed_title(action: HotkeyAction) -> &'static str {
    match action {
        HotkeyAction::PastePath => "Paste failed",
        HotkeyAction::CopyPath => "Copy failed",
    }
}

/// Notice for a single failed hotkey action
pub fn action_failed_message(action: HotkeyAction, error: &dyn fmt::Display) -> String {
    match action {
        HotkeyAction::PastePath => format!(
            "Could not paste the screenshot path: {}\n\
             Use {} to copy the path and paste it manually.",
            error,
            copy_label()
        ),
        HotkeyAction::CopyPath => format!("Could not copy the screenshot path: {}", error),
    }
}

pub fn paste_failed_message() -> String {
    format!(
        "Pasting the path failed repeatedly, hotkeys have been re-registered.\n\
         Use {} to copy the path and paste it manually.",
        copy_label()
    )
}
