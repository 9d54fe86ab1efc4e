//! shotpath - saves clipboard screenshots and pastes their path on a hotkey
//!
//! This library exports the core modules for testing and potential reuse.

pub mod app;
pub mod clipboard;
pub mod hotkey;
pub mod image;
pub mod inject;
pub mod logging;
pub mod models;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod testing;
