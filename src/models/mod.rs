pub mod latest;
pub mod screenshot;

pub use latest::LatestFileRegistry;
pub use screenshot::{ClipboardImage, SavedScreenshot};
