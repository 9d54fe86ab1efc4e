pub mod fingerprint;
pub mod store;

pub use fingerprint::{Fingerprint, fingerprint};
pub use store::{ImageStore, StoreError};
