//! Getting the latest screenshot path into the focused application

pub mod injector;
pub mod input;

pub use injector::{ClipboardSwap, InjectError, Injection, InjectorTiming, PathInjector};
pub use input::{EnigoInput, InputBackend, UnavailableInput, system_input};
