use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::clipboard::{self, ClipboardWatcher, SharedClipboard, backend};
use crate::hotkey::{Combination, HotkeyAction, HotkeyService, ServiceSettings, StartupReport};
use crate::image::ImageStore;
use crate::inject::{EnigoInput, InjectError, Injection, InputBackend, PathInjector, system_input};
use crate::models::LatestFileRegistry;
use crate::storage::{Config, ConfigStorage, JsonConfigStorage};
use crate::ui::{self, Notifier};

/// Consecutive injection failures before the hotkeys are re-registered
pub const REFRESH_AFTER_FAILURES: u32 = 2;

/// Process-wide state shared by the watcher, the hotkey thread and the
/// action worker
pub struct AppContext {
    storage: Box<dyn ConfigStorage>,
    config: Mutex<Config>,
    /// Absolute form of `config.save_path`, or a session override
    save_dir: RwLock<PathBuf>,
    latest: LatestFileRegistry,
}

impl AppContext {
    /// Load the persisted config
    ///
    /// `save_path_override` replaces the configured directory for this
    /// session without being written back.
    pub fn load(storage: Box<dyn ConfigStorage>, save_path_override: Option<PathBuf>) -> Result<Self> {
        let config = storage.load()?;
        let save_path = save_path_override.unwrap_or_else(|| config.save_path.clone());
        let save_dir = absolute(&save_path)?;

        log::info!("Screenshots will be saved to {}", save_dir.display());

        Ok(AppContext {
            storage,
            config: Mutex::new(config),
            save_dir: RwLock::new(save_dir),
            latest: LatestFileRegistry::new(),
        })
    }

    /// Absolute directory new screenshots are written to
    pub fn save_dir(&self) -> PathBuf {
        self.save_dir
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create the save directory if it is missing
    pub fn ensure_save_dir(&self) -> Result<PathBuf> {
        let dir = self.save_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create save directory {:?}", dir))?;
        Ok(dir)
    }

    /// Switch to a new save directory and persist it
    pub fn set_save_path(&self, path: &Path) -> Result<PathBuf> {
        let new_dir = absolute(path)?;
        fs::create_dir_all(&new_dir)
            .with_context(|| format!("Failed to create save directory {:?}", new_dir))?;

        self.update_config(|config| config.save_path = new_dir.clone())?;

        let mut save_dir = self.save_dir.write().unwrap_or_else(PoisonError::into_inner);
        log::info!(
            "Save path changed: {} -> {}",
            save_dir.display(),
            new_dir.display()
        );
        *save_dir = new_dir.clone();
        Ok(new_dir)
    }

    /// Configured primary hotkey string
    pub fn hotkey(&self) -> String {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .hotkey
            .clone()
    }

    /// Persist a new primary hotkey
    pub fn set_hotkey(&self, combination: &Combination) -> Result<()> {
        let hotkey = combination.to_string();
        self.update_config(|config| config.hotkey = hotkey.clone())?;
        log::info!("Hotkey set to {}", combination.label());
        Ok(())
    }

    /// Snapshot of the persisted settings
    pub fn config(&self) -> Config {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config_path(&self) -> &Path {
        self.storage.path()
    }

    pub fn latest(&self) -> &LatestFileRegistry {
        &self.latest
    }

    /// Apply `change`, write it out, and keep it only if the write worked
    fn update_config(&self, change: impl FnOnce(&mut Config)) -> Result<()> {
        let mut config = self.config.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = config.clone();
        change(&mut updated);
        self.storage.save(&updated)?;
        *config = updated;
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve path {:?}", path))
}

/// Cloneable stop flag set by Ctrl+C / SIGTERM
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    const SLICE: Duration = Duration::from_millis(50);

    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag on SIGINT and SIGTERM
    pub fn register_signals(&self) -> Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};

        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.flag))
                .with_context(|| format!("Failed to register handler for signal {}", signal))?;
        }
        Ok(())
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep up to `duration`, waking early on shutdown
    ///
    /// Returns whether shutdown was requested.
    pub fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        while !self.is_triggered() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(Self::SLICE));
        }
        self.is_triggered()
    }
}

/// Runs hotkey actions and tracks repeated failures
pub struct ActionRunner<I: InputBackend> {
    injector: PathInjector<I>,
    ctx: Arc<AppContext>,
    notifier: Arc<dyn Notifier>,
    refresh_hotkeys: Box<dyn Fn() + Send>,
    consecutive_failures: u32,
}

impl<I: InputBackend> ActionRunner<I> {
    pub fn new(
        injector: PathInjector<I>,
        ctx: Arc<AppContext>,
        notifier: Arc<dyn Notifier>,
        refresh_hotkeys: impl Fn() + Send + 'static,
    ) -> Self {
        ActionRunner {
            injector,
            ctx,
            notifier,
            refresh_hotkeys: Box::new(refresh_hotkeys),
            consecutive_failures: 0,
        }
    }

    pub fn handle(&mut self, action: HotkeyAction) -> Result<Injection, InjectError> {
        let latest = self.ctx.latest();
        let result = match action {
            HotkeyAction::PastePath => self.injector.inject_latest(latest),
            HotkeyAction::CopyPath => self.injector.copy_latest(latest),
        };

        match &result {
            Ok(_) => self.consecutive_failures = 0,
            Err(InjectError::NothingSaved) => {
                log::info!("Hotkey pressed before any screenshot was saved");
                self.notifier.info("Nothing saved yet", &ui::nothing_saved_message());
            }
            Err(InjectError::NotFound(path)) => {
                log::warn!("Latest screenshot missing: {}", path.display());
                self.notifier.warn("File missing", &ui::missing_file_message(path));
            }
            Err(e) => {
                self.consecutive_failures += 1;
                log::error!(
                    "{} failed ({} in a row): {}",
                    action,
                    self.consecutive_failures,
                    e
                );
                self.notifier.warn(
                    ui::action_failed_title(action),
                    &ui::action_failed_message(action, e),
                );
                if self.consecutive_failures >= REFRESH_AFTER_FAILURES {
                    self.consecutive_failures = 0;
                    (self.refresh_hotkeys)();
                    self.notifier.warn("Paste failed", &ui::paste_failed_message());
                }
            }
        }

        result
    }

    pub fn wait_for_restore(&mut self) {
        self.injector.wait_for_restore();
    }
}

/// Thread executing hotkey actions in arrival order
fn spawn_action_worker(
    clipboard: SharedClipboard,
    ctx: Arc<AppContext>,
    notifier: Arc<dyn Notifier>,
    refresh_hotkeys: impl Fn() + Send + 'static,
    actions: Receiver<HotkeyAction>,
    shutdown: Shutdown,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("actions".to_string())
        .spawn(move || {
            // The keyboard controller stays on this thread
            let injector = PathInjector::new(clipboard, system_input());
            let mut runner = ActionRunner::new(injector, ctx, notifier, refresh_hotkeys);

            loop {
                match actions.recv_timeout(Duration::from_millis(200)) {
                    Ok(action) => {
                        let _ = runner.handle(action);
                    }
                    Err(RecvTimeoutError::Timeout) if shutdown.is_triggered() => break,
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            runner.wait_for_restore();
            log::debug!("Action worker stopped");
        })
        .context("Failed to spawn action worker")
}

/// Settings for `start`
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub config_path: PathBuf,
    /// Session-only save directory
    pub save_path: Option<PathBuf>,
}

/// Run until Ctrl+C: watch the clipboard and serve the hotkeys
pub fn start(options: StartOptions, notifier: Arc<dyn Notifier>) -> Result<()> {
    let storage = JsonConfigStorage::new(options.config_path);
    let ctx = match AppContext::load(Box::new(storage), options.save_path)
        .and_then(|ctx| ctx.ensure_save_dir().map(|_| ctx))
    {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            notifier.fatal("Cannot start", &format!("{:#}", e));
            return Err(e);
        }
    };

    let clipboard = match clipboard::create_backend() {
        Ok(clipboard) => clipboard,
        Err(e) => {
            notifier.fatal("Clipboard unavailable", &e.to_string());
            return Err(e).context("Failed to open clipboard");
        }
    };

    let shutdown = Shutdown::new();
    shutdown.register_signals()?;

    let (action_tx, action_rx) = mpsc::channel();
    let (hotkeys, report) =
        match HotkeyService::spawn(Arc::clone(&ctx), action_tx, ServiceSettings::default()) {
            Ok((service, report)) => (Some(service), report),
            Err(e) => {
                log::error!("Global hotkeys unavailable: {}", e);
                let report = StartupReport {
                    primary: Err(e.to_string()),
                    copy_bound: false,
                };
                (None, report)
            }
        };

    let handle = hotkeys.as_ref().map(HotkeyService::handle);
    let worker = spawn_action_worker(
        Arc::clone(&clipboard),
        Arc::clone(&ctx),
        Arc::clone(&notifier),
        move || {
            if let Some(handle) = &handle {
                handle.refresh();
            }
        },
        action_rx,
        shutdown.clone(),
    )?;

    if report.any_bound() {
        notifier.info("shotpath running", &ui::startup_message(&report, &ctx.save_dir()));
    } else {
        notifier.warn("Hotkeys unavailable", &ui::startup_message(&report, &ctx.save_dir()));
    }

    let mut watcher = ClipboardWatcher::new(clipboard, ImageStore::new(), Arc::clone(&ctx));
    watcher.run(&shutdown);

    log::info!("Shutting down");
    if let Some(hotkeys) = hotkeys {
        hotkeys.shutdown();
    }
    if worker.join().is_err() {
        log::error!("Action worker panicked");
    }

    Ok(())
}

/// Outcome of one self-test check
#[derive(Debug, Clone)]
pub struct SelfCheck {
    pub name: &'static str,
    pub outcome: std::result::Result<String, String>,
}

impl SelfCheck {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Verify clipboard access, keyboard simulation and the save directory
pub fn self_test(clipboard: &SharedClipboard, ctx: &AppContext) -> Vec<SelfCheck> {
    let checks = vec![
        SelfCheck {
            name: "clipboard",
            outcome: check_clipboard(clipboard),
        },
        SelfCheck {
            name: "keyboard",
            outcome: EnigoInput::new()
                .map(|_| "keyboard controller created".to_string())
                .map_err(|e| e.to_string()),
        },
        SelfCheck {
            name: "save directory",
            outcome: check_save_dir(ctx),
        },
    ];

    for check in &checks {
        match &check.outcome {
            Ok(detail) => log::info!("Self-test {}: ok ({})", check.name, detail),
            Err(e) => log::error!("Self-test {}: FAILED ({})", check.name, e),
        }
    }
    checks
}

const CHECK_TEXT: &str = "shotpath self-test";

/// Write a marker string, read it back, put the previous text back
fn check_clipboard(clipboard: &SharedClipboard) -> std::result::Result<String, String> {
    let mut backend = backend::lock(clipboard).map_err(|e| e.to_string())?;
    let previous = backend.get_text().map_err(|e| e.to_string())?;

    backend.set_text(CHECK_TEXT).map_err(|e| e.to_string())?;
    let read_back = backend.get_text().map_err(|e| e.to_string())?;

    if let Some(previous) = previous.as_deref().filter(|text| !text.is_empty())
        && let Err(e) = backend.set_text(previous)
    {
        log::warn!("Self-test could not restore clipboard: {}", e);
    }

    if read_back.as_deref() == Some(CHECK_TEXT) {
        Ok(format!("{} text round-trip", backend.name()))
    } else {
        Err(format!("read back {:?} instead of the marker text", read_back))
    }
}

fn check_save_dir(ctx: &AppContext) -> std::result::Result<String, String> {
    let dir = ctx.ensure_save_dir().map_err(|e| format!("{:#}", e))?;
    let marker = dir.join(".shotpath-write-test");
    fs::write(&marker, b"ok").map_err(|e| format!("{} is not writable: {}", dir.display(), e))?;
    let _ = fs::remove_file(&marker);
    Ok(format!("{} is writable", dir.display()))
}
