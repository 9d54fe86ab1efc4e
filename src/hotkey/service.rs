use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use global_hotkey::{GlobalHotKeyEvent, HotKeyState};

use super::backend::{HotkeyAction, HotkeyBackend, HotkeyError};
use super::combination::Combination;
use super::dispatcher::{HotkeyDispatcher, copy_combination, default_primary, validate_primary};
use super::system::GlobalHotkeyBackend;
use crate::app::AppContext;

/// Timing of the hotkey thread
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    /// Period of the registration health check
    pub health_interval: Duration,
    /// Sleep between message pumps
    pub idle: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            health_interval: Duration::from_secs(50),
            idle: Duration::from_millis(20),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HotkeyCommand {
    Refresh,
    Shutdown,
}

/// Cloneable handle for asking the hotkey thread to re-register
#[derive(Debug, Clone)]
pub struct HotkeyHandle {
    commands: Sender<HotkeyCommand>,
}

impl HotkeyHandle {
    /// Re-register the hotkeys as soon as the service thread wakes up
    pub fn refresh(&self) {
        if self.commands.send(HotkeyCommand::Refresh).is_err() {
            log::debug!("Hotkey service already stopped, refresh ignored");
        }
    }
}

/// What the service managed to bind on startup
#[derive(Debug, Clone)]
pub struct StartupReport {
    /// Active primary combination, or why none could be bound
    pub primary: Result<Combination, String>,
    /// Whether the fixed copy hotkey is bound
    pub copy_bound: bool,
}

impl StartupReport {
    pub fn any_bound(&self) -> bool {
        self.primary.is_ok() || self.copy_bound
    }
}

/// Owns the OS hotkey manager on a dedicated thread
///
/// The thread pumps platform messages, turns presses into `HotkeyAction`s
/// sent to the action worker, and re-registers the bindings every
/// `health_interval` or when asked through a `HotkeyHandle`.
pub struct HotkeyService {
    handle: HotkeyHandle,
    thread: Option<JoinHandle<()>>,
}

impl HotkeyService {
    /// Start the hotkey thread and wait for the initial registration
    pub fn spawn(
        ctx: Arc<AppContext>,
        actions: Sender<HotkeyAction>,
        settings: ServiceSettings,
    ) -> Result<(Self, StartupReport), HotkeyError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("hotkeys".to_string())
            .spawn(move || {
                let backend = match GlobalHotkeyBackend::new() {
                    Ok(backend) => backend,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let mut dispatcher = HotkeyDispatcher::new(backend);
                let report = install_bindings(&mut dispatcher, &ctx);
                let _ = ready_tx.send(Ok(report));

                run_loop(dispatcher, &ctx, &actions, &command_rx, settings);
            })
            .map_err(|e| HotkeyError::Unavailable(e.to_string()))?;

        let report = ready_rx.recv().map_err(|_| {
            HotkeyError::Unavailable("hotkey thread exited during startup".to_string())
        })??;

        let service = HotkeyService {
            handle: HotkeyHandle {
                commands: command_tx,
            },
            thread: Some(thread),
        };
        Ok((service, report))
    }

    pub fn handle(&self) -> HotkeyHandle {
        self.handle.clone()
    }

    /// Release all hotkeys and join the thread
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.handle.commands.send(HotkeyCommand::Shutdown);
            if thread.join().is_err() {
                log::error!("Hotkey thread panicked");
            }
        }
    }
}

impl Drop for HotkeyService {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Bind the configured primary hotkey (with fallbacks) and the copy hotkey
///
/// A fallback that had to be adopted is written back to the config so the
/// next start uses it directly.
pub fn install_bindings<B: HotkeyBackend>(
    dispatcher: &mut HotkeyDispatcher<B>,
    ctx: &AppContext,
) -> StartupReport {
    let preferred = configured_primary(ctx);

    let primary = match dispatcher.bind_with_fallback(preferred, HotkeyAction::PastePath) {
        Ok(active) => {
            persist_if_changed(ctx, active);
            Ok(active)
        }
        Err(e) => Err(e.to_string()),
    };

    let copy_bound = match dispatcher.bind(copy_combination(), HotkeyAction::CopyPath) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Backup hotkey {} failed: {}", copy_combination().label(), e);
            false
        }
    };

    StartupReport {
        primary,
        copy_bound,
    }
}

/// Health check: re-register both hotkeys, persisting a changed primary
pub fn refresh_bindings<B: HotkeyBackend>(dispatcher: &mut HotkeyDispatcher<B>, ctx: &AppContext) {
    match dispatcher.reassert(HotkeyAction::PastePath, configured_primary(ctx)) {
        Ok(active) => persist_if_changed(ctx, active),
        Err(e) => log::error!("Hotkey refresh failed: {}", e),
    }

    // The copy hotkey is fixed, no fallbacks
    if let Err(e) = dispatcher.bind(copy_combination(), HotkeyAction::CopyPath) {
        log::debug!("Backup hotkey still unavailable: {}", e);
    }
}

fn configured_primary(ctx: &AppContext) -> Combination {
    let configured = ctx.hotkey();
    let parsed = configured
        .parse::<Combination>()
        .map_err(HotkeyError::from)
        .and_then(validate_primary);
    match parsed {
        Ok(combination) => combination,
        Err(e) => {
            let fallback = default_primary();
            log::warn!(
                "Configured hotkey '{}' is invalid ({}), using {}",
                configured,
                e,
                fallback.label()
            );
            fallback
        }
    }
}

fn persist_if_changed(ctx: &AppContext, active: Combination) {
    if ctx.hotkey().parse::<Combination>().ok() == Some(active) {
        return;
    }

    match ctx.set_hotkey(&active) {
        Ok(()) => log::info!("Saved working hotkey {} to config", active.label()),
        Err(e) => log::warn!("Could not persist hotkey {}: {:#}", active.label(), e),
    }
}

fn run_loop(
    mut dispatcher: HotkeyDispatcher<GlobalHotkeyBackend>,
    ctx: &AppContext,
    actions: &Sender<HotkeyAction>,
    commands: &Receiver<HotkeyCommand>,
    settings: ServiceSettings,
) {
    let events = GlobalHotKeyEvent::receiver();
    let mut last_check = Instant::now();

    loop {
        pump_platform_messages();

        while let Ok(event) = events.try_recv() {
            if event.state != HotKeyState::Pressed {
                continue;
            }
            match dispatcher.action_for(event.id) {
                Some(action) => {
                    log::debug!("Hotkey pressed: {}", action);
                    if actions.send(action).is_err() {
                        log::warn!("Action worker stopped, dropping {}", action);
                    }
                }
                None => log::trace!("Ignoring unknown hotkey id {}", event.id),
            }
        }

        match commands.try_recv() {
            Ok(HotkeyCommand::Refresh) => {
                log::info!("Refreshing hotkeys on request");
                refresh_bindings(&mut dispatcher, ctx);
                last_check = Instant::now();
            }
            Ok(HotkeyCommand::Shutdown) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        if last_check.elapsed() >= settings.health_interval {
            log::debug!("Hotkey health check");
            refresh_bindings(&mut dispatcher, ctx);
            last_check = Instant::now();
        }

        thread::sleep(settings.idle);
    }

    dispatcher.unbind_all();
    log::info!("Hotkeys released");
}

/// Drain the thread's message queue so `WM_HOTKEY` reaches the manager window
#[cfg(windows)]
fn pump_platform_messages() {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, MSG, PM_REMOVE, PeekMessageW, TranslateMessage,
    };

    let mut msg = MSG::default();
    unsafe {
        while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(windows))]
fn pump_platform_messages() {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Config, ConfigStorage, JsonConfigStorage};
    use crate::testing::FakeHotkeys;

    fn context(dir: &std::path::Path, hotkey: &str) -> AppContext {
        let storage = JsonConfigStorage::new(dir.join("screenshot_config.json"));
        storage
            .save(&Config {
                save_path: dir.join("shots"),
                hotkey: hotkey.to_string(),
            })
            .unwrap();
        AppContext::load(Box::new(storage), None).unwrap()
    }

    fn saved_hotkey(dir: &std::path::Path) -> String {
        JsonConfigStorage::new(dir.join("screenshot_config.json"))
            .load()
            .unwrap()
            .hotkey
    }

    #[test]
    fn test_install_binds_primary_and_copy() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ctrl+alt+p");
        let hotkeys = FakeHotkeys::new();
        let mut dispatcher = HotkeyDispatcher::new(hotkeys.clone());

        let report = install_bindings(&mut dispatcher, &ctx);

        assert_eq!(report.primary.unwrap().to_string(), "ctrl+alt+p");
        assert!(report.copy_bound);
        assert_eq!(hotkeys.registered(), vec!["ctrl+alt+p", "ctrl+shift+c"]);
        assert_eq!(saved_hotkey(dir.path()), "ctrl+alt+p");
    }

    #[test]
    fn test_adopted_fallback_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ctrl+alt+p");
        let hotkeys = FakeHotkeys::new();
        hotkeys.take("ctrl+alt+p");
        let mut dispatcher = HotkeyDispatcher::new(hotkeys);

        let report = install_bindings(&mut dispatcher, &ctx);

        assert_eq!(report.primary.unwrap().to_string(), "ctrl+alt+v");
        assert_eq!(ctx.hotkey(), "ctrl+alt+v");
        assert_eq!(saved_hotkey(dir.path()), "ctrl+alt+v");
    }

    #[test]
    fn test_copy_conflict_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ctrl+alt+p");
        let hotkeys = FakeHotkeys::new();
        hotkeys.take("ctrl+shift+c");
        let mut dispatcher = HotkeyDispatcher::new(hotkeys);

        let report = install_bindings(&mut dispatcher, &ctx);

        assert!(report.primary.is_ok());
        assert!(!report.copy_bound);
        assert!(report.any_bound());
    }

    #[test]
    fn test_everything_taken() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ctrl+alt+p");
        let hotkeys = FakeHotkeys::new();
        for taken in [
            "ctrl+alt+p",
            "ctrl+alt+v",
            "ctrl+shift+p",
            "alt+shift+p",
            "ctrl+shift+c",
        ] {
            hotkeys.take(taken);
        }
        let mut dispatcher = HotkeyDispatcher::new(hotkeys);

        let report = install_bindings(&mut dispatcher, &ctx);

        assert!(report.primary.is_err());
        assert!(!report.any_bound());
        assert_eq!(saved_hotkey(dir.path()), "ctrl+alt+p");
    }

    #[test]
    fn test_invalid_configured_hotkey_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ctrl+banana");
        let hotkeys = FakeHotkeys::new();
        let mut dispatcher = HotkeyDispatcher::new(hotkeys);

        let report = install_bindings(&mut dispatcher, &ctx);

        assert_eq!(report.primary.unwrap().to_string(), "ctrl+alt+p");
        assert_eq!(saved_hotkey(dir.path()), "ctrl+alt+p");
    }

    #[test]
    fn test_copy_hotkey_as_primary_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ctrl+shift+c");
        let hotkeys = FakeHotkeys::new();
        let mut dispatcher = HotkeyDispatcher::new(hotkeys.clone());

        let report = install_bindings(&mut dispatcher, &ctx);

        assert_eq!(report.primary.unwrap().to_string(), "ctrl+alt+p");
        assert!(report.copy_bound);
        let (_, paste) = dispatcher.binding_for(HotkeyAction::PastePath).unwrap();
        let (_, copy) = dispatcher.binding_for(HotkeyAction::CopyPath).unwrap();
        assert_eq!(paste.combination.to_string(), "ctrl+alt+p");
        assert_eq!(copy.combination.to_string(), "ctrl+shift+c");
        assert_eq!(saved_hotkey(dir.path()), "ctrl+alt+p");

        refresh_bindings(&mut dispatcher, &ctx);
        let (_, paste) = dispatcher.binding_for(HotkeyAction::PastePath).unwrap();
        assert_eq!(paste.combination.to_string(), "ctrl+alt+p");
        assert_eq!(hotkeys.registered(), vec!["ctrl+alt+p", "ctrl+shift+c"]);
    }

    #[test]
    fn test_refresh_binds_copy_once_released() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ctrl+alt+p");
        let hotkeys = FakeHotkeys::new();
        hotkeys.take("ctrl+shift+c");
        let mut dispatcher = HotkeyDispatcher::new(hotkeys.clone());

        let report = install_bindings(&mut dispatcher, &ctx);
        assert!(!report.copy_bound);

        hotkeys.release("ctrl+shift+c");
        refresh_bindings(&mut dispatcher, &ctx);

        assert!(dispatcher.binding_for(HotkeyAction::CopyPath).is_some());
        assert_eq!(hotkeys.registered(), vec!["ctrl+alt+p", "ctrl+shift+c"]);
    }

    #[test]
    fn test_refresh_recovers_stolen_hotkeys() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "ctrl+alt+p");
        let hotkeys = FakeHotkeys::new();
        let mut dispatcher = HotkeyDispatcher::new(hotkeys.clone());
        install_bindings(&mut dispatcher, &ctx);

        hotkeys.steal("ctrl+alt+p");
        refresh_bindings(&mut dispatcher, &ctx);

        assert_eq!(hotkeys.registered(), vec!["ctrl+alt+v", "ctrl+shift+c"]);
        assert_eq!(saved_hotkey(dir.path()), "ctrl+alt+v");
    }
}
