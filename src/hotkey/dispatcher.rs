use std::collections::HashMap;

use super::backend::{HotkeyAction, HotkeyBackend, HotkeyBinding, HotkeyError, HotkeyId};
use super::combination::{Combination, Key, Modifiers};

/// Alternatives tried, in order, when the primary hotkey cannot be bound
pub const FALLBACK_HOTKEYS: [&str; 3] = ["ctrl+alt+v", "ctrl+shift+p", "alt+shift+p"];

/// Fixed secondary hotkey copying the latest path to the clipboard
pub const COPY_HOTKEY: &str = "ctrl+shift+c";

/// Keeps track of which combination is bound to which action and heals
/// lost or conflicting bindings
///
/// All OS calls go through the `HotkeyBackend`; the dispatcher itself holds
/// no platform state and is driven from the hotkey service thread.
pub struct HotkeyDispatcher<B: HotkeyBackend> {
    backend: B,
    bindings: HashMap<HotkeyId, HotkeyBinding>,
    fallbacks: Vec<Combination>,
}

impl<B: HotkeyBackend> HotkeyDispatcher<B> {
    /// Create a dispatcher using the standard fallback list
    pub fn new(backend: B) -> Self {
        Self::with_fallbacks(backend, default_fallbacks())
    }

    pub fn with_fallbacks(backend: B, fallbacks: Vec<Combination>) -> Self {
        HotkeyDispatcher {
            backend,
            bindings: HashMap::new(),
            fallbacks,
        }
    }

    /// Bind `combination` to `action`
    ///
    /// A stale registration of the same combination for `action` is released
    /// first. A combination bound to a different action is a conflict.
    pub fn bind(
        &mut self,
        combination: Combination,
        action: HotkeyAction,
    ) -> Result<HotkeyId, HotkeyError> {
        if let Some(id) = self.id_of(&combination) {
            let holder = self.bindings[&id].action;
            if holder != action {
                return Err(HotkeyError::Conflict {
                    combination: combination.to_string(),
                    reason: format!("already bound to {}", holder),
                });
            }
            log::debug!("Releasing previous binding of {}", combination.label());
            self.release(id);
        }

        let id = self.backend.register(&combination)?;
        self.bindings.insert(
            id,
            HotkeyBinding {
                combination,
                action,
            },
        );
        log::info!("Hotkey {} bound: {}", combination.label(), action);
        Ok(id)
    }

    /// Remove the binding for `combination`
    pub fn unbind(&mut self, combination: &Combination) -> Result<(), HotkeyError> {
        let id = self
            .id_of(combination)
            .ok_or_else(|| HotkeyError::NotBound(combination.to_string()))?;
        self.bindings.remove(&id);
        self.backend.unregister(id)?;
        log::info!("Hotkey {} unbound", combination.label());
        Ok(())
    }

    /// Bind `primary`, or the first fallback that can be bound
    ///
    /// Returns the combination that ended up bound. Fallbacks already used by
    /// another binding are skipped.
    pub fn bind_with_fallback(
        &mut self,
        primary: Combination,
        action: HotkeyAction,
    ) -> Result<Combination, HotkeyError> {
        let mut tried = vec![primary.to_string()];
        match self.bind(primary, action) {
            Ok(_) => return Ok(primary),
            Err(e) => log::warn!("Failed to bind {}: {}", primary.label(), e),
        }

        for candidate in self.fallbacks.clone() {
            if candidate == primary || self.id_of(&candidate).is_some() {
                continue;
            }

            log::info!("Trying fallback hotkey {}", candidate.label());
            tried.push(candidate.to_string());
            match self.bind(candidate, action) {
                Ok(_) => return Ok(candidate),
                Err(e) => log::warn!("Fallback hotkey {} failed: {}", candidate.label(), e),
            }
        }

        log::error!("All hotkeys failed for {}: {}", action, tried.join(", "));
        Err(HotkeyError::Exhausted { tried })
    }

    /// Re-register the binding for `action`
    ///
    /// Used as the periodic health check and after injection failures: the
    /// current combination is released and bound again, moving to the
    /// fallback list if it was taken in the meantime. When `action` has no
    /// binding yet, `preferred` is tried first. Returns the combination bound
    /// afterwards.
    pub fn reassert(
        &mut self,
        action: HotkeyAction,
        preferred: Combination,
    ) -> Result<Combination, HotkeyError> {
        let current = match self.binding_for(action) {
            Some((id, binding)) => {
                self.release(id);
                binding.combination
            }
            None => preferred,
        };

        self.bind_with_fallback(current, action)
    }

    /// Action bound to an OS hotkey id
    pub fn action_for(&self, id: HotkeyId) -> Option<HotkeyAction> {
        self.bindings.get(&id).map(|binding| binding.action)
    }

    /// Current binding for `action`
    pub fn binding_for(&self, action: HotkeyAction) -> Option<(HotkeyId, HotkeyBinding)> {
        self.bindings
            .iter()
            .find(|(_, binding)| binding.action == action)
            .map(|(&id, &binding)| (id, binding))
    }

    /// All active bindings
    pub fn bindings(&self) -> Vec<HotkeyBinding> {
        self.bindings.values().copied().collect()
    }

    /// Release every binding (shutdown)
    pub fn unbind_all(&mut self) {
        let ids: Vec<HotkeyId> = self.bindings.keys().copied().collect();
        for id in ids {
            self.release(id);
        }
    }

    fn id_of(&self, combination: &Combination) -> Option<HotkeyId> {
        self.bindings
            .iter()
            .find(|(_, binding)| binding.combination == *combination)
            .map(|(&id, _)| id)
    }

    /// Drop a binding; an unregister failure means the OS already lost it
    fn release(&mut self, id: HotkeyId) {
        if let Some(binding) = self.bindings.remove(&id)
            && let Err(e) = self.backend.unregister(id)
        {
            log::debug!(
                "Unregistering {} failed: {}",
                binding.combination.label(),
                e
            );
        }
    }
}

/// Built-in primary combination, `ctrl+alt+p`
pub fn default_primary() -> Combination {
    Combination::new(Modifiers::CTRL | Modifiers::ALT, Key::Letter('p'))
}

/// `COPY_HOTKEY` as a combination
pub fn copy_combination() -> Combination {
    Combination::new(Modifiers::CTRL | Modifiers::SHIFT, Key::Letter('c'))
}

/// Reject a paste hotkey that collides with `COPY_HOTKEY`
pub fn validate_primary(combination: Combination) -> Result<Combination, HotkeyError> {
    if combination == copy_combination() {
        return Err(HotkeyError::Conflict {
            combination: combination.to_string(),
            reason: "reserved for copying the latest path".to_string(),
        });
    }
    Ok(combination)
}

/// Parsed `FALLBACK_HOTKEYS`
pub fn default_fallbacks() -> Vec<Combination> {
    FALLBACK_HOTKEYS
        .iter()
        .filter_map(|combo| combo.parse().ok())
        .collect()
}
