use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Operational state of a store module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Active,
    ShuttingDown,
}

/// Shared handle onto a [`ModuleState`].
///
/// The host module flips it from its lifecycle hooks and the storage worker reads it at the start of
/// every unit of work, so a clone must be injected into both.
#[derive(Clone, Debug, Default)]
pub struct StateHandle {
    shutting_down: Arc<AtomicBool>,
}

impl StateHandle {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self) -> ModuleState {
        if self.shutting_down.load(Ordering::SeqCst) {
            ModuleState::ShuttingDown
        } else {
            ModuleState::Active
        }
    }

    pub fn is_shutting_down(&self) -> bool { self.get() == ModuleState::ShuttingDown }

    /// Back to `Active`, on every (re)initialization.
    pub fn activate(&self) { self.shutting_down.store(false, Ordering::SeqCst); }

    pub fn shut_down(&self) { self.shutting_down.store(true, Ordering::SeqCst); }
}
