// src/engine/mod.rs

//! Build orchestration engine.
//!
//! This module ties together:
//! - the trigger channel carrying coalesced change sets from the detector
//! - the orchestrator loop that reacts to triggers by aborting superseded
//!   builds, running the matching rules, updating the ledger, and
//!   restarting the application
//!
//! Triggers travel over a capacity-1 replace-on-send channel: if the
//! orchestrator has not consumed the previous trigger yet, a new one
//! replaces it. The orchestrator therefore always acts on the most recent
//! change set, never a stale queue.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tokio::sync::watch;

pub mod orchestrator;

pub use orchestrator::Orchestrator;

/// Unordered set of absolute paths changed since the last dispatched
/// trigger. Created per debounce window, consumed exactly once.
pub type ChangeSet = BTreeSet<PathBuf>;

/// One dispatched build trigger.
///
/// An empty change set means "run every rule" and is how the unconditional
/// startup build is signalled.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    pub changed: ChangeSet,
}

impl Trigger {
    /// The unconditional first trigger, dispatched at startup.
    pub fn startup() -> Self {
        Self::default()
    }

    pub fn run_all(&self) -> bool {
        self.changed.is_empty()
    }
}

pub type TriggerTx = watch::Sender<Option<Trigger>>;
pub type TriggerRx = watch::Receiver<Option<Trigger>>;

/// Create the trigger channel. The initial value is "no trigger yet".
pub fn trigger_channel() -> (TriggerTx, TriggerRx) {
    watch::channel(None)
}

/// Channel used to request a graceful shutdown (Ctrl-C).
pub type ShutdownTx = watch::Sender<bool>;
pub type ShutdownRx = watch::Receiver<bool>;

pub fn shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    watch::channel(false)
}
