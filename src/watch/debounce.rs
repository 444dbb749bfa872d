// src/watch/debounce.rs

//! Debouncing of relevant filesystem events into coalesced triggers.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::engine::{ChangeSet, Trigger, TriggerTx};

/// Fixed debounce window: every relevant event re-arms this delay, and only
/// the timer firing dispatches a trigger.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Accumulate incoming paths and dispatch one coalesced trigger per quiet
/// window.
///
/// Rapid repeated edits inside the window produce exactly one trigger
/// containing the union of changed paths. Dispatch replaces any trigger the
/// orchestrator has not consumed yet, so the newest change set wins and
/// there is never more than one pending trigger.
///
/// Returns when the event channel closes.
pub async fn debounce_loop(
    mut events: mpsc::UnboundedReceiver<PathBuf>,
    trigger_tx: TriggerTx,
    window: Duration,
) {
    let mut pending = ChangeSet::new();

    loop {
        if pending.is_empty() {
            match events.recv().await {
                Some(path) => {
                    pending.insert(path);
                }
                None => break,
            }
        } else {
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(path) => {
                        // Re-arms the window: the sleep below is recreated
                        // on the next loop iteration.
                        pending.insert(path);
                    }
                    None => break,
                },
                _ = sleep(window) => {
                    let changed = std::mem::take(&mut pending);
                    debug!(files = changed.len(), "dispatching build trigger");
                    let _ = trigger_tx.send(Some(Trigger { changed }));
                }
            }
        }
    }

    debug!("debounce loop finished (event channel closed)");
}
