// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::engine::TriggerTx;
use crate::watch::debounce::debounce_loop;
use crate::watch::patterns::{any_rule_matches, IgnoreSet, RuleMatcher};
use crate::watch::walker::collect_watch_dirs;

/// Handle for the change detector.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping (or calling [`DetectorHandle::stop`])
/// releases the watch handle; the filter and debounce tasks then drain out
/// as their channels close.
pub struct DetectorHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorHandle").finish()
    }
}

impl DetectorHandle {
    /// Stop watching. Safe to call once at process exit.
    pub fn stop(self) {
        drop(self);
    }
}

/// Spawn a change detector over the given `root` directory.
///
/// Every directory under the root is registered individually (hidden and
/// non-source subtrees pruned), so the walker's skip rules are authoritative
/// rather than the platform's recursive-watch behaviour. Relevant events are
/// filtered against the rules' watch patterns (ignore list first) and
/// debounced into coalesced triggers on `trigger_tx`.
pub fn spawn_detector(
    root: impl Into<PathBuf>,
    rules: Arc<Vec<RuleMatcher>>,
    ignore: IgnoreSet,
    trigger_tx: TriggerTx,
    window: Duration,
) -> Result<DetectorHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = event_tx.send(event);
            }
            Err(err) => {
                // We can't log via tracing here easily, so fall back to stderr.
                eprintln!("devwatch: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    register_watch_dirs(&mut watcher, &root);

    let (path_tx, path_rx) = mpsc::unbounded_channel::<PathBuf>();
    tokio::spawn(filter_events(event_rx, rules, ignore, path_tx));
    tokio::spawn(debounce_loop(path_rx, trigger_tx, window));

    Ok(DetectorHandle { _inner: watcher })
}

fn register_watch_dirs(watcher: &mut RecommendedWatcher, root: &Path) {
    let dirs = collect_watch_dirs(root);

    for dir in &dirs {
        if let Err(err) = watcher.watch(dir, RecursiveMode::NonRecursive) {
            // Tolerated per-entry: a directory may have vanished mid-walk.
            debug!(dir = ?dir, error = %err, "failed to register directory for watching");
        }
    }

    info!(directories = dirs.len(), root = ?root, "file watcher started");
}

/// Forward the paths of relevant events into the debouncer.
///
/// A path is relevant if it is not ignored and at least one rule's watch
/// patterns match it. A file may satisfy multiple rules; rule selection
/// happens later, against the coalesced change set.
async fn filter_events(
    mut event_rx: mpsc::UnboundedReceiver<Event>,
    rules: Arc<Vec<RuleMatcher>>,
    ignore: IgnoreSet,
    path_tx: mpsc::UnboundedSender<PathBuf>,
) {
    while let Some(event) = event_rx.recv().await {
        for path in event.paths {
            if ignore.is_ignored(&path) {
                continue;
            }
            if !any_rule_matches(&rules, &path) {
                continue;
            }

            debug!(path = ?path, "relevant file change");
            if path_tx.send(path).is_err() {
                return;
            }
        }
    }

    debug!("watch event loop finished");
}
