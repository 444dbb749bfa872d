// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Walking the project tree and registering directories with `notify`
//!   (pruning hidden and well-known non-source directories).
//! - Compiling per-rule watch patterns and the global ignore list.
//! - Debouncing bursts of filesystem events into a single trigger carrying
//!   the set of changed paths.
//!
//! It does **not** know about the build ledger or process supervision; it
//! only turns filesystem changes into triggers for the orchestrator.

pub mod debounce;
pub mod patterns;
pub mod walker;
pub mod watcher;

pub use debounce::{debounce_loop, DEBOUNCE_WINDOW};
pub use patterns::{compile_ignore, compile_rules, select_rules, IgnoreSet, RuleMatcher};
pub use walker::{collect_watch_dirs, should_skip_dir, SKIP_DIRS};
pub use watcher::{spawn_detector, DetectorHandle};
