// src/watch/walker.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Well-known non-source directories that are pruned as whole subtrees.
pub const SKIP_DIRS: &[&str] = &["vendor", "node_modules", "tmp", "target"];

/// Collect every directory under `root` that should be registered for change
/// notifications.
///
/// Hidden directories and [`SKIP_DIRS`] are pruned rather than descended
/// into. An error reading any single entry is tolerated and logged; it never
/// aborts the walk.
pub fn collect_watch_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = ?dir, error = %err, "skipping unreadable directory");
                continue;
            }
        };
        dirs.push(dir);

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable directory entry");
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let name = name.to_string_lossy();
            if should_skip_dir(&name) {
                continue;
            }

            stack.push(path);
        }
    }

    dirs
}

/// Whether a directory name marks a subtree that is never watched.
pub fn should_skip_dir(name: &str) -> bool {
    name.starts_with('.') || SKIP_DIRS.contains(&name)
}
