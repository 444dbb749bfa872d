// src/ledger/store.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::debug;

use crate::ledger::id::{BuildId, BuildStatus};

/// Companion file holding the plain-text id of the most recent build.
pub const CURRENT_BUILD_ID_FILE: &str = "current-build-id";

/// One persisted ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildRecord {
    pub id: BuildId,
    pub status: BuildStatus,
}

impl BuildRecord {
    /// Unix timestamp (seconds) derived from the build id.
    pub fn timestamp(&self) -> i64 {
        self.id.timestamp()
    }
}

/// File-backed record of build identities and their status.
///
/// The ledger guarantees that at most one status file exists per build id:
/// [`BuildLedger::set_status`] removes any previous record before writing the
/// new one. A fully successful build ends up with no record at all.
#[derive(Debug, Clone)]
pub struct BuildLedger {
    status_dir: PathBuf,
}

impl BuildLedger {
    pub fn new(status_dir: impl Into<PathBuf>) -> Self {
        Self {
            status_dir: status_dir.into(),
        }
    }

    pub fn status_dir(&self) -> &Path {
        &self.status_dir
    }

    /// Allocate a fresh build id and record it as the current build.
    ///
    /// Creates the status directory if needed.
    pub fn begin_build(&self) -> Result<BuildId> {
        self.ensure_dir()?;

        let id = BuildId::allocate();
        let pointer = self.status_dir.join(CURRENT_BUILD_ID_FILE);
        fs::write(&pointer, id.to_string())
            .with_context(|| format!("writing current build id to {:?}", pointer))?;

        Ok(id)
    }

    /// The id of the most recent build, if any has been started.
    pub fn current_build_id(&self) -> Result<Option<BuildId>> {
        let pointer = self.status_dir.join(CURRENT_BUILD_ID_FILE);
        let contents = match fs::read_to_string(&pointer) {
            Ok(s) => s,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading current build id from {:?}", pointer));
            }
        };

        let id = BuildId::from_str(contents.trim())
            .with_context(|| format!("parsing current build id from {:?}", pointer))?;
        Ok(Some(id))
    }

    /// Set the status of a build, replacing any previous status.
    ///
    /// Replace-semantics keep the "at most one record per id" invariant: the
    /// old file is removed before the new one is created.
    pub fn set_status(&self, id: &BuildId, status: BuildStatus) -> Result<()> {
        self.ensure_dir()?;
        self.remove_records_for(id)?;

        let path = self.status_dir.join(format!("{id}-{status}"));
        fs::File::create(&path)
            .with_context(|| format!("creating status file {:?}", path))?;

        Ok(())
    }

    /// Remove all records for a build. This is how success is represented.
    pub fn clear(&self, id: &BuildId) -> Result<()> {
        self.remove_records_for(id)
    }

    /// Delete every failed/aborted record whose timestamp is not newer than
    /// the given build's.
    ///
    /// Called after a success, so a viewer never sees a failure older than
    /// the latest successful build.
    pub fn cleanup_superseded(&self, current: &BuildId) -> Result<()> {
        for (path, record) in self.scan()? {
            if record.status.is_terminal() && record.timestamp() <= current.timestamp() {
                remove_if_exists(&path)?;
            }
        }
        Ok(())
    }

    /// Reconstruct all persisted records, ordered by build id.
    ///
    /// Unparseable entries are skipped, not fatal.
    pub fn list(&self) -> Result<Vec<BuildRecord>> {
        let mut records: Vec<BuildRecord> =
            self.scan()?.into_iter().map(|(_, record)| record).collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.status_dir)
            .with_context(|| format!("creating status directory {:?}", self.status_dir))
    }

    fn remove_records_for(&self, id: &BuildId) -> Result<()> {
        for (path, record) in self.scan()? {
            if record.id == *id {
                remove_if_exists(&path)?;
            }
        }
        Ok(())
    }

    /// Walk the status directory and parse every well-formed record file.
    ///
    /// A missing directory yields an empty scan. Directories, the
    /// current-build-id pointer and anything else that doesn't parse as
    /// `{timestamp}-{pid}-{status}` are skipped.
    fn scan(&self) -> Result<Vec<(PathBuf, BuildRecord)>> {
        let entries = match fs::read_dir(&self.status_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("reading status directory {:?}", self.status_dir)
                });
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable status entry");
                    continue;
                }
            };
            let path = entry.path();
            if path.is_dir() {
                continue;
            }

            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(record) = parse_record_name(name) else {
                continue;
            };

            records.push((path, record));
        }

        Ok(records)
    }
}

/// Parse a `{timestamp}-{pid}-{status}` filename into a record.
///
/// The status is the portion after the *last* dash, so one id can never
/// shadow another id's records by prefix.
fn parse_record_name(name: &str) -> Option<BuildRecord> {
    let (id_part, status_part) = name.rsplit_once('-')?;
    let status = BuildStatus::from_str(status_part).ok()?;
    let id = BuildId::from_str(id_part).ok()?;
    Some(BuildRecord { id, status })
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("removing status file {:?}", path)),
    }
}
