// src/ledger/id.rs

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::DevwatchError;

/// Identifier for one orchestration run, derived from time and process
/// identity.
///
/// Rendered as `{unix_timestamp}-{pid}`, which keeps ids lexically sortable
/// by timestamp prefix for ids of equal digit length and `Ord`-sortable in
/// general. Timestamps have one-second resolution, so two builds started
/// within the same second collide only if the supervisor pid also collides —
/// an accepted limitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildId {
    timestamp: i64,
    pid: u32,
}

impl BuildId {
    pub fn new(timestamp: i64, pid: u32) -> Self {
        Self { timestamp, pid }
    }

    /// Allocate an id from the current wall clock and this process's pid.
    pub fn allocate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self {
            timestamp,
            pid: std::process::id(),
        }
    }

    /// Unix timestamp (seconds) this build was allocated at.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.timestamp, self.pid)
    }
}

impl FromStr for BuildId {
    type Err = DevwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DevwatchError::InvalidBuildId(s.to_string());

        let (ts, pid) = s.split_once('-').ok_or_else(invalid)?;
        let timestamp: i64 = ts.parse().map_err(|_| invalid())?;
        let pid: u32 = pid.parse().map_err(|_| invalid())?;

        Ok(Self { timestamp, pid })
    }
}

/// Status of a build while it exists in the ledger.
///
/// There is intentionally no `Succeeded` variant: a successful build's
/// records are deleted, and absence means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStatus {
    Building,
    Failed,
    Aborted,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Building => "building",
            BuildStatus::Failed => "failed",
            BuildStatus::Aborted => "aborted",
        }
    }

    /// Whether this status marks a terminal, superseded-cleanable build.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStatus::Failed | BuildStatus::Aborted)
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStatus {
    type Err = DevwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "building" => Ok(BuildStatus::Building),
            "failed" => Ok(BuildStatus::Failed),
            "aborted" => Ok(BuildStatus::Aborted),
            other => Err(DevwatchError::InvalidBuildId(format!(
                "unknown build status '{other}'"
            ))),
        }
    }
}
