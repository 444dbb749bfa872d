// src/exec/app.rs

//! Supervision of the long-running application process.

use std::sync::Mutex;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::exec::command::{LineSink, RunningCommand, ShellCommand};
use crate::ledger::BuildId;

/// Owns the single supervised instance of the application process.
///
/// At most one application command is alive at any instant: `start` always
/// stops the previous instance first, and ownership of the handle never
/// leaves this struct except as a local copy taken out under the lock.
#[derive(Debug)]
pub struct AppRunner {
    run_cmd: Option<String>,
    current: Mutex<Option<RunningCommand>>,
}

impl AppRunner {
    /// `run_cmd = None` disables the runner; `start` becomes a no-op.
    pub fn new(run_cmd: Option<String>) -> Self {
        Self {
            run_cmd,
            current: Mutex::new(None),
        }
    }

    pub fn enabled(&self) -> bool {
        self.run_cmd.is_some()
    }

    /// Stop the running application, waiting until its process group is
    /// reaped. Idempotent; a runner with nothing running returns success.
    pub async fn stop(&self) -> Result<()> {
        // Swap the handle out under the lock, then kill the local copy so
        // the lock is never held across the kill-and-wait.
        let taken = self.slot().take();

        if let Some(mut cmd) = taken {
            info!("stopping application");
            cmd.kill().await?;
        }

        Ok(())
    }

    /// Start the application, stopping any previous instance first.
    pub async fn start(&self, build_id: &BuildId) -> Result<()> {
        self.stop().await?;

        let Some(run_cmd) = &self.run_cmd else {
            return Ok(());
        };

        let handle = ShellCommand::new(run_cmd)
            .stdout_sink(log_sink())
            .stderr_sink(log_sink())
            .spawn()?;

        // Report when the application terminates on its own (or is killed).
        let mut exit_handle = handle.clone();
        let id = *build_id;
        tokio::spawn(async move {
            let outcome = exit_handle.wait().await;
            info!(build = %id, code = ?outcome.code, "application exited");
        });

        *self.slot() = Some(handle);
        Ok(())
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<RunningCommand>> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Application output goes through the logging layer rather than raw stdout,
/// so it carries the same timestamps as the rest of the run log.
fn log_sink() -> LineSink {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            info!(source = "app", "{line}");
        }
    });
    tx
}
