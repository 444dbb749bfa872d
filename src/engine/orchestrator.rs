// src/engine/orchestrator.rs

//! The single-active-build scheduler.
//!
//! One dedicated task consumes dispatched triggers and runs the
//! orchestration sequence: abort any build currently in flight, stop the
//! supervised application, run the matching rules in declaration order, and
//! on success restart the application. The ledger observes every state
//! transition.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::exec::app::AppRunner;
use crate::exec::command::{stderr_console, stdout_console, RunningCommand, ShellCommand};
use crate::ledger::{BuildLedger, BuildStatus};
use crate::watch::patterns::{select_rules, RuleMatcher};

use super::{ShutdownRx, Trigger, TriggerRx};

/// Drives build cycles in response to triggers.
///
/// The reference to the currently running build command lives in a single
/// lock-guarded slot. Lock scope is only the read-modify-write of that
/// slot; kill-and-wait always operates on a local copy taken out of it, so
/// the lock is never held across a multi-second wait.
#[derive(Debug)]
pub struct Orchestrator {
    ledger: BuildLedger,
    rules: Arc<Vec<RuleMatcher>>,
    app: AppRunner,
    active_build: Mutex<Option<RunningCommand>>,
}

impl Orchestrator {
    pub fn new(ledger: BuildLedger, rules: Arc<Vec<RuleMatcher>>, app: AppRunner) -> Self {
        Self {
            ledger,
            rules,
            app,
            active_build: Mutex::new(None),
        }
    }

    /// Main loop.
    ///
    /// - Consumes triggers from `trigger_rx` (newest wins).
    /// - Runs one build cycle at a time, staying responsive to newer
    ///   triggers: a trigger arriving mid-cycle aborts the in-flight build
    ///   (kill-and-reap completes before the replacing cycle starts).
    /// - A shutdown signal kills any in-flight build and the application,
    ///   then exits.
    pub async fn run(self, mut trigger_rx: TriggerRx, mut shutdown_rx: ShutdownRx) -> Result<()> {
        info!("orchestrator started");

        let mut first_cycle = true;
        let mut pending: Option<Trigger> = None;

        'outer: loop {
            let trigger = match pending.take() {
                Some(trigger) => trigger,
                None => tokio::select! {
                    res = trigger_rx.changed() => {
                        if res.is_err() {
                            info!("trigger channel closed; exiting");
                            break;
                        }
                        match trigger_rx.borrow_and_update().clone() {
                            Some(trigger) => trigger,
                            None => continue,
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("shutdown requested");
                        break;
                    }
                },
            };

            let cycle = self.run_cycle(trigger, first_cycle);
            tokio::pin!(cycle);
            first_cycle = false;

            loop {
                tokio::select! {
                    () = &mut cycle => break,
                    res = trigger_rx.changed() => {
                        if res.is_ok() {
                            // A newer change set supersedes the in-flight
                            // build: abort it, let the cycle observe the
                            // cleared slot and wind down, then start fresh.
                            pending = trigger_rx.borrow_and_update().clone();
                            self.abort_active_build().await;
                        } else {
                            (&mut cycle).await;
                            break;
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("shutdown requested; aborting in-flight build");
                        self.abort_active_build().await;
                        (&mut cycle).await;
                        break 'outer;
                    }
                }
            }
        }

        self.shutdown().await;
        info!("orchestrator exiting");
        Ok(())
    }

    /// One full orchestration cycle for a trigger.
    ///
    /// Errors inside the cycle are logged and end the cycle; the loop
    /// itself survives and the next file change is the retry trigger.
    async fn run_cycle(&self, trigger: Trigger, first_cycle: bool) {
        // Stop the application before allocating the new build id, so its
        // listening port is free before any build step runs. There is
        // nothing to stop on the very first (startup) trigger.
        if !first_cycle {
            if let Err(err) = self.app.stop().await {
                warn!(error = %err, "failed to stop application");
            }
        }

        let id = match self.ledger.begin_build() {
            Ok(id) => id,
            Err(err) => {
                error!(error = %err, "failed to allocate build id");
                return;
            }
        };
        info!(build = %id, "starting build");

        if let Err(err) = self.ledger.set_status(&id, BuildStatus::Building) {
            error!(build = %id, error = %err, "failed to record building status");
            return;
        }

        if trigger.run_all() {
            debug!(build = %id, "empty change set; every rule applies");
        }

        let selected = select_rules(&self.rules, &trigger.changed);
        if selected.is_empty() {
            info!(build = %id, "no build rules match the changed files");
            if let Err(err) = self.ledger.clear(&id) {
                warn!(build = %id, error = %err, "failed to clear build record");
            }
            return;
        }

        for rule in selected {
            info!(build = %id, rule = %rule.name(), "running rule");

            let handle = match self.spawn_rule(rule) {
                Ok(handle) => handle,
                Err(err) => {
                    error!(
                        build = %id,
                        rule = %rule.name(),
                        error = %err,
                        "failed to start rule command"
                    );
                    self.record_status(&id, BuildStatus::Failed);
                    return;
                }
            };

            // Track the active command so a later trigger can abort it.
            let mut local = handle.clone();
            *self.slot() = Some(handle);

            let outcome = local.wait().await;

            if !outcome.success {
                // Distinguish abort from genuine failure: an external kill
                // clears the slot before the command reports its exit.
                let was_aborted = self.slot().take().is_none();
                if was_aborted {
                    info!(build = %id, "build aborted");
                    self.record_status(&id, BuildStatus::Aborted);
                } else {
                    error!(build = %id, code = ?outcome.code, "build failed");
                    self.record_status(&id, BuildStatus::Failed);
                }
                return;
            }

            // Clear tracking between rules; an abort landing here is
            // observed when the superseding trigger is processed.
            self.slot().take();
        }

        // All rules succeeded: sweep stale failure markers, then represent
        // success by deleting this build's own record.
        if let Err(err) = self.ledger.cleanup_superseded(&id) {
            warn!(build = %id, error = %err, "failed to clean up superseded builds");
        }
        if let Err(err) = self.ledger.clear(&id) {
            warn!(build = %id, error = %err, "failed to clear build record");
        }
        info!(build = %id, "build succeeded");

        match self.app.start(&id).await {
            Ok(()) if self.app.enabled() => info!(build = %id, "application started"),
            Ok(()) => debug!(build = %id, "run command not configured; nothing to start"),
            Err(err) => error!(build = %id, error = %err, "failed to start application"),
        }
    }

    /// Abort the in-flight build step, if any.
    ///
    /// Marks the current build aborted first, then kills the whole process
    /// group and waits for it to be reaped. Kill errors other than "process
    /// already gone" are logged, not fatal.
    async fn abort_active_build(&self) {
        let taken = self.slot().take();
        let Some(mut cmd) = taken else { return };

        info!("aborting current build due to file change");

        match self.ledger.current_build_id() {
            Ok(Some(id)) => {
                if let Err(err) = self.ledger.set_status(&id, BuildStatus::Aborted) {
                    warn!(build = %id, error = %err, "failed to record aborted status");
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "failed to read current build id"),
        }

        if let Err(err) = cmd.kill().await {
            warn!(error = %err, "failed to kill build process group");
        }
    }

    /// Final cleanup: kill any in-flight build and stop the application.
    /// Idempotent.
    async fn shutdown(&self) {
        let taken = self.slot().take();
        if let Some(mut cmd) = taken {
            if let Err(err) = cmd.kill().await {
                warn!(error = %err, "failed to kill build process group");
            }
        }

        if let Err(err) = self.app.stop().await {
            warn!(error = %err, "failed to stop application");
        }
    }

    fn spawn_rule(&self, rule: &RuleMatcher) -> anyhow::Result<RunningCommand> {
        // Build output is forwarded untouched: stdout to stdout, stderr to
        // stderr, in the order received per stream.
        ShellCommand::new(rule.command())
            .stdout_sink(stdout_console())
            .stderr_sink(stderr_console())
            .spawn()
    }

    fn record_status(&self, id: &crate::ledger::BuildId, status: BuildStatus) {
        if let Err(err) = self.ledger.set_status(id, status) {
            warn!(build = %id, status = %status, error = %err, "failed to record build status");
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<RunningCommand>> {
        match self.active_build.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
