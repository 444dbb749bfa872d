// src/exec/command.rs

//! Shell command supervision.
//!
//! Commands run through `sh -c` so pipelines and `&&` work, with the child
//! placed in its own process group (itself as leader). Killing always
//! signals the whole group with a negative pgid, so shell children and
//! further descendants are terminated too.

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// How long a process group gets to react to SIGTERM before SIGKILL.
pub const KILL_GRACE: Duration = Duration::from_secs(2);

/// Per-stream line sink. Each completed output line is sent before the next
/// line is read, so order is preserved per stream.
pub type LineSink = mpsc::UnboundedSender<String>;

/// Exit outcome of a supervised command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    pub success: bool,
    pub code: Option<i32>,
}

impl ExitOutcome {
    fn failed() -> Self {
        Self {
            success: false,
            code: None,
        }
    }
}

/// A shell command line plus optional per-stream sinks.
///
/// A stream without a sink is still drained to EOF and discarded, so the
/// child can never block on a full pipe.
pub struct ShellCommand {
    line: String,
    stdout_sink: Option<LineSink>,
    stderr_sink: Option<LineSink>,
}

impl ShellCommand {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            stdout_sink: None,
            stderr_sink: None,
        }
    }

    pub fn stdout_sink(mut self, sink: LineSink) -> Self {
        self.stdout_sink = Some(sink);
        self
    }

    pub fn stderr_sink(mut self, sink: LineSink) -> Self {
        self.stderr_sink = Some(sink);
        self
    }

    /// Start the command as a process-group leader.
    ///
    /// The parent's environment is inherited. Two tasks drain stdout and
    /// stderr line-by-line, and a reaper task waits for the child and
    /// publishes the exit outcome to every [`RunningCommand`] clone.
    pub fn spawn(self) -> Result<RunningCommand> {
        debug!(cmd = %self.line, "spawning shell command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.line)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning shell for command '{}'", self.line))?;

        // The child is its own group leader, so pid == pgid.
        let pgid = child
            .id()
            .map(|pid| pid as i32)
            .context("spawned process has no pid")?;

        spawn_line_reader(child.stdout.take(), self.stdout_sink);
        spawn_line_reader(child.stderr.take(), self.stderr_sink);

        let (exit_tx, exit_rx) = watch::channel(None);
        let line = self.line;
        tokio::spawn(async move {
            let outcome = match child.wait().await {
                Ok(status) => ExitOutcome {
                    success: status.success(),
                    code: status.code(),
                },
                Err(err) => {
                    warn!(cmd = %line, error = %err, "waiting for child process failed");
                    ExitOutcome::failed()
                }
            };
            let _ = exit_tx.send(Some(outcome));
        });

        Ok(RunningCommand { pgid, exit_rx })
    }
}

/// Handle to a spawned command.
///
/// Clones share the same exit channel, so one clone can be waited on while
/// another is used to kill the group. The underlying process is reaped
/// exactly once, by the reaper task.
#[derive(Debug, Clone)]
pub struct RunningCommand {
    pgid: i32,
    exit_rx: watch::Receiver<Option<ExitOutcome>>,
}

impl RunningCommand {
    pub fn pgid(&self) -> i32 {
        self.pgid
    }

    /// Whether the process has already been reaped.
    pub fn finished(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    /// Wait for the command to exit.
    pub async fn wait(&mut self) -> ExitOutcome {
        loop {
            if let Some(outcome) = *self.exit_rx.borrow_and_update() {
                return outcome;
            }
            if self.exit_rx.changed().await.is_err() {
                // Reaper task went away without reporting; treat as failure.
                return ExitOutcome::failed();
            }
        }
    }

    /// Terminate the whole process group and wait for the exit.
    ///
    /// Sends SIGTERM to the group, waits up to [`KILL_GRACE`] for the
    /// process to be reaped, then escalates to SIGKILL on the same group and
    /// performs a final wait. A group that is already gone is not an error,
    /// and calling this on a finished command returns immediately.
    pub async fn kill(&mut self) -> Result<()> {
        if self.finished() {
            return Ok(());
        }

        self.signal_group(Signal::SIGTERM)?;

        if timeout(KILL_GRACE, self.wait()).await.is_ok() {
            return Ok(());
        }

        debug!(
            pgid = self.pgid,
            "process group ignored SIGTERM; escalating to SIGKILL"
        );
        self.signal_group(Signal::SIGKILL)?;
        self.wait().await;

        Ok(())
    }

    fn signal_group(&self, signal: Signal) -> Result<()> {
        match killpg(Pid::from_raw(self.pgid), signal) {
            Ok(()) => Ok(()),
            // Group already gone: the process exited on its own.
            Err(Errno::ESRCH) => Ok(()),
            Err(err) => Err(anyhow!(
                "sending {signal} to process group {}: {err}",
                self.pgid
            )),
        }
    }
}

fn spawn_line_reader<R>(stream: Option<R>, sink: Option<LineSink>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(stream) = stream else { return };

    tokio::spawn(async move {
        let reader = BufReader::new(stream);
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(sink) = &sink {
                // Keep draining even if the consumer went away.
                let _ = sink.send(line);
            }
        }
    });
}

/// Sink that forwards lines untouched to this process's stdout.
pub fn stdout_console() -> LineSink {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            println!("{line}");
        }
    });
    tx
}

/// Sink that forwards lines untouched to this process's stderr.
pub fn stderr_console() -> LineSink {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            eprintln!("{line}");
        }
    });
    tx
}
