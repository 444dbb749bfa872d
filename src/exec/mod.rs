// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running shell commands, using
//! `tokio::process::Command`, and for terminating whole process trees.
//!
//! - [`command`] is the supervisor: it spawns a command as a process-group
//!   leader, streams its output line-by-line to per-stream sinks, and offers
//!   a kill operation that escalates from SIGTERM to SIGKILL and always
//!   waits for the process to be reaped.
//! - [`app`] owns the single supervised instance of the long-running
//!   application process (stop-and-wait / start).

pub mod app;
pub mod command;

pub use app::AppRunner;
pub use command::{
    stderr_console, stdout_console, ExitOutcome, LineSink, RunningCommand, ShellCommand,
    KILL_GRACE,
};
