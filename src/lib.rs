// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod ledger;
pub mod logging;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{Orchestrator, Trigger};
use crate::exec::AppRunner;
use crate::ledger::BuildLedger;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - build ledger
/// - change detector (walker + notify + debounce)
/// - orchestrator + application runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    if !cfg.watching_enabled() {
        info!("file watching disabled: no [[rule]] sections configured");
        info!("add build rules (and optionally run_cmd) to {:?} to enable it", config_path);
        return Ok(());
    }
    if cfg.run_cmd().is_none() {
        info!("run_cmd not configured; builds will run without starting an application");
    }

    let rules = Arc::new(watch::compile_rules(cfg.rules())?);
    let ignore = watch::compile_ignore(cfg.ignore())?;
    let ledger = BuildLedger::new(cfg.status_dir());

    let (trigger_tx, trigger_rx) = engine::trigger_channel();
    let (shutdown_tx, shutdown_rx) = engine::shutdown_channel();

    // The very first build runs every rule, signalled as an empty change
    // set. Sent before the detector takes the channel over.
    let _ = trigger_tx.send(Some(Trigger::startup()));

    let root = project_root(&config_path);
    let detector = watch::spawn_detector(
        root,
        Arc::clone(&rules),
        ignore,
        trigger_tx,
        watch::DEBOUNCE_WINDOW,
    )?;

    // Ctrl-C → graceful shutdown.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            // Keep the shutdown sender alive so the orchestrator doesn't
            // mistake a dropped channel for a shutdown request.
            std::future::pending::<()>().await;
        }
        let _ = shutdown_tx.send(true);
    });

    let app = AppRunner::new(cfg.run_cmd().map(str::to_string));
    let orchestrator = Orchestrator::new(ledger, rules, app);
    let result = orchestrator.run(trigger_rx, shutdown_rx).await;

    detector.stop();
    result.map_err(Into::into)
}

/// Figure out a sensible project root for watching.
///
/// - If the config path has a non-empty parent (e.g. "configs/devwatch.toml"),
///   we use that directory.
/// - If it's just a bare filename like "devwatch.toml" (parent = ""),
///   we fall back to the current working directory "."
fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print rules, commands and ignore patterns.
fn print_dry_run(cfg: &ConfigFile) {
    println!("devwatch dry-run");
    println!("  status_dir = {}", cfg.status_dir());
    match cfg.run_cmd() {
        Some(cmd) => println!("  run_cmd = {cmd}"),
        None => println!("  run_cmd = (not configured)"),
    }
    if !cfg.ignore().is_empty() {
        println!("  ignore = {:?}", cfg.ignore());
    }
    println!();

    println!("rules ({}):", cfg.rules().len());
    for rule in cfg.rules() {
        println!("  - {}", rule.name);
        println!("      watch: {:?}", rule.watch);
        println!("      command: {}", rule.command);
    }
}
