// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod reload;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{TaskGraph, CLEAN_TARGET};
use crate::engine::{BuildReport, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, WatchStarter};
use crate::exec::{ExecutionEngine, RealExecutorBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::reload::{start_dev_server, NoopReload, ReloadNotifier};
use crate::watch::{build_bindings, spawn_watcher, WatchBindings};

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading
/// - task graph / execution engine
/// - core runtime and its async shell
/// - (watch mode) file watcher, dev server and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let command = args.command();

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let engine = Arc::new(ExecutionEngine::from_config(cfg, Arc::clone(&fs))?);

    if args.dry_run {
        let bindings = build_bindings(engine.config())?;
        print_dry_run(engine.config(), engine.graph(), &bindings);
        return Ok(0);
    }

    match command {
        Command::Build => {
            let report = engine.run_plan().await?;
            print_report(&report);
            Ok(if report.is_success() { 0 } else { 1 })
        }
        Command::Watch { no_serve } => {
            let serve = !no_serve && engine.config().server.enabled;
            watch(engine, fs, serve).await?;
            Ok(0)
        }
        Command::Clean => {
            let report = engine.run_named(CLEAN_TARGET)?;
            println!(
                "removed {} entries from {}",
                report.files_written.len(),
                engine.config().project.build_root
            );
            Ok(0)
        }
        Command::ClearCache => {
            let removed = engine.cache().clear()?;
            println!("removed {removed} cached images");
            Ok(0)
        }
    }
}

/// Build everything, then serve and rebuild on change until Ctrl-C.
async fn watch(engine: Arc<ExecutionEngine>, fs: Arc<dyn FileSystem>, serve: bool) -> Result<()> {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = RealExecutorBackend::new(Arc::clone(&engine), rt_tx.clone());

    let bindings = build_bindings(engine.config())?;
    let root = engine.config().root().to_path_buf();
    let watch_tx = rt_tx.clone();
    let starter: WatchStarter = Box::new(move || spawn_watcher(root, bindings, watch_tx));

    let dev_server = if serve {
        Some(start_dev_server(engine.config(), fs)?)
    } else {
        info!("dev server disabled");
        None
    };
    let reload: Arc<dyn ReloadNotifier> = match &dev_server {
        Some(server) => Arc::clone(&server.hub) as Arc<dyn ReloadNotifier>,
        None => Arc::new(NoopReload),
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    rt_tx.send(RuntimeEvent::StartRequested).await?;

    let core = CoreRuntime::new(
        engine.graph().clone(),
        RuntimeOptions {
            exit_when_idle: false,
        },
    );

    let report = Runtime::new(core, rt_rx, executor)
        .with_reload(reload)
        .with_watch_starter(starter)
        .run()
        .await?;

    debug!(targets = report.len(), "initial build summary at shutdown");
    drop(dev_server);
    info!("shut down");
    Ok(())
}

fn print_report(report: &BuildReport) {
    println!("build report:");
    print!("{report}");
    if report.is_success() {
        println!("{} targets built", report.succeeded().len());
    } else {
        println!("{} of {} targets failed", report.failures().len(), report.len());
    }
}

/// Print targets, plan and watch bindings without running anything.
fn print_dry_run(cfg: &ConfigFile, graph: &TaskGraph, bindings: &WatchBindings) {
    println!("assetflow dry-run");
    println!("  root = {}", cfg.root().display());
    println!("  build_root = {}", cfg.project.build_root);
    println!("  cache = {:?} ({})", cfg.project.cache, cfg.project.cache_dir);
    println!();

    println!("targets ({}):", graph.len());
    for target in graph.targets() {
        println!("  - {}", target.name);
        if let Some(category) = target.category() {
            if let Ok(entry) = cfg.config_for(category) {
                println!("      src: {}", entry.source);
                println!("      dest: {}", entry.output_dir.display());
                if !entry.exclude.is_empty() {
                    println!("      exclude: {:?}", entry.exclude);
                }
            }
        }
        let steps = target.step_names();
        if !steps.is_empty() {
            println!("      steps: {}", steps.join(" -> "));
        }
        if let Some(deps) = graph.dependencies_of(&target.name) {
            if !deps.is_empty() {
                println!("      after: {:?}", deps);
            }
        }
    }
    println!();

    println!("plan:");
    for (i, group) in graph.plan().groups().iter().enumerate() {
        println!("  {}: {}", i + 1, group.join(", "));
    }
    println!();

    println!("watch ({}):", bindings.len());
    for binding in bindings.iter() {
        println!("  {} -> {}", binding.pattern(), binding.targets().join(", "));
    }

    debug!("dry-run complete (no execution)");
}
