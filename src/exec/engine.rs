// src/exec/engine.rs

//! Execution engine: runs one target's pipeline against the filesystem, or
//! a whole plan through the core runtime.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::model::ConfigFile;
use crate::dag::{build_graph, Target, TargetKind, TaskGraph};
use crate::engine::{BuildReport, CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TargetName};
use crate::errors::{PipelineError, Result};
use crate::exec::backend::RealExecutorBackend;
use crate::fs::FileSystem;
use crate::pipeline::cache::open_cache;
use crate::pipeline::{apply_steps, CacheStore, FileBuf, TransformContext};
use crate::types::AssetCategory;
use crate::watch::patterns::{collect_matching_files, SourceSet};

/// What a successful target run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub target: TargetName,
    pub files_read: usize,
    /// Paths written (or removed, for `clean`), relative to the project root.
    pub files_written: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Runs targets. Cheap to share behind an `Arc`; every run is synchronous
/// and meant for `spawn_blocking`.
pub struct ExecutionEngine {
    config: ConfigFile,
    graph: TaskGraph,
    fs: Arc<dyn FileSystem>,
    cache: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("root", &self.config.root())
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    pub fn new(
        config: ConfigFile,
        graph: TaskGraph,
        fs: Arc<dyn FileSystem>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            config,
            graph,
            fs,
            cache,
        }
    }

    /// Build the graph from `config` and open the configured image cache.
    pub fn from_config(config: ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let graph = build_graph(&config)?;
        let cache = open_cache(config.project.cache, config.cache_dir(), Arc::clone(&fs));
        Ok(Self::new(config, graph, fs, cache))
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Run the target called `name`.
    pub fn run_named(&self, name: &str) -> Result<TargetReport> {
        let target = self
            .graph
            .target(name)
            .ok_or_else(|| PipelineError::target_failed(name, "unknown target"))?;
        self.run(target)
    }

    /// Run one target. Any failure is reported as `TargetFailed`; files
    /// already written stay in place.
    pub fn run(&self, target: &Target) -> Result<TargetReport> {
        let started = Instant::now();
        info!(target = %target.name, steps = ?target.step_names(), "running target");

        let result = match target.kind {
            TargetKind::Clean => self.run_clean(),
            TargetKind::Asset(category) => self.run_asset(target, category),
        };

        match result {
            Ok((files_read, files_written)) => {
                let report = TargetReport {
                    target: target.name.clone(),
                    files_read,
                    files_written,
                    elapsed: started.elapsed(),
                };
                info!(
                    target = %target.name,
                    read = report.files_read,
                    written = report.files_written.len(),
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "target finished"
                );
                Ok(report)
            }
            Err(cause) => Err(PipelineError::target_failed(target.name.clone(), cause)),
        }
    }

    /// Remove everything inside the build root; the root itself stays.
    fn run_clean(&self) -> std::result::Result<(usize, Vec<PathBuf>), String> {
        let build_root = self.config.build_root();
        if !self.fs.is_dir(&build_root) {
            debug!(build_root = ?build_root, "build root missing; nothing to clean");
            return Ok((0, Vec::new()));
        }

        let entries = self.fs.read_dir(&build_root).map_err(|e| format!("{e:#}"))?;
        let mut removed = Vec::with_capacity(entries.len());
        for entry in entries {
            self.fs.remove_all(&entry).map_err(|e| format!("{e:#}"))?;
            removed.push(self.project_relative(&entry));
        }
        Ok((0, removed))
    }

    fn run_asset(
        &self,
        target: &Target,
        category: AssetCategory,
    ) -> std::result::Result<(usize, Vec<PathBuf>), String> {
        let root = self.config.root();
        let entry = self.config.config_for(category).map_err(|e| e.to_string())?;
        let sources = SourceSet::from_path_config(entry).map_err(|e| format!("{e:#}"))?;

        let paths = collect_matching_files(self.fs.as_ref(), root, &sources)
            .map_err(|e| format!("{e:#}"))?;
        let base = root.join(sources.base());

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            let contents = self.fs.read(path).map_err(|e| format!("{e:#}"))?;
            let rel = path.strip_prefix(&base).unwrap_or(path).to_path_buf();
            files.push(FileBuf::new(rel, contents, self.project_relative(path)));
        }
        let files_read = files.len();
        debug!(target = %target.name, files = files_read, "read sources");

        let ctx = TransformContext {
            fs: self.fs.as_ref(),
            root,
            cache: self.cache.as_ref(),
        };
        let outputs = apply_steps(&target.pipeline, files, &ctx).map_err(|e| e.to_string())?;

        let out_dir = root.join(&entry.output_dir);
        let mut written = Vec::with_capacity(outputs.len());
        for file in outputs {
            let dest = out_dir.join(&file.path);
            self.fs.write(&dest, &file.contents).map_err(|e| format!("{e:#}"))?;
            written.push(self.project_relative(&dest));
        }

        Ok((files_read, written))
    }

    fn project_relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.config.root())
            .unwrap_or(path)
            .to_path_buf()
    }

    /// Run the full plan once (`clean`, then every asset target) and return
    /// its report. Failures are recorded, never raised.
    pub async fn run_plan(self: &Arc<Self>) -> Result<BuildReport> {
        let (tx, rx) = mpsc::channel::<RuntimeEvent>(64);
        let executor = RealExecutorBackend::new(Arc::clone(self), tx.clone());
        let core = CoreRuntime::new(
            self.graph.clone(),
            RuntimeOptions {
                exit_when_idle: true,
            },
        );

        tx.send(RuntimeEvent::StartRequested)
            .await
            .map_err(|e| PipelineError::Other(e.into()))?;

        Runtime::new(core, rx, executor).run().await
    }
}
