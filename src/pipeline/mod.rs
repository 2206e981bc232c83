// src/pipeline/mod.rs

//! Transform pipelines.
//!
//! A target's pipeline is an ordered list of [`Transform`] steps. Each step
//! takes the ordered files produced by the previous one and returns a new
//! ordered list (or a [`TransformError`], which aborts the target).
//!
//! - [`include`]: `//= path` include directives (HTML and JS).
//! - [`scss`]: SCSS to CSS (`grass`), with local `@import`s inlined first.
//! - [`css`]: vendor prefixing and minification (`lightningcss`).
//! - [`js`]: JavaScript minification (`oxc`).
//! - [`minify`]: adds `.min.<ext>` siblings plus their source maps.
//! - [`images`]: re-encodes images, with a content-hash result cache.
//! - [`clip`] / [`copy`]: drop empty outputs / pass files through.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::types::AssetCategory;

pub mod cache;
pub mod clip;
pub mod copy;
pub mod css;
pub mod images;
pub mod include;
pub mod js;
pub mod minify;
pub mod scss;
pub mod sourcemap;

pub use cache::{CacheStore, FileCacheStore, MemoryCacheStore};

/// One file flowing between transform steps.
#[derive(Clone, PartialEq, Eq)]
pub struct FileBuf {
    /// Output path, relative to the target's output directory.
    pub path: PathBuf,
    pub contents: Vec<u8>,
    /// Project-relative paths of every source that contributed to this file.
    /// The first entry is the file it was read from.
    pub sources: Vec<PathBuf>,
}

impl fmt::Debug for FileBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBuf")
            .field("path", &self.path)
            .field("len", &self.contents.len())
            .field("sources", &self.sources)
            .finish()
    }
}

impl FileBuf {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>, origin: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            sources: vec![origin.into()],
        }
    }

    /// Project-relative path of the file this buffer was read from.
    pub fn origin(&self) -> Option<&Path> {
        self.sources.first().map(PathBuf::as_path)
    }

    /// Record an extra contributing source, once.
    pub fn add_source(&mut self, source: impl Into<PathBuf>) {
        let source = source.into();
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }

    pub fn text(&self, step: &str) -> Result<&str, TransformError> {
        std::str::from_utf8(&self.contents).map_err(|e| {
            TransformError::new(step, format!("{} is not UTF-8: {e}", self.path.display()))
        })
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

/// Read-only view of the project handed to every transform step.
#[derive(Clone, Copy)]
pub struct TransformContext<'a> {
    pub fs: &'a dyn FileSystem,
    /// Project root every `FileBuf::sources` entry is relative to.
    pub root: &'a Path,
    pub cache: &'a dyn CacheStore,
}

impl fmt::Debug for TransformContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformContext")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// A single pipeline step.
pub trait Transform: Send + Sync {
    /// Short step name used in logs and error messages.
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        files: Vec<FileBuf>,
        ctx: &TransformContext<'_>,
    ) -> Result<Vec<FileBuf>, TransformError>;
}

/// Shared handle to a pipeline step.
pub type Step = Arc<dyn Transform>;

fn step<T: Transform + 'static>(transform: T) -> Step {
    Arc::new(transform)
}

/// The fixed pipeline of an asset category.
pub fn pipeline_for(category: AssetCategory) -> Vec<Step> {
    match category {
        AssetCategory::Html => vec![step(include::IncludeResolver), step(clip::ClipEmpty)],
        AssetCategory::Css => vec![
            step(scss::ScssCompile),
            step(css::Autoprefix),
            step(minify::MinifiedSibling::css()),
            step(clip::ClipEmpty),
        ],
        AssetCategory::Js => vec![
            step(include::IncludeResolver),
            step(minify::MinifiedSibling::js()),
            step(clip::ClipEmpty),
        ],
        AssetCategory::Image => vec![step(images::OptimizeImages), step(clip::ClipEmpty)],
        AssetCategory::Font | AssetCategory::Icon => vec![step(copy::CopyFiles)],
    }
}

/// Run `steps` in order, feeding each step's output into the next.
pub fn apply_steps(
    steps: &[Step],
    mut files: Vec<FileBuf>,
    ctx: &TransformContext<'_>,
) -> Result<Vec<FileBuf>, TransformError> {
    for step in steps {
        tracing::trace!(step = step.name(), files = files.len(), "applying transform");
        files = step.apply(files, ctx)?;
    }
    Ok(files)
}

/// Forward-slash string form of a path, for source maps and logs.
pub(crate) fn slash_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Lexically resolve `.` and `..` components (`a/b/../c` -> `a/c`).
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_non_empty_pipeline() {
        for category in AssetCategory::ALL {
            assert!(!pipeline_for(category).is_empty(), "{category}");
        }
    }

    #[test]
    fn css_pipeline_runs_steps_in_order() {
        let names: Vec<_> = pipeline_for(AssetCategory::Css)
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, vec!["scss", "autoprefix", "minify", "clip"]);
    }

    #[test]
    fn normalize_path_folds_parent_components() {
        assert_eq!(
            normalize_path(Path::new("assets/src/js/../style/./a.scss")),
            PathBuf::from("assets/src/style/a.scss")
        );
    }
}
