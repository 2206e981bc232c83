// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{PipelineError, Result};
use crate::types::{AssetCategory, CacheStorageMode};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [project]
/// build_root = "assets/build"
///
/// [server]
/// port = 3000
///
/// [paths.css]
/// src = "assets/src/style/main.scss"
/// dest = "assets/build/css/"
/// watch = "assets/src/style/**/*.scss"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub server: ServerSection,

    /// Per-category overrides from `[paths.<category>]`.
    ///
    /// Keys are kept as strings so an unknown category can be reported as
    /// such instead of as a generic TOML error.
    #[serde(default)]
    pub paths: BTreeMap<String, RawPathConfig>,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Directory wiped by the `clean` target.
    #[serde(default = "default_build_root")]
    pub build_root: String,

    /// Where optimized images are cached between runs.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// `"file"` (default) or `"memory"`.
    #[serde(default)]
    pub cache: CacheStorageMode,
}

fn default_build_root() -> String {
    "assets/build".to_string()
}

fn default_cache_dir() -> String {
    ".assetflow/cache".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            build_root: default_build_root(),
            cache_dir: default_cache_dir(),
            cache: CacheStorageMode::default(),
        }
    }
}

/// `[server]` section: dev server and live reload.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket port used to push reload messages.
    #[serde(default = "default_reload_port")]
    pub reload_port: u16,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_reload_port() -> u16 {
    35729
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
            reload_port: default_reload_port(),
        }
    }
}

/// `[paths.<category>]` section. Every field falls back to the built-in
/// default for that category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPathConfig {
    /// Source glob (what the target reads).
    #[serde(default)]
    pub src: Option<String>,

    /// Output directory.
    #[serde(default)]
    pub dest: Option<String>,

    /// Watch glob (what re-triggers the target).
    #[serde(default)]
    pub watch: Option<String>,

    /// Globs removed from both the source set and the watch set.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,

    /// Extra targets that must complete before this one in a full build.
    #[serde(default)]
    pub after: Vec<String>,
}

/// Validated path entry for one category. Patterns are relative to the
/// project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    pub category: AssetCategory,
    pub source: String,
    pub output_dir: PathBuf,
    pub watch: String,
    pub exclude: Vec<String>,
    pub after: Vec<String>,
}

impl PathConfig {
    /// Built-in default for a category, following the usual
    /// `assets/src` -> `assets/build` layout.
    pub fn default_for(category: AssetCategory) -> Self {
        let (source, output_dir, watch) = match category {
            AssetCategory::Html => (
                "assets/src/*.html",
                "assets/build/",
                "assets/src/**/*.html",
            ),
            AssetCategory::Js => (
                "assets/src/js/main.js",
                "assets/build/js/",
                "assets/src/js/**/*.js",
            ),
            AssetCategory::Css => (
                "assets/src/style/main.scss",
                "assets/build/css/",
                "assets/src/style/**/*.scss",
            ),
            AssetCategory::Image => (
                "assets/src/img/**/*.*",
                "assets/build/img/",
                "assets/src/img/**/*.*",
            ),
            AssetCategory::Font => (
                "assets/src/fonts/**/*.*",
                "assets/build/fonts/",
                "assets/src/fonts/**/*.*",
            ),
            AssetCategory::Icon => (
                "assets/src/webfonts/**/*.*",
                "assets/build/webfonts/",
                "assets/src/webfonts/**/*.*",
            ),
        };

        Self {
            category,
            source: source.to_string(),
            output_dir: PathBuf::from(output_dir),
            watch: watch.to_string(),
            exclude: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Apply a raw override on top of this entry.
    pub fn merged_with(mut self, raw: &RawPathConfig) -> Self {
        if let Some(ref src) = raw.src {
            self.source = src.clone();
        }
        if let Some(ref dest) = raw.dest {
            self.output_dir = PathBuf::from(dest);
        }
        if let Some(ref watch) = raw.watch {
            self.watch = watch.clone();
        }
        if let Some(ref exclude) = raw.exclude {
            self.exclude = exclude.clone();
        }
        self.after = raw.after.clone();
        self
    }
}

/// Immutable category -> path entry table. Holds exactly one entry per
/// [`AssetCategory`] once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTable {
    entries: BTreeMap<AssetCategory, PathConfig>,
}

impl PathTable {
    pub(crate) fn new_unchecked(entries: BTreeMap<AssetCategory, PathConfig>) -> Self {
        Self { entries }
    }

    /// Table made only of built-in defaults.
    pub fn defaults() -> Self {
        let entries = AssetCategory::ALL
            .into_iter()
            .map(|c| (c, PathConfig::default_for(c)))
            .collect();
        Self { entries }
    }

    /// Look up the entry for `category`.
    pub fn config_for(&self, category: AssetCategory) -> Result<&PathConfig> {
        self.entries
            .get(&category)
            .ok_or_else(|| PipelineError::UnknownCategory(category.to_string()))
    }

    /// Entries in category order.
    pub fn iter(&self) -> impl Iterator<Item = &PathConfig> {
        AssetCategory::ALL
            .iter()
            .filter_map(|c| self.entries.get(c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validated configuration. Construct via `ConfigFile::try_from(RawConfigFile)`
/// or [`crate::config::load_and_validate`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Directory every relative path is resolved against.
    root: PathBuf,
    pub project: ProjectSection,
    pub server: ServerSection,
    paths: PathTable,
}

impl Default for ConfigFile {
    /// Built-in defaults, rooted at the working directory.
    fn default() -> Self {
        Self::new_unchecked(
            ProjectSection::default(),
            ServerSection::default(),
            PathTable::defaults(),
        )
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        project: ProjectSection,
        server: ServerSection,
        paths: PathTable,
    ) -> Self {
        Self {
            root: PathBuf::from("."),
            project,
            server,
            paths,
        }
    }

    /// Re-root the configuration (used by the loader: paths are relative to
    /// the directory holding the config file).
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    /// Shorthand for `paths().config_for(category)`.
    pub fn config_for(&self, category: AssetCategory) -> Result<&PathConfig> {
        self.paths.config_for(category)
    }

    /// Build root, resolved against the project root.
    pub fn build_root(&self) -> PathBuf {
        self.root.join(&self.project.build_root)
    }

    /// Cache directory, resolved against the project root.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.project.cache_dir)
    }
}
