use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::model::{ConfigFile, PathConfig};
use crate::engine::TargetName;
use crate::fs::FileSystem;

/// Binding from one watch glob to the targets it re-runs.
///
/// Categories that declare the same watch glob (and excludes) share a single
/// binding that triggers all of them, in category order.
#[derive(Clone)]
pub struct WatchBinding {
    pattern: String,
    watch_set: GlobSet,
    exclude: Vec<String>,
    exclude_set: Option<GlobSet>,
    targets: Vec<TargetName>,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("pattern", &self.pattern)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(pattern: &str, exclude: &[String], targets: Vec<TargetName>) -> Result<Self> {
        let watch_set = build_globset(&[pattern.to_string()])
            .with_context(|| format!("building watch globset for {pattern}"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for {pattern}"))?,
            )
        };

        Ok(Self {
            pattern: pattern.to_string(),
            watch_set,
            exclude: exclude.to_vec(),
            exclude_set,
            targets,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Targets re-run when this binding matches, in declaration order.
    pub fn targets(&self) -> &[TargetName] {
        &self.targets
    }

    /// Returns true if the given path (relative to project root, forward
    /// slashes) is watched by this binding.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// All watch bindings of a project.
#[derive(Debug, Clone, Default)]
pub struct WatchBindings {
    bindings: Vec<WatchBinding>,
}

impl WatchBindings {
    pub fn new(bindings: Vec<WatchBinding>) -> Self {
        Self { bindings }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Targets to re-run for a changed path. Each target appears at most
    /// once, in binding order.
    pub fn targets_for(&self, rel_path: &str) -> Vec<TargetName> {
        let mut out: Vec<TargetName> = Vec::new();
        for binding in self.bindings.iter().filter(|b| b.matches(rel_path)) {
            for target in binding.targets() {
                if !out.contains(target) {
                    out.push(target.clone());
                }
            }
        }
        out
    }
}

/// Build one binding per distinct (watch glob, excludes) pair.
pub fn build_bindings(cfg: &ConfigFile) -> Result<WatchBindings> {
    let mut grouped: Vec<(String, Vec<String>, Vec<TargetName>)> = Vec::new();

    for entry in cfg.paths().iter() {
        let target = entry.category.target_name().to_string();
        match grouped
            .iter_mut()
            .find(|(pat, ex, _)| *pat == entry.watch && *ex == entry.exclude)
        {
            Some((_, _, targets)) => targets.push(target),
            None => grouped.push((entry.watch.clone(), entry.exclude.clone(), vec![target])),
        }
    }

    let bindings = grouped
        .into_iter()
        .map(|(pattern, exclude, targets)| WatchBinding::new(&pattern, &exclude, targets))
        .collect::<Result<Vec<_>>>()?;

    Ok(WatchBindings::new(bindings))
}

/// Compiled source selection for one category: the glob, its base directory
/// and the exclude globs.
#[derive(Clone)]
pub struct SourceSet {
    base: PathBuf,
    source_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSet")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl SourceSet {
    pub fn from_path_config(entry: &PathConfig) -> Result<Self> {
        let source_set = build_globset(&[entry.source.clone()])
            .with_context(|| format!("building source globset for {}", entry.category))?;
        let exclude_set = if entry.exclude.is_empty() {
            None
        } else {
            Some(build_globset(&entry.exclude)?)
        };
        Ok(Self {
            base: glob_base(&entry.source),
            source_set,
            exclude_set,
        })
    }

    /// Directory (relative to the project root) output paths are made
    /// relative to.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.source_set.is_match(rel_path) {
            return false;
        }
        match &self.exclude_set {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }
}

/// Non-glob prefix of a pattern: `assets/src/img/**/*.*` -> `assets/src/img`.
///
/// A pattern without glob characters names a single file; its base is the
/// containing directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let is_glob = |s: &str| s.contains(['*', '?', '[', '{']);

    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    let mut saw_glob = false;

    for component in path.components() {
        let text = component.as_os_str().to_string_lossy();
        if is_glob(&text) {
            saw_glob = true;
            break;
        }
        match component {
            Component::CurDir => {}
            other => base.push(other.as_os_str()),
        }
    }

    if !saw_glob {
        base.pop();
    }
    base
}

/// Build a GlobSet from simple string patterns.
///
/// `*` does not cross directory separators; use `**` for that.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat.trim_start_matches("./"))
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `root` selected by `sources`, sorted by path.
///
/// Only the glob base is walked, not the whole project.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    sources: &SourceSet,
) -> Result<Vec<PathBuf>> {
    let start = root.join(sources.base());
    let mut files = Vec::new();
    if !fs.is_dir(&start) {
        return Ok(files);
    }

    let mut stack = vec![start];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if sources.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_base_stops_at_first_glob_component() {
        assert_eq!(glob_base("assets/src/img/**/*.*"), PathBuf::from("assets/src/img"));
        assert_eq!(glob_base("assets/src/*.html"), PathBuf::from("assets/src"));
        assert_eq!(glob_base("./assets/src/*.html"), PathBuf::from("assets/src"));
    }

    #[test]
    fn glob_base_of_plain_file_is_its_directory() {
        assert_eq!(glob_base("assets/src/js/main.js"), PathBuf::from("assets/src/js"));
        assert_eq!(glob_base("main.js"), PathBuf::new());
    }

    #[test]
    fn shared_watch_patterns_collapse_into_one_binding() {
        let a = WatchBinding::new("src/**/*.txt", &[], vec!["fonts".into(), "icons".into()])
            .unwrap();
        let b = WatchBinding::new("src/**/*.txt", &[], vec!["icons".into()]).unwrap();
        let bindings = WatchBindings::new(vec![a, b]);

        assert_eq!(
            bindings.targets_for("src/a/b.txt"),
            vec!["fonts".to_string(), "icons".to_string()]
        );
        assert!(bindings.targets_for("src/a/b.md").is_empty());
    }

    #[test]
    fn single_star_does_not_cross_directories() {
        let set = build_globset(&["assets/src/*.html".to_string()]).unwrap();
        assert!(set.is_match("assets/src/index.html"));
        assert!(!set.is_match("assets/src/template/header.html"));
    }
}
