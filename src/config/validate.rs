// src/config/validate.rs

use std::collections::BTreeMap;
use std::path::Path;

use globset::Glob;

use crate::config::model::{ConfigFile, PathConfig, PathTable, RawConfigFile};
use crate::dag::CLEAN_TARGET;
use crate::errors::{PipelineError, Result};
use crate::pipeline::normalize_path;
use crate::types::AssetCategory;
use crate::watch::patterns::glob_base;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let paths = build_path_table(&raw)?;
        validate_project(&raw, &paths)?;
        validate_globs(&paths)?;
        validate_after_refs(&paths)?;
        Ok(ConfigFile::new_unchecked(raw.project, raw.server, paths))
    }
}

/// Layer `[paths.*]` overrides over the defaults. Each category ends up with
/// exactly one entry; unknown keys are rejected.
fn build_path_table(raw: &RawConfigFile) -> Result<PathTable> {
    let mut entries: BTreeMap<AssetCategory, PathConfig> = AssetCategory::ALL
        .into_iter()
        .map(|c| (c, PathConfig::default_for(c)))
        .collect();

    for (key, override_cfg) in raw.paths.iter() {
        let category: AssetCategory = key.parse()?;
        let merged = PathConfig::default_for(category).merged_with(override_cfg);
        entries.insert(category, merged);
    }

    Ok(PathTable::new_unchecked(entries))
}

fn validate_project(raw: &RawConfigFile, paths: &PathTable) -> Result<()> {
    let build_root = normalize_path(Path::new(raw.project.build_root.trim()));

    if build_root.as_os_str().is_empty() {
        return Err(PipelineError::ConfigError(
            "[project].build_root must name a directory below the project root".to_string(),
        ));
    }

    // `clean` wipes the build root, so it must never contain sources.
    for entry in paths.iter() {
        let base = normalize_path(&glob_base(&entry.source));
        if base.starts_with(&build_root) {
            return Err(PipelineError::ConfigError(format!(
                "sources of '{}' ({}) live inside build_root '{}'",
                entry.category,
                entry.source,
                raw.project.build_root
            )));
        }
    }

    Ok(())
}

fn validate_globs(paths: &PathTable) -> Result<()> {
    for entry in paths.iter() {
        let patterns = std::iter::once(&entry.source)
            .chain(std::iter::once(&entry.watch))
            .chain(entry.exclude.iter());

        for pat in patterns {
            Glob::new(pat).map_err(|e| {
                PipelineError::ConfigError(format!(
                    "invalid glob '{}' for '{}': {}",
                    pat, entry.category, e
                ))
            })?;
        }

        if entry.output_dir.as_os_str().is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "[paths.{}].dest must not be empty",
                entry.category
            )));
        }
    }
    Ok(())
}

fn validate_after_refs(paths: &PathTable) -> Result<()> {
    for entry in paths.iter() {
        for dep in entry.after.iter() {
            let known = dep == CLEAN_TARGET || AssetCategory::from_target_name(dep).is_some();
            if !known {
                return Err(PipelineError::ConfigError(format!(
                    "[paths.{}] has unknown target '{}' in `after`",
                    entry.category, dep
                )));
            }
        }
    }
    Ok(())
}
