#![allow(dead_code)]

use std::path::PathBuf;

use assetflow::config::{ConfigFile, RawConfigFile, RawPathConfig};
use assetflow::errors::Result;
use assetflow::types::CacheStorageMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    root: PathBuf,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
            root: PathBuf::from("."),
        }
    }

    /// Override `[paths.<key>]` entirely.
    pub fn with_path(mut self, key: &str, path: RawPathConfig) -> Self {
        self.config.paths.insert(key.to_string(), path);
        self
    }

    pub fn with_source(mut self, key: &str, src: &str) -> Self {
        self.entry(key).src = Some(src.to_string());
        self
    }

    pub fn with_dest(mut self, key: &str, dest: &str) -> Self {
        self.entry(key).dest = Some(dest.to_string());
        self
    }

    pub fn with_watch(mut self, key: &str, watch: &str) -> Self {
        self.entry(key).watch = Some(watch.to_string());
        self
    }

    pub fn with_exclude(mut self, key: &str, pattern: &str) -> Self {
        self.entry(key)
            .exclude
            .get_or_insert_with(Vec::new)
            .push(pattern.to_string());
        self
    }

    pub fn with_after(mut self, key: &str, dep: &str) -> Self {
        self.entry(key).after.push(dep.to_string());
        self
    }

    pub fn with_build_root(mut self, build_root: &str) -> Self {
        self.config.project.build_root = build_root.to_string();
        self
    }

    pub fn with_memory_cache(mut self) -> Self {
        self.config.project.cache = CacheStorageMode::Memory;
        self
    }

    /// Project root all relative paths resolve against (default `.`).
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn raw(&self) -> &RawConfigFile {
        &self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        Ok(ConfigFile::try_from(self.config)?.with_root(self.root))
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }

    fn entry(&mut self, key: &str) -> &mut RawPathConfig {
        self.config.paths.entry(key.to_string()).or_default()
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
