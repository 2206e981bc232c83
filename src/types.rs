use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::PipelineError;

/// Logical asset category. Each category owns exactly one path entry and
/// one build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Html,
    Js,
    Css,
    Image,
    Font,
    Icon,
}

impl AssetCategory {
    /// Every category, in the order used for plans and reports.
    pub const ALL: [AssetCategory; 6] = [
        AssetCategory::Html,
        AssetCategory::Css,
        AssetCategory::Js,
        AssetCategory::Image,
        AssetCategory::Font,
        AssetCategory::Icon,
    ];

    /// Key used in `[paths.<key>]`.
    pub fn key(self) -> &'static str {
        match self {
            AssetCategory::Html => "html",
            AssetCategory::Js => "js",
            AssetCategory::Css => "css",
            AssetCategory::Image => "image",
            AssetCategory::Font => "font",
            AssetCategory::Icon => "icon",
        }
    }

    /// Name of the build target bound to this category.
    pub fn target_name(self) -> &'static str {
        match self {
            AssetCategory::Html => "html",
            AssetCategory::Js => "js",
            AssetCategory::Css => "css",
            AssetCategory::Image => "images",
            AssetCategory::Font => "fonts",
            AssetCategory::Icon => "icons",
        }
    }

    /// Position in [`AssetCategory::ALL`].
    pub fn ordinal(self) -> usize {
        AssetCategory::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or(AssetCategory::ALL.len())
    }

    /// Reverse lookup from a target name (`images` -> `Image`).
    pub fn from_target_name(name: &str) -> Option<AssetCategory> {
        AssetCategory::ALL
            .into_iter()
            .find(|c| c.target_name() == name)
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AssetCategory {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(AssetCategory::Html),
            "js" => Ok(AssetCategory::Js),
            "css" => Ok(AssetCategory::Css),
            "image" => Ok(AssetCategory::Image),
            "font" => Ok(AssetCategory::Font),
            "icon" => Ok(AssetCategory::Icon),
            other => Err(PipelineError::UnknownCategory(other.to_string())),
        }
    }
}

/// Where optimized image results are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStorageMode {
    /// Store entries as files under the project cache directory.
    File,
    /// Keep entries in memory only (lost on restart).
    Memory,
}

impl Default for CacheStorageMode {
    fn default() -> Self {
        CacheStorageMode::File
    }
}
