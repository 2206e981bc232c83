// src/pipeline/sourcemap.rs

//! Source Map v3 documents for minified artifacts.
//!
//! The minifiers (`lightningcss`, `oxc`) map the minified output back onto
//! the compiled artifact, which is always source 0. The map then lists every
//! source recorded on the artifact with its content, so browser dev tools
//! can show the SCSS / JS it came from without the project tree being served.

use serde::{Deserialize, Serialize};

use crate::errors::TransformError;
use crate::pipeline::{slash_path, FileBuf, TransformContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    pub file: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<Option<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

/// Mapping data produced by a minifier for a single input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Mappings {
    pub mappings: String,
    #[serde(default)]
    pub names: Vec<String>,
}

impl Mappings {
    /// Pull `mappings` and `names` out of a minifier's own JSON map.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("invalid source map: {e}"))
    }

    /// Number of mapping segments.
    pub fn segments(&self) -> usize {
        self.mappings
            .split([',', ';'])
            .filter(|s| !s.is_empty())
            .count()
    }
}

/// Minified code plus its mappings onto the unminified input.
#[derive(Debug, Clone)]
pub struct Minified {
    pub code: String,
    pub map: Mappings,
}

impl SourceMap {
    /// Map for `file` (the minified file name) generated from `compiled`.
    ///
    /// The first source is the compiled artifact itself; the rest are the
    /// project-relative sources recorded on it.
    pub fn for_artifact(
        file: &str,
        compiled: &FileBuf,
        map: Mappings,
        ctx: &TransformContext<'_>,
    ) -> Self {
        let compiled_name = compiled
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut sources = vec![compiled_name];
        let mut sources_content =
            vec![Some(String::from_utf8_lossy(&compiled.contents).into_owned())];

        for source in &compiled.sources {
            let name = slash_path(source);
            if sources.contains(&name) {
                continue;
            }
            let content = ctx.fs.read_to_string(&ctx.root.join(source)).ok();
            sources.push(name);
            sources_content.push(content);
        }

        Self {
            version: 3,
            file: file.to_string(),
            sources,
            sources_content,
            names: map.names,
            mappings: map.mappings,
        }
    }

    pub fn to_json(&self) -> Result<String, TransformError> {
        serde_json::to_string(self).map_err(|e| TransformError::new("sourcemap", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minifier_json_is_reduced_to_mappings_and_names() {
        let json = r#"{"version":3,"sourceRoot":null,"mappings":"AAAA,SAAS;AACT","sources":["a.css"],"sourcesContent":["x"],"names":["a"]}"#;
        let map = Mappings::from_json(json).unwrap();
        assert_eq!(map.mappings, "AAAA,SAAS;AACT");
        assert_eq!(map.names, vec!["a".to_string()]);
        assert_eq!(map.segments(), 3);
    }

    #[test]
    fn names_default_to_empty() {
        let map = Mappings::from_json(r#"{"mappings":""}"#).unwrap();
        assert_eq!(map.segments(), 0);
        assert!(map.names.is_empty());
    }
}
