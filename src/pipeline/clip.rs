// src/pipeline/clip.rs

use tracing::debug;

use crate::errors::TransformError;
use crate::pipeline::{FileBuf, Transform, TransformContext};

/// Drops outputs that are empty, or whitespace-only text.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipEmpty;

fn is_blank(contents: &[u8]) -> bool {
    contents.iter().all(|b| b.is_ascii_whitespace())
}

impl Transform for ClipEmpty {
    fn name(&self) -> &'static str {
        "clip"
    }

    fn apply(
        &self,
        files: Vec<FileBuf>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<FileBuf>, TransformError> {
        Ok(files
            .into_iter()
            .filter(|f| {
                let keep = !is_blank(&f.contents);
                if !keep {
                    debug!(path = ?f.path, "clipping empty output");
                }
                keep
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::MemoryCacheStore;

    #[test]
    fn blank_files_are_dropped() {
        let fs = MockFileSystem::new();
        let cache = MemoryCacheStore::new();
        let ctx = TransformContext {
            fs: &fs,
            root: Path::new("."),
            cache: &cache,
        };
        let files = vec![
            FileBuf::new("empty.html", "", "src/empty.html"),
            FileBuf::new("blank.html", " \n\t", "src/blank.html"),
            FileBuf::new("index.html", "<p>hi</p>", "src/index.html"),
        ];
        let out = ClipEmpty.apply(files, &ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, Path::new("index.html"));
    }
}
