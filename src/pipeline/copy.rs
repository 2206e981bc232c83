// src/pipeline/copy.rs

use crate::errors::TransformError;
use crate::pipeline::{FileBuf, Transform, TransformContext};

/// Identity step for assets that are published as-is (fonts, icon fonts).
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyFiles;

impl Transform for CopyFiles {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn apply(
        &self,
        files: Vec<FileBuf>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<FileBuf>, TransformError> {
        Ok(files)
    }
}
