// src/pipeline/include.rs

//! `//= path` include directives.
//!
//! A line whose trimmed content starts with `//=` is replaced by the content
//! of the named file, resolved relative to the including file. Includes nest;
//! every included line keeps the directive's indentation.

use std::path::{Path, PathBuf};

use crate::errors::TransformError;
use crate::pipeline::{normalize_path, slash_path, FileBuf, Transform, TransformContext};

const STEP: &str = "include";

#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeResolver;

impl Transform for IncludeResolver {
    fn name(&self) -> &'static str {
        STEP
    }

    fn apply(
        &self,
        files: Vec<FileBuf>,
        ctx: &TransformContext<'_>,
    ) -> Result<Vec<FileBuf>, TransformError> {
        files
            .into_iter()
            .map(|mut file| {
                let origin = file
                    .origin()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| file.path.clone());
                let text = file.text(STEP)?.to_string();

                let mut stack = vec![origin.clone()];
                let mut included = Vec::new();
                let expanded = expand(&text, &origin, ctx, &mut stack, &mut included)?;

                for source in included {
                    file.add_source(source);
                }
                file.contents = expanded.into_bytes();
                Ok(file)
            })
            .collect()
    }
}

/// Split a directive line into (indentation, target path).
fn parse_directive(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    let target = trimmed.strip_prefix("//=")?.trim();
    let target = target.trim_matches(|c| c == '"' || c == '\'');
    if target.is_empty() {
        return None;
    }
    Some((indent, target))
}

fn expand(
    text: &str,
    current: &Path,
    ctx: &TransformContext<'_>,
    stack: &mut Vec<PathBuf>,
    included: &mut Vec<PathBuf>,
) -> Result<String, TransformError> {
    let dir = current.parent().unwrap_or_else(|| Path::new(""));
    let mut out = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        let body = body.strip_suffix('\r').unwrap_or(body);

        let Some((indent, target)) = parse_directive(body) else {
            out.push_str(line);
            continue;
        };

        let rel = normalize_path(&dir.join(target));
        if stack.contains(&rel) {
            return Err(TransformError::new(
                STEP,
                format!(
                    "include cycle: {} includes {}",
                    slash_path(current),
                    slash_path(&rel)
                ),
            ));
        }

        let abs = ctx.root.join(&rel);
        if !ctx.fs.is_file(&abs) {
            return Err(TransformError::new(
                STEP,
                format!(
                    "{} includes missing file {}",
                    slash_path(current),
                    slash_path(&rel)
                ),
            ));
        }
        let content = ctx
            .fs
            .read_to_string(&abs)
            .map_err(|e| TransformError::new(STEP, format!("{e:#}")))?;

        stack.push(rel.clone());
        let nested = expand(&content, &rel, ctx, stack, included)?;
        stack.pop();

        if !included.contains(&rel) {
            included.push(rel);
        }

        let spliced: Vec<String> = nested.lines().map(|l| format!("{indent}{l}")).collect();
        out.push_str(&spliced.join("\n"));
        out.push_str(newline);
    }

    Ok(out)
}
