// src/pipeline/scss.rs

//! SCSS compilation with `grass`.
//!
//! grass resolves `@import`, `@use` and `@forward` itself, reading through
//! [`ProjectFs`] so lookups go to the project filesystem relative to the
//! importing file. Every stylesheet it reads is recorded in the file's
//! `sources` (and therefore in the CSS source map).

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::errors::TransformError;
use crate::fs::FileSystem;
use crate::pipeline::{normalize_path, slash_path, FileBuf, Transform, TransformContext};

const STEP: &str = "scss";

#[derive(Debug, Clone, Copy, Default)]
pub struct ScssCompile;

impl Transform for ScssCompile {
    fn name(&self) -> &'static str {
        STEP
    }

    fn apply(
        &self,
        files: Vec<FileBuf>,
        ctx: &TransformContext<'_>,
    ) -> Result<Vec<FileBuf>, TransformError> {
        let mut out = Vec::with_capacity(files.len());

        for file in files {
            if is_partial(&file.path) {
                tracing::debug!(path = ?file.path, "skipping scss partial");
                continue;
            }
            if !matches!(file.extension(), Some("scss")) {
                out.push(file);
                continue;
            }
            out.push(compile_file(file, ctx)?);
        }

        Ok(out)
    }
}

/// [`grass::Fs`] over the project filesystem.
///
/// The entry stylesheet is served from the in-flight buffer; everything else
/// is read from `fs`. Paths are folded to project-relative form before the
/// lookup, and each file read is remembered.
struct ProjectFs<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
    entry: PathBuf,
    entry_contents: &'a [u8],
    read: Mutex<Vec<PathBuf>>,
}

impl std::fmt::Debug for ProjectFs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectFs")
            .field("root", &self.root)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

impl<'a> ProjectFs<'a> {
    fn new(ctx: &TransformContext<'a>, entry: &Path, entry_contents: &'a [u8]) -> Self {
        Self {
            fs: ctx.fs,
            root: ctx.root,
            entry: normalize_path(entry),
            entry_contents,
            read: Mutex::new(Vec::new()),
        }
    }

    /// Project-relative form of a path grass asks about.
    fn relative(&self, path: &Path) -> PathBuf {
        normalize_path(path.strip_prefix(self.root).unwrap_or(path))
    }

    fn absolute(&self, rel: &Path) -> PathBuf {
        self.root.join(rel)
    }

    fn into_read(self) -> Vec<PathBuf> {
        self.read.into_inner()
    }
}

impl grass::Fs for ProjectFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.fs.is_dir(&self.absolute(&self.relative(path)))
    }

    fn is_file(&self, path: &Path) -> bool {
        let rel = self.relative(path);
        rel == self.entry || self.fs.is_file(&self.absolute(&rel))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let rel = self.relative(path);
        let bytes = if rel == self.entry {
            self.entry_contents.to_vec()
        } else {
            self.fs
                .read(&self.absolute(&rel))
                .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("{e:#}")))?
        };

        let mut read = self.read.lock();
        if !read.contains(&rel) {
            read.push(rel);
        }
        Ok(bytes)
    }
}

fn compile_file(mut file: FileBuf, ctx: &TransformContext<'_>) -> Result<FileBuf, TransformError> {
    let origin = file
        .origin()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| file.path.clone());

    let css = {
        let project_fs = ProjectFs::new(ctx, &origin, &file.contents);
        let options = grass::Options::default()
            .fs(&project_fs)
            .style(grass::OutputStyle::Expanded);

        let css = grass::from_path(ctx.root.join(&origin), &options).map_err(|e| {
            TransformError::new(STEP, format!("{}: {}", slash_path(&origin), e))
        })?;
        drop(options);

        for source in project_fs.into_read() {
            file.add_source(source);
        }
        css
    };

    file.path.set_extension("css");
    file.contents = css.into_bytes();
    Ok(file)
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::MemoryCacheStore;

    fn compile(fs: &MockFileSystem, file: FileBuf) -> Result<Vec<FileBuf>, TransformError> {
        let cache = MemoryCacheStore::new();
        let ctx = TransformContext {
            fs,
            root: Path::new("."),
            cache: &cache,
        };
        ScssCompile.apply(vec![file], &ctx)
    }

    fn project_with_vars() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("./style/partials/_vars.scss", "$primary: #336699;\n");
        fs
    }

    fn css_of(out: &[FileBuf]) -> String {
        String::from_utf8(out[0].contents.clone()).unwrap()
    }

    #[test]
    fn partial_variables_are_substituted() {
        let fs = project_with_vars();
        let file = FileBuf::new(
            "main.scss",
            "@import 'partials/vars';\n.btn { color: $primary; }\n",
            "style/main.scss",
        );

        let out = compile(&fs, file).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path, PathBuf::from("main.css"));
        let css = css_of(&out);
        assert!(css.contains("color: #336699"), "{css}");
        assert!(!css.contains("$primary"), "{css}");
        assert_eq!(
            out[0].sources,
            vec![
                PathBuf::from("style/main.scss"),
                PathBuf::from("style/partials/_vars.scss")
            ]
        );
    }

    #[test]
    fn use_rule_resolves_relative_to_the_importer() {
        let fs = project_with_vars();
        let file = FileBuf::new(
            "main.scss",
            "@use \"partials/vars\" as *;\n.btn { color: $primary; }\n",
            "style/main.scss",
        );

        let out = compile(&fs, file).unwrap();
        assert!(css_of(&out).contains("#336699"));
        assert!(out[0].sources.contains(&PathBuf::from("style/partials/_vars.scss")));
    }

    #[test]
    fn import_with_trailing_comment_compiles() {
        let fs = project_with_vars();
        let file = FileBuf::new(
            "main.scss",
            "@import \"partials/vars\"; // colours\n.btn { color: $primary; }\n",
            "style/main.scss",
        );

        let out = compile(&fs, file).unwrap();
        assert!(css_of(&out).contains("#336699"));
    }

    #[test]
    fn import_inside_block_comment_is_ignored() {
        let fs = MockFileSystem::new();
        let file = FileBuf::new(
            "main.scss",
            "/*\n@import 'old/removed';\n*/\n.btn { color: red; }\n",
            "style/main.scss",
        );

        let out = compile(&fs, file).unwrap();
        assert!(css_of(&out).contains("color: red"));
        assert_eq!(out[0].sources, vec![PathBuf::from("style/main.scss")]);
    }

    #[test]
    fn parent_relative_imports_are_normalized() {
        let fs = MockFileSystem::new();
        fs.add_file("./shared/_mixins.scss", "$gap: 4px;\n");
        let file = FileBuf::new(
            "main.scss",
            "@import '../shared/mixins';\n.a { margin: $gap; }\n",
            "style/main.scss",
        );

        let out = compile(&fs, file).unwrap();
        assert!(css_of(&out).contains("margin: 4px"));
        assert!(out[0].sources.contains(&PathBuf::from("shared/_mixins.scss")));
    }

    #[test]
    fn unresolved_import_fails_the_step() {
        let fs = MockFileSystem::new();
        let file = FileBuf::new("main.scss", "@import 'missing';\n", "style/main.scss");
        let err = compile(&fs, file).unwrap_err();
        assert_eq!(err.step, "scss");
        assert!(err.message.starts_with("style/main.scss"), "{}", err.message);
    }

    #[test]
    fn partials_are_not_emitted() {
        let fs = MockFileSystem::new();
        let file = FileBuf::new("_vars.scss", "$a: 1;\n", "style/_vars.scss");
        assert!(compile(&fs, file).unwrap().is_empty());
    }
}
