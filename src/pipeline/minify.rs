// src/pipeline/minify.rs

//! Adds a minified sibling and its source map next to each compiled
//! artifact: `main.css` -> `main.css`, `main.min.css`, `main.min.css.map`.

use std::path::Path;

use crate::errors::TransformError;
use crate::pipeline::css::minify_css;
use crate::pipeline::js::minify_js;
use crate::pipeline::sourcemap::{Minified, SourceMap};
use crate::pipeline::{slash_path, FileBuf, Transform, TransformContext};

const STEP: &str = "minify";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyKind {
    Css,
    Js,
}

impl MinifyKind {
    fn extension(self) -> &'static str {
        match self {
            MinifyKind::Css => "css",
            MinifyKind::Js => "js",
        }
    }

    fn minify(self, source: &str, filename: &str) -> Result<Minified, String> {
        match self {
            MinifyKind::Css => minify_css(source, filename),
            MinifyKind::Js => minify_js(source, filename),
        }
    }

    fn map_comment(self, map_name: &str) -> String {
        match self {
            MinifyKind::Css => format!("\n/*# sourceMappingURL={map_name} */\n"),
            MinifyKind::Js => format!("\n//# sourceMappingURL={map_name}\n"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MinifiedSibling {
    kind: MinifyKind,
}

impl MinifiedSibling {
    pub fn css() -> Self {
        Self {
            kind: MinifyKind::Css,
        }
    }

    pub fn js() -> Self {
        Self {
            kind: MinifyKind::Js,
        }
    }
}

fn is_already_minified(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(".min"))
}

impl Transform for MinifiedSibling {
    fn name(&self) -> &'static str {
        STEP
    }

    fn apply(
        &self,
        files: Vec<FileBuf>,
        ctx: &TransformContext<'_>,
    ) -> Result<Vec<FileBuf>, TransformError> {
        let ext = self.kind.extension();
        let mut out = Vec::with_capacity(files.len() * 3);

        for file in files {
            if file.extension() != Some(ext) || is_already_minified(&file.path) {
                out.push(file);
                continue;
            }

            let stem = file
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let min_name = format!("{stem}.min.{ext}");
            let map_name = format!("{min_name}.map");

            let display = slash_path(&file.path);
            let Minified { mut code, map } = self
                .kind
                .minify(file.text(STEP)?, &display)
                .map_err(|e| TransformError::new(STEP, e))?;
            code.push_str(&self.kind.map_comment(&map_name));

            let map = SourceMap::for_artifact(&min_name, &file, map, ctx).to_json()?;

            let min_file = FileBuf {
                path: file.path.with_file_name(&min_name),
                contents: code.into_bytes(),
                sources: file.sources.clone(),
            };
            let map_file = FileBuf {
                path: file.path.with_file_name(&map_name),
                contents: map.into_bytes(),
                sources: file.sources.clone(),
            };

            out.push(file);
            out.push(min_file);
            out.push(map_file);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::MemoryCacheStore;

    #[test]
    fn css_gets_min_and_map_siblings() {
        let fs = MockFileSystem::new();
        fs.add_file("./style/main.scss", ".a { color: red; }\n");
        let cache = MemoryCacheStore::new();
        let ctx = TransformContext {
            fs: &fs,
            root: Path::new("."),
            cache: &cache,
        };

        let compiled = FileBuf::new("main.css", ".a {\n  color: red;\n}\n", "style/main.scss");
        let out = MinifiedSibling::css().apply(vec![compiled], &ctx).unwrap();

        let paths: Vec<PathBuf> = out.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("main.css"),
                PathBuf::from("main.min.css"),
                PathBuf::from("main.min.css.map"),
            ]
        );

        let min = String::from_utf8(out[1].contents.clone()).unwrap();
        assert!(min.ends_with("/*# sourceMappingURL=main.min.css.map */\n"), "{min}");

        let map: SourceMap = serde_json::from_slice(&out[2].contents).unwrap();
        assert_eq!(map.version, 3);
        assert_eq!(map.file, "main.min.css");
        assert_eq!(map.sources, vec!["main.css".to_string(), "style/main.scss".to_string()]);
        assert_eq!(map.sources_content[1].as_deref(), Some(".a { color: red; }\n"));
    }

    #[test]
    fn js_map_has_real_mappings() {
        let fs = MockFileSystem::new();
        let cache = MemoryCacheStore::new();
        let ctx = TransformContext {
            fs: &fs,
            root: Path::new("."),
            cache: &cache,
        };
        let src = "function greet(name) {\n  return 'hi ' + name;\n}\nwindow.greet = greet;\nwindow.main = function () {\n  greet('you');\n};\n";
        let file = FileBuf::new("main.js", src, "js/main.js");
        let out = MinifiedSibling::js().apply(vec![file], &ctx).unwrap();

        let map: SourceMap = serde_json::from_slice(&out[2].contents).unwrap();
        assert_eq!(map.sources[0], "main.js");
        assert_ne!(map.mappings, "AAAA");
        assert!(map.mappings.split([',', ';']).filter(|s| !s.is_empty()).count() > 1);
    }

    #[test]
    fn other_extensions_pass_through() {
        let fs = MockFileSystem::new();
        let cache = MemoryCacheStore::new();
        let ctx = TransformContext {
            fs: &fs,
            root: Path::new("."),
            cache: &cache,
        };
        let file = FileBuf::new("vendor.min.js", "x()", "js/vendor.min.js");
        let out = MinifiedSibling::js().apply(vec![file.clone()], &ctx).unwrap();
        assert_eq!(out, vec![file]);
    }
}
