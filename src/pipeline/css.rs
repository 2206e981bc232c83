// src/pipeline/css.rs

//! CSS post-processing with `lightningcss`: vendor prefixing and
//! minification for a fixed set of still-supported browsers.

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::errors::TransformError;
use crate::pipeline::sourcemap::{Mappings, Minified};
use crate::pipeline::{slash_path, FileBuf, Transform, TransformContext};

const STEP: &str = "autoprefix";

/// Browsers that still need vendor prefixes. Versions are encoded as
/// `major << 16`.
pub fn browser_targets() -> Targets {
    Targets::from(Browsers {
        ie: Some(11 << 16),
        edge: Some(88 << 16),
        safari: Some(12 << 16),
        ios_saf: Some(12 << 16),
        chrome: Some(80 << 16),
        firefox: Some(78 << 16),
        ..Browsers::default()
    })
}

fn parse<'i>(source: &'i str, filename: &str, source_index: u32) -> Result<StyleSheet<'i>, String> {
    let mut sheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: filename.to_string(),
            source_index,
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    sheet
        .minify(MinifyOptions {
            targets: browser_targets(),
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    Ok(sheet)
}

/// Add vendor prefixes, keeping the output readable.
pub fn autoprefix_css(source: &str, filename: &str) -> Result<String, String> {
    let sheet = parse(source, filename, 0)?;
    let result = sheet
        .to_css(PrinterOptions {
            targets: browser_targets(),
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

/// Prefix and minify, mapping the result back onto `source`.
pub fn minify_css(source: &str, filename: &str) -> Result<Minified, String> {
    let mut map = parcel_sourcemap::SourceMap::new("/");
    let index = map.add_source(filename);
    map.set_source_content(index as usize, source)
        .map_err(|e| e.to_string())?;

    let sheet = parse(source, filename, index)?;
    let result = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets: browser_targets(),
            source_map: Some(&mut map),
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let json = map.to_json(None).map_err(|e| e.to_string())?;
    Ok(Minified {
        code: result.code,
        map: Mappings::from_json(&json)?,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Autoprefix;

impl Transform for Autoprefix {
    fn name(&self) -> &'static str {
        STEP
    }

    fn apply(
        &self,
        files: Vec<FileBuf>,
        _ctx: &TransformContext<'_>,
    ) -> Result<Vec<FileBuf>, TransformError> {
        files
            .into_iter()
            .map(|mut file| {
                if file.extension() != Some("css") {
                    return Ok(file);
                }
                let name = slash_path(&file.path);
                let prefixed = autoprefix_css(file.text(STEP)?, &name)
                    .map_err(|e| TransformError::new(STEP, format!("{name}: {e}")))?;
                file.contents = prefixed.into_bytes();
                Ok(file)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_webkit_prefix_for_old_safari() {
        let out = autoprefix_css(".a { user-select: none; }", "a.css").unwrap();
        assert!(out.contains("-webkit-user-select"), "{out}");
        assert!(out.contains('\n'), "output should stay expanded: {out}");
    }

    #[test]
    fn minified_output_is_a_single_line() {
        let out = minify_css(".a {\n  color: red;\n}\n\n.b {\n  margin: 0;\n}\n", "a.css").unwrap();
        assert_eq!(out.code.lines().count(), 1, "{}", out.code);
        assert!(out.code.contains(".a{color:red}"), "{}", out.code);
    }

    #[test]
    fn minified_output_maps_each_rule() {
        let out = minify_css(".a {\n  color: red;\n}\n\n.b {\n  margin: 0;\n}\n", "a.css").unwrap();
        assert!(out.map.segments() > 1, "{:?}", out.map);
    }
}
