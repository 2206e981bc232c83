// src/pipeline/js.rs

//! JavaScript minification with `oxc`.

use std::path::PathBuf;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::pipeline::sourcemap::{Mappings, Minified};

/// Minify a classic (non-module) browser script.
///
/// Top-level names stay intact so scripts that expose globals keep working.
/// The returned mappings point back into `source`.
pub fn minify_js(source: &str, filename: &str) -> Result<Minified, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(format!("{filename}: {err}"));
    }

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let output = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: Some(PathBuf::from(filename)),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);

    let map = output
        .map
        .ok_or_else(|| format!("{filename}: no source map produced"))?;
    Ok(Minified {
        code: output.code,
        map: Mappings::from_json(&map.to_json_string())?,
    })
}
