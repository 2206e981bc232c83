// src/pipeline/images.rs

//! Image optimization.
//!
//! JPEG is re-encoded at quality 85, PNG with the best compression and
//! adaptive filtering. SVG is parsed and re-serialized by `usvg` without
//! indentation, which drops comments, metadata and editor cruft; the output
//! always carries a `viewBox`. The smaller of original and optimized bytes wins. Results are cached by
//! the hash of the input bytes, so unchanged images are never re-encoded.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use crate::errors::TransformError;
use crate::pipeline::cache::content_key;
use crate::pipeline::{slash_path, FileBuf, Transform, TransformContext};

const STEP: &str = "images";
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Jpeg,
    Png,
    Svg,
}

fn kind_of(ext: &str) -> Option<Kind> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some(Kind::Jpeg),
        "png" => Some(Kind::Png),
        "svg" => Some(Kind::Svg),
        _ => None,
    }
}

fn encode_jpeg(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?;
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
        .map_err(|e| e.to_string())?;
    Ok(out)
}

fn encode_png(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    let mut out = Cursor::new(Vec::new());
    img.write_with_encoder(PngEncoder::new_with_quality(
        &mut out,
        CompressionType::Best,
        FilterType::Adaptive,
    ))
    .map_err(|e| e.to_string())?;
    Ok(out.into_inner())
}

/// Re-serialize an SVG through `usvg`.
pub fn minify_svg(source: &[u8]) -> Result<String, String> {
    let tree = usvg::Tree::from_data(source, &usvg::Options::default())
        .map_err(|e| format!("failed to parse SVG: {e}"))?;

    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    };
    Ok(ensure_view_box(tree.to_string(&write_options)))
}

/// usvg folds the viewBox into the root size; put an equivalent one back so
/// the image keeps scaling with its container.
fn ensure_view_box(svg: String) -> String {
    if svg.contains("viewBox=\"") {
        return svg;
    }
    let (Some(width), Some(height)) = (root_attr(&svg, "width"), root_attr(&svg, "height")) else {
        return svg;
    };
    match svg.find("<svg") {
        Some(pos) => {
            let at = pos + "<svg".len();
            format!("{} viewBox=\"0 0 {width} {height}\"{}", &svg[..at], &svg[at..])
        }
        None => svg,
    }
}

/// Value of `name="..."` on the root `<svg>` element.
fn root_attr<'a>(svg: &'a str, name: &str) -> Option<&'a str> {
    let start = svg.find("<svg")?;
    let end = start + svg[start..].find('>')?;
    let tag = &svg[start..end];
    let needle = format!(" {name}=\"");
    let value_start = tag.find(&needle)? + needle.len();
    let value_len = tag[value_start..].find('"')?;
    Some(&tag[value_start..value_start + value_len])
}

/// Optimize one image; formats without an optimizer pass through.
pub fn optimize(bytes: &[u8], ext: &str) -> Result<Vec<u8>, String> {
    let optimized = match kind_of(ext) {
        Some(Kind::Jpeg) => encode_jpeg(bytes)?,
        Some(Kind::Png) => encode_png(bytes)?,
        Some(Kind::Svg) => minify_svg(bytes)?.into_bytes(),
        None => return Ok(bytes.to_vec()),
    };

    if optimized.len() < bytes.len() {
        Ok(optimized)
    } else {
        Ok(bytes.to_vec())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizeImages;

impl Transform for OptimizeImages {
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
                let Some(ext) = file.extension().filter(|e| kind_of(e).is_some()) else {
                    return Ok(file);
                };
                let ext = ext.to_string();
                let name = slash_path(&file.path);
                let key = content_key(&file.contents);

                match ctx.cache.load(&key) {
                    Ok(Some(hit)) => {
                        debug!(file = %name, key = %key, "image cache hit");
                        file.contents = hit;
                        return Ok(file);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(file = %name, error = %e, "image cache read failed"),
                }

                let optimized = optimize(&file.contents, &ext)
                    .map_err(|e| TransformError::new(STEP, format!("{name}: {e}")))?;
                debug!(
                    file = %name,
                    before = file.contents.len(),
                    after = optimized.len(),
                    "optimized image"
                );

                if let Err(e) = ctx.cache.save(&key, &optimized) {
                    warn!(file = %name, error = %e, "image cache write failed");
                }
                file.contents = optimized;
                Ok(file)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use image::{Rgb, RgbImage};

    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::pipeline::{CacheStore, MemoryCacheStore};

    fn fast_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([200, 10, 10])));
        let mut out = Cursor::new(Vec::new());
        img.write_with_encoder(PngEncoder::new_with_quality(
            &mut out,
            CompressionType::Fast,
            FilterType::NoFilter,
        ))
        .unwrap();
        out.into_inner()
    }

    const ICON: &str = concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<!-- Exported from a drawing tool. Layer names, guides and editor state follow. -->\n",
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 10 10\">\n",
        "  <!-- icon body -->\n",
        "  <rect x=\"1\" y=\"1\" width=\"8\" height=\"8\" fill=\"#336699\"/>\n",
        "</svg>\n",
    );

    #[test]
    fn svg_keeps_a_view_box_and_drops_comments() {
        let out = minify_svg(ICON.as_bytes()).unwrap();
        assert!(out.contains("viewBox=\""), "{out}");
        assert!(!out.contains("<!--"), "{out}");
        assert!(!out.contains('\n'), "{out}");
    }

    #[test]
    fn view_box_is_rebuilt_from_the_root_size() {
        let svg = "<svg width=\"24\" height=\"12\" xmlns=\"http://www.w3.org/2000/svg\"><path d=\"M 0 0 L 1 1\"/></svg>".to_string();
        let out = ensure_view_box(svg);
        assert!(out.starts_with("<svg viewBox=\"0 0 24 12\" width=\"24\""), "{out}");
    }

    #[test]
    fn unparsable_svg_fails_the_step() {
        assert!(optimize(b"<svg", "svg").is_err());
    }

    #[test]
    fn png_never_grows_and_stays_decodable() {
        let input = fast_png();
        let out = optimize(&input, "png").unwrap();
        assert!(out.len() <= input.len());
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
    }

    #[test]
    fn cache_hit_skips_optimization() {
        let fs = MockFileSystem::new();
        let cache = MemoryCacheStore::new();
        let input = fast_png();
        cache.save(&content_key(&input), b"from-cache").unwrap();

        let ctx = TransformContext {
            fs: &fs,
            root: Path::new("."),
            cache: &cache,
        };
        let out = OptimizeImages
            .apply(vec![FileBuf::new("a.png", input, "img/a.png")], &ctx)
            .unwrap();
        assert_eq!(out[0].contents, b"from-cache".to_vec());
    }

    #[test]
    fn corrupt_image_fails_the_step() {
        let fs = MockFileSystem::new();
        let cache = MemoryCacheStore::new();
        let ctx = TransformContext {
            fs: &fs,
            root: Path::new("."),
            cache: &cache,
        };
        let err = OptimizeImages
            .apply(vec![FileBuf::new("bad.jpg", b"not a jpeg".to_vec(), "img/bad.jpg")], &ctx)
            .unwrap_err();
        assert_eq!(err.step, "images");
        assert!(cache.is_empty());
    }
}
