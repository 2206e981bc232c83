// tests/pipeline_scenarios.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::{init_tracing, sample_project, with_timeout};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use assetflow::config::ConfigFile;
use assetflow::engine::TargetOutcome;
use assetflow::errors::PipelineError;
use assetflow::exec::ExecutionEngine;
use assetflow::fs::mock::MockFileSystem;
use assetflow::fs::FileSystem;
use assetflow::pipeline::sourcemap::SourceMap;
use serde_json::Value;

type TestResult = Result<(), Box<dyn Error>>;

fn engine(cfg: ConfigFile, fs: &MockFileSystem) -> Arc<ExecutionEngine> {
    let fs: Arc<dyn FileSystem> = Arc::new(fs.clone());
    Arc::new(ExecutionEngine::from_config(cfg, fs).expect("valid engine"))
}

fn memory_cache_config() -> ConfigFile {
    ConfigFileBuilder::new().with_memory_cache().build()
}

#[test]
fn html_include_splices_file_and_drops_directive() -> TestResult {
    init_tracing();
    let fs = sample_project();
    let engine = engine(memory_cache_config(), &fs);

    let report = engine.run_named("html")?;
    assert_eq!(report.files_read, 1);

    let html = fs
        .contents("./assets/build/index.html")
        .ok_or("index.html not written")?;
    assert!(!html.contains("//="));
    assert!(html.contains("  <header>\n    <h1>Site</h1>\n  </header>\n"));
    assert!(html.contains("<main>home</main>"));

    // Partials are only reachable through includes.
    assert!(fs.contents("./assets/build/template/header.html").is_none());
    Ok(())
}

fn has_primary(css: &str) -> bool {
    let lower = css.to_ascii_lowercase();
    lower.contains("#336699") || lower.contains("#369")
}

#[test]
fn scss_entry_produces_css_min_and_map() -> TestResult {
    init_tracing();
    let fs = sample_project();
    let engine = engine(memory_cache_config(), &fs);

    engine.run_named("css")?;

    let css = fs.contents("./assets/build/css/main.css").ok_or("main.css missing")?;
    let min = fs
        .contents("./assets/build/css/main.min.css")
        .ok_or("main.min.css missing")?;
    let map = fs
        .contents("./assets/build/css/main.min.css.map")
        .ok_or("main.min.css.map missing")?;

    assert!(has_primary(&css));
    assert!(css.contains("-webkit-user-select"));
    assert!(!css.contains("$primary"));

    assert!(has_primary(&min));
    assert!(!min.contains("$primary"));
    assert!(min.lines().count() < css.lines().count());
    assert!(min.trim_end().ends_with("/*# sourceMappingURL=main.min.css.map */"));

    let parsed: SourceMap = serde_json::from_str(&map)?;
    assert_eq!(parsed.file, "main.min.css");
    assert_eq!(parsed.sources[0], "main.css");
    assert!(parsed.sources.contains(&"assets/src/style/main.scss".to_string()));
    assert!(parsed
        .sources
        .contains(&"assets/src/style/partials/_vars.scss".to_string()));

    let segments = parsed
        .mappings
        .split([',', ';'])
        .filter(|s| !s.is_empty())
        .count();
    assert!(segments > 1, "mappings: {}", parsed.mappings);

    let raw: Value = serde_json::from_str(&map)?;
    assert_eq!(raw["version"], 3);
    assert!(raw.get("sourcesContent").is_some());

    // `_vars.scss` is a partial: never emitted on its own.
    assert!(fs.contents("./assets/build/css/partials/_vars.css").is_none());
    Ok(())
}

#[test]
fn js_include_and_minified_sibling() -> TestResult {
    init_tracing();
    let fs = sample_project();
    let engine = engine(memory_cache_config(), &fs);

    engine.run_named("js")?;

    let js = fs.contents("./assets/build/js/main.js").ok_or("main.js missing")?;
    assert!(js.contains("function greet(name)"));
    assert!(!js.contains("//="));

    let min = fs.contents("./assets/build/js/main.min.js").ok_or("main.min.js missing")?;
    assert!(min.len() < js.len());
    assert!(min.trim_end().ends_with("//# sourceMappingURL=main.min.js.map"));
    let map = fs
        .contents("./assets/build/js/main.min.js.map")
        .ok_or("main.min.js.map missing")?;
    let parsed: SourceMap = serde_json::from_str(&map)?;
    assert_eq!(parsed.sources[0], "main.js");
    assert!(parsed.sources.contains(&"assets/src/js/lib/util.js".to_string()));
    assert!(parsed.mappings.split([',', ';']).filter(|s| !s.is_empty()).count() > 1);
    Ok(())
}

#[test]
fn fonts_and_icons_are_copied_verbatim() -> TestResult {
    let fs = sample_project();
    let engine = engine(memory_cache_config(), &fs);

    engine.run_named("fonts")?;
    engine.run_named("icons")?;

    assert_eq!(
        fs.read(Path::new("./assets/build/fonts/sans.woff2"))?,
        vec![0u8, 1, 2, 3]
    );
    assert_eq!(
        fs.read(Path::new("./assets/build/webfonts/icons.ttf"))?,
        vec![9u8, 8, 7]
    );
    Ok(())
}

#[test]
fn images_are_cached_and_clear_cache_empties_it() -> TestResult {
    init_tracing();
    let fs = sample_project();
    let engine = engine(ConfigFile::default(), &fs);

    engine.run_named("images")?;
    let svg = fs
        .contents("./assets/build/img/icons/dot.svg")
        .ok_or("svg missing")?;
    assert!(svg.contains("viewBox=\""), "{svg}");
    assert!(!svg.contains("<!--"), "{svg}");
    assert!(!svg.contains("<?xml"), "{svg}");

    let cached: Vec<_> = fs
        .file_paths()
        .into_iter()
        .filter(|p| p.starts_with("./.assetflow/cache"))
        .collect();
    assert_eq!(cached.len(), 1);

    // A cache hit is served as-is, without re-optimizing.
    fs.add_file(&cached[0], "<svg>cached</svg>");
    engine.run_named("images")?;
    assert_eq!(
        fs.contents("./assets/build/img/icons/dot.svg").as_deref(),
        Some("<svg>cached</svg>")
    );

    assert_eq!(engine.cache().clear()?, 1);
    assert!(fs
        .file_paths()
        .iter()
        .all(|p| !p.starts_with("./.assetflow/cache")));
    Ok(())
}

#[test]
fn clean_empties_the_build_root() -> TestResult {
    let fs = sample_project();
    fs.add_file("./assets/build/stale.txt", "old");
    fs.add_file("./assets/build/css/old.css", "a{}");
    let engine = engine(memory_cache_config(), &fs);

    let report = engine.run_named("clean")?;
    assert_eq!(report.files_written.len(), 2);
    assert!(fs
        .file_paths()
        .iter()
        .all(|p| !p.starts_with("./assets/build")));
    assert!(fs.is_dir(Path::new("./assets/build")));
    assert!(fs.is_file(Path::new("./assets/src/index.html")));
    Ok(())
}

#[tokio::test]
async fn full_plan_builds_every_category() -> TestResult {
    init_tracing();
    let fs = sample_project();
    fs.add_file("./assets/build/stale.txt", "old");
    let engine = engine(memory_cache_config(), &fs);

    let report = with_timeout(engine.run_plan()).await?;

    assert!(report.is_success(), "{report}");
    assert_eq!(report.len(), 7);
    assert!(fs.contents("./assets/build/stale.txt").is_none());
    for out in [
        "./assets/build/index.html",
        "./assets/build/css/main.css",
        "./assets/build/css/main.min.css",
        "./assets/build/js/main.min.js",
        "./assets/build/img/icons/dot.svg",
        "./assets/build/fonts/sans.woff2",
        "./assets/build/webfonts/icons.ttf",
    ] {
        assert!(fs.exists(Path::new(out)), "{out} missing");
    }
    Ok(())
}

#[tokio::test]
async fn failing_target_does_not_stop_siblings() -> TestResult {
    init_tracing();
    let fs = sample_project();
    fs.add_file("./assets/src/style/main.scss", "body { color: $missing; }\n");
    let cfg = ConfigFileBuilder::new()
        .with_memory_cache()
        .with_after("html", "css")
        .build();
    let engine = engine(cfg, &fs);

    let report = with_timeout(engine.run_plan()).await?;

    assert!(!report.is_success());
    match report.outcome("css") {
        Some(TargetOutcome::Failed(cause)) => assert!(cause.starts_with("scss:"), "{cause}"),
        other => panic!("unexpected css outcome: {other:?}"),
    }
    assert_eq!(
        report.outcome("html"),
        Some(&TargetOutcome::Failed("dependency 'css' failed".to_string()))
    );
    for sibling in ["js", "images", "fonts", "icons"] {
        assert_eq!(report.outcome(sibling), Some(&TargetOutcome::Success), "{sibling}");
    }

    let failures = report.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures
        .iter()
        .all(|f| matches!(f, PipelineError::TargetFailed { .. })));

    assert!(fs.contents("./assets/build/css/main.css").is_none());
    assert!(fs.contents("./assets/build/js/main.js").is_some());
    Ok(())
}
