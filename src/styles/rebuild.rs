//! Full recompilation of every stylesheet under the styles root.

use super::artifacts::{file_name, ArtifactSet};
use super::compile::StyleCompiler;
use super::directive::import_path;
use super::postprocess::{process, PostprocessOptions};
use super::{StyleError, StyleLayout};
use crate::build::{BuildResult, TargetResult};
use glob::{glob, Pattern};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Every stylesheet under the root, at any depth, sorted.
pub fn discover_sources(layout: &StyleLayout) -> Result<Vec<PathBuf>, StyleError> {
    if !layout.root.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!(
        "{}/**/*.{}",
        Pattern::escape(&layout.root.to_string_lossy()),
        layout.extension
    );
    let mut sources: Vec<PathBuf> =
        glob(&pattern)?.filter_map(Result::ok).filter(|path| path.is_file()).collect();
    sources.sort();
    Ok(sources)
}

/// Compile one stylesheet and write its four artifacts.
pub fn build_one(
    layout: &StyleLayout,
    compiler: &dyn StyleCompiler,
    options: &PostprocessOptions,
    source: &Path,
) -> Result<Vec<PathBuf>, StyleError> {
    let artifacts = ArtifactSet::for_source(layout, source)?;
    let source_name = layout.relative(source).map(|rel| import_path(&rel)).unwrap_or_default();

    let code = compiler.compile(source)?;
    let css_name = file_name(&artifacts.css);
    let min_name = file_name(&artifacts.min_css);
    let processed = process(&source_name, &code, &css_name, &min_name, options)
        .map_err(|message| StyleError::Css { path: source.to_path_buf(), message })?;
    for warning in &processed.warnings {
        warn!("{}: dropped invalid CSS: {}", source.display(), warning);
    }

    if let Some(dir) = artifacts.dir() {
        fs::create_dir_all(dir).map_err(StyleError::io(dir))?;
    }
    let writes = [
        (&artifacts.css, &processed.css),
        (&artifacts.css_map, &processed.css_map),
        (&artifacts.min_css, &processed.min_css),
        (&artifacts.min_css_map, &processed.min_css_map),
    ];
    for (path, content) in writes {
        fs::write(path, content).map_err(StyleError::io(path))?;
    }

    Ok(artifacts.paths().iter().map(|p| p.to_path_buf()).collect())
}

/// Compile every stylesheet in parallel. One failure does not stop the rest.
pub fn rebuild_all(
    layout: &StyleLayout,
    compiler: &dyn StyleCompiler,
    options: &PostprocessOptions,
) -> BuildResult {
    let start = Instant::now();
    let mut result = BuildResult::new();

    let sources = match discover_sources(layout) {
        Ok(sources) => sources,
        Err(e) => {
            error!("Stylesheet discovery failed: {}", e);
            result.add_result(TargetResult::failed(
                "styles".to_string(),
                e.to_string(),
                start.elapsed(),
            ));
            return result.with_duration(start.elapsed());
        }
    };
    debug!(count = sources.len(), compiler = compiler.name(), "rebuilding stylesheets");

    let targets: Vec<TargetResult> = sources
        .par_iter()
        .map(|source| {
            let target_id = format!(
                "style:{}",
                layout.relative(source).map(|rel| import_path(&rel)).unwrap_or_default()
            );
            let began = Instant::now();
            match build_one(layout, compiler, options, source) {
                Ok(outputs) => TargetResult::success(target_id, outputs, began.elapsed()),
                Err(e) => {
                    error!("{}", e);
                    TargetResult::failed(target_id, e.to_string(), began.elapsed())
                }
            }
        })
        .collect();

    for target in targets {
        result.add_result(target);
    }
    let result = result.with_duration(start.elapsed());
    info!("Stylesheets: {}", result.summary());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::compile::ImportInliner;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_sources_recursive_sorted() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("less");
        write(&root, "pages/home.less", "");
        write(&root, "main.less", "");
        write(&root, "partials/x/bar.less", "");
        write(&root, "partials/readme.md", "");

        let layout = StyleLayout::new(&root, temp.path().join("css"));
        let sources = discover_sources(&layout).unwrap();
        assert_eq!(
            sources,
            vec![
                root.join("main.less"),
                root.join("pages/home.less"),
                root.join("partials/x/bar.less"),
            ]
        );
    }

    #[test]
    fn test_discover_sources_missing_root() {
        let temp = TempDir::new().unwrap();
        let layout = StyleLayout::new(temp.path().join("nope"), temp.path().join("css"));
        assert!(discover_sources(&layout).unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_all_writes_mirrored_artifacts() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("less");
        write(&root, "partials/x/bar.less", ".bar { color: red; }\n");
        write(&root, "main.less", "body { margin: 0; }\n");

        let layout = StyleLayout::new(&root, temp.path().join("css"));
        let compiler = ImportInliner::new("less");
        let result = rebuild_all(&layout, &compiler, &PostprocessOptions::default());

        assert!(result.is_success());
        assert_eq!(result.success_count(), 2);
        for rel in ["partials/x/bar", "main"] {
            for suffix in [".css", ".css.map", ".min.css", ".min.css.map"] {
                let path = temp.path().join("css").join(format!("{}{}", rel, suffix));
                assert!(path.exists(), "missing {}", path.display());
            }
        }
    }

    #[test]
    fn test_rebuild_all_isolates_failures() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("less");
        write(&root, "a.less", "@import \"b\";\n");
        write(&root, "b.less", "@import \"a\";\n");
        write(&root, "ok.less", ".ok { color: blue; }\n");

        let layout = StyleLayout::new(&root, temp.path().join("css"));
        let compiler = ImportInliner::new("less");
        let result = rebuild_all(&layout, &compiler, &PostprocessOptions::default());

        assert_eq!(result.failed_count(), 2);
        assert_eq!(result.success_count(), 1);
        assert!(temp.path().join("css/ok.min.css").exists());
    }

    #[test]
    fn test_rebuild_all_lowers_less_and_fails_mixins() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("less");
        write(
            &root,
            "partials/button.less",
            "@brand: #ff0000;\n.button { color: @brand; .icon { width: 1px; } }\n",
        );
        write(&root, "partials/mixed.less", ".mix() { color: red; }\n.x { .mix(); }\n");

        let layout = StyleLayout::new(&root, temp.path().join("css"));
        let compiler = ImportInliner::new("less");
        let result = rebuild_all(&layout, &compiler, &PostprocessOptions::default());

        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failed_count(), 1);
        let css = fs::read_to_string(temp.path().join("css/partials/button.css")).unwrap();
        assert!(css.contains(".button .icon"));
        assert!(!css.contains('@'));
        assert!(!temp.path().join("css/partials/mixed.css").exists());
    }
}
