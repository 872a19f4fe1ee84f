//! Keeps the aggregate's import regions equal to the fragments on disk.

use super::aggregate::{self, line_ending, remove_directive, remove_empty_lines, rewrite_region};
use super::artifacts::{ArtifactSet, DeleteOutcome};
use super::category::{self, Category};
use super::compile::{compiler_for, StyleCompiler};
use super::postprocess::PostprocessOptions;
use super::rebuild::rebuild_all;
use super::{StyleError, StyleLayout};
use crate::build::{BuildContext, BuildResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// What `remove_one` did.
#[derive(Debug, Default)]
pub struct RemovalReport {
    /// Directive lines dropped from the aggregate
    pub lines_removed: usize,
    /// Outcome per artifact path
    pub artifacts: Vec<(PathBuf, DeleteOutcome)>,
    /// Errors that were logged and skipped
    pub errors: Vec<String>,
}

impl RemovalReport {
    /// Number of artifacts actually deleted.
    pub fn deleted_count(&self) -> usize {
        self.artifacts.iter().filter(|(_, o)| *o == DeleteOutcome::Deleted).count()
    }

    /// No step failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
            && !self.artifacts.iter().any(|(_, o)| matches!(o, DeleteOutcome::Failed(_)))
    }
}

/// Import set reconciler for one styles root.
pub struct Reconciler {
    layout: StyleLayout,
    compiler: Box<dyn StyleCompiler>,
    options: PostprocessOptions,
}

impl Reconciler {
    pub fn new(
        layout: StyleLayout,
        compiler: Box<dyn StyleCompiler>,
        options: PostprocessOptions,
    ) -> Self {
        Self { layout, compiler, options }
    }

    /// Reconciler with the layout, compiler and browser targets of a context.
    pub fn from_context(ctx: &BuildContext) -> Self {
        let styles = &ctx.config().styles;
        Self::new(
            StyleLayout::from_context(ctx),
            compiler_for(styles),
            PostprocessOptions::from_config(&styles.browsers),
        )
    }

    pub fn layout(&self) -> &StyleLayout {
        &self.layout
    }

    /// Category of a fragment. Files directly in the styles root are
    /// globals whatever the root folder is called.
    pub fn classify(&self, path: &Path) -> Category {
        match self.layout.relative(path) {
            Some(rel) if rel.parent().map_or(true, |p| p.as_os_str().is_empty()) => {
                Category::Globals
            }
            Some(rel) => Category::classify(&rel),
            None => Category::classify(path),
        }
    }

    /// Current members of a category, sorted.
    pub fn members(&self, category: Category) -> Result<Vec<PathBuf>, StyleError> {
        category::members(&self.layout, category)
    }

    fn directives(&self, category: Category) -> Result<Vec<String>, StyleError> {
        let binding = category.binding();
        Ok(self
            .members(category)?
            .iter()
            .filter_map(|member| self.layout.relative(member))
            .map(|rel| (binding.transform)(&rel))
            .collect())
    }

    fn read_aggregate(&self) -> Result<Option<String>, StyleError> {
        match fs::read_to_string(&self.layout.aggregate) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StyleError::Io { path: self.layout.aggregate.clone(), source: e }),
        }
    }

    fn write_aggregate(&self, content: &str) -> Result<(), StyleError> {
        aggregate::write_atomic(&self.layout.aggregate, content)
            .map_err(StyleError::io(&self.layout.aggregate))
    }

    /// Rewrite the regions of the given categories in one read and one write.
    ///
    /// A missing aggregate is created with four empty regions first. A
    /// region whose markers are missing is skipped; the others are still
    /// written and the first such error is returned.
    pub fn reconcile_regions(&self, categories: &[Category]) -> Result<(), StyleError> {
        let original = self.read_aggregate()?;
        let mut content = match &original {
            Some(content) => content.clone(),
            None => {
                info!("Creating {}", self.layout.aggregate.display());
                aggregate::scaffold("\n")
            }
        };

        let mut first_error = None;
        for category in categories {
            let directives = self.directives(*category)?;
            match rewrite_region(&content, &category.binding(), &directives) {
                Ok(updated) => {
                    debug!(category = %category, entries = directives.len(), "region rewritten");
                    content = updated;
                }
                Err(missing) => {
                    let err = StyleError::MissingMarker {
                        path: self.layout.aggregate.clone(),
                        marker: missing.marker,
                    };
                    error!("{}", err);
                    first_error.get_or_insert(err);
                }
            }
        }

        if original.as_deref() != Some(content.as_str()) {
            self.write_aggregate(&content)?;
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Rewrite one category's region.
    pub fn reconcile_region(&self, category: Category) -> Result<(), StyleError> {
        self.reconcile_regions(&[category])
    }

    /// Rewrite all four regions.
    pub fn reconcile_all(&self) -> Result<(), StyleError> {
        self.reconcile_regions(&Category::ALL)
    }

    /// Add a new fragment: rewrite its category's region, then rebuild.
    pub fn inject_one(&self, path: &Path) -> Result<BuildResult, StyleError> {
        let category = self.classify(path);
        self.reconcile_region(category)?;
        info!("Injected {} into {}", path.display(), category);
        Ok(self.rebuild())
    }

    /// Rewrite every region, then rebuild.
    pub fn inject_all(&self) -> Result<BuildResult, StyleError> {
        self.reconcile_all()?;
        info!("Reconciled {}", self.layout.aggregate.display());
        Ok(self.rebuild())
    }

    /// Forget a deleted fragment: drop its directive, delete its artifacts,
    /// then clear empty lines from the aggregate.
    ///
    /// The line removal and the artifact deletion do not depend on each other.
    pub fn remove_one(&self, path: &Path) -> RemovalReport {
        let mut report = RemovalReport::default();

        match self.layout.relative(path) {
            Some(rel) => {
                let directive = (self.classify(path).binding().transform)(&rel);
                match self.drop_directive(&directive) {
                    Ok(removed) => report.lines_removed = removed,
                    Err(e) => {
                        error!("{}", e);
                        report.errors.push(e.to_string());
                    }
                }
            }
            None => {
                let err = StyleError::OutsideRoot { path: path.to_path_buf() };
                warn!("{}", err);
                report.errors.push(err.to_string());
            }
        }

        match ArtifactSet::for_source(&self.layout, path) {
            Ok(artifacts) => {
                for (artifact, outcome) in artifacts.delete() {
                    match &outcome {
                        DeleteOutcome::Deleted => info!("Deleted {}", artifact.display()),
                        DeleteOutcome::Absent => debug!("Not present {}", artifact.display()),
                        DeleteOutcome::Failed(e) => {
                            error!("Failed to delete {}: {}", artifact.display(), e)
                        }
                    }
                    report.artifacts.push((artifact, outcome));
                }
            }
            Err(e) => report.errors.push(e.to_string()),
        }

        if let Err(e) = self.clean_aggregate() {
            error!("{}", e);
            report.errors.push(e.to_string());
        }
        report
    }

    fn drop_directive(&self, directive: &str) -> Result<usize, StyleError> {
        let Some(content) = self.read_aggregate()? else {
            return Ok(0);
        };
        let (updated, removed) = remove_directive(&content, directive);
        if removed > 0 {
            self.write_aggregate(&updated)?;
        }
        Ok(removed)
    }

    /// Remove every whitespace-only line from the aggregate.
    pub fn clean_aggregate(&self) -> Result<(), StyleError> {
        let Some(content) = self.read_aggregate()? else {
            return Ok(());
        };
        let cleaned = remove_empty_lines(&content);
        if cleaned != content {
            debug!(newline = ?line_ending(&content), "removing empty lines from aggregate");
            self.write_aggregate(&cleaned)?;
        }
        Ok(())
    }

    /// Recompile every stylesheet.
    pub fn rebuild(&self) -> BuildResult {
        rebuild_all(&self.layout, self.compiler.as_ref(), &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::compile::ImportInliner;
    use tempfile::TempDir;

    fn reconciler(temp: &TempDir) -> Reconciler {
        let layout = StyleLayout::new(temp.path().join("less"), temp.path().join("css"));
        Reconciler::new(layout, Box::new(ImportInliner::new("less")), PostprocessOptions::default())
    }

    fn write(temp: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = temp.path().join("less").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn aggregate(temp: &TempDir) -> String {
        fs::read_to_string(temp.path().join("less/main.less")).unwrap()
    }

    #[test]
    fn test_classify_root_level_is_global() {
        let temp = TempDir::new().unwrap();
        let layout = StyleLayout::new(temp.path().join("pages"), temp.path().join("css"));
        let reconciler = Reconciler::new(
            layout,
            Box::new(ImportInliner::new("less")),
            PostprocessOptions::default(),
        );

        assert_eq!(reconciler.classify(&temp.path().join("pages/home.less")), Category::Globals);
        assert_eq!(
            reconciler.classify(&temp.path().join("pages/pages/home.less")),
            Category::Pages
        );
    }

    #[test]
    fn test_reconcile_all_creates_missing_aggregate() {
        let temp = TempDir::new().unwrap();
        write(&temp, "partials/button.less", ".btn { color: red; }\n");
        let reconciler = reconciler(&temp);

        reconciler.reconcile_all().unwrap();
        assert_eq!(
            aggregate(&temp),
            "/* Globals */\n/* EndGlobals */\n/* Partials */\n@import \"partials/button.less\";\n\
             /* EndPartials */\n/* Pages */\n/* EndPages */\n/* Includes */\n/* EndIncludes */\n"
        );
    }

    #[test]
    fn test_reconcile_region_leaves_other_regions() {
        let temp = TempDir::new().unwrap();
        write(
            &temp,
            "main.less",
            "/* Globals */\n@import \"stale.less\";\n/* EndGlobals */\n\
             /* Pages */\n/* EndPages */\n",
        );
        write(&temp, "pages/home.less", "");
        let reconciler = reconciler(&temp);

        let err = reconciler.reconcile_region(Category::Partials).unwrap_err();
        assert!(matches!(err, StyleError::MissingMarker { marker: "/* Partials */", .. }));

        reconciler.reconcile_region(Category::Pages).unwrap();
        assert_eq!(
            aggregate(&temp),
            "/* Globals */\n@import \"stale.less\";\n/* EndGlobals */\n\
             /* Pages */\n@import \"pages/home.less\";\n/* EndPages */\n"
        );
    }

    #[test]
    fn test_reconcile_all_applies_regions_with_markers() {
        let temp = TempDir::new().unwrap();
        write(&temp, "main.less", "/* Includes */\n/* EndIncludes */\n");
        write(&temp, "includes/footer.less", "");
        let reconciler = reconciler(&temp);

        assert!(reconciler.reconcile_all().is_err());
        assert_eq!(
            aggregate(&temp),
            "/* Includes */\n@import \"includes/footer.less\";\n/* EndIncludes */\n"
        );
    }

    #[test]
    fn test_remove_one_drops_line_and_artifacts() {
        let temp = TempDir::new().unwrap();
        let button = write(&temp, "partials/button.less", ".btn { color: red; }\n");
        write(&temp, "partials/card.less", ".card { color: blue; }\n");
        let reconciler = reconciler(&temp);
        reconciler.inject_all().unwrap();
        assert!(temp.path().join("css/partials/button.min.css").exists());

        fs::remove_file(&button).unwrap();
        let report = reconciler.remove_one(&button);

        assert_eq!(report.lines_removed, 1);
        assert_eq!(report.deleted_count(), 4);
        assert!(report.is_clean());
        assert!(!aggregate(&temp).contains("button"));
        assert!(aggregate(&temp).contains("@import \"partials/card.less\";"));
        assert!(!temp.path().join("css/partials/button.css").exists());
    }

    #[test]
    fn test_remove_one_without_aggregate_still_deletes_artifacts() {
        let temp = TempDir::new().unwrap();
        let css = temp.path().join("css/pages");
        fs::create_dir_all(&css).unwrap();
        fs::write(css.join("home.css"), "").unwrap();
        let reconciler = reconciler(&temp);

        let report = reconciler.remove_one(&temp.path().join("less/pages/home.less"));
        assert_eq!(report.lines_removed, 0);
        assert_eq!(report.deleted_count(), 1);
        assert!(report.is_clean());
    }

    #[test]
    fn test_clean_aggregate_removes_blank_lines() {
        let temp = TempDir::new().unwrap();
        write(&temp, "main.less", "/* Globals */\n\n   \n/* EndGlobals */\n\n");
        let reconciler = reconciler(&temp);

        reconciler.clean_aggregate().unwrap();
        assert_eq!(aggregate(&temp), "/* Globals */\n/* EndGlobals */\n");
    }

    #[test]
    fn test_clean_aggregate_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(reconciler(&temp).clean_aggregate().is_ok());
    }

    #[test]
    fn test_inject_one_rebuilds() {
        let temp = TempDir::new().unwrap();
        let home = write(&temp, "pages/home.less", ".home { color: red; }\n");
        let reconciler = reconciler(&temp);

        let result = reconciler.inject_one(&home).unwrap();
        assert!(result.is_success());
        assert!(aggregate(&temp).contains("@import \"pages/home.less\";"));
        assert!(temp.path().join("css/pages/home.css").exists());
        assert!(temp.path().join("css/main.min.css").exists());
    }
}
