//! The `default` task.
//!
//! Runs the stylesheet chain (reconcile, rebuild, clean the aggregate) and
//! then the image chain. A failing chain is logged and does not stop the
//! other one.

use crate::build::{BuildContext, BuildResult};
use crate::images::ImagePipeline;
use crate::styles::Reconciler;
use std::time::Instant;
use tracing::{error, info};

/// Outcome of each chain; `None` when the chain stopped with an error.
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub styles: Option<BuildResult>,
    pub images: Option<BuildResult>,
}

impl PipelineReport {
    /// Whether both chains ran and every target built.
    pub fn is_success(&self) -> bool {
        [&self.styles, &self.images]
            .iter()
            .all(|chain| chain.as_ref().is_some_and(BuildResult::is_success))
    }
}

/// Runs every task of a one-shot build.
pub struct AssetPipeline {
    reconciler: Reconciler,
    images: ImagePipeline,
}

impl AssetPipeline {
    pub fn new(reconciler: Reconciler, images: ImagePipeline) -> Self {
        Self { reconciler, images }
    }

    pub fn from_context(ctx: &BuildContext) -> Self {
        Self::new(Reconciler::from_context(ctx), ImagePipeline::from_context(ctx))
    }

    /// Reconcile and rebuild the stylesheets, then tidy the aggregate.
    pub fn run_styles(&self) -> Option<BuildResult> {
        let result = match self.reconciler.inject_all() {
            Ok(result) => result,
            Err(e) => {
                error!("Stylesheet injection failed: {}", e);
                return None;
            }
        };
        if let Err(e) = self.reconciler.clean_aggregate() {
            error!("Cleaning the aggregate failed: {}", e);
            return None;
        }
        Some(result)
    }

    /// Compress, resize, convert and write example markup.
    pub fn run_images(&self) -> Option<BuildResult> {
        match self.images.run() {
            Ok(result) => Some(result),
            Err(e) => {
                error!("Image pipeline stopped: {}", e);
                None
            }
        }
    }

    /// Run both chains.
    pub fn run(&self) -> PipelineReport {
        let start = Instant::now();
        let report = PipelineReport { styles: self.run_styles(), images: self.run_images() };
        info!("Finished in {:.2}s", start.elapsed().as_secs_f64());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_report_is_success_needs_both_chains() {
        let mut report = PipelineReport::default();
        assert!(!report.is_success());

        report.styles = Some(BuildResult::new());
        assert!(!report.is_success());

        report.images = Some(BuildResult::new());
        assert!(report.is_success());
    }

    #[test]
    fn test_run_keeps_styles_when_images_missing() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        fs::create_dir_all(ctx.styles_dir().join("pages")).unwrap();
        fs::write(ctx.styles_dir().join("pages/home.less"), "body { color: red; }\n").unwrap();
        fs::create_dir_all(ctx.images_dir()).unwrap();

        let report = AssetPipeline::from_context(&ctx).run();

        let styles = report.styles.expect("styles chain ran");
        assert!(styles.is_success());
        assert!(report.images.is_none());
        assert!(ctx.css_dir().join("pages/home.css").exists());
        let aggregate = fs::read_to_string(ctx.aggregate_path()).unwrap();
        assert!(aggregate.contains("@import \"pages/home.less\";"));
    }
}
