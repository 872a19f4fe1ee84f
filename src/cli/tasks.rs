//! Task implementations (default, less, watch, images)

use std::env;
use std::process::ExitCode;

use tracing::{debug, error, info};

use super::{Cli, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{AssetPipeline, BuildContext};
use crate::config::loader::{
    find_config, load_config, merge_cli_overrides, project_root, CliOverrides,
};
use crate::config::ConfigError;
use crate::images::ImagePipeline;
use crate::styles::Reconciler;

/// Load the configuration the flags point at and resolve the project root.
///
/// Without `--config` the file is searched for upwards from the working
/// directory; without any file the defaults apply and the working directory
/// is the project root.
pub(crate) fn load_context(cli: &Cli) -> Result<BuildContext, ConfigError> {
    let cwd = env::current_dir()?;
    let config_path = cli.config.clone().or_else(find_config);

    let (mut config, root) = match config_path {
        Some(path) => {
            debug!("Using config: {}", path.display());
            let config = load_config(Some(&path))?;
            let root = match project_root(&path) {
                Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
                _ => cwd,
            };
            (config, root)
        }
        None => {
            debug!("No assetflow.toml found, using defaults");
            (load_config(None)?, cwd)
        }
    };

    let overrides = CliOverrides { assets: cli.assets.clone(), ..Default::default() };
    merge_cli_overrides(&mut config, &overrides);
    Ok(BuildContext::new(config, root))
}

/// `default`: styles, aggregate clean-up and images.
pub(crate) fn run_default(ctx: &BuildContext) -> ExitCode {
    let report = AssetPipeline::from_context(ctx).run();
    if !report.is_success() {
        debug!("Some tasks did not complete; see the log above");
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// `less`: reconcile every region and rebuild once.
pub(crate) fn run_less(ctx: &BuildContext) -> ExitCode {
    match Reconciler::from_context(ctx).inject_all() {
        Ok(result) => info!("{}", result.summary()),
        Err(e) => error!("Stylesheet injection failed: {}", e),
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// `images`: the image pipeline only.
pub(crate) fn run_images(ctx: &BuildContext) -> ExitCode {
    match ImagePipeline::from_context(ctx).run() {
        Ok(result) => info!("{}", result.summary()),
        Err(e) => error!("Image pipeline stopped: {}", e),
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// `watch` and `watch-less`: run until interrupted.
pub(crate) fn run_watch(ctx: &BuildContext) -> ExitCode {
    info!("Press Ctrl+C to stop");
    match crate::watch::run_watch(ctx) {
        Ok(stats) => {
            debug!(
                "Processed {} batches ({} rebuilds, {} skipped)",
                stats.batches, stats.rebuilds, stats.skipped
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Watch error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
