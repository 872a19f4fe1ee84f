//! Build context containing configuration and resolved paths for a run.

use crate::config::AssetflowConfig;
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a build operation.
///
/// Every directory the tool reads or writes is derived here from the
/// configuration and the project root.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: AssetflowConfig,
    /// Project root directory (where assetflow.toml is located)
    project_root: PathBuf,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: AssetflowConfig, project_root: PathBuf) -> Self {
        Self { config, project_root }
    }

    /// Get the configuration.
    pub fn config(&self) -> &AssetflowConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Assets directory.
    pub fn assets_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.assets)
    }

    /// Web root that example markup URLs are relative to.
    pub fn public_root(&self) -> PathBuf {
        self.resolve_path(&self.config.project.public_root)
    }

    /// Styles root holding the aggregate and the category folders.
    pub fn styles_dir(&self) -> PathBuf {
        self.assets_dir().join(&self.config.styles.src)
    }

    /// Compiled stylesheet output directory.
    pub fn css_dir(&self) -> PathBuf {
        self.assets_dir().join(&self.config.styles.out)
    }

    /// Path of the aggregate stylesheet.
    pub fn aggregate_path(&self) -> PathBuf {
        self.styles_dir().join(&self.config.styles.main)
    }

    /// Source images folder.
    pub fn images_dir(&self) -> PathBuf {
        self.assets_dir().join(&self.config.images.src)
    }

    /// Compressed images folder.
    pub fn compressed_dir(&self) -> PathBuf {
        self.images_dir().join(&self.config.images.compressed)
    }

    /// Example markup folder.
    pub fn examples_dir(&self) -> PathBuf {
        self.images_dir().join(&self.config.images.examples)
    }
}
