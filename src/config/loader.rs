//! Configuration loading and discovery for `assetflow.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::{AssetflowConfig, ProjectConfig};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up from the working directory
pub const CONFIG_FILE_NAME: &str = "assetflow.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse assetflow.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", bullet_list(.0))]
    Validation(Vec<String>),
}

fn bullet_list(items: &[String]) -> String {
    items.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n")
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the assets directory
    pub assets: Option<PathBuf>,
    /// Override the watch debounce delay
    pub debounce_ms: Option<u32>,
}

/// Find assetflow.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find assetflow.toml by walking up from a specific directory.
///
/// This is the internal implementation that allows specifying the start directory,
/// useful for testing.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from an assetflow.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns a default
/// configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("site/assetflow.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<AssetflowConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<AssetflowConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: AssetflowConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Create a default configuration when no assetflow.toml is found.
///
/// The project name is taken from the current directory name.
pub fn default_config() -> AssetflowConfig {
    let project_name = env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "assets".to_string());

    AssetflowConfig {
        project: ProjectConfig { name: project_name, ..ProjectConfig::default() },
        ..AssetflowConfig::default()
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut AssetflowConfig, overrides: &CliOverrides) {
    if let Some(ref assets) = overrides.assets {
        config.project.assets = assets.clone();
    }

    if let Some(debounce_ms) = overrides.debounce_ms {
        config.watch.debounce_ms = debounce_ms;
    }
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the assetflow.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}
