//! Configuration schema types for `assetflow.toml`
//!
//! Defines the structure and validation rules for an asset project.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which program turns a stylesheet into plain CSS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    /// Inline resolvable `@import`s and hand the result to the CSS post-processor
    #[default]
    Builtin,
    /// Run an external `lessc` program
    Lessc,
}

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory that is served as the web root (markup URLs are relative to it)
    #[serde(default = "default_public_root")]
    pub public_root: PathBuf,
    /// Assets directory holding the styles and images folders
    #[serde(default = "default_assets")]
    pub assets: PathBuf,
}

fn default_name() -> String {
    "assets".to_string()
}

fn default_public_root() -> PathBuf {
    PathBuf::from("build")
}

fn default_assets() -> PathBuf {
    PathBuf::from("build/assets")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            public_root: default_public_root(),
            assets: default_assets(),
        }
    }
}

/// External `lessc` invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LesscConfig {
    /// Program to run
    #[serde(default = "default_lessc_program")]
    pub program: String,
    /// Extra arguments placed before the source path
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_lessc_program() -> String {
    "lessc".to_string()
}

impl Default for LesscConfig {
    fn default() -> Self {
        Self { program: default_lessc_program(), args: Vec::new() }
    }
}

/// Minimum browser versions used for vendor prefixing.
///
/// Versions are written as `"major[.minor[.patch]]"`. A missing entry means
/// the browser is not targeted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserTargets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firefox: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios_saf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safari: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samsung: Option<String>,
}

impl Default for BrowserTargets {
    fn default() -> Self {
        Self {
            android: Some("4.4".to_string()),
            chrome: Some("30".to_string()),
            edge: Some("12".to_string()),
            firefox: Some("28".to_string()),
            ie: Some("10".to_string()),
            ios_saf: Some("7".to_string()),
            opera: Some("17".to_string()),
            safari: Some("7".to_string()),
            samsung: Some("4".to_string()),
        }
    }
}

impl BrowserTargets {
    /// Iterate over `(browser, version)` pairs that are set.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("android", &self.android),
            ("chrome", &self.chrome),
            ("edge", &self.edge),
            ("firefox", &self.firefox),
            ("ie", &self.ie),
            ("ios_saf", &self.ios_saf),
            ("opera", &self.opera),
            ("safari", &self.safari),
            ("samsung", &self.samsung),
        ]
        .into_iter()
        .filter_map(|(name, version)| version.as_deref().map(|v| (name, v)))
        .collect()
    }
}

/// Parse a `"major[.minor[.patch]]"` browser version into the packed
/// `(major << 16) | (minor << 8) | patch` form.
pub fn parse_browser_version(version: &str) -> Option<u32> {
    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
    let patch: u32 = parts.next().map(str::parse::<u32>).transpose().ok()?.unwrap_or(0);
    if parts.next().is_some() || major > 0xFFFF || minor > 0xFF || patch > 0xFF {
        return None;
    }
    Some((major << 16) | (minor << 8) | patch)
}

/// Stylesheet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    /// Styles root, relative to the assets directory
    #[serde(default = "default_styles_src")]
    pub src: PathBuf,
    /// Compiled output directory, relative to the assets directory
    #[serde(default = "default_styles_out")]
    pub out: PathBuf,
    /// Aggregate stylesheet file name inside the styles root
    #[serde(default = "default_main")]
    pub main: String,
    /// Stylesheet extension without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Compiler used for each stylesheet
    #[serde(default)]
    pub compiler: CompilerKind,
    /// Settings for the `lessc` compiler
    #[serde(default)]
    pub lessc: LesscConfig,
    /// Prefixing targets
    #[serde(default)]
    pub browsers: BrowserTargets,
}

fn default_styles_src() -> PathBuf {
    PathBuf::from("less")
}

fn default_styles_out() -> PathBuf {
    PathBuf::from("css")
}

fn default_main() -> String {
    "main.less".to_string()
}

fn default_extension() -> String {
    "less".to_string()
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            src: default_styles_src(),
            out: default_styles_out(),
            main: default_main(),
            extension: default_extension(),
            compiler: CompilerKind::default(),
            lessc: LesscConfig::default(),
            browsers: BrowserTargets::default(),
        }
    }
}

/// Image pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Source images folder, relative to the assets directory
    #[serde(default = "default_images_src")]
    pub src: PathBuf,
    /// Compressed output folder, relative to the images folder
    #[serde(default = "default_compressed")]
    pub compressed: PathBuf,
    /// Example markup folder, relative to the images folder
    #[serde(default = "default_examples")]
    pub examples: PathBuf,
    /// JPEG re-encode quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Resize percentages of the original width
    #[serde(default = "default_sizes")]
    pub sizes: Vec<u32>,
}

fn default_images_src() -> PathBuf {
    PathBuf::from("images")
}

fn default_compressed() -> PathBuf {
    PathBuf::from("compressed")
}

fn default_examples() -> PathBuf {
    PathBuf::from("exampleFiles")
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_sizes() -> Vec<u32> {
    (1..=18).map(|step| step * 5).collect()
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            src: default_images_src(),
            compressed: default_compressed(),
            examples: default_examples(),
            jpeg_quality: default_jpeg_quality(),
            sizes: default_sizes(),
        }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

/// Complete assetflow.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetflowConfig {
    /// Project paths
    #[serde(default)]
    pub project: ProjectConfig,
    /// Stylesheet settings
    #[serde(default)]
    pub styles: StylesConfig,
    /// Image settings
    #[serde(default)]
    pub images: ImagesConfig,
    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "images.jpeg_quality")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "assetflow.toml: '{}' {}", self.field, self.message)
    }
}

impl AssetflowConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.styles.main.is_empty() {
            errors.push(ConfigValidationError {
                field: "styles.main".to_string(),
                message: "must be a non-empty file name".to_string(),
            });
        }

        if self.styles.extension.is_empty() || self.styles.extension.contains('.') {
            errors.push(ConfigValidationError {
                field: "styles.extension".to_string(),
                message: "must be an extension without a leading dot".to_string(),
            });
        }

        if self.styles.compiler == CompilerKind::Lessc && self.styles.lessc.program.is_empty() {
            errors.push(ConfigValidationError {
                field: "styles.lessc.program".to_string(),
                message: "must name a program when compiler = \"lessc\"".to_string(),
            });
        }

        for (browser, version) in self.styles.browsers.entries() {
            if parse_browser_version(version).is_none() {
                errors.push(ConfigValidationError {
                    field: format!("styles.browsers.{}", browser),
                    message: format!("'{}' is not a version like \"10\" or \"4.4\"", version),
                });
            }
        }

        if self.images.jpeg_quality == 0 || self.images.jpeg_quality > 100 {
            errors.push(ConfigValidationError {
                field: "images.jpeg_quality".to_string(),
                message: "must be between 1 and 100".to_string(),
            });
        }

        for size in &self.images.sizes {
            if *size == 0 || *size >= 100 {
                errors.push(ConfigValidationError {
                    field: "images.sizes".to_string(),
                    message: format!("{} is not a percentage between 1 and 99", size),
                });
            }
        }

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_parse() {
        let config: AssetflowConfig = toml::from_str("").unwrap();
        assert_eq!(config.project.assets, PathBuf::from("build/assets"));
        assert_eq!(config.project.public_root, PathBuf::from("build"));
        assert_eq!(config.styles.src, PathBuf::from("less"));
        assert_eq!(config.styles.out, PathBuf::from("css"));
        assert_eq!(config.styles.main, "main.less");
        assert_eq!(config.styles.compiler, CompilerKind::Builtin);
        assert_eq!(config.images.jpeg_quality, 80);
        assert_eq!(config.watch.debounce_ms, 100);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[project]
name = "site"
public_root = "public"
assets = "public/static"

[styles]
src = "styles"
out = "dist/css"
main = "app.less"
compiler = "lessc"

[styles.lessc]
program = "npx"
args = ["lessc", "--math=always"]

[styles.browsers]
chrome = "49"
safari = "10.1"

[images]
jpeg_quality = 70
sizes = [25, 50, 75]

[watch]
debounce_ms = 250
"#;
        let config: AssetflowConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project.name, "site");
        assert_eq!(config.project.assets, PathBuf::from("public/static"));
        assert_eq!(config.styles.main, "app.less");
        assert_eq!(config.styles.compiler, CompilerKind::Lessc);
        assert_eq!(config.styles.lessc.program, "npx");
        assert_eq!(config.styles.lessc.args, vec!["lessc", "--math=always"]);
        assert_eq!(config.styles.browsers.chrome.as_deref(), Some("49"));
        assert_eq!(config.styles.browsers.ie, None);
        assert_eq!(config.images.sizes, vec![25, 50, 75]);
        assert_eq!(config.watch.debounce_ms, 250);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_default_sizes() {
        let sizes = ImagesConfig::default().sizes;
        assert_eq!(sizes.len(), 18);
        assert_eq!(sizes.first(), Some(&5));
        assert_eq!(sizes.last(), Some(&90));
    }

    #[test]
    fn test_parse_browser_version() {
        assert_eq!(parse_browser_version("10"), Some(10 << 16));
        assert_eq!(parse_browser_version("4.4"), Some((4 << 16) | (4 << 8)));
        assert_eq!(parse_browser_version("15.6.1"), Some((15 << 16) | (6 << 8) | 1));
        assert_eq!(parse_browser_version(""), None);
        assert_eq!(parse_browser_version("ten"), None);
        assert_eq!(parse_browser_version("1.2.3.4"), None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AssetflowConfig::default();
        config.styles.extension = ".less".to_string();
        config.images.jpeg_quality = 0;
        config.images.sizes = vec![50, 100];
        config.styles.browsers.chrome = Some("latest".to_string());

        let errors = config.validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"styles.extension"));
        assert!(fields.contains(&"images.jpeg_quality"));
        assert!(fields.contains(&"images.sizes"));
        assert!(fields.contains(&"styles.browsers.chrome"));
    }

    #[test]
    fn test_validation_error_display() {
        let error = ConfigValidationError {
            field: "watch.debounce_ms".to_string(),
            message: "must be a positive integer".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "assetflow.toml: 'watch.debounce_ms' must be a positive integer"
        );
    }
}
