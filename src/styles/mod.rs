//! Stylesheet handling: the aggregate import regions and the compiled outputs.
//!
//! # Overview
//!
//! - **Category**: which region of the aggregate a fragment belongs to
//! - **Aggregate**: text operations on the delimited import regions
//! - **Artifacts**: the four compiled files derived from one fragment
//! - **Compile / less / postprocess / rebuild**: turning fragments into CSS
//! - **Reconciler**: keeps the aggregate equal to the fragments on disk
//!
//! # Example
//!
//! ```ignore
//! use assetflow::styles::Reconciler;
//!
//! let reconciler = Reconciler::from_context(&context);
//! reconciler.inject_all()?;
//! reconciler.clean_aggregate()?;
//! ```

pub mod aggregate;
pub mod artifacts;
pub mod category;
pub mod compile;
pub mod directive;
pub mod less;
pub mod postprocess;
pub mod rebuild;
pub mod reconciler;

pub use aggregate::MissingMarker;
pub use artifacts::{ArtifactSet, DeleteOutcome};
pub use category::{Category, RegionBinding};
pub use compile::{compiler_for, ImportInliner, LesscCompiler, StyleCompiler};
pub use less::LessError;
pub use postprocess::{PostprocessOptions, ProcessedCss};
pub use reconciler::{Reconciler, RemovalReport};

use crate::build::BuildContext;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from stylesheet operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StyleError {
    /// File I/O error on a fragment, the aggregate or an artifact
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A region marker is missing from the aggregate
    #[error("{}: marker '{marker}' not found", path.display())]
    MissingMarker { path: PathBuf, marker: &'static str },
    /// The stylesheet compiler rejected a file
    #[error("failed to compile {}: {message}", path.display())]
    Compile { path: PathBuf, message: String },
    /// CSS post-processing failed
    #[error("failed to process CSS for {}: {message}", path.display())]
    Css { path: PathBuf, message: String },
    /// A fragment imports itself, directly or indirectly
    #[error("import cycle through {}", path.display())]
    ImportCycle { path: PathBuf },
    /// The path is not inside the styles root
    #[error("{} is outside the styles root", path.display())]
    OutsideRoot { path: PathBuf },
    /// Invalid glob pattern for discovery
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl StyleError {
    /// Build an `Io` error for a path, for use with `map_err`.
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> StyleError + '_ {
        move |source| StyleError::Io { path: path.to_path_buf(), source }
    }
}

/// Where stylesheets live and where their outputs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleLayout {
    /// Styles root holding the aggregate and the category folders
    pub root: PathBuf,
    /// Aggregate stylesheet (a direct child of the root)
    pub aggregate: PathBuf,
    /// Compiled output directory
    pub out: PathBuf,
    /// Stylesheet extension without the dot
    pub extension: String,
}

impl StyleLayout {
    /// Create a layout with the default aggregate name and extension.
    pub fn new(root: impl Into<PathBuf>, out: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            aggregate: root.join("main.less"),
            root,
            out: out.into(),
            extension: "less".to_string(),
        }
    }

    /// Layout resolved from the build context.
    pub fn from_context(ctx: &BuildContext) -> Self {
        let styles = &ctx.config().styles;
        Self {
            root: ctx.styles_dir(),
            aggregate: ctx.aggregate_path(),
            out: ctx.css_dir(),
            extension: styles.extension.clone(),
        }
    }

    /// Whether a path has the stylesheet extension.
    pub fn is_style(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()))
    }

    /// Whether a path is the aggregate file.
    pub fn is_aggregate(&self, path: &Path) -> bool {
        match (self.relative(path), self.relative(&self.aggregate)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Path relative to the styles root.
    ///
    /// Relative paths are taken as already relative to the root. Absolute
    /// paths are matched against the root as given and in canonical form,
    /// so watcher paths (canonical) and configured paths agree.
    pub fn relative(&self, path: &Path) -> Option<PathBuf> {
        if path.is_relative() {
            return Some(path.to_path_buf());
        }
        if let Ok(rel) = path.strip_prefix(&self.root) {
            return Some(rel.to_path_buf());
        }
        let canonical = fs::canonicalize(&self.root).ok()?;
        path.strip_prefix(canonical).ok().map(Path::to_path_buf)
    }
}
