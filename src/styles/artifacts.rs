//! The compiled files derived from one fragment.

use super::{StyleError, StyleLayout};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What happened to one artifact on deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing was there to delete
    Absent,
    Failed(String),
}

/// `<out>/<sub>/<name>.css`, `.css.map`, `.min.css` and `.min.css.map` for
/// a fragment at `<root>/<sub>/<name>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub css: PathBuf,
    pub css_map: PathBuf,
    pub min_css: PathBuf,
    pub min_css_map: PathBuf,
}

impl ArtifactSet {
    /// Derive the artifact paths for a fragment under the styles root.
    pub fn for_source(layout: &StyleLayout, source: &Path) -> Result<Self, StyleError> {
        let outside = || StyleError::OutsideRoot { path: source.to_path_buf() };
        let relative = layout.relative(source).ok_or_else(outside)?;
        let stem = relative.file_stem().ok_or_else(outside)?.to_string_lossy().into_owned();
        let dir = match relative.parent() {
            Some(sub) if !sub.as_os_str().is_empty() => layout.out.join(sub),
            _ => layout.out.clone(),
        };

        Ok(Self {
            css: dir.join(format!("{}.css", stem)),
            css_map: dir.join(format!("{}.css.map", stem)),
            min_css: dir.join(format!("{}.min.css", stem)),
            min_css_map: dir.join(format!("{}.min.css.map", stem)),
        })
    }

    /// All four paths.
    pub fn paths(&self) -> [&Path; 4] {
        [&self.css, &self.css_map, &self.min_css, &self.min_css_map]
    }

    /// Directory the artifacts are written to.
    pub fn dir(&self) -> Option<&Path> {
        self.css.parent()
    }

    /// Delete each artifact. A failure on one does not stop the others.
    pub fn delete(&self) -> Vec<(PathBuf, DeleteOutcome)> {
        self.paths()
            .into_iter()
            .map(|path| {
                let outcome = match fs::remove_file(path) {
                    Ok(()) => DeleteOutcome::Deleted,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => DeleteOutcome::Absent,
                    Err(e) => DeleteOutcome::Failed(e.to_string()),
                };
                (path.to_path_buf(), outcome)
            })
            .collect()
    }
}

/// File name only, used for `sourceMappingURL` comments.
pub fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
