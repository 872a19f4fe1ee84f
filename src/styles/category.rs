//! Fragment categories and their aggregate regions.

use super::directive::import_directive;
use super::{StyleError, StyleLayout};
use glob::{glob, Pattern};
use std::fmt;
use std::path::{Path, PathBuf};

/// Region of the aggregate a fragment is listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Globals,
    Partials,
    Pages,
    Includes,
}

/// Markers and directive transform for one category's region.
#[derive(Debug, Clone, Copy)]
pub struct RegionBinding {
    pub category: Category,
    pub start: &'static str,
    pub end: &'static str,
    /// Turns a path relative to the aggregate into its directive line
    pub transform: fn(&Path) -> String,
}

impl Category {
    /// All categories in region order.
    pub const ALL: [Category; 4] =
        [Category::Globals, Category::Partials, Category::Pages, Category::Includes];

    /// Folder name whose direct children belong to this category.
    pub fn folder(self) -> &'static str {
        match self {
            Category::Globals => "globals",
            Category::Partials => "partials",
            Category::Pages => "pages",
            Category::Includes => "includes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Globals => "Globals",
            Category::Partials => "Partials",
            Category::Pages => "Pages",
            Category::Includes => "Includes",
        }
    }

    pub fn binding(self) -> RegionBinding {
        let (start, end) = match self {
            Category::Globals => ("/* Globals */", "/* EndGlobals */"),
            Category::Partials => ("/* Partials */", "/* EndPartials */"),
            Category::Pages => ("/* Pages */", "/* EndPages */"),
            Category::Includes => ("/* Includes */", "/* EndIncludes */"),
        };
        RegionBinding { category: self, start, end, transform: import_directive }
    }

    /// Classify a fragment by the name of its immediate parent directory.
    ///
    /// Anything that is not directly inside `includes`, `pages` or
    /// `partials` is a global.
    pub fn classify(path: &Path) -> Category {
        let parent = path.parent().and_then(Path::file_name).and_then(|name| name.to_str());
        match parent {
            Some("includes") => Category::Includes,
            Some("pages") => Category::Pages,
            Some("partials") => Category::Partials,
            _ => Category::Globals,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current members of a category, sorted by path relative to the root.
///
/// Globals are the direct children of the root (except the aggregate) and
/// of an optional `globals/` folder. A missing folder has no members.
pub fn members(layout: &StyleLayout, category: Category) -> Result<Vec<PathBuf>, StyleError> {
    let mut found = direct_children(layout, &layout.root.join(category.folder()))?;
    if category == Category::Globals {
        found.extend(
            direct_children(layout, &layout.root)?
                .into_iter()
                .filter(|path| !layout.is_aggregate(path)),
        );
    }

    let mut keyed: Vec<(String, PathBuf)> = found
        .into_iter()
        .map(|path| {
            let key = layout
                .relative(&path)
                .map(|rel| super::directive::import_path(&rel))
                .unwrap_or_default();
            (key, path)
        })
        .collect();
    keyed.sort();
    keyed.dedup_by(|a, b| a.0 == b.0);
    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}

fn direct_children(layout: &StyleLayout, dir: &Path) -> Result<Vec<PathBuf>, StyleError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern =
        format!("{}/*.{}", Pattern::escape(&dir.to_string_lossy()), layout.extension);
    Ok(glob(&pattern)?
        .filter_map(Result::ok)
        .filter(|path| path.is_file() && layout.is_style(path))
        .collect())
}
