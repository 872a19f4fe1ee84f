//! Text operations on the aggregate stylesheet.
//!
//! The aggregate holds one region per [`Category`](super::Category),
//! delimited by a start and end marker comment. Everything outside the
//! regions is left untouched.

use super::category::{Category, RegionBinding};
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// A region's start or end marker was not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingMarker {
    pub marker: &'static str,
}

impl fmt::Display for MissingMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker '{}' not found", self.marker)
    }
}

impl std::error::Error for MissingMarker {}

/// Line ending used by the aggregate: `\r\n` if it has any, else `\n`.
pub fn line_ending(content: &str) -> &'static str {
    if content.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

/// Content of a fresh aggregate with the four regions empty.
pub fn scaffold(newline: &str) -> String {
    Category::ALL
        .iter()
        .map(|category| {
            let binding = category.binding();
            format!("{}{nl}{}{nl}", binding.start, binding.end, nl = newline)
        })
        .collect()
}

/// Replace the body of one region with the given directives.
///
/// The directives are written one per line, indented like the start marker.
/// The end marker is placed on its own line after them.
pub fn rewrite_region(
    content: &str,
    binding: &RegionBinding,
    directives: &[String],
) -> Result<String, MissingMarker> {
    let start = content.find(binding.start).ok_or(MissingMarker { marker: binding.start })?;
    let body_start = start + binding.start.len();
    let end = content[body_start..]
        .find(binding.end)
        .map(|offset| body_start + offset)
        .ok_or(MissingMarker { marker: binding.end })?;

    let newline = line_ending(content);
    let line_start = content[..start].rfind('\n').map_or(0, |i| i + 1);
    let indent: String =
        content[line_start..start].chars().take_while(|c| c.is_whitespace()).collect();

    let mut region = String::with_capacity(end + binding.end.len() - start);
    region.push_str(binding.start);
    region.push_str(newline);
    for directive in directives {
        region.push_str(&indent);
        region.push_str(directive);
        region.push_str(newline);
    }
    region.push_str(&indent);
    region.push_str(binding.end);

    let mut updated = String::with_capacity(content.len() + region.len());
    updated.push_str(&content[..start]);
    updated.push_str(&region);
    updated.push_str(&content[end + binding.end.len()..]);
    Ok(updated)
}

/// Drop every line whose trimmed text equals `directive`.
///
/// Returns the new content and the number of lines removed.
pub fn remove_directive(content: &str, directive: &str) -> (String, usize) {
    let mut removed = 0;
    let kept: String = content
        .split_inclusive('\n')
        .filter(|line| {
            let matches = line.trim() == directive;
            if matches {
                removed += 1;
            }
            !matches
        })
        .collect();
    (kept, removed)
}

/// Drop every line that is empty or whitespace only.
pub fn remove_empty_lines(content: &str) -> String {
    content.split_inclusive('\n').filter(|line| !line.trim().is_empty()).collect()
}

/// Write through a temporary file in the same directory, then rename it
/// over `path`.
pub fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
