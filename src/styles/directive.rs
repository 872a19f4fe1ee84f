//! Import directive text for a fragment.

use std::path::{Component, Path};

/// The `/`-joined form of a path relative to the aggregate's directory.
pub fn import_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `@import "<path>";` for a fragment path relative to the aggregate.
pub fn import_directive(relative: &Path) -> String {
    format!("@import \"{}\";", import_path(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_directive_for_category_member() {
        assert_eq!(
            import_directive(Path::new("partials/button.less")),
            "@import \"partials/button.less\";"
        );
    }

    #[test]
    fn test_directive_for_root_member() {
        assert_eq!(import_directive(Path::new("reset.less")), "@import \"reset.less\";");
    }

    #[test]
    fn test_import_path_joins_components() {
        let path: PathBuf = ["globals", "type", "fonts.less"].iter().collect();
        assert_eq!(import_path(&path), "globals/type/fonts.less");
    }

    #[test]
    fn test_import_path_skips_cur_dir() {
        assert_eq!(import_path(Path::new("./pages/home.less")), "pages/home.less");
    }
}
