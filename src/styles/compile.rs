//! Turning one stylesheet into plain CSS.
//!
//! Two compilers are available: [`ImportInliner`], which resolves
//! `@import`s in-process and lowers the result with [`super::less`], and
//! [`LesscCompiler`], which shells out to `lessc` (or any program with the
//! same calling convention).

use super::{less, StyleError};
use crate::config::{CompilerKind, StylesConfig};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use tracing::debug;

/// Compiles a stylesheet file to CSS text.
pub trait StyleCompiler: Send + Sync {
    fn compile(&self, source: &Path) -> Result<String, StyleError>;

    /// Short name for log lines.
    fn name(&self) -> &'static str;
}

/// Compiler selected by the `[styles]` configuration.
pub fn compiler_for(config: &StylesConfig) -> Box<dyn StyleCompiler> {
    match config.compiler {
        CompilerKind::Builtin => Box::new(ImportInliner::new(&config.extension)),
        CompilerKind::Lessc => {
            Box::new(LesscCompiler::new(&config.lessc.program, config.lessc.args.clone()))
        }
    }
}

fn import_regex() -> &'static Regex {
    static IMPORT: OnceLock<Regex> = OnceLock::new();
    IMPORT.get_or_init(|| {
        Regex::new(r#"^\s*@import\s*(?:\([^)]*\)\s*)?["']([^"']+)["']\s*;?\s*$"#)
            .expect("import pattern is a valid regex")
    })
}

/// Inlines every `@import` that points at a file on disk, then lowers
/// variables and escapes to plain CSS.
///
/// Whole-line `//` comments are dropped before imports are looked at.
/// Imports that do not resolve to a file (URLs, missing files) are kept as
/// written. Mixins and the other constructs [`less::lower`] rejects fail the
/// file with [`StyleError::Compile`].
#[derive(Debug, Clone)]
pub struct ImportInliner {
    extension: String,
}

impl ImportInliner {
    pub fn new(extension: &str) -> Self {
        Self { extension: extension.trim_start_matches('.').to_string() }
    }

    /// `target` relative to `dir`, then with the stylesheet extension added
    /// when `target` has none.
    fn resolve(&self, dir: &Path, target: &str) -> Option<PathBuf> {
        let candidate = dir.join(target);
        if candidate.is_file() {
            return Some(candidate);
        }
        if Path::new(target).extension().is_none() {
            let with_ext = dir.join(format!("{}.{}", target, self.extension));
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }
        None
    }

    fn inline(&self, source: &Path, stack: &mut Vec<PathBuf>) -> Result<String, StyleError> {
        let identity = fs::canonicalize(source).map_err(StyleError::io(source))?;
        if stack.contains(&identity) {
            return Err(StyleError::ImportCycle { path: source.to_path_buf() });
        }
        let content = fs::read_to_string(source).map_err(StyleError::io(source))?;
        let dir = source.parent().unwrap_or_else(|| Path::new("."));
        stack.push(identity);

        let mut output = String::with_capacity(content.len());
        for line in content.split_inclusive('\n') {
            if line.trim_start().starts_with("//") {
                continue;
            }
            let resolved = import_regex()
                .captures(line.trim_end_matches(['\r', '\n']))
                .and_then(|caps| self.resolve(dir, &caps[1]));
            match resolved {
                Some(target) => {
                    debug!(
                        from = %source.display(),
                        import = %target.display(),
                        "inlining import"
                    );
                    let inlined = self.inline(&target, stack)?;
                    output.push_str(&inlined);
                    if !inlined.ends_with('\n') {
                        output.push('\n');
                    }
                }
                None => output.push_str(line),
            }
        }

        stack.pop();
        Ok(output)
    }
}

impl StyleCompiler for ImportInliner {
    fn compile(&self, source: &Path) -> Result<String, StyleError> {
        let inlined = self.inline(source, &mut Vec::new())?;
        less::lower(&inlined).map_err(|e| StyleError::Compile {
            path: source.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

/// Runs `<program> <args..> <source>` and takes stdout as the CSS.
#[derive(Debug, Clone)]
pub struct LesscCompiler {
    program: String,
    args: Vec<String>,
}

impl LesscCompiler {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self { program: program.to_string(), args }
    }
}

impl StyleCompiler for LesscCompiler {
    fn compile(&self, source: &Path) -> Result<String, StyleError> {
        let output =
            Command::new(&self.program).args(&self.args).arg(source).output().map_err(|e| {
                StyleError::Compile {
                    path: source.to_path_buf(),
                    message: format!("failed to run {}: {}", self.program, e),
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(StyleError::Compile { path: source.to_path_buf(), message });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &'static str {
        "lessc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_inliner_resolves_nested_imports() {
        let temp = TempDir::new().unwrap();
        let main = write(
            temp.path(),
            "main.less",
            "@import \"partials/button.less\";\n\
             @import (reference) 'globals/reset';\n\
             body { margin: 0; }\n",
        );
        write(
            temp.path(),
            "partials/button.less",
            "@import \"../globals/colors\";\n.btn { color: red; }",
        );
        write(temp.path(), "globals/reset.less", "* { box-sizing: border-box; }\n");
        write(temp.path(), "globals/colors.less", "a { color: blue; }\n");

        let css = ImportInliner::new("less").compile(&main).unwrap();
        assert_eq!(
            css,
            "a { color: blue; }\n.btn { color: red; }\n\
             * { box-sizing: border-box; }\nbody { margin: 0; }\n"
        );
    }

    #[test]
    fn test_inliner_keeps_unresolved_imports_and_drops_line_comments() {
        let temp = TempDir::new().unwrap();
        let main = write(
            temp.path(),
            "main.less",
            "// header comment\n@import \"https://fonts.example.com/x.css\";\n\
             @import \"missing.less\";\na { b: c; }\n",
        );

        let css = ImportInliner::new("less").compile(&main).unwrap();
        assert_eq!(
            css,
            "@import \"https://fonts.example.com/x.css\";\n@import \"missing.less\";\na { b: c; }\n"
        );
    }

    #[test]
    fn test_inliner_lowers_variables_across_imports() {
        let temp = TempDir::new().unwrap();
        let main = write(
            temp.path(),
            "main.less",
            "@import \"vars\";\n.a { color: @brand; .b { margin: @gap; } }\n",
        );
        write(temp.path(), "vars.less", "@brand: #ff0000;\n@gap: 4px;\n");

        let css = ImportInliner::new("less").compile(&main).unwrap();
        assert_eq!(css, "\n\n.a { color: #ff0000; .b { margin: 4px; } }\n");
    }

    #[test]
    fn test_inliner_rejects_mixins() {
        let temp = TempDir::new().unwrap();
        let source = write(temp.path(), "a.less", ".mix() { color: red; }\n.x { .mix(); }\n");

        match ImportInliner::new("less").compile(&source) {
            Err(StyleError::Compile { path, message }) => {
                assert_eq!(path, source);
                assert!(message.starts_with("mixin definition .mix"));
                assert!(message.contains("compiler = \"lessc\""));
            }
            other => panic!("expected compile error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_inliner_detects_cycles() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a.less", "@import \"b\";\n");
        write(temp.path(), "b.less", "@import \"a\";\n");

        let result = ImportInliner::new("less").compile(&a);
        assert!(matches!(result, Err(StyleError::ImportCycle { .. })));
    }

    #[test]
    fn test_inliner_missing_source() {
        let temp = TempDir::new().unwrap();
        let result = ImportInliner::new("less").compile(&temp.path().join("nope.less"));
        assert!(matches!(result, Err(StyleError::Io { .. })));
    }

    #[test]
    fn test_compiler_for_config() {
        let mut config = StylesConfig::default();
        assert_eq!(compiler_for(&config).name(), "builtin");
        config.compiler = CompilerKind::Lessc;
        assert_eq!(compiler_for(&config).name(), "lessc");
    }

    #[test]
    fn test_lessc_missing_program() {
        let temp = TempDir::new().unwrap();
        let source = write(temp.path(), "a.less", "a { b: c; }\n");
        let compiler = LesscCompiler::new("assetflow-no-such-lessc", Vec::new());

        match compiler.compile(&source) {
            Err(StyleError::Compile { message, .. }) => {
                assert!(message.starts_with("failed to run assetflow-no-such-lessc"))
            }
            other => panic!("expected compile error, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_lessc_uses_stdout() {
        let temp = TempDir::new().unwrap();
        let source = write(temp.path(), "a.less", "a { b: c; }\n");
        let compiler = LesscCompiler::new("cat", Vec::new());

        assert_eq!(compiler.compile(&source).unwrap(), "a { b: c; }\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_lessc_failure_carries_stderr() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.less");
        let compiler = LesscCompiler::new("cat", Vec::new());

        match compiler.compile(&missing) {
            Err(StyleError::Compile { message, .. }) => assert!(message.contains("missing.less")),
            other => panic!("expected compile error, got {:?}", other.map(|_| ())),
        }
    }
}
