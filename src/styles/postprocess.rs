//! Vendor prefixing, nesting, minification and source maps via lightningcss.

use crate::config::{parse_browser_version, BrowserTargets};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Features, Targets};
use parcel_sourcemap::SourceMap;
use std::sync::{Arc, RwLock};

/// Options shared by every stylesheet in a build.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostprocessOptions {
    /// Oldest browser versions to emit prefixes for
    pub browsers: Browsers,
}

impl PostprocessOptions {
    /// Options from the `[styles.browsers]` table. Entries that do not parse
    /// are skipped; validation reports them before this point.
    pub fn from_config(targets: &BrowserTargets) -> Self {
        let mut browsers = Browsers::default();
        for (name, version) in targets.entries() {
            let version = parse_browser_version(version);
            let slot = match name {
                "android" => &mut browsers.android,
                "chrome" => &mut browsers.chrome,
                "edge" => &mut browsers.edge,
                "firefox" => &mut browsers.firefox,
                "ie" => &mut browsers.ie,
                "ios_saf" => &mut browsers.ios_saf,
                "opera" => &mut browsers.opera,
                "safari" => &mut browsers.safari,
                "samsung" => &mut browsers.samsung,
                _ => continue,
            };
            *slot = version;
        }
        Self { browsers }
    }

    /// Nested rules are always flattened, whatever the browsers support.
    fn targets(&self) -> Targets {
        Targets { include: Features::Nesting, ..Targets::from(self.browsers) }
    }
}

/// Readable and minified CSS with their source maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedCss {
    pub css: String,
    pub css_map: String,
    pub min_css: String,
    pub min_css_map: String,
    /// Rules and declarations the parser dropped, with their location
    pub warnings: Vec<String>,
}

/// Prefix and print `code` twice: readable and minified.
///
/// `source_name` is recorded as the source in the maps. `css_name` and
/// `min_name` are the output file names that the trailing
/// `sourceMappingURL` comments point at (with `.map` appended).
pub fn process(
    source_name: &str,
    code: &str,
    css_name: &str,
    min_name: &str,
    options: &PostprocessOptions,
) -> Result<ProcessedCss, String> {
    let (css, css_map, warnings) = render(source_name, code, options, false)?;
    let (min_css, min_css_map, _) = render(source_name, code, options, true)?;
    Ok(ProcessedCss {
        css: format!("{}\n/*# sourceMappingURL={}.map */\n", css.trim_end(), css_name),
        css_map,
        min_css: format!("{}\n/*# sourceMappingURL={}.map */\n", min_css.trim_end(), min_name),
        min_css_map,
        warnings,
    })
}

fn render(
    source_name: &str,
    code: &str,
    options: &PostprocessOptions,
    minify: bool,
) -> Result<(String, String, Vec<String>), String> {
    let recovered = Arc::new(RwLock::new(Vec::new()));
    let parser_options = ParserOptions {
        filename: source_name.to_string(),
        error_recovery: true,
        warnings: Some(Arc::clone(&recovered)),
        ..ParserOptions::default()
    };
    let mut stylesheet = StyleSheet::parse(code, parser_options).map_err(|e| e.to_string())?;
    let warnings = recovered
        .read()
        .map(|list| list.iter().map(ToString::to_string).collect::<Vec<_>>())
        .unwrap_or_default();
    stylesheet
        .minify(MinifyOptions { targets: options.targets(), ..MinifyOptions::default() })
        .map_err(|e| e.to_string())?;

    let mut source_map = SourceMap::new("/");
    source_map.add_source(source_name);
    source_map.set_source_content(0, code).map_err(|e| format!("{:?}", e))?;

    let output = stylesheet
        .to_css(PrinterOptions {
            minify,
            source_map: Some(&mut source_map),
            targets: options.targets(),
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let map = source_map.to_json(None).map_err(|e| format!("{:?}", e))?;
    Ok((output.code, map, warnings))
}
