//! Example `<picture>` markup for each compressed image.

use super::webp::webp_path;
use super::{collect_stage, images_in, ImageError, ImageKind, ImageOptions};
use crate::build::{BuildResult, TargetResult};
use rayon::prelude::*;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

const ALT_PLACEHOLDER: &str = "{{ Add Your Alt Text Here }}";
const TITLE_PLACEHOLDER: &str = "{{ Add Your Title Text Here }}";

/// `./<dir relative to the public root>/`, `/`-joined.
///
/// A directory outside the public root is used as given.
pub fn url_base(dir: &Path, public_root: &Path) -> String {
    let relative = dir.strip_prefix(public_root).unwrap_or(dir);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        "./".to_string()
    } else {
        format!("./{}/", parts.join("/"))
    }
}

fn source_tag(width: u32, url: &str, mime: &str) -> String {
    format!("<source media=\"(min-width: {}px)\" srcset=\"{}\" type=\"{}\">", width, url, mime)
}

/// Markup for one compressed image: WebP and original sources for the full
/// width, then each resized variant from the largest percentage down, then
/// the fallback `<img>`. Variants that are not on disk are left out.
pub fn picture_markup(options: &ImageOptions, image: &Path) -> Result<String, ImageError> {
    let kind = ImageKind::of(image).unwrap_or(ImageKind::Jpeg);
    let name = image.file_name().unwrap_or_default().to_string_lossy().into_owned();
    let webp_name = webp_path(Path::new(&name)).to_string_lossy().into_owned();
    let base = url_base(&options.compressed_dir, &options.public_root);

    let mut sizes = options.sizes.clone();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    sizes.dedup();

    let mut variants: Vec<(PathBuf, String)> = vec![(image.to_path_buf(), base.clone())];
    for percent in sizes {
        let path = options.size_dir(percent).join(&name);
        variants.push((path, format!("{}size-{}/", base, percent)));
    }

    let mut lines = Vec::new();
    for (path, url) in variants {
        if !path.is_file() {
            continue;
        }
        let (width, _) = image::image_dimensions(&path).map_err(ImageError::image(&path))?;
        if webp_path(&path).is_file() {
            lines.push(source_tag(width, &format!("{}{}", url, webp_name), "image/webp"));
        }
        lines.push(source_tag(width, &format!("{}{}", url, name), kind.mime()));
    }
    lines.push(format!(
        "<img src=\"{}{}\" alt=\"{}\" title=\"{}\" />",
        base, name, ALT_PLACEHOLDER, TITLE_PLACEHOLDER
    ));

    let mut markup = String::from("<picture>\n");
    for line in lines {
        markup.push('\t');
        markup.push_str(&line);
        markup.push('\n');
    }
    markup.push_str("</picture>\n");
    Ok(markup)
}

/// Write `exampleFiles/<stem>.html` for one image.
pub fn write_one(options: &ImageOptions, image: &Path) -> Result<PathBuf, ImageError> {
    let markup = picture_markup(options, image)?;
    let stem = image.file_stem().unwrap_or_default().to_string_lossy().into_owned();
    let target = options.examples_dir.join(format!("{}.html", stem));
    fs::write(&target, markup).map_err(ImageError::io(&target))?;
    Ok(target)
}

/// Write markup for every compressed JPEG and PNG.
pub fn write_all(options: &ImageOptions) -> Result<BuildResult, ImageError> {
    let started = Instant::now();
    let images = images_in(&options.compressed_dir, ImageKind::is_raster)?;
    fs::create_dir_all(&options.examples_dir).map_err(ImageError::io(&options.examples_dir))?;

    let results = images
        .par_iter()
        .map(|image| {
            let target_id = format!("example:{}", image.display());
            let began = Instant::now();
            match write_one(options, image) {
                Ok(output) => TargetResult::success(target_id, vec![output], began.elapsed()),
                Err(e) => TargetResult::failed(target_id, e.to_string(), began.elapsed()),
            }
        })
        .collect();
    Ok(collect_stage("examples", started, results))
}
