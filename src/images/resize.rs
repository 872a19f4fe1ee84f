//! Percentage-width variants of the compressed images.

use super::compress::{decode, encode};
use super::{collect_stage, images_in, ImageError, ImageKind, ImageOptions, RasterKind};
use crate::build::{BuildResult, TargetResult};
use image::imageops::FilterType;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// `(width, height)` scaled by `percent`, rounded, at least 1 each.
pub fn scaled_dimensions(width: u32, height: u32, percent: u32) -> (u32, u32) {
    let scale = |value: u32| -> u32 {
        let scaled = (u64::from(value) * u64::from(percent) + 50) / 100;
        u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
    };
    (scale(width), scale(height))
}

/// Write every configured size of one compressed image.
pub fn resize_one(options: &ImageOptions, source: &Path) -> Result<Vec<PathBuf>, ImageError> {
    let kind = ImageKind::of(source).and_then(ImageKind::raster).unwrap_or(RasterKind::Jpeg);
    let name = source.file_name().unwrap_or_default();
    let image = decode(source)?;

    let mut outputs = Vec::with_capacity(options.sizes.len());
    for &percent in &options.sizes {
        let (width, height) = scaled_dimensions(image.width(), image.height(), percent);
        let resized = image.resize_exact(width, height, FilterType::Lanczos3);
        let target = options.size_dir(percent).join(name);
        encode(&resized, kind, &target, options.jpeg_quality)?;
        outputs.push(target);
    }
    Ok(outputs)
}

/// Resize every JPEG and PNG directly in the compressed folder.
pub fn resize_all(options: &ImageOptions) -> Result<BuildResult, ImageError> {
    let started = Instant::now();
    let sources = images_in(&options.compressed_dir, ImageKind::is_raster)?;

    let results = sources
        .par_iter()
        .map(|source| {
            let target_id = format!("resize:{}", source.display());
            let began = Instant::now();
            match resize_one(options, source) {
                Ok(outputs) => TargetResult::success(target_id, outputs, began.elapsed()),
                Err(e) => TargetResult::failed(target_id, e.to_string(), began.elapsed()),
            }
        })
        .collect();
    Ok(collect_stage("resize", started, results))
}
