//! Re-encode source images into the compressed folder.

use super::{collect_stage, images_in, ImageError, ImageKind, ImageOptions, RasterKind};
use crate::build::{BuildResult, TargetResult};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageEncoder};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Encode `image` to `path` as `kind`. JPEG drops alpha; PNG keeps the
/// source colour type and uses the strongest compression.
pub fn encode(
    image: &DynamicImage,
    kind: RasterKind,
    path: &Path,
    jpeg_quality: u8,
) -> Result<(), ImageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ImageError::io(parent))?;
    }
    let file = File::create(path).map_err(ImageError::io(path))?;
    let writer = BufWriter::new(file);

    match kind {
        RasterKind::Jpeg => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(writer, jpeg_quality)
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
                .map_err(ImageError::image(path))
        }
        RasterKind::Png => {
            PngEncoder::new_with_quality(writer, CompressionType::Best, PngFilter::Adaptive)
                .write_image(image.as_bytes(), image.width(), image.height(), image.color())
                .map_err(ImageError::image(path))
        }
    }
}

/// Decode an image, trusting its content over its extension.
pub fn decode(path: &Path) -> Result<DynamicImage, ImageError> {
    ImageReader::open(path)
        .map_err(ImageError::io(path))?
        .with_guessed_format()
        .map_err(ImageError::io(path))?
        .decode()
        .map_err(ImageError::image(path))
}

/// Compress one source image into `compressed/<name>`.
pub fn compress_one(options: &ImageOptions, source: &Path) -> Result<PathBuf, ImageError> {
    let name = source.file_name().unwrap_or_default();
    let target = options.compressed_dir.join(name);

    match ImageKind::of(source).and_then(ImageKind::raster) {
        Some(kind) => {
            let image = decode(source)?;
            encode(&image, kind, &target, options.jpeg_quality)?;
        }
        None => {
            fs::create_dir_all(&options.compressed_dir)
                .map_err(ImageError::io(&options.compressed_dir))?;
            fs::copy(source, &target).map_err(ImageError::io(source))?;
        }
    }
    Ok(target)
}

/// Compress every image directly in the images folder.
pub fn compress_all(options: &ImageOptions) -> Result<BuildResult, ImageError> {
    let started = Instant::now();
    let sources = images_in(&options.images_dir, |_| true)?;
    if sources.is_empty() {
        return Err(ImageError::NoImages(options.images_dir.clone()));
    }

    let results = sources
        .par_iter()
        .map(|source| {
            let target_id = format!("compress:{}", source.display());
            let began = Instant::now();
            match compress_one(options, source) {
                Ok(output) => TargetResult::success(target_id, vec![output], began.elapsed()),
                Err(e) => TargetResult::failed(target_id, e.to_string(), began.elapsed()),
            }
        })
        .collect();
    Ok(collect_stage("compress", started, results))
}
