//! Raster image pipeline
//!
//! Stages run in order, each over every image in parallel:
//! - **compress**: re-encode the source images into `compressed/`
//! - **resize**: percentage-width variants in `compressed/size-<p>/`
//! - **webp**: a lossless `.webp` next to every JPEG and PNG
//! - **examples**: `<picture>` markup per image in `exampleFiles/`
//!
//! A stage that fails as a whole stops the pipeline. A single image that
//! fails is recorded as a failed target and the stage carries on.

pub mod compress;
pub mod picture;
pub mod resize;
pub mod webp;

use crate::build::{BuildContext, BuildResult, TargetResult};
use glob::{glob, Pattern};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

/// Errors from the image pipeline
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImageError {
    /// The images folder holds no images
    #[error("No images to compress in {}", .0.display())]
    NoImages(PathBuf),
    /// File I/O error
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Decode or encode failure
    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Invalid glob pattern
    #[error("invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl ImageError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> ImageError + '_ {
        move |source| ImageError::Io { path: path.to_path_buf(), source }
    }

    pub(crate) fn image(path: &Path) -> impl FnOnce(image::ImageError) -> ImageError + '_ {
        move |source| ImageError::Image { path: path.to_path_buf(), source }
    }
}

/// Image formats the pipeline handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    /// Kind from the file extension, ignoring case.
    pub fn of(path: &Path) -> Option<ImageKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }

    /// Encoder for kinds that are re-encoded. GIFs are only copied.
    pub fn raster(self) -> Option<RasterKind> {
        match self {
            ImageKind::Jpeg => Some(RasterKind::Jpeg),
            ImageKind::Png => Some(RasterKind::Png),
            ImageKind::Gif => None,
        }
    }

    /// Whether resize and WebP apply.
    pub fn is_raster(self) -> bool {
        self.raster().is_some()
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            _ => "image/jpeg",
        }
    }
}

/// Formats the pipeline decodes and re-encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterKind {
    Jpeg,
    Png,
}

/// Paths and encoder settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub images_dir: PathBuf,
    pub compressed_dir: PathBuf,
    pub examples_dir: PathBuf,
    /// Markup URLs are relative to this directory
    pub public_root: PathBuf,
    pub jpeg_quality: u8,
    /// Resize percentages
    pub sizes: Vec<u32>,
}

impl ImageOptions {
    pub fn from_context(ctx: &BuildContext) -> Self {
        let images = &ctx.config().images;
        Self {
            images_dir: ctx.images_dir(),
            compressed_dir: ctx.compressed_dir(),
            examples_dir: ctx.examples_dir(),
            public_root: ctx.public_root(),
            jpeg_quality: images.jpeg_quality,
            sizes: images.sizes.clone(),
        }
    }

    /// Folder for one resize percentage.
    pub fn size_dir(&self, percent: u32) -> PathBuf {
        self.compressed_dir.join(format!("size-{}", percent))
    }
}

/// Files directly in `dir` whose kind satisfies `keep`, sorted.
pub(crate) fn images_in(
    dir: &Path,
    keep: impl Fn(ImageKind) -> bool,
) -> Result<Vec<PathBuf>, ImageError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    let mut found: Vec<PathBuf> = glob(&pattern)?
        .filter_map(Result::ok)
        .filter(|path| path.is_file() && ImageKind::of(path).is_some_and(&keep))
        .collect();
    found.sort();
    Ok(found)
}

/// Fold per-image results into a stage result, logging failures.
pub(crate) fn collect_stage(
    stage: &str,
    started: Instant,
    results: Vec<TargetResult>,
) -> BuildResult {
    let mut result = BuildResult::new();
    for target in results {
        if let crate::build::BuildStatus::Failed(message) = &target.status {
            error!("{} failed for {}: {}", stage, target.target_id, message);
        }
        result.add_result(target);
    }
    result.with_duration(started.elapsed())
}

/// Runs the four stages in order.
#[derive(Debug, Clone)]
pub struct ImagePipeline {
    options: ImageOptions,
}

impl ImagePipeline {
    pub fn new(options: ImageOptions) -> Self {
        Self { options }
    }

    pub fn from_context(ctx: &BuildContext) -> Self {
        Self::new(ImageOptions::from_context(ctx))
    }

    /// Compress, resize, convert and write markup. The first stage-level
    /// error is returned and the later stages are not run.
    pub fn run(&self) -> Result<BuildResult, ImageError> {
        let started = Instant::now();
        let mut result = BuildResult::new();

        let compressed = compress::compress_all(&self.options)?;
        info!("Images have been compressed ({})", compressed.summary());
        result.extend(compressed);

        let resized = resize::resize_all(&self.options)?;
        info!("Images have been resized ({})", resized.summary());
        result.extend(resized);

        let converted = webp::convert_all(&self.options)?;
        info!("Images have been turned into WebP ({})", converted.summary());
        result.extend(converted);

        let examples = picture::write_all(&self.options)?;
        info!("Picture examples have been created ({})", examples.summary());
        result.extend(examples);

        Ok(result.with_duration(started.elapsed()))
    }
}
