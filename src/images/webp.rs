//! Lossless WebP copies of the compressed and resized images.

use super::compress::decode;
use super::{collect_stage, images_in, ImageError, ImageKind, ImageOptions};
use crate::build::{BuildResult, TargetResult};
use glob::{glob, Pattern};
use image::codecs::webp::WebPEncoder;
use image::{ColorType, ImageEncoder};
use rayon::prelude::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// `<stem>.webp` beside `source`.
pub fn webp_path(source: &Path) -> PathBuf {
    source.with_extension("webp")
}

/// Write the WebP copy of one image.
pub fn convert_one(source: &Path) -> Result<PathBuf, ImageError> {
    let rgba = decode(source)?.to_rgba8();
    let target = webp_path(source);
    let file = File::create(&target).map_err(ImageError::io(&target))?;

    WebPEncoder::new_lossless(BufWriter::new(file))
        .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)
        .map_err(ImageError::image(&target))?;
    Ok(target)
}

/// The compressed folder followed by its `size-*` folders.
fn variant_dirs(options: &ImageOptions) -> Result<Vec<PathBuf>, ImageError> {
    let mut dirs = vec![options.compressed_dir.clone()];
    let pattern = format!("{}/size-*", Pattern::escape(&options.compressed_dir.to_string_lossy()));
    let mut sized: Vec<PathBuf> =
        glob(&pattern)?.filter_map(Result::ok).filter(|p| p.is_dir()).collect();
    sized.sort();
    dirs.extend(sized);
    Ok(dirs)
}

/// Convert every JPEG and PNG in the compressed folder and its size folders.
pub fn convert_all(options: &ImageOptions) -> Result<BuildResult, ImageError> {
    let started = Instant::now();
    let mut sources = Vec::new();
    for dir in variant_dirs(options)? {
        sources.extend(images_in(&dir, ImageKind::is_raster)?);
    }

    let results = sources
        .par_iter()
        .map(|source| {
            let target_id = format!("webp:{}", source.display());
            let began = Instant::now();
            match convert_one(source) {
                Ok(output) => TargetResult::success(target_id, vec![output], began.elapsed()),
                Err(e) => TargetResult::failed(target_id, e.to_string(), began.elapsed()),
            }
        })
        .collect();
    Ok(collect_stage("webp", started, results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_webp_path() {
        assert_eq!(webp_path(Path::new("c/size-5/a.JPG")), PathBuf::from("c/size-5/a.webp"));
    }

    #[test]
    fn test_convert_all_covers_size_folders() {
        let temp = TempDir::new().unwrap();
        let compressed = temp.path().join("compressed");
        fs::create_dir_all(compressed.join("size-50")).unwrap();
        let pixel = Rgba([9, 8, 7, 255]);
        RgbaImage::from_pixel(4, 4, pixel).save(compressed.join("a.png")).unwrap();
        RgbaImage::from_pixel(2, 2, pixel).save(compressed.join("size-50/a.png")).unwrap();

        let options = ImageOptions {
            images_dir: temp.path().to_path_buf(),
            compressed_dir: compressed.clone(),
            examples_dir: temp.path().join("exampleFiles"),
            public_root: temp.path().to_path_buf(),
            jpeg_quality: 80,
            sizes: vec![50],
        };
        let result = convert_all(&options).unwrap();

        assert_eq!(result.success_count(), 2);
        let webp = image::open(compressed.join("a.webp")).unwrap().to_rgba8();
        assert_eq!(webp.dimensions(), (4, 4));
        assert_eq!(*webp.get_pixel(0, 0), pixel);
        assert!(compressed.join("size-50/a.webp").exists());
    }
}
