//! Image pipeline integration tests
//!
//! Runs the four stages on generated images inside a temporary project.

use std::fs;
use tempfile::TempDir;

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use assetflow::build::BuildContext;
use assetflow::config::default_config;
use assetflow::images::{ImageError, ImagePipeline};

fn create_test_context(sizes: Vec<u32>) -> (TempDir, BuildContext) {
    let temp = TempDir::new().unwrap();
    let mut config = default_config();
    config.images.sizes = sizes;
    let ctx = BuildContext::new(config, temp.path().to_path_buf());
    fs::create_dir_all(ctx.images_dir()).unwrap();
    (temp, ctx)
}

#[test]
fn test_pipeline_produces_every_variant() {
    let (_temp, ctx) = create_test_context(vec![25, 50]);
    RgbaImage::from_pixel(80, 40, Rgba([20, 40, 60, 255]))
        .save(ctx.images_dir().join("hero.png"))
        .unwrap();
    RgbImage::from_pixel(60, 30, Rgb([200, 150, 100]))
        .save(ctx.images_dir().join("team.jpg"))
        .unwrap();

    let result = ImagePipeline::from_context(&ctx).run().unwrap();
    assert!(result.is_success(), "{}", result.summary());

    let compressed = ctx.compressed_dir();
    for name in ["hero.png", "hero.webp", "team.jpg", "team.webp"] {
        assert!(compressed.join(name).exists(), "missing {}", name);
        assert!(compressed.join("size-25").join(name).exists(), "missing size-25/{}", name);
        assert!(compressed.join("size-50").join(name).exists(), "missing size-50/{}", name);
    }
    assert_eq!(image::image_dimensions(compressed.join("size-25/hero.png")).unwrap(), (20, 10));
    assert_eq!(image::image_dimensions(compressed.join("size-50/team.jpg")).unwrap(), (30, 15));

    let markup = fs::read_to_string(ctx.examples_dir().join("hero.html")).unwrap();
    let hero_sources: Vec<&str> =
        markup.lines().filter(|line| line.contains("<source")).collect();
    assert_eq!(hero_sources.len(), 6);
    assert!(hero_sources[0].contains("(min-width: 80px)"));
    assert!(hero_sources[0].contains("srcset=\"./assets/images/compressed/hero.webp\""));
    assert!(hero_sources[2].contains("size-50/hero.webp"));
    assert!(hero_sources[5].contains("(min-width: 20px)"));
    assert!(markup.contains("<img src=\"./assets/images/compressed/hero.png\""));
    assert!(ctx.examples_dir().join("team.html").exists());
}

#[test]
fn test_gif_is_copied_without_variants() {
    let (_temp, ctx) = create_test_context(vec![50]);
    let source = ctx.images_dir().join("spinner.gif");
    RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]))
        .save_with_format(&source, image::ImageFormat::Gif)
        .unwrap();

    let result = ImagePipeline::from_context(&ctx).run().unwrap();

    assert!(result.is_success());
    let copy = ctx.compressed_dir().join("spinner.gif");
    assert_eq!(fs::read(&copy).unwrap(), fs::read(&source).unwrap());
    assert!(!ctx.compressed_dir().join("size-50/spinner.gif").exists());
    assert!(!ctx.compressed_dir().join("spinner.webp").exists());
    assert!(!ctx.examples_dir().join("spinner.html").exists());
}

#[test]
fn test_empty_images_folder_stops_pipeline() {
    let (_temp, ctx) = create_test_context(vec![50]);

    let err = ImagePipeline::from_context(&ctx).run().unwrap_err();

    assert!(matches!(err, ImageError::NoImages(_)));
    assert!(!ctx.compressed_dir().exists());
    assert!(!ctx.examples_dir().exists());
}
