//! assetflow - stylesheet import injection and responsive image pipeline
//!
//! This library provides functionality to:
//! - Keep the import regions of a LESS aggregate in sync with its fragments
//! - Compile, prefix and minify every stylesheet with source maps
//! - Watch the stylesheet folder and serialize reconciliation through a queue
//! - Compress, resize and convert images and write `<picture>` examples

pub mod build;
pub mod cli;
pub mod config;
pub mod images;
pub mod logging;
pub mod queue;
pub mod styles;
pub mod watch;
