//! Build orchestration for assetflow
//!
//! - **Context**: resolved configuration and project paths
//! - **Results**: per-target outcomes and build summaries
//! - **Pipeline**: the one-shot `default` task over styles and images
//!
//! # Example
//!
//! ```ignore
//! use assetflow::build::{AssetPipeline, BuildContext};
//! use assetflow::config::load_config;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root);
//! let report = AssetPipeline::from_context(&context).run();
//! ```

pub mod context;
pub mod pipeline;
pub mod result;

pub use context::*;
pub use pipeline::*;
pub use result::*;
