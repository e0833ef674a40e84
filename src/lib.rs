pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::cli::LocalStorage;

pub use config::toml_config::TomlConfig;
pub use core::{engine::AnalysisEngine, pipeline::AnalysisPipeline};
pub use domain::model::{AdoptionSummary, AnalysisResult, BoundingBox, Detection, FrameDetections};
pub use utils::error::{AnalysisError, Result};
