pub mod analyzer;
pub mod counter;
pub mod engine;
pub mod geometry;
pub mod input;
pub mod matcher;
pub mod pipeline;
pub mod tracker;

pub use crate::domain::model::{AnalysisResult, FrameDetections};
pub use crate::domain::ports::{AnalysisSettings, DetectionSource, InputFormat, Pipeline, Storage};
pub use crate::utils::error::Result;
