use crate::core::matcher::MatchConfig;
use crate::core::tracker::TrackerConfig;
use crate::domain::model::{AnalysisResult, FrameDetections};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    JsonLines,
}

impl InputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(InputFormat::Json),
            "jsonl" | "ndjson" => Some(InputFormat::JsonLines),
            _ => None,
        }
    }

    /// Infers the format from a file name, defaulting to plain JSON.
    pub fn from_path(path: &str) -> Self {
        match std::path::Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(ext) => Self::parse(ext).unwrap_or(InputFormat::Json),
            None => InputFormat::Json,
        }
    }
}

/// Where per-frame detections come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionSource {
    File {
        path: String,
    },
    Api {
        endpoint: String,
        headers: Vec<(String, String)>,
        timeout_seconds: Option<u64>,
    },
}

pub trait AnalysisSettings: Send + Sync {
    fn source(&self) -> DetectionSource;
    fn input_format(&self) -> Option<InputFormat>;
    fn rooftop_confidence(&self) -> f64;
    fn panel_confidence(&self) -> f64;
    fn tracker_config(&self) -> TrackerConfig;
    fn match_config(&self) -> MatchConfig;
    fn max_frames(&self) -> Option<usize>;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    /// ZIP archive name when outputs are bundled.
    fn archive_name(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<FrameDetections>>;
    async fn transform(&self, frames: Vec<FrameDetections>) -> Result<AnalysisResult>;
    async fn load(&self, result: AnalysisResult) -> Result<String>;
}
