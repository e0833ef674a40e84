use crate::core::analyzer::{AnalyzerConfig, FrameAnalyzer};
use crate::core::input::parse_frames;
use crate::core::{AnalysisSettings, DetectionSource, InputFormat, Pipeline, Storage};
use crate::domain::model::{AnalysisResult, FrameDetections, RooftopRecord};
use crate::utils::error::{AnalysisError, Result};
use reqwest::Client;
use serde::Serialize;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const FRAMES_BASENAME: &str = "frames";
pub const ROOFTOPS_BASENAME: &str = "rooftops";
pub const SUMMARY_FILENAME: &str = "summary.json";

const FRAME_COLUMNS: [&str; 7] = [
    "frame_index",
    "rooftops_in_frame",
    "solar_rooftops_in_frame",
    "panels_tracked",
    "total_rooftops",
    "total_with_solar",
    "total_without_solar",
];

const ROOFTOP_COLUMNS: [&str; 7] = [
    "tracker_id",
    "first_frame",
    "last_frame",
    "frames_observed",
    "solar_frames",
    "first_solar_frame",
    "has_solar",
];

#[derive(Debug, Serialize)]
struct FrameRow {
    frame_index: u64,
    rooftops_in_frame: usize,
    solar_rooftops_in_frame: usize,
    panels_tracked: usize,
    total_rooftops: usize,
    total_with_solar: usize,
    total_without_solar: usize,
}

#[derive(Debug, Serialize)]
struct SummaryDocument<'a> {
    generated_at: String,
    frames_processed: usize,
    total_rooftops: usize,
    with_solar: usize,
    without_solar: usize,
    adoption_rate: Option<f64>,
    rooftops: &'a [RooftopRecord],
}

/// Detections → tracking/matching/counting → report files.
pub struct AnalysisPipeline<S: Storage, C: AnalysisSettings> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: AnalysisSettings> AnalysisPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            client: Client::new(),
        }
    }

    async fn fetch(
        &self,
        endpoint: &str,
        headers: &[(String, String)],
        timeout_seconds: Option<u64>,
    ) -> Result<Vec<u8>> {
        let mut request = self.client.get(endpoint);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        if let Some(timeout) = timeout_seconds {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }

        tracing::debug!("Requesting detections from: {}", endpoint);
        let response = request.send().await?;
        tracing::debug!("API response status: {}", response.status());

        let response = response.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Renders every requested output as `(file name, bytes)`.
    fn render_outputs(&self, result: &AnalysisResult) -> Result<Vec<(String, Vec<u8>)>> {
        let mut outputs = Vec::new();

        for format in self.config.output_formats() {
            match format.as_str() {
                "csv" => {
                    outputs.push((
                        format!("{}.csv", FRAMES_BASENAME),
                        write_frame_rows(result, b',')?,
                    ));
                    outputs.push((
                        format!("{}.csv", ROOFTOPS_BASENAME),
                        write_rooftop_rows(result, b',')?,
                    ));
                }
                "tsv" => {
                    outputs.push((
                        format!("{}.tsv", FRAMES_BASENAME),
                        write_frame_rows(result, b'\t')?,
                    ));
                    outputs.push((
                        format!("{}.tsv", ROOFTOPS_BASENAME),
                        write_rooftop_rows(result, b'\t')?,
                    ));
                }
                "json" => {
                    let document = SummaryDocument {
                        generated_at: chrono::Utc::now().to_rfc3339(),
                        frames_processed: result.frames.len(),
                        total_rooftops: result.summary.total_rooftops,
                        with_solar: result.summary.with_solar,
                        without_solar: result.summary.without_solar,
                        adoption_rate: result.summary.adoption_rate,
                        rooftops: &result.rooftops,
                    };
                    outputs.push((
                        SUMMARY_FILENAME.to_string(),
                        serde_json::to_vec_pretty(&document)?,
                    ));
                }
                other => {
                    return Err(AnalysisError::InvalidConfigValueError {
                        field: "output_formats".to_string(),
                        value: other.to_string(),
                        reason: "Unsupported format. Valid formats: csv, tsv, json".to_string(),
                    })
                }
            }
        }

        Ok(outputs)
    }
}

fn write_frame_rows(result: &AnalysisResult, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    // serialize() only emits headers with the first row
    if result.frames.is_empty() {
        writer.write_record(FRAME_COLUMNS)?;
    }
    for frame in &result.frames {
        writer.serialize(FrameRow {
            frame_index: frame.frame_index,
            rooftops_in_frame: frame.rooftops.len(),
            solar_rooftops_in_frame: frame.solar_rooftops(),
            panels_tracked: frame.panels_tracked,
            total_rooftops: frame.summary.total_rooftops,
            total_with_solar: frame.summary.with_solar,
            total_without_solar: frame.summary.without_solar,
        })?;
    }
    into_bytes(writer)
}

fn write_rooftop_rows(result: &AnalysisResult, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    if result.rooftops.is_empty() {
        writer.write_record(ROOFTOP_COLUMNS)?;
    }
    for record in &result.rooftops {
        writer.serialize(record)?;
    }
    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| AnalysisError::ProcessingError {
            message: format!("failed to flush report: {}", e),
        })
}

#[async_trait::async_trait]
impl<S: Storage, C: AnalysisSettings> Pipeline for AnalysisPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<FrameDetections>> {
        let source = self.config.source();
        let (data, format) = match &source {
            DetectionSource::File { path } => {
                tracing::info!("📂 Reading detections from file: {}", path);
                let format = self
                    .config
                    .input_format()
                    .unwrap_or_else(|| InputFormat::from_path(path));
                (self.storage.read_file(path).await?, format)
            }
            DetectionSource::Api {
                endpoint,
                headers,
                timeout_seconds,
            } => {
                tracing::info!("📡 Fetching detections from: {}", endpoint);
                let format = self.config.input_format().unwrap_or(InputFormat::Json);
                (self.fetch(endpoint, headers, *timeout_seconds).await?, format)
            }
        };

        let mut frames = parse_frames(&data, format)?;
        if let Some(max) = self.config.max_frames() {
            if frames.len() > max {
                tracing::info!("Limiting analysis to the first {} of {} frames", max, frames.len());
                frames.truncate(max);
            }
        }

        if frames.is_empty() {
            tracing::warn!("No frames found in detection input");
        }
        Ok(frames)
    }

    async fn transform(&self, frames: Vec<FrameDetections>) -> Result<AnalysisResult> {
        let mut analyzer = FrameAnalyzer::new(AnalyzerConfig {
            rooftop_confidence: self.config.rooftop_confidence(),
            panel_confidence: self.config.panel_confidence(),
            tracker: self.config.tracker_config(),
            matching: self.config.match_config(),
        });

        for frame in &frames {
            analyzer.process(frame);
        }

        let result = analyzer.finish();
        tracing::info!(
            "🏠 {} unique rooftops, {} with solar, {} without",
            result.summary.total_rooftops,
            result.summary.with_solar,
            result.summary.without_solar
        );
        Ok(result)
    }

    async fn load(&self, result: AnalysisResult) -> Result<String> {
        let outputs = self.render_outputs(&result)?;

        if let Some(archive_name) = self.config.archive_name() {
            tracing::debug!("Creating ZIP file with {} files", outputs.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, data) in &outputs {
                    zip.start_file(name.as_str(), SimpleFileOptions::default())?;
                    zip.write_all(data)?;
                }
                zip.finish()?.into_inner()
            };

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(archive_name, &zip_data).await?;
            return Ok(format!("{}/{}", self.config.output_path(), archive_name));
        }

        for (name, data) in &outputs {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(name, data).await?;
        }
        Ok(self.config.output_path().to_string())
    }
}
