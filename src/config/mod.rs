pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

pub const DEFAULT_ARCHIVE_NAME: &str = "solar_analysis.zip";

#[cfg(feature = "cli")]
mod cli_config {
    use super::DEFAULT_ARCHIVE_NAME;
    use crate::core::matcher::{MatchConfig, MatchStrategy};
    use crate::core::tracker::TrackerConfig;
    use crate::core::{AnalysisSettings, DetectionSource, InputFormat};
    use crate::utils::error::{AnalysisError, Result};
    use crate::utils::validation::{self, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "solar-adoption")]
    #[command(about = "Count rooftops with and without solar panels from per-frame detections")]
    pub struct CliConfig {
        /// Detections file (.json or .jsonl)
        #[arg(short, long)]
        pub input: Option<String>,

        /// Fetch detections over HTTP instead of reading a file
        #[arg(long, conflicts_with = "input")]
        pub api_endpoint: Option<String>,

        /// Force the input format: json or jsonl
        #[arg(long)]
        pub input_format: Option<String>,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        #[arg(long, default_value = "0.86")]
        pub rooftop_confidence: f64,

        #[arg(long, default_value = "0.25")]
        pub panel_confidence: f64,

        /// iou or coverage
        #[arg(long, default_value = "iou")]
        pub match_strategy: String,

        #[arg(long, default_value = "0.05")]
        pub match_threshold: f64,

        #[arg(long, default_value = "30")]
        pub lost_track_buffer: u32,

        #[arg(long, default_value = "30")]
        pub frame_rate: u32,

        #[arg(long, default_value = "1")]
        pub min_consecutive_frames: u32,

        #[arg(long, value_delimiter = ',', default_value = "csv,json")]
        pub formats: Vec<String>,

        /// Bundle all reports into a single ZIP archive
        #[arg(long)]
        pub zip: bool,

        #[arg(long)]
        pub max_frames: Option<usize>,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log process CPU and memory usage per phase")]
        pub monitor: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub log_json: bool,
    }

    impl CliConfig {
        /// Settings with every default applied, reading detections from `input`.
        pub fn for_input(input: impl Into<String>, output_path: impl Into<String>) -> Self {
            Self {
                input: Some(input.into()),
                api_endpoint: None,
                input_format: None,
                output_path: output_path.into(),
                rooftop_confidence: 0.86,
                panel_confidence: 0.25,
                match_strategy: "iou".to_string(),
                match_threshold: 0.05,
                lost_track_buffer: 30,
                frame_rate: 30,
                min_consecutive_frames: 1,
                formats: vec!["csv".to_string(), "json".to_string()],
                zip: false,
                max_frames: None,
                verbose: false,
                monitor: false,
                log_json: false,
            }
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            match (&self.input, &self.api_endpoint) {
                (Some(path), None) => {
                    validation::validate_path("input", path)?;
                    if self.input_format.is_none() {
                        validation::validate_file_extension("input", path, &["json", "jsonl", "ndjson"])?;
                    }
                }
                (None, Some(endpoint)) => validation::validate_url("api_endpoint", endpoint)?,
                (None, None) => {
                    return Err(AnalysisError::MissingConfigError {
                        field: "input".to_string(),
                    })
                }
                (Some(_), Some(_)) => {
                    return Err(AnalysisError::ConfigError {
                        message: "use either --input or --api-endpoint, not both".to_string(),
                    })
                }
            }

            if let Some(format) = &self.input_format {
                if InputFormat::parse(format).is_none() {
                    return Err(AnalysisError::InvalidConfigValueError {
                        field: "input_format".to_string(),
                        value: format.clone(),
                        reason: "Expected json or jsonl".to_string(),
                    });
                }
            }

            if MatchStrategy::parse(&self.match_strategy).is_none() {
                return Err(AnalysisError::InvalidConfigValueError {
                    field: "match_strategy".to_string(),
                    value: self.match_strategy.clone(),
                    reason: "Expected iou or coverage".to_string(),
                });
            }

            validation::validate_path("output_path", &self.output_path)?;
            validation::validate_range("rooftop_confidence", self.rooftop_confidence, 0.0, 1.0)?;
            validation::validate_range("panel_confidence", self.panel_confidence, 0.0, 1.0)?;
            validation::validate_range("match_threshold", self.match_threshold, 0.0, 1.0)?;
            validation::validate_positive_number("frame_rate", self.frame_rate as usize, 1)?;
            validation::validate_positive_number(
                "min_consecutive_frames",
                self.min_consecutive_frames as usize,
                1,
            )?;
            validation::validate_output_formats("formats", &self.formats)?;
            self.tracker_config().validate()?;
            Ok(())
        }
    }

    impl AnalysisSettings for CliConfig {
        fn source(&self) -> DetectionSource {
            match &self.api_endpoint {
                Some(endpoint) => DetectionSource::Api {
                    endpoint: endpoint.clone(),
                    headers: Vec::new(),
                    timeout_seconds: None,
                },
                None => DetectionSource::File {
                    path: self.input.clone().unwrap_or_default(),
                },
            }
        }

        fn input_format(&self) -> Option<InputFormat> {
            self.input_format.as_deref().and_then(InputFormat::parse)
        }

        fn rooftop_confidence(&self) -> f64 {
            self.rooftop_confidence
        }

        fn panel_confidence(&self) -> f64 {
            self.panel_confidence
        }

        fn tracker_config(&self) -> TrackerConfig {
            TrackerConfig {
                lost_track_buffer: self.lost_track_buffer,
                frame_rate: self.frame_rate,
                minimum_consecutive_frames: self.min_consecutive_frames,
                ..TrackerConfig::default()
            }
        }

        fn match_config(&self) -> MatchConfig {
            MatchConfig {
                strategy: MatchStrategy::parse(&self.match_strategy).unwrap_or_default(),
                threshold: self.match_threshold,
            }
        }

        fn max_frames(&self) -> Option<usize> {
            self.max_frames
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn output_formats(&self) -> &[String] {
            &self.formats
        }

        fn archive_name(&self) -> Option<&str> {
            self.zip.then_some(DEFAULT_ARCHIVE_NAME)
        }
    }

}
