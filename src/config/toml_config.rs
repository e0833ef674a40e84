use crate::config::DEFAULT_ARCHIVE_NAME;
use crate::core::matcher::MatchConfig;
use crate::core::tracker::TrackerConfig;
use crate::core::{AnalysisSettings, DetectionSource, InputFormat};
use crate::utils::error::{AnalysisError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub analysis: AnalysisMeta,
    pub source: SourceConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub tracking: TrackerConfig,
    #[serde(default)]
    pub matching: MatchConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// "file" or "api"
    pub r#type: String,
    pub path: Option<String>,
    pub endpoint: Option<String>,
    pub format: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<BTreeMap<String, String>>,
    pub max_frames: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub rooftop_confidence: f64,
    pub panel_confidence: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            rooftop_confidence: 0.86,
            panel_confidence: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    #[serde(default = "default_archive_name")]
    pub filename: String,
}

fn default_archive_name() -> String {
    DEFAULT_ARCHIVE_NAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AnalysisError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AnalysisError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_KEY})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        match self.source.r#type.as_str() {
            "file" => {
                let path = validation::validate_required_field("source.path", &self.source.path)?;
                validation::validate_path("source.path", path)?;
                if self.source.format.is_none() {
                    validation::validate_file_extension(
                        "source.path",
                        path,
                        &["json", "jsonl", "ndjson"],
                    )?;
                }
            }
            "api" => {
                let endpoint =
                    validation::validate_required_field("source.endpoint", &self.source.endpoint)?;
                validation::validate_url("source.endpoint", endpoint)?;
            }
            other => {
                return Err(AnalysisError::InvalidConfigValueError {
                    field: "source.type".to_string(),
                    value: other.to_string(),
                    reason: "Expected file or api".to_string(),
                })
            }
        }

        if let Some(format) = &self.source.format {
            if InputFormat::parse(format).is_none() {
                return Err(AnalysisError::InvalidConfigValueError {
                    field: "source.format".to_string(),
                    value: format.clone(),
                    reason: "Expected json or jsonl".to_string(),
                });
            }
        }

        validation::validate_range(
            "detection.rooftop_confidence",
            self.detection.rooftop_confidence,
            0.0,
            1.0,
        )?;
        validation::validate_range(
            "detection.panel_confidence",
            self.detection.panel_confidence,
            0.0,
            1.0,
        )?;

        self.tracking.validate()?;
        validation::validate_range("matching.threshold", self.matching.threshold, 0.0, 1.0)?;

        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_output_formats("load.output_formats", &self.load.output_formats)?;

        if let Some(compression) = &self.load.compression {
            if compression.enabled {
                validation::validate_path("load.compression.filename", &compression.filename)?;
            }
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl AnalysisSettings for TomlConfig {
    fn source(&self) -> DetectionSource {
        match self.source.r#type.as_str() {
            "api" => DetectionSource::Api {
                endpoint: self.source.endpoint.clone().unwrap_or_default(),
                headers: self
                    .source
                    .headers
                    .iter()
                    .flatten()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                timeout_seconds: self.source.timeout_seconds,
            },
            _ => DetectionSource::File {
                path: self.source.path.clone().unwrap_or_default(),
            },
        }
    }

    fn input_format(&self) -> Option<InputFormat> {
        self.source.format.as_deref().and_then(InputFormat::parse)
    }

    fn rooftop_confidence(&self) -> f64 {
        self.detection.rooftop_confidence
    }

    fn panel_confidence(&self) -> f64 {
        self.detection.panel_confidence
    }

    fn tracker_config(&self) -> TrackerConfig {
        self.tracking
    }

    fn match_config(&self) -> MatchConfig {
        self.matching
    }

    fn max_frames(&self) -> Option<usize> {
        self.source.max_frames
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn archive_name(&self) -> Option<&str> {
        self.load
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
