use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid detection input (frame {frame}): {message}")]
    InputError { frame: u64, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Io,
    Configuration,
    Input,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnalysisError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalysisError::ApiError(_) => ErrorCategory::Network,
            AnalysisError::IoError(_) | AnalysisError::ZipError(_) => ErrorCategory::Io,
            AnalysisError::ConfigError { .. }
            | AnalysisError::ConfigValidationError { .. }
            | AnalysisError::InvalidConfigValueError { .. }
            | AnalysisError::MissingConfigError { .. } => ErrorCategory::Configuration,
            AnalysisError::InputError { .. } | AnalysisError::SerializationError(_) => {
                ErrorCategory::Input
            }
            AnalysisError::CsvError(_) | AnalysisError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check the detection endpoint is reachable and retry",
            ErrorCategory::Io => "Check the input file exists and the output directory is writable",
            ErrorCategory::Configuration => "Fix the reported configuration value and run again",
            ErrorCategory::Input => {
                "Check the detections file: every frame needs a frame_index and every box [x1, y1, x2, y2] with x2 >= x1 and y2 >= y1"
            }
            ErrorCategory::Processing => "Re-run with --verbose to see which frame failed",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AnalysisError::ApiError(e) => format!("Could not fetch detections: {}", e),
            AnalysisError::IoError(e) => format!("File access failed: {}", e),
            AnalysisError::SerializationError(e) => format!("Detections are not valid JSON: {}", e),
            AnalysisError::InputError { frame, message } => {
                format!("Frame {} has invalid detections: {}", frame, message)
            }
            AnalysisError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            AnalysisError::MissingConfigError { field } => {
                format!("Missing setting '{}'", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = AnalysisError::InputError {
            frame: 3,
            message: "bad box".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("Frame 3"));

        let io = AnalysisError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert_eq!(io.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_config_errors_share_category() {
        let err = AnalysisError::MissingConfigError {
            field: "source.path".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.user_friendly_message(), "Missing setting 'source.path'");
    }
}
