use thiserror::Error;

#[derive(Error, Debug)]
pub enum CarbonationError {
    #[error("Invalid input for '{field}' ({value}): {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required input field: {field}")]
    MissingField { field: String },

    #[error("Confidence level {level} must lie strictly between 0 and 1")]
    InvalidConfidenceLevel { level: f64 },

    #[error("Confidence level {level} has no entry in the z-score table (known: {known})")]
    OutOfTableConfidenceLevel { level: f64, known: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Batch processing error: {message}")]
    ProcessingError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl CarbonationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. }
            | Self::MissingField { .. }
            | Self::InvalidConfidenceLevel { .. }
            | Self::OutOfTableConfidenceLevel { .. } => ErrorCategory::Input,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ProcessingError { .. } | Self::CsvError(_) | Self::SerializationError(_) => {
                ErrorCategory::Processing
            }
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::InvalidInput { field, .. } => format!(
                "Provide a finite numeric value for '{}' (see --help for its unit and range)",
                field
            ),
            Self::MissingField { field } => format!(
                "Add '{}' to the input, or switch missing_fields to \"default\"",
                field
            ),
            Self::InvalidConfidenceLevel { .. } => {
                "Use a confidence level such as 0.90, 0.95 or 0.99".to_string()
            }
            Self::OutOfTableConfidenceLevel { known, .. } => format!(
                "Use one of the tabulated levels ({}) or set model.unknown_confidence_z = 1.96 in the configuration",
                known
            ),
            Self::ConfigValidationError { field, .. }
            | Self::InvalidConfigValueError { field, .. } => {
                format!("Check the '{}' entry of the configuration file", field)
            }
            Self::MissingConfigError { field } => {
                format!("Add the '{}' entry to the configuration file", field)
            }
            Self::ProcessingError { .. } => {
                "Inspect the offending rows, or set on_invalid_row = \"skip\"".to_string()
            }
            Self::CsvError(_) => {
                "Make sure the input is a comma separated file with a header row".to_string()
            }
            Self::SerializationError(_) => "Check the JSON input for syntax errors".to_string(),
            Self::IoError(_) => "Check that the paths exist and are writable".to_string(),
            Self::ZipError(_) => {
                "Disable compression or check free disk space in the output path".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Input rejected: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Exit code used by the binaries.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl From<toml::de::Error> for CarbonationError {
    fn from(e: toml::de::Error) -> Self {
        CarbonationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, CarbonationError>;
