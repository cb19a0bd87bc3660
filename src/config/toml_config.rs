use crate::core::batch::{BatchOptions, InvalidRowPolicy, OutputFormat, DEFAULT_ZIP_FILENAME};
use crate::core::model_config::{
    BoundaryRule, DepthModel, ModelConfig, PrecisionPolicy, UncertaintyModel,
    UnknownConfidencePolicy,
};
use crate::core::uncertainty::UncertaintyEstimator;
use crate::domain::model::InputPolicy;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{CarbonationError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative, validate_path, validate_positive,
    validate_probability, validate_required_field, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub run: RunConfig,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub input: InputPolicy,
    pub batch: BatchConfig,
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub description: Option<String>,
}

/// A preset plus optional overrides. Full tables replace the preset's.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSection {
    pub preset: Option<String>,
    pub name: Option<String>,
    pub boundary: Option<BoundaryRule>,
    /// z used for confidence levels missing from the table.
    pub unknown_confidence_z: Option<f64>,
    pub lower_bound_floor: Option<f64>,
    pub depth: Option<DepthModel>,
    pub uncertainty: Option<UncertaintyModel>,
    pub precision: Option<PrecisionPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// May also come from the command line.
    pub input: Option<String>,
    pub confidence_level: Option<f64>,
    pub on_invalid_row: Option<InvalidRowPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    pub compression: Option<CompressionConfig>,
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Csv, OutputFormat::Json]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub format: Option<LogFormat>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            CarbonationError::ConfigValidationError {
                field: "environment".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("run.name", &self.run.name)?;
        let input = validate_required_field("batch.input", &self.batch.input)?;
        validate_non_empty_string("batch.input", input)?;
        validate_path("output.path", &self.output.path)?;

        if let Some(level) = self.batch.confidence_level {
            validate_probability("batch.confidence_level", level)?;
        }
        if let Some(z) = self.model.unknown_confidence_z {
            validate_positive("model.unknown_confidence_z", z)?;
        }
        if let Some(floor) = self.model.lower_bound_floor {
            validate_non_negative("model.lower_bound_floor", floor)?;
        }

        if self.output.formats.is_empty() {
            return Err(CarbonationError::InvalidConfigValueError {
                field: "output.formats".to_string(),
                value: "[]".to_string(),
                reason: "At least one of csv, json is required".to_string(),
            });
        }

        if let Some(filename) = self.zip_filename() {
            if !filename.ends_with(".zip") {
                return Err(CarbonationError::InvalidConfigValueError {
                    field: "output.compression.filename".to_string(),
                    value: filename,
                    reason: "Bundle filename must end with .zip".to_string(),
                });
            }
        }

        let model = self.model_config()?;
        model.validate()?;

        // 信賴水準須在 z 表內 (或設定 unknown_confidence_z)
        UncertaintyEstimator::new(&model.uncertainty).z_score(self.confidence_level())?;
        Ok(())
    }

    /// 依 preset 建立模型，再套用覆寫設定
    pub fn resolve_model(&self) -> Result<ModelConfig> {
        let section = &self.model;
        let mut config = ModelConfig::preset(section.preset.as_deref().unwrap_or("realistic"))?;

        if let Some(depth) = &section.depth {
            config.depth = depth.clone();
        }
        if let Some(uncertainty) = &section.uncertainty {
            config.uncertainty = uncertainty.clone();
        }
        if let Some(precision) = &section.precision {
            config.precision = precision.clone();
        }
        if let Some(boundary) = section.boundary {
            config.depth.coefficients.boundary = boundary;
        }
        if let Some(z) = section.unknown_confidence_z {
            config.uncertainty.unknown_confidence = UnknownConfidencePolicy::Fallback { z };
        }
        if let Some(floor) = section.lower_bound_floor {
            config.uncertainty.lower_bound_floor = floor;
        }
        if let Some(name) = &section.name {
            config.name = name.clone();
        }

        Ok(config)
    }

    pub fn zip_filename(&self) -> Option<String> {
        self.output
            .compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| {
                c.filename
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ZIP_FILENAME.to_string())
            })
    }

    pub fn batch_options(&self) -> Result<BatchOptions> {
        Ok(BatchOptions {
            input: validate_required_field("batch.input", &self.batch.input)?.clone(),
            on_invalid_row: self.batch.on_invalid_row.unwrap_or_default(),
            formats: self.output.formats.clone(),
            zip_filename: self.zip_filename(),
        })
    }

    pub fn verbose(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.verbose)
            .unwrap_or(false)
    }

    pub fn log_format(&self) -> LogFormat {
        self.logging
            .as_ref()
            .and_then(|l| l.format)
            .unwrap_or_default()
    }
}

impl ConfigProvider for TomlConfig {
    fn model_config(&self) -> Result<ModelConfig> {
        self.resolve_model()
    }

    fn confidence_level(&self) -> f64 {
        self.batch
            .confidence_level
            .unwrap_or(DEFAULT_CONFIDENCE_LEVEL)
    }

    fn input_policy(&self) -> InputPolicy {
        self.input
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
