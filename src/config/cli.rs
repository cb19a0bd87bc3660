use crate::config::toml_config::TomlConfig;
use crate::core::model_config::{ModelConfig, PRESET_NAMES};
use crate::core::sweep::SweepRange;
use crate::core::uncertainty::UncertaintyEstimator;
use crate::domain::model::{InputPolicy, MissingFieldPolicy, MixDesign, MixField, RangePolicy};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{CarbonationError, Result};
use crate::utils::validation::{validate_finite, validate_path, validate_probability, Validate};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "rac-carbonation")]
#[command(
    about = "Carbonation depth of recycled aggregate concrete with a confidence interval"
)]
pub struct CliConfig {
    /// Cement, kg/m³
    #[arg(long, default_value_t = 350.0)]
    pub cement: f64,

    /// Fly ash, kg/m³
    #[arg(long, default_value_t = 50.0)]
    pub fly_ash: f64,

    /// Water, kg/m³
    #[arg(long, default_value_t = 180.0)]
    pub water: f64,

    /// Natural coarse aggregate, kg/m³
    #[arg(long, default_value_t = 600.0)]
    pub coarse_agg: f64,

    /// Recycled coarse aggregate, kg/m³
    #[arg(long, default_value_t = 400.0)]
    pub recycled_agg: f64,

    /// Recycled aggregate water absorption, %
    #[arg(long, default_value_t = 4.5)]
    pub water_absorption: f64,

    /// Fine aggregate, kg/m³
    #[arg(long, default_value_t = 700.0)]
    pub fine_agg: f64,

    /// Superplasticizer, kg/m³
    #[arg(long, default_value_t = 2.0)]
    pub superplasticizer: f64,

    /// 28-day compressive strength, MPa
    #[arg(long, default_value_t = 35.0)]
    pub compressive_strength: f64,

    /// CO₂ concentration, %
    #[arg(long, default_value_t = 10.0)]
    pub carbon_concentration: f64,

    /// Exposure time, days
    #[arg(long, default_value_t = 365.0)]
    pub exposure_time: f64,

    /// Ambient temperature, °C
    #[arg(long, default_value_t = 20.0)]
    pub temperature: f64,

    /// Relative humidity, %
    #[arg(long, default_value_t = 65.0)]
    pub relative_humidity: f64,

    /// Confidence level of the interval (0.90, 0.95 or 0.99 by default)
    #[arg(long, default_value_t = 0.95)]
    pub confidence: f64,

    /// Model preset: realistic, field_calibrated or high_performance
    #[arg(long, default_value = "realistic")]
    pub preset: String,

    /// Take the model from the [model] section of a TOML run configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Vary one field, e.g. recycled_agg=0:1280:9
    #[arg(long, value_name = "FIELD=START:END:STEPS")]
    pub sweep: Option<String>,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Reject inputs outside the documented ranges instead of warning
    #[arg(long)]
    pub strict: bool,

    /// Also write the JSON report to <output-path>/prediction.json
    #[arg(long)]
    pub save: bool,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    pub fn mix_design(&self) -> MixDesign {
        MixDesign {
            cement: self.cement,
            fly_ash: self.fly_ash,
            water: self.water,
            coarse_agg: self.coarse_agg,
            recycled_agg: self.recycled_agg,
            water_absorption: self.water_absorption,
            fine_agg: self.fine_agg,
            superplasticizer: self.superplasticizer,
            compressive_strength: self.compressive_strength,
            carbon_concentration: self.carbon_concentration,
            exposure_time: self.exposure_time,
            temperature: self.temperature,
            relative_humidity: self.relative_humidity,
        }
    }

    pub fn sweep_request(&self) -> Result<Option<(MixField, SweepRange)>> {
        let Some(request) = &self.sweep else {
            return Ok(None);
        };
        let (field, range) =
            request.split_once('=')
                .ok_or_else(|| CarbonationError::InvalidConfigValueError {
                    field: "sweep".to_string(),
                    value: request.clone(),
                    reason: "Expected FIELD=START:END:STEPS".to_string(),
                })?;
        Ok(Some((field.parse()?, range.parse()?)))
    }
}

impl ConfigProvider for CliConfig {
    fn model_config(&self) -> Result<ModelConfig> {
        match &self.config {
            Some(path) => TomlConfig::from_file(path)?.resolve_model(),
            None => ModelConfig::preset(&self.preset),
        }
    }

    fn confidence_level(&self) -> f64 {
        self.confidence
    }

    fn input_policy(&self) -> InputPolicy {
        InputPolicy {
            missing_fields: MissingFieldPolicy::UseDefault,
            range_check: if self.strict {
                RangePolicy::Reject
            } else {
                RangePolicy::Warn
            },
        }
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        for field in MixField::ALL {
            validate_finite(field.name(), self.mix_design().get(field))?;
        }
        validate_probability("confidence", self.confidence)?;
        validate_path("output_path", &self.output_path)?;

        let preset = self.preset.trim().to_ascii_lowercase().replace('-', "_");
        if self.config.is_none() && !PRESET_NAMES.contains(&preset.as_str()) {
            return Err(CarbonationError::InvalidConfigValueError {
                field: "preset".to_string(),
                value: self.preset.clone(),
                reason: format!("Valid presets: {}", PRESET_NAMES.join(", ")),
            });
        }

        let model = self.model_config()?;
        UncertaintyEstimator::new(&model.uncertainty).z_score(self.confidence)?;

        self.sweep_request()?;
        Ok(())
    }
}
