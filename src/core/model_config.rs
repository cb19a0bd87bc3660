//! Coefficient tables and policies for the carbonation model.
//!
//! Every number the estimators use lives here, so that the calibration
//! variants differ only in data. Three presets ship with the crate:
//! `realistic` (the default), `field_calibrated` and `high_performance`.

use crate::domain::model::PrecisionLabel;
use crate::utils::error::{CarbonationError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_non_negative, validate_positive, validate_probability,
    validate_range, validate_strictly_increasing, Validate,
};
use serde::{Deserialize, Serialize};

/// Reference temperature of the temperature correction, °C.
pub const REFERENCE_TEMPERATURE_C: f64 = 20.0;
pub const DAYS_PER_YEAR: f64 = 365.25;

pub const PRESET_NAMES: [&str; 3] = ["realistic", "field_calibrated", "high_performance"];

/// Which side of a band boundary a ratio exactly on the boundary falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRule {
    /// `ratio <= upper` belongs to the band (w/b of exactly 0.40 takes the 0.40 band).
    #[default]
    Inclusive,
    /// `ratio < upper` belongs to the band (w/b of exactly 0.40 takes the next band).
    Exclusive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientBand {
    pub upper: f64,
    /// mm/√year
    pub k: f64,
}

/// Base carbonation coefficient keyed by water/binder ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTable {
    pub bands: Vec<CoefficientBand>,
    pub above: f64,
    #[serde(default)]
    pub boundary: BoundaryRule,
}

impl CoefficientTable {
    pub fn lookup(&self, water_binder: f64) -> f64 {
        self.bands
            .iter()
            .find(|band| match self.boundary {
                BoundaryRule::Inclusive => water_binder <= band.upper,
                BoundaryRule::Exclusive => water_binder < band.upper,
            })
            .map(|band| band.k)
            .unwrap_or(self.above)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecycledSegment {
    pub from: f64,
    pub slope: f64,
}

/// Continuous piecewise-linear increase with replacement ratio, 1.0 at zero.
/// A single segment starting at 0 is the plain linear law.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecycledFactor {
    pub segments: Vec<RecycledSegment>,
}

impl RecycledFactor {
    pub fn linear(slope: f64) -> Self {
        Self {
            segments: vec![RecycledSegment { from: 0.0, slope }],
        }
    }

    pub fn factor(&self, replacement: f64) -> f64 {
        let mut value = 1.0;
        for (i, segment) in self.segments.iter().enumerate() {
            if replacement <= segment.from {
                break;
            }
            let end = self
                .segments
                .get(i + 1)
                .map(|next| next.from)
                .unwrap_or(f64::INFINITY);
            value += segment.slope * (replacement.min(end) - segment.from);
        }
        value
    }
}

/// `(reference / strength)^exponent`; `fallback` when strength is not positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthFactor {
    pub reference: f64,
    pub exponent: f64,
    pub fallback: f64,
}

impl StrengthFactor {
    pub fn factor(&self, strength: f64) -> f64 {
        if strength > 0.0 {
            (self.reference / strength).powf(self.exponent)
        } else {
            self.fallback
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlyAshFactor {
    pub slope: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<f64>,
}

impl FlyAshFactor {
    pub fn factor(&self, fly_ash_fraction: f64) -> f64 {
        let value = 1.0 - self.slope * fly_ash_fraction;
        value.max(self.floor.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemperatureModel {
    /// `1 + per_degree · (T − 20)`, never below zero.
    Linear { per_degree: f64 },
    /// `exp(rate · (T − 20))`
    Exponential { rate: f64 },
}

impl TemperatureModel {
    pub fn factor(&self, temperature: f64) -> f64 {
        let deviation = temperature - REFERENCE_TEMPERATURE_C;
        match self {
            TemperatureModel::Linear { per_degree } => (1.0 + per_degree * deviation).max(0.0),
            TemperatureModel::Exponential { rate } => (rate * deviation).exp(),
        }
    }
}

/// Plateau of 1.0 inside `[plateau_low, plateau_high]`, a growing penalty on
/// the dry side, a constant on the humid side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumidityFactor {
    pub plateau_low: f64,
    pub plateau_high: f64,
    pub dry_base: f64,
    pub dry_slope: f64,
    pub humid: f64,
}

impl HumidityFactor {
    pub fn factor(&self, relative_humidity: f64) -> f64 {
        if relative_humidity < self.plateau_low {
            self.dry_base + (self.plateau_low - relative_humidity) * self.dry_slope
        } else if relative_humidity <= self.plateau_high {
            1.0
        } else {
            self.humid
        }
    }
}

/// How concentrations above the accelerated-test threshold are handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Co2Policy {
    /// `sqrt(c / atmospheric)` for every concentration.
    Direct,
    /// Square-root scaling, multiplied by `factor` above the threshold.
    Damped { factor: f64 },
    /// `c / divisor` above the threshold, 1.0 otherwise.
    Linear { divisor: f64 },
    /// Concentration does not enter the model.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Co2Model {
    /// Atmospheric concentration, %.
    pub atmospheric: f64,
    /// Concentrations above this (in %) count as accelerated test conditions.
    pub accelerated_threshold: f64,
    pub policy: Co2Policy,
}

impl Co2Model {
    pub fn is_accelerated(&self, concentration: f64) -> bool {
        concentration > self.accelerated_threshold
    }

    pub fn factor(&self, concentration: f64) -> f64 {
        let c = concentration.max(0.0);
        let scaled = (c / self.atmospheric).sqrt();
        match &self.policy {
            Co2Policy::Direct => scaled,
            Co2Policy::Damped { factor } if self.is_accelerated(c) => scaled * factor,
            Co2Policy::Damped { .. } => scaled,
            Co2Policy::Linear { divisor } if self.is_accelerated(c) => c / divisor,
            Co2Policy::Linear { .. } | Co2Policy::Ignore => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthModel {
    pub coefficients: CoefficientTable,
    pub recycled: RecycledFactor,
    pub strength: StrengthFactor,
    pub fly_ash: FlyAshFactor,
    pub temperature: TemperatureModel,
    pub humidity: HumidityFactor,
    pub co2: Co2Model,
}

/// Mix-quality bucket; a mix belongs to the first tier whose w/b is at most
/// `max_water_binder` and whose fly-ash fraction is at least `min_fly_ash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTier {
    pub name: String,
    pub max_water_binder: f64,
    #[serde(default)]
    pub min_fly_ash: f64,
    pub cv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackTier {
    pub name: String,
    pub cv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecycledCv {
    Proportional { slope: f64 },
    Threshold { above: f64, cv: f64 },
}

impl RecycledCv {
    pub fn contribution(&self, replacement: f64) -> f64 {
        match self {
            RecycledCv::Proportional { slope } => replacement.max(0.0) * slope,
            RecycledCv::Threshold { above, cv } if replacement > *above => *cv,
            RecycledCv::Threshold { .. } => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentCv {
    Proportional {
        per_degree: f64,
        per_percent: f64,
    },
    Threshold {
        temperature_deviation: f64,
        humidity_deviation: f64,
        cv: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureCv {
    pub long_after_years: f64,
    pub long_cv: f64,
    pub short_cv: f64,
}

impl ExposureCv {
    pub fn contribution(&self, years: f64) -> f64 {
        if years > self.long_after_years {
            self.long_cv
        } else {
            self.short_cv
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScore {
    pub confidence: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnknownConfidencePolicy {
    /// Fail with `OutOfTableConfidenceLevel`.
    #[default]
    Reject,
    /// Use `z` and log a warning.
    Fallback { z: f64 },
}

/// How the recycled, environmental and exposure terms join the base CV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraCvCombination {
    /// `√(base² + recycled² + environment² + exposure²)`
    #[default]
    Independent,
    /// `√(base² + (recycled + environment + exposure)²)`
    Summed,
}

impl ExtraCvCombination {
    pub fn combine(self, base: f64, extras: [f64; 3]) -> f64 {
        match self {
            ExtraCvCombination::Independent => {
                (base.powi(2) + extras.iter().map(|cv| cv.powi(2)).sum::<f64>()).sqrt()
            }
            ExtraCvCombination::Summed => {
                (base.powi(2) + extras.iter().sum::<f64>().powi(2)).sqrt()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyModel {
    pub tiers: Vec<QualityTier>,
    pub fallback_tier: FallbackTier,
    pub recycled: RecycledCv,
    pub environment: EnvironmentCv,
    pub exposure: ExposureCv,
    #[serde(default)]
    pub combine_extras: ExtraCvCombination,
    pub nominal_temperature: f64,
    pub nominal_humidity: f64,
    pub z_table: Vec<ZScore>,
    #[serde(default)]
    pub unknown_confidence: UnknownConfidencePolicy,
    #[serde(default)]
    pub lower_bound_floor: f64,
}

impl EnvironmentCv {
    pub fn contribution(&self, temperature_deviation: f64, humidity_deviation: f64) -> f64 {
        match self {
            EnvironmentCv::Proportional {
                per_degree,
                per_percent,
            } => temperature_deviation * per_degree + humidity_deviation * per_percent,
            EnvironmentCv::Threshold {
                temperature_deviation: max_temperature,
                humidity_deviation: max_humidity,
                cv,
            } => {
                if temperature_deviation > *max_temperature || humidity_deviation > *max_humidity {
                    *cv
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionGrade {
    pub label: PrecisionLabel,
    /// Relative uncertainty (%) strictly below which this grade applies.
    pub below_pct: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionFallback {
    pub label: PrecisionLabel,
    pub recommendation: String,
}

/// Relative-uncertainty cutoffs for the qualitative precision label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionPolicy {
    pub grades: Vec<PrecisionGrade>,
    pub fallback: PrecisionFallback,
}

impl PrecisionPolicy {
    pub fn classify(&self, relative_uncertainty_pct: f64) -> (PrecisionLabel, &str) {
        self.grades
            .iter()
            .find(|grade| relative_uncertainty_pct < grade.below_pct)
            .map(|grade| (grade.label, grade.recommendation.as_str()))
            .unwrap_or((self.fallback.label, self.fallback.recommendation.as_str()))
    }

    fn graded(cutoffs: &[(PrecisionLabel, f64)], fallback: PrecisionLabel) -> Self {
        Self {
            grades: cutoffs
                .iter()
                .map(|&(label, below_pct)| PrecisionGrade {
                    label,
                    below_pct,
                    recommendation: recommendation_for(label).to_string(),
                })
                .collect(),
            fallback: PrecisionFallback {
                label: fallback,
                recommendation: recommendation_for(fallback).to_string(),
            },
        }
    }
}

fn recommendation_for(label: PrecisionLabel) -> &'static str {
    match label {
        PrecisionLabel::High => "Reliable; usable directly in durability design",
        PrecisionLabel::Medium => "Broadly reliable; add a safety margin to the cover depth",
        PrecisionLabel::Fair => "Noticeable uncertainty; verify before relying on it",
        PrecisionLabel::Low => "Large uncertainty; design conservatively or revise the mix",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub depth: DepthModel,
    pub uncertainty: UncertaintyModel,
    pub precision: PrecisionPolicy,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::realistic()
    }
}

fn standard_z_table() -> Vec<ZScore> {
    vec![
        ZScore {
            confidence: 0.90,
            z: 1.645,
        },
        ZScore {
            confidence: 0.95,
            z: 1.96,
        },
        ZScore {
            confidence: 0.99,
            z: 2.576,
        },
    ]
}

fn bands(pairs: &[(f64, f64)]) -> Vec<CoefficientBand> {
    pairs
        .iter()
        .map(|&(upper, k)| CoefficientBand { upper, k })
        .collect()
}

fn tiers(rows: &[(&str, f64, f64, f64)]) -> Vec<QualityTier> {
    rows.iter()
        .map(|&(name, max_water_binder, min_fly_ash, cv)| QualityTier {
            name: name.to_string(),
            max_water_binder,
            min_fly_ash,
            cv,
        })
        .collect()
}

impl ModelConfig {
    /// Engineering-practice calibration with five w/b bands, stepped recycled
    /// aggregate influence and damped accelerated CO₂.
    pub fn realistic() -> Self {
        Self {
            name: "realistic".to_string(),
            depth: DepthModel {
                coefficients: CoefficientTable {
                    bands: bands(&[(0.3, 1.5), (0.4, 2.5), (0.5, 4.0), (0.6, 6.5)]),
                    above: 10.0,
                    boundary: BoundaryRule::Inclusive,
                },
                recycled: RecycledFactor {
                    segments: vec![
                        RecycledSegment {
                            from: 0.0,
                            slope: 0.2,
                        },
                        RecycledSegment {
                            from: 0.3,
                            slope: 0.3,
                        },
                        RecycledSegment {
                            from: 0.5,
                            slope: 0.4,
                        },
                    ],
                },
                strength: StrengthFactor {
                    reference: 35.0,
                    exponent: 0.3,
                    fallback: 1.3,
                },
                fly_ash: FlyAshFactor {
                    slope: 0.3,
                    floor: None,
                },
                temperature: TemperatureModel::Linear { per_degree: 0.015 },
                humidity: HumidityFactor {
                    plateau_low: 60.0,
                    plateau_high: 75.0,
                    dry_base: 1.1,
                    dry_slope: 0.01,
                    humid: 0.85,
                },
                co2: Co2Model {
                    atmospheric: 0.04,
                    accelerated_threshold: 1.0,
                    policy: Co2Policy::Damped { factor: 0.3 },
                },
            },
            uncertainty: UncertaintyModel {
                tiers: tiers(&[
                    ("excellent", 0.4, 0.15, 0.08),
                    ("good", 0.5, 0.10, 0.12),
                    ("fair", 0.6, 0.0, 0.18),
                ]),
                fallback_tier: FallbackTier {
                    name: "poor".to_string(),
                    cv: 0.25,
                },
                recycled: RecycledCv::Proportional { slope: 0.06 },
                environment: EnvironmentCv::Proportional {
                    per_degree: 0.003,
                    per_percent: 0.002,
                },
                exposure: ExposureCv {
                    long_after_years: 3.0,
                    long_cv: 0.02,
                    short_cv: 0.01,
                },
                combine_extras: ExtraCvCombination::Independent,
                nominal_temperature: 20.0,
                nominal_humidity: 65.0,
                z_table: standard_z_table(),
                unknown_confidence: UnknownConfidencePolicy::Reject,
                lower_bound_floor: 0.0,
            },
            precision: PrecisionPolicy::graded(
                &[
                    (PrecisionLabel::High, 15.0),
                    (PrecisionLabel::Medium, 25.0),
                    (PrecisionLabel::Fair, 40.0),
                ],
                PrecisionLabel::Low,
            ),
        }
    }

    /// Variant whose scatter was tuned against validation residuals: a linear
    /// recycled law, no CO₂ term and threshold-style extra scatter.
    pub fn field_calibrated() -> Self {
        Self {
            name: "field_calibrated".to_string(),
            depth: DepthModel {
                coefficients: CoefficientTable {
                    bands: bands(&[(0.4, 2.5), (0.5, 4.0), (0.6, 6.5)]),
                    above: 10.0,
                    boundary: BoundaryRule::Inclusive,
                },
                recycled: RecycledFactor::linear(0.25),
                strength: StrengthFactor {
                    reference: 35.0,
                    exponent: 0.3,
                    fallback: 1.2,
                },
                fly_ash: FlyAshFactor {
                    slope: 0.3,
                    floor: None,
                },
                temperature: TemperatureModel::Linear { per_degree: 0.01 },
                humidity: HumidityFactor {
                    plateau_low: 60.0,
                    plateau_high: 75.0,
                    dry_base: 1.1,
                    dry_slope: 0.005,
                    humid: 0.9,
                },
                co2: Co2Model {
                    atmospheric: 0.04,
                    accelerated_threshold: 1.0,
                    policy: Co2Policy::Ignore,
                },
            },
            uncertainty: UncertaintyModel {
                tiers: tiers(&[
                    ("excellent", 0.4, 0.15, 0.08),
                    ("good", 0.5, 0.10, 0.12),
                    ("fair", 0.6, 0.0, 0.16),
                ]),
                fallback_tier: FallbackTier {
                    name: "poor".to_string(),
                    cv: 0.22,
                },
                recycled: RecycledCv::Threshold {
                    above: 0.5,
                    cv: 0.03,
                },
                environment: EnvironmentCv::Threshold {
                    temperature_deviation: 10.0,
                    humidity_deviation: 15.0,
                    cv: 0.02,
                },
                exposure: ExposureCv {
                    long_after_years: 5.0,
                    long_cv: 0.01,
                    short_cv: 0.0,
                },
                combine_extras: ExtraCvCombination::Summed,
                nominal_temperature: 20.0,
                nominal_humidity: 65.0,
                z_table: standard_z_table(),
                unknown_confidence: UnknownConfidencePolicy::Reject,
                lower_bound_floor: 0.0,
            },
            precision: PrecisionPolicy::graded(
                &[
                    (PrecisionLabel::High, 18.0),
                    (PrecisionLabel::Medium, 30.0),
                    (PrecisionLabel::Fair, 45.0),
                ],
                PrecisionLabel::Low,
            ),
        }
    }

    /// Calibration for low w/b, high fly-ash mixes (w/b ≤ 0.40, FA ≥ 15 %).
    pub fn high_performance() -> Self {
        Self {
            name: "high_performance".to_string(),
            depth: DepthModel {
                coefficients: CoefficientTable {
                    bands: bands(&[(0.35, 1.8), (0.40, 2.2)]),
                    above: 3.0,
                    boundary: BoundaryRule::Inclusive,
                },
                recycled: RecycledFactor::linear(0.2),
                strength: StrengthFactor {
                    reference: 40.0,
                    exponent: 0.25,
                    fallback: 1.2,
                },
                fly_ash: FlyAshFactor {
                    slope: 0.35,
                    floor: None,
                },
                temperature: TemperatureModel::Linear { per_degree: 0.01 },
                humidity: HumidityFactor {
                    plateau_low: 60.0,
                    plateau_high: 75.0,
                    dry_base: 1.0,
                    dry_slope: 0.008,
                    humid: 0.9,
                },
                co2: Co2Model {
                    atmospheric: 0.04,
                    accelerated_threshold: 1.0,
                    policy: Co2Policy::Ignore,
                },
            },
            uncertainty: UncertaintyModel {
                tiers: tiers(&[
                    ("ultra", 0.35, 0.25, 0.06),
                    ("excellent", 0.40, 0.15, 0.08),
                ]),
                fallback_tier: FallbackTier {
                    name: "good".to_string(),
                    cv: 0.10,
                },
                recycled: RecycledCv::Threshold {
                    above: 0.35,
                    cv: 0.01,
                },
                environment: EnvironmentCv::Threshold {
                    temperature_deviation: 5.0,
                    humidity_deviation: 10.0,
                    cv: 0.01,
                },
                exposure: ExposureCv {
                    long_after_years: 5.0,
                    long_cv: 0.0,
                    short_cv: 0.0,
                },
                combine_extras: ExtraCvCombination::Summed,
                nominal_temperature: 20.0,
                nominal_humidity: 65.0,
                z_table: standard_z_table(),
                unknown_confidence: UnknownConfidencePolicy::Reject,
                lower_bound_floor: 0.0,
            },
            precision: PrecisionPolicy::graded(
                &[(PrecisionLabel::High, 15.0), (PrecisionLabel::Medium, 25.0)],
                PrecisionLabel::Fair,
            ),
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "realistic" => Ok(Self::realistic()),
            "field_calibrated" => Ok(Self::field_calibrated()),
            "high_performance" => Ok(Self::high_performance()),
            other => Err(CarbonationError::InvalidConfigValueError {
                field: "model.preset".to_string(),
                value: other.to_string(),
                reason: format!("Unknown preset. Valid presets: {}", PRESET_NAMES.join(", ")),
            }),
        }
    }
}

impl Validate for DepthModel {
    fn validate(&self) -> Result<()> {
        let table = &self.coefficients;
        let uppers: Vec<f64> = table.bands.iter().map(|b| b.upper).collect();
        validate_strictly_increasing("depth.coefficients.bands", &uppers)?;
        for band in &table.bands {
            validate_positive("depth.coefficients.bands.k", band.k)?;
        }
        validate_positive("depth.coefficients.above", table.above)?;

        if self.recycled.segments.is_empty() {
            return Err(CarbonationError::ConfigValidationError {
                field: "depth.recycled.segments".to_string(),
                message: "At least one segment is required".to_string(),
            });
        }
        if self.recycled.segments[0].from != 0.0 {
            return Err(CarbonationError::ConfigValidationError {
                field: "depth.recycled.segments".to_string(),
                message: "The first segment must start at 0".to_string(),
            });
        }
        let starts: Vec<f64> = self.recycled.segments.iter().map(|s| s.from).collect();
        validate_strictly_increasing("depth.recycled.segments", &starts)?;
        for segment in &self.recycled.segments {
            validate_positive("depth.recycled.segments.slope", segment.slope)?;
        }

        validate_positive("depth.strength.reference", self.strength.reference)?;
        validate_positive("depth.strength.exponent", self.strength.exponent)?;
        validate_positive("depth.strength.fallback", self.strength.fallback)?;

        validate_range("depth.fly_ash.slope", self.fly_ash.slope, 0.0, 0.99)?;
        if let Some(floor) = self.fly_ash.floor {
            validate_range("depth.fly_ash.floor", floor, 0.0, 1.0)?;
        }

        match self.temperature {
            TemperatureModel::Linear { per_degree } => {
                validate_non_negative("depth.temperature.per_degree", per_degree)?
            }
            TemperatureModel::Exponential { rate } => {
                validate_non_negative("depth.temperature.rate", rate)?
            }
        }

        let humidity = &self.humidity;
        if humidity.plateau_high < humidity.plateau_low {
            return Err(CarbonationError::ConfigValidationError {
                field: "depth.humidity".to_string(),
                message: "plateau_high must not be below plateau_low".to_string(),
            });
        }
        validate_positive("depth.humidity.dry_base", humidity.dry_base)?;
        validate_non_negative("depth.humidity.dry_slope", humidity.dry_slope)?;
        validate_positive("depth.humidity.humid", humidity.humid)?;

        validate_positive("depth.co2.atmospheric", self.co2.atmospheric)?;
        validate_non_negative("depth.co2.accelerated_threshold", self.co2.accelerated_threshold)?;
        match self.co2.policy {
            Co2Policy::Damped { factor } => validate_positive("depth.co2.policy.factor", factor)?,
            Co2Policy::Linear { divisor } => {
                validate_positive("depth.co2.policy.divisor", divisor)?
            }
            Co2Policy::Direct | Co2Policy::Ignore => {}
        }

        Ok(())
    }
}

impl Validate for UncertaintyModel {
    fn validate(&self) -> Result<()> {
        for tier in &self.tiers {
            validate_non_empty_string("uncertainty.tiers.name", &tier.name)?;
            validate_non_negative("uncertainty.tiers.cv", tier.cv)?;
            validate_non_negative("uncertainty.tiers.min_fly_ash", tier.min_fly_ash)?;
        }
        validate_non_empty_string("uncertainty.fallback_tier.name", &self.fallback_tier.name)?;
        validate_non_negative("uncertainty.fallback_tier.cv", self.fallback_tier.cv)?;

        match self.recycled {
            RecycledCv::Proportional { slope } => {
                validate_non_negative("uncertainty.recycled.slope", slope)?
            }
            RecycledCv::Threshold { cv, .. } => validate_non_negative("uncertainty.recycled.cv", cv)?,
        }
        match self.environment {
            EnvironmentCv::Proportional {
                per_degree,
                per_percent,
            } => {
                validate_non_negative("uncertainty.environment.per_degree", per_degree)?;
                validate_non_negative("uncertainty.environment.per_percent", per_percent)?;
            }
            EnvironmentCv::Threshold { cv, .. } => {
                validate_non_negative("uncertainty.environment.cv", cv)?
            }
        }
        validate_non_negative("uncertainty.exposure.long_cv", self.exposure.long_cv)?;
        validate_non_negative("uncertainty.exposure.short_cv", self.exposure.short_cv)?;

        if self.z_table.is_empty() {
            return Err(CarbonationError::ConfigValidationError {
                field: "uncertainty.z_table".to_string(),
                message: "At least one confidence level is required".to_string(),
            });
        }
        for entry in &self.z_table {
            validate_probability("uncertainty.z_table.confidence", entry.confidence)?;
            validate_positive("uncertainty.z_table.z", entry.z)?;
        }
        if let UnknownConfidencePolicy::Fallback { z } = self.unknown_confidence {
            validate_positive("uncertainty.unknown_confidence.z", z)?;
        }
        validate_non_negative("uncertainty.lower_bound_floor", self.lower_bound_floor)?;
        Ok(())
    }
}

impl Validate for PrecisionPolicy {
    fn validate(&self) -> Result<()> {
        let cutoffs: Vec<f64> = self.grades.iter().map(|g| g.below_pct).collect();
        validate_strictly_increasing("precision.grades", &cutoffs)?;
        for cutoff in cutoffs {
            validate_positive("precision.grades.below_pct", cutoff)?;
        }
        Ok(())
    }
}

impl Validate for ModelConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("model.name", &self.name)?;
        self.depth.validate()?;
        self.uncertainty.validate()?;
        self.precision.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for name in PRESET_NAMES {
            let config = ModelConfig::preset(name).unwrap();
            assert_eq!(config.name, name);
            assert!(config.validate().is_ok(), "preset {} should validate", name);
        }
        assert!(ModelConfig::preset("high-performance").is_ok());
        assert!(ModelConfig::preset("papadakis").is_err());
    }

    #[test]
    fn test_coefficient_lookup_boundaries() {
        let mut table = ModelConfig::realistic().depth.coefficients;
        assert_eq!(table.lookup(0.25), 1.5);
        assert_eq!(table.lookup(0.40), 2.5);
        assert_eq!(table.lookup(0.45), 4.0);
        assert_eq!(table.lookup(0.75), 10.0);

        table.boundary = BoundaryRule::Exclusive;
        assert_eq!(table.lookup(0.40), 4.0);
    }

    #[test]
    fn test_recycled_factor_is_continuous() {
        let factor = ModelConfig::realistic().depth.recycled;
        assert_eq!(factor.factor(0.0), 1.0);
        assert!((factor.factor(0.3) - 1.06).abs() < 1e-12);
        assert!((factor.factor(0.4) - 1.09).abs() < 1e-12);
        assert!((factor.factor(0.5) - 1.12).abs() < 1e-12);
        assert!((factor.factor(0.8) - 1.24).abs() < 1e-12);
        let eps = 1e-9;
        assert!((factor.factor(0.3 + eps) - factor.factor(0.3 - eps)).abs() < 1e-6);
    }

    #[test]
    fn test_co2_policies() {
        let mut co2 = Co2Model {
            atmospheric: 0.04,
            accelerated_threshold: 1.0,
            policy: Co2Policy::Direct,
        };
        assert!((co2.factor(0.04) - 1.0).abs() < 1e-12);
        assert!((co2.factor(0.16) - 2.0).abs() < 1e-12);

        co2.policy = Co2Policy::Damped { factor: 0.3 };
        assert!((co2.factor(10.0) - (250.0f64).sqrt() * 0.3).abs() < 1e-12);
        assert!((co2.factor(0.16) - 2.0).abs() < 1e-12);

        co2.policy = Co2Policy::Linear { divisor: 4.0 };
        assert_eq!(co2.factor(10.0), 2.5);
        assert_eq!(co2.factor(0.04), 1.0);

        co2.policy = Co2Policy::Ignore;
        assert_eq!(co2.factor(20.0), 1.0);
    }

    #[test]
    fn test_humidity_plateau() {
        let humidity = ModelConfig::realistic().depth.humidity;
        assert_eq!(humidity.factor(65.0), 1.0);
        assert_eq!(humidity.factor(75.0), 1.0);
        assert_eq!(humidity.factor(80.0), 0.85);
        assert!((humidity.factor(45.0) - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_precision_classification() {
        let policy = ModelConfig::realistic().precision;
        assert_eq!(policy.classify(10.0).0, PrecisionLabel::High);
        assert_eq!(policy.classify(15.0).0, PrecisionLabel::Medium);
        assert_eq!(policy.classify(39.9).0, PrecisionLabel::Fair);
        assert_eq!(policy.classify(60.0).0, PrecisionLabel::Low);

        let hp = ModelConfig::high_performance().precision;
        assert_eq!(hp.classify(90.0).0, PrecisionLabel::Fair);
    }

    #[test]
    fn test_validation_rejects_bad_tables() {
        let mut config = ModelConfig::realistic();
        config.depth.coefficients.bands[1].upper = 0.2;
        assert!(config.validate().is_err());

        let mut config = ModelConfig::realistic();
        config.depth.recycled.segments[0].slope = 0.0;
        assert!(config.validate().is_err());

        let mut config = ModelConfig::realistic();
        config.uncertainty.z_table.push(ZScore {
            confidence: 1.2,
            z: 3.0,
        });
        assert!(config.validate().is_err());

        let mut config = ModelConfig::realistic();
        config.precision.grades[2].below_pct = 10.0;
        assert!(config.validate().is_err());
    }
}
