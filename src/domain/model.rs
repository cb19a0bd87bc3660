use crate::utils::error::{CarbonationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The 13 named inputs of a mix-design record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixField {
    Cement,
    FlyAsh,
    Water,
    CoarseAgg,
    RecycledAgg,
    WaterAbsorption,
    FineAgg,
    Superplasticizer,
    CompressiveStrength,
    CarbonConcentration,
    ExposureTime,
    Temperature,
    RelativeHumidity,
}

impl MixField {
    pub const ALL: [MixField; 13] = [
        MixField::Cement,
        MixField::FlyAsh,
        MixField::Water,
        MixField::CoarseAgg,
        MixField::RecycledAgg,
        MixField::WaterAbsorption,
        MixField::FineAgg,
        MixField::Superplasticizer,
        MixField::CompressiveStrength,
        MixField::CarbonConcentration,
        MixField::ExposureTime,
        MixField::Temperature,
        MixField::RelativeHumidity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MixField::Cement => "cement",
            MixField::FlyAsh => "fly_ash",
            MixField::Water => "water",
            MixField::CoarseAgg => "coarse_agg",
            MixField::RecycledAgg => "recycled_agg",
            MixField::WaterAbsorption => "water_absorption",
            MixField::FineAgg => "fine_agg",
            MixField::Superplasticizer => "superplasticizer",
            MixField::CompressiveStrength => "compressive_strength",
            MixField::CarbonConcentration => "carbon_concentration",
            MixField::ExposureTime => "exposure_time",
            MixField::Temperature => "temperature",
            MixField::RelativeHumidity => "relative_humidity",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MixField::Cement
            | MixField::FlyAsh
            | MixField::Water
            | MixField::CoarseAgg
            | MixField::RecycledAgg
            | MixField::FineAgg
            | MixField::Superplasticizer => "kg/m³",
            MixField::WaterAbsorption
            | MixField::CarbonConcentration
            | MixField::RelativeHumidity => "%",
            MixField::CompressiveStrength => "MPa",
            MixField::ExposureTime => "days",
            MixField::Temperature => "°C",
        }
    }

    pub fn default_value(self) -> f64 {
        match self {
            MixField::Cement => 350.0,
            MixField::FlyAsh => 50.0,
            MixField::Water => 180.0,
            MixField::CoarseAgg => 600.0,
            MixField::RecycledAgg => 400.0,
            MixField::WaterAbsorption => 4.5,
            MixField::FineAgg => 700.0,
            MixField::Superplasticizer => 2.0,
            MixField::CompressiveStrength => 35.0,
            MixField::CarbonConcentration => 10.0,
            MixField::ExposureTime => 365.0,
            MixField::Temperature => 20.0,
            MixField::RelativeHumidity => 65.0,
        }
    }

    /// Documented plausible `(min, max)`, taken from the calibration data set.
    pub fn range(self) -> (f64, f64) {
        match self {
            MixField::Cement => (133.0, 500.0),
            MixField::FlyAsh => (0.0, 225.5),
            MixField::Water => (46.56, 280.0),
            MixField::CoarseAgg => (0.0, 1311.0),
            MixField::RecycledAgg => (0.0, 1280.0),
            MixField::WaterAbsorption => (0.34, 9.9),
            MixField::FineAgg => (0.0, 998.0),
            MixField::Superplasticizer => (0.4, 7.31),
            MixField::CompressiveStrength => (18.0, 72.6),
            MixField::CarbonConcentration => (0.0, 20.0),
            MixField::ExposureTime => (0.0, 3650.0),
            MixField::Temperature => (0.0, 30.0),
            MixField::RelativeHumidity => (0.0, 78.3),
        }
    }
}

impl fmt::Display for MixField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MixField {
    type Err = CarbonationError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        MixField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == key)
            .ok_or_else(|| CarbonationError::InvalidInput {
                field: "field".to_string(),
                value: s.to_string(),
                reason: "Unknown mix-design field".to_string(),
            })
    }
}

/// What to do when a field is absent or cannot be coerced to a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    #[default]
    #[serde(alias = "default")]
    UseDefault,
    Reject,
}

/// What to do with values outside a field's documented range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    Ignore,
    #[default]
    Warn,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputPolicy {
    #[serde(default)]
    pub missing_fields: MissingFieldPolicy,
    #[serde(default)]
    pub range_check: RangePolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeViolation {
    pub field: MixField,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} {} is outside [{}, {}]",
            self.field,
            self.value,
            self.field.unit(),
            self.min,
            self.max
        )
    }
}

/// Mix-design input record. Masses in kg/m³, exposure time in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixDesign {
    pub cement: f64,
    pub fly_ash: f64,
    pub water: f64,
    pub coarse_agg: f64,
    pub recycled_agg: f64,
    pub water_absorption: f64,
    pub fine_agg: f64,
    pub superplasticizer: f64,
    pub compressive_strength: f64,
    pub carbon_concentration: f64,
    pub exposure_time: f64,
    pub temperature: f64,
    pub relative_humidity: f64,
}

impl Default for MixDesign {
    fn default() -> Self {
        MixDesign {
            cement: MixField::Cement.default_value(),
            fly_ash: MixField::FlyAsh.default_value(),
            water: MixField::Water.default_value(),
            coarse_agg: MixField::CoarseAgg.default_value(),
            recycled_agg: MixField::RecycledAgg.default_value(),
            water_absorption: MixField::WaterAbsorption.default_value(),
            fine_agg: MixField::FineAgg.default_value(),
            superplasticizer: MixField::Superplasticizer.default_value(),
            compressive_strength: MixField::CompressiveStrength.default_value(),
            carbon_concentration: MixField::CarbonConcentration.default_value(),
            exposure_time: MixField::ExposureTime.default_value(),
            temperature: MixField::Temperature.default_value(),
            relative_humidity: MixField::RelativeHumidity.default_value(),
        }
    }
}

impl MixDesign {
    pub fn get(&self, field: MixField) -> f64 {
        match field {
            MixField::Cement => self.cement,
            MixField::FlyAsh => self.fly_ash,
            MixField::Water => self.water,
            MixField::CoarseAgg => self.coarse_agg,
            MixField::RecycledAgg => self.recycled_agg,
            MixField::WaterAbsorption => self.water_absorption,
            MixField::FineAgg => self.fine_agg,
            MixField::Superplasticizer => self.superplasticizer,
            MixField::CompressiveStrength => self.compressive_strength,
            MixField::CarbonConcentration => self.carbon_concentration,
            MixField::ExposureTime => self.exposure_time,
            MixField::Temperature => self.temperature,
            MixField::RelativeHumidity => self.relative_humidity,
        }
    }

    pub fn set(&mut self, field: MixField, value: f64) {
        let slot = match field {
            MixField::Cement => &mut self.cement,
            MixField::FlyAsh => &mut self.fly_ash,
            MixField::Water => &mut self.water,
            MixField::CoarseAgg => &mut self.coarse_agg,
            MixField::RecycledAgg => &mut self.recycled_agg,
            MixField::WaterAbsorption => &mut self.water_absorption,
            MixField::FineAgg => &mut self.fine_agg,
            MixField::Superplasticizer => &mut self.superplasticizer,
            MixField::CompressiveStrength => &mut self.compressive_strength,
            MixField::CarbonConcentration => &mut self.carbon_concentration,
            MixField::ExposureTime => &mut self.exposure_time,
            MixField::Temperature => &mut self.temperature,
            MixField::RelativeHumidity => &mut self.relative_humidity,
        };
        *slot = value;
    }

    /// Builds a record from loosely typed values (JSON numbers or numeric strings).
    ///
    /// Absent or unparsable fields fall back to their documented default under
    /// [`MissingFieldPolicy::UseDefault`]; under [`MissingFieldPolicy::Reject`]
    /// they fail. Non-finite numbers are rejected under either policy.
    pub fn from_fields(
        fields: &HashMap<String, serde_json::Value>,
        policy: MissingFieldPolicy,
    ) -> Result<Self> {
        let mut mix = MixDesign::default();

        for key in fields.keys() {
            if key.parse::<MixField>().is_err() {
                tracing::debug!("Ignoring unknown input key '{}'", key);
            }
        }

        for field in MixField::ALL {
            let raw = fields.get(field.name()).filter(|v| !v.is_null());
            let value = match raw {
                None => match policy {
                    MissingFieldPolicy::UseDefault => {
                        tracing::debug!(
                            "Field '{}' missing, using default {}",
                            field,
                            field.default_value()
                        );
                        field.default_value()
                    }
                    MissingFieldPolicy::Reject => {
                        return Err(CarbonationError::MissingField {
                            field: field.name().to_string(),
                        })
                    }
                },
                Some(v) => match (coerce_number(v), policy) {
                    (Some(n), _) => n,
                    (None, MissingFieldPolicy::UseDefault) => {
                        tracing::warn!(
                            "⚠️ Field '{}' is not numeric ({}), using default {}",
                            field,
                            v,
                            field.default_value()
                        );
                        field.default_value()
                    }
                    (None, MissingFieldPolicy::Reject) => {
                        return Err(CarbonationError::InvalidInput {
                            field: field.name().to_string(),
                            value: v.to_string(),
                            reason: "Value is not numeric".to_string(),
                        })
                    }
                },
            };

            if !value.is_finite() {
                return Err(CarbonationError::InvalidInput {
                    field: field.name().to_string(),
                    value: value.to_string(),
                    reason: "Value must be finite".to_string(),
                });
            }
            mix.set(field, value);
        }

        Ok(mix)
    }

    pub fn ensure_finite(&self) -> Result<()> {
        for field in MixField::ALL {
            let value = self.get(field);
            if !value.is_finite() {
                return Err(CarbonationError::InvalidInput {
                    field: field.name().to_string(),
                    value: value.to_string(),
                    reason: "Value must be finite".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn range_violations(&self) -> Vec<RangeViolation> {
        MixField::ALL
            .iter()
            .filter_map(|&field| {
                let value = self.get(field);
                let (min, max) = field.range();
                (value < min || value > max).then_some(RangeViolation {
                    field,
                    value,
                    min,
                    max,
                })
            })
            .collect()
    }

    /// Finite check plus range handling according to `policy`.
    pub fn check(&self, policy: RangePolicy) -> Result<()> {
        self.ensure_finite()?;
        if policy == RangePolicy::Ignore {
            return Ok(());
        }

        let violations = self.range_violations();
        match (policy, violations.first()) {
            (_, None) => Ok(()),
            (RangePolicy::Reject, Some(first)) => Err(CarbonationError::InvalidInput {
                field: first.field.name().to_string(),
                value: first.value.to_string(),
                reason: format!(
                    "Outside documented range [{}, {}] {}",
                    first.min,
                    first.max,
                    first.field.unit()
                ),
            }),
            _ => {
                for violation in &violations {
                    tracing::warn!("⚠️ {}", violation);
                }
                Ok(())
            }
        }
    }
}

fn coerce_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Ratios derived from the mix masses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixRatios {
    pub water_binder: f64,
    pub fly_ash_fraction: f64,
    pub recycled_replacement: f64,
    /// Binder mass was zero; the fallback ratios were used.
    pub binder_fallback: bool,
    /// Total coarse aggregate was zero; replacement defaulted to 0.
    pub aggregate_fallback: bool,
}

/// Multiplicative factors that make up the effective carbonation coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub base_coefficient: f64,
    pub recycled_factor: f64,
    pub strength_factor: f64,
    pub fly_ash_factor: f64,
    pub temperature_factor: f64,
    pub humidity_factor: f64,
    pub co2_factor: f64,
    /// mm/√year
    pub effective_coefficient: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthEstimate {
    pub depth_mm: f64,
    pub exposure_years: f64,
    pub ratios: MixRatios,
    pub factors: FactorBreakdown,
}

/// Coefficient-of-variation contributors, combined as a root sum of squares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBreakdown {
    pub quality_tier: String,
    pub base_cv: f64,
    pub recycled_cv: f64,
    pub environment_cv: f64,
    pub exposure_cv: f64,
    pub total_cv: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub confidence_level: f64,
    pub z_score: f64,
    pub margin_mm: f64,
    pub lower_bound_mm: f64,
    pub upper_bound_mm: f64,
    pub relative_uncertainty_pct: f64,
}

impl Interval {
    pub fn width(&self) -> f64 {
        self.upper_bound_mm - self.lower_bound_mm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionLabel {
    High,
    Medium,
    Fair,
    Low,
}

impl PrecisionLabel {
    pub fn icon(self) -> &'static str {
        match self {
            PrecisionLabel::High => "🟢",
            PrecisionLabel::Medium => "🟡",
            PrecisionLabel::Fair => "🟠",
            PrecisionLabel::Low => "🔴",
        }
    }
}

impl fmt::Display for PrecisionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PrecisionLabel::High => "high precision",
            PrecisionLabel::Medium => "medium precision",
            PrecisionLabel::Fair => "fair precision",
            PrecisionLabel::Low => "low precision",
        };
        f.write_str(text)
    }
}

/// Result of a single prediction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub model: String,
    pub depth_mm: f64,
    pub lower_bound_mm: f64,
    pub upper_bound_mm: f64,
    pub confidence_level: f64,
    pub z_score: f64,
    pub interval_width_mm: f64,
    pub relative_uncertainty_pct: f64,
    pub precision: PrecisionLabel,
    pub recommendation: String,
    pub exposure_years: f64,
    pub ratios: MixRatios,
    pub factors: FactorBreakdown,
    pub uncertainty: UncertaintyBreakdown,
}

/// One raw input row of a batch run, before coercion into a [`MixDesign`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixRecord {
    pub id: String,
    pub line: usize,
    pub fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedRecord {
    pub id: String,
    pub mix: MixDesign,
    pub prediction: Prediction,
}

/// A row that was dropped during a batch run, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub id: String,
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub predictions: Vec<PredictedRecord>,
    pub skipped: Vec<SkippedRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_field_names_round_trip_through_from_str() {
        for field in MixField::ALL {
            assert_eq!(field.name().parse::<MixField>().unwrap(), field);
        }
        assert!("slump".parse::<MixField>().is_err());
    }

    #[test]
    fn test_defaults_lie_inside_documented_ranges() {
        let mix = MixDesign::default();
        assert!(mix.range_violations().is_empty());
        assert_eq!(mix.cement, 350.0);
        assert_eq!(mix.carbon_concentration, 10.0);
        for field in MixField::ALL {
            assert_eq!(mix.get(field), field.default_value(), "{}", field);
        }
    }

    #[test]
    fn test_from_fields_coerces_strings_and_fills_defaults() {
        let map = fields(&[("cement", json!("400")), ("water", json!(160))]);
        let mix = MixDesign::from_fields(&map, MissingFieldPolicy::UseDefault).unwrap();
        assert_eq!(mix.cement, 400.0);
        assert_eq!(mix.water, 160.0);
        assert_eq!(mix.fly_ash, MixField::FlyAsh.default_value());
    }

    #[test]
    fn test_from_fields_non_numeric_uses_default() {
        let map = fields(&[("temperature", json!("warm"))]);
        let mix = MixDesign::from_fields(&map, MissingFieldPolicy::UseDefault).unwrap();
        assert_eq!(mix.temperature, 20.0);
    }

    #[test]
    fn test_from_fields_reject_policy() {
        let map = fields(&[("cement", json!(350))]);
        let err = MixDesign::from_fields(&map, MissingFieldPolicy::Reject).unwrap_err();
        assert!(matches!(err, CarbonationError::MissingField { .. }));

        let mut full: HashMap<String, serde_json::Value> = MixField::ALL
            .iter()
            .map(|f| (f.name().to_string(), json!(f.default_value())))
            .collect();
        full.insert("water".to_string(), json!("lots"));
        let err = MixDesign::from_fields(&full, MissingFieldPolicy::Reject).unwrap_err();
        assert!(matches!(err, CarbonationError::InvalidInput { ref field, .. } if field == "water"));
    }

    #[test]
    fn test_check_range_policies() {
        let mut mix = MixDesign::default();
        mix.temperature = 45.0;
        assert_eq!(mix.range_violations().len(), 1);
        assert!(mix.check(RangePolicy::Ignore).is_ok());
        assert!(mix.check(RangePolicy::Warn).is_ok());
        assert!(mix.check(RangePolicy::Reject).is_err());

        mix.temperature = f64::NAN;
        assert!(mix.check(RangePolicy::Ignore).is_err());
    }

    #[test]
    fn test_mix_design_deserializes_partial_json() {
        let mix: MixDesign = serde_json::from_value(json!({"cement": 300.0})).unwrap();
        assert_eq!(mix.cement, 300.0);
        assert_eq!(mix.relative_humidity, 65.0);
    }
}
