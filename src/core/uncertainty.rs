use crate::core::model_config::{UncertaintyModel, UnknownConfidencePolicy};
use crate::domain::model::{Interval, MixDesign, MixRatios, UncertaintyBreakdown};
use crate::utils::error::{CarbonationError, Result};

/// Tolerance for matching a requested confidence level against the z table.
const CONFIDENCE_MATCH_EPSILON: f64 = 1e-9;

/// Relative uncertainty reported when the point estimate is zero.
pub const ZERO_DEPTH_RELATIVE_UNCERTAINTY: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct UncertaintyEstimator<'a> {
    model: &'a UncertaintyModel,
}

impl<'a> UncertaintyEstimator<'a> {
    pub fn new(model: &'a UncertaintyModel) -> Self {
        Self { model }
    }

    /// Combines the mix-quality CV with the recycled-aggregate, environmental
    /// and exposure-duration terms according to `combine_extras`.
    pub fn coefficient_of_variation(
        &self,
        mix: &MixDesign,
        ratios: &MixRatios,
        exposure_years: f64,
    ) -> UncertaintyBreakdown {
        let model = self.model;

        let (quality_tier, base_cv) = model
            .tiers
            .iter()
            .find(|tier| {
                ratios.water_binder <= tier.max_water_binder
                    && ratios.fly_ash_fraction >= tier.min_fly_ash
            })
            .map(|tier| (tier.name.clone(), tier.cv))
            .unwrap_or_else(|| (model.fallback_tier.name.clone(), model.fallback_tier.cv));

        let recycled_cv = model.recycled.contribution(ratios.recycled_replacement);
        let environment_cv = model.environment.contribution(
            (mix.temperature - model.nominal_temperature).abs(),
            (mix.relative_humidity - model.nominal_humidity).abs(),
        );
        let exposure_cv = model.exposure.contribution(exposure_years);

        let total_cv = model
            .combine_extras
            .combine(base_cv, [recycled_cv, environment_cv, exposure_cv]);

        UncertaintyBreakdown {
            quality_tier,
            base_cv,
            recycled_cv,
            environment_cv,
            exposure_cv,
            total_cv,
        }
    }

    pub fn z_score(&self, confidence_level: f64) -> Result<f64> {
        if !confidence_level.is_finite() || confidence_level <= 0.0 || confidence_level >= 1.0 {
            return Err(CarbonationError::InvalidConfidenceLevel {
                level: confidence_level,
            });
        }

        let tabulated = self
            .model
            .z_table
            .iter()
            .find(|entry| (entry.confidence - confidence_level).abs() < CONFIDENCE_MATCH_EPSILON)
            .map(|entry| entry.z);

        match (tabulated, &self.model.unknown_confidence) {
            (Some(z), _) => Ok(z),
            (None, UnknownConfidencePolicy::Fallback { z }) => {
                tracing::warn!(
                    "⚠️ Confidence level {} not tabulated, falling back to z = {}",
                    confidence_level,
                    z
                );
                Ok(*z)
            }
            (None, UnknownConfidencePolicy::Reject) => {
                Err(CarbonationError::OutOfTableConfidenceLevel {
                    level: confidence_level,
                    known: self.known_levels(),
                })
            }
        }
    }

    pub fn known_levels(&self) -> String {
        self.model
            .z_table
            .iter()
            .map(|entry| format!("{:.2}", entry.confidence))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `point ± z · point · cv`. The lower bound is floored at the configured
    /// floor but never raised above the point estimate.
    pub fn interval(&self, point_mm: f64, total_cv: f64, confidence_level: f64) -> Result<Interval> {
        let z_score = self.z_score(confidence_level)?;
        let margin_mm = z_score * point_mm * total_cv;

        let lower_bound_mm = (point_mm - margin_mm)
            .max(self.model.lower_bound_floor)
            .min(point_mm);
        let upper_bound_mm = point_mm + margin_mm;

        let relative_uncertainty_pct = if point_mm > 0.0 {
            (upper_bound_mm - lower_bound_mm) / point_mm * 100.0
        } else {
            ZERO_DEPTH_RELATIVE_UNCERTAINTY
        };

        Ok(Interval {
            confidence_level,
            z_score,
            margin_mm,
            lower_bound_mm,
            upper_bound_mm,
            relative_uncertainty_pct,
        })
    }
}
