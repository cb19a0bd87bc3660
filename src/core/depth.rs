use crate::core::model_config::{DepthModel, DAYS_PER_YEAR};
use crate::domain::model::{DepthEstimate, FactorBreakdown, MixDesign, MixRatios};

/// Water/binder used when the binder mass is zero.
pub const FALLBACK_WATER_BINDER: f64 = 0.5;

pub fn derive_ratios(mix: &MixDesign) -> MixRatios {
    let binder = mix.cement + mix.fly_ash;
    let total_coarse = mix.coarse_agg + mix.recycled_agg;

    let binder_fallback = binder <= 0.0;
    let aggregate_fallback = total_coarse <= 0.0;

    let (water_binder, fly_ash_fraction) = if binder_fallback {
        (FALLBACK_WATER_BINDER, 0.0)
    } else {
        (mix.water / binder, mix.fly_ash / binder)
    };
    let recycled_replacement = if aggregate_fallback {
        0.0
    } else {
        mix.recycled_agg / total_coarse
    };

    if binder_fallback {
        tracing::debug!(
            "Binder content is zero, falling back to w/b = {}",
            FALLBACK_WATER_BINDER
        );
    }
    if aggregate_fallback {
        tracing::debug!("Coarse aggregate total is zero, replacement ratio set to 0");
    }

    MixRatios {
        water_binder,
        fly_ash_fraction,
        recycled_replacement,
        binder_fallback,
        aggregate_fallback,
    }
}

/// Modified Papadakis estimate: `x = k_eff · √t`, with `k_eff` the base
/// coefficient times independent correction factors.
#[derive(Debug, Clone)]
pub struct DepthEstimator<'a> {
    model: &'a DepthModel,
}

impl<'a> DepthEstimator<'a> {
    pub fn new(model: &'a DepthModel) -> Self {
        Self { model }
    }

    pub fn factors(&self, mix: &MixDesign, ratios: &MixRatios) -> FactorBreakdown {
        let model = self.model;
        let base_coefficient = model.coefficients.lookup(ratios.water_binder);
        let recycled_factor = model.recycled.factor(ratios.recycled_replacement);
        let strength_factor = model.strength.factor(mix.compressive_strength);
        let fly_ash_factor = model.fly_ash.factor(ratios.fly_ash_fraction);
        let temperature_factor = model.temperature.factor(mix.temperature);
        let humidity_factor = model.humidity.factor(mix.relative_humidity);
        let co2_factor = model.co2.factor(mix.carbon_concentration);

        let effective_coefficient = base_coefficient
            * recycled_factor
            * strength_factor
            * fly_ash_factor
            * temperature_factor
            * humidity_factor
            * co2_factor;

        FactorBreakdown {
            base_coefficient,
            recycled_factor,
            strength_factor,
            fly_ash_factor,
            temperature_factor,
            humidity_factor,
            co2_factor,
            effective_coefficient,
        }
    }

    pub fn estimate(&self, mix: &MixDesign) -> DepthEstimate {
        let ratios = derive_ratios(mix);
        let factors = self.factors(mix, &ratios);
        let exposure_years = mix.exposure_time.max(0.0) / DAYS_PER_YEAR;
        let depth_mm = (factors.effective_coefficient * exposure_years.sqrt()).max(0.0);

        tracing::debug!(
            "k_eff = {:.3} mm/√year over {:.2} years -> {:.3} mm",
            factors.effective_coefficient,
            exposure_years,
            depth_mm
        );

        DepthEstimate {
            depth_mm,
            exposure_years,
            ratios,
            factors,
        }
    }
}
