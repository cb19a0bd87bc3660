use crate::core::depth::DepthEstimator;
use crate::core::model_config::ModelConfig;
use crate::core::uncertainty::UncertaintyEstimator;
use crate::domain::model::{InputPolicy, MixDesign, Prediction};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::collections::HashMap;

/// Carbonation depth with a confidence interval, for a fixed model configuration.
///
/// Holds no mutable state; identical inputs give identical outputs and a
/// shared `&Predictor` can be used from any number of threads.
#[derive(Debug, Clone)]
pub struct Predictor {
    config: ModelConfig,
    input_policy: InputPolicy,
}

impl Predictor {
    /// Validates `config` once; predictions never re-check it.
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            input_policy: InputPolicy::default(),
        })
    }

    pub fn with_input_policy(mut self, input_policy: InputPolicy) -> Self {
        self.input_policy = input_policy;
        self
    }

    pub fn from_provider<C: ConfigProvider>(provider: &C) -> Result<Self> {
        Ok(Self::new(provider.model_config()?)?.with_input_policy(provider.input_policy()))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn input_policy(&self) -> InputPolicy {
        self.input_policy
    }

    pub fn predict(&self, mix: &MixDesign, confidence_level: f64) -> Result<Prediction> {
        mix.check(self.input_policy.range_check)?;

        let depth = DepthEstimator::new(&self.config.depth).estimate(mix);
        let uncertainty_estimator = UncertaintyEstimator::new(&self.config.uncertainty);
        let uncertainty =
            uncertainty_estimator.coefficient_of_variation(mix, &depth.ratios, depth.exposure_years);
        let interval =
            uncertainty_estimator.interval(depth.depth_mm, uncertainty.total_cv, confidence_level)?;
        let (precision, recommendation) = self
            .config
            .precision
            .classify(interval.relative_uncertainty_pct);

        tracing::debug!(
            "[{}] depth {:.2} mm, {:.0}% CI [{:.2}, {:.2}] mm, relative uncertainty {:.1}% ({})",
            self.config.name,
            depth.depth_mm,
            confidence_level * 100.0,
            interval.lower_bound_mm,
            interval.upper_bound_mm,
            interval.relative_uncertainty_pct,
            precision
        );

        Ok(Prediction {
            model: self.config.name.clone(),
            depth_mm: depth.depth_mm,
            lower_bound_mm: interval.lower_bound_mm,
            upper_bound_mm: interval.upper_bound_mm,
            confidence_level,
            z_score: interval.z_score,
            interval_width_mm: interval.width(),
            relative_uncertainty_pct: interval.relative_uncertainty_pct,
            precision,
            recommendation: recommendation.to_string(),
            exposure_years: depth.exposure_years,
            ratios: depth.ratios,
            factors: depth.factors,
            uncertainty,
        })
    }

    /// Coerces loosely typed fields under the configured input policy, then predicts.
    pub fn predict_fields(
        &self,
        fields: &HashMap<String, serde_json::Value>,
        confidence_level: f64,
    ) -> Result<(MixDesign, Prediction)> {
        let mix = MixDesign::from_fields(fields, self.input_policy.missing_fields)?;
        let prediction = self.predict(&mix, confidence_level)?;
        Ok((mix, prediction))
    }

    pub fn predict_many(
        &self,
        mixes: &[MixDesign],
        confidence_level: f64,
    ) -> Vec<Result<Prediction>> {
        mixes
            .iter()
            .map(|mix| self.predict(mix, confidence_level))
            .collect()
    }
}
