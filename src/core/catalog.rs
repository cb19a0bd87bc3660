//! Recommended recycled-aggregate mixes.
//!
//! Design rules behind every entry: w/b ≤ 0.40, fly ash ≥ 15 % of the binder,
//! recycled replacement ≤ 40 % and a compressive strength of at least 40 MPa.

use crate::core::predictor::Predictor;
use crate::domain::model::{MixDesign, Prediction};
use crate::utils::error::Result;
use serde::Serialize;

/// Five-year service life, days.
const SERVICE_LIFE_DAYS: f64 = 1825.0;
const ATMOSPHERIC_CO2: f64 = 0.04;

#[derive(Debug, Clone, Serialize)]
pub struct CatalogMix {
    pub name: &'static str,
    pub description: &'static str,
    /// MPa
    pub target_strength: f64,
    pub mix: MixDesign,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedMix {
    pub rank: usize,
    pub entry: CatalogMix,
    pub prediction: Prediction,
}

#[allow(clippy::too_many_arguments)]
fn natural_exposure(
    cement: f64,
    fly_ash: f64,
    water: f64,
    coarse_agg: f64,
    recycled_agg: f64,
    water_absorption: f64,
    fine_agg: f64,
    superplasticizer: f64,
    compressive_strength: f64,
) -> MixDesign {
    MixDesign {
        cement,
        fly_ash,
        water,
        coarse_agg,
        recycled_agg,
        water_absorption,
        fine_agg,
        superplasticizer,
        compressive_strength,
        carbon_concentration: ATMOSPHERIC_CO2,
        exposure_time: SERVICE_LIFE_DAYS,
        temperature: 20.0,
        relative_humidity: 65.0,
    }
}

pub fn recommended_mixes() -> Vec<CatalogMix> {
    vec![
        CatalogMix {
            name: "C50 high performance",
            description: "Key structures with high durability requirements",
            target_strength: 50.0,
            mix: natural_exposure(320.0, 80.0, 160.0, 700.0, 300.0, 3.5, 650.0, 4.0, 50.0),
        },
        CatalogMix {
            name: "C45 standard",
            description: "General structures with standard durability requirements",
            target_strength: 45.0,
            mix: natural_exposure(300.0, 100.0, 160.0, 650.0, 350.0, 4.0, 680.0, 3.5, 45.0),
        },
        CatalogMix {
            name: "C40 economy",
            description: "Secondary structures where cost comes first",
            target_strength: 40.0,
            mix: natural_exposure(280.0, 70.0, 140.0, 750.0, 250.0, 3.0, 700.0, 3.0, 42.0),
        },
        CatalogMix {
            name: "Marine exposure",
            description: "Marine and high-humidity environments",
            target_strength: 50.0,
            mix: MixDesign {
                temperature: 25.0,
                relative_humidity: 80.0,
                ..natural_exposure(280.0, 120.0, 140.0, 800.0, 200.0, 2.5, 650.0, 4.5, 52.0)
            },
        },
        CatalogMix {
            name: "Dry/hot exposure",
            description: "Dry, high-temperature environments",
            target_strength: 45.0,
            mix: MixDesign {
                temperature: 30.0,
                relative_humidity: 45.0,
                ..natural_exposure(320.0, 80.0, 160.0, 600.0, 400.0, 4.5, 680.0, 3.8, 46.0)
            },
        },
    ]
}

/// Predicts every catalog mix and ranks them by relative uncertainty, then depth.
pub fn evaluate_catalog(predictor: &Predictor, confidence_level: f64) -> Result<Vec<RankedMix>> {
    let mut evaluated = recommended_mixes()
        .into_iter()
        .map(|entry| {
            let prediction = predictor.predict(&entry.mix, confidence_level)?;
            tracing::debug!(
                "{} {}: {:.2} mm, relative uncertainty {:.1}%",
                prediction.precision.icon(),
                entry.name,
                prediction.depth_mm,
                prediction.relative_uncertainty_pct
            );
            Ok((entry, prediction))
        })
        .collect::<Result<Vec<_>>>()?;

    evaluated.sort_by(|(_, a), (_, b)| {
        a.relative_uncertainty_pct
            .total_cmp(&b.relative_uncertainty_pct)
            .then(a.depth_mm.total_cmp(&b.depth_mm))
    });

    Ok(evaluated
        .into_iter()
        .enumerate()
        .map(|(i, (entry, prediction))| RankedMix {
            rank: i + 1,
            entry,
            prediction,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::depth::derive_ratios;
    use crate::core::model_config::ModelConfig;

    #[test]
    fn test_catalog_follows_design_rules() {
        let mixes = recommended_mixes();
        assert_eq!(mixes.len(), 5);
        for entry in &mixes {
            let ratios = derive_ratios(&entry.mix);
            assert!(ratios.water_binder <= 0.40 + 1e-12, "{}", entry.name);
            assert!(ratios.fly_ash_fraction >= 0.15, "{}", entry.name);
            assert!(ratios.recycled_replacement <= 0.40 + 1e-12, "{}", entry.name);
            assert!(entry.mix.compressive_strength >= 40.0, "{}", entry.name);
        }
    }

    #[test]
    fn test_dry_hot_mix_under_high_performance() {
        let predictor = Predictor::new(ModelConfig::high_performance()).unwrap();
        let entry = recommended_mixes()
            .into_iter()
            .find(|entry| entry.name == "Dry/hot exposure")
            .unwrap();
        let prediction = predictor.predict(&entry.mix, 0.95).unwrap();

        assert!((prediction.uncertainty.total_cv - 0.08246).abs() < 1e-5);
        assert!((prediction.relative_uncertainty_pct - 32.325).abs() < 1e-3);
    }

    #[test]
    fn test_evaluate_catalog_is_ranked() {
        let predictor = Predictor::new(ModelConfig::high_performance()).unwrap();
        let ranked = evaluate_catalog(&predictor, 0.95).unwrap();

        assert_eq!(ranked.len(), 5);
        assert_eq!(ranked[0].rank, 1);
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0].prediction, &pair[1].prediction);
            assert!(
                a.relative_uncertainty_pct < b.relative_uncertainty_pct
                    || (a.relative_uncertainty_pct == b.relative_uncertainty_pct
                        && a.depth_mm <= b.depth_mm)
            );
        }
    }
}
