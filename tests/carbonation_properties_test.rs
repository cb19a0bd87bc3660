use rac_carbonation::core::model_config::PRESET_NAMES;
use rac_carbonation::{MixDesign, ModelConfig, PrecisionLabel, Predictor};

const LEVELS: [f64; 3] = [0.90, 0.95, 0.99];

fn predictors() -> Vec<Predictor> {
    PRESET_NAMES
        .iter()
        .map(|name| Predictor::new(ModelConfig::preset(name).unwrap()).unwrap())
        .collect()
}

fn sample_mixes() -> Vec<MixDesign> {
    let base = MixDesign::default();
    vec![
        base,
        MixDesign {
            water: 140.0,
            fly_ash: 120.0,
            cement: 280.0,
            ..base
        },
        MixDesign {
            water: 260.0,
            recycled_agg: 1000.0,
            coarse_agg: 0.0,
            ..base
        },
        MixDesign {
            temperature: 30.0,
            relative_humidity: 40.0,
            carbon_concentration: 0.04,
            exposure_time: 3650.0,
            ..base
        },
        MixDesign {
            cement: 0.0,
            fly_ash: 0.0,
            coarse_agg: 0.0,
            recycled_agg: 0.0,
            ..base
        },
    ]
}

#[test]
fn test_bounds_are_ordered_and_non_negative() {
    for predictor in predictors() {
        for mix in sample_mixes() {
            for level in LEVELS {
                let p = predictor.predict(&mix, level).unwrap();
                assert!(p.depth_mm >= 0.0);
                assert!(p.lower_bound_mm >= 0.0);
                assert!(p.lower_bound_mm <= p.depth_mm, "{:?}", p);
                assert!(p.depth_mm <= p.upper_bound_mm, "{:?}", p);
            }
        }
    }
}

#[test]
fn test_higher_confidence_gives_wider_interval() {
    let predictor = Predictor::new(ModelConfig::realistic()).unwrap();
    let widths: Vec<f64> = LEVELS
        .iter()
        .map(|&level| {
            predictor
                .predict(&MixDesign::default(), level)
                .unwrap()
                .interval_width_mm
        })
        .collect();
    assert!(widths[0] < widths[1] && widths[1] < widths[2]);
}

#[test]
fn test_depth_decreases_with_strength() {
    for predictor in predictors() {
        let mut previous = f64::INFINITY;
        for strength in [20.0, 30.0, 40.0, 50.0, 70.0] {
            let mix = MixDesign {
                compressive_strength: strength,
                ..MixDesign::default()
            };
            let depth = predictor.predict(&mix, 0.95).unwrap().depth_mm;
            assert!(depth < previous, "{} MPa", strength);
            previous = depth;
        }
    }
}

#[test]
fn test_depth_increases_with_recycled_replacement() {
    for predictor in predictors() {
        let mut previous = 0.0;
        // total coarse aggregate fixed at 1000 kg/m³
        for recycled in [0.0, 200.0, 400.0, 600.0, 1000.0] {
            let mix = MixDesign {
                recycled_agg: recycled,
                coarse_agg: 1000.0 - recycled,
                ..MixDesign::default()
            };
            let depth = predictor.predict(&mix, 0.95).unwrap().depth_mm;
            assert!(depth > previous, "{} kg/m³ recycled", recycled);
            previous = depth;
        }
    }
}

#[test]
fn test_depth_decreases_with_fly_ash_fraction() {
    for predictor in predictors() {
        let mut previous = f64::INFINITY;
        // binder fixed at 400 kg/m³ so w/b stays at 0.45
        for fly_ash in [0.0, 40.0, 80.0, 120.0] {
            let mix = MixDesign {
                fly_ash,
                cement: 400.0 - fly_ash,
                ..MixDesign::default()
            };
            let depth = predictor.predict(&mix, 0.95).unwrap().depth_mm;
            assert!(depth < previous, "{} kg/m³ fly ash", fly_ash);
            previous = depth;
        }
    }
}

#[test]
fn test_square_root_time_law() {
    for predictor in predictors() {
        for days in [90.0, 365.0, 730.0] {
            let short = MixDesign {
                exposure_time: days,
                ..MixDesign::default()
            };
            let long = MixDesign {
                exposure_time: 4.0 * days,
                ..MixDesign::default()
            };
            let d1 = predictor.predict(&short, 0.95).unwrap().depth_mm;
            let d4 = predictor.predict(&long, 0.95).unwrap().depth_mm;
            assert!((d4 - 2.0 * d1).abs() < 1e-9 * d4.max(1.0));
        }
    }
}

#[test]
fn test_interval_is_symmetric_when_floor_not_engaged() {
    for predictor in predictors() {
        for mix in sample_mixes() {
            let p = predictor.predict(&mix, 0.95).unwrap();
            let margin = p.z_score * p.depth_mm * p.uncertainty.total_cv;
            if p.depth_mm - margin >= 0.0 {
                let above = p.upper_bound_mm - p.depth_mm;
                let below = p.depth_mm - p.lower_bound_mm;
                assert!((above - below).abs() < 1e-9);
            }
        }
    }
}

#[test]
fn test_predictions_are_bit_identical() {
    for predictor in predictors() {
        for mix in sample_mixes() {
            let a = predictor.predict(&mix, 0.99).unwrap();
            let b = predictor.predict(&mix, 0.99).unwrap();
            assert_eq!(a, b);
            assert_eq!(a.depth_mm.to_bits(), b.depth_mm.to_bits());
        }
    }
}

#[test]
fn test_reference_scenario() {
    let predictor = Predictor::new(ModelConfig::realistic()).unwrap();
    let p = predictor.predict(&MixDesign::default(), 0.95).unwrap();

    assert!((p.ratios.water_binder - 0.45).abs() < 1e-12);
    assert!((p.ratios.recycled_replacement - 0.40).abs() < 1e-12);
    assert!(p.depth_mm > 0.0);
    assert!(p.lower_bound_mm < p.depth_mm && p.depth_mm < p.upper_bound_mm);
    assert!(p.relative_uncertainty_pct > 0.0);
    assert_eq!(p.uncertainty.quality_tier, "good");

    // 10 % CO₂ is above the 1 % threshold and gets damped
    let expected_co2 = (10.0f64 / 0.04).sqrt() * 0.3;
    assert!((p.factors.co2_factor - expected_co2).abs() < 1e-12);
}

#[test]
fn test_water_binder_boundary_is_inclusive() {
    let mix = MixDesign {
        water: 160.0,
        ..MixDesign::default()
    };
    let predictor = Predictor::new(ModelConfig::realistic()).unwrap();
    let p = predictor.predict(&mix, 0.95).unwrap();
    assert_eq!(p.ratios.water_binder, 0.4);
    assert_eq!(p.factors.base_coefficient, 2.5);
}

#[test]
fn test_zero_exposure_reports_full_uncertainty() {
    let predictor = Predictor::new(ModelConfig::realistic()).unwrap();
    let mix = MixDesign {
        exposure_time: 0.0,
        ..MixDesign::default()
    };
    let p = predictor.predict(&mix, 0.95).unwrap();
    assert_eq!(p.depth_mm, 0.0);
    assert_eq!(p.lower_bound_mm, 0.0);
    assert_eq!(p.upper_bound_mm, 0.0);
    assert_eq!(p.relative_uncertainty_pct, 100.0);
    assert_eq!(p.precision, PrecisionLabel::Low);
}

#[test]
fn test_predictions_can_run_in_parallel() {
    let predictor = Predictor::new(ModelConfig::realistic()).unwrap();
    let expected = predictor.predict(&MixDesign::default(), 0.95).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| predictor.predict(&MixDesign::default(), 0.95).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
