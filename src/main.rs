use clap::Parser;
use rac_carbonation::core::sweep::{sweep, SweepPoint};
use rac_carbonation::domain::ports::{ConfigProvider, Storage};
use rac_carbonation::utils::{logger, validation::Validate};
use rac_carbonation::{CarbonationError, CliConfig, LocalStorage, Prediction, Predictor, ReportFormat};

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting rac-carbonation");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = run(&config).await {
        tracing::error!(
            "❌ Prediction failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        std::process::exit(e.exit_code());
    }
}

async fn run(config: &CliConfig) -> Result<(), CarbonationError> {
    config.validate()?;

    let predictor = Predictor::from_provider(config)?;
    let mix = config.mix_design();
    let confidence = config.confidence_level();

    let json = if let Some((field, range)) = config.sweep_request()? {
        let points = sweep(&predictor, &mix, field, range, confidence)?;
        match config.format {
            ReportFormat::Text => print_sweep(&points),
            ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&points)?),
        }
        serde_json::to_vec_pretty(&points)?
    } else {
        let prediction = predictor.predict(&mix, confidence)?;
        match config.format {
            ReportFormat::Text => print_prediction(&prediction),
            ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&prediction)?),
        }
        serde_json::to_vec_pretty(&prediction)?
    };

    if config.save {
        let storage = LocalStorage::new(config.output_path());
        storage.write_file("prediction.json", &json).await?;
        tracing::info!("📁 Report saved to: {}/prediction.json", config.output_path());
    }

    Ok(())
}

fn print_prediction(p: &Prediction) {
    println!("🏗️ Carbonation depth ({} model)", p.model);
    println!(
        "  w/b {:.3} | fly ash {:.1}% | recycled {:.1}%",
        p.ratios.water_binder,
        p.ratios.fly_ash_fraction * 100.0,
        p.ratios.recycled_replacement * 100.0
    );
    println!(
        "  k_eff {:.3} mm/√year over {:.2} years",
        p.factors.effective_coefficient, p.exposure_years
    );
    println!("  Depth: {:.2} mm", p.depth_mm);
    println!(
        "  {:.0}% interval: [{:.2}, {:.2}] mm (z = {})",
        p.confidence_level * 100.0,
        p.lower_bound_mm,
        p.upper_bound_mm,
        p.z_score
    );
    println!("  {}", uncertainty_line(p));
    println!("  {} {}: {}", p.precision.icon(), p.precision, p.recommendation);
}

/// Relative uncertainty is the full interval width over the point estimate.
fn uncertainty_line(p: &Prediction) -> String {
    format!(
        "CV {:.1}% ({} quality), relative uncertainty {:.1}% of depth",
        p.uncertainty.total_cv * 100.0,
        p.uncertainty.quality_tier,
        p.relative_uncertainty_pct
    )
}

fn print_sweep(points: &[SweepPoint]) {
    let Some(first) = points.first() else {
        return;
    };
    println!(
        "🔁 {} ({}) sweep, {} model",
        first.field,
        first.field.unit(),
        first.prediction.model
    );
    println!(
        "  {:>10}  {:>9}  {:>9}  {:>9}  {:>7}",
        "value", "depth", "lower", "upper", "width%"
    );
    for point in points {
        let p = &point.prediction;
        println!(
            "  {:>10.2}  {:>9.2}  {:>9.2}  {:>9.2}  {:>7.1} {}",
            point.value,
            p.depth_mm,
            p.lower_bound_mm,
            p.upper_bound_mm,
            p.relative_uncertainty_pct,
            p.precision.icon()
        );
    }
}
