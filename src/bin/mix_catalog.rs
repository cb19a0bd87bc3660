use clap::Parser;
use rac_carbonation::core::catalog::{evaluate_catalog, RankedMix};
use rac_carbonation::utils::logger;
use rac_carbonation::{ModelConfig, Predictor};

#[derive(Parser)]
#[command(name = "mix-catalog")]
#[command(about = "Evaluate and rank the recommended recycled aggregate mixes")]
struct Args {
    /// Model preset used for the evaluation
    #[arg(long, default_value = "high_performance")]
    preset: String,

    #[arg(long, default_value_t = 0.95)]
    confidence: f64,

    /// Print the ranking as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let ranked = ModelConfig::preset(&args.preset)
        .and_then(Predictor::new)
        .and_then(|predictor| evaluate_catalog(&predictor, args.confidence));

    let ranked = match ranked {
        Ok(ranked) => ranked,
        Err(e) => {
            tracing::error!("❌ Catalog evaluation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&ranked) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    print_ranking(&ranked, &args.preset);
}

fn print_ranking(ranked: &[RankedMix], preset: &str) {
    println!("🏗️ Recommended recycled aggregate mixes ({} model)", preset);
    println!("{}", "=".repeat(72));

    for item in ranked {
        let p = &item.prediction;
        println!(
            "#{} {} (C{:.0}) - {}",
            item.rank, item.entry.name, item.entry.target_strength, item.entry.description
        );
        println!(
            "   w/b {:.2} | fly ash {:.0}% | recycled {:.0}%",
            p.ratios.water_binder,
            p.ratios.fly_ash_fraction * 100.0,
            p.ratios.recycled_replacement * 100.0
        );
        println!(
            "   {:.2} mm after {:.1} years, {:.0}% interval [{:.2}, {:.2}] mm",
            p.depth_mm,
            p.exposure_years,
            p.confidence_level * 100.0,
            p.lower_bound_mm,
            p.upper_bound_mm
        );
        println!(
            "   {} relative uncertainty {:.1}% {}",
            p.precision.icon(),
            p.relative_uncertainty_pct,
            p.precision
        );
        println!();
    }
}
