use clap::Parser;
use rac_carbonation::config::toml_config::{LogFormat, TomlConfig};
use rac_carbonation::domain::ports::ConfigProvider;
use rac_carbonation::utils::{logger, validation::Validate};
use rac_carbonation::{BatchEngine, BatchPipeline, LocalStorage};

#[derive(Parser)]
#[command(name = "batch-predict")]
#[command(about = "Predict carbonation depth for every mix in a CSV file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "batch-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines instead of the compact format
    #[arg(long)]
    json_logs: bool,

    /// Override the input CSV from the config
    #[arg(long)]
    input: Option<String>,

    /// Override the model preset from the config
    #[arg(long)]
    preset: Option<String>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    let verbose = args.verbose || config.verbose();
    if args.json_logs || config.log_format() == LogFormat::Json {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("🚀 Starting batch prediction tool");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(input) = args.input {
        tracing::info!("🔧 Input overridden to: {}", input);
        config.batch.input = Some(input);
    }
    if let Some(preset) = args.preset {
        tracing::info!("🔧 Preset overridden to: {}", preset);
        config.model.preset = Some(preset);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, args.dry_run);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No predictions will be written");
        perform_dry_run(&config)?;
        return Ok(());
    }

    let options = config.batch_options()?;
    let input = LocalStorage::new(".");
    let output = LocalStorage::new(config.output_path());
    let pipeline = BatchPipeline::new(input, output, config, options)?;
    let engine = BatchEngine::new(pipeline);

    match engine.run().await {
        Ok(summary) => {
            println!("✅ Batch prediction completed successfully!");
            println!(
                "📊 {} rows read, {} predicted, {} skipped",
                summary.extracted, summary.predicted, summary.skipped
            );
            println!("📁 Output saved to: {}", summary.output);
        }
        Err(e) => {
            tracing::error!(
                "❌ Batch prediction failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, dry_run: bool) {
    println!("📋 Configuration Summary:");
    println!("  Run: {}", config.run.name);
    if let Some(description) = &config.run.description {
        println!("  Description: {}", description);
    }
    println!(
        "  Model preset: {}",
        config.model.preset.as_deref().unwrap_or("realistic")
    );
    println!("  Input: {}", config.batch.input.as_deref().unwrap_or("-"));
    println!("  Confidence: {:.0}%", config.confidence_level() * 100.0);
    println!("  Output: {}", config.output_path());

    if dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> Result<(), Box<dyn std::error::Error>> {
    let model = config.model_config()?;
    let options = config.batch_options()?;

    println!("🔍 Dry Run Analysis:");
    println!();

    println!("🧮 Model: {}", model.name);
    println!(
        "  w/b bands: {} (+ above), boundary {:?}",
        model.depth.coefficients.bands.len(),
        model.depth.coefficients.boundary
    );
    println!("  CO₂ handling: {:?}", model.depth.co2.policy);
    println!(
        "  Quality tiers: {}",
        model
            .uncertainty
            .tiers
            .iter()
            .map(|t| t.name.as_str())
            .chain(std::iter::once(model.uncertainty.fallback_tier.name.as_str()))
            .collect::<Vec<_>>()
            .join(" > ")
    );
    println!("  Unknown confidence: {:?}", model.uncertainty.unknown_confidence);

    println!();
    println!("📥 Input:");
    println!("  File: {}", options.input);
    println!("  Missing fields: {:?}", config.input.missing_fields);
    println!("  Range check: {:?}", config.input.range_check);
    println!("  Invalid rows: {:?}", options.on_invalid_row);

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    for format in &options.formats {
        println!("  ✅ {}", format.filename());
    }
    if let Some(zip) = &options.zip_filename {
        println!("  Compression: {} (ZIP)", zip);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
