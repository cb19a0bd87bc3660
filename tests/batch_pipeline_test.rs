use anyhow::Result;
use rac_carbonation::core::batch::{BatchReport, CSV_FILENAME, JSON_FILENAME};
use rac_carbonation::utils::validation::Validate;
use rac_carbonation::{
    BatchEngine, BatchPipeline, CarbonationError, LocalStorage, PrecisionLabel, TomlConfig,
};
use std::fs;
use tempfile::TempDir;

const MIXES: &str = "\
name,cement,fly_ash,water,coarse_agg,recycled_agg,compressive_strength,carbon_concentration,exposure_time,temperature,relative_humidity
C50 high performance,320,80,160,700,300,50,0.04,1825,20,65
Marine,280,120,140,800,200,52,0.04,1825,25,80
Reference,350,50,180,600,400,35,10,365,20,65
Broken,350,50,180,600,400,35,10,inf,20,65
";

fn write_config(dir: &TempDir, extra: &str) -> Result<TomlConfig> {
    let output = dir.path().join("out");
    let content = format!(
        r#"
[run]
name = "integration"

[model]
preset = "realistic"

[batch]
input = "mixes.csv"
confidence_level = 0.95
{extra}

[output]
path = "{}"
formats = ["csv", "json"]
compression = {{ enabled = true, filename = "bundle.zip" }}
"#,
        output.display().to_string().replace('\\', "/")
    );
    let path = dir.path().join("batch.toml");
    fs::write(&path, content)?;
    Ok(TomlConfig::from_file(&path)?)
}

#[tokio::test]
async fn test_batch_run_writes_all_reports() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("mixes.csv"), MIXES)?;
    let config = write_config(&dir, "")?;
    let options = config.batch_options()?;
    let output_dir = dir.path().join("out");

    let pipeline = BatchPipeline::new(
        LocalStorage::new(dir.path()),
        LocalStorage::new(&output_dir),
        config,
        options,
    )?;
    let summary = BatchEngine::new(pipeline).run().await?;

    assert_eq!(summary.extracted, 4);
    assert_eq!(summary.predicted, 3);
    assert_eq!(summary.skipped, 1);
    assert!(summary.output.ends_with("bundle.zip"));

    let csv = fs::read_to_string(output_dir.join(CSV_FILENAME))?;
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.lines().nth(1).unwrap_or_default().starts_with("C50 high performance,"));

    let report: BatchReport = serde_json::from_str(&fs::read_to_string(output_dir.join(JSON_FILENAME))?)?;
    assert_eq!(report.metadata.model, "realistic");
    assert_eq!(report.metadata.confidence_level, 0.95);
    assert_eq!(report.metadata.total_rows, 4);
    assert_eq!(report.skipped[0].id, "Broken");
    assert_eq!(report.skipped[0].line, 5);
    let histogram_total: usize = report.metadata.precision_histogram.values().sum();
    assert_eq!(histogram_total, 3);
    assert!(report
        .predictions
        .iter()
        .all(|r| r.prediction.lower_bound_mm <= r.prediction.depth_mm));

    let bundle = fs::File::open(output_dir.join("bundle.zip"))?;
    let mut archive = zip::ZipArchive::new(bundle)?;
    assert_eq!(archive.len(), 2);
    assert!(archive.by_name(CSV_FILENAME).is_ok());
    assert!(archive.by_name(JSON_FILENAME).is_ok());

    Ok(())
}

#[tokio::test]
async fn test_fail_policy_stops_the_run() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("mixes.csv"), MIXES)?;
    let config = write_config(&dir, "on_invalid_row = \"fail\"")?;
    let options = config.batch_options()?;
    let output_dir = dir.path().join("out");

    let pipeline = BatchPipeline::new(
        LocalStorage::new(dir.path()),
        LocalStorage::new(&output_dir),
        config,
        options,
    )?;
    let err = BatchEngine::new(pipeline).run().await.unwrap_err();

    assert_eq!(err.exit_code(), 1);
    assert!(!output_dir.join(JSON_FILENAME).exists());
    Ok(())
}

#[tokio::test]
async fn test_untabulated_confidence_level_is_a_config_error() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("mixes.csv"), MIXES)?;
    let mut config = write_config(&dir, "")?;
    config.batch.confidence_level = Some(0.85);

    let err = config.validate().unwrap_err();
    assert!(matches!(err, CarbonationError::OutOfTableConfidenceLevel { .. }));
    assert_eq!(err.exit_code(), 2);

    let options = config.batch_options()?;
    let output_dir = dir.path().join("out");
    let built = BatchPipeline::new(
        LocalStorage::new(dir.path()),
        LocalStorage::new(&output_dir),
        config,
        options,
    );
    assert!(matches!(
        built,
        Err(CarbonationError::OutOfTableConfidenceLevel { .. })
    ));
    assert!(!output_dir.join(JSON_FILENAME).exists());
    Ok(())
}

#[tokio::test]
async fn test_catalog_mixes_are_well_graded() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("mixes.csv"), MIXES)?;
    let config = write_config(&dir, "")?;
    let options = config.batch_options()?;

    let pipeline = BatchPipeline::new(
        LocalStorage::new(dir.path()),
        LocalStorage::new(dir.path().join("out")),
        config,
        options,
    )?;
    let _ = BatchEngine::new(pipeline).run().await?;

    let report: BatchReport =
        serde_json::from_str(&fs::read_to_string(dir.path().join("out").join(JSON_FILENAME))?)?;
    let marine = report
        .predictions
        .iter()
        .find(|r| r.id == "Marine")
        .expect("marine row");
    let reference = report
        .predictions
        .iter()
        .find(|r| r.id == "Reference")
        .expect("reference row");

    assert!(marine.prediction.depth_mm < reference.prediction.depth_mm);
    assert!(marine.prediction.precision <= PrecisionLabel::Fair);
    Ok(())
}
