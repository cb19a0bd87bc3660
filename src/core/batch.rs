use crate::core::predictor::Predictor;
use crate::core::uncertainty::UncertaintyEstimator;
use crate::domain::model::{
    BatchResult, MixField, MixRecord, PrecisionLabel, PredictedRecord, SkippedRecord,
};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::{CarbonationError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const CSV_FILENAME: &str = "predictions.csv";
pub const JSON_FILENAME: &str = "predictions.json";
pub const DEFAULT_ZIP_FILENAME: &str = "predictions.zip";

/// Columns that name a row instead of carrying a mix value.
const ID_COLUMNS: [&str; 2] = ["id", "name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRowPolicy {
    /// Log the row and keep going.
    #[default]
    Skip,
    /// Abort the whole run on the first bad row.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn filename(self) -> &'static str {
        match self {
            OutputFormat::Csv => CSV_FILENAME,
            OutputFormat::Json => JSON_FILENAME,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Input CSV, resolved by the input storage.
    pub input: String,
    pub on_invalid_row: InvalidRowPolicy,
    pub formats: Vec<OutputFormat>,
    /// Bundle the written files into this ZIP when set.
    pub zip_filename: Option<String>,
}

impl BatchOptions {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            on_invalid_row: InvalidRowPolicy::default(),
            formats: vec![OutputFormat::Csv, OutputFormat::Json],
            zip_filename: None,
        }
    }
}

/// Flat CSV row: id, the 13 inputs, then the headline results.
#[derive(Debug, Serialize)]
struct PredictionRow<'a> {
    id: &'a str,
    cement: f64,
    fly_ash: f64,
    water: f64,
    coarse_agg: f64,
    recycled_agg: f64,
    water_absorption: f64,
    fine_agg: f64,
    superplasticizer: f64,
    compressive_strength: f64,
    carbon_concentration: f64,
    exposure_time: f64,
    temperature: f64,
    relative_humidity: f64,
    water_binder: f64,
    fly_ash_fraction: f64,
    recycled_replacement: f64,
    depth_mm: f64,
    lower_bound_mm: f64,
    upper_bound_mm: f64,
    confidence_level: f64,
    z_score: f64,
    total_cv: f64,
    interval_width_mm: f64,
    relative_uncertainty_pct: f64,
    quality_tier: &'a str,
    precision: PrecisionLabel,
    recommendation: &'a str,
}

impl<'a> From<&'a PredictedRecord> for PredictionRow<'a> {
    fn from(record: &'a PredictedRecord) -> Self {
        let mix = &record.mix;
        let p = &record.prediction;
        Self {
            id: &record.id,
            cement: mix.cement,
            fly_ash: mix.fly_ash,
            water: mix.water,
            coarse_agg: mix.coarse_agg,
            recycled_agg: mix.recycled_agg,
            water_absorption: mix.water_absorption,
            fine_agg: mix.fine_agg,
            superplasticizer: mix.superplasticizer,
            compressive_strength: mix.compressive_strength,
            carbon_concentration: mix.carbon_concentration,
            exposure_time: mix.exposure_time,
            temperature: mix.temperature,
            relative_humidity: mix.relative_humidity,
            water_binder: p.ratios.water_binder,
            fly_ash_fraction: p.ratios.fly_ash_fraction,
            recycled_replacement: p.ratios.recycled_replacement,
            depth_mm: p.depth_mm,
            lower_bound_mm: p.lower_bound_mm,
            upper_bound_mm: p.upper_bound_mm,
            confidence_level: p.confidence_level,
            z_score: p.z_score,
            total_cv: p.uncertainty.total_cv,
            interval_width_mm: p.interval_width_mm,
            relative_uncertainty_pct: p.relative_uncertainty_pct,
            quality_tier: &p.uncertainty.quality_tier,
            precision: p.precision,
            recommendation: &p.recommendation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub model: String,
    pub confidence_level: f64,
    pub generated_at: DateTime<Utc>,
    pub total_rows: usize,
    pub predicted_rows: usize,
    pub skipped_rows: usize,
    pub precision_histogram: BTreeMap<PrecisionLabel, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub metadata: ReportMetadata,
    pub predictions: Vec<PredictedRecord>,
    pub skipped: Vec<SkippedRecord>,
}

/// Reads mixes from a CSV, predicts each one and writes the reports.
///
/// `input` resolves the CSV path, `output` receives the report files.
pub struct BatchPipeline<S: Storage, C: ConfigProvider> {
    input: S,
    output: S,
    config: C,
    predictor: Predictor,
    options: BatchOptions,
}

impl<S: Storage, C: ConfigProvider> BatchPipeline<S, C> {
    pub fn new(input: S, output: S, config: C, options: BatchOptions) -> Result<Self> {
        let predictor = Predictor::from_provider(&config)?;
        UncertaintyEstimator::new(&predictor.config().uncertainty)
            .z_score(config.confidence_level())?;
        Ok(Self {
            input,
            output,
            config,
            predictor,
            options,
        })
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    fn parse_csv(&self, data: &[u8]) -> Result<Vec<MixRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();

        let unknown: Vec<&str> = headers
            .iter()
            .map(String::as_str)
            .filter(|h| !ID_COLUMNS.contains(h) && h.parse::<MixField>().is_err())
            .collect();
        if !unknown.is_empty() {
            tracing::warn!("⚠️ Ignoring unknown columns: {}", unknown.join(", "));
        }

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            // header is line 1
            let line = index + 2;
            let mut id = None;
            let mut fields = HashMap::new();

            for (header, value) in headers.iter().zip(row.iter()) {
                if ID_COLUMNS.contains(&header.as_str()) {
                    if !value.is_empty() && id.is_none() {
                        id = Some(value.to_string());
                    }
                } else if !value.is_empty() {
                    fields.insert(
                        header.clone(),
                        serde_json::Value::String(value.to_string()),
                    );
                }
            }

            records.push(MixRecord {
                id: id.unwrap_or_else(|| format!("row-{}", line)),
                line,
                fields,
            });
        }

        Ok(records)
    }

    fn render_csv(&self, predictions: &[PredictedRecord]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in predictions {
            writer.serialize(PredictionRow::from(record))?;
        }
        writer
            .into_inner()
            .map_err(|e| CarbonationError::ProcessingError {
                message: format!("Failed to flush CSV output: {}", e),
            })
    }

    fn build_report(&self, result: BatchResult) -> BatchReport {
        let mut precision_histogram = BTreeMap::new();
        for record in &result.predictions {
            *precision_histogram
                .entry(record.prediction.precision)
                .or_insert(0) += 1;
        }

        BatchReport {
            metadata: ReportMetadata {
                model: self.predictor.config().name.clone(),
                confidence_level: self.config.confidence_level(),
                generated_at: Utc::now(),
                total_rows: result.predictions.len() + result.skipped.len(),
                predicted_rows: result.predictions.len(),
                skipped_rows: result.skipped.len(),
                precision_histogram,
            },
            predictions: result.predictions,
            skipped: result.skipped,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for BatchPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<MixRecord>> {
        tracing::debug!("Reading mixes from {}", self.options.input);
        let data = self.input.read_file(&self.options.input).await?;
        let records = self.parse_csv(&data)?;

        if records.is_empty() {
            tracing::warn!("⚠️ {} contains no data rows", self.options.input);
        }
        Ok(records)
    }

    async fn transform(&self, records: Vec<MixRecord>) -> Result<BatchResult> {
        let confidence_level = self.config.confidence_level();
        let mut predictions = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for record in records {
            match self.predictor.predict_fields(&record.fields, confidence_level) {
                Ok((mix, prediction)) => predictions.push(PredictedRecord {
                    id: record.id,
                    mix,
                    prediction,
                }),
                Err(e) => match self.options.on_invalid_row {
                    InvalidRowPolicy::Skip => {
                        tracing::warn!("⚠️ Skipping line {} ({}): {}", record.line, record.id, e);
                        skipped.push(SkippedRecord {
                            id: record.id,
                            line: record.line,
                            reason: e.to_string(),
                        });
                    }
                    InvalidRowPolicy::Fail => {
                        return Err(CarbonationError::ProcessingError {
                            message: format!("line {} ({}): {}", record.line, record.id, e),
                        });
                    }
                },
            }
        }

        Ok(BatchResult {
            predictions,
            skipped,
        })
    }

    async fn load(&self, result: BatchResult) -> Result<String> {
        let report = self.build_report(result);
        let mut written: Vec<(&str, Vec<u8>)> = Vec::new();

        for format in &self.options.formats {
            let data = match format {
                OutputFormat::Csv => self.render_csv(&report.predictions)?,
                OutputFormat::Json => serde_json::to_vec_pretty(&report)?,
            };
            tracing::debug!("Writing {} ({} bytes)", format.filename(), data.len());
            self.output.write_file(format.filename(), &data).await?;
            written.push((format.filename(), data));
        }

        let Some(zip_filename) = &self.options.zip_filename else {
            return Ok(self.config.output_path().to_string());
        };

        // 打包已輸出的檔案
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, data) in &written {
                zip.start_file::<_, ()>(*name, FileOptions::default())?;
                zip.write_all(data)?;
            }
            zip.finish()?.into_inner()
        };

        tracing::debug!("Writing {} ({} bytes)", zip_filename, zip_data.len());
        self.output.write_file(zip_filename, &zip_data).await?;

        Ok(format!("{}/{}", self.config.output_path(), zip_filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model_config::ModelConfig;
    use crate::domain::model::InputPolicy;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MemoryStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MemoryStorage {
        async fn put(&self, path: &str, data: &str) {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.as_bytes().to_vec());
        }

        async fn get(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().await.get(path).cloned()
        }
    }

    impl Storage for MemoryStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files.lock().await.get(path).cloned().ok_or_else(|| {
                CarbonationError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files
                .lock()
                .await
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct TestConfig;

    impl ConfigProvider for TestConfig {
        fn model_config(&self) -> Result<ModelConfig> {
            Ok(ModelConfig::realistic())
        }

        fn confidence_level(&self) -> f64 {
            0.95
        }

        fn input_policy(&self) -> InputPolicy {
            InputPolicy::default()
        }

        fn output_path(&self) -> &str {
            "out"
        }
    }

    const INPUT: &str = "\
id,cement,fly_ash,water,recycled_agg,compressive_strength
A1,350,50,180,400,35
,320,80,160,300,50
B2,abc,50,180,400,nan
";

    fn pipeline(storage: &MemoryStorage, policy: InvalidRowPolicy) -> BatchPipeline<MemoryStorage, TestConfig> {
        let mut options = BatchOptions::new("mixes.csv");
        options.on_invalid_row = policy;
        BatchPipeline::new(storage.clone(), storage.clone(), TestConfig, options).unwrap()
    }

    #[tokio::test]
    async fn test_extract_reads_ids_and_line_numbers() {
        let storage = MemoryStorage::default();
        storage.put("mixes.csv", INPUT).await;

        let records = pipeline(&storage, InvalidRowPolicy::Skip)
            .extract()
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "A1");
        assert_eq!(records[1].id, "row-3");
        assert_eq!(records[1].line, 3);
        assert!(!records[0].fields.contains_key("coarse_agg"));
    }

    #[tokio::test]
    async fn test_transform_skips_invalid_rows() {
        let storage = MemoryStorage::default();
        storage.put("mixes.csv", INPUT).await;
        let pipeline = pipeline(&storage, InvalidRowPolicy::Skip);

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();

        // "abc" falls back to the default cement, "nan" parses to a non-finite value
        assert_eq!(result.predictions.len(), 2);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].id, "B2");
        assert_eq!(result.skipped[0].line, 4);
    }

    #[tokio::test]
    async fn test_transform_fail_policy_aborts() {
        let storage = MemoryStorage::default();
        storage.put("mixes.csv", INPUT).await;
        let pipeline = pipeline(&storage, InvalidRowPolicy::Fail);

        let records = pipeline.extract().await.unwrap();
        let err = pipeline.transform(records).await.unwrap_err();
        assert!(matches!(err, CarbonationError::ProcessingError { ref message } if message.contains("line 4")));
    }

    #[tokio::test]
    async fn test_load_writes_reports_and_zip() {
        let storage = MemoryStorage::default();
        storage.put("mixes.csv", INPUT).await;
        let mut options = BatchOptions::new("mixes.csv");
        options.zip_filename = Some(DEFAULT_ZIP_FILENAME.to_string());
        let pipeline =
            BatchPipeline::new(storage.clone(), storage.clone(), TestConfig, options).unwrap();

        let records = pipeline.extract().await.unwrap();
        let result = pipeline.transform(records).await.unwrap();
        let location = pipeline.load(result).await.unwrap();
        assert_eq!(location, "out/predictions.zip");

        let csv = String::from_utf8(storage.get(CSV_FILENAME).await.unwrap()).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("id,cement,fly_ash"));
        assert!(lines.next().unwrap().starts_with("A1,350"));

        let report: BatchReport =
            serde_json::from_slice(&storage.get(JSON_FILENAME).await.unwrap()).unwrap();
        assert_eq!(report.metadata.model, "realistic");
        assert_eq!(report.metadata.total_rows, 3);
        assert_eq!(report.metadata.predicted_rows, 2);
        assert_eq!(report.metadata.skipped_rows, 1);
        assert_eq!(report.metadata.precision_histogram.values().sum::<usize>(), 2);

        let zip_data = storage.get(DEFAULT_ZIP_FILENAME).await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
        assert_eq!(archive.len(), 2);
    }
}
