use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

/// Runs a [`Pipeline`] through extract, transform and load.
pub struct BatchEngine<P: Pipeline> {
    pipeline: P,
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub output: String,
    pub extracted: usize,
    pub predicted: usize,
    pub skipped: usize,
}

impl<P: Pipeline> BatchEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        tracing::info!("🚀 Starting batch prediction");

        tracing::info!("📥 Extracting mixes...");
        let records = self.pipeline.extract().await?;
        let extracted = records.len();
        tracing::info!("📥 Extracted {} mixes", extracted);

        tracing::info!("🧮 Predicting carbonation depth...");
        let result = self.pipeline.transform(records).await?;
        let predicted = result.predictions.len();
        let skipped = result.skipped.len();
        if skipped > 0 {
            tracing::warn!("⚠️ {} of {} rows skipped", skipped, extracted);
        }
        tracing::info!("🧮 Predicted {} mixes", predicted);

        tracing::info!("💾 Writing reports...");
        let output = self.pipeline.load(result).await?;
        tracing::info!(
            "✅ Batch finished in {:.2?}, output: {}",
            started.elapsed(),
            output
        );

        Ok(RunSummary {
            output,
            extracted,
            predicted,
            skipped,
        })
    }
}
