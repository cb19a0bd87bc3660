use crate::core::model_config::ModelConfig;
use crate::domain::model::{BatchResult, InputPolicy, MixRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Settings shared by every front end that drives the predictor.
pub trait ConfigProvider: Send + Sync {
    fn model_config(&self) -> Result<ModelConfig>;
    fn confidence_level(&self) -> f64;
    fn input_policy(&self) -> InputPolicy;
    fn output_path(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<MixRecord>>;
    async fn transform(&self, records: Vec<MixRecord>) -> Result<BatchResult>;
    async fn load(&self, result: BatchResult) -> Result<String>;
}
