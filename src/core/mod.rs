pub mod batch;
pub mod catalog;
pub mod depth;
pub mod engine;
pub mod model_config;
pub mod predictor;
pub mod sweep;
pub mod uncertainty;

pub use crate::domain::model::{MixDesign, MixField, Prediction};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
