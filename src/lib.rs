//! Carbonation depth of recycled aggregate concrete.
//!
//! A modified Papadakis estimate `x = k_eff · √t` whose coefficient is
//! corrected for recycled aggregate, strength, fly ash and the exposure
//! environment, together with a confidence interval built from a
//! coefficient-of-variation model and a qualitative precision label.
//!
//! ```no_run
//! use rac_carbonation::{MixDesign, ModelConfig, Predictor};
//!
//! let predictor = Predictor::new(ModelConfig::realistic())?;
//! let prediction = predictor.predict(&MixDesign::default(), 0.95)?;
//! println!("{:.2} mm ({})", prediction.depth_mm, prediction.precision);
//! # Ok::<(), rac_carbonation::CarbonationError>(())
//! ```

pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, ReportFormat};
pub use config::{LocalStorage, TomlConfig};

pub use core::batch::{BatchOptions, BatchPipeline};
pub use core::engine::BatchEngine;
pub use core::model_config::ModelConfig;
pub use core::predictor::Predictor;
pub use domain::model::{MixDesign, MixField, PrecisionLabel, Prediction};
pub use utils::error::{CarbonationError, Result};
