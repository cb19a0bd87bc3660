use crate::core::predictor::Predictor;
use crate::domain::model::{MixDesign, MixField, Prediction};
use crate::utils::error::{CarbonationError, Result};
use serde::Serialize;
use std::str::FromStr;

/// Upper bound on the number of points in one sweep.
pub const MAX_SWEEP_STEPS: usize = 10_000;

/// Evenly spaced values from `start` to `end` inclusive, `steps` points in total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRange {
    pub start: f64,
    pub end: f64,
    pub steps: usize,
}

impl SweepRange {
    pub fn new(start: f64, end: f64, steps: usize) -> Result<Self> {
        for (name, value) in [("start", start), ("end", end)] {
            if !value.is_finite() {
                return Err(CarbonationError::InvalidInput {
                    field: format!("sweep.{}", name),
                    value: value.to_string(),
                    reason: "Sweep bounds must be finite".to_string(),
                });
            }
        }
        if steps == 0 {
            return Err(CarbonationError::InvalidInput {
                field: "sweep.steps".to_string(),
                value: "0".to_string(),
                reason: "A sweep needs at least one point".to_string(),
            });
        }
        if steps > MAX_SWEEP_STEPS {
            return Err(CarbonationError::InvalidInput {
                field: "sweep.steps".to_string(),
                value: steps.to_string(),
                reason: format!("A sweep allows at most {} points", MAX_SWEEP_STEPS),
            });
        }
        Ok(Self { start, end, steps })
    }

    pub fn values(&self) -> Vec<f64> {
        if self.steps == 1 {
            return vec![self.start];
        }
        let step = (self.end - self.start) / (self.steps - 1) as f64;
        (0..self.steps)
            .map(|i| {
                if i == self.steps - 1 {
                    self.end
                } else {
                    self.start + step * i as f64
                }
            })
            .collect()
    }
}

impl FromStr for SweepRange {
    type Err = CarbonationError;

    /// `start:end:steps`, e.g. `0:1280:9`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| CarbonationError::InvalidInput {
            field: "sweep".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let [start, end, steps] = parts.as_slice() else {
            return Err(invalid("Expected start:end:steps"));
        };
        let start = start
            .parse::<f64>()
            .map_err(|_| invalid("Sweep start is not a number"))?;
        let end = end
            .parse::<f64>()
            .map_err(|_| invalid("Sweep end is not a number"))?;
        let steps = steps
            .parse::<usize>()
            .map_err(|_| invalid("Sweep steps must be a positive integer"))?;

        SweepRange::new(start, end, steps)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    pub field: MixField,
    pub value: f64,
    pub prediction: Prediction,
}

/// Predicts `base` with `field` replaced by each value of `range`.
pub fn sweep(
    predictor: &Predictor,
    base: &MixDesign,
    field: MixField,
    range: SweepRange,
    confidence_level: f64,
) -> Result<Vec<SweepPoint>> {
    tracing::info!(
        "🔁 Sweeping {} from {} to {} {} ({} points)",
        field,
        range.start,
        range.end,
        field.unit(),
        range.steps
    );

    let range = SweepRange::new(range.start, range.end, range.steps)?;
    range
        .values()
        .into_iter()
        .map(|value| {
            let mut mix = *base;
            mix.set(field, value);
            let prediction = predictor.predict(&mix, confidence_level)?;
            Ok(SweepPoint {
                field,
                value,
                prediction,
            })
        })
        .collect()
}
