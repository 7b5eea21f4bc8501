use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{OddsGateError, Result};

/// A resolved prediction: the model's probability and what happened.
///
/// Construction and deserialisation reject non-finite or out-of-range
/// probabilities and outcomes other than 0 or 1, so scoring functions only
/// ever see clean pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSample")]
pub struct CalibrationSample {
    model_probability: f64,
    outcome: u8,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    model_probability: f64,
    outcome: f64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

impl TryFrom<RawSample> for CalibrationSample {
    type Error = OddsGateError;

    fn try_from(raw: RawSample) -> Result<Self> {
        let outcome = if raw.outcome == 0.0 {
            0
        } else if raw.outcome == 1.0 {
            1
        } else {
            return Err(OddsGateError::InvalidSample(format!(
                "outcome must be 0 or 1, got {}",
                raw.outcome
            )));
        };
        let sample = Self::new(raw.model_probability, outcome)?;
        Ok(match raw.timestamp {
            Some(at) => sample.at(at),
            None => sample,
        })
    }
}

impl CalibrationSample {
    pub fn new(model_probability: f64, outcome: u8) -> Result<Self> {
        if !model_probability.is_finite() || !(0.0..=1.0).contains(&model_probability) {
            return Err(OddsGateError::InvalidSample(format!(
                "model_probability must be a finite value in [0, 1], got {}",
                model_probability
            )));
        }
        if outcome > 1 {
            return Err(OddsGateError::InvalidSample(format!(
                "outcome must be 0 or 1, got {}",
                outcome
            )));
        }
        Ok(Self {
            model_probability,
            outcome,
            timestamp: None,
        })
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn model_probability(&self) -> f64 {
        self.model_probability
    }

    pub fn outcome(&self) -> u8 {
        self.outcome
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Parse a JSON array of samples
    pub fn from_json(json: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON array of samples from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Split samples into parallel prediction / outcome vectors
pub fn split_samples(samples: &[CalibrationSample]) -> (Vec<f64>, Vec<f64>) {
    samples
        .iter()
        .map(|s| (s.model_probability, f64::from(s.outcome)))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_probability() {
        assert!(CalibrationSample::new(f64::NAN, 1).is_err());
        assert!(CalibrationSample::new(1.2, 1).is_err());
        assert!(CalibrationSample::new(-0.1, 0).is_err());
        assert!(CalibrationSample::new(0.7, 1).is_ok());
    }

    #[test]
    fn test_rejects_bad_outcome() {
        assert!(CalibrationSample::new(0.5, 2).is_err());
        let err = CalibrationSample::from_json(r#"[{"model_probability": 0.5, "outcome": 0.5}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("outcome must be 0 or 1"));
    }

    #[test]
    fn test_parses_json_records() {
        let samples = CalibrationSample::from_json(
            r#"[
                {"model_probability": 0.8, "outcome": 1, "timestamp": "2024-01-01T00:00:00Z"},
                {"model_probability": 0.3, "outcome": 0}
            ]"#,
        )
        .unwrap();

        assert_eq!(samples.len(), 2);
        assert!(samples[0].timestamp().is_some());
        assert_eq!(samples[1].outcome(), 0);

        let (predictions, outcomes) = split_samples(&samples);
        assert_eq!(predictions, vec![0.8, 0.3]);
        assert_eq!(outcomes, vec![1.0, 0.0]);
    }
}
