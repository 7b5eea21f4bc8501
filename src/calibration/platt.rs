//! Platt scaling
//!
//! Maps a raw model probability through a fitted sigmoid on its log-odds:
//! `p' = 1 / (1 + exp(a * logit(p) + b))`. With `a = -1, b = 0` the mapping
//! is the identity.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::scoring::logit;
use crate::error::{OddsGateError, Result};

/// Fitted Platt coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattParams {
    pub a: f64,
    pub b: f64,
    /// Number of samples the coefficients were fitted on, if recorded
    #[serde(default)]
    pub sample_count: Option<u64>,
}

/// A probability before and after recalibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibratedProbability {
    pub raw: f64,
    pub calibrated: f64,
    pub label: ConfidenceLabel,
}

impl PlattParams {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            a,
            b,
            sample_count: None,
        }
    }

    pub fn identity() -> Self {
        Self::new(-1.0, 0.0)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.a.is_finite() || !self.b.is_finite() {
            return Err(OddsGateError::Validation(format!(
                "platt coefficients must be finite (a={}, b={})",
                self.a, self.b
            )));
        }
        Ok(())
    }

    /// Load coefficients from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }

    pub fn apply(&self, p: f64) -> f64 {
        platt_calibrate(self.a, self.b, p)
    }

    pub fn apply_all(&self, predictions: &[f64]) -> Vec<f64> {
        predictions.iter().map(|&p| self.apply(p)).collect()
    }

    /// Recalibrate and attach a confidence band
    pub fn calibrate(&self, p: f64) -> CalibratedProbability {
        let calibrated = self.apply(p);
        CalibratedProbability {
            raw: p,
            calibrated,
            label: ConfidenceLabel::for_probability(calibrated),
        }
    }
}

pub fn platt_calibrate(a: f64, b: f64, p: f64) -> f64 {
    let z = a * logit(p) + b;
    1.0 / (1.0 + z.exp())
}

/// Human-readable band for a win probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    StrongAgainst,
    LeanAgainst,
    TossUp,
    LeanTowards,
    Confident,
    HighConfidence,
    VeryHighConfidence,
}

impl ConfidenceLabel {
    pub fn for_probability(p: f64) -> Self {
        if p < 0.35 {
            ConfidenceLabel::StrongAgainst
        } else if p < 0.45 {
            ConfidenceLabel::LeanAgainst
        } else if p < 0.55 {
            ConfidenceLabel::TossUp
        } else if p < 0.65 {
            ConfidenceLabel::LeanTowards
        } else if p < 0.75 {
            ConfidenceLabel::Confident
        } else if p < 0.85 {
            ConfidenceLabel::HighConfidence
        } else {
            ConfidenceLabel::VeryHighConfidence
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::StrongAgainst => "strong against",
            ConfidenceLabel::LeanAgainst => "lean against",
            ConfidenceLabel::TossUp => "toss-up",
            ConfidenceLabel::LeanTowards => "lean towards",
            ConfidenceLabel::Confident => "confident",
            ConfidenceLabel::HighConfidence => "high confidence",
            ConfidenceLabel::VeryHighConfidence => "very high confidence",
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
