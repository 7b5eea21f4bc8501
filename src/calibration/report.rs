use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::buckets::{bucket_calibration, expected_calibration_error, CalibrationBucket};
use super::platt::PlattParams;
use super::sample::{split_samples, CalibrationSample};
use super::scoring::{accuracy, brier_score, log_loss, reliability_score};

/// Calibration report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_buckets")]
    pub buckets: usize,
}

fn default_buckets() -> usize {
    super::buckets::DEFAULT_BUCKETS
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            buckets: default_buckets(),
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Vec<String> {
        if self.buckets == 0 {
            vec!["calibration.buckets must be at least 1".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Headline scores for one set of predictions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub brier_score: f64,
    pub log_loss: f64,
    pub expected_calibration_error: f64,
    pub accuracy: f64,
    pub reliability: f64,
    pub buckets: Vec<CalibrationBucket>,
}

impl ScoreSummary {
    pub fn compute(predictions: &[f64], outcomes: &[f64], buckets: usize) -> Self {
        let brier = brier_score(predictions, outcomes);
        let rows = bucket_calibration(predictions, outcomes, buckets);
        Self {
            brier_score: brier,
            log_loss: log_loss(predictions, outcomes),
            expected_calibration_error: expected_calibration_error(&rows),
            accuracy: accuracy(predictions, outcomes),
            reliability: reliability_score(brier),
            buckets: rows,
        }
    }
}

/// Scores after passing predictions through Platt scaling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecalibratedSummary {
    pub params: PlattParams,
    pub scores: ScoreSummary,
}

/// Full evaluation of a resolved sample set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub sample_count: usize,
    pub base_rate: f64,
    pub raw: ScoreSummary,
    pub recalibrated: Option<RecalibratedSummary>,
    pub generated_at: DateTime<Utc>,
}

impl CalibrationReport {
    pub fn build(
        samples: &[CalibrationSample],
        config: &CalibrationConfig,
        platt: Option<&PlattParams>,
    ) -> Self {
        let (predictions, outcomes) = split_samples(samples);
        let base_rate = if outcomes.is_empty() {
            f64::NAN
        } else {
            outcomes.iter().sum::<f64>() / outcomes.len() as f64
        };

        let raw = ScoreSummary::compute(&predictions, &outcomes, config.buckets);
        let recalibrated = platt.map(|params| RecalibratedSummary {
            params: *params,
            scores: ScoreSummary::compute(
                &params.apply_all(&predictions),
                &outcomes,
                config.buckets,
            ),
        });

        tracing::debug!(
            samples = samples.len(),
            brier = raw.brier_score,
            ece = raw.expected_calibration_error,
            "Built calibration report"
        );

        Self {
            sample_count: samples.len(),
            base_rate,
            raw,
            recalibrated,
            generated_at: Utc::now(),
        }
    }

    /// Whether recalibration lowered the Brier score
    pub fn platt_improves(&self) -> Option<bool> {
        self.recalibrated
            .as_ref()
            .map(|r| r.scores.brier_score < self.raw.brier_score)
    }
}
