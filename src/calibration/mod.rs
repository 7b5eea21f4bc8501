//! Probability calibration scoring
//!
//! Brier score, log loss, reliability buckets and Platt recalibration for
//! resolved win-probability predictions.

pub mod buckets;
pub mod platt;
pub mod report;
pub mod sample;
pub mod scoring;

pub use buckets::{
    bucket_calibration, expected_calibration_error, CalibrationBucket, DEFAULT_BUCKETS,
};
pub use platt::{platt_calibrate, CalibratedProbability, ConfidenceLabel, PlattParams};
pub use report::{CalibrationConfig, CalibrationReport, RecalibratedSummary, ScoreSummary};
pub use sample::{split_samples, CalibrationSample};
pub use scoring::{
    accuracy, brier_score, clip_probability, log_loss, logit, reliability_score, EPSILON,
};
