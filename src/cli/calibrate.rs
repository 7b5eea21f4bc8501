//! `oddsgate calibrate`: score resolved probability predictions.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

use super::output::{self, OutputMode};
use crate::calibration::{
    CalibratedProbability, CalibrationBucket, CalibrationConfig, CalibrationReport,
    CalibrationSample, PlattParams, ScoreSummary,
};
use crate::config::AppConfig;

/// Raw probabilities shown in the recalibration probe table
const PROBE_POINTS: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

#[derive(Args, Debug, Clone)]
pub struct CalibrateArgs {
    /// JSON array of {model_probability, outcome, timestamp?} records
    #[arg(short, long)]
    pub input: PathBuf,
    /// Number of reliability buckets (defaults to config)
    #[arg(long)]
    pub buckets: Option<usize>,
    /// Platt coefficient A
    #[arg(long, requires = "platt_b", allow_hyphen_values = true)]
    pub platt_a: Option<f64>,
    /// Platt coefficient B
    #[arg(long, requires = "platt_a", allow_hyphen_values = true)]
    pub platt_b: Option<f64>,
    /// Load Platt coefficients from a JSON file instead
    #[arg(long, conflicts_with_all = ["platt_a", "platt_b"])]
    pub platt_file: Option<PathBuf>,
    /// Print JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

impl CalibrateArgs {
    fn platt(&self) -> anyhow::Result<Option<PlattParams>> {
        if let Some(path) = &self.platt_file {
            return Ok(Some(PlattParams::from_file(path)?));
        }
        match (self.platt_a, self.platt_b) {
            (Some(a), Some(b)) => {
                let params = PlattParams::new(a, b);
                params.validate()?;
                Ok(Some(params))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct MetricRow {
    pub metric: String,
    pub raw: String,
    pub recalibrated: String,
}

#[derive(Debug, Serialize, Tabled)]
pub struct BucketRow {
    pub range: String,
    pub count: usize,
    pub mean_predicted: String,
    pub mean_observed: String,
    pub gap: String,
}

impl From<&CalibrationBucket> for BucketRow {
    fn from(bucket: &CalibrationBucket) -> Self {
        Self {
            range: format!("[{:.2}, {:.2})", bucket.lower, bucket.upper),
            count: bucket.count,
            mean_predicted: output::fmt_opt(bucket.mean_predicted, 3),
            mean_observed: output::fmt_opt(bucket.mean_observed, 3),
            gap: output::fmt_opt(bucket.gap(), 3),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct ProbeRow {
    pub raw: String,
    pub calibrated: String,
    pub label: String,
}

impl From<CalibratedProbability> for ProbeRow {
    fn from(probe: CalibratedProbability) -> Self {
        Self {
            raw: format!("{:.2}", probe.raw),
            calibrated: format!("{:.3}", probe.calibrated),
            label: probe.label.to_string(),
        }
    }
}

pub fn metric_rows(report: &CalibrationReport) -> Vec<MetricRow> {
    let recal = report.recalibrated.as_ref().map(|r| &r.scores);
    let row = |name: &str, pick: fn(&ScoreSummary) -> f64| MetricRow {
        metric: name.to_string(),
        raw: output::fmt_opt(Some(pick(&report.raw)), 4),
        recalibrated: output::fmt_opt(recal.map(pick), 4),
    };

    vec![
        row("brier", |s| s.brier_score),
        row("log_loss", |s| s.log_loss),
        row("ece", |s| s.expected_calibration_error),
        row("accuracy", |s| s.accuracy),
        row("reliability", |s| s.reliability),
    ]
}

pub fn run(args: CalibrateArgs, config: &AppConfig) -> anyhow::Result<()> {
    let samples = CalibrationSample::from_file(&args.input)?;
    let calibration = CalibrationConfig {
        buckets: args.buckets.unwrap_or(config.calibration.buckets),
    };
    if let Some(problem) = calibration.validate().into_iter().next() {
        anyhow::bail!(problem);
    }
    let platt = args.platt()?;

    let report = CalibrationReport::build(&samples, &calibration, platt.as_ref());

    match OutputMode::from_json_flag(args.json) {
        OutputMode::Json => output::print_json(&report)?,
        OutputMode::Table => {
            println!(
                "{} samples, base rate {}",
                report.sample_count,
                output::fmt_opt(Some(report.base_rate), 3)
            );
            output::print_heading("Scores");
            output::print_items(&metric_rows(&report), OutputMode::Table)?;

            output::print_heading("Reliability buckets");
            let rows: Vec<BucketRow> = report.raw.buckets.iter().map(Into::into).collect();
            output::print_items(&rows, OutputMode::Table)?;

            if let Some(params) = platt {
                output::print_heading("Platt mapping");
                let rows: Vec<ProbeRow> = PROBE_POINTS
                    .iter()
                    .map(|&p| params.calibrate(p).into())
                    .collect();
                output::print_items(&rows, OutputMode::Table)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(platt: Option<&PlattParams>) -> CalibrationReport {
        let samples: Vec<CalibrationSample> = [(0.8, 1), (0.7, 0), (0.3, 0), (0.2, 0)]
            .iter()
            .map(|&(p, y)| CalibrationSample::new(p, y).unwrap())
            .collect();
        CalibrationReport::build(&samples, &CalibrationConfig { buckets: 5 }, platt)
    }

    #[test]
    fn test_metric_rows_without_platt() {
        let rows = metric_rows(&report(None));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].metric, "brier");
        assert!(rows.iter().all(|r| r.recalibrated == "-"));
    }

    #[test]
    fn test_metric_rows_with_platt() {
        let rows = metric_rows(&report(Some(&PlattParams::identity())));
        assert!(rows.iter().all(|r| r.recalibrated != "-"));
        // identity mapping reproduces the raw brier score
        assert_eq!(rows[0].raw, rows[0].recalibrated);
    }

    #[test]
    fn test_bucket_row_for_empty_bucket() {
        let r = report(None);
        let rows: Vec<BucketRow> = r.raw.buckets.iter().map(Into::into).collect();
        assert_eq!(rows.len(), 5);
        // [0.4, 0.6) holds no samples
        assert_eq!(rows[2].count, 0);
        assert_eq!(rows[2].gap, "-");
    }
}
