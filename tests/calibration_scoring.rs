use oddsgate::calibration::{
    bucket_calibration, brier_score, expected_calibration_error, log_loss, platt_calibrate,
    CalibrationConfig, CalibrationReport, CalibrationSample, PlattParams,
};
use oddsgate::error::OddsGateError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic, perfectly calibrated sample set: probabilities spread
/// evenly over (0, 1), outcomes assigned by error diffusion so every run of
/// predictions sees positives at its mean rate.
fn diffused_samples(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut carry = 0.0;
    (0..n)
        .map(|i| {
            let p = (i as f64 + 0.5) / n as f64;
            carry += p;
            let y = if carry >= 1.0 {
                carry -= 1.0;
                1.0
            } else {
                0.0
            };
            (p, y)
        })
        .unzip()
}

fn assert_buckets_close(predictions: &[f64], outcomes: &[f64], tolerance: f64) {
    let rows = bucket_calibration(predictions, outcomes, 10);
    assert_eq!(rows.len(), 10);
    for row in rows.iter().filter(|r| r.count >= 30) {
        let gap = row.gap().unwrap();
        assert!(
            gap < tolerance,
            "bucket [{:.1}, {:.1}) gap {gap:.4} over {} samples",
            row.lower,
            row.upper,
            row.count
        );
    }
}

#[test]
fn thousand_calibrated_samples_fill_every_bucket_closely() {
    let (predictions, outcomes) = diffused_samples(1000);
    assert_buckets_close(&predictions, &outcomes, 0.05);

    let rows = bucket_calibration(&predictions, &outcomes, 10);
    assert!(rows.iter().all(|r| r.count == 100));
    assert!(expected_calibration_error(&rows) < 0.05);
}

#[test]
fn seeded_bernoulli_samples_are_calibrated() {
    let mut rng = StdRng::seed_from_u64(2024);
    let (predictions, outcomes): (Vec<f64>, Vec<f64>) = (0..20_000)
        .map(|_| {
            let p: f64 = rng.gen();
            let y = if rng.gen::<f64>() < p { 1.0 } else { 0.0 };
            (p, y)
        })
        .unzip();

    assert_buckets_close(&predictions, &outcomes, 0.05);
}

#[test]
fn brier_and_log_loss_boundaries() {
    assert_eq!(brier_score(&[1.0], &[1.0]), 0.0);
    assert_eq!(brier_score(&[0.0], &[1.0]), 1.0);
    assert!(brier_score(&[], &[]).is_nan());
    assert!(log_loss(&[], &[]).is_nan());

    // clipping keeps certainty-level mistakes finite
    let worst = log_loss(&[0.0], &[1.0]);
    assert!(worst.is_finite());
    assert!(worst > log_loss(&[0.01], &[1.0]));
    assert!(log_loss(&[0.01], &[1.0]) > log_loss(&[0.4], &[1.0]));
}

#[test]
fn platt_identity_and_direction() {
    for p in [0.05, 0.3, 0.5, 0.9] {
        assert!((platt_calibrate(-1.0, 0.0, p) - p).abs() < 1e-9);
    }
    // a positive intercept shifts every probability down
    assert!(platt_calibrate(-1.0, 0.5, 0.6) < 0.6);
    assert!(platt_calibrate(-1.0, -0.5, 0.6) > 0.6);
}

#[test]
fn report_from_json_file() {
    let path = std::env::temp_dir().join(format!("oddsgate-samples-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"[
            {"model_probability": 0.9, "outcome": 1},
            {"model_probability": 0.65, "outcome": 1},
            {"model_probability": 0.4, "outcome": 0},
            {"model_probability": 0.2, "outcome": 1, "timestamp": "2024-02-01T03:00:00Z"}
        ]"#,
    )
    .unwrap();

    let samples = CalibrationSample::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let config = CalibrationConfig { buckets: 4 };
    let report = CalibrationReport::build(&samples, &config, Some(&PlattParams::new(-1.5, 0.0)));
    assert_eq!(report.sample_count, 4);
    assert_eq!(report.raw.buckets.len(), 4);
    assert!((report.raw.accuracy - 0.75).abs() < 1e-12);

    let expected_brier = (0.01 + 0.1225 + 0.16 + 0.64) / 4.0;
    assert!((report.raw.brier_score - expected_brier).abs() < 1e-12);
    assert!((report.raw.reliability - (1.0 - 4.0 * expected_brier)).abs() < 1e-12);
    assert!(report.recalibrated.is_some());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["sample_count"], 4);
    assert!(json["recalibrated"]["params"]["a"].is_number());
}

#[test]
fn malformed_samples_are_rejected() {
    let err = CalibrationSample::from_json(r#"[{"model_probability": 1.5, "outcome": 1}]"#)
        .unwrap_err();
    assert!(matches!(err, OddsGateError::Json(_)));
    assert!(err.to_string().contains("model_probability"));

    assert!(matches!(
        CalibrationSample::new(0.5, 3),
        Err(OddsGateError::InvalidSample(_))
    ));
}
