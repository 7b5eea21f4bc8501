use serde::{Deserialize, Serialize};

pub const DEFAULT_BUCKETS: usize = 10;

/// One equal-width probability bin of a reliability diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// `None` when the bucket is empty
    pub mean_predicted: Option<f64>,
    pub mean_observed: Option<f64>,
}

impl CalibrationBucket {
    /// Absolute gap between predicted and observed frequency
    pub fn gap(&self) -> Option<f64> {
        match (self.mean_predicted, self.mean_observed) {
            (Some(p), Some(o)) => Some((p - o).abs()),
            _ => None,
        }
    }
}

fn bucket_index(p: f64, buckets: usize) -> usize {
    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
    ((p * buckets as f64).floor() as usize).min(buckets - 1)
}

/// Partition `[0, 1]` into `buckets` equal bins and report per-bin means.
///
/// A prediction of exactly 1.0 lands in the last bin. Slices of different
/// lengths produce no buckets, so the expected calibration error is NaN as
/// for the other scores.
pub fn bucket_calibration(
    predictions: &[f64],
    outcomes: &[f64],
    buckets: usize,
) -> Vec<CalibrationBucket> {
    if buckets == 0 || predictions.len() != outcomes.len() {
        return Vec::new();
    }

    let mut sums = vec![(0usize, 0.0f64, 0.0f64); buckets];
    for (&p, &y) in predictions.iter().zip(outcomes) {
        let slot = &mut sums[bucket_index(p, buckets)];
        slot.0 += 1;
        slot.1 += p;
        slot.2 += y;
    }

    let width = 1.0 / buckets as f64;
    sums.into_iter()
        .enumerate()
        .map(|(i, (count, pred_sum, obs_sum))| {
            let (mean_predicted, mean_observed) = if count == 0 {
                (None, None)
            } else {
                (
                    Some(pred_sum / count as f64),
                    Some(obs_sum / count as f64),
                )
            };
            CalibrationBucket {
                lower: i as f64 * width,
                upper: if i + 1 == buckets {
                    1.0
                } else {
                    (i + 1) as f64 * width
                },
                count,
                mean_predicted,
                mean_observed,
            }
        })
        .collect()
}

/// Count-weighted mean of per-bucket gaps. NaN when every bucket is empty.
pub fn expected_calibration_error(buckets: &[CalibrationBucket]) -> f64 {
    let total: usize = buckets.iter().map(|b| b.count).sum();
    if total == 0 {
        return f64::NAN;
    }
    let weighted: f64 = buckets
        .iter()
        .filter_map(|b| b.gap().map(|gap| gap * b.count as f64))
        .sum();
    weighted / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_edges() {
        let rows = bucket_calibration(&[0.0, 0.1, 0.95, 1.0], &[0.0, 0.0, 1.0, 1.0], 10);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].count, 1);
        assert_eq!(rows[1].count, 1);
        assert_eq!(rows[9].count, 2);
        assert_eq!(rows[9].upper, 1.0);
        assert_eq!(rows.iter().map(|r| r.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_empty_buckets_have_no_means() {
        let rows = bucket_calibration(&[0.25], &[1.0], 4);
        assert_eq!(rows[1].count, 1);
        assert_eq!(rows[1].mean_predicted, Some(0.25));
        assert_eq!(rows[1].mean_observed, Some(1.0));
        assert!(rows[0].mean_predicted.is_none());
        assert!(rows[0].gap().is_none());
    }

    #[test]
    fn test_zero_buckets() {
        assert!(bucket_calibration(&[0.5], &[1.0], 0).is_empty());
    }

    #[test]
    fn test_mismatched_lengths_match_scoring_policy() {
        let rows = bucket_calibration(&[0.2, 0.7], &[1.0], 10);
        assert!(rows.is_empty());
        assert!(expected_calibration_error(&rows).is_nan());
        assert!(crate::calibration::brier_score(&[0.2, 0.7], &[1.0]).is_nan());
    }

    #[test]
    fn test_ece() {
        // bucket [0.5, 1.0): predicted 0.75, observed 0.5 -> gap 0.25
        // bucket [0.0, 0.5): predicted 0.25, observed 0.0 -> gap 0.25
        let rows = bucket_calibration(&[0.75, 0.75, 0.25, 0.25], &[1.0, 0.0, 0.0, 0.0], 2);
        assert!((expected_calibration_error(&rows) - 0.25).abs() < 1e-12);
        assert!(expected_calibration_error(&bucket_calibration(&[], &[], 10)).is_nan());
    }
}
