//! Proper scoring rules for binary probability forecasts

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` before taking logs
pub const EPSILON: f64 = 1e-12;

pub fn clip_probability(p: f64) -> f64 {
    p.clamp(EPSILON, 1.0 - EPSILON)
}

/// Log-odds of a (clipped) probability
pub fn logit(p: f64) -> f64 {
    let p = clip_probability(p);
    (p / (1.0 - p)).ln()
}

fn paired_len(predictions: &[f64], outcomes: &[f64]) -> Option<usize> {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        None
    } else {
        Some(predictions.len())
    }
}

/// Mean squared error between predictions and 0/1 outcomes.
///
/// Returns NaN for empty or mismatched inputs.
pub fn brier_score(predictions: &[f64], outcomes: &[f64]) -> f64 {
    let Some(n) = paired_len(predictions, outcomes) else {
        return f64::NAN;
    };
    let total: f64 = predictions
        .iter()
        .zip(outcomes)
        .map(|(p, y)| (p - y).powi(2))
        .sum();
    total / n as f64
}

/// Mean binary cross-entropy with clipped predictions.
///
/// Returns NaN for empty or mismatched inputs.
pub fn log_loss(predictions: &[f64], outcomes: &[f64]) -> f64 {
    let Some(n) = paired_len(predictions, outcomes) else {
        return f64::NAN;
    };
    let total: f64 = predictions
        .iter()
        .zip(outcomes)
        .map(|(&p, &y)| {
            let p = clip_probability(p);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / n as f64
}

/// Share of predictions on the correct side of 0.5
pub fn accuracy(predictions: &[f64], outcomes: &[f64]) -> f64 {
    let Some(n) = paired_len(predictions, outcomes) else {
        return f64::NAN;
    };
    let hits = predictions
        .iter()
        .zip(outcomes)
        .filter(|(&p, &y)| (p >= 0.5) == (y >= 0.5))
        .count();
    hits as f64 / n as f64
}

/// `1 - 4 * brier` clamped to `[0, 1]`: 1 is perfect, 0 is no better than a coin flip
pub fn reliability_score(brier: f64) -> f64 {
    (1.0 - 4.0 * brier).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brier_extremes() {
        assert_eq!(brier_score(&[1.0], &[1.0]), 0.0);
        assert_eq!(brier_score(&[0.0], &[1.0]), 1.0);
        assert!((brier_score(&[0.5, 0.5], &[1.0, 0.0]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_empty_or_mismatched_is_nan() {
        assert!(brier_score(&[], &[]).is_nan());
        assert!(log_loss(&[0.5], &[]).is_nan());
        assert!(accuracy(&[0.5, 0.6], &[1.0]).is_nan());
    }

    #[test]
    fn test_log_loss_grows_with_confident_mistakes() {
        let losses: Vec<f64> = [0.6, 0.9, 0.99, 0.999_999]
            .iter()
            .map(|&p| log_loss(&[p], &[0.0]))
            .collect();
        for pair in losses.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_log_loss_is_finite_at_certainty() {
        let loss = log_loss(&[1.0], &[0.0]);
        assert!(loss.is_finite());
        assert!((loss - 27.631).abs() < 1e-2);
        assert!(log_loss(&[1.0], &[1.0]) < 1e-9);
    }

    #[test]
    fn test_clip_and_logit() {
        assert_eq!(clip_probability(0.0), EPSILON);
        assert_eq!(clip_probability(1.0), 1.0 - EPSILON);
        assert_eq!(logit(0.5), 0.0);
        assert!(logit(0.0).is_finite());
        assert!((logit(0.75) - 3f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_and_reliability() {
        assert_eq!(accuracy(&[0.8, 0.3, 0.6], &[1.0, 0.0, 0.0]), 2.0 / 3.0);
        assert_eq!(reliability_score(0.0), 1.0);
        assert_eq!(reliability_score(0.25), 0.0);
        assert_eq!(reliability_score(0.6), 0.0);
        assert!((reliability_score(0.2) - 0.2).abs() < 1e-12);
    }
}
