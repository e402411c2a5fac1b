//! Sentiment Momentum
//!
//! Compares the unweighted mean score of the newer half of the news flow with
//! the older half to tell whether sentiment is improving or deteriorating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of sentiment change between the older and newer halves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentMomentum {
    pub rising: bool,
    pub falling: bool,
    /// newer mean - older mean; `None` when too few items to compare
    pub delta: Option<f64>,
}

impl SentimentMomentum {
    pub fn flat() -> Self {
        Self { rising: false, falling: false, delta: None }
    }
}

pub(crate) fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Split time-sorted scores into halves (older gets `n / 2`) and compare means.
pub fn compute_momentum(
    points: &[(DateTime<Utc>, f64)],
    threshold: f64,
    min_items: usize,
) -> SentimentMomentum {
    if points.len() < min_items.max(2) {
        return SentimentMomentum::flat();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(ts, _)| *ts);
    let scores: Vec<f64> = sorted.iter().map(|(_, s)| *s).collect();

    let mid = scores.len() / 2;
    let older = mean(&scores[..mid]);
    let recent = mean(&scores[mid..]);
    let delta = recent - older;

    SentimentMomentum {
        rising: delta > threshold,
        falling: delta < -threshold,
        delta: Some(delta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn points(scores: &[f64]) -> Vec<(DateTime<Utc>, f64)> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| (start + Duration::hours(i as i64), *s))
            .collect()
    }

    #[test]
    fn test_rising() {
        let m = compute_momentum(&points(&[0.1, 0.2, 0.6, 0.7]), 0.05, 4);
        assert!(m.rising);
        assert!(!m.falling);
        assert!((m.delta.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_falling_regardless_of_input_order() {
        let mut pts = points(&[0.5, 0.4, -0.2, -0.3]);
        pts.reverse();
        let m = compute_momentum(&pts, 0.05, 4);
        assert!(m.falling);
        assert!(!m.rising);
    }

    #[test]
    fn test_small_change_is_flat() {
        let m = compute_momentum(&points(&[0.5, 0.5, 0.52, 0.53]), 0.05, 4);
        assert!(!m.rising && !m.falling);
    }

    #[test]
    fn test_too_few_items_is_flat() {
        let m = compute_momentum(&points(&[0.0, 0.9, 0.9]), 0.05, 4);
        assert_eq!(m, SentimentMomentum::flat());
    }

    #[test]
    fn test_odd_count_gives_newer_half_the_extra_item() {
        // older = [0.0, 0.0], newer = [0.3, 0.3, 0.3]
        let m = compute_momentum(&points(&[0.0, 0.0, 0.3, 0.3, 0.3]), 0.05, 4);
        assert!((m.delta.unwrap() - 0.3).abs() < 1e-9);
    }
}
