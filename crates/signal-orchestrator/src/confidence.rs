use market_regime_detector::ADX_TREND_THRESHOLD;

/// Multiplier applied when structure only confirmed through the BOS-only path
pub const FALLBACK_CONFIDENCE_FACTOR: f64 = 0.55;
pub const FALLBACK_CONFIDENCE_FLOOR: u8 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfidenceInputs {
    /// Aggregate score when the sentiment gate is in use
    pub sentiment: Option<f64>,
    pub adx_1h: f64,
    pub adx_4h: f64,
    pub volume: Option<f64>,
    pub volume_avg: Option<f64>,
    pub bos_fallback: bool,
}

/// 0-100 conviction: sentiment magnitude (up to 50), ADX strength above the
/// trend threshold (up to 30), last-bar volume expansion (up to 20).
pub fn confidence_score(inputs: &ConfidenceInputs) -> u8 {
    let sentiment_part = inputs.sentiment.map_or(0.0, |s| (s.abs() * 50.0).min(50.0));

    let min_adx = inputs.adx_1h.min(inputs.adx_4h);
    let adx_part = ((min_adx - ADX_TREND_THRESHOLD) * 1.5).clamp(0.0, 30.0);

    let ratio = match (inputs.volume, inputs.volume_avg) {
        (Some(v), Some(avg)) if avg > 0.0 => v / avg,
        _ => 1.0,
    };
    let volume_part = ((ratio - 1.0) * 20.0).clamp(0.0, 20.0);

    let total = (sentiment_part + adx_part + volume_part).round().clamp(0.0, 100.0);
    let score = total as u8;

    if inputs.bos_fallback {
        ((score as f64 * FALLBACK_CONFIDENCE_FACTOR).round() as u8).max(FALLBACK_CONFIDENCE_FLOOR)
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        let inputs = ConfidenceInputs {
            sentiment: Some(-0.7),
            adx_1h: 40.0,
            adx_4h: 28.0,
            volume: Some(1300.0),
            volume_avg: Some(1000.0),
            bos_fallback: false,
        };
        // 35 + 12 + 6
        assert_eq!(confidence_score(&inputs), 53);
    }

    #[test]
    fn test_caps() {
        let inputs = ConfidenceInputs {
            sentiment: Some(1.0),
            adx_1h: 90.0,
            adx_4h: 95.0,
            volume: Some(10_000.0),
            volume_avg: Some(100.0),
            bos_fallback: false,
        };
        assert_eq!(confidence_score(&inputs), 100);
    }

    #[test]
    fn test_weak_trend_and_missing_volume_contribute_nothing() {
        let inputs = ConfidenceInputs {
            adx_1h: 15.0,
            adx_4h: 50.0,
            volume: Some(500.0),
            volume_avg: Some(0.0),
            ..Default::default()
        };
        assert_eq!(confidence_score(&inputs), 0);
    }

    #[test]
    fn test_fallback_penalty_and_floor() {
        let strong = ConfidenceInputs { adx_1h: 40.0, adx_4h: 40.0, bos_fallback: true, ..Default::default() };
        // round(30 * 0.55) = 17 (16.5 rounds away from zero)
        assert_eq!(confidence_score(&strong), 17);

        let weak = ConfidenceInputs { adx_1h: 10.0, adx_4h: 10.0, bos_fallback: true, ..Default::default() };
        assert_eq!(confidence_score(&weak), 5);
    }
}
