use crate::{AnalysisError, Candle};

/// Check that a candle series is usable: at least `min_bars` bars, strictly
/// ascending timestamps, finite prices with `high >= low`, non-negative volume.
pub fn validate_series(name: &str, candles: &[Candle], min_bars: usize) -> Result<(), AnalysisError> {
    if candles.is_empty() {
        return Err(AnalysisError::InsufficientData(format!("{} series is empty", name)));
    }
    if candles.len() < min_bars {
        return Err(AnalysisError::InsufficientData(format!(
            "{} series has {} bars (need {})",
            name,
            candles.len(),
            min_bars
        )));
    }

    for (i, c) in candles.iter().enumerate() {
        let prices = [c.open, c.high, c.low, c.close];
        if prices.iter().any(|p| !p.is_finite()) || !c.volume.is_finite() {
            return Err(AnalysisError::InvalidData(format!(
                "{} bar {} has a non-finite value",
                name, i
            )));
        }
        if c.high < c.low {
            return Err(AnalysisError::InvalidData(format!(
                "{} bar {} has high {} below low {}",
                name, i, c.high, c.low
            )));
        }
        if c.volume < 0.0 {
            return Err(AnalysisError::InvalidData(format!("{} bar {} has negative volume", name, i)));
        }
    }

    if let Some(i) = candles.windows(2).position(|w| w[1].timestamp <= w[0].timestamp) {
        return Err(AnalysisError::InvalidData(format!(
            "{} timestamps not strictly ascending at bar {}",
            name,
            i + 1
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(count: usize) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| Candle {
                timestamp: start + Duration::minutes(15 * i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn test_valid_series() {
        assert!(validate_series("exec", &bars(60), 60).is_ok());
    }

    #[test]
    fn test_empty_and_short_series() {
        assert!(matches!(
            validate_series("1h", &[], 200),
            Err(AnalysisError::InsufficientData(_))
        ));
        assert!(matches!(
            validate_series("1h", &bars(199), 200),
            Err(AnalysisError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let mut series = bars(10);
        series[5].timestamp = series[4].timestamp;
        assert!(matches!(
            validate_series("exec", &series, 1),
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[test]
    fn test_inverted_bar_rejected() {
        let mut series = bars(10);
        series[3].high = 90.0;
        assert!(validate_series("exec", &series, 1).is_err());
    }

    #[test]
    fn test_nan_rejected() {
        let mut series = bars(10);
        series[2].close = f64::NAN;
        assert!(validate_series("exec", &series, 1).is_err());
    }
}
