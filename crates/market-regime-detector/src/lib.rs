use serde::{Deserialize, Serialize};
use signal_core::{validate_series, AnalysisError, Bias, Candle};
use technical_analysis::{adx, closes, ema, last_value};
use tracing::debug;

pub const EMA_PERIOD: usize = 200;
pub const ADX_PERIOD: usize = 14;
pub const ADX_TREND_THRESHOLD: f64 = 20.0;
pub const MIN_REGIME_BARS: usize = 200;

/// Market regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    /// Higher timeframe is trending strongly enough to trade with
    Trend,
    /// Higher timeframe trend strength is below threshold
    Range,
}

impl MarketRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketRegime::Trend => "TREND",
            MarketRegime::Range => "RANGE",
        }
    }
}

/// Regime + directional bias from the 1h / 4h pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeResult {
    pub market_regime: MarketRegime,
    pub bias: Bias,
    pub adx_1h: f64,
    pub adx_4h: f64,
    pub ema200_1h: f64,
    pub ema200_4h: f64,
    pub price_1h: f64,
    pub price_4h: f64,
}

impl RegimeResult {
    /// The two-timeframe EMA agreement rule without the ADX strength filter.
    pub fn directional_bias_ignoring_strength(&self) -> Bias {
        ema_agreement_bias(self.price_1h, self.ema200_1h, self.price_4h, self.ema200_4h)
    }

    /// Weaker of the two ADX readings
    pub fn min_adx(&self) -> f64 {
        self.adx_1h.min(self.adx_4h)
    }
}

/// LONG only when both closes sit above their EMA, SHORT only when both sit
/// below; anything else (including equality) is NEUTRAL.
pub fn ema_agreement_bias(price_1h: f64, ema_1h: f64, price_4h: f64, ema_4h: f64) -> Bias {
    if price_4h > ema_4h && price_1h > ema_1h {
        Bias::Long
    } else if price_4h < ema_4h && price_1h < ema_1h {
        Bias::Short
    } else {
        Bias::Neutral
    }
}

/// Higher-timeframe regime classifier.
///
/// The 4h ADX is the authoritative trend filter: below the threshold the
/// regime is RANGE with a NEUTRAL bias no matter what the 1h says.
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    ema_period: usize,
    adx_period: usize,
    adx_threshold: f64,
    min_bars: usize,
}

impl RegimeClassifier {
    pub fn new() -> Self {
        Self {
            ema_period: EMA_PERIOD,
            adx_period: ADX_PERIOD,
            adx_threshold: ADX_TREND_THRESHOLD,
            min_bars: MIN_REGIME_BARS,
        }
    }

    pub fn with_adx_threshold(mut self, threshold: f64) -> Self {
        self.adx_threshold = threshold;
        self
    }

    pub fn adx_threshold(&self) -> f64 {
        self.adx_threshold
    }

    pub fn min_bars(&self) -> usize {
        self.min_bars
    }

    pub fn classify(&self, bars_1h: &[Candle], bars_4h: &[Candle]) -> Result<RegimeResult, AnalysisError> {
        validate_series("1h", bars_1h, self.min_bars)?;
        validate_series("4h", bars_4h, self.min_bars)?;

        let (ema200_1h, adx_1h, price_1h) = self.timeframe_metrics("1h", bars_1h)?;
        let (ema200_4h, adx_4h, price_4h) = self.timeframe_metrics("4h", bars_4h)?;

        let (market_regime, bias) = if adx_4h < self.adx_threshold {
            (MarketRegime::Range, Bias::Neutral)
        } else {
            (
                MarketRegime::Trend,
                ema_agreement_bias(price_1h, ema200_1h, price_4h, ema200_4h),
            )
        };

        debug!(
            adx_1h,
            adx_4h,
            ema200_1h,
            ema200_4h,
            regime = market_regime.as_str(),
            bias = bias.as_str(),
            "regime classified"
        );

        Ok(RegimeResult {
            market_regime,
            bias,
            adx_1h,
            adx_4h,
            ema200_1h,
            ema200_4h,
            price_1h,
            price_4h,
        })
    }

    /// (EMA, ADX, last close) for one timeframe
    fn timeframe_metrics(&self, name: &str, bars: &[Candle]) -> Result<(f64, f64, f64), AnalysisError> {
        let close = closes(bars);
        let ema_value = last_value(&ema(&close, self.ema_period)).ok_or_else(|| {
            AnalysisError::InsufficientData(format!("{} EMA{} not computable", name, self.ema_period))
        })?;
        let adx_value = last_value(&adx(bars, self.adx_period).adx).ok_or_else(|| {
            AnalysisError::InsufficientData(format!("{} ADX{} not computable", name, self.adx_period))
        })?;
        let price = last_value(&close)
            .ok_or_else(|| AnalysisError::InvalidData(format!("{} has no finite close", name)))?;

        Ok((ema_value, adx_value, price))
    }
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self::new()
    }
}
