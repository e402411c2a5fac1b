use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// OHLCV candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// A news item that an upstream model has already scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Raw score in [-1, 1]
    pub sentiment_score: f64,
    /// Model confidence in [0, 1]
    #[serde(default)]
    pub sentiment_confidence: f64,
}

/// Bar interval. Regime analysis always runs on `H1` + `H4`; the execution
/// timeframe is chosen per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
        }
    }

    /// Duration covered by one bar
    pub fn to_duration(&self) -> Duration {
        match self {
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
        }
    }

    pub fn all() -> [Timeframe; 4] {
        [Timeframe::M5, Timeframe::M15, Timeframe::H1, Timeframe::H4]
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::M15
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "5m" | "5min" => Ok(Timeframe::M5),
            "15m" | "15min" => Ok(Timeframe::M15),
            "1h" | "1hour" | "60m" => Ok(Timeframe::H1),
            "4h" | "4hour" => Ok(Timeframe::H4),
            other => Err(AnalysisError::ConfigError(format!("unknown timeframe '{}'", other))),
        }
    }
}

/// Directional lean produced by regime analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bias {
    Long,
    Short,
    Neutral,
}

impl Bias {
    pub fn side(&self) -> Option<Side> {
        match self {
            Bias::Long => Some(Side::Long),
            Bias::Short => Some(Side::Short),
            Bias::Neutral => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Bias::Long => "LONG",
            Bias::Short => "SHORT",
            Bias::Neutral => "NEUTRAL",
        }
    }
}

/// A resolved trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

impl From<Side> for Bias {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => Bias::Long,
            Side::Short => Bias::Short,
        }
    }
}

/// Named bundle of strictness defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Strict,
    Balanced,
    Aggressive,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Strict => "strict",
            Preset::Balanced => "balanced",
            Preset::Aggressive => "aggressive",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Preset::Balanced
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Preset::Strict),
            "balanced" | "" => Ok(Preset::Balanced),
            "aggressive" => Ok(Preset::Aggressive),
            other => Err(AnalysisError::ConfigError(format!("unknown preset '{}'", other))),
        }
    }
}

/// Everything a single evaluation consumes, fetched before the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    #[serde(default)]
    pub candles_1h: Vec<Candle>,
    #[serde(default)]
    pub candles_4h: Vec<Candle>,
    #[serde(default)]
    pub candles_exec: Vec<Candle>,
    #[serde(default)]
    pub news: Vec<NewsItem>,
    /// Reference clock for news decay. Defaults to the last execution candle.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.as_of.or_else(|| self.candles_exec.last().map(|c| c.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse_and_serde() {
        assert_eq!("15m".parse::<Timeframe>().unwrap(), Timeframe::M15);
        assert_eq!("4hour".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert!("1d".parse::<Timeframe>().is_err());

        let json = serde_json::to_string(&Timeframe::H1).unwrap();
        assert_eq!(json, "\"1h\"");
        let back: Timeframe = serde_json::from_str("\"5m\"").unwrap();
        assert_eq!(back, Timeframe::M5);
    }

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::M5.to_duration(), Duration::minutes(5));
        assert_eq!(Timeframe::H4.to_duration(), Duration::hours(4));
    }

    #[test]
    fn test_bias_serde_and_side() {
        assert_eq!(serde_json::to_string(&Bias::Neutral).unwrap(), "\"NEUTRAL\"");
        assert_eq!(Bias::Long.side(), Some(Side::Long));
        assert_eq!(Bias::Neutral.side(), None);
        assert_eq!(Bias::from(Side::Short), Bias::Short);
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!("STRICT".parse::<Preset>().unwrap(), Preset::Strict);
        assert_eq!(Preset::default(), Preset::Balanced);
        assert!("yolo".parse::<Preset>().is_err());
    }

    #[test]
    fn test_snapshot_reference_time_defaults_to_last_exec_candle() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z").unwrap().with_timezone(&Utc);
        let snapshot = MarketSnapshot {
            symbol: "BTCUSDT".to_string(),
            candles_1h: vec![],
            candles_4h: vec![],
            candles_exec: vec![Candle {
                timestamp: ts,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
            }],
            news: vec![],
            as_of: None,
        };
        assert_eq!(snapshot.reference_time(), Some(ts));
    }
}
