use chrono::{DateTime, Utc};
use market_regime_detector::{MarketRegime, RegimeResult};
use market_structure::{StructureResult, StructureState};
use risk_manager::{EntryMetrics, RiskLevel, SubCheck, TradePlan};
use sentiment_analysis::SentimentResult;
use serde::{Deserialize, Serialize};
use signal_core::{Preset, Side, Timeframe};

use crate::config::Gate;
use crate::gates::GateReport;

pub const NO_TRADE_REASON: &str = "insufficient confluence";

pub const ENTRY_REASONS: [&str; 5] = [
    "market_regime_confirmed",
    "sentiment_alignment",
    "liquidity_sweep",
    "bos_confirmed",
    "volume_confirmation",
];

pub const INVALIDATE_IF: [&str; 3] = ["sentiment_flip", "structure_break", "volume_divergence"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Long,
    Short,
    NoTrade,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Long => "LONG",
            Signal::Short => "SHORT",
            Signal::NoTrade => "NO_TRADE",
        }
    }
}

impl From<Side> for Signal {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => Signal::Long,
            Side::Short => Signal::Short,
        }
    }
}

/// Outward decision. Price fields are `null` on NO_TRADE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPayload {
    pub symbol: String,
    pub signal: Signal,
    pub timeframe: Timeframe,
    pub as_of: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub failed_gate: Option<Gate>,
    pub confidence_score: Option<u8>,
    pub risk_level: Option<RiskLevel>,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub risk_reward: Option<String>,
    pub market_regime: Option<MarketRegime>,
    pub structure: Option<StructureState>,
    pub sentiment_score: Option<f64>,
    pub entry_reason: Vec<String>,
    pub invalidate_if: Vec<String>,
    pub explain: Vec<String>,
    pub warnings: Vec<String>,
}

impl DecisionPayload {
    pub fn no_trade(
        symbol: &str,
        timeframe: Timeframe,
        as_of: Option<DateTime<Utc>>,
        gate: Gate,
        explain: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        let explain = if explain.is_empty() {
            vec![format!("{} gate failed", gate)]
        } else {
            explain
        };
        Self {
            symbol: symbol.to_string(),
            signal: Signal::NoTrade,
            timeframe,
            as_of,
            reason: Some(NO_TRADE_REASON.to_string()),
            failed_gate: Some(gate),
            confidence_score: None,
            risk_level: None,
            entry_price: None,
            stop_loss: None,
            take_profit: None,
            risk_reward: None,
            market_regime: None,
            structure: None,
            sentiment_score: None,
            entry_reason: Vec::new(),
            invalidate_if: Vec::new(),
            explain,
            warnings,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn trade(
        symbol: &str,
        timeframe: Timeframe,
        as_of: Option<DateTime<Utc>>,
        plan: &TradePlan,
        confidence_score: u8,
        risk_level: RiskLevel,
        market_regime: MarketRegime,
        structure: StructureState,
        sentiment_score: f64,
        explain: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            signal: plan.side.into(),
            timeframe,
            as_of,
            reason: None,
            failed_gate: None,
            confidence_score: Some(confidence_score),
            risk_level: Some(risk_level),
            entry_price: Some(plan.entry_price),
            stop_loss: Some(plan.stop_loss),
            take_profit: Some(plan.take_profit),
            risk_reward: Some(plan.risk_reward().to_string()),
            market_regime: Some(market_regime),
            structure: Some(structure),
            sentiment_score: Some(round4(sentiment_score)),
            entry_reason: ENTRY_REASONS.iter().map(|s| s.to_string()).collect(),
            invalidate_if: INVALIDATE_IF.iter().map(|s| s.to_string()).collect(),
            explain,
            warnings,
        }
    }

    pub fn is_trade(&self) -> bool {
        self.signal != Signal::NoTrade
    }
}

/// Operator-facing view of the same evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub preset: Preset,
    pub gates: Vec<GateReport>,
    pub regime: Option<RegimeResult>,
    pub sentiment: Option<SentimentResult>,
    pub structure: Option<StructureResult>,
    pub entry_metrics: Option<EntryMetrics>,
    pub entry_checks: Vec<SubCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub decision: DecisionPayload,
    pub diagnostics: Diagnostics,
}

pub(crate) fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_trade_shape() {
        let payload = DecisionPayload::no_trade("BTCUSDT", Timeframe::M15, None, Gate::Data, vec![], vec![]);
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["signal"], "NO_TRADE");
        assert_eq!(json["reason"], "insufficient confluence");
        assert_eq!(json["failed_gate"], "data");
        assert!(json["entry_price"].is_null());
        assert!(json["stop_loss"].is_null());
        assert!(json["take_profit"].is_null());
        assert_eq!(payload.explain.len(), 1);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(-0.99999), -1.0);
    }
}
