//! Gated signal pipeline.
//!
//! Gates run in a fixed order and the first failure ends the evaluation with
//! a NO_TRADE naming that gate. The engine is pure: the same snapshot and
//! configuration always produce the same payload.

use chrono::{DateTime, Utc};
use market_regime_detector::{MarketRegime, RegimeClassifier, RegimeResult};
use market_structure::{StructureAnalyzer, StructureResult, StructureState, MIN_STRUCTURE_BARS};
use risk_manager::{
    fallback_stop_reference, EntryEvaluation, EntryRiskCalculator, RiskLevel, TradePlan,
    FALLBACK_STOP_WINDOW,
};
use sentiment_analysis::{SentimentAggregator, SentimentResult};
use signal_core::{validate_series, AnalysisError, MarketSnapshot, Side};
use tracing::{info, warn};

use crate::confidence::{confidence_score, ConfidenceInputs};
use crate::config::{EngineConfig, Gate};
use crate::gates::{GateTrace, Rejection};
use crate::payload::{DecisionPayload, Diagnostics, Evaluation};

pub const MIN_EXEC_BARS: usize = MIN_STRUCTURE_BARS;
pub const MIN_HTF_BARS: usize = 200;

pub const RSI_ONLY_WARNINGS: [&str; 2] = [
    "RSI-only mode: every safety gate is bypassed",
    "do not use for real trading",
];

/// Mutable state threaded through one evaluation.
struct Run<'a> {
    snapshot: &'a MarketSnapshot,
    as_of: Option<DateTime<Utc>>,
    trace: GateTrace,
    warnings: Vec<String>,
    explain: Vec<String>,
    regime: Option<RegimeResult>,
    sentiment: Option<SentimentResult>,
    structure: Option<StructureResult>,
    entry: Option<EntryEvaluation>,
}

impl<'a> Run<'a> {
    fn new(snapshot: &'a MarketSnapshot) -> Self {
        Self {
            snapshot,
            as_of: snapshot.reference_time(),
            trace: GateTrace::new(),
            warnings: Vec::new(),
            explain: Vec::new(),
            regime: None,
            sentiment: None,
            structure: None,
            entry: None,
        }
    }
}

/// What a successful pipeline run hands to payload assembly.
struct Accepted {
    plan: TradePlan,
    regime: RegimeResult,
    bos_fallback: bool,
    rsi_only: bool,
}

/// Confluence signal engine. Holds only immutable configuration.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: EngineConfig,
    regime: RegimeClassifier,
    sentiment: SentimentAggregator,
    structure: StructureAnalyzer,
    entry: EntryRiskCalculator,
}

impl SignalEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            regime: RegimeClassifier::new(),
            sentiment: SentimentAggregator::new(),
            structure: StructureAnalyzer::new(config.structure_params()),
            entry: EntryRiskCalculator::new(config.entry_rules()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sentiment_aggregator(&self) -> &SentimentAggregator {
        &self.sentiment
    }

    /// Decision payload only.
    pub fn decide(&self, snapshot: &MarketSnapshot) -> DecisionPayload {
        self.evaluate(snapshot).decision
    }

    /// Decision plus the per-gate diagnostics behind it.
    pub fn evaluate(&self, snapshot: &MarketSnapshot) -> Evaluation {
        let mut run = Run::new(snapshot);
        let outcome = self.run_gates(&mut run);

        let decision = match outcome {
            Ok(accepted) => self.trade_payload(&mut run, accepted),
            Err(rejection) => {
                let mut explain = std::mem::take(&mut run.explain);
                explain.push(format!("{}: {}", rejection.gate, rejection.note));
                info!(
                    symbol = %snapshot.symbol,
                    gate = rejection.gate.as_str(),
                    note = %rejection.note,
                    "NO_TRADE"
                );
                DecisionPayload::no_trade(
                    &snapshot.symbol,
                    self.config.timeframe,
                    run.as_of,
                    rejection.gate,
                    explain,
                    std::mem::take(&mut run.warnings),
                )
            }
        };

        let diagnostics = Diagnostics {
            symbol: snapshot.symbol.clone(),
            timeframe: self.config.timeframe,
            preset: self.config.preset,
            gates: run.trace.into_reports(),
            regime: run.regime,
            sentiment: run.sentiment,
            structure: run.structure,
            entry_metrics: run.entry.as_ref().map(|e| e.metrics),
            entry_checks: run.entry.map(|e| e.checks).unwrap_or_default(),
        };

        Evaluation { decision, diagnostics }
    }

    fn run_gates(&self, run: &mut Run<'_>) -> Result<Accepted, Rejection> {
        let regime = self.data_gate(run)?;
        run.regime = Some(regime);

        if self.config.rsi_only() {
            return self.rsi_only(run, regime);
        }

        let side = self.regime_gate(run, &regime)?;
        self.sentiment_gate(run, side)?;
        let (stop_reference, bos_fallback) = self.structure_gate(run, side)?;
        self.alignment_gate(run, side)?;
        let plan = self.entry_gate(run, side, stop_reference)?;

        Ok(Accepted { plan, regime, bos_fallback, rsi_only: false })
    }

    fn data_gate(&self, run: &mut Run<'_>) -> Result<RegimeResult, Rejection> {
        let snap = run.snapshot;
        let checked = validate_series("execution", &snap.candles_exec, MIN_EXEC_BARS)
            .and_then(|_| validate_series("1h", &snap.candles_1h, MIN_HTF_BARS))
            .and_then(|_| validate_series("4h", &snap.candles_4h, MIN_HTF_BARS))
            .and_then(|_| self.regime.classify(&snap.candles_1h, &snap.candles_4h));

        match checked {
            Ok(regime) => {
                run.trace.pass(
                    Gate::Data,
                    format!(
                        "exec {} bars, 1h {} bars, 4h {} bars",
                        snap.candles_exec.len(),
                        snap.candles_1h.len(),
                        snap.candles_4h.len()
                    ),
                );
                Ok(regime)
            }
            Err(e) => Err(run.trace.fail(Gate::Data, data_note(&e))),
        }
    }

    fn regime_gate(&self, run: &mut Run<'_>, regime: &RegimeResult) -> Result<Side, Rejection> {
        if self.config.gates.market_regime {
            if regime.market_regime == MarketRegime::Range {
                return Err(run.trace.fail(
                    Gate::MarketRegime,
                    format!(
                        "RANGE: 4h ADX {:.2} below {:.0}",
                        regime.adx_4h,
                        self.regime.adx_threshold()
                    ),
                ));
            }
            let Some(side) = regime.bias.side() else {
                return Err(run.trace.fail(
                    Gate::MarketRegime,
                    format!(
                        "NEUTRAL bias: 1h close {:.4} vs EMA200 {:.4}, 4h close {:.4} vs EMA200 {:.4}",
                        regime.price_1h, regime.ema200_1h, regime.price_4h, regime.ema200_4h
                    ),
                ));
            };
            run.trace.pass(
                Gate::MarketRegime,
                format!("TREND {} (ADX 1h {:.2}, 4h {:.2})", side.as_str(), regime.adx_1h, regime.adx_4h),
            );
            run.explain.push(format!(
                "regime TREND with {} bias on 1h and 4h (ADX {:.1} / {:.1})",
                side.as_str(),
                regime.adx_1h,
                regime.adx_4h
            ));
            return Ok(side);
        }

        if let Some(side) = regime.directional_bias_ignoring_strength().side() {
            run.trace.skip(
                Gate::MarketRegime,
                format!("disabled; EMA agreement gives {}", side.as_str()),
            );
            return Ok(side);
        }

        let rsi = self.entry.metrics(&run.snapshot.candles_exec).rsi;
        match rsi.and_then(rsi_side) {
            Some(side) => {
                run.trace.skip(
                    Gate::MarketRegime,
                    format!("disabled; no EMA agreement, execution RSI gives {}", side.as_str()),
                );
                warn!(symbol = %run.snapshot.symbol, side = side.as_str(), "bias taken from execution RSI");
                run.warnings.push(format!("bias derived from execution RSI ({})", side.as_str()));
                Ok(side)
            }
            None => Err(run.trace.fail(
                Gate::MarketRegime,
                "disabled but no directional bias: EMAs disagree and RSI is neutral or not evaluable",
            )),
        }
    }

    fn sentiment_gate(&self, run: &mut Run<'_>, side: Side) -> Result<(), Rejection> {
        let sentiment = match run.as_of {
            Some(as_of) => self.sentiment.aggregate(&run.snapshot.news, as_of),
            None => SentimentResult::neutral(),
        };
        run.sentiment = Some(sentiment);

        if !self.config.use_sentiment {
            run.trace.skip(Gate::Sentiment, "sentiment not in use");
            return Ok(());
        }

        let note = format!(
            "score {:.4} over {} items (rising {}, falling {})",
            sentiment.aggregate_score, sentiment.item_count, sentiment.rising, sentiment.falling
        );
        if !sentiment.supports(side) {
            return Err(run.trace.fail(Gate::Sentiment, note));
        }
        run.explain.push(format!("sentiment supports {}: {}", side.as_str(), note));
        run.trace.pass(Gate::Sentiment, note);
        Ok(())
    }

    /// Returns the stop reference and whether only the BOS-only fallback confirmed.
    fn structure_gate(&self, run: &mut Run<'_>, side: Side) -> Result<(f64, bool), Rejection> {
        let snapshot = run.snapshot;
        let bars = &snapshot.candles_exec;
        let structure = self.structure.analyze(bars);
        run.structure = Some(structure);

        let sweep_reference = match (structure.sweep_side, structure.sweep_level) {
            (Some(sweep_side), Some(level)) if structure.confirmed_sweep() && sweep_side.implied_side() == side => {
                Some(level)
            }
            _ => None,
        };
        let stop_reference = match sweep_reference {
            Some(level) => level,
            None => fallback_stop_reference(bars, side, FALLBACK_STOP_WINDOW).ok_or_else(|| {
                run.trace.fail(Gate::Structure, "no stop reference available")
            })?,
        };

        if !self.config.gates.structure {
            run.trace.skip(Gate::Structure, format!("disabled; structure {}", structure.structure.as_str()));
            return Ok((stop_reference, false));
        }

        if structure.sweep {
            let sweep_side = structure.sweep_side.map_or("?", |s| s.as_str());
            if !structure.bos {
                return Err(run.trace.fail(
                    Gate::Structure,
                    format!("{} sweep without break of structure", sweep_side),
                ));
            }
            if sweep_reference.is_none() {
                return Err(run.trace.fail(
                    Gate::Structure,
                    format!("{} sweep does not support {}", sweep_side, side.as_str()),
                ));
            }

            let note = format!(
                "{} sweep of {:.6} with BOS through {:.6}",
                sweep_side,
                stop_reference,
                structure.bos_level.unwrap_or(f64::NAN)
            );
            run.explain.push(note.clone());
            if structure.structure == StructureState::Unclear {
                run.trace.pass(Gate::Structure, format!("{}; soft pass on UNCLEAR structure", note));
            } else {
                run.trace.pass(Gate::Structure, format!("{}; structure {}", note, structure.structure.as_str()));
            }
            return Ok((stop_reference, false));
        }

        match structure.fallback_bos {
            Some(fallback) => {
                let note = format!(
                    "no sweep; BOS-only fallback {} through {:.6}",
                    fallback.direction.as_str(),
                    fallback.level
                );
                warn!(symbol = %snapshot.symbol, "structure confirmed by BOS-only fallback");
                run.warnings.push("structure confirmed by BOS-only fallback; confidence reduced".to_string());
                run.explain.push(note.clone());
                run.trace.pass(Gate::Structure, note);
                Ok((stop_reference, true))
            }
            None => Err(run.trace.fail(Gate::Structure, "no liquidity sweep or break of structure")),
        }
    }

    fn alignment_gate(&self, run: &mut Run<'_>, side: Side) -> Result<(), Rejection> {
        if !self.config.gates.alignment {
            run.trace.skip(Gate::Alignment, "disabled");
            return Ok(());
        }
        let Some(structure) = run.structure else {
            run.trace.pass(Gate::Alignment, "no structure to compare");
            return Ok(());
        };

        if structure.opposes(side) {
            return Err(run.trace.fail(
                Gate::Alignment,
                format!("structure {} opposes {}", structure.structure.as_str(), side.as_str()),
            ));
        }
        if let Some(fallback) = structure.fallback_bos {
            if self.config.gates.structure && fallback.direction != side {
                return Err(run.trace.fail(
                    Gate::Alignment,
                    format!("fallback BOS {} opposes {}", fallback.direction.as_str(), side.as_str()),
                ));
            }
        }

        run.trace.pass(
            Gate::Alignment,
            format!("structure {} compatible with {}", structure.structure.as_str(), side.as_str()),
        );
        Ok(())
    }

    fn entry_gate(&self, run: &mut Run<'_>, side: Side, stop_reference: f64) -> Result<TradePlan, Rejection> {
        let enabled = self.config.gates.entry;
        let evaluation = self
            .entry
            .evaluate(&run.snapshot.candles_exec, side, Some(stop_reference), enabled);
        let blocking = evaluation.first_blocking().cloned();
        let plan = evaluation.plan;
        run.entry = Some(evaluation);

        if let Some(check) = blocking {
            let prefix = if enabled { "" } else { "always-enforced " };
            return Err(run.trace.fail(
                Gate::Entry,
                format!("{}{} check failed: {}", prefix, check.check.as_str(), check.detail),
            ));
        }
        let Some(plan) = plan else {
            return Err(run.trace.fail(Gate::Entry, "no trade plan"));
        };

        if enabled {
            run.trace.pass(Gate::Entry, format!("all entry checks passed under {}", self.config.preset));
        } else {
            run.trace.skip(Gate::Entry, "disabled; momentum, candle and risk geometry still enforced");
        }
        run.explain.push(format!(
            "entry {:.6}, stop {:.6}, target {:.6}",
            plan.entry_price, plan.stop_loss, plan.take_profit
        ));
        Ok(plan)
    }

    fn rsi_only(&self, run: &mut Run<'_>, regime: RegimeResult) -> Result<Accepted, Rejection> {
        let snapshot = run.snapshot;
        for gate in [Gate::MarketRegime, Gate::Sentiment, Gate::Structure, Gate::Alignment] {
            run.trace.skip(gate, "RSI-only mode");
        }
        run.warnings.extend(RSI_ONLY_WARNINGS.iter().map(|w| w.to_string()));
        warn!(symbol = %snapshot.symbol, "RSI-only mode: all safety gates bypassed");

        let bars = &snapshot.candles_exec;
        let metrics = self.entry.metrics(bars);
        run.entry = Some(EntryEvaluation { checks: Vec::new(), plan: None, metrics });

        let Some(rsi) = metrics.rsi else {
            return Err(run.trace.fail(Gate::Entry, "RSI-only mode: RSI not evaluable"));
        };
        let Some(side) = rsi_side(rsi) else {
            return Err(run.trace.fail(Gate::Entry, "RSI-only mode: RSI exactly 50, no direction"));
        };

        let plan = fallback_stop_reference(bars, side, FALLBACK_STOP_WINDOW)
            .zip(bars.last())
            .and_then(|(reference, last)| TradePlan::from_stop_reference(side, last.close, reference));
        let Some(plan) = plan else {
            return Err(run.trace.fail(Gate::Entry, "RSI-only mode: range stop not on the loss side"));
        };

        run.trace.skip(Gate::Entry, format!("RSI-only mode: RSI {:.2} gives {}", rsi, side.as_str()));
        run.explain.push(format!("RSI-only mode: execution RSI {:.2} gives {}", rsi, side.as_str()));
        run.explain.push(format!(
            "entry {:.6}, range stop {:.6}, target {:.6}",
            plan.entry_price, plan.stop_loss, plan.take_profit
        ));

        Ok(Accepted { plan, regime, bos_fallback: false, rsi_only: true })
    }

    fn trade_payload(&self, run: &mut Run<'_>, accepted: Accepted) -> DecisionPayload {
        let metrics = run.entry.as_ref().map(|e| e.metrics).unwrap_or_default();
        // aggregate stays in diagnostics; the payload only carries it when gated on
        let sentiment_score = match run.sentiment {
            Some(s) if self.config.use_sentiment => s.aggregate_score,
            _ => 0.0,
        };

        let confidence = confidence_score(&ConfidenceInputs {
            sentiment: self.config.use_sentiment.then_some(sentiment_score),
            adx_1h: accepted.regime.adx_1h,
            adx_4h: accepted.regime.adx_4h,
            volume: metrics.volume,
            volume_avg: metrics.volume_avg,
            bos_fallback: accepted.bos_fallback,
        });
        let mut risk_level = RiskLevel::from_disabled_gates(self.config.gates.disabled_count(), accepted.rsi_only);
        if accepted.bos_fallback {
            risk_level = risk_level.raised();
        }
        let structure = run.structure.map_or(StructureState::Unclear, |s| s.structure);

        info!(
            symbol = %run.snapshot.symbol,
            signal = accepted.plan.side.as_str(),
            confidence,
            risk_level = risk_level.as_str(),
            entry = accepted.plan.entry_price,
            stop = accepted.plan.stop_loss,
            "signal emitted"
        );

        DecisionPayload::trade(
            &run.snapshot.symbol,
            self.config.timeframe,
            run.as_of,
            &accepted.plan,
            confidence,
            risk_level,
            accepted.regime.market_regime,
            structure,
            sentiment_score,
            std::mem::take(&mut run.explain),
            std::mem::take(&mut run.warnings),
        )
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// LONG above 50, SHORT below, nothing at exactly 50.
fn rsi_side(rsi: f64) -> Option<Side> {
    if rsi > 50.0 {
        Some(Side::Long)
    } else if rsi < 50.0 {
        Some(Side::Short)
    } else {
        None
    }
}

fn data_note(err: &AnalysisError) -> String {
    match err {
        AnalysisError::InsufficientData(msg) | AnalysisError::InvalidData(msg) => msg.clone(),
        other => other.to_string(),
    }
}
