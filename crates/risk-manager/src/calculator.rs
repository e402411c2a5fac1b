use signal_core::{Candle, Side};
use technical_analysis::{closes, last_two, last_value, rsi, volume_sma, vwap};
use tracing::debug;

use crate::models::*;

/// Lowest low (LONG) or highest high (SHORT) of the last `window` bars.
pub fn fallback_stop_reference(bars: &[Candle], side: Side, window: usize) -> Option<f64> {
    let recent = &bars[bars.len().saturating_sub(window)..];
    if recent.is_empty() {
        return None;
    }
    let value = match side {
        Side::Long => recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min),
        Side::Short => recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max),
    };
    value.is_finite().then_some(value)
}

/// Evaluates entry triggers on the execution series and derives the stop and
/// target for a resolved side.
#[derive(Debug, Clone, Default)]
pub struct EntryRiskCalculator {
    rules: EntryRules,
}

impl EntryRiskCalculator {
    pub fn new(rules: EntryRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &EntryRules {
        &self.rules
    }

    /// Raw indicator values at the last bar.
    pub fn metrics(&self, bars: &[Candle]) -> EntryMetrics {
        let rsi_values = rsi(&closes(bars), RSI_PERIOD);
        EntryMetrics {
            rsi: last_value(&rsi_values),
            prev_rsi: last_two(&rsi_values).map(|(prev, _)| prev),
            vwap: last_value(&vwap(bars)),
            volume: bars.last().map(|b| b.volume),
            volume_avg: last_value(&volume_sma(bars, VOLUME_AVG_PERIOD)),
        }
    }

    /// Run every sub-check in order. With `enforce_rule_groups == false` the
    /// VWAP, volume and stop-width groups are skipped; momentum, candle and
    /// risk geometry always run.
    pub fn evaluate(
        &self,
        bars: &[Candle],
        side: Side,
        stop_reference: Option<f64>,
        enforce_rule_groups: bool,
    ) -> EntryEvaluation {
        let metrics = self.metrics(bars);
        let Some(last) = bars.last() else {
            return EntryEvaluation {
                checks: vec![SubCheck::new(EntryCheck::Momentum, CheckOutcome::NotEvaluable, "no bars")],
                plan: None,
                metrics,
            };
        };

        let mut checks = Vec::with_capacity(6);
        checks.push(self.momentum_check(&metrics, side));
        checks.push(candle_check(last, side));

        if enforce_rule_groups && self.rules.vwap_check {
            checks.push(self.vwap_check(last, &metrics, side));
        } else {
            checks.push(SubCheck::skipped(EntryCheck::Vwap, "vwap rule disabled"));
        }

        if enforce_rule_groups && self.rules.volume_check {
            checks.push(self.volume_check(&metrics));
        } else {
            checks.push(SubCheck::skipped(EntryCheck::Volume, "volume rule disabled"));
        }

        let plan = stop_reference.and_then(|r| TradePlan::from_stop_reference(side, last.close, r));
        checks.push(match (&plan, stop_reference) {
            (Some(p), _) => SubCheck::new(
                EntryCheck::RiskGeometry,
                CheckOutcome::Pass,
                format!("stop {:.6} risk {:.6}", p.stop_loss, p.risk),
            ),
            (None, Some(r)) => SubCheck::new(
                EntryCheck::RiskGeometry,
                CheckOutcome::Fail,
                format!("stop reference {:.6} is not on the loss side of entry {:.6}", r, last.close),
            ),
            (None, None) => SubCheck::new(
                EntryCheck::RiskGeometry,
                CheckOutcome::NotEvaluable,
                "no stop reference",
            ),
        });

        if !(enforce_rule_groups && self.rules.stop_width_check) {
            checks.push(SubCheck::skipped(EntryCheck::StopWidth, "stop-width rule disabled"));
        } else if let Some(p) = &plan {
            let width = p.stop_width_pct();
            checks.push(SubCheck::from_bool(
                EntryCheck::StopWidth,
                width <= self.rules.max_stop_pct,
                format!("stop width {:.3}% (max {:.2}%)", width * 100.0, self.rules.max_stop_pct * 100.0),
            ));
        } else {
            checks.push(SubCheck::new(
                EntryCheck::StopWidth,
                CheckOutcome::NotEvaluable,
                "no valid stop",
            ));
        }

        let blocked = checks.iter().any(|c| c.outcome.is_blocking());

        debug!(
            side = side.as_str(),
            blocked,
            rsi = ?metrics.rsi,
            vwap = ?metrics.vwap,
            "entry evaluated"
        );

        EntryEvaluation {
            checks,
            plan: if blocked { None } else { plan },
            metrics,
        }
    }

    fn momentum_check(&self, metrics: &EntryMetrics, side: Side) -> SubCheck {
        let (lo, hi) = self.rules.rsi_band(side);
        let Some(current) = metrics.rsi else {
            return SubCheck::new(EntryCheck::Momentum, CheckOutcome::NotEvaluable, "RSI not evaluable");
        };
        let in_band = (lo..=hi).contains(&current);

        if !self.rules.require_rsi_turn {
            return SubCheck::from_bool(
                EntryCheck::Momentum,
                in_band,
                format!("RSI {:.2} band {}-{} (turn not required)", current, lo, hi),
            );
        }

        let Some(prev) = metrics.prev_rsi else {
            return SubCheck::new(
                EntryCheck::Momentum,
                CheckOutcome::NotEvaluable,
                "previous RSI not evaluable",
            );
        };
        let turning = match side {
            Side::Long => current > prev,
            Side::Short => current < prev,
        };

        SubCheck::from_bool(
            EntryCheck::Momentum,
            in_band && turning,
            format!("RSI {:.2} (prev {:.2}) band {}-{}", current, prev, lo, hi),
        )
    }

    fn vwap_check(&self, last: &Candle, metrics: &EntryMetrics, side: Side) -> SubCheck {
        let Some(vwap_value) = metrics.vwap else {
            return SubCheck::new(EntryCheck::Vwap, CheckOutcome::NotEvaluable, "VWAP not evaluable");
        };
        let tol = self.rules.vwap_tolerance;
        let ok = match side {
            Side::Long => last.close > vwap_value * (1.0 - tol),
            Side::Short => last.close < vwap_value * (1.0 + tol),
        };
        SubCheck::from_bool(
            EntryCheck::Vwap,
            ok,
            format!("close {:.6} vs VWAP {:.6} (tol {:.2}%)", last.close, vwap_value, tol * 100.0),
        )
    }

    fn volume_check(&self, metrics: &EntryMetrics) -> SubCheck {
        let (Some(volume), Some(avg)) = (metrics.volume, metrics.volume_avg) else {
            return SubCheck::new(EntryCheck::Volume, CheckOutcome::NotEvaluable, "volume average not evaluable");
        };
        if avg <= 0.0 {
            return SubCheck::new(EntryCheck::Volume, CheckOutcome::NotEvaluable, "volume average is zero");
        }
        let required = avg * self.rules.volume_multiple;
        SubCheck::from_bool(
            EntryCheck::Volume,
            volume >= required,
            format!("volume {:.2} vs required {:.2} ({}x avg)", volume, required, self.rules.volume_multiple),
        )
    }
}

fn candle_check(last: &Candle, side: Side) -> SubCheck {
    let ok = match side {
        Side::Long => last.is_bullish(),
        Side::Short => last.is_bearish(),
    };
    SubCheck::from_bool(
        EntryCheck::Candle,
        ok,
        format!("open {:.6} close {:.6}", last.open, last.close),
    )
}
