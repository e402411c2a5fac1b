#[cfg(test)]
mod entry_risk_tests {
    use crate::*;
    use chrono::{Duration, TimeZone, Utc};
    use signal_core::{Candle, Preset, Side};

    /// Bars whose closes follow `deltas` from 100; each bar opens at the prior
    /// close with a 0.1 wick on both sides.
    fn bars_from_deltas(deltas: &[f64], last_volume: f64) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut close = 100.0;
        let mut bars = vec![Candle {
            timestamp: start,
            open: close,
            high: close + 0.1,
            low: close - 0.1,
            close,
            volume: 1000.0,
        }];
        for (i, d) in deltas.iter().enumerate() {
            let open = close;
            close += d;
            bars.push(Candle {
                timestamp: start + Duration::minutes(15 * (i as i64 + 1)),
                open,
                high: open.max(close) + 0.1,
                low: open.min(close) - 0.1,
                close,
                volume: 1000.0,
            });
        }
        if let Some(last) = bars.last_mut() {
            last.volume = last_volume;
        }
        bars
    }

    /// Grinding uptrend, a four-bar pullback, then a bullish turn bar.
    /// Last RSI is about 49 and rising, close sits above VWAP.
    fn long_setup() -> Vec<Candle> {
        let mut deltas = Vec::new();
        for _ in 0..20 {
            deltas.push(0.7);
            deltas.push(-0.4);
        }
        deltas.extend([-0.5, -0.5, -0.5, -0.5, 0.25]);
        bars_from_deltas(&deltas, 1500.0)
    }

    fn short_setup() -> Vec<Candle> {
        let mut deltas = Vec::new();
        for _ in 0..20 {
            deltas.push(-0.7);
            deltas.push(0.4);
        }
        deltas.extend([0.5, 0.5, 0.5, 0.5, -0.25]);
        bars_from_deltas(&deltas, 1500.0)
    }

    fn calculator(preset: Preset) -> EntryRiskCalculator {
        EntryRiskCalculator::new(EntryRules::for_preset(preset))
    }

    fn fallback(bars: &[Candle], side: Side) -> Option<f64> {
        fallback_stop_reference(bars, side, FALLBACK_STOP_WINDOW)
    }

    #[test]
    fn test_preset_table() {
        let strict = EntryRules::for_preset(Preset::Strict);
        assert_eq!(strict.rsi_band_long, (40.0, 50.0));
        assert_eq!(strict.volume_multiple, 1.2);
        assert_eq!(strict.max_stop_pct, 0.01);
        assert!(!strict.allow_bos_fallback);

        let balanced = EntryRules::for_preset(Preset::Balanced);
        assert_eq!(balanced.rsi_band_short, (45.0, 65.0));
        assert_eq!(balanced.vwap_tolerance, 0.001);
        assert!(balanced.volume_check);
        assert!(balanced.allow_bos_fallback);

        let aggressive = EntryRules::for_preset(Preset::Aggressive);
        assert_eq!(aggressive.rsi_band_long, (30.0, 60.0));
        assert!(!aggressive.volume_check);
        assert_eq!(aggressive.max_stop_pct, 0.03);

        assert_eq!(EntryRules::default(), balanced);
    }

    #[test]
    fn test_overrides_only_touch_named_groups() {
        let overrides = RuleOverrides { volume: Some(true), vwap: Some(false), ..Default::default() };
        let rules = EntryRules::for_preset(Preset::Aggressive).with_overrides(&overrides);
        assert!(rules.volume_check);
        assert!(!rules.vwap_check);
        assert!(rules.stop_width_check);
        assert!(rules.require_rsi_turn);
        assert_eq!(rules.rsi_band_long, (30.0, 60.0));
    }

    #[test]
    fn test_long_entry_passes_balanced() {
        let bars = long_setup();
        let stop_ref = fallback(&bars, Side::Long);
        let eval = calculator(Preset::Balanced).evaluate(&bars, Side::Long, stop_ref, true);

        assert!(eval.first_blocking().is_none(), "{:?}", eval.checks);
        assert_eq!(eval.checks.len(), 6);
        let plan = eval.plan.expect("plan");
        assert_eq!(plan.side, Side::Long);
        assert!(plan.stop_loss < plan.entry_price);
        let reward = plan.take_profit - plan.entry_price;
        assert!((reward - 2.0 * (plan.entry_price - plan.stop_loss)).abs() < 1e-9);
        assert_eq!(plan.risk_reward(), "1:2+");

        let rsi = eval.metrics.rsi.unwrap();
        assert!((35.0..=55.0).contains(&rsi));
        assert!(rsi > eval.metrics.prev_rsi.unwrap());
        assert!(eval.metrics.vwap.unwrap() < plan.entry_price);
    }

    #[test]
    fn test_long_entry_passes_strict() {
        let bars = long_setup();
        let eval = calculator(Preset::Strict).evaluate(&bars, Side::Long, fallback(&bars, Side::Long), true);
        assert!(eval.plan.is_some(), "{:?}", eval.checks);
    }

    #[test]
    fn test_short_entry_mirrors_long() {
        let bars = short_setup();
        let eval =
            calculator(Preset::Balanced).evaluate(&bars, Side::Short, fallback(&bars, Side::Short), true);

        let plan = eval.plan.expect("plan");
        assert!(plan.stop_loss > plan.entry_price);
        let reward = plan.entry_price - plan.take_profit;
        assert!((reward - 2.0 * (plan.stop_loss - plan.entry_price)).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_side_fails_momentum_and_candle() {
        let bars = long_setup();
        let eval = calculator(Preset::Balanced).evaluate(&bars, Side::Short, fallback(&bars, Side::Short), true);

        assert!(eval.plan.is_none());
        assert_eq!(eval.check(EntryCheck::Momentum).unwrap().outcome, CheckOutcome::Fail);
        assert_eq!(eval.check(EntryCheck::Candle).unwrap().outcome, CheckOutcome::Fail);
        assert_eq!(eval.first_blocking().unwrap().check, EntryCheck::Momentum);
    }

    #[test]
    fn test_bearish_last_candle_blocks_long() {
        let mut bars = long_setup();
        let last = bars.len() - 1;
        bars[last].open = bars[last].close + 0.05;
        bars[last].high = bars[last].open + 0.1;

        let eval = calculator(Preset::Balanced).evaluate(&bars, Side::Long, fallback(&bars, Side::Long), true);
        assert!(eval.plan.is_none());
        assert_eq!(eval.first_blocking().unwrap().check, EntryCheck::Candle);
    }

    #[test]
    fn test_zero_volume_average_is_not_evaluable() {
        let mut bars = long_setup();
        for bar in &mut bars {
            bar.volume = 0.0;
        }
        let stop_ref = fallback(&bars, Side::Long);

        let eval = calculator(Preset::Balanced).evaluate(&bars, Side::Long, stop_ref, true);
        assert_eq!(eval.check(EntryCheck::Volume).unwrap().outcome, CheckOutcome::NotEvaluable);
        assert!(eval.plan.is_none());

        // aggressive does not check volume
        let eval = calculator(Preset::Aggressive).evaluate(&bars, Side::Long, stop_ref, true);
        assert_eq!(eval.check(EntryCheck::Volume).unwrap().outcome, CheckOutcome::Skipped);
        assert!(eval.plan.is_some(), "{:?}", eval.checks);
    }

    #[test]
    fn test_thin_volume_fails() {
        let mut deltas = Vec::new();
        for _ in 0..20 {
            deltas.push(0.7);
            deltas.push(-0.4);
        }
        deltas.extend([-0.5, -0.5, -0.5, -0.5, 0.25]);
        let bars = bars_from_deltas(&deltas, 1000.0);

        let eval = calculator(Preset::Balanced).evaluate(&bars, Side::Long, fallback(&bars, Side::Long), true);
        assert_eq!(eval.check(EntryCheck::Volume).unwrap().outcome, CheckOutcome::Fail);
    }

    #[test]
    fn test_wide_stop_fails_cap() {
        let bars = long_setup();
        let eval = calculator(Preset::Balanced).evaluate(&bars, Side::Long, Some(95.0), true);
        assert_eq!(eval.check(EntryCheck::StopWidth).unwrap().outcome, CheckOutcome::Fail);
        assert!(eval.plan.is_none());

        let rules = EntryRules::for_preset(Preset::Balanced)
            .with_overrides(&RuleOverrides { stop_width: Some(false), ..Default::default() });
        let eval = EntryRiskCalculator::new(rules).evaluate(&bars, Side::Long, Some(95.0), true);
        assert_eq!(eval.check(EntryCheck::StopWidth).unwrap().outcome, CheckOutcome::Skipped);
        assert!(eval.plan.is_some());
    }

    #[test]
    fn test_stop_on_wrong_side_fails_geometry() {
        let bars = long_setup();
        let eval = calculator(Preset::Balanced).evaluate(&bars, Side::Long, Some(110.0), true);
        assert_eq!(eval.check(EntryCheck::RiskGeometry).unwrap().outcome, CheckOutcome::Fail);
        assert_eq!(eval.check(EntryCheck::StopWidth).unwrap().outcome, CheckOutcome::NotEvaluable);
        assert!(eval.plan.is_none());

        let eval = calculator(Preset::Balanced).evaluate(&bars, Side::Long, None, true);
        assert_eq!(
            eval.check(EntryCheck::RiskGeometry).unwrap().outcome,
            CheckOutcome::NotEvaluable
        );
    }

    #[test]
    fn test_rule_groups_skipped_when_gate_disabled() {
        let bars = long_setup();
        let eval = calculator(Preset::Strict).evaluate(&bars, Side::Long, Some(95.0), false);

        for check in [EntryCheck::Vwap, EntryCheck::Volume, EntryCheck::StopWidth] {
            assert_eq!(eval.check(check).unwrap().outcome, CheckOutcome::Skipped);
        }
        assert_eq!(eval.check(EntryCheck::Momentum).unwrap().outcome, CheckOutcome::Pass);
        assert!(eval.plan.is_some());
    }

    #[test]
    fn test_momentum_not_evaluable_on_short_series() {
        let bars = bars_from_deltas(&[0.1; 10], 1000.0);
        let eval = calculator(Preset::Balanced).evaluate(&bars, Side::Long, Some(99.0), true);
        assert_eq!(eval.check(EntryCheck::Momentum).unwrap().outcome, CheckOutcome::NotEvaluable);
        assert!(eval.metrics.rsi.is_none());
        assert!(eval.plan.is_none());
    }

    #[test]
    fn test_trade_plan_arithmetic() {
        let plan = TradePlan::from_stop_reference(Side::Long, 100.0, 99.0).unwrap();
        assert!((plan.stop_loss - 98.901).abs() < 1e-9);
        assert!((plan.risk - 1.099).abs() < 1e-9);
        assert!((plan.take_profit - 102.198).abs() < 1e-9);

        let plan = TradePlan::from_stop_reference(Side::Short, 100.0, 101.0).unwrap();
        assert!((plan.stop_loss - 101.101).abs() < 1e-9);
        assert!((plan.take_profit - 97.798).abs() < 1e-9);

        assert!(TradePlan::from_stop_reference(Side::Long, 100.0, 100.2).is_none());
        assert!(TradePlan::from_stop_reference(Side::Short, 100.0, f64::NAN).is_none());
    }

    #[test]
    fn test_fallback_stop_reference() {
        let bars = long_setup();
        let recent = &bars[bars.len() - 10..];
        let lowest = recent.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let highest = recent.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);

        assert_eq!(fallback(&bars, Side::Long), Some(lowest));
        assert_eq!(fallback(&bars, Side::Short), Some(highest));
        assert_eq!(fallback(&[], Side::Long), None);
    }

    #[test]
    fn test_risk_level_from_disabled_gates() {
        assert_eq!(RiskLevel::from_disabled_gates(0, false), RiskLevel::Low);
        assert_eq!(RiskLevel::from_disabled_gates(1, false), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_disabled_gates(2, false), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_disabled_gates(3, false), RiskLevel::High);
        assert_eq!(RiskLevel::from_disabled_gates(0, true), RiskLevel::High);
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"MEDIUM\"");
    }

    #[test]
    fn test_risk_level_raised_saturates() {
        assert_eq!(RiskLevel::Low.raised(), RiskLevel::Medium);
        assert_eq!(RiskLevel::Medium.raised(), RiskLevel::High);
        assert_eq!(RiskLevel::High.raised(), RiskLevel::High);
    }

    #[test]
    fn test_sub_check_serializes() {
        let check = SubCheck::new(EntryCheck::RiskGeometry, CheckOutcome::NotEvaluable, "x");
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["check"], "risk_geometry");
        assert_eq!(json["outcome"], "NOT_EVALUABLE");
    }
}
