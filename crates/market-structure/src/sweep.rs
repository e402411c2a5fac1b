//! Liquidity sweep and break-of-structure detection.

use serde::{Deserialize, Serialize};
use signal_core::{Candle, Side};

use crate::swings::Swings;

/// Which pool of resting liquidity a sweep took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SweepSide {
    /// Wick below a swing low, close back above it
    Low,
    /// Wick above a swing high, close back below it
    High,
}

impl SweepSide {
    /// Trade direction a sweep on this side sets up
    pub fn implied_side(&self) -> Side {
        match self {
            SweepSide::Low => Side::Long,
            SweepSide::High => Side::Short,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SweepSide::Low => "LOW",
            SweepSide::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepEvent {
    pub side: SweepSide,
    pub level: f64,
    pub index: usize,
    pub bos: bool,
    pub bos_level: f64,
    /// First bar that broke `bos_level`
    pub bos_index: Option<usize>,
}

/// A range break found without a qualifying sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackBos {
    pub direction: Side,
    pub level: f64,
    pub index: usize,
}

/// (high, low) over `[max(0, index - window), index)`; the bar itself when the
/// range would be empty.
pub(crate) fn pre_range(bars: &[Candle], index: usize, window: usize) -> (f64, f64) {
    let start = index.saturating_sub(window);
    if start >= index {
        return (bars[index].high, bars[index].low);
    }
    let range = &bars[start..index];
    let high = range.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let low = range.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    (high, low)
}

/// First bar index a sweep/BOS scan may consider.
pub(crate) fn scan_start(len: usize, bos_window: usize) -> usize {
    let lookback = (len - 1).min((bos_window * 2).max(10));
    (len - 1 - lookback).max(1)
}

/// Walk candidate bars forward. The first sweep whose BOS confirms inside
/// `bos_window` wins; otherwise the last sweep seen is returned unconfirmed.
pub fn scan_sweep_bos(
    bars: &[Candle],
    swings: &Swings,
    bos_window: usize,
    pre_range_window: usize,
) -> Option<SweepEvent> {
    let n = bars.len();
    if n < 2 {
        return None;
    }

    let mut latest: Option<SweepEvent> = None;

    for i in scan_start(n, bos_window)..n - 1 {
        let bar = &bars[i];
        let swing_low = swings.low_before(i).map(|j| bars[j].low);
        let swing_high = swings.high_before(i).map(|j| bars[j].high);

        let (side, level) = match (swing_low, swing_high) {
            (Some(l), _) if bar.low < l && bar.close > l => (SweepSide::Low, l),
            (_, Some(h)) if bar.high > h && bar.close < h => (SweepSide::High, h),
            _ => continue,
        };

        let (pre_high, pre_low) = pre_range(bars, i, pre_range_window);
        let end = (n - 1).min(i + bos_window);
        let after = &bars[i + 1..=end];

        let (breaker, bos_level) = match side {
            SweepSide::Low => (after.iter().position(|b| b.high > pre_high), pre_high),
            SweepSide::High => (after.iter().position(|b| b.low < pre_low), pre_low),
        };
        let bos_index = breaker.map(|k| i + 1 + k);
        let bos = bos_index.is_some();

        let event = SweepEvent { side, level, index: i, bos, bos_level, bos_index };
        if bos {
            return Some(event);
        }
        latest = Some(event);
    }

    latest
}

/// Newest-first search for a bar whose close and wick both clear the range of
/// the `pre_range_window` bars before it.
pub fn scan_bos_fallback(bars: &[Candle], bos_window: usize, pre_range_window: usize) -> Option<FallbackBos> {
    let n = bars.len();
    if n < 2 {
        return None;
    }

    (scan_start(n, bos_window)..n).rev().find_map(|i| {
        let (pre_high, pre_low) = pre_range(bars, i, pre_range_window);
        let bar = &bars[i];
        if bar.close > pre_high && bar.high > pre_high {
            Some(FallbackBos { direction: Side::Long, level: pre_high, index: i })
        } else if bar.close < pre_low && bar.low < pre_low {
            Some(FallbackBos { direction: Side::Short, level: pre_low, index: i })
        } else {
            None
        }
    })
}
