use serde::{Deserialize, Serialize};
use signal_core::Candle;

/// Indices of swing highs and swing lows, in time order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Swings {
    pub highs: Vec<usize>,
    pub lows: Vec<usize>,
}

impl Swings {
    /// Most recent swing high strictly before `index`
    pub fn high_before(&self, index: usize) -> Option<usize> {
        self.highs.iter().rev().find(|&&i| i < index).copied()
    }

    /// Most recent swing low strictly before `index`
    pub fn low_before(&self, index: usize) -> Option<usize> {
        self.lows.iter().rev().find(|&&i| i < index).copied()
    }
}

/// Swing pivots over a symmetric window. A bar is a swing high when its high
/// equals the maximum high of `[i - left, i + right]`; ties all qualify.
pub fn find_swings(bars: &[Candle], left: usize, right: usize) -> Swings {
    let mut swings = Swings::default();
    if bars.len() < left + right + 1 {
        return swings;
    }

    for i in left..bars.len() - right {
        let window = &bars[i - left..=i + right];
        let max_high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let min_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

        if bars[i].high == max_high {
            swings.highs.push(i);
        }
        if bars[i].low == min_low {
            swings.lows.push(i);
        }
    }

    swings
}

/// Market structure read from the latest swing sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StructureState {
    /// Higher highs and higher lows
    Bullish,
    /// Lower highs and lower lows
    Bearish,
    Unclear,
}

impl StructureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureState::Bullish => "BULLISH",
            StructureState::Bearish => "BEARISH",
            StructureState::Unclear => "UNCLEAR",
        }
    }
}

/// Classify from the last three swings of each kind (two when only two exist).
/// Every step must move by more than `tolerance` to count.
pub fn classify_structure(bars: &[Candle], swings: &Swings, tolerance: f64) -> StructureState {
    if swings.highs.len() < 2 || swings.lows.len() < 2 {
        return StructureState::Unclear;
    }

    let highs: Vec<f64> = last_n(&swings.highs, 3).iter().map(|&i| bars[i].high).collect();
    let lows: Vec<f64> = last_n(&swings.lows, 3).iter().map(|&i| bars[i].low).collect();

    let rising = |vals: &[f64]| vals.windows(2).all(|w| w[1] - w[0] > tolerance);
    let falling = |vals: &[f64]| vals.windows(2).all(|w| w[0] - w[1] > tolerance);

    if rising(&highs) && rising(&lows) {
        StructureState::Bullish
    } else if falling(&highs) && falling(&lows) {
        StructureState::Bearish
    } else {
        StructureState::Unclear
    }
}

fn last_n(indices: &[usize], n: usize) -> &[usize] {
    &indices[indices.len().saturating_sub(n)..]
}
