use serde::{Deserialize, Serialize};
use signal_core::{Candle, Side};
use tracing::debug;

pub mod swings;
pub mod sweep;

pub use swings::{classify_structure, find_swings, StructureState, Swings};
pub use sweep::{scan_bos_fallback, scan_sweep_bos, FallbackBos, SweepEvent, SweepSide};


pub const MIN_STRUCTURE_BARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureParams {
    pub swing_left: usize,
    pub swing_right: usize,
    /// Bars after a sweep in which BOS may confirm
    pub bos_window: usize,
    /// Bars before a sweep forming the local range BOS must break
    pub pre_range_window: usize,
    /// Relative tolerance applied to swing comparisons
    pub tolerance_pct: f64,
    pub min_bars: usize,
    pub allow_bos_fallback: bool,
}

impl Default for StructureParams {
    fn default() -> Self {
        Self {
            swing_left: 3,
            swing_right: 3,
            bos_window: 5,
            pre_range_window: 10,
            tolerance_pct: 0.001,
            min_bars: MIN_STRUCTURE_BARS,
            allow_bos_fallback: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureResult {
    pub structure: StructureState,
    pub sweep: bool,
    pub sweep_side: Option<SweepSide>,
    pub sweep_level: Option<f64>,
    pub sweep_index: Option<usize>,
    pub bos: bool,
    pub bos_level: Option<f64>,
    pub bos_index: Option<usize>,
    /// Set only when no sweep was found and the fallback is allowed
    pub fallback_bos: Option<FallbackBos>,
    pub swing_high_count: usize,
    pub swing_low_count: usize,
}

impl StructureResult {
    pub fn unclear() -> Self {
        Self {
            structure: StructureState::Unclear,
            sweep: false,
            sweep_side: None,
            sweep_level: None,
            sweep_index: None,
            bos: false,
            bos_level: None,
            bos_index: None,
            fallback_bos: None,
            swing_high_count: 0,
            swing_low_count: 0,
        }
    }

    /// A sweep whose break of structure confirmed
    pub fn confirmed_sweep(&self) -> bool {
        self.sweep && self.bos && self.sweep_level.is_some()
    }

    /// Structure points against `side` (UNCLEAR never does).
    pub fn opposes(&self, side: Side) -> bool {
        matches!(
            (self.structure, side),
            (StructureState::Bearish, Side::Long) | (StructureState::Bullish, Side::Short)
        )
    }
}

/// Swing, sweep and BOS analysis over an execution-timeframe series.
#[derive(Debug, Clone, Default)]
pub struct StructureAnalyzer {
    params: StructureParams,
}

impl StructureAnalyzer {
    pub fn new(params: StructureParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StructureParams {
        &self.params
    }

    pub fn analyze(&self, bars: &[Candle]) -> StructureResult {
        let p = &self.params;
        if bars.len() < p.min_bars {
            return StructureResult::unclear();
        }

        let swings = find_swings(bars, p.swing_left, p.swing_right);
        let counted = StructureResult {
            swing_high_count: swings.highs.len(),
            swing_low_count: swings.lows.len(),
            ..StructureResult::unclear()
        };
        if swings.highs.len() < 2 || swings.lows.len() < 2 {
            debug!(
                swing_highs = swings.highs.len(),
                swing_lows = swings.lows.len(),
                "too few swings for structure"
            );
            return counted;
        }

        let last_close = bars[bars.len() - 1].close;
        let tolerance = (last_close.abs() * p.tolerance_pct).max(1e-8);
        let structure = classify_structure(bars, &swings, tolerance);

        let mut result = StructureResult { structure, ..counted };

        match scan_sweep_bos(bars, &swings, p.bos_window, p.pre_range_window) {
            Some(event) => {
                result.sweep = true;
                result.sweep_side = Some(event.side);
                result.sweep_level = Some(event.level);
                result.sweep_index = Some(event.index);
                result.bos = event.bos;
                result.bos_level = Some(event.bos_level);
                result.bos_index = event.bos_index;
            }
            None if p.allow_bos_fallback => {
                result.fallback_bos = scan_bos_fallback(bars, p.bos_window, p.pre_range_window);
            }
            None => {}
        }

        debug!(
            structure = structure.as_str(),
            sweep = result.sweep,
            bos = result.bos,
            fallback = result.fallback_bos.is_some(),
            "structure analyzed"
        );

        result
    }
}
