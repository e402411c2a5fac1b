use serde::{Deserialize, Serialize};
use signal_core::{Preset, Side};

pub const RISK_REWARD_LABEL: &str = "1:2+";
pub const REWARD_MULTIPLE: f64 = 2.0;
pub const RSI_PERIOD: usize = 14;
pub const VOLUME_AVG_PERIOD: usize = 20;
/// Bars scanned for a range-extreme stop when no sweep level exists
pub const FALLBACK_STOP_WINDOW: usize = 10;
/// Protective buffer placed beyond the stop reference
pub const STOP_BUFFER: f64 = 0.001;

/// Per-request switches for the togglable rule groups. `None` keeps the
/// preset default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOverrides {
    #[serde(default)]
    pub vwap: Option<bool>,
    #[serde(default)]
    pub volume: Option<bool>,
    #[serde(default)]
    pub stop_width: Option<bool>,
    #[serde(default)]
    pub rsi_turn: Option<bool>,
    #[serde(default)]
    pub bos_fallback: Option<bool>,
}

/// Concrete entry thresholds after applying a preset and overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryRules {
    pub preset: Preset,
    pub rsi_band_long: (f64, f64),
    pub rsi_band_short: (f64, f64),
    pub require_rsi_turn: bool,
    pub vwap_check: bool,
    /// Fraction of VWAP price may sit on the wrong side and still pass
    pub vwap_tolerance: f64,
    pub volume_check: bool,
    pub volume_multiple: f64,
    pub stop_width_check: bool,
    /// Largest stop distance as a fraction of entry
    pub max_stop_pct: f64,
    pub allow_bos_fallback: bool,
}

impl EntryRules {
    pub fn for_preset(preset: Preset) -> Self {
        match preset {
            Preset::Strict => Self {
                preset,
                rsi_band_long: (40.0, 50.0),
                rsi_band_short: (50.0, 60.0),
                require_rsi_turn: true,
                vwap_check: true,
                vwap_tolerance: 0.0,
                volume_check: true,
                volume_multiple: 1.2,
                stop_width_check: true,
                max_stop_pct: 0.01,
                allow_bos_fallback: false,
            },
            Preset::Balanced => Self {
                preset,
                rsi_band_long: (35.0, 55.0),
                rsi_band_short: (45.0, 65.0),
                require_rsi_turn: true,
                vwap_check: true,
                vwap_tolerance: 0.001,
                volume_check: true,
                volume_multiple: 1.05,
                stop_width_check: true,
                max_stop_pct: 0.02,
                allow_bos_fallback: true,
            },
            Preset::Aggressive => Self {
                preset,
                rsi_band_long: (30.0, 60.0),
                rsi_band_short: (40.0, 70.0),
                require_rsi_turn: true,
                vwap_check: true,
                vwap_tolerance: 0.0025,
                volume_check: false,
                volume_multiple: 1.0,
                stop_width_check: true,
                max_stop_pct: 0.03,
                allow_bos_fallback: true,
            },
        }
    }

    pub fn with_overrides(mut self, overrides: &RuleOverrides) -> Self {
        if let Some(v) = overrides.vwap {
            self.vwap_check = v;
        }
        if let Some(v) = overrides.volume {
            self.volume_check = v;
        }
        if let Some(v) = overrides.stop_width {
            self.stop_width_check = v;
        }
        if let Some(v) = overrides.rsi_turn {
            self.require_rsi_turn = v;
        }
        if let Some(v) = overrides.bos_fallback {
            self.allow_bos_fallback = v;
        }
        self
    }

    pub fn rsi_band(&self, side: Side) -> (f64, f64) {
        match side {
            Side::Long => self.rsi_band_long,
            Side::Short => self.rsi_band_short,
        }
    }
}

impl Default for EntryRules {
    fn default() -> Self {
        Self::for_preset(Preset::default())
    }
}

/// Entry sub-check identifiers, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCheck {
    Momentum,
    Candle,
    Vwap,
    Volume,
    RiskGeometry,
    StopWidth,
}

impl EntryCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryCheck::Momentum => "momentum",
            EntryCheck::Candle => "candle",
            EntryCheck::Vwap => "vwap",
            EntryCheck::Volume => "volume",
            EntryCheck::RiskGeometry => "risk_geometry",
            EntryCheck::StopWidth => "stop_width",
        }
    }

    /// Checks that run even when the entry gate itself is disabled
    pub fn always_enforced(&self) -> bool {
        matches!(self, EntryCheck::Momentum | EntryCheck::Candle | EntryCheck::RiskGeometry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckOutcome {
    Pass,
    Fail,
    Skipped,
    /// Inputs could not support the check; blocks like a failure
    NotEvaluable,
}

impl CheckOutcome {
    pub fn is_blocking(&self) -> bool {
        matches!(self, CheckOutcome::Fail | CheckOutcome::NotEvaluable)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCheck {
    pub check: EntryCheck,
    pub outcome: CheckOutcome,
    pub detail: String,
}

impl SubCheck {
    pub fn new(check: EntryCheck, outcome: CheckOutcome, detail: impl Into<String>) -> Self {
        Self { check, outcome, detail: detail.into() }
    }

    pub fn skipped(check: EntryCheck, detail: impl Into<String>) -> Self {
        Self::new(check, CheckOutcome::Skipped, detail)
    }

    pub fn from_bool(check: EntryCheck, ok: bool, detail: impl Into<String>) -> Self {
        let outcome = if ok { CheckOutcome::Pass } else { CheckOutcome::Fail };
        Self::new(check, outcome, detail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub side: Side,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Absolute distance between entry and stop
    pub risk: f64,
}

impl TradePlan {
    /// Buffered stop beyond `stop_reference` and a 2R target. `None` when the
    /// stop would not sit on the loss side of entry.
    pub fn from_stop_reference(side: Side, entry_price: f64, stop_reference: f64) -> Option<Self> {
        if !entry_price.is_finite() || !stop_reference.is_finite() {
            return None;
        }
        let stop_loss = match side {
            Side::Long => stop_reference * (1.0 - STOP_BUFFER),
            Side::Short => stop_reference * (1.0 + STOP_BUFFER),
        };
        let risk = (entry_price - stop_loss) * side.sign();
        if risk <= 0.0 {
            return None;
        }
        Some(Self {
            side,
            entry_price,
            stop_loss,
            take_profit: entry_price + side.sign() * REWARD_MULTIPLE * risk,
            risk,
        })
    }

    /// Stop distance as a fraction of entry
    pub fn stop_width_pct(&self) -> f64 {
        self.risk / self.entry_price
    }

    pub fn risk_reward(&self) -> &'static str {
        RISK_REWARD_LABEL
    }
}

/// Raw values behind the entry checks. `None` marks a value that could not be
/// computed from the series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetrics {
    pub rsi: Option<f64>,
    pub prev_rsi: Option<f64>,
    pub vwap: Option<f64>,
    pub volume: Option<f64>,
    pub volume_avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryEvaluation {
    pub checks: Vec<SubCheck>,
    /// Present iff no enforced check blocked
    pub plan: Option<TradePlan>,
    pub metrics: EntryMetrics,
}

impl EntryEvaluation {
    pub fn first_blocking(&self) -> Option<&SubCheck> {
        self.checks.iter().find(|c| c.outcome.is_blocking())
    }

    pub fn check(&self, check: EntryCheck) -> Option<&SubCheck> {
        self.checks.iter().find(|c| c.check == check)
    }
}
