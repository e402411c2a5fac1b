use serde::{Deserialize, Serialize};

/// Risk label attached to an emitted signal, driven by how many safety gates
/// the caller switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// LOW with every gate on, MEDIUM for one or two disabled, HIGH beyond
    /// that or whenever the RSI-only path produced the signal.
    pub fn from_disabled_gates(disabled: usize, rsi_only: bool) -> Self {
        if rsi_only {
            return RiskLevel::High;
        }
        match disabled {
            0 => RiskLevel::Low,
            1 | 2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }

    /// One step up, saturating at HIGH.
    pub fn raised(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium | RiskLevel::High => RiskLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}
