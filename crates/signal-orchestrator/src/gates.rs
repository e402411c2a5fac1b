use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Gate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateState {
    Pass,
    Fail,
    /// Disabled by configuration; counts as a pass
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub gate: Gate,
    pub state: GateState,
    pub note: String,
}

/// A gate rejection that ends the evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub gate: Gate,
    pub note: String,
}

/// Ordered record of gate outcomes for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct GateTrace {
    reports: Vec<GateReport>,
}

impl GateTrace {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, gate: Gate, state: GateState, note: String) {
        debug!(gate = gate.as_str(), state = ?state, note = %note, "gate");
        self.reports.push(GateReport { gate, state, note });
    }

    pub fn pass(&mut self, gate: Gate, note: impl Into<String>) {
        self.record(gate, GateState::Pass, note.into());
    }

    pub fn skip(&mut self, gate: Gate, note: impl Into<String>) {
        self.record(gate, GateState::Skipped, note.into());
    }

    /// Record the failure and hand back the rejection for `?`-style early exit.
    pub fn fail(&mut self, gate: Gate, note: impl Into<String>) -> Rejection {
        let note = note.into();
        self.record(gate, GateState::Fail, note.clone());
        Rejection { gate, note }
    }

    pub fn reports(&self) -> &[GateReport] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<GateReport> {
        self.reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_keeps_order() {
        let mut trace = GateTrace::new();
        trace.pass(Gate::Data, "ok");
        trace.skip(Gate::MarketRegime, "disabled");
        let rejection = trace.fail(Gate::Sentiment, "flat");

        assert_eq!(rejection, Rejection { gate: Gate::Sentiment, note: "flat".to_string() });
        let states: Vec<GateState> = trace.reports().iter().map(|r| r.state).collect();
        assert_eq!(states, vec![GateState::Pass, GateState::Skipped, GateState::Fail]);
    }

    #[test]
    fn test_report_serializes() {
        let report = GateReport { gate: Gate::MarketRegime, state: GateState::Skipped, note: String::new() };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["gate"], "market_regime");
        assert_eq!(json["state"], "SKIPPED");
    }
}
