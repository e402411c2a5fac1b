//! Confluence signal engine: runs a market snapshot through ordered gates
//! and emits LONG, SHORT or NO_TRADE with a complete trade plan.

pub mod confidence;
pub mod config;
pub mod engine;
pub mod gates;
pub mod live;
pub mod payload;
pub mod scanner;


pub use confidence::{confidence_score, ConfidenceInputs};
pub use config::{EngineConfig, Gate, GateToggles};
pub use engine::{SignalEngine, MIN_EXEC_BARS, MIN_HTF_BARS, RSI_ONLY_WARNINGS};
pub use gates::{GateReport, GateState, GateTrace, Rejection};
pub use live::{EXEC_FETCH_LIMIT, HTF_FETCH_LIMIT};
pub use payload::{DecisionPayload, Diagnostics, Evaluation, Signal};
pub use scanner::{ScanReport, ScanStats, SignalScanner, DEFAULT_COOLDOWN_MINUTES};
