pub mod calculator;
pub mod models;
pub mod risk_level;
#[cfg(test)]
mod tests;

pub use calculator::{fallback_stop_reference, EntryRiskCalculator};
pub use models::*;
pub use risk_level::RiskLevel;
