use market_structure::StructureParams;
use risk_manager::{EntryRules, RuleOverrides};
use serde::{Deserialize, Serialize};
use signal_core::{AnalysisError, Preset, Timeframe};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Pipeline stages in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Data,
    MarketRegime,
    Sentiment,
    Structure,
    Alignment,
    Entry,
}

impl Gate {
    pub const ORDER: [Gate; 6] = [
        Gate::Data,
        Gate::MarketRegime,
        Gate::Sentiment,
        Gate::Structure,
        Gate::Alignment,
        Gate::Entry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::Data => "data",
            Gate::MarketRegime => "market_regime",
            Gate::Sentiment => "sentiment",
            Gate::Structure => "structure",
            Gate::Alignment => "alignment",
            Gate::Entry => "entry",
        }
    }

    /// Gates a caller may switch off through [`GateToggles`]
    pub fn is_togglable(&self) -> bool {
        matches!(self, Gate::MarketRegime | Gate::Structure | Gate::Alignment | Gate::Entry)
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gate {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "data" => Ok(Gate::Data),
            "market_regime" | "regime" => Ok(Gate::MarketRegime),
            "sentiment" => Ok(Gate::Sentiment),
            "structure" => Ok(Gate::Structure),
            "alignment" => Ok(Gate::Alignment),
            "entry" => Ok(Gate::Entry),
            other => Err(AnalysisError::ConfigError(format!("unknown gate '{}'", other))),
        }
    }
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateToggles {
    #[serde(default = "enabled")]
    pub market_regime: bool,
    #[serde(default = "enabled")]
    pub structure: bool,
    #[serde(default = "enabled")]
    pub alignment: bool,
    #[serde(default = "enabled")]
    pub entry: bool,
}

impl Default for GateToggles {
    fn default() -> Self {
        Self { market_regime: true, structure: true, alignment: true, entry: true }
    }
}

impl GateToggles {
    pub fn all_disabled() -> Self {
        Self { market_regime: false, structure: false, alignment: false, entry: false }
    }

    pub fn is_enabled(&self, gate: Gate) -> bool {
        match gate {
            Gate::MarketRegime => self.market_regime,
            Gate::Structure => self.structure,
            Gate::Alignment => self.alignment,
            Gate::Entry => self.entry,
            Gate::Data | Gate::Sentiment => true,
        }
    }

    pub fn set(&mut self, gate: Gate, on: bool) -> Result<(), AnalysisError> {
        match gate {
            Gate::MarketRegime => self.market_regime = on,
            Gate::Structure => self.structure = on,
            Gate::Alignment => self.alignment = on,
            Gate::Entry => self.entry = on,
            Gate::Data | Gate::Sentiment => {
                return Err(AnalysisError::ConfigError(format!(
                    "gate '{}' cannot be toggled",
                    gate
                )))
            }
        }
        Ok(())
    }

    pub fn disabled_count(&self) -> usize {
        [self.market_regime, self.structure, self.alignment, self.entry]
            .iter()
            .filter(|on| !**on)
            .count()
    }
}

/// Evaluation settings for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub preset: Preset,
    #[serde(default)]
    pub use_sentiment: bool,
    #[serde(default)]
    pub gates: GateToggles,
    #[serde(default)]
    pub rules: RuleOverrides,
}

impl EngineConfig {
    /// Load from `SIGNAL_*` environment variables, defaulting anything unset.
    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalysisError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("SIGNAL_TIMEFRAME") {
            config.timeframe = v.parse()?;
        }
        if let Some(v) = lookup("SIGNAL_PRESET") {
            config.preset = v.parse()?;
        }
        if let Some(v) = lookup("SIGNAL_USE_SENTIMENT") {
            config.use_sentiment = parse_bool("SIGNAL_USE_SENTIMENT", &v)?;
        }
        if let Some(v) = lookup("SIGNAL_DISABLE_GATES") {
            for name in v.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                config.gates.set(name.parse()?, false)?;
            }
        }

        Ok(config)
    }

    pub fn entry_rules(&self) -> EntryRules {
        EntryRules::for_preset(self.preset).with_overrides(&self.rules)
    }

    pub fn structure_params(&self) -> StructureParams {
        StructureParams {
            allow_bos_fallback: self.entry_rules().allow_bos_fallback,
            ..StructureParams::default()
        }
    }

    /// Every togglable gate off and sentiment unused
    pub fn rsi_only(&self) -> bool {
        self.gates.disabled_count() == 4 && !self.use_sentiment
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, AnalysisError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AnalysisError::ConfigError(format!("{} must be a boolean, got '{}'", key, other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.timeframe, Timeframe::M15);
        assert_eq!(config.preset, Preset::Balanced);
        assert!(!config.use_sentiment);
        assert_eq!(config.gates, GateToggles::default());
        assert!(!config.rsi_only());
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("SIGNAL_TIMEFRAME", "5min"),
            ("SIGNAL_PRESET", "strict"),
            ("SIGNAL_USE_SENTIMENT", "true"),
            ("SIGNAL_DISABLE_GATES", "structure, alignment"),
        ]))
        .unwrap();

        assert_eq!(config.timeframe, Timeframe::M5);
        assert_eq!(config.preset, Preset::Strict);
        assert!(config.use_sentiment);
        assert!(!config.gates.structure);
        assert!(!config.gates.alignment);
        assert_eq!(config.gates.disabled_count(), 2);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for pairs in [
            [("SIGNAL_PRESET", "yolo")],
            [("SIGNAL_USE_SENTIMENT", "maybe")],
            [("SIGNAL_DISABLE_GATES", "data")],
            [("SIGNAL_DISABLE_GATES", "volume")],
        ] {
            let err = EngineConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, AnalysisError::ConfigError(_)), "{:?}", pairs);
        }
    }

    #[test]
    fn test_rsi_only_requires_sentiment_off() {
        let mut config = EngineConfig { gates: GateToggles::all_disabled(), ..Default::default() };
        assert!(config.rsi_only());
        config.use_sentiment = true;
        assert!(!config.rsi_only());
    }

    #[test]
    fn test_bos_fallback_follows_preset_and_override() {
        let strict = EngineConfig { preset: Preset::Strict, ..Default::default() };
        assert!(!strict.structure_params().allow_bos_fallback);

        let mut balanced = EngineConfig::default();
        assert!(balanced.structure_params().allow_bos_fallback);
        balanced.rules.bos_fallback = Some(false);
        assert!(!balanced.structure_params().allow_bos_fallback);
    }

    #[test]
    fn test_deserialize_partial_request() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"timeframe":"1h","preset":"aggressive","gates":{"entry":false},"rules":{"vwap":false}}"#,
        )
        .unwrap();
        assert_eq!(config.timeframe, Timeframe::H1);
        assert!(config.gates.market_regime);
        assert!(!config.gates.entry);
        assert_eq!(config.rules.vwap, Some(false));
        assert!(!config.entry_rules().vwap_check);
    }
}
