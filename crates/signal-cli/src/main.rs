//! signal-cli: evaluate market snapshot fixtures and print the decision.
//!
//! Usage:
//!   cargo run -p signal-cli -- fixtures/btc.json
//!   cargo run -p signal-cli -- fixtures/btc.json --preset strict --sentiment
//!   cargo run -p signal-cli -- fixtures/*.json --disable structure,alignment --debug
//!
//! Settings come from `SIGNAL_*` environment variables (a `.env` file is
//! honoured) and are then overridden by flags.

use anyhow::{bail, Context};
use signal_core::MarketSnapshot;
use signal_orchestrator::{EngineConfig, Gate, SignalEngine};
use tracing_subscriber::prelude::*;

const VALUE_FLAGS: &[&str] = &["--preset", "--timeframe", "--disable"];

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

/// Positional arguments: everything that is neither a flag nor a flag's value.
fn snapshot_paths(args: &[String]) -> Vec<&str> {
    let mut paths = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
        } else if !arg.starts_with("--") {
            paths.push(arg.as_str());
        }
    }
    paths
}

fn apply_flags(mut config: EngineConfig, args: &[String]) -> anyhow::Result<EngineConfig> {
    if let Some(preset) = flag_value(args, "--preset") {
        config.preset = preset.parse()?;
    }
    if let Some(timeframe) = flag_value(args, "--timeframe") {
        config.timeframe = timeframe.parse()?;
    }
    if args.iter().any(|a| a == "--sentiment") {
        config.use_sentiment = true;
    }
    if let Some(list) = flag_value(args, "--disable") {
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let gate: Gate = name.parse()?;
            config.gates.set(gate, false)?;
        }
    }
    Ok(config)
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  signal-cli SNAPSHOT.json [SNAPSHOT.json ...] [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --preset NAME        strict | balanced | aggressive (default: balanced)");
    eprintln!("  --timeframe TF       5m | 15m | 1h | 4h (default: 15m)");
    eprintln!("  --sentiment          Gate on aggregated news sentiment");
    eprintln!("  --disable LIST       Comma list of gates: market_regime,structure,alignment,entry");
    eprintln!("  --debug              Print diagnostics alongside the decision");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // logs go to stderr so stdout stays pure JSON
    if json_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let paths = snapshot_paths(&args);
    if paths.is_empty() {
        print_usage();
        bail!("no snapshot file given");
    }

    let config = EngineConfig::from_env().context("invalid SIGNAL_* environment")?;
    let config = apply_flags(config, &args).context("invalid command-line option")?;
    let debug = args.iter().any(|a| a == "--debug");

    tracing::info!(
        "signal-cli: {} snapshot(s), preset={}, timeframe={}, sentiment={}, disabled gates={}",
        paths.len(),
        config.preset,
        config.timeframe,
        config.use_sentiment,
        config.gates.disabled_count()
    );
    if config.rsi_only() {
        tracing::warn!("every togglable gate is disabled: running in RSI-only mode");
    }

    let engine = SignalEngine::new(config);

    for path in paths {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading snapshot {}", path))?;
        let snapshot: MarketSnapshot =
            serde_json::from_str(&raw).with_context(|| format!("parsing snapshot {}", path))?;

        let evaluation = engine.evaluate(&snapshot);
        let output = if debug {
            serde_json::to_string_pretty(&evaluation)?
        } else {
            serde_json::to_string_pretty(&evaluation.decision)?
        };
        println!("{}", output);
    }

    Ok(())
}
