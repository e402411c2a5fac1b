use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use signal_core::{CandleProvider, NewsProvider};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Gate;
use crate::engine::SignalEngine;
use crate::payload::DecisionPayload;

pub const DEFAULT_COOLDOWN_MINUTES: i64 = 45;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    pub scanned: usize,
    pub emitted: usize,
    pub no_trade: usize,
    /// NO_TRADE results caused by unusable or unavailable data
    pub errors: usize,
    pub in_cooldown: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Emitted signals, highest confidence first
    pub signals: Vec<DecisionPayload>,
    pub stats: ScanStats,
    pub scanned_at: DateTime<Utc>,
}

/// Runs the engine over a watchlist and suppresses repeat signals for a
/// symbol until its cooldown expires.
pub struct SignalScanner {
    engine: Arc<SignalEngine>,
    candles: Arc<dyn CandleProvider>,
    news: Option<Arc<dyn NewsProvider>>,
    cooldown: Duration,
    last_emitted: DashMap<String, DateTime<Utc>>,
}

impl SignalScanner {
    pub fn new(engine: Arc<SignalEngine>, candles: Arc<dyn CandleProvider>) -> Self {
        Self {
            engine,
            candles,
            news: None,
            cooldown: Duration::minutes(DEFAULT_COOLDOWN_MINUTES),
            last_emitted: DashMap::new(),
        }
    }

    pub fn with_news(mut self, news: Arc<dyn NewsProvider>) -> Self {
        self.news = Some(news);
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn in_cooldown(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        self.last_emitted
            .get(symbol)
            .map(|last| now - *last < self.cooldown)
            .unwrap_or(false)
    }

    /// Evaluate every symbol not in cooldown concurrently. `now` is both the
    /// cooldown clock and the evaluation reference time.
    pub async fn scan(&self, symbols: &[String], now: DateTime<Utc>) -> ScanReport {
        let mut stats = ScanStats::default();

        let due: Vec<&String> = symbols
            .iter()
            .filter(|s| {
                let cooling = self.in_cooldown(s, now);
                if cooling {
                    debug!(symbol = %s, "in cooldown");
                    stats.in_cooldown += 1;
                }
                !cooling
            })
            .collect();

        info!(symbols = symbols.len(), due = due.len(), "scan started");

        let news = self.news.as_deref();
        let evaluations = join_all(
            due.iter()
                .map(|symbol| self.engine.evaluate_from_providers(symbol, self.candles.as_ref(), news, Some(now))),
        )
        .await;

        let mut signals = Vec::new();
        for evaluation in evaluations {
            stats.scanned += 1;
            let decision = evaluation.decision;
            if decision.is_trade() {
                stats.emitted += 1;
                self.last_emitted.insert(decision.symbol.clone(), now);
                signals.push(decision);
            } else {
                stats.no_trade += 1;
                if decision.failed_gate == Some(Gate::Data) {
                    stats.errors += 1;
                }
            }
        }

        signals.sort_by(|a, b| {
            b.confidence_score
                .cmp(&a.confidence_score)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        info!(
            scanned = stats.scanned,
            emitted = stats.emitted,
            no_trade = stats.no_trade,
            errors = stats.errors,
            in_cooldown = stats.in_cooldown,
            "scan complete"
        );

        ScanReport { signals, stats, scanned_at: now }
    }
}
