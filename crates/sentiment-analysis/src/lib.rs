use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signal_core::{NewsItem, Side};
use tracing::debug;

pub mod momentum;
pub use momentum::{compute_momentum, SentimentMomentum};

/// Outlets whose reporting gets full weight.
const TOP_TIER_DOMAINS: &[&str] = &[
    "reuters.com",
    "bloomberg.com",
    "wsj.com",
    "ft.com",
    "coindesk.com",
    "cointelegraph.com",
];

/// Quote-currency / contract suffixes stripped when mapping an exchange symbol
/// to a news ticker.
const SYMBOL_SUFFIXES: &[&str] = &["USDT", "USD", "PERP"];

pub const DEFAULT_MAX_ITEMS: usize = 12;
pub const GATE_SCORE_THRESHOLD: f64 = 0.6;

/// Source quality bucket used to weight news items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTier {
    TopTier,
    CryptoNative,
    Other,
}

impl SourceTier {
    pub fn weight(&self) -> f64 {
        match self {
            SourceTier::TopTier => 1.0,
            SourceTier::CryptoNative => 0.8,
            SourceTier::Other => 0.65,
        }
    }
}

pub fn classify_source(domain: Option<&str>, source: Option<&str>) -> SourceTier {
    let d = domain.unwrap_or("").to_lowercase();
    let s = source.unwrap_or("").to_lowercase();

    let top_tier = TOP_TIER_DOMAINS.iter().any(|hq| {
        let label = hq.split('.').next().unwrap_or(hq);
        d.contains(hq) || (!s.is_empty() && s.contains(label))
    });
    if top_tier {
        return SourceTier::TopTier;
    }

    if ["coin", "crypto"].iter().any(|k| d.contains(k) || s.contains(k)) {
        SourceTier::CryptoNative
    } else {
        SourceTier::Other
    }
}

/// Map an exchange symbol to the ticker news is filed under (`BTCUSDT` -> `BTC`).
pub fn news_ticker(symbol: &str) -> String {
    let s = symbol.trim().to_uppercase();
    for suffix in SYMBOL_SUFFIXES {
        if let Some(stripped) = s.strip_suffix(suffix) {
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    s
}

/// Aggregate sentiment over a bounded news window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Weighted mean score, clamped to [-1, 1]
    pub aggregate_score: f64,
    pub rising: bool,
    pub falling: bool,
    pub item_count: usize,
}

impl SentimentResult {
    pub fn neutral() -> Self {
        Self { aggregate_score: 0.0, rising: false, falling: false, item_count: 0 }
    }

    /// Gate rule: LONG needs score >= 0.6 and rising, SHORT needs <= -0.6 and falling.
    pub fn supports(&self, side: Side) -> bool {
        match side {
            Side::Long => self.aggregate_score >= GATE_SCORE_THRESHOLD && self.rising,
            Side::Short => self.aggregate_score <= -GATE_SCORE_THRESHOLD && self.falling,
        }
    }
}

/// Weights already-scored news by source quality, recency and model confidence.
/// Never re-scores text.
#[derive(Debug, Clone)]
pub struct SentimentAggregator {
    max_items: usize,
    decay_hours: f64,
    confidence_floor: f64,
    momentum_threshold: f64,
    min_momentum_items: usize,
}

impl Default for SentimentAggregator {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            decay_hours: 12.0,
            confidence_floor: 0.05,
            momentum_threshold: 0.05,
            min_momentum_items: 4,
        }
    }
}

impl SentimentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items.max(1);
        self
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// exp(-age / decay_hours), age clamped at zero
    pub fn recency_decay(&self, published_at: DateTime<Utc>, as_of: DateTime<Utc>) -> f64 {
        let age_hours = ((as_of - published_at).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
        (-age_hours / self.decay_hours).exp()
    }

    pub fn item_weight(&self, item: &NewsItem, as_of: DateTime<Utc>) -> f64 {
        let tier = classify_source(item.domain.as_deref(), item.source.as_deref());
        let decay = self.recency_decay(item.published_at.unwrap_or(as_of), as_of);
        let confidence = finite_or_zero(item.sentiment_confidence).max(self.confidence_floor);
        tier.weight() * decay * confidence
    }

    pub fn aggregate(&self, items: &[NewsItem], as_of: DateTime<Utc>) -> SentimentResult {
        if items.is_empty() {
            return SentimentResult::neutral();
        }

        // keep the most recent window
        let mut window: Vec<&NewsItem> = items.iter().collect();
        window.sort_by(|a, b| b.published_at.unwrap_or(as_of).cmp(&a.published_at.unwrap_or(as_of)));
        window.truncate(self.max_items);

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut points = Vec::with_capacity(window.len());

        for item in &window {
            let score = finite_or_zero(item.sentiment_score);
            let w = self.item_weight(item, as_of);
            weighted_sum += w * score;
            weight_total += w;
            points.push((item.published_at.unwrap_or(as_of), score));
        }

        let aggregate_score = if weight_total > 0.0 {
            (weighted_sum / weight_total).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let momentum = compute_momentum(&points, self.momentum_threshold, self.min_momentum_items);

        debug!(
            items = window.len(),
            aggregate_score,
            rising = momentum.rising,
            falling = momentum.falling,
            "sentiment aggregated"
        );

        SentimentResult {
            aggregate_score,
            rising: momentum.rising,
            falling: momentum.falling,
            item_count: window.len(),
        }
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}
