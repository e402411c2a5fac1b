use chrono::{DateTime, Utc};
use sentiment_analysis::news_ticker;
use signal_core::{AnalysisError, CandleProvider, MarketSnapshot, NewsItem, NewsProvider, Timeframe};
use tracing::{info, warn};

use crate::config::Gate;
use crate::engine::SignalEngine;
use crate::gates::GateTrace;
use crate::payload::{DecisionPayload, Diagnostics, Evaluation};

pub const HTF_FETCH_LIMIT: usize = 260;
pub const EXEC_FETCH_LIMIT: usize = 300;

impl SignalEngine {
    /// Fetch everything one evaluation needs concurrently, then evaluate.
    ///
    /// A failed candle fetch becomes a NO_TRADE at the data gate. A failed news
    /// fetch degrades to an empty news list with a warning.
    pub async fn evaluate_from_providers(
        &self,
        symbol: &str,
        candles: &dyn CandleProvider,
        news: Option<&dyn NewsProvider>,
        as_of: Option<DateTime<Utc>>,
    ) -> Evaluation {
        let timeframe = self.config().timeframe;
        let ticker = news_ticker(symbol);
        let news_limit = self.sentiment_aggregator().max_items();

        info!(symbol, timeframe = %timeframe, "fetching market data");

        let (h1, h4, exec, articles) = tokio::join!(
            candles.fetch_candles(symbol, Timeframe::H1, HTF_FETCH_LIMIT),
            candles.fetch_candles(symbol, Timeframe::H4, HTF_FETCH_LIMIT),
            candles.fetch_candles(symbol, timeframe, EXEC_FETCH_LIMIT),
            async {
                match news {
                    Some(provider) => provider.fetch_news(&ticker, news_limit).await,
                    None => Ok(Vec::new()),
                }
            },
        );

        let (candles_1h, candles_4h, candles_exec) = match (h1, h4, exec) {
            (Ok(h1), Ok(h4), Ok(exec)) => (h1, h4, exec),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                warn!(symbol, error = %e, "candle fetch failed");
                return self.provider_failure(symbol, as_of, &e);
            }
        };

        let mut warnings = Vec::new();
        let news: Vec<NewsItem> = match articles {
            Ok(items) => items,
            Err(e) => {
                warn!(symbol, ticker = %ticker, error = %e, "news fetch failed; continuing without news");
                warnings.push(format!("news unavailable: {}", e));
                Vec::new()
            }
        };

        let snapshot = MarketSnapshot {
            symbol: symbol.to_string(),
            candles_1h,
            candles_4h,
            candles_exec,
            news,
            as_of,
        };

        let mut evaluation = self.evaluate(&snapshot);
        if !warnings.is_empty() {
            warnings.append(&mut evaluation.decision.warnings);
            evaluation.decision.warnings = warnings;
        }
        evaluation
    }

    fn provider_failure(&self, symbol: &str, as_of: Option<DateTime<Utc>>, err: &AnalysisError) -> Evaluation {
        let mut trace = GateTrace::new();
        let rejection = trace.fail(Gate::Data, err.to_string());
        let config = self.config();

        Evaluation {
            decision: DecisionPayload::no_trade(
                symbol,
                config.timeframe,
                as_of,
                Gate::Data,
                vec![format!("{}: {}", rejection.gate, rejection.note)],
                Vec::new(),
            ),
            diagnostics: Diagnostics {
                symbol: symbol.to_string(),
                timeframe: config.timeframe,
                preset: config.preset,
                gates: trace.into_reports(),
                regime: None,
                sentiment: None,
                structure: None,
                entry_metrics: None,
                entry_checks: Vec::new(),
            },
        }
    }
}
