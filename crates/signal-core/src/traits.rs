use async_trait::async_trait;
use crate::{AnalysisError, Candle, NewsItem, Timeframe};

/// Source of OHLCV candles. Implementations return the most recent `limit`
/// bars in ascending time order.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, AnalysisError>;
}

/// Source of already-scored news items for a ticker.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsItem>, AnalysisError>;
}
