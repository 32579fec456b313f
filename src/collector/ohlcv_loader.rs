//! OHLCV dataset loading
//!
//! Pulls bars for a table/date range from a [`BarSource`] and turns them into
//! a validated [`MarketDataset`].

use async_trait::async_trait;
use tracing::{info, warn};

use crate::adapters::{OhlcvQuery, PostgresStore};
use crate::domain::{MarketBar, MarketDataset};
use crate::error::Result;

/// Anything that can return bars for a query, in ascending time order
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BarSource: Send + Sync {
    async fn fetch_bars(&self, query: &OhlcvQuery) -> Result<Vec<MarketBar>>;
}

#[async_trait]
impl BarSource for PostgresStore {
    async fn fetch_bars(&self, query: &OhlcvQuery) -> Result<Vec<MarketBar>> {
        self.fetch_ohlcv(query).await
    }
}

/// Load a dataset, returning `Ok(None)` when the query matched no rows
pub async fn load_dataset<S>(source: &S, query: &OhlcvQuery) -> Result<Option<MarketDataset>>
where
    S: BarSource + ?Sized,
{
    info!(
        table = %query.table,
        start_date = ?query.start_date,
        end_date = ?query.end_date,
        "loading market data"
    );

    let bars = source.fetch_bars(query).await?;
    if bars.is_empty() {
        warn!(table = %query.table, "no market data found for the requested range");
        return Ok(None);
    }

    let dataset = MarketDataset::from_ordered(bars)?;
    info!(
        bars = dataset.len(),
        first = %dataset.first().timestamp,
        last = %dataset.last().timestamp,
        "market data loaded"
    );

    Ok(Some(dataset))
}
