use rltrader::adapters::OhlcvQuery;
use rltrader::collector::load_dataset;
use rltrader::config::AppConfig;
use rltrader::domain::MarketDataset;
use rltrader::error::{Result, TraderError};

pub(crate) mod evaluate;
pub(crate) mod inspect;
pub(crate) mod train;

/// Load the configured dataset and hand it to `run`.
///
/// The connection pool is closed before returning, whatever the outcome.
pub(crate) async fn with_market_data<T, F>(config: &AppConfig, run: F) -> Result<T>
where
    F: FnOnce(MarketDataset) -> Result<T>,
{
    let query = OhlcvQuery::new(
        &config.data.table,
        config.data.start_date.as_deref(),
        config.data.end_date.as_deref(),
    )?;

    let store = crate::main_runtime::connect(config).await?;
    let outcome = match load_dataset(&store, &query).await {
        Ok(Some(dataset)) => run(dataset),
        Ok(None) => {
            println!(
                "No data loaded from '{}'. Check the table name and date range.",
                query.table
            );
            Err(TraderError::EmptyDataset {
                table: query.table.clone(),
            })
        }
        Err(e) => Err(e),
    };
    store.close().await;

    outcome
}
