use rltrader::cli::output::{dataset_rows, render_table};
use rltrader::config::AppConfig;
use rltrader::error::Result;

pub(crate) async fn run_inspect(config: &AppConfig) -> Result<()> {
    super::with_market_data(config, |dataset| {
        println!("{}", render_table(&dataset_rows(&config.data.table, &dataset)));
        Ok(())
    })
    .await
}
