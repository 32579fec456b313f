use rltrader::cli::runtime::{Cli, Commands};
use rltrader::config::AppConfig;
use rltrader::error::Result;

pub(crate) async fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    match &cli.command {
        Commands::Train { .. } => crate::main_commands::train::run_train(config).await,
        Commands::Evaluate {
            checkpoint, render, ..
        } => {
            crate::main_commands::evaluate::run_evaluate(config, checkpoint.as_deref(), *render)
                .await
        }
        Commands::Inspect { .. } => crate::main_commands::inspect::run_inspect(config).await,
    }
}
