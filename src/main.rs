use clap::Parser;
use rltrader::cli::Cli;
use rltrader::config::AppConfig;
use rltrader::error::{Result, TraderError};

mod main_commands;
mod main_dispatch;
mod main_runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)?;
    cli.command.apply(&mut config);
    main_runtime::init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("\x1b[31m✗ {}\x1b[0m", e);
        }
        return Err(TraderError::InvalidConfig(errors.join("; ")));
    }

    let result = main_dispatch::run(&cli, &config).await;
    if let Err(e) = &result {
        main_runtime::report_failure(e, &config.data.table);
    }
    result
}
