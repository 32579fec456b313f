use rltrader::adapters::PostgresStore;
use rltrader::config::{AppConfig, LoggingConfig};
use rltrader::error::{Result, TraderError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub fn init_logging(logging: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let default_directives = if logging.level == "info" {
        "info,rltrader=debug,sqlx=warn".to_string()
    } else {
        format!("{},sqlx=warn", logging.level)
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    // File logging is opt-in through RLTRADER_LOG_DIR. The rolling appender
    // aborts if it cannot create its first file, so writability is checked
    // up front.
    let log_dir = std::env::var("RLTRADER_LOG_DIR").ok();
    let file_layer = log_dir.as_deref().and_then(|dir| {
        let test_path = std::path::Path::new(dir).join(".rltrader_write_test");
        let writable = std::fs::create_dir_all(dir).is_ok()
            && std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&test_path)
                .is_ok();

        if !writable {
            eprintln!(
                "Warning: Could not write to log directory {}, file logging disabled",
                dir
            );
            return None;
        }
        let _ = std::fs::remove_file(&test_path);

        let file_appender = tracing_appender::rolling::daily(dir, "rltrader.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // The process exits right after the command finishes
        Box::leak(Box::new(guard));

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
    });

    let (json_layer, console_layer) = if logging.json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
        )
    };

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let (true, Some(dir)) = (file_logging_enabled, log_dir) {
        eprintln!("Logging to: {}/rltrader.log", dir);
    }
}

/// Open the connection pool described by the configuration
pub async fn connect(config: &AppConfig) -> Result<PostgresStore> {
    let options = config.connect_options()?;

    info!(
        host = %config.database.host,
        max_connections = config.database.max_connections,
        "connecting to database"
    );
    PostgresStore::new(options, config.database.max_connections).await
}

/// Log a failed command, with a hint for well-known database failures
pub fn report_failure(err: &TraderError, table: &str) {
    match err.database_failure(table) {
        Some(failure) => {
            error!(error = %err, "database error: {}", failure);
            eprintln!("\x1b[31m✗ Database error: {}\x1b[0m", failure);
        }
        None => {
            error!(error = %err, "command failed");
            eprintln!("\x1b[31m✗ {}\x1b[0m", err);
        }
    }
}
