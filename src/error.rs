use thiserror::Error;

/// Main error type for the training pipeline
#[derive(Error, Debug)]
pub enum TraderError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Market data errors
    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    #[error("No market data loaded from table '{table}'")]
    EmptyDataset { table: String },

    // Environment contract errors
    #[error("Invalid action: {0} (expected 0 = Hold, 1 = Buy, 2 = Sell)")]
    InvalidAction(usize),

    #[error("Episode already terminated at step {step}; call reset() before stepping again")]
    EpisodeTerminated { step: usize },

    // Checkpoint errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for TraderError
pub type Result<T> = std::result::Result<T, TraderError>;

/// Connection-level database failures the orchestrator reports with a hint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseFailure {
    #[error("authentication failed, check the database credentials")]
    Authentication,

    #[error("database server is not reachable")]
    Unreachable,

    #[error("table '{table}' does not exist")]
    UndefinedTable { table: String },
}

impl TraderError {
    /// Classify a database error for user-facing reporting.
    ///
    /// Uses the PostgreSQL SQLSTATE codes: 28P01/28000 (auth), 57P03 (cannot
    /// connect now) and 42P01 (undefined table).
    pub fn database_failure(&self, table: &str) -> Option<DatabaseFailure> {
        let TraderError::Database(err) = self else {
            return None;
        };

        match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => Some(DatabaseFailure::Unreachable),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("28P01") | Some("28000") => Some(DatabaseFailure::Authentication),
                Some("57P03") => Some(DatabaseFailure::Unreachable),
                Some("42P01") => Some(DatabaseFailure::UndefinedTable {
                    table: table.to_string(),
                }),
                _ => None,
            },
            _ => None,
        }
    }
}
