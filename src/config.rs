use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::path::Path;

use crate::error::TraderError;
use crate::rl::{PPOConfig, RLConfig, TrainingConfig};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub ppo: PPOConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL; built from the parts below when absent
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            name: None,
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Source table (optionally schema-qualified)
    #[serde(default = "default_table")]
    pub table: String,
    /// Inclusive `YYYY-MM-DD` lower bound
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive `YYYY-MM-DD` upper bound
    #[serde(default)]
    pub end_date: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            start_date: None,
            end_date: None,
        }
    }
}

fn default_table() -> String {
    "ohlcv_data".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_initial_balance")]
    pub initial_balance: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            initial_balance: default_initial_balance(),
        }
    }
}

fn default_initial_balance() -> f64 {
    crate::rl::environment::DEFAULT_INITIAL_BALANCE
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            .set_default("data.table", "ohlcv_data")?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g. config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("RLTRADER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // RLTRADER__TRAINING__ITERATIONS=20, etc.
            .add_source(
                Environment::with_prefix("RLTRADER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Connection options: the configured `database.url`, otherwise the
    /// configured parts with `DB_*` environment variables as fallback.
    pub fn connect_options(&self) -> crate::Result<PgConnectOptions> {
        self.connect_options_with(|key| std::env::var(key).ok())
    }

    fn connect_options_with<F>(&self, env: F) -> crate::Result<PgConnectOptions>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &self.database;
        if let Some(url) = db.url.as_deref().filter(|u| !u.is_empty()) {
            return url.parse::<PgConnectOptions>().map_err(|e| {
                TraderError::InvalidConfig(format!("invalid database.url: {}", e))
            });
        }

        let user = db.user.clone().or_else(|| env("DB_USER"));
        let password = db.password.clone().or_else(|| env("DB_PASSWORD"));
        let name = db.name.clone().or_else(|| env("DB_NAME"));
        let (Some(user), Some(password), Some(name)) = (user, password, name) else {
            return Err(TraderError::InvalidConfig(
                "database connection is not configured (set database.url or DB_USER/DB_PASSWORD/DB_NAME)"
                    .to_string(),
            ));
        };

        let host = env("DB_HOST")
            .filter(|_| db.host == default_host())
            .unwrap_or_else(|| db.host.clone());
        let port = match env("DB_PORT").filter(|_| db.port == default_port()) {
            Some(raw) => raw.parse().map_err(|_| {
                TraderError::InvalidConfig(format!("DB_PORT is not a port number: {}", raw))
            })?,
            None => db.port,
        };

        Ok(PgConnectOptions::new()
            .host(&host)
            .port(port)
            .username(&user)
            .password(&password)
            .database(&name))
    }

    /// Training and PPO sections as one trainer config
    pub fn rl(&self) -> RLConfig {
        RLConfig {
            ppo: self.ppo.clone(),
            training: self.training.clone(),
        }
    }

    /// Validate configuration values, reporting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.connect_options() {
            errors.push(e.to_string());
        }
        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be at least 1".to_string());
        }

        if let Err(e) = crate::adapters::OhlcvQuery::new(
            &self.data.table,
            self.data.start_date.as_deref(),
            self.data.end_date.as_deref(),
        ) {
            errors.push(format!("data: {}", e));
        }

        if !(self.environment.initial_balance > 0.0 && self.environment.initial_balance.is_finite())
        {
            errors.push("environment.initial_balance must be positive".to_string());
        }

        if self.training.iterations == 0 {
            errors.push("training.iterations must be at least 1".to_string());
        }
        if let Err(rl_errors) = self.rl().validate() {
            errors.extend(rl_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn base() -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                url: Some("postgresql://u:p@localhost:5432/db".to_string()),
                ..Default::default()
            },
            data: DataConfig::default(),
            environment: EnvironmentConfig::default(),
            training: TrainingConfig::default(),
            ppo: PPOConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(base().validate().is_ok());
        assert_eq!(base().data.table, "ohlcv_data");
        assert_eq!(base().environment.initial_balance, 10_000.0);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = base();
        config.data.table = "bad table".to_string();
        config.environment.initial_balance = 0.0;
        config.training.iterations = 0;
        config.ppo.batch_size = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4, "{:?}", errors);
    }

    #[test]
    fn test_connect_options_from_parts_and_env() {
        let mut config = base();
        config.database.url = None;
        config.database.user = Some("trader".to_string());

        let env: HashMap<&str, &str> = [
            ("DB_PASSWORD", "secret"),
            ("DB_NAME", "market"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
        ]
        .into_iter()
        .collect();

        let options = config
            .connect_options_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(options.get_username(), "trader");
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_database(), Some("market"));
    }

    #[test]
    fn test_connect_options_accept_reserved_characters() {
        let mut config = base();
        config.database.url = None;
        config.database.user = Some("tr@der".to_string());
        config.database.password = Some("p/ss#1?:x".to_string());
        config.database.name = Some("market".to_string());

        let options = config.connect_options_with(|_| None).unwrap();
        assert_eq!(options.get_username(), "tr@der");
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_database(), Some("market"));
    }

    #[test]
    fn test_connect_options_missing_parts() {
        let mut config = base();
        config.database.url = None;
        let err = config.connect_options_with(|_| None).unwrap_err();
        assert!(matches!(err, TraderError::InvalidConfig(_)));
    }

    #[test]
    fn test_bad_port_rejected() {
        let mut config = base();
        config.database.url = None;
        config.database.user = Some("u".to_string());
        config.database.password = Some("p".to_string());
        config.database.name = Some("d".to_string());

        let err = config
            .connect_options_with(|k| (k == "DB_PORT").then(|| "fivefour".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_malformed_url_rejected() {
        let mut config = base();
        config.database.url = Some("postgresql://u:p/ss#1@localhost:5432/db".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = std::env::temp_dir().join(format!("rltrader_cfg_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("default.toml"),
            r#"
[database]
url = "postgresql://u:p@localhost/db"

[data]
table = "bars_1h"
start_date = "2024-01-01"

[training]
iterations = 3
seed = 7

[ppo]
batch_size = 32
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&dir).unwrap();
        assert_eq!(config.data.table, "bars_1h");
        assert_eq!(config.data.start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(config.training.iterations, 3);
        assert_eq!(config.training.seed, Some(7));
        assert_eq!(config.training.rollout_steps, 512);
        assert_eq!(config.ppo.batch_size, 32);
        assert_eq!(config.database.max_connections, 5);

        let _ = fs::remove_dir_all(&dir);
    }
}
