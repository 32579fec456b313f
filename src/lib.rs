pub mod adapters;
pub mod cli;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod rl;

pub use adapters::{OhlcvQuery, PostgresStore};
pub use collector::{load_dataset, BarSource};
pub use config::AppConfig;
pub use domain::{MarketBar, MarketDataset};
pub use error::{Result, TraderError};
pub use rl::{
    EnvFactory, Environment, PolicyTrainer, TradeAction, TradingEnvConfig, TradingEnvironment,
};
