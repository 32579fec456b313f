use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;

/// Command-line interface for the training pipeline.
#[derive(Parser, Debug)]
#[command(name = "rltrader")]
#[command(version = "0.1.0")]
#[command(
    about = "Train and evaluate a PPO trading agent on historical OHLCV bars",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml plus RLTRADER_ENV overrides)
    #[arg(short, long, global = true, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a policy and save a checkpoint
    Train {
        #[command(flatten)]
        data: DataArgs,

        /// Training iterations to run
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Environment steps collected per iteration
        #[arg(long)]
        rollout_steps: Option<usize>,

        /// Starting cash balance
        #[arg(long)]
        initial_balance: Option<f64>,

        /// Directory for checkpoints
        #[arg(long)]
        checkpoint_dir: Option<String>,

        /// Seed for reproducible training
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run one greedy episode with a saved policy
    Evaluate {
        #[command(flatten)]
        data: DataArgs,

        /// Checkpoint name (defaults to the latest)
        #[arg(long)]
        checkpoint: Option<String>,

        /// Directory holding checkpoints
        #[arg(long)]
        checkpoint_dir: Option<String>,

        /// Starting cash balance
        #[arg(long)]
        initial_balance: Option<f64>,

        /// Print the environment state after every step
        #[arg(long)]
        render: bool,
    },

    /// Load market data and print a summary without training
    Inspect {
        #[command(flatten)]
        data: DataArgs,
    },
}

/// Data source overrides shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Table holding OHLCV rows
    #[arg(short, long)]
    pub table: Option<String>,

    /// Inclusive start date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Inclusive end date (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<String>,
}

impl DataArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(table) = &self.table {
            config.data.table = table.clone();
        }
        if let Some(start) = &self.start_date {
            config.data.start_date = Some(start.clone());
        }
        if let Some(end) = &self.end_date {
            config.data.end_date = Some(end.clone());
        }
    }
}

impl Commands {
    pub fn data(&self) -> &DataArgs {
        match self {
            Commands::Train { data, .. }
            | Commands::Evaluate { data, .. }
            | Commands::Inspect { data } => data,
        }
    }

    /// Apply flag overrides on top of file and environment configuration
    pub fn apply(&self, config: &mut AppConfig) {
        self.data().apply(config);

        match self {
            Commands::Train {
                iterations,
                rollout_steps,
                initial_balance,
                checkpoint_dir,
                seed,
                ..
            } => {
                if let Some(n) = iterations {
                    config.training.iterations = *n;
                }
                if let Some(n) = rollout_steps {
                    config.training.rollout_steps = *n;
                }
                if let Some(b) = initial_balance {
                    config.environment.initial_balance = *b;
                }
                if let Some(dir) = checkpoint_dir {
                    config.training.checkpoint_dir = dir.clone();
                }
                if seed.is_some() {
                    config.training.seed = *seed;
                }
            }
            Commands::Evaluate {
                checkpoint_dir,
                initial_balance,
                ..
            } => {
                if let Some(b) = initial_balance {
                    config.environment.initial_balance = *b;
                }
                if let Some(dir) = checkpoint_dir {
                    config.training.checkpoint_dir = dir.clone();
                }
            }
            Commands::Inspect { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_flags_override_config() {
        let cli = Cli::parse_from([
            "rltrader",
            "train",
            "--iterations",
            "3",
            "--table",
            "bars_1h",
            "--start-date",
            "2024-01-01",
            "--seed",
            "9",
        ]);

        let mut config = AppConfig::load_from("/nonexistent").unwrap();
        cli.command.apply(&mut config);

        assert_eq!(config.training.iterations, 3);
        assert_eq!(config.training.seed, Some(9));
        assert_eq!(config.data.table, "bars_1h");
        assert_eq!(config.data.start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(config.data.end_date, None);
    }

    #[test]
    fn test_evaluate_flags() {
        let cli = Cli::parse_from([
            "rltrader",
            "--config",
            "cfg",
            "evaluate",
            "--checkpoint",
            "ppo_it000010",
            "--render",
        ]);

        assert_eq!(cli.config, "cfg");
        match cli.command {
            Commands::Evaluate {
                checkpoint, render, ..
            } => {
                assert_eq!(checkpoint.as_deref(), Some("ppo_it000010"));
                assert!(render);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
