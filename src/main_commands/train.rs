use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rltrader::config::AppConfig;
use rltrader::error::Result;
use rltrader::rl::training::{
    iteration_name, timestamped_name, Checkpointer, PolicyTrainer, TrainingResult,
};
use rltrader::rl::{TradingEnvConfig, TradingEnvironment};
use tokio::signal;
use tracing::{info, warn};

pub(crate) async fn run_train(config: &AppConfig) -> Result<()> {
    info!("Starting training mode");
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               RL Trader Training Mode                        ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Table:           {}", config.data.table);
    println!("║  Iterations:      {:>6}", config.training.iterations);
    println!("║  Rollout steps:   {:>6}", config.training.rollout_steps);
    println!("║  Learning rate:   {:>10.6}", config.ppo.lr);
    println!("║  Initial balance: {:>10.2}", config.environment.initial_balance);
    println!("║  Checkpoints:     {}", config.training.checkpoint_dir);
    println!("╚══════════════════════════════════════════════════════════════╝");

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current iteration");
                interrupted.store(true, Ordering::SeqCst);
            }
        });
    }

    let checkpointer = Checkpointer::new(
        &config.training.checkpoint_dir,
        config.training.max_checkpoints,
    )?;

    super::with_market_data(config, |dataset| {
        let env_config =
            TradingEnvConfig::with_initial_balance(dataset, config.environment.initial_balance)?;
        let factory = TradingEnvironment::factory(env_config);
        let mut trainer = PolicyTrainer::new(config.rl(), factory)?;

        // Rollouts and updates are CPU bound; keep them off the async scheduler.
        let outcome = tokio::task::block_in_place(|| {
            run_iterations(&mut trainer, config.training.iterations, &interrupted)
        });
        trainer.stop();
        let last = outcome?;

        if trainer.iteration() == 0 {
            println!("No iterations completed; nothing to save.");
            return Ok(());
        }

        // Unique per run so separate runs never overwrite each other.
        let name = timestamped_name(&iteration_name("ppo", trainer.iteration()));
        let path = checkpointer.save(&trainer.checkpoint(), &name)?;

        println!();
        println!("Training complete: {} iterations", trainer.iteration());
        if let Some(mean) = last.and_then(|r| r.final_portfolio_value_mean) {
            println!("  Mean final portfolio value: {:.2}", mean);
        }
        println!("Checkpoint saved at: {}", path.display());
        Ok(())
    })
    .await
}

fn run_iterations(
    trainer: &mut PolicyTrainer<TradingEnvironment>,
    iterations: usize,
    interrupted: &AtomicBool,
) -> Result<Option<TrainingResult>> {
    let mut last = None;

    for i in 0..iterations {
        if interrupted.load(Ordering::SeqCst) {
            warn!(completed = i, "training interrupted");
            break;
        }

        let result = trainer.train()?;
        println!("Iteration {}/{}", i + 1, iterations);
        println!("{}", result.pretty()?);
        last = Some(result);
    }

    Ok(last)
}
