use rltrader::cli::output::{evaluation_rows, render_table};
use rltrader::config::AppConfig;
use rltrader::error::{Result, TraderError};
use rltrader::rl::environment::RenderMode;
use rltrader::rl::training::{evaluate_with, Checkpointer, PolicyCheckpoint};
use rltrader::rl::{TradingEnvConfig, TradingEnvironment, OBSERVATION_DIM};
use tracing::info;

pub(crate) async fn run_evaluate(
    config: &AppConfig,
    checkpoint: Option<&str>,
    render: bool,
) -> Result<()> {
    let checkpointer = Checkpointer::new(
        &config.training.checkpoint_dir,
        config.training.max_checkpoints,
    )?;

    let name = match checkpoint {
        Some(name) => name.to_string(),
        None => checkpointer.latest_checkpoint().ok_or_else(|| {
            TraderError::Checkpoint(format!(
                "no checkpoints in {}",
                checkpointer.dir().display()
            ))
        })?,
    };
    let saved: PolicyCheckpoint = checkpointer.load(&name)?;
    if saved.policy.feature_dim() != OBSERVATION_DIM + 1 {
        return Err(TraderError::Checkpoint(format!(
            "checkpoint '{}' does not match the {}-value observation",
            name, OBSERVATION_DIM
        )));
    }
    info!(
        checkpoint = %name,
        iteration = saved.iteration,
        timesteps = saved.timesteps_total,
        "loaded policy"
    );

    super::with_market_data(config, |dataset| {
        let env_config =
            TradingEnvConfig::with_initial_balance(dataset, config.environment.initial_balance)?;
        let factory = TradingEnvironment::factory(env_config);

        // JSON logs go through tracing instead of interleaving text on stdout.
        let mode = if config.logging.json {
            RenderMode::Log
        } else {
            RenderMode::Human
        };
        let report = evaluate_with(&saved.policy, &factory, |env, _| {
            if render {
                env.render(mode)?;
            }
            Ok(())
        })?;

        println!("Evaluation of '{}'", name);
        println!("{}", render_table(&evaluation_rows(&report)));
        Ok(())
    })
    .await
}
