//! Greedy evaluation of a trained policy over one episode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::rl::algorithms::LinearPolicy;
use crate::rl::core::TradeAction;
use crate::rl::environment::{EnvFactory, StepResult, TradingEnvironment};

/// Outcome of a single evaluation episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub steps: usize,
    pub total_reward: f64,
    pub initial_value: f64,
    pub final_portfolio_value: f64,
    /// Percentage return over the initial balance
    pub total_return_pct: f64,
    pub action_counts: BTreeMap<String, usize>,
}

/// Run one greedy episode
pub fn evaluate(
    policy: &LinearPolicy,
    factory: &EnvFactory<TradingEnvironment>,
) -> Result<EvaluationReport> {
    evaluate_with(policy, factory, |_, _| Ok(()))
}

/// Run one greedy episode, calling `on_step` after every transition
pub fn evaluate_with<F>(
    policy: &LinearPolicy,
    factory: &EnvFactory<TradingEnvironment>,
    mut on_step: F,
) -> Result<EvaluationReport>
where
    F: FnMut(&TradingEnvironment, &StepResult) -> Result<()>,
{
    let mut env = factory.make()?;
    let (mut observation, info) = env.reset(None, None);
    let initial_value = info.total_portfolio_value;

    let mut action_counts: BTreeMap<String, usize> = TradeAction::all()
        .iter()
        .map(|a| (a.as_str().to_string(), 0))
        .collect();
    let mut total_reward = 0.0;
    let mut steps = 0;
    let mut final_value = initial_value;

    while !env.is_terminal() {
        let features = policy.features(&observation.to_vec());
        let action = TradeAction::try_from(policy.greedy(&features))?;

        let result = env.step_action(action)?;
        *action_counts.entry(action.as_str().to_string()).or_default() += 1;
        total_reward += result.reward;
        steps += 1;
        final_value = result.info.total_portfolio_value;

        on_step(&env, &result)?;
        observation = result.observation;
    }

    let total_return_pct = (final_value - initial_value) / initial_value * 100.0;
    info!(steps, total_reward, final_value, total_return_pct, "evaluation complete");

    Ok(EvaluationReport {
        steps,
        total_reward,
        initial_value,
        final_portfolio_value: final_value,
        total_return_pct,
        action_counts,
    })
}
